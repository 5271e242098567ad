use anyhow::Result;
use chrono::{DateTime, Utc};
use facecount_sensor::{Detection, Gesture};
use log::{info, warn};
use std::path::PathBuf;
use std::time::Duration;

use crate::monitor::{Event, Monitor};
use crate::report::{Report, ReportSink};
use crate::sensor::Sensor;
use crate::storage::{self, CounterState};

/// People-counting service: polls a sensor, keeps daily tallies and
/// publishes a report every `report_interval`.
pub struct Counter<S, K> {
    sensor: S,
    sink: K,
    monitor: Monitor,
    state: CounterState,
    state_path: PathBuf,
    report_interval: Duration,
    dirty: bool,
}

impl<S: Sensor, K: ReportSink> Counter<S, K> {
    pub fn new(
        sensor: S,
        sink: K,
        state: CounterState,
        state_path: PathBuf,
        report_interval: Duration,
    ) -> Self {
        Self {
            sensor,
            sink,
            monitor: resume_monitor(&state),
            state,
            state_path,
            report_interval,
            dirty: false,
        }
    }

    pub fn state(&self) -> &CounterState {
        &self.state
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    /// One pass of the service loop. Failures are logged and retried on the
    /// next pass.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if self.state.is_new_day(now) {
            self.daily_cleanup(now);
        }

        match self.sensor.poll() {
            Ok(detection) => self.apply(&detection, now),
            Err(e) => warn!("Sensor read failed: {:#}", e),
        }

        if self.report_due(now) {
            if let Err(e) = self.publish(now) {
                warn!("Report publish failed: {:#}", e);
            }
        }

        if self.dirty {
            match storage::save_state(&self.state_path, &self.state) {
                Ok(()) => self.dirty = false,
                Err(e) => warn!("Saving counter state failed: {:#}", e),
            }
        }
    }

    /// Tick forever, sleeping `poll_interval` between passes.
    pub fn run(&mut self, poll_interval: Duration) -> ! {
        info!(
            "Counting with {} sensor, reporting every {}s",
            self.sensor.sensor_type(),
            self.report_interval.as_secs()
        );
        loop {
            self.tick(Utc::now());
            if !poll_interval.is_zero() {
                std::thread::sleep(poll_interval);
            }
        }
    }

    fn apply(&mut self, detection: &Detection, now: DateTime<Utc>) {
        let previous = self.monitor.last_faces();
        for event in self.monitor.observe(detection) {
            info!("{}", event.status());
            match event {
                Event::Faces { count, score } => {
                    if count > previous {
                        self.state.faces_seen += (count - previous) as u32;
                        self.state.last_count_time = Some(now.timestamp());
                    }
                    self.state.face_number = count;
                    self.state.face_score = score;
                }
                Event::Gesture { gesture, score } => {
                    if let Some(gesture) = gesture {
                        self.state.record_gesture(gesture);
                    }
                    self.state.gesture_type = gesture.map(|g| g.code()).unwrap_or(0);
                    self.state.gesture_score = score;
                }
            }
            self.dirty = true;
        }
    }

    fn report_due(&self, now: DateTime<Utc>) -> bool {
        match self.state.last_report {
            None => true,
            Some(last) => {
                let interval = i64::try_from(self.report_interval.as_secs()).unwrap_or(i64::MAX);
                now.timestamp().saturating_sub(last) >= interval
            }
        }
    }

    fn publish(&mut self, now: DateTime<Utc>) -> Result<()> {
        let report = Report::new(self.sensor.sensor_type(), &self.state, now);
        self.sink.publish(&report)?;
        info!(
            "Report published: {} faces seen today",
            self.state.faces_seen
        );
        self.state.last_report = Some(now.timestamp());
        self.dirty = true;
        Ok(())
    }

    fn daily_cleanup(&mut self, now: DateTime<Utc>) {
        info!("Running daily cleanup");
        self.state.reset_daily(now);
        self.monitor = resume_monitor(&self.state);
        self.dirty = true;
    }
}

/// Pick up change detection from the last saved reading.
fn resume_monitor(state: &CounterState) -> Monitor {
    Monitor::resume(state.face_number, Gesture::from_code(state.gesture_type))
}
