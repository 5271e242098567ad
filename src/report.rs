use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use facecount_sensor::Gesture;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::storage::CounterState;

/// Periodic summary sent to whoever collects the counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub id: String,
    pub timestamp: i64,
    #[serde(rename = "sensorType")]
    pub sensor_type: String,
    // Zero readings are left out to keep payloads small
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facenumber: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facescore: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gesturetype: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gesturescore: Option<u16>,
    #[serde(rename = "facesSeen")]
    pub faces_seen: u32,
    pub gestures: BTreeMap<&'static str, u32>,
}

impl Report {
    pub fn new(sensor_type: &str, state: &CounterState, now: DateTime<Utc>) -> Self {
        let (facenumber, facescore) = if state.face_number > 0 {
            (Some(state.face_number), Some(state.face_score))
        } else {
            (None, None)
        };
        let (gesturetype, gesturescore) = if state.gesture_type > 0 {
            (Some(state.gesture_type), Some(state.gesture_score))
        } else {
            (None, None)
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: now.timestamp(),
            sensor_type: sensor_type.to_string(),
            facenumber,
            facescore,
            gesturetype,
            gesturescore,
            faces_seen: state.faces_seen,
            gestures: Gesture::ALL
                .into_iter()
                .map(|g| (g.name(), state.gesture_count(g)))
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Destination for reports.
pub trait ReportSink {
    fn publish(&mut self, report: &Report) -> Result<()>;
}

impl<K: ReportSink + ?Sized> ReportSink for Box<K> {
    fn publish(&mut self, report: &Report) -> Result<()> {
        (**self).publish(report)
    }
}

/// Writes one JSON object per line.
pub struct JsonLinesSink<W> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl JsonLinesSink<File> {
    /// Append to `path`, creating it if needed.
    pub fn append(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening report file {}", path.display()))?;
        Ok(Self::new(file))
    }
}

impl<W: Write> ReportSink for JsonLinesSink<W> {
    fn publish(&mut self, report: &Report) -> Result<()> {
        let line = report.to_json()?;
        writeln!(self.out, "{}", line)?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 15, 13, 0, 0).unwrap()
    }

    #[test]
    fn test_zero_readings_are_omitted() {
        let state = CounterState::fresh(now());
        let json: serde_json::Value =
            serde_json::from_str(&Report::new("GestureFace", &state, now()).to_json().unwrap())
                .unwrap();
        assert_eq!(json["sensorType"], "GestureFace");
        assert_eq!(json["timestamp"], now().timestamp());
        assert!(json.get("facenumber").is_none());
        assert!(json.get("gesturetype").is_none());
        assert_eq!(json["facesSeen"], 0);
        assert_eq!(json["gestures"]["LIKE"], 0);
    }

    #[test]
    fn test_readings_and_tallies() {
        let mut state = CounterState::fresh(now());
        state.face_number = 2;
        state.face_score = 81;
        state.gesture_type = Gesture::Ok.code();
        state.gesture_score = 70;
        state.faces_seen = 9;
        state.record_gesture(Gesture::Ok);
        state.record_gesture(Gesture::Ok);
        let report = Report::new("GestureFace", &state, now());
        assert_eq!(report.facenumber, Some(2));
        assert_eq!(report.gesturetype, Some(2));
        assert_eq!(report.gestures["OK"], 2);
        assert_eq!(report.gestures.len(), 5);
    }

    #[test]
    fn test_json_lines_sink() {
        let state = CounterState::fresh(now());
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.publish(&Report::new("GestureFace", &state, now())).unwrap();
        sink.publish(&Report::new("GestureFace", &state, now())).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value["id"].is_string());
        }
    }
}
