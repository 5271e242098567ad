use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Utc};
use facecount_sensor::Gesture;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

const STATE_MAGIC: u32 = 0x20a9_9e74;
const STATE_VERSION: u16 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    magic: u32,
    version: u16,
}

/// Counter state kept across restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    // Last reading
    pub face_number: u16,
    pub face_score: u16,
    pub gesture_type: u16,
    pub gesture_score: u16,
    // Daily tallies
    pub faces_seen: u32,
    /// Indexed by gesture code - 1.
    pub gesture_counts: [u32; 5],
    pub last_count_time: Option<i64>,
    pub last_report: Option<i64>,
    /// Day (days since the common era) the tallies belong to.
    pub day: Option<i32>,
    pub reset_count: u8,
}

impl CounterState {
    pub fn fresh(now: DateTime<Utc>) -> Self {
        let mut state = Self::default();
        state.reset_daily(now);
        state
    }

    /// Zero the daily tallies at the start of a new day.
    pub fn reset_daily(&mut self, now: DateTime<Utc>) {
        self.faces_seen = 0;
        self.gesture_counts = [0; 5];
        self.last_count_time = Some(now.timestamp());
        self.day = Some(day_of(now));
        self.reset_count = 0;
    }

    pub fn is_new_day(&self, now: DateTime<Utc>) -> bool {
        self.day != Some(day_of(now))
    }

    pub fn gesture_count(&self, gesture: Gesture) -> u32 {
        self.gesture_counts[gesture.code() as usize - 1]
    }

    pub fn record_gesture(&mut self, gesture: Gesture) {
        self.gesture_counts[gesture.code() as usize - 1] += 1;
    }

    fn validate(&self) -> Result<()> {
        if self.face_score > 100 {
            anyhow::bail!("face score {} out of range", self.face_score);
        }
        if self.gesture_type > 5 {
            anyhow::bail!("gesture type {} out of range", self.gesture_type);
        }
        if self.gesture_score > 100 {
            anyhow::bail!("gesture score {} out of range", self.gesture_score);
        }
        Ok(())
    }
}

fn day_of(now: DateTime<Utc>) -> i32 {
    now.date_naive().num_days_from_ce()
}

/// Load state from `path`, falling back to a fresh state when the file is
/// missing, unreadable or out of range.
pub fn load_state(path: &Path, now: DateTime<Utc>) -> Result<CounterState> {
    if !path.exists() {
        info!("No saved state at {}, starting fresh", path.display());
        return Ok(CounterState::fresh(now));
    }
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    match decode(&data) {
        Ok(state) => {
            info!("Counter state at {} is valid", path.display());
            Ok(state)
        }
        Err(e) => {
            warn!("Counter state at {} is not valid ({}), reinitializing", path.display(), e);
            Ok(CounterState::fresh(now))
        }
    }
}

fn decode(data: &[u8]) -> Result<CounterState> {
    let (header, rest): (Header, &[u8]) = postcard::take_from_bytes(data)?;
    if header.magic != STATE_MAGIC || header.version != STATE_VERSION {
        anyhow::bail!(
            "unexpected header magic={:#x} version={}",
            header.magic,
            header.version
        );
    }
    let state: CounterState = postcard::from_bytes(rest)?;
    state.validate()?;
    Ok(state)
}

pub fn save_state(path: &Path, state: &CounterState) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut data = postcard::to_allocvec(&Header {
        magic: STATE_MAGIC,
        version: STATE_VERSION,
    })?;
    data.extend(postcard::to_allocvec(state)?);
    std::fs::write(path, data).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
