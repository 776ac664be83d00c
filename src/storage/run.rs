use super::atomic::{read_json, write_json_atomic};
use crate::error::{BarkError, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Running totals for one record/stop lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingRun {
    pub start: DateTime<Local>,
    pub end: Option<DateTime<Local>>,
    #[serde(with = "duration_secs")]
    pub total_time_barked: Duration,
}

impl RecordingRun {
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            start,
            end: None,
            total_time_barked: Duration::ZERO,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
}

/// Durable aggregate for the output folder.
///
/// Every mutation re-reads the file before merging, so totals written by an
/// earlier process survive a restart. There is no cross-process lock: one
/// writer per output folder is assumed.
#[derive(Debug, Clone)]
pub struct AggregateRecorder {
    path: PathBuf,
}

impl AggregateRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The persisted run, if the file exists and parses.
    pub fn try_read(&self) -> Result<Option<RecordingRun>> {
        read_json(&self.path)
    }

    /// The persisted run, or a fresh one starting `now` when the file is
    /// missing or unreadable.
    pub fn read_or_fresh(&self, now: DateTime<Local>) -> RecordingRun {
        match self.try_read() {
            Ok(Some(run)) => run,
            Ok(None) => RecordingRun::new(now),
            Err(err) => {
                warn!(error = %err, "resetting run aggregate");
                RecordingRun::new(now)
            }
        }
    }

    pub fn write(&self, run: &RecordingRun) -> Result<()> {
        write_json_atomic(&self.path, run)
    }

    /// Start a run at `now`. A run left open by an interrupted process is
    /// resumed with its start time and total intact.
    pub fn begin(&self, now: DateTime<Local>) -> Result<RecordingRun> {
        let run = match self.try_read() {
            Ok(Some(run)) if run.is_open() => {
                debug!(start = %run.start, "resuming interrupted run");
                run
            }
            Ok(_) => RecordingRun::new(now),
            Err(err @ BarkError::CorruptState { .. }) => {
                warn!(error = %err, "resetting run aggregate");
                RecordingRun::new(now)
            }
            Err(err) => return Err(err),
        };
        self.write(&run)?;
        Ok(run)
    }

    /// Add `delta` to the persisted total. A closed run is left untouched, and
    /// a missing file starts a fresh run at `now`.
    pub fn update(&self, delta: Duration, now: DateTime<Local>) -> Result<RecordingRun> {
        let mut run = self.read_or_fresh(now);
        if !run.is_open() {
            warn!(path = %self.path.display(), "ignoring barked time for a closed run");
            return Ok(run);
        }
        run.total_time_barked = run.total_time_barked.saturating_add(delta);
        self.write(&run)?;
        Ok(run)
    }

    pub fn close(&self, end: DateTime<Local>) -> Result<RecordingRun> {
        let mut run = self.read_or_fresh(end);
        run.end = Some(end);
        self.write(&run)?;
        Ok(run)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
