//! On-disk state: recordings, the run aggregate, the rolling event log, and
//! retention of old day buckets.
//!
//! Layout under the output folder:
//!
//! ```text
//! <output>/recording.json                 run aggregate
//! <output>/bark_events.json               rolling event log
//! <output>/audio/<DD-MM-YYYY>/<DD-MM-YYYY_HH-MM-SS>[ <prefix>].wav
//! ```

mod atomic;
mod events;
mod recording;
mod retention;
mod run;

pub use atomic::{read_json, write_json_atomic};
pub use events::{
    next_hour_boundary, BarkPoint, EventLog, RollingEventStore, DEFAULT_EVENT_WINDOW,
    MARKER_RADIUS,
};
pub use recording::RecordingWriter;
pub use retention::{parse_day_bucket, sweep, DEFAULT_RETENTION_DAYS};
pub use run::{AggregateRecorder, RecordingRun};

use chrono::{DateTime, Local, NaiveDate};
use std::path::{Path, PathBuf};

/// Day-bucket directory name format.
pub const DAY_BUCKET_FORMAT: &str = "%d-%m-%Y";

/// Recording file stem format.
pub const RECORDING_STEM_FORMAT: &str = "%d-%m-%Y_%H-%M-%S";

const RUN_FILE: &str = "recording.json";
const EVENTS_FILE: &str = "bark_events.json";
const AUDIO_DIR: &str = "audio";

/// Paths derived from the output folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run_file(&self) -> PathBuf {
        self.root.join(RUN_FILE)
    }

    pub fn events_file(&self) -> PathBuf {
        self.root.join(EVENTS_FILE)
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root.join(AUDIO_DIR)
    }

    pub fn day_dir(&self, day: NaiveDate) -> PathBuf {
        self.audio_dir()
            .join(day.format(DAY_BUCKET_FORMAT).to_string())
    }

    /// Where the recording of a session that started at `start` belongs.
    pub fn recording_path(&self, start: DateTime<Local>, prefix: Option<&str>) -> PathBuf {
        let stem = start.format(RECORDING_STEM_FORMAT).to_string();
        let name = match prefix {
            Some(prefix) if !prefix.is_empty() => format!("{stem} {prefix}.wav"),
            _ => format!("{stem}.wav"),
        };
        self.day_dir(start.date_naive()).join(name)
    }
}
