use super::atomic::{read_json, write_json_atomic};
use crate::error::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Width of the rolling window kept for plotting.
pub const DEFAULT_EVENT_WINDOW: Duration = Duration::from_secs(48 * 60 * 60);

/// Marker size written with every point.
pub const MARKER_RADIUS: u32 = 5;

const SECS_PER_HOUR: i64 = 60 * 60;

/// One bark sample in plot coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarkPoint {
    /// Epoch seconds.
    pub x: i64,
    /// Intensity.
    pub y: u32,
    /// Marker size.
    pub r: u32,
}

/// File shape consumed by the plotting side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    pub min: i64,
    pub max: i64,
    pub barks: Vec<BarkPoint>,
}

/// Epoch seconds of the first whole hour strictly after `now`.
pub fn next_hour_boundary(now: DateTime<Local>) -> i64 {
    now.timestamp().div_euclid(SECS_PER_HOUR) * SECS_PER_HOUR + SECS_PER_HOUR
}

/// Time-windowed bark log backed by a single JSON file.
pub struct RollingEventStore {
    path: PathBuf,
    window_secs: i64,
    events: Vec<BarkPoint>,
    bounds: Option<(i64, i64)>,
}

impl RollingEventStore {
    /// Load the log at `path`. A missing or corrupt file starts empty.
    pub fn open(path: impl Into<PathBuf>, window: Duration) -> Self {
        let path = path.into();
        let events = match read_json::<EventLog>(&path) {
            Ok(Some(log)) => log.barks,
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "starting with an empty bark event log");
                Vec::new()
            }
        };
        debug!(path = %path.display(), events = events.len(), "loaded bark event log");
        Self {
            path,
            window_secs: i64::try_from(window.as_secs()).unwrap_or(i64::MAX).max(1),
            events,
            bounds: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn events(&self) -> &[BarkPoint] {
        &self.events
    }

    /// `(window_start, window_end)` as of the last save.
    pub fn bounds(&self) -> Option<(i64, i64)> {
        self.bounds
    }

    pub fn add(&mut self, timestamp: DateTime<Local>, intensity: u32) {
        self.events.push(BarkPoint {
            x: timestamp.timestamp(),
            y: intensity,
            r: MARKER_RADIUS,
        });
    }

    /// Re-anchor the window on the next hour after `now`, drop events at or
    /// before its start, and rewrite the file. Safe to call repeatedly.
    pub fn save(&mut self, now: DateTime<Local>) -> Result<()> {
        let window_end = next_hour_boundary(now);
        let window_start = window_end.saturating_sub(self.window_secs);
        let before = self.events.len();
        self.events.retain(|event| event.x > window_start);
        if self.events.len() < before {
            debug!(pruned = before - self.events.len(), "pruned bark events");
        }
        self.bounds = Some((window_start, window_end));
        let log = EventLog {
            min: window_start,
            max: window_end,
            barks: self.events.clone(),
        };
        write_json_atomic(&self.path, &log)
    }
}
