//! Outbound collaborators of the monitor: a notification dispatcher (chat
//! bot or similar) and a remote sync target for stop-time archival.
//!
//! Both are optional. A monitor built without them behaves identically apart
//! from the missing side effects, and their failures are logged, never fatal.

use crate::storage::RecordingRun;
use anyhow::Result;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub trait Notifier: Send + Sync {
    /// A session started; `intensity_delta` is how far the first bark chunk
    /// cleared the threshold.
    fn send_bark(&self, intensity_delta: u32) -> Result<()>;

    fn send_end_bark(&self, duration: Duration) -> Result<()>;

    fn send_text(&self, message: &str) -> Result<()>;
}

/// Off-box archival invoked once per run, after the run is closed locally.
pub trait RemoteSync: Send + Sync {
    fn sync_run(&self, run: &RecordingRun) -> Result<()>;

    fn sync_audio(&self, audio_dir: &Path) -> Result<()>;
}

/// Notifier that writes every notification to the log. Used by the binary
/// when no chat integration is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send_bark(&self, intensity_delta: u32) -> Result<()> {
        info!(intensity_delta, "bark started");
        Ok(())
    }

    fn send_end_bark(&self, duration: Duration) -> Result<()> {
        info!(
            duration_secs = duration.as_secs_f64(),
            "bark ended after {}",
            format_duration(duration)
        );
        Ok(())
    }

    fn send_text(&self, message: &str) -> Result<()> {
        info!(message, "notification");
        Ok(())
    }
}

/// `1h 02m 03s`, `4m 05s` or `6s`.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3_600, (total % 3_600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}
