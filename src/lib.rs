//! Dog-bark monitor: amplitude-triggered bark detection over a live or piped
//! audio stream, debounced into sessions that are recorded to WAV, totalled in
//! a run aggregate, and plotted from a rolling event log.

pub mod audio;
pub mod config;
pub mod error;
mod lock;
pub mod monitor;
pub mod notify;
pub mod storage;
pub mod telemetry;

pub(crate) use lock::lock_or_recover;
pub use error::{BarkError, Result};
pub use monitor::{BarkMonitor, Clock, MonitorConfig, SystemClock};
pub use notify::{LogNotifier, Notifier, RemoteSync};
