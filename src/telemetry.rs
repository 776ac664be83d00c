use crate::config::AppConfig;
use std::env;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

pub fn tracing_log_path() -> PathBuf {
    env::var("BARK_MONITOR_TRACE_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("bark_monitor_trace.jsonl"))
}

pub fn file_logging_enabled(config: &AppConfig) -> bool {
    config.logs && !config.no_logs
}

/// Install the global subscriber once: human-readable lines on stderr, plus
/// JSON lines appended to the trace log when file logging is on.
pub fn init_tracing(config: &AppConfig) {
    let _ = TRACING_INIT.get_or_init(|| {
        let level = if config.verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        };
        let console = tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
            .with_filter(level);
        let file = file_logging_enabled(config)
            .then(open_trace_log)
            .flatten()
            .map(|file| {
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(Mutex::new(file))
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_filter(level)
            });
        let _ = tracing_subscriber::registry()
            .with(console)
            .with(file)
            .try_init();
    });
}

fn open_trace_log() -> Option<File> {
    let path = tracing_log_path();
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => Some(file),
        Err(err) => {
            eprintln!("failed to open trace log {}: {err}", path.display());
            None
        }
    }
}
