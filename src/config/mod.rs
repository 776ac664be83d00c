//! Command-line parsing, the optional JSON config file, and validation.

mod defaults;
mod validation;

use crate::audio::{ThresholdMode, DEFAULT_CHUNK_SIZE, DEFAULT_SAMPLE_RATE};
use crate::monitor::MonitorConfig;
use crate::storage::DEFAULT_RETENTION_DAYS;
use clap::Parser;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub use defaults::{
    DEFAULT_CALIBRATION_CHUNKS, DEFAULT_DEBOUNCE_SECONDS, DEFAULT_EVENT_WINDOW_HOURS,
    DEFAULT_GRACE_MS, DEFAULT_MAX_SESSION_SECONDS, DEFAULT_OUTPUT_FOLDER,
};

/// CLI options for the bark monitor. Validated values are safe to hand to the
/// worker as-is.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "bark-monitor",
    about = "Detect, record, and log dog barking from a microphone",
    author,
    version
)]
pub struct AppConfig {
    /// JSON file providing output_folder, threshold, debounce_seconds, retention_days
    #[arg(long = "config-file", env = "BARK_MONITOR_CONFIG", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Folder for the run aggregate, event log, and recordings
    #[arg(long = "output-folder", default_value = DEFAULT_OUTPUT_FOLDER)]
    pub output_folder: PathBuf,

    /// Bark threshold: a fixed amplitude, or "auto" to calibrate on startup
    #[arg(long, default_value_t = Threshold::Auto)]
    pub threshold: Threshold,

    /// Ambient chunks sampled when the threshold is "auto"
    #[arg(long = "calibration-chunks", default_value_t = DEFAULT_CALIBRATION_CHUNKS)]
    pub calibration_chunks: usize,

    /// Silence after the last bark that ends a session (seconds)
    #[arg(long = "debounce-seconds", default_value_t = DEFAULT_DEBOUNCE_SECONDS)]
    pub debounce_seconds: f64,

    /// Quiet audio kept after a bark (milliseconds)
    #[arg(long = "grace-ms", default_value_t = DEFAULT_GRACE_MS)]
    pub grace_ms: u64,

    /// Longest session before it is split into a new recording (seconds)
    #[arg(long = "max-session-seconds", default_value_t = DEFAULT_MAX_SESSION_SECONDS)]
    pub max_session_seconds: u64,

    /// Day buckets older than this are deleted
    #[arg(long = "retention-days", default_value_t = DEFAULT_RETENTION_DAYS)]
    pub retention_days: u32,

    /// Width of the rolling bark event log (hours)
    #[arg(long = "event-window-hours", default_value_t = DEFAULT_EVENT_WINDOW_HOURS)]
    pub event_window_hours: u64,

    /// Capture sample rate (Hz)
    #[arg(long = "sample-rate", default_value_t = DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Samples per analysed chunk
    #[arg(long = "chunk-size", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Text appended to recording file names
    #[arg(long = "recording-prefix", value_name = "TEXT")]
    pub recording_prefix: Option<String>,

    /// Preferred audio input device name
    #[arg(long = "input-device", env = "BARK_MONITOR_INPUT_DEVICE")]
    pub input_device: Option<String>,

    /// Read raw s16le mono PCM from stdin instead of a device
    #[arg(long, default_value_t = false)]
    pub stdin: bool,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Also write JSON logs to a file
    #[arg(long = "logs", env = "BARK_MONITOR_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable the log file (overrides --logs)
    #[arg(long = "no-logs", env = "BARK_MONITOR_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Log at debug level
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// `--threshold` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshold {
    Fixed(u32),
    Auto,
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Fixed(value) => write!(f, "{value}"),
            Threshold::Auto => f.write_str("auto"),
        }
    }
}

impl FromStr for Threshold {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("auto") {
            return Ok(Threshold::Auto);
        }
        raw.parse::<u32>()
            .map(Threshold::Fixed)
            .map_err(|_| format!("expected a non-negative integer or \"auto\", got '{raw}'"))
    }
}

// Config files may spell the threshold as a number or a string.
impl<'de> Deserialize<'de> for Threshold {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Ok(Threshold::Fixed(value)),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Keys accepted in `--config-file`. Unknown keys are ignored so the file can
/// be shared with other tools.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileConfig {
    pub output_folder: Option<PathBuf>,
    pub threshold: Option<Threshold>,
    pub debounce_seconds: Option<f64>,
    pub retention_days: Option<u32>,
}

impl AppConfig {
    pub fn threshold_mode(&self) -> ThresholdMode {
        match self.threshold {
            Threshold::Fixed(value) => ThresholdMode::Fixed(value),
            Threshold::Auto => ThresholdMode::Auto {
                chunks: self.calibration_chunks,
            },
        }
    }
}

impl From<&AppConfig> for MonitorConfig {
    fn from(config: &AppConfig) -> Self {
        MonitorConfig {
            output_folder: config.output_folder.clone(),
            threshold: config.threshold_mode(),
            debounce: Duration::try_from_secs_f64(config.debounce_seconds)
                .unwrap_or(Duration::from_secs(10)),
            grace: Duration::from_millis(config.grace_ms),
            max_session: Duration::from_secs(config.max_session_seconds),
            retention_days: config.retention_days,
            event_window: Duration::from_secs(config.event_window_hours * 60 * 60),
            recording_prefix: config.recording_prefix.clone(),
        }
    }
}
