use super::defaults::{
    FORBIDDEN_PREFIX_CHARS, MAX_CALIBRATION_CHUNKS, MAX_DEBOUNCE_SECONDS, MAX_EVENT_WINDOW_HOURS,
    MAX_GRACE_MS, MAX_SAMPLE_RATE, MIN_DEBOUNCE_SECONDS, MIN_SAMPLE_RATE,
};
use super::{AppConfig, FileConfig};
use anyhow::{bail, Context, Result};
use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches};
use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::time::Duration;

impl AppConfig {
    /// Parse CLI arguments, merge the config file, and validate right away.
    pub fn parse_args() -> Result<Self> {
        let matches = Self::command().get_matches();
        Self::from_matches(&matches)
    }

    /// Same as [`AppConfig::parse_args`] over an explicit argument list.
    pub fn try_load_from<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        Self::from_matches(&matches)
    }

    fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let mut config = Self::from_arg_matches(matches)?;
        if let Some(path) = config.config_file.clone() {
            let file = load_file_config(&path)?;
            config.merge_file(file, |id| given_explicitly(matches, id));
        }
        config.validate()?;
        Ok(config)
    }

    /// Apply config-file values to every setting `is_explicit` reports as not
    /// given on the command line.
    pub fn merge_file(&mut self, file: FileConfig, is_explicit: impl Fn(&str) -> bool) {
        if let Some(folder) = file.output_folder.filter(|_| !is_explicit("output_folder")) {
            self.output_folder = folder;
        }
        if let Some(threshold) = file.threshold.filter(|_| !is_explicit("threshold")) {
            self.threshold = threshold;
        }
        if let Some(debounce) = file
            .debounce_seconds
            .filter(|_| !is_explicit("debounce_seconds"))
        {
            self.debounce_seconds = debounce;
        }
        if let Some(days) = file
            .retention_days
            .filter(|_| !is_explicit("retention_days"))
        {
            self.retention_days = days;
        }
    }

    /// Check CLI values against their supported ranges.
    pub fn validate(&mut self) -> Result<()> {
        if !self.debounce_seconds.is_finite()
            || !(MIN_DEBOUNCE_SECONDS..=MAX_DEBOUNCE_SECONDS).contains(&self.debounce_seconds)
        {
            bail!(
                "--debounce-seconds must be between {MIN_DEBOUNCE_SECONDS} and {MAX_DEBOUNCE_SECONDS}, got {}",
                self.debounce_seconds
            );
        }
        if self.grace_ms > MAX_GRACE_MS {
            bail!(
                "--grace-ms must be between 0 and {MAX_GRACE_MS}, got {}",
                self.grace_ms
            );
        }
        if Duration::from_millis(self.grace_ms).as_secs_f64() >= self.debounce_seconds {
            bail!("--grace-ms must be shorter than --debounce-seconds");
        }
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            bail!(
                "--sample-rate must be between {MIN_SAMPLE_RATE} and {MAX_SAMPLE_RATE} Hz, got {}",
                self.sample_rate
            );
        }
        if self.chunk_size == 0 || self.chunk_size > self.sample_rate as usize * 10 {
            bail!(
                "--chunk-size must be between 1 and ten seconds of audio ({} samples), got {}",
                self.sample_rate as usize * 10,
                self.chunk_size
            );
        }
        if !(1..=MAX_CALIBRATION_CHUNKS).contains(&self.calibration_chunks) {
            bail!(
                "--calibration-chunks must be between 1 and {MAX_CALIBRATION_CHUNKS}, got {}",
                self.calibration_chunks
            );
        }
        if self.max_session_seconds == 0 {
            bail!("--max-session-seconds must be at least 1");
        }
        if self.retention_days == 0 {
            bail!("--retention-days must be at least 1");
        }
        if !(1..=MAX_EVENT_WINDOW_HOURS).contains(&self.event_window_hours) {
            bail!(
                "--event-window-hours must be between 1 and {MAX_EVENT_WINDOW_HOURS}, got {}",
                self.event_window_hours
            );
        }
        if self.stdin && self.input_device.is_some() {
            bail!("--stdin and --input-device cannot be combined");
        }

        if let Some(prefix) = &mut self.recording_prefix {
            let trimmed = prefix.trim();
            if trimmed.len() > 64
                || trimmed.chars().any(char::is_control)
                || trimmed.chars().any(|ch| FORBIDDEN_PREFIX_CHARS.contains(&ch))
            {
                bail!(
                    "--recording-prefix must be <=64 characters with no control or path characters"
                );
            }
            *prefix = trimmed.to_string();
        }
        if self.recording_prefix.as_deref() == Some("") {
            self.recording_prefix = None;
        }

        Ok(())
    }
}

fn given_explicitly(matches: &ArgMatches, id: &str) -> bool {
    matches!(
        matches.value_source(id),
        Some(ValueSource::CommandLine | ValueSource::EnvVariable)
    )
}

pub(super) fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("config file '{}' is not valid JSON", path.display()))
}
