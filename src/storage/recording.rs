use super::OutputLayout;
use crate::audio::AudioChunk;
use crate::error::{BarkError, Result};
use chrono::{DateTime, Local};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes finished sessions as mono 16-bit WAV files under the day bucket of
/// the session start.
#[derive(Debug, Clone)]
pub struct RecordingWriter {
    layout: OutputLayout,
    sample_rate: u32,
}

impl RecordingWriter {
    pub fn new(layout: OutputLayout, sample_rate: u32) -> Self {
        Self {
            layout,
            sample_rate,
        }
    }

    pub fn flush(&self, frames: &[AudioChunk], start: DateTime<Local>) -> Result<PathBuf> {
        self.flush_with_prefix(frames, start, None)
    }

    /// Write `frames` in order and return the final path. Existing recordings
    /// are never overwritten; a numeric suffix is added instead.
    pub fn flush_with_prefix(
        &self,
        frames: &[AudioChunk],
        start: DateTime<Local>,
        prefix: Option<&str>,
    ) -> Result<PathBuf> {
        let path = unused_path(self.layout.recording_path(start, prefix));
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|err| BarkError::persistence(dir, err))?;
        }
        let partial = path.with_extension("wav.part");
        if let Err(err) = self.write_wav(&partial, frames) {
            let _ = fs::remove_file(&partial);
            return Err(err);
        }
        fs::rename(&partial, &path).map_err(|err| {
            let _ = fs::remove_file(&partial);
            BarkError::persistence(&path, err)
        })?;
        info!(path = %path.display(), chunks = frames.len(), "recording saved");
        Ok(path)
    }

    fn write_wav(&self, path: &Path, frames: &[AudioChunk]) -> Result<()> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let as_persistence = |err: hound::Error| {
            let source = match err {
                hound::Error::IoError(err) => err,
                other => io::Error::other(other.to_string()),
            };
            BarkError::persistence(path, source)
        };
        let mut writer = WavWriter::create(path, spec).map_err(as_persistence)?;
        for chunk in frames {
            for &sample in chunk.samples() {
                writer.write_sample(sample).map_err(as_persistence)?;
            }
        }
        writer.finalize().map_err(as_persistence)
    }
}

fn unused_path(path: PathBuf) -> PathBuf {
    if !path.exists() {
        return path;
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    for n in 1u32.. {
        let candidate = path.with_file_name(format!("{stem} ({n}).wav"));
        if !candidate.exists() {
            return candidate;
        }
    }
    path
}
