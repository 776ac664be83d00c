//! Bark classification: threshold calibration and the per-chunk decision.

use super::chunk::{chunk_duration, AudioChunk};
use super::recorder::DEFAULT_POLL_INTERVAL;
use super::source::{ChunkRead, ChunkSource};
use crate::error::{BarkError, Result};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fewest consecutive empty polls tolerated while calibrating, however short
/// the chunks are.
pub const MIN_CALIBRATION_PENDING_POLLS: usize = 50;

/// Slack on top of two chunk lengths before a quiet stream is given up on.
const CALIBRATION_STALL_SLACK: Duration = Duration::from_secs(1);

/// Consecutive `Pending` reads allowed before calibration treats the stream
/// as unavailable. Each `Pending` stands for one poll interval of waiting, so
/// the budget covers two full chunks plus slack.
pub fn calibration_stall_limit(chunk: Duration, poll_interval: Duration) -> usize {
    let window = chunk
        .saturating_mul(2)
        .saturating_add(CALIBRATION_STALL_SLACK);
    let poll_nanos = poll_interval.as_nanos().max(1);
    let polls = window.as_nanos().div_ceil(poll_nanos);
    usize::try_from(polls)
        .unwrap_or(usize::MAX)
        .max(MIN_CALIBRATION_PENDING_POLLS)
}

/// How the bark threshold is obtained for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdMode {
    /// Use this amplitude as-is. Zero disables detection.
    Fixed(u32),
    /// Sample `chunks` chunks of ambient noise and use twice the loudest.
    Auto { chunks: usize },
}

/// Detection strategy selected at startup.
///
/// # Threshold Contract
/// `calibrate` runs once before the first chunk is classified and the
/// resulting threshold stays fixed until `reset`. A threshold of zero must
/// classify every chunk as non-bark.
pub trait BarkDetector: Send {
    fn calibrate(&mut self, source: &mut dyn ChunkSource) -> Result<u32>;

    fn intensity(&self, chunk: &AudioChunk) -> u32;

    fn is_bark(&self, intensity: u32) -> bool;

    fn classify(&self, chunk: &AudioChunk) -> bool {
        self.is_bark(self.intensity(chunk))
    }

    fn threshold(&self) -> u32;

    fn reset(&mut self);

    fn name(&self) -> &'static str {
        "unknown_detector"
    }
}

/// Amplitude trigger: a chunk is a bark when its peak magnitude reaches the
/// threshold.
#[derive(Debug, Clone)]
pub struct AmplitudeDetector {
    mode: ThresholdMode,
    threshold: u32,
}

impl AmplitudeDetector {
    pub fn new(mode: ThresholdMode) -> Self {
        Self { mode, threshold: 0 }
    }

    pub fn mode(&self) -> ThresholdMode {
        self.mode
    }
}

impl BarkDetector for AmplitudeDetector {
    fn calibrate(&mut self, source: &mut dyn ChunkSource) -> Result<u32> {
        self.threshold = match self.mode {
            ThresholdMode::Fixed(value) => value,
            ThresholdMode::Auto { chunks } => calibrate(source, chunks)?,
        };
        if self.threshold == 0 {
            warn!("bark threshold is zero; detection is disabled for this run");
        }
        Ok(self.threshold)
    }

    fn intensity(&self, chunk: &AudioChunk) -> u32 {
        chunk.intensity()
    }

    fn is_bark(&self, intensity: u32) -> bool {
        self.threshold != 0 && intensity >= self.threshold
    }

    fn threshold(&self) -> u32 {
        self.threshold
    }

    fn reset(&mut self) {
        self.threshold = 0;
    }

    fn name(&self) -> &'static str {
        "amplitude"
    }
}

/// Read `sample_count` chunks of ambient noise and return twice the loudest
/// intensity seen.
///
/// Malformed chunks are skipped. A stream that closes early is accepted as
/// long as at least one chunk was measured; a stream that yields nothing is a
/// calibration failure and detection must not start.
pub fn calibrate(source: &mut dyn ChunkSource, sample_count: usize) -> Result<u32> {
    let sample_count = sample_count.max(1);
    let stall_limit = calibration_stall_limit(
        chunk_duration(source.chunk_size(), source.sample_rate()),
        DEFAULT_POLL_INTERVAL,
    );
    let mut measured = 0usize;
    let mut loudest = 0u32;
    let mut pending_polls = 0usize;

    while measured < sample_count {
        match source.next_chunk() {
            Ok(ChunkRead::Chunk(chunk)) => {
                pending_polls = 0;
                measured += 1;
                loudest = loudest.max(chunk.intensity());
            }
            Ok(ChunkRead::Pending) => {
                pending_polls += 1;
                if pending_polls >= stall_limit {
                    warn!(pending_polls, "no audio while calibrating");
                    break;
                }
            }
            Ok(ChunkRead::Closed) => break,
            Err(BarkError::Decode { expected, actual }) => {
                debug!(expected, actual, "skipping malformed chunk during calibration");
            }
            Err(err) => {
                return Err(BarkError::Calibration(format!(
                    "stream failed after {measured} chunks: {err}"
                )))
            }
        }
    }

    if measured == 0 {
        return Err(BarkError::Calibration(format!(
            "no audio received from {}",
            source.name()
        )));
    }
    if measured < sample_count {
        warn!(
            measured,
            requested = sample_count,
            "calibration stream ended early"
        );
    }
    let threshold = loudest.saturating_mul(2);
    info!(measured, ambient_peak = loudest, threshold, "calibrated bark threshold");
    Ok(threshold)
}
