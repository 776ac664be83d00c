//! Audio intake and bark detection.
//!
//! Chunks of mono 16-bit PCM arrive from a [`ChunkSource`] (a live CPAL device
//! or a raw PCM stream), are reduced to an intensity, classified against a
//! threshold, and grouped into bark sessions by the [`SessionMachine`].

/// Sample rate used when none is configured.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Samples per chunk when none is configured (one second at the default rate).
pub const DEFAULT_CHUNK_SIZE: usize = 48_000;

mod chunk;
mod detector;
mod dispatch;
mod meter;
mod recorder;
mod session;
mod source;

pub use chunk::{chunk_duration, intensity, AudioChunk, BYTES_PER_SAMPLE};
pub use detector::{
    calibrate, calibration_stall_limit, AmplitudeDetector, BarkDetector, ThresholdMode,
    MIN_CALIBRATION_PENDING_POLLS,
};
pub use meter::LevelMeter;
pub use recorder::{CpalSource, Recorder, DEFAULT_POLL_INTERVAL};
pub use session::{
    EndReason, FinishedSession, FrameBuffer, Observation, SessionConfig, SessionEvent,
    SessionMachine, SessionState,
};
pub use source::{ChunkRead, ChunkSource, PcmReaderSource};
