//! Error taxonomy for the detection engine.
//!
//! Per-chunk and per-artifact failures (`Decode`, `Persistence`, `CorruptState`)
//! are absorbed and logged by the worker. `Calibration` and `Device` end the
//! operation that raised them and are returned to the caller.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BarkError {
    #[error("malformed audio chunk: expected {expected} bytes, got {actual}")]
    Decode { expected: usize, actual: usize },

    #[error("calibration failed: {0}")]
    Calibration(String),

    #[error("failed to persist {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unreadable state in {path}: {reason}")]
    CorruptState { path: PathBuf, reason: String },

    #[error("audio device error: {0}")]
    Device(String),
}

impl BarkError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BarkError::Persistence {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        BarkError::CorruptState {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Short label used in structured log fields.
    pub fn label(&self) -> &'static str {
        match self {
            BarkError::Decode { .. } => "decode",
            BarkError::Calibration(_) => "calibration",
            BarkError::Persistence { .. } => "persistence",
            BarkError::CorruptState { .. } => "corrupt_state",
            BarkError::Device(_) => "device",
        }
    }
}

pub type Result<T> = std::result::Result<T, BarkError>;
