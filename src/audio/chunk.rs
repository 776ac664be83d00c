//! PCM chunk type and the intensity analyzer.

use crate::error::{BarkError, Result};
use std::time::Duration;

/// Bytes per 16-bit sample.
pub const BYTES_PER_SAMPLE: usize = 2;

/// One fixed-size block of mono 16-bit samples, numbered in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    seq: u64,
    samples: Vec<i16>,
}

impl AudioChunk {
    pub fn new(seq: u64, samples: Vec<i16>) -> Self {
        Self { seq, samples }
    }

    /// Decode little-endian s16 PCM. The byte length must match
    /// `chunk_size` samples exactly; anything else is a malformed chunk.
    pub fn from_le_bytes(seq: u64, bytes: &[u8], chunk_size: usize) -> Result<Self> {
        let expected = chunk_size * BYTES_PER_SAMPLE;
        if bytes.len() != expected {
            return Err(BarkError::Decode {
                expected,
                actual: bytes.len(),
            });
        }
        let samples = bytes
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(Self { seq, samples })
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Loudness of the chunk. See [`intensity`].
    pub fn intensity(&self) -> u32 {
        intensity(&self.samples)
    }
}

/// Maximum absolute sample magnitude. `i16::MIN` maps to 32768, so the
/// result is widened to `u32`.
pub fn intensity(samples: &[i16]) -> u32 {
    samples
        .iter()
        .map(|s| u32::from(s.unsigned_abs()))
        .max()
        .unwrap_or(0)
}

/// Playback length of `chunk_size` samples at `sample_rate`.
pub fn chunk_duration(chunk_size: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(chunk_size as f64 / f64::from(sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity_is_max_absolute_sample() {
        assert_eq!(intensity(&[3, -40, 12]), 40);
        assert_eq!(intensity(&[i16::MIN, 5]), 32_768);
        assert_eq!(intensity(&[]), 0);
    }

    #[test]
    fn decodes_little_endian_samples() {
        let bytes = [0x01, 0x00, 0xff, 0xff, 0x00, 0x80];
        let chunk = AudioChunk::from_le_bytes(7, &bytes, 3).unwrap();
        assert_eq!(chunk.seq(), 7);
        assert_eq!(chunk.samples(), &[1, -1, i16::MIN]);
    }

    #[test]
    fn rejects_wrong_byte_length() {
        let err = AudioChunk::from_le_bytes(0, &[0u8; 5], 3).unwrap_err();
        assert!(matches!(
            err,
            BarkError::Decode {
                expected: 6,
                actual: 5
            }
        ));
    }

    #[test]
    fn chunk_duration_matches_rate() {
        assert_eq!(chunk_duration(48_000, 48_000), Duration::from_secs(1));
        assert_eq!(chunk_duration(24_000, 48_000), Duration::from_millis(500));
        assert_eq!(chunk_duration(1024, 0), Duration::ZERO);
    }
}
