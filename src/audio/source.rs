//! Pull-style chunk sources consumed by the monitor worker.

use super::chunk::{AudioChunk, BYTES_PER_SAMPLE};
use crate::error::{BarkError, Result};
use std::io::{ErrorKind, Read};

/// Outcome of one pull from a [`ChunkSource`].
#[derive(Debug, PartialEq, Eq)]
pub enum ChunkRead {
    Chunk(AudioChunk),
    /// Nothing arrived within the source's poll interval.
    Pending,
    /// The stream ended; no further chunks will arrive.
    Closed,
}

/// A stream of fixed-size mono PCM chunks.
///
/// `next_chunk` is the only blocking point of the worker loop and should
/// return `Pending` within a short poll interval so stop/pause flags are
/// observed promptly. A `Decode` error drops one chunk; a `Device` error
/// ends the run.
pub trait ChunkSource {
    fn next_chunk(&mut self) -> Result<ChunkRead>;

    fn sample_rate(&self) -> u32;

    fn chunk_size(&self) -> usize;

    /// Release the underlying stream. Called once when the run stops.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> String {
        "unknown source".to_string()
    }
}

/// Reads raw little-endian s16 mono PCM from any reader, e.g. stdin fed by
/// `arecord -f S16_LE -c 1`.
pub struct PcmReaderSource<R> {
    reader: R,
    sample_rate: u32,
    chunk_size: usize,
    buf: Vec<u8>,
    next_seq: u64,
    exhausted: bool,
}

impl<R: Read> PcmReaderSource<R> {
    pub fn new(reader: R, sample_rate: u32, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            reader,
            sample_rate,
            chunk_size,
            buf: vec![0u8; chunk_size * BYTES_PER_SAMPLE],
            next_seq: 0,
            exhausted: false,
        }
    }

    fn fill(&mut self) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < self.buf.len() {
            match self.reader.read(&mut self.buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(filled)
    }
}

impl<R: Read> ChunkSource for PcmReaderSource<R> {
    fn next_chunk(&mut self) -> Result<ChunkRead> {
        if self.exhausted {
            return Ok(ChunkRead::Closed);
        }
        let filled = self
            .fill()
            .map_err(|err| BarkError::Device(format!("pcm read failed: {err}")))?;
        if filled == 0 {
            self.exhausted = true;
            return Ok(ChunkRead::Closed);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        if filled < self.buf.len() {
            // A short read only happens at end of stream.
            self.exhausted = true;
        }
        AudioChunk::from_le_bytes(seq, &self.buf[..filled], self.chunk_size).map(ChunkRead::Chunk)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn name(&self) -> String {
        "raw pcm stream".to_string()
    }
}
