use super::chunk::AudioChunk;
use crossbeam_channel::{Sender, TrySendError};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Downmix interleaved input to mono i16 using the provided converter, so
/// chunks are single-channel regardless of the microphone layout.
pub(super) fn append_downmixed_samples<T, F>(
    buf: &mut Vec<i16>,
    data: &[T],
    channels: usize,
    mut convert: F,
) where
    T: Copy,
    F: FnMut(T) -> i16,
{
    if channels <= 1 {
        buf.extend(data.iter().copied().map(&mut convert));
        return;
    }

    let mut acc = 0i32;
    let mut count = 0usize;
    for sample in data.iter().copied() {
        acc += i32::from(convert(sample));
        count += 1;
        if count == channels {
            buf.push((acc / channels as i32) as i16);
            acc = 0;
            count = 0;
        }
    }
    if count > 0 {
        buf.push((acc / count as i32) as i16);
    }
}

pub(super) fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

pub(super) fn u16_to_i16(sample: u16) -> i16 {
    (i32::from(sample) - 32_768) as i16
}

/// Cuts the callback's sample stream into fixed-size chunks and hands them to
/// the worker without blocking. A full channel drops the chunk and counts it.
pub(super) struct FrameDispatcher {
    chunk_size: usize,
    pending: Vec<i16>,
    scratch: Vec<i16>,
    next_seq: u64,
    sender: Sender<AudioChunk>,
    dropped: Arc<AtomicUsize>,
}

impl FrameDispatcher {
    pub(super) fn new(
        chunk_size: usize,
        sender: Sender<AudioChunk>,
        dropped: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            pending: Vec::with_capacity(chunk_size),
            scratch: Vec::new(),
            next_seq: 0,
            sender,
            dropped,
        }
    }

    /// Drop any samples that have not yet filled a chunk.
    pub(super) fn reset(&mut self) {
        self.pending.clear();
    }

    pub(super) fn push<T, F>(&mut self, data: &[T], channels: usize, convert: F)
    where
        T: Copy,
        F: FnMut(T) -> i16,
    {
        self.scratch.clear();
        append_downmixed_samples(&mut self.scratch, data, channels, convert);
        self.pending.extend_from_slice(&self.scratch);

        while self.pending.len() >= self.chunk_size {
            let samples: Vec<i16> = self.pending.drain(..self.chunk_size).collect();
            let chunk = AudioChunk::new(self.next_seq, samples);
            self.next_seq += 1;
            if let Err(err) = self.sender.try_send(chunk) {
                match err {
                    TrySendError::Full(_) => {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    TrySendError::Disconnected(_) => break,
                }
            }
        }
    }
}
