//! Debounced bark-session state machine.
//!
//! Consumes classified chunks in arrival order, groups bark-bearing chunks
//! into sessions, and decides when a session is over: either no bark for
//! longer than the debounce interval, the session hit its frame cap, or the
//! run stopped.

use super::chunk::AudioChunk;
use super::detector::BarkDetector;
use chrono::{DateTime, Local};
use std::time::Duration;

/// Timing policy for the state machine.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub chunk_duration: Duration,
    /// Silence required after the last bark before the session ends.
    pub debounce: Duration,
    /// Non-bark chunks that begin sooner than this after the last bark chunk
    /// ended are kept.
    pub grace: Duration,
    /// Hard cap on frames per session; reaching it splits the session.
    pub max_session_frames: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chunk_duration: Duration::from_secs(1),
            debounce: Duration::from_secs(10),
            grace: Duration::from_millis(500),
            max_session_frames: 600,
        }
    }
}

/// One classified chunk as seen by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub at: DateTime<Local>,
    pub intensity: u32,
    pub threshold: u32,
    pub is_bark: bool,
}

impl Observation {
    /// Classify `intensity` with the detector's calibrated threshold.
    pub fn classify(at: DateTime<Local>, intensity: u32, detector: &dyn BarkDetector) -> Self {
        Self {
            at,
            intensity,
            threshold: detector.threshold(),
            is_bark: detector.is_bark(intensity),
        }
    }

    pub fn intensity_delta(&self) -> u32 {
        self.intensity.saturating_sub(self.threshold)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Barking,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EndReason {
    Debounce,
    MaxLength,
    Stopped,
}

impl EndReason {
    pub fn label(&self) -> &'static str {
        match self {
            EndReason::Debounce => "debounce",
            EndReason::MaxLength => "max_length",
            EndReason::Stopped => "stopped",
        }
    }
}

/// A closed session handed to the persistence side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedSession {
    pub start: DateTime<Local>,
    pub last_bark: DateTime<Local>,
    pub frames: Vec<AudioChunk>,
    pub duration: Duration,
    pub reason: EndReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Started {
        start: DateTime<Local>,
        intensity_delta: u32,
    },
    Ended(FinishedSession),
}

/// Ordered chunks of the open session. Cleared only by `take`.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    chunks: Vec<AudioChunk>,
}

impl FrameBuffer {
    pub fn push(&mut self, chunk: AudioChunk) {
        self.chunks.push(chunk);
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn duration(&self, chunk_duration: Duration) -> Duration {
        chunk_duration.saturating_mul(u32::try_from(self.chunks.len()).unwrap_or(u32::MAX))
    }

    pub fn take(&mut self) -> Vec<AudioChunk> {
        std::mem::take(&mut self.chunks)
    }
}

#[derive(Debug)]
struct OpenSession {
    start: DateTime<Local>,
    last_bark: DateTime<Local>,
    frames: FrameBuffer,
}

pub struct SessionMachine {
    cfg: SessionConfig,
    open: Option<OpenSession>,
}

impl SessionMachine {
    pub fn new(cfg: SessionConfig) -> Self {
        Self { cfg, open: None }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.cfg
    }

    pub fn state(&self) -> SessionState {
        if self.open.is_some() {
            SessionState::Barking
        } else {
            SessionState::Idle
        }
    }

    pub fn buffered_frames(&self) -> usize {
        self.open.as_ref().map(|s| s.frames.len()).unwrap_or(0)
    }

    /// Feed the next chunk. Returns the transitions it caused, in order: an
    /// expired session always ends before a new one starts.
    pub fn on_chunk(&mut self, obs: Observation, chunk: AudioChunk) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if let Some(ended) = self.poll(obs.at) {
            events.push(ended);
        }

        if obs.is_bark {
            if self.buffered_frames() >= self.cfg.max_session_frames.max(1) {
                events.extend(self.close(EndReason::MaxLength).map(SessionEvent::Ended));
            }
            match self.open.as_mut() {
                Some(open) => {
                    open.last_bark = obs.at;
                    open.frames.push(chunk);
                }
                None => {
                    let mut frames = FrameBuffer::default();
                    frames.push(chunk);
                    self.open = Some(OpenSession {
                        start: obs.at,
                        last_bark: obs.at,
                        frames,
                    });
                    events.push(SessionEvent::Started {
                        start: obs.at,
                        intensity_delta: obs.intensity_delta(),
                    });
                }
            }
            return events;
        }

        // Timestamps mark when a chunk arrived, i.e. where it ends. This chunk
        // began `chunk_duration` earlier.
        let in_grace = self
            .open
            .as_ref()
            .map(|open| {
                elapsed(open.last_bark, obs.at).saturating_sub(self.cfg.chunk_duration)
                    < self.cfg.grace
            })
            .unwrap_or(false);
        if in_grace {
            if self.buffered_frames() >= self.cfg.max_session_frames.max(1) {
                events.extend(self.close(EndReason::MaxLength).map(SessionEvent::Ended));
            } else if let Some(open) = self.open.as_mut() {
                open.frames.push(chunk);
            }
        }
        events
    }

    /// End the open session if the debounce interval has passed without a
    /// bark. Also used when the source returns no chunk or the run is paused.
    pub fn poll(&mut self, now: DateTime<Local>) -> Option<SessionEvent> {
        let expired = self
            .open
            .as_ref()
            .map(|open| elapsed(open.last_bark, now) > self.cfg.debounce)
            .unwrap_or(false);
        if !expired {
            return None;
        }
        self.close(EndReason::Debounce).map(SessionEvent::Ended)
    }

    /// Close whatever is open because the run is stopping.
    pub fn finish(&mut self) -> Option<FinishedSession> {
        self.close(EndReason::Stopped)
    }

    fn close(&mut self, reason: EndReason) -> Option<FinishedSession> {
        let mut open = self.open.take()?;
        let duration = open.frames.duration(self.cfg.chunk_duration);
        Some(FinishedSession {
            start: open.start,
            last_bark: open.last_bark,
            frames: open.frames.take(),
            duration,
            reason,
        })
    }
}

/// Time from `since` to `at`, clamped at zero if the clock stepped back.
fn elapsed(since: DateTime<Local>, at: DateTime<Local>) -> Duration {
    (at - since).to_std().unwrap_or(Duration::ZERO)
}
