//! System microphone capture via CPAL.
//!
//! Opens the input device at the configured sample rate and delivers mono
//! 16-bit chunks. The device callback only downmixes and enqueues; all
//! classification and file I/O happen on the worker that pulls chunks.

use super::chunk::AudioChunk;
use super::dispatch::{f32_to_i16, u16_to_i16, FrameDispatcher};
use super::source::{ChunkRead, ChunkSource};
use crate::error::{BarkError, Result};
use crate::lock_or_recover;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, Stream, StreamConfig, SupportedStreamConfig};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How long `next_chunk` waits before reporting `Pending`.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Chunks buffered between the device callback and the worker.
const CHUNK_CHANNEL_CAPACITY: usize = 32;

/// Audio input device wrapper.
pub struct Recorder {
    device: cpal::Device,
}

impl Recorder {
    /// List microphone names so the CLI can expose a human-friendly selector.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|err| BarkError::Device(format!("no input devices available: {err}")))?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Create a recorder, optionally forcing a specific device so users can pick
    /// the right microphone when a machine exposes multiple inputs.
    pub fn new(preferred_device: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();
        let device = match preferred_device {
            Some(name) => {
                let mut devices = host.input_devices().map_err(|err| {
                    BarkError::Device(format!("no input devices available: {err}"))
                })?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| BarkError::Device(format!("input device '{name}' not found")))?
            }
            None => host.default_input_device().ok_or_else(|| {
                BarkError::Device(format!(
                    "no default input device available. {}",
                    mic_permission_hint()
                ))
            })?,
        };
        Ok(Self { device })
    }

    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string())
    }

    /// Open a stream delivering `chunk_size`-sample chunks at `sample_rate`.
    pub fn open(self, sample_rate: u32, chunk_size: usize) -> Result<CpalSource> {
        let supported = self.pick_config(sample_rate)?;
        let format = supported.sample_format();
        let stream_config: StreamConfig = supported.into();
        let channels = usize::from(stream_config.channels.max(1));
        let device_name = self.device_name();

        info!(
            device = %device_name,
            ?format,
            sample_rate,
            channels,
            chunk_size,
            "opening input stream"
        );

        let (sender, receiver) = bounded::<AudioChunk>(CHUNK_CHANNEL_CAPACITY);
        let dropped = Arc::new(AtomicUsize::new(0));
        let dispatcher = Arc::new(Mutex::new(FrameDispatcher::new(
            chunk_size,
            sender,
            dropped.clone(),
        )));

        let device_lost = Arc::new(AtomicBool::new(false));
        let stream = match format {
            SampleFormat::I16 => {
                let dispatcher = dispatcher.clone();
                let dropped = dropped.clone();
                self.device.build_input_stream(
                    &stream_config,
                    move |data: &[i16], _| {
                        if let Ok(mut pump) = dispatcher.try_lock() {
                            pump.push(data, channels, |sample| sample);
                        } else {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    stream_error_handler(device_lost.clone()),
                    None,
                )
            }
            SampleFormat::F32 => {
                let dispatcher = dispatcher.clone();
                let dropped = dropped.clone();
                self.device.build_input_stream(
                    &stream_config,
                    move |data: &[f32], _| {
                        if let Ok(mut pump) = dispatcher.try_lock() {
                            pump.push(data, channels, f32_to_i16);
                        } else {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    stream_error_handler(device_lost.clone()),
                    None,
                )
            }
            SampleFormat::U16 => {
                let dispatcher = dispatcher.clone();
                let dropped = dropped.clone();
                self.device.build_input_stream(
                    &stream_config,
                    move |data: &[u16], _| {
                        if let Ok(mut pump) = dispatcher.try_lock() {
                            pump.push(data, channels, u16_to_i16);
                        } else {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    stream_error_handler(device_lost.clone()),
                    None,
                )
            }
            other => {
                return Err(BarkError::Device(format!(
                    "unsupported sample format: {other:?}"
                )))
            }
        }
        .map_err(|err| BarkError::Device(format!("failed to build input stream: {err}")))?;

        stream
            .play()
            .map_err(|err| BarkError::Device(format!("failed to start input stream: {err}")))?;

        Ok(CpalSource {
            stream: Some(stream),
            receiver,
            dispatcher,
            dropped,
            device_lost,
            reported_drops: 0,
            sample_rate,
            chunk_size,
            poll_interval: DEFAULT_POLL_INTERVAL,
            device_name,
        })
    }

    /// Find a mono-or-wider config that supports `sample_rate`, preferring
    /// native 16-bit input.
    fn pick_config(&self, sample_rate: u32) -> Result<SupportedStreamConfig> {
        let ranges: Vec<_> = self
            .device
            .supported_input_configs()
            .map_err(|err| BarkError::Device(format!("cannot query input configs: {err}")))?
            .filter(|range| {
                range.min_sample_rate().0 <= sample_rate && sample_rate <= range.max_sample_rate().0
            })
            .collect();
        let rank = |format: SampleFormat| match format {
            SampleFormat::I16 => 0,
            SampleFormat::F32 => 1,
            SampleFormat::U16 => 2,
            _ => 3,
        };
        ranges
            .into_iter()
            .min_by_key(|range| (rank(range.sample_format()), range.channels()))
            .map(|range| range.with_sample_rate(SampleRate(sample_rate)))
            .ok_or_else(|| {
                BarkError::Device(format!(
                    "'{}' does not support {sample_rate} Hz input",
                    self.device_name()
                ))
            })
    }
}

/// Keep stream errors out of the callback path: log them, and flag a lost
/// device so the worker ends the run on its next pull.
fn stream_error_handler(
    device_lost: Arc<AtomicBool>,
) -> impl FnMut(cpal::StreamError) + Send + 'static {
    move |err| {
        error!("audio stream error: {err}");
        if matches!(err, cpal::StreamError::DeviceNotAvailable) {
            device_lost.store(true, Ordering::Relaxed);
        }
    }
}

fn mic_permission_hint() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "macOS: System Settings > Privacy & Security > Microphone (enable your terminal)."
    }
    #[cfg(target_os = "linux")]
    {
        "Linux: check PipeWire/PulseAudio/ALSA permissions and ensure the device is not muted."
    }
    #[cfg(target_os = "windows")]
    {
        "Windows: Settings > Privacy & Security > Microphone (allow access for your terminal)."
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        "Check OS microphone permissions."
    }
}

/// Live microphone stream. Must be created on the thread that consumes it.
pub struct CpalSource {
    stream: Option<Stream>,
    receiver: Receiver<AudioChunk>,
    dispatcher: Arc<Mutex<FrameDispatcher>>,
    dropped: Arc<AtomicUsize>,
    device_lost: Arc<AtomicBool>,
    reported_drops: usize,
    sample_rate: u32,
    chunk_size: usize,
    poll_interval: Duration,
    device_name: String,
}

impl CpalSource {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn dropped_chunks(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    fn report_drops(&mut self) {
        let dropped = self.dropped_chunks();
        if dropped > self.reported_drops {
            warn!(
                dropped = dropped - self.reported_drops,
                total = dropped,
                "audio chunks dropped; worker is falling behind"
            );
            self.reported_drops = dropped;
        }
    }
}

impl ChunkSource for CpalSource {
    fn next_chunk(&mut self) -> Result<ChunkRead> {
        if self.stream.is_none() {
            return Ok(ChunkRead::Closed);
        }
        if self.device_lost.load(Ordering::Relaxed) {
            return Err(BarkError::Device(format!(
                "input device '{}' is no longer available",
                self.device_name
            )));
        }
        self.report_drops();
        match self.receiver.recv_timeout(self.poll_interval) {
            Ok(chunk) => Ok(ChunkRead::Chunk(chunk)),
            Err(RecvTimeoutError::Timeout) => Ok(ChunkRead::Pending),
            Err(RecvTimeoutError::Disconnected) => Err(BarkError::Device(
                "audio stream disconnected".to_string(),
            )),
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn close(&mut self) -> Result<()> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };
        let paused = stream.pause();
        drop(stream);
        // Release any partial chunk still held by the callback side.
        lock_or_recover(&self.dispatcher, "cpal dispatcher").reset();
        debug!(device = %self.device_name, "input stream closed");
        paused.map_err(|err| BarkError::Device(format!("failed to pause audio stream: {err}")))
    }

    fn name(&self) -> String {
        self.device_name.clone()
    }
}

impl Drop for CpalSource {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!("{err}");
        }
    }
}
