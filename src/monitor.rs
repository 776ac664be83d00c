//! Background worker that pulls audio chunks, detects barks, and persists
//! sessions, plus the control surface (`record`/`pause`/`resume`/`stop`)
//! the caller drives it with.
//!
//! All detection state lives on the worker thread. The control side only
//! flips two atomic flags and joins the thread, so nothing on the detection
//! path needs a lock.

use crate::audio::{
    chunk_duration, AmplitudeDetector, AudioChunk, BarkDetector, ChunkRead, ChunkSource,
    FinishedSession, LevelMeter, Observation, SessionConfig, SessionEvent, SessionMachine,
    ThresholdMode,
};
use crate::error::{BarkError, Result};
use crate::notify::{Notifier, RemoteSync};
use crate::storage::{
    sweep, AggregateRecorder, OutputLayout, RecordingRun, RecordingWriter, RollingEventStore,
    DEFAULT_EVENT_WINDOW, DEFAULT_RETENTION_DAYS,
};
use chrono::{DateTime, Local};
use crossbeam_channel::{bounded, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Source factory run on the worker thread. Live device streams are not
/// `Send`, so they have to be opened where they are consumed.
pub type SourceOpener = Box<dyn FnOnce() -> Result<Box<dyn ChunkSource>> + Send>;

/// Wall-clock abstraction so sessions can be timed deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Library-facing settings for one monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub output_folder: PathBuf,
    pub threshold: ThresholdMode,
    pub debounce: Duration,
    pub grace: Duration,
    /// Longest single session before it is split.
    pub max_session: Duration,
    pub retention_days: u32,
    pub event_window: Duration,
    /// Appended to recording file names when set.
    pub recording_prefix: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            output_folder: PathBuf::from("bark_output"),
            threshold: ThresholdMode::Auto { chunks: 100 },
            debounce: Duration::from_secs(10),
            grace: Duration::from_millis(500),
            max_session: Duration::from_secs(600),
            retention_days: DEFAULT_RETENTION_DAYS,
            event_window: DEFAULT_EVENT_WINDOW,
            recording_prefix: None,
        }
    }
}

impl MonitorConfig {
    /// State machine timing for a source delivering `chunk_size` samples at
    /// `sample_rate`.
    pub fn session_config(&self, chunk_size: usize, sample_rate: u32) -> SessionConfig {
        let chunk = chunk_duration(chunk_size, sample_rate);
        let max_session_frames = if chunk.is_zero() {
            usize::MAX
        } else {
            usize::try_from(self.max_session.as_nanos().div_ceil(chunk.as_nanos()))
                .unwrap_or(usize::MAX)
                .max(1)
        };
        SessionConfig {
            chunk_duration: chunk,
            debounce: self.debounce,
            grace: self.grace,
            max_session_frames,
        }
    }
}

struct WorkerExit {
    detector: Box<dyn BarkDetector>,
    result: Result<()>,
}

/// Owns the worker thread for at most one run at a time.
pub struct BarkMonitor {
    cfg: MonitorConfig,
    layout: OutputLayout,
    detector: Option<Box<dyn BarkDetector>>,
    notifier: Option<Arc<dyn Notifier>>,
    remote: Option<Arc<dyn RemoteSync>>,
    clock: Arc<dyn Clock>,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    meter: LevelMeter,
    worker: Option<JoinHandle<WorkerExit>>,
}

impl BarkMonitor {
    pub fn new(cfg: MonitorConfig) -> Self {
        let layout = OutputLayout::new(&cfg.output_folder);
        let detector: Box<dyn BarkDetector> = Box::new(AmplitudeDetector::new(cfg.threshold));
        Self {
            cfg,
            layout,
            detector: Some(detector),
            notifier: None,
            remote: None,
            clock: Arc::new(SystemClock),
            running: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            meter: LevelMeter::new(),
            worker: None,
        }
    }

    pub fn with_detector(mut self, detector: Box<dyn BarkDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_remote_sync(mut self, remote: Arc<dyn RemoteSync>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.cfg
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Latest chunk intensity and active threshold.
    pub fn meter(&self) -> LevelMeter {
        self.meter.clone()
    }

    /// True from a successful `record` until `stop` or the source closing.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Start a run: open the source and calibrate on the worker thread, then
    /// return the threshold in use. Calibration and device failures are
    /// returned here and leave the monitor stopped.
    pub fn record<F>(&mut self, open_source: F) -> Result<u32>
    where
        F: FnOnce() -> Result<Box<dyn ChunkSource>> + Send + 'static,
    {
        if self.worker.is_some() {
            warn!("record requested while a run is active; ignoring");
            return Ok(self.meter.threshold());
        }
        let detector = self.take_detector();
        let (ready_tx, ready_rx) = bounded(1);
        let worker = Worker {
            cfg: self.cfg.clone(),
            layout: self.layout.clone(),
            detector,
            notifier: self.notifier.clone(),
            clock: self.clock.clone(),
            running: self.running.clone(),
            paused: self.paused.clone(),
            meter: self.meter.clone(),
        };
        self.paused.store(false, Ordering::Release);
        self.running.store(true, Ordering::Release);
        let handle = thread::spawn(move || worker.run(Box::new(open_source), ready_tx));

        match ready_rx.recv() {
            Ok(Ok(threshold)) => {
                self.worker = Some(handle);
                info!(threshold, "recording started");
                Ok(threshold)
            }
            Ok(Err(err)) => {
                self.running.store(false, Ordering::Release);
                let _ = self.reclaim(handle);
                Err(err)
            }
            Err(_) => {
                self.running.store(false, Ordering::Release);
                let _ = self.reclaim(handle);
                Err(BarkError::Device(
                    "monitor worker exited before the stream was ready".to_string(),
                ))
            }
        }
    }

    /// Keep the stream open but discard chunks until `resume`.
    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::AcqRel) {
            info!("bark detection paused");
        }
    }

    pub fn resume(&self) {
        if self.paused.swap(false, Ordering::AcqRel) {
            info!("bark detection resumed");
        }
    }

    /// Stop the worker, flush any open session, close the run, and hand it
    /// to the remote sync target. Returns the closed run, or `None` when no
    /// run was active.
    pub fn stop(&mut self) -> Result<Option<RecordingRun>> {
        let Some(handle) = self.worker.take() else {
            return Ok(None);
        };
        self.running.store(false, Ordering::Release);
        let result = self.reclaim(handle);
        self.paused.store(false, Ordering::Release);

        let aggregate = AggregateRecorder::new(self.layout.run_file());
        let run = match aggregate.close(self.clock.now()) {
            Ok(run) => {
                info!(
                    total_time_barked_secs = run.total_time_barked.as_secs_f64(),
                    "recording stopped"
                );
                self.sync_remote(&run);
                Some(run)
            }
            Err(err) => {
                warn!(error = %err, "failed to close run aggregate");
                None
            }
        };
        result.map(|()| run)
    }

    fn take_detector(&mut self) -> Box<dyn BarkDetector> {
        self.detector
            .take()
            .unwrap_or_else(|| Box::new(AmplitudeDetector::new(self.cfg.threshold)))
    }

    /// Join the worker and keep its detector for the next run.
    fn reclaim(&mut self, handle: JoinHandle<WorkerExit>) -> Result<()> {
        match handle.join() {
            Ok(exit) => {
                self.detector = Some(exit.detector);
                exit.result
            }
            Err(_) => {
                error!("monitor worker panicked");
                self.meter.reset();
                Err(BarkError::Device("monitor worker panicked".to_string()))
            }
        }
    }

    fn sync_remote(&self, run: &RecordingRun) {
        let Some(remote) = self.remote.as_deref() else {
            return;
        };
        if let Err(err) = remote.sync_run(run) {
            warn!("remote sync of run failed: {err:#}");
        }
        if let Err(err) = remote.sync_audio(&self.layout.audio_dir()) {
            warn!("remote sync of audio failed: {err:#}");
        }
    }
}

impl Drop for BarkMonitor {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(err) = self.stop() {
                warn!(error = %err, "monitor stopped with error");
            }
        }
    }
}

struct Worker {
    cfg: MonitorConfig,
    layout: OutputLayout,
    detector: Box<dyn BarkDetector>,
    notifier: Option<Arc<dyn Notifier>>,
    clock: Arc<dyn Clock>,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    meter: LevelMeter,
}

impl Worker {
    fn run(mut self, open_source: SourceOpener, ready: Sender<Result<u32>>) -> WorkerExit {
        let mut source = match open_source() {
            Ok(source) => source,
            Err(err) => return self.abort(err, ready),
        };
        info!(source = %source.name(), detector = self.detector.name(), "calibrating");
        let threshold = match self.detector.calibrate(source.as_mut()) {
            Ok(threshold) => threshold,
            Err(err) => {
                close_source(source.as_mut());
                return self.abort(err, ready);
            }
        };
        self.meter.set_threshold(threshold);

        let aggregate = AggregateRecorder::new(self.layout.run_file());
        if let Err(err) = aggregate.begin(self.clock.now()) {
            warn!(error = %err, "failed to open run aggregate");
        }
        let mut pipeline = Pipeline {
            machine: SessionMachine::new(
                self.cfg
                    .session_config(source.chunk_size(), source.sample_rate()),
            ),
            writer: RecordingWriter::new(self.layout.clone(), source.sample_rate()),
            aggregate,
            events: RollingEventStore::open(self.layout.events_file(), self.cfg.event_window),
            audio_dir: self.layout.audio_dir(),
            retention_days: self.cfg.retention_days,
            prefix: self.cfg.recording_prefix.clone(),
            notifier: self.notifier.clone(),
        };
        let _ = ready.send(Ok(threshold));

        let mut result = self.pump(source.as_mut(), &mut pipeline);
        if let Some(session) = pipeline.machine.finish() {
            pipeline.session_ended(session, self.clock.now());
        }
        if let Err(err) = source.close() {
            error!(error = %err, "failed to close audio source");
            result = result.and(Err(err));
        }
        self.detector.reset();
        self.meter.reset();
        self.running.store(false, Ordering::Release);
        WorkerExit {
            detector: self.detector,
            result,
        }
    }

    fn abort(mut self, err: BarkError, ready: Sender<Result<u32>>) -> WorkerExit {
        error!(kind = err.label(), "failed to start recording: {err}");
        self.detector.reset();
        let _ = ready.send(Err(err));
        WorkerExit {
            detector: self.detector,
            result: Ok(()),
        }
    }

    fn pump(&self, source: &mut dyn ChunkSource, pipeline: &mut Pipeline) -> Result<()> {
        while self.running.load(Ordering::Acquire) {
            let read = match source.next_chunk() {
                Ok(read) => read,
                Err(err @ BarkError::Decode { .. }) => {
                    debug!(error = %err, "dropping malformed chunk");
                    continue;
                }
                Err(err) => {
                    error!(kind = err.label(), "audio source failed: {err}");
                    return Err(err);
                }
            };
            let now = self.clock.now();
            match read {
                // Paused: the chunk is discarded, but an open session can still expire.
                ChunkRead::Chunk(_) if self.paused.load(Ordering::Acquire) => pipeline.poll(now),
                ChunkRead::Chunk(chunk) => self.process(chunk, now, pipeline),
                ChunkRead::Pending => pipeline.poll(now),
                ChunkRead::Closed => {
                    info!("audio source closed");
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    fn process(&self, chunk: AudioChunk, now: DateTime<Local>, pipeline: &mut Pipeline) {
        let intensity = self.detector.intensity(&chunk);
        self.meter.set_intensity(intensity);
        let obs = Observation::classify(now, intensity, self.detector.as_ref());
        for event in pipeline.machine.on_chunk(obs, chunk) {
            pipeline.apply(event, now);
        }
        if obs.is_bark {
            debug!(intensity, threshold = obs.threshold, "bark chunk");
            pipeline.events.add(now, intensity);
            pipeline.save_events(now);
        }
    }
}

fn close_source(source: &mut dyn ChunkSource) {
    if let Err(err) = source.close() {
        warn!(error = %err, "failed to close audio source");
    }
}

/// Per-run detection state and its persistence side effects.
struct Pipeline {
    machine: SessionMachine,
    writer: RecordingWriter,
    aggregate: AggregateRecorder,
    events: RollingEventStore,
    audio_dir: PathBuf,
    retention_days: u32,
    prefix: Option<String>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Pipeline {
    fn poll(&mut self, now: DateTime<Local>) {
        if let Some(event) = self.machine.poll(now) {
            self.apply(event, now);
        }
    }

    fn apply(&mut self, event: SessionEvent, now: DateTime<Local>) {
        match event {
            SessionEvent::Started {
                start,
                intensity_delta,
            } => {
                info!(%start, intensity_delta, "bark session started");
                self.notify("bark", |n| n.send_bark(intensity_delta));
            }
            SessionEvent::Ended(session) => self.session_ended(session, now),
        }
    }

    /// Session-end side effects, in order: accrue duration, notify, write
    /// the recording, then persist the event log and sweep old buckets.
    fn session_ended(&mut self, session: FinishedSession, now: DateTime<Local>) {
        info!(
            start = %session.start,
            frames = session.frames.len(),
            duration_secs = session.duration.as_secs_f64(),
            reason = session.reason.label(),
            "bark session ended"
        );
        if let Err(err) = self.aggregate.update(session.duration, now) {
            warn!(error = %err, "failed to update run aggregate");
        }
        self.notify("end_bark", |n| n.send_end_bark(session.duration));

        match self
            .writer
            .flush_with_prefix(&session.frames, session.start, self.prefix.as_deref())
        {
            Ok(path) => {
                if let Some(name) = path.file_name() {
                    let message = format!("/audio {}", name.to_string_lossy());
                    self.notify("text", |n| n.send_text(&message));
                }
            }
            Err(err) => warn!(error = %err, "recording lost"),
        }

        self.save_events(now);
        match sweep(&self.audio_dir, self.retention_days, now) {
            Ok(removed) if !removed.is_empty() => {
                debug!(removed = removed.len(), "retention sweep removed day buckets");
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "retention sweep failed"),
        }
    }

    fn save_events(&mut self, now: DateTime<Local>) {
        if let Err(err) = self.events.save(now) {
            warn!(error = %err, "failed to save bark event log");
        }
    }

    fn notify(&self, kind: &str, send: impl FnOnce(&dyn Notifier) -> anyhow::Result<()>) {
        let Some(notifier) = self.notifier.as_deref() else {
            return;
        };
        if let Err(err) = send(notifier) {
            warn!(notification = kind, "notification failed: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ManualClock {
        now: Mutex<Option<DateTime<Local>>>,
    }

    impl ManualClock {
        fn set(&self, at: DateTime<Local>) {
            *self.now.lock().unwrap() = Some(at);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Local> {
            self.now.lock().unwrap().unwrap_or_else(base)
        }
    }

    fn base() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 6, 2, 22, 0, 0)
            .single()
            .unwrap()
    }

    /// Yields one chunk per second of scripted time and moves the clock along.
    struct TimedSource {
        clock: Arc<ManualClock>,
        peaks: VecDeque<i16>,
        seq: u64,
    }

    impl ChunkSource for TimedSource {
        fn next_chunk(&mut self) -> Result<ChunkRead> {
            let Some(peak) = self.peaks.pop_front() else {
                return Ok(ChunkRead::Closed);
            };
            self.clock
                .set(base() + chrono::Duration::seconds(self.seq as i64));
            let chunk = AudioChunk::new(self.seq, vec![0, peak, -peak / 2, 0]);
            self.seq += 1;
            Ok(ChunkRead::Chunk(chunk))
        }

        fn sample_rate(&self) -> u32 {
            4
        }

        fn chunk_size(&self) -> usize {
            4
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn send_bark(&self, intensity_delta: u32) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(format!("bark {intensity_delta}"));
            Ok(())
        }

        fn send_end_bark(&self, duration: Duration) -> anyhow::Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push(format!("end {}", duration.as_secs()));
            Ok(())
        }

        fn send_text(&self, message: &str) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    fn config(dir: &std::path::Path) -> MonitorConfig {
        MonitorConfig {
            output_folder: dir.to_path_buf(),
            threshold: ThresholdMode::Fixed(1_000),
            debounce: Duration::from_secs(5),
            grace: Duration::ZERO,
            ..MonitorConfig::default()
        }
    }

    fn wait_for_idle(monitor: &BarkMonitor) {
        for _ in 0..500 {
            if !monitor.is_running() {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("worker did not drain the source");
    }

    #[test]
    fn session_config_derives_frame_cap_from_chunk_length() {
        let cfg = MonitorConfig {
            max_session: Duration::from_secs(600),
            ..MonitorConfig::default()
        };
        let session = cfg.session_config(48_000, 48_000);
        assert_eq!(session.chunk_duration, Duration::from_secs(1));
        assert_eq!(session.max_session_frames, 600);
        assert_eq!(cfg.session_config(1_000, 0).max_session_frames, usize::MAX);
        assert_eq!(cfg.session_config(48_000 * 700, 48_000).max_session_frames, 1);
    }

    #[test]
    fn monitor_records_sessions_and_closes_run() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let mut monitor = BarkMonitor::new(config(dir.path()))
            .with_clock(clock.clone())
            .with_notifier(notifier.clone());

        // Two barks, a long silence, then a final bark left open at the end.
        let mut peaks = vec![2_000i16, 2_000];
        peaks.extend([10; 8]);
        peaks.push(1_500);
        let source = TimedSource {
            clock: clock.clone(),
            peaks: peaks.into(),
            seq: 0,
        };
        let threshold = monitor
            .record(move || Ok(Box::new(source) as Box<dyn ChunkSource>))
            .unwrap();
        assert_eq!(threshold, 1_000);

        wait_for_idle(&monitor);
        let run = monitor.stop().unwrap().unwrap();
        assert_eq!(run.total_time_barked, Duration::from_secs(3));
        assert!(run.end.is_some());

        let sent = notifier.sent.lock().unwrap().clone();
        assert_eq!(sent[0], "bark 1000");
        assert_eq!(sent[1], "end 2");
        assert_eq!(sent[2], "/audio 02-06-2024_22-00-00.wav");
        assert_eq!(sent[3], "bark 500");
        assert_eq!(sent[4], "end 1");
        assert_eq!(sent[5], "/audio 02-06-2024_22-00-10.wav");

        let day = dir.path().join("audio/02-06-2024");
        assert!(day.join("02-06-2024_22-00-00.wav").exists());
        assert!(day.join("02-06-2024_22-00-10.wav").exists());
        let events = RollingEventStore::open(monitor.layout().events_file(), DEFAULT_EVENT_WINDOW);
        assert_eq!(events.events().len(), 3);
        assert_eq!(monitor.meter().threshold(), 0);
    }

    #[test]
    fn monitor_without_notifier_still_persists() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::default());
        let mut monitor = BarkMonitor::new(config(dir.path())).with_clock(clock.clone());
        let source = TimedSource {
            clock,
            peaks: vec![3_000i16; 4].into(),
            seq: 0,
        };
        monitor
            .record(move || Ok(Box::new(source) as Box<dyn ChunkSource>))
            .unwrap();
        wait_for_idle(&monitor);
        let run = monitor.stop().unwrap().unwrap();
        assert_eq!(run.total_time_barked, Duration::from_secs(4));
    }

    #[test]
    fn failed_calibration_is_returned_from_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut monitor = BarkMonitor::new(MonitorConfig {
            threshold: ThresholdMode::Auto { chunks: 10 },
            ..config(dir.path())
        });
        let clock = Arc::new(ManualClock::default());
        let source = TimedSource {
            clock,
            peaks: VecDeque::new(),
            seq: 0,
        };
        let err = monitor
            .record(move || Ok(Box::new(source) as Box<dyn ChunkSource>))
            .unwrap_err();
        assert!(matches!(err, BarkError::Calibration(_)));
        assert!(!monitor.is_running());
        assert!(monitor.stop().unwrap().is_none());
    }

    #[test]
    fn device_error_from_opener_is_returned_from_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut monitor = BarkMonitor::new(config(dir.path()));
        let err = monitor
            .record(|| Err(BarkError::Device("no microphone".to_string())))
            .unwrap_err();
        assert!(matches!(err, BarkError::Device(_)));
        assert!(!monitor.is_running());
    }

    #[test]
    fn pause_and_resume_toggle_flag() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = BarkMonitor::new(config(dir.path()));
        assert!(!monitor.is_paused());
        monitor.pause();
        assert!(monitor.is_paused());
        monitor.resume();
        assert!(!monitor.is_paused());
    }

    #[test]
    fn stop_hands_closed_run_to_remote_sync() {
        #[derive(Default)]
        struct Remote {
            runs: Mutex<Vec<RecordingRun>>,
            dirs: Mutex<Vec<PathBuf>>,
        }

        impl RemoteSync for Remote {
            fn sync_run(&self, run: &RecordingRun) -> anyhow::Result<()> {
                self.runs.lock().unwrap().push(run.clone());
                Ok(())
            }

            fn sync_audio(&self, audio_dir: &std::path::Path) -> anyhow::Result<()> {
                self.dirs.lock().unwrap().push(audio_dir.to_path_buf());
                anyhow::bail!("remote unreachable")
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::default());
        let remote = Arc::new(Remote::default());
        let mut monitor = BarkMonitor::new(config(dir.path()))
            .with_clock(clock.clone())
            .with_remote_sync(remote.clone());
        let source = TimedSource {
            clock,
            peaks: vec![10i16; 3].into(),
            seq: 0,
        };
        monitor
            .record(move || Ok(Box::new(source) as Box<dyn ChunkSource>))
            .unwrap();
        wait_for_idle(&monitor);
        let run = monitor.stop().unwrap().unwrap();

        let runs = remote.runs.lock().unwrap();
        assert_eq!(runs.as_slice(), &[run]);
        assert!(runs[0].end.is_some());
        assert_eq!(
            remote.dirs.lock().unwrap().as_slice(),
            &[dir.path().join("audio")]
        );
    }
}
