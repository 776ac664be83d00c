use bark_monitor::audio::{ChunkSource, PcmReaderSource, ThresholdMode};
use bark_monitor::storage::{AggregateRecorder, EventLog, OutputLayout};
use bark_monitor::{BarkMonitor, Clock, MonitorConfig, Notifier};
use chrono::{DateTime, Local, TimeZone};
use std::fs;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const SAMPLE_RATE: u32 = 8_000;
const CHUNK_SIZE: usize = 800;

struct FixedClock(DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

#[derive(Default)]
struct CollectingNotifier {
    messages: Mutex<Vec<String>>,
}

impl Notifier for CollectingNotifier {
    fn send_bark(&self, intensity_delta: u32) -> anyhow::Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push(format!("bark +{intensity_delta}"));
        Ok(())
    }

    fn send_end_bark(&self, duration: Duration) -> anyhow::Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push(format!("end {}ms", duration.as_millis()));
        Ok(())
    }

    fn send_text(&self, message: &str) -> anyhow::Result<()> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

fn started_at() -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2024, 6, 2, 21, 30, 0)
        .single()
        .unwrap()
}

/// `count` chunks whose loudest sample is `peak`.
fn chunks(count: usize, peak: i16) -> Vec<u8> {
    let mut samples = vec![0i16; CHUNK_SIZE * count];
    for chunk in samples.chunks_mut(CHUNK_SIZE) {
        chunk[CHUNK_SIZE / 2] = peak;
        chunk[CHUNK_SIZE / 4] = -peak / 2;
    }
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

fn wait_until_drained(monitor: &BarkMonitor) {
    for _ in 0..500 {
        if !monitor.is_running() {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("monitor never drained the stream");
}

#[test]
fn piped_pcm_is_calibrated_recorded_and_totalled() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = Arc::new(CollectingNotifier::default());
    let mut monitor = BarkMonitor::new(MonitorConfig {
        output_folder: dir.path().to_path_buf(),
        threshold: ThresholdMode::Auto { chunks: 10 },
        grace: Duration::ZERO,
        ..MonitorConfig::default()
    })
    .with_clock(Arc::new(FixedClock(started_at())))
    .with_notifier(notifier.clone());

    let mut pcm = chunks(10, 100);
    pcm.extend(chunks(3, 5_000));
    pcm.extend(chunks(2, 120));
    let threshold = monitor
        .record(move || {
            let source = PcmReaderSource::new(Cursor::new(pcm), SAMPLE_RATE, CHUNK_SIZE);
            Ok(Box::new(source) as Box<dyn ChunkSource>)
        })
        .unwrap();
    assert_eq!(threshold, 200);

    wait_until_drained(&monitor);
    let run = monitor.stop().unwrap().expect("a run was active");
    assert_eq!(run.total_time_barked, Duration::from_millis(300));
    assert_eq!(run.end, Some(started_at()));

    let layout = OutputLayout::new(dir.path());
    let persisted = AggregateRecorder::new(layout.run_file())
        .try_read()
        .unwrap()
        .unwrap();
    assert_eq!(persisted, run);

    let wav = layout.recording_path(started_at(), None);
    let reader = hound::WavReader::open(&wav).unwrap();
    assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
    assert_eq!(reader.len() as usize, 3 * CHUNK_SIZE);

    let log: EventLog = serde_json::from_slice(&fs::read(layout.events_file()).unwrap()).unwrap();
    assert_eq!(log.barks.len(), 3);
    assert!(log.barks.iter().all(|point| point.y == 5_000));
    assert!(log.barks.iter().all(|point| point.x > log.min));

    let messages = notifier.messages.lock().unwrap().clone();
    assert_eq!(
        messages,
        vec![
            "bark +4800".to_string(),
            "end 300ms".to_string(),
            "/audio 02-06-2024_21-30-00.wav".to_string(),
        ]
    );
}

#[test]
fn second_run_starts_a_fresh_total() {
    let dir = tempfile::tempdir().unwrap();
    let config = MonitorConfig {
        output_folder: dir.path().to_path_buf(),
        threshold: ThresholdMode::Fixed(1_000),
        grace: Duration::ZERO,
        ..MonitorConfig::default()
    };
    let mut monitor =
        BarkMonitor::new(config).with_clock(Arc::new(FixedClock(started_at())));

    for _ in 0..2 {
        let pcm = chunks(2, 3_000);
        monitor
            .record(move || {
                let source = PcmReaderSource::new(Cursor::new(pcm), SAMPLE_RATE, CHUNK_SIZE);
                Ok(Box::new(source) as Box<dyn ChunkSource>)
            })
            .unwrap();
        wait_until_drained(&monitor);
        let run = monitor.stop().unwrap().unwrap();
        assert_eq!(run.total_time_barked, Duration::from_millis(200));
    }
}
