mod cli_utils;
mod signals;

use anyhow::{Context, Result};
use bark_monitor::audio::{ChunkSource, PcmReaderSource, Recorder};
use bark_monitor::config::AppConfig;
use bark_monitor::monitor::SourceOpener;
use bark_monitor::notify::format_duration;
use bark_monitor::{telemetry, BarkMonitor, LogNotifier, MonitorConfig};
use cli_utils::list_input_devices;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

const CONTROL_POLL_INTERVAL: Duration = Duration::from_millis(200);

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    if config.list_input_devices {
        list_input_devices()?;
        return Ok(());
    }

    telemetry::init_tracing(&config);
    if telemetry::file_logging_enabled(&config) {
        info!(path = %telemetry::tracing_log_path().display(), "writing trace log");
    }
    signals::install_handlers()?;

    let mut monitor =
        BarkMonitor::new(MonitorConfig::from(&config)).with_notifier(Arc::new(LogNotifier));
    let threshold = monitor
        .record(source_opener(&config))
        .context("failed to start bark monitor")?;
    info!(
        threshold,
        output = %config.output_folder.display(),
        "listening for barks (Ctrl-C to stop, SIGUSR1 to pause/resume)"
    );

    while monitor.is_running() && !signals::stop_requested() {
        if signals::take_pause_toggle() {
            if monitor.is_paused() {
                monitor.resume();
            } else {
                monitor.pause();
            }
        }
        thread::sleep(CONTROL_POLL_INTERVAL);
    }

    match monitor.stop() {
        Ok(Some(run)) => {
            info!(
                "run finished: {} of barking recorded",
                format_duration(run.total_time_barked)
            );
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) => {
            warn!(error = %err, "monitor stopped with error");
            Err(err.into())
        }
    }
}

/// The stream is opened on the worker thread, so only the settings travel.
fn source_opener(config: &AppConfig) -> SourceOpener {
    let sample_rate = config.sample_rate;
    let chunk_size = config.chunk_size;
    if config.stdin {
        return Box::new(move || {
            let source = PcmReaderSource::new(io::stdin(), sample_rate, chunk_size);
            Ok(Box::new(source) as Box<dyn ChunkSource>)
        });
    }
    let device = config.input_device.clone();
    Box::new(move || {
        let source = Recorder::new(device.as_deref())?.open(sample_rate, chunk_size)?;
        Ok(Box::new(source) as Box<dyn ChunkSource>)
    })
}
