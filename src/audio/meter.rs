use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Latest chunk intensity and active threshold, shared lock-free between the
/// worker and the control surface.
#[derive(Clone, Debug, Default)]
pub struct LevelMeter {
    intensity: Arc<AtomicU32>,
    threshold: Arc<AtomicU32>,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_intensity(&self, intensity: u32) {
        self.intensity.store(intensity, Ordering::Relaxed);
    }

    pub fn intensity(&self) -> u32 {
        self.intensity.load(Ordering::Relaxed)
    }

    pub fn set_threshold(&self, threshold: u32) {
        self.threshold.store(threshold, Ordering::Relaxed);
    }

    pub fn threshold(&self) -> u32 {
        self.threshold.load(Ordering::Relaxed)
    }

    /// Clear both readings once the stream is closed.
    pub fn reset(&self) {
        self.set_intensity(0);
        self.set_threshold(0);
    }
}
