pub const DEFAULT_OUTPUT_FOLDER: &str = "bark_output";
pub const DEFAULT_CALIBRATION_CHUNKS: usize = 100;
pub const DEFAULT_DEBOUNCE_SECONDS: f64 = 10.0;
pub const DEFAULT_GRACE_MS: u64 = 500;
pub const DEFAULT_MAX_SESSION_SECONDS: u64 = 600;
pub const DEFAULT_EVENT_WINDOW_HOURS: u64 = 48;

pub(super) const MIN_DEBOUNCE_SECONDS: f64 = 1.0;
pub(super) const MAX_DEBOUNCE_SECONDS: f64 = 600.0;
pub(super) const MAX_GRACE_MS: u64 = 1_000;
pub(super) const MIN_SAMPLE_RATE: u32 = 8_000;
pub(super) const MAX_SAMPLE_RATE: u32 = 192_000;
pub(super) const MAX_CALIBRATION_CHUNKS: usize = 10_000;
pub(super) const MAX_EVENT_WINDOW_HOURS: u64 = 24 * 366;
// Recording names are built from the prefix, so keep it to one path segment.
pub(super) const FORBIDDEN_PREFIX_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
