//! Quality bounds, supported extensions and console text

pub const DEFAULT_MIN_QUALITY: u8 = 10;
pub const DEFAULT_MAX_QUALITY: u8 = 95;
pub const MIN_QUALITY: u8 = 1;
pub const MAX_QUALITY: u8 = 100;

/// Extensions the batch walker will attempt, compared case-insensitively.
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

pub const PROGRESS_SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";
pub const SPINNER_TICK_MS: u64 = 100;

// Qualities sampled by `probe` when no step is given
pub const DEFAULT_PROBE_STEP: u8 = 5;

// Common output message prefixes
pub const SCAN_PREFIX: &str = "📁";
pub const START_PREFIX: &str = "⏳";
pub const SKIP_PREFIX: &str = "⏭️ ";
pub const UNSUPPORTED_PREFIX: &str = "➖";
pub const SUMMARY_PREFIX: &str = "📊";
pub const OUTPUT_PREFIX: &str = "📦";
pub const TIME_PREFIX: &str = "⏱️ ";
pub const SUCCESS_PREFIX: &str = "✅";
