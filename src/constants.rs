//! Project-wide constants used across multiple modules.
//!
//! This module centralizes the gesture timings, routing defaults and compressor
//! settings so the classifier, the routing graph and the configuration layer
//! agree on the same values.

use std::time::Duration;

/// Window within which repeated taps on one track accumulate (count policy)
pub const CLICK_WINDOW: Duration = Duration::from_millis(600);

/// Delay before a lone tap is classified (deferred policy)
pub const DOUBLE_TAP_DELAY: Duration = Duration::from_millis(220);

/// Tap count at which the count policy emits a restart
pub const RESTART_TAP_COUNT: u32 = 3;

/// Fixed dynamics settings for the normalization stage.
pub const COMPRESSOR_THRESHOLD_DB: f32 = -24.0;
pub const COMPRESSOR_KNEE_DB: f32 = 30.0;
pub const COMPRESSOR_RATIO: f32 = 12.0;
pub const COMPRESSOR_ATTACK_SECS: f32 = 0.003;
pub const COMPRESSOR_RELEASE_SECS: f32 = 0.25;

/// Gain range exposed by the UI; the routing core itself never clamps
pub const GAIN_MIN: f32 = 0.0;
pub const GAIN_MAX: f32 = 2.0;
pub const GAIN_STEP: f32 = 0.1;

/// Volume range exposed by the UI
pub const VOLUME_MIN: f32 = 0.0;
pub const VOLUME_MAX: f32 = 1.0;
pub const VOLUME_STEP: f32 = 0.05;

/// Number of track buttons per grid row
pub const GRID_COLUMNS: usize = 5;

/// Supported audio file extensions for catalog sources
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "flac", "mp3", "m4a", "ogg"];

/// Default log destination while the terminal UI owns stdout
pub const DEFAULT_LOG_FILE: &str = "/tmp/tap-trainer.log";
