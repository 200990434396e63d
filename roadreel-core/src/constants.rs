//! Centralized tuning constants for the Roadreel playback core.
//!
//! These are the defaults behind [`crate::config::EngineConfig`] and the
//! model's event placement. Overrides go through a config file; the values
//! here only change through reviewed code.

// Playback clock -----------------------------------------------------------
/// Route kilometers advanced per simulated second at 1x speed.
pub(crate) const BASE_KM_PER_SEC: f64 = 22.0 / 60.0;
pub(crate) const FRAME_DT_MIN_MS: f64 = 8.0;
pub(crate) const FRAME_DT_MAX_MS: f64 = 120.0;
/// Used for the first frame after `start()`.
pub(crate) const FRAME_DT_DEFAULT_MS: f64 = 16.0;

// Speed --------------------------------------------------------------------
pub(crate) const SPEED_MULTIPLIER_BASE: f64 = 1.0;
pub(crate) const SPEED_MULTIPLIER_MIN: f64 = 0.5;
pub(crate) const SPEED_MULTIPLIER_MAX: f64 = 3.0;
pub(crate) const SPEED_MULTIPLIER_STEP: f64 = 0.5;
/// The speed button wraps back to 1x once the multiplier reaches this value.
pub(crate) const SPEED_CYCLE_WRAP: f64 = 2.0;
pub(crate) const SPEED_MODIFIER_LIMIT: f64 = 2.5;
pub(crate) const EFFECTIVE_SPEED_FLOOR: f64 = 0.5;

// Crew resources -----------------------------------------------------------
pub(crate) const FUEL_PER_KM: f64 = 0.032;
pub(crate) const FATIGUE_PER_KM: f64 = 0.042;
pub(crate) const FATIGUE_RECOVERY_PER_SEC: f64 = 1.2;
pub(crate) const RESOURCE_MIN: f64 = 0.0;
pub(crate) const RESOURCE_MAX: f64 = 100.0;
pub(crate) const RESET_FUEL: f64 = 100.0;
pub(crate) const RESET_FATIGUE: f64 = 10.0;

// Route model --------------------------------------------------------------
pub(crate) const MIN_DRIVE_MINUTES: u32 = 60;
/// Segment length floor used when computing in-segment progress.
pub(crate) const MIN_SEGMENT_KM: f64 = 1.0;
pub(crate) const FALLBACK_TOTAL_KM: f64 = 1.0;
pub(crate) const FESTIVAL_TRIGGER_FLOOR_KM: f64 = 12.0;
pub(crate) const FESTIVAL_TRIGGER_BIAS: f64 = 0.52;
pub(crate) const FESTIVAL_MARKERS: [&str; 3] = ["除夕", "初一", "迎财神"];
pub(crate) const KM_PRECISION: i32 = 1;

// Autoplay guard -----------------------------------------------------------
pub(crate) const AUTOPLAY_WATCH_INTERVAL_SECS: f64 = 2.2;
pub(crate) const AUTOPLAY_MIN_DELTA_KM: f64 = 0.08;

// Nudges -------------------------------------------------------------------
/// Distance moved by a single arrow-key nudge.
pub const NUDGE_STEP_KM: f64 = 15.0;
/// Distance moved by the on-screen rewind/forward buttons.
pub const NUDGE_BUTTON_KM: f64 = 25.0;
