//! Engine tuning loaded from JSON, with defaults from [`crate::constants`].
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::constants::{
    BASE_KM_PER_SEC, EFFECTIVE_SPEED_FLOOR, FATIGUE_PER_KM, FATIGUE_RECOVERY_PER_SEC,
    FRAME_DT_DEFAULT_MS, FRAME_DT_MAX_MS, FRAME_DT_MIN_MS, FUEL_PER_KM, RESET_FATIGUE, RESET_FUEL,
    RESOURCE_MAX, RESOURCE_MIN, SPEED_CYCLE_WRAP, SPEED_MODIFIER_LIMIT, SPEED_MULTIPLIER_MAX,
    SPEED_MULTIPLIER_MIN, SPEED_MULTIPLIER_STEP,
};

/// Errors raised when engine configuration invariants are violated.
#[derive(Debug, Error)]
pub enum EngineConfigError {
    #[error("engine config JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read engine config: {0}")]
    Io(#[from] std::io::Error),
    #[error("{field} must be greater than {min:.3} (got {value:.3})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("{field} bounds invalid (min {min:.2} > max {max:.2})")]
    BoundsInverted {
        field: &'static str,
        min: f64,
        max: f64,
    },
}

/// Rates and limits applied by the journey engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Route kilometers per simulated second at 1x.
    pub base_km_per_sec: f64,
    pub frame_dt_min_ms: f64,
    pub frame_dt_max_ms: f64,
    /// Elapsed time assumed for the first frame after `start()`.
    pub frame_dt_default_ms: f64,
    pub speed_multiplier_min: f64,
    pub speed_multiplier_max: f64,
    pub speed_multiplier_step: f64,
    pub speed_cycle_wrap: f64,
    pub speed_modifier_limit: f64,
    pub effective_speed_floor: f64,
    pub fuel_per_km: f64,
    pub fatigue_per_km: f64,
    pub fatigue_recovery_per_sec: f64,
    pub reset_fuel: f64,
    pub reset_fatigue: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_km_per_sec: BASE_KM_PER_SEC,
            frame_dt_min_ms: FRAME_DT_MIN_MS,
            frame_dt_max_ms: FRAME_DT_MAX_MS,
            frame_dt_default_ms: FRAME_DT_DEFAULT_MS,
            speed_multiplier_min: SPEED_MULTIPLIER_MIN,
            speed_multiplier_max: SPEED_MULTIPLIER_MAX,
            speed_multiplier_step: SPEED_MULTIPLIER_STEP,
            speed_cycle_wrap: SPEED_CYCLE_WRAP,
            speed_modifier_limit: SPEED_MODIFIER_LIMIT,
            effective_speed_floor: EFFECTIVE_SPEED_FLOOR,
            fuel_per_km: FUEL_PER_KM,
            fatigue_per_km: FATIGUE_PER_KM,
            fatigue_recovery_per_sec: FATIGUE_RECOVERY_PER_SEC,
            reset_fuel: RESET_FUEL,
            reset_fatigue: RESET_FATIGUE,
        }
    }
}

impl EngineConfig {
    /// Built-in tuning.
    #[must_use]
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Load and validate configuration from a JSON string.
    ///
    /// Missing fields fall back to the built-in tuning.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or a value is out of range.
    pub fn from_json(json: &str) -> Result<Self, EngineConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_path(path: &Path) -> Result<Self, EngineConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Check every value against its valid domain.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), EngineConfigError> {
        positive("base_km_per_sec", self.base_km_per_sec)?;
        positive("frame_dt_min_ms", self.frame_dt_min_ms)?;
        positive("frame_dt_default_ms", self.frame_dt_default_ms)?;
        ordered("frame_dt", self.frame_dt_min_ms, self.frame_dt_max_ms)?;
        positive("speed_multiplier_min", self.speed_multiplier_min)?;
        ordered(
            "speed_multiplier",
            self.speed_multiplier_min,
            self.speed_multiplier_max,
        )?;
        positive("speed_multiplier_step", self.speed_multiplier_step)?;
        within(
            "speed_cycle_wrap",
            self.speed_cycle_wrap,
            self.speed_multiplier_min,
            self.speed_multiplier_max,
        )?;
        within("speed_modifier_limit", self.speed_modifier_limit, 0.0, f64::MAX)?;
        positive("effective_speed_floor", self.effective_speed_floor)?;
        within("fuel_per_km", self.fuel_per_km, 0.0, RESOURCE_MAX)?;
        within("fatigue_per_km", self.fatigue_per_km, 0.0, RESOURCE_MAX)?;
        within(
            "fatigue_recovery_per_sec",
            self.fatigue_recovery_per_sec,
            0.0,
            RESOURCE_MAX,
        )?;
        within("reset_fuel", self.reset_fuel, RESOURCE_MIN, RESOURCE_MAX)?;
        within("reset_fatigue", self.reset_fatigue, RESOURCE_MIN, RESOURCE_MAX)?;
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), EngineConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineConfigError::MinViolation {
            field,
            min: 0.0,
            value,
        })
    }
}

fn within(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), EngineConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(EngineConfigError::RangeViolation {
            field,
            min,
            max,
            value,
        })
    }
}

fn ordered(field: &'static str, min: f64, max: f64) -> Result<(), EngineConfigError> {
    if min <= max {
        Ok(())
    } else {
        Err(EngineConfigError::BoundsInverted { field, min, max })
    }
}
