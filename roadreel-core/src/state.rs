//! Playback state shared through the [`Store`](crate::store::Store).
use serde::{Deserialize, Serialize};

use crate::constants::{RESET_FATIGUE, RESET_FUEL, SPEED_MULTIPLIER_BASE};
use crate::store::Patch;

/// Whether the vehicle is still on the road.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Driving,
    /// Terminal for the playback clock; only seek/reset leave it.
    Arrived,
}

/// The single value held by the journey store.
///
/// Only the engine writes it. `progress`, `day_index` and
/// `segment_progress` are derived from `km` on every commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationState {
    pub mode: Mode,
    /// Unattended playback is advancing the vehicle.
    pub auto: bool,
    pub km: f64,
    /// `km / total_km`.
    pub progress: f64,
    pub day_index: usize,
    /// Fractional position within the current day, in `[0, 1]`.
    pub segment_progress: f64,
    pub speed_multiplier: f64,
    pub speed_modifier: f64,
    pub fuel: f64,
    pub fatigue: f64,
}

impl Default for SimulationState {
    fn default() -> Self {
        Self {
            mode: Mode::Driving,
            auto: true,
            km: 0.0,
            progress: 0.0,
            day_index: 0,
            segment_progress: 0.0,
            speed_multiplier: SPEED_MULTIPLIER_BASE,
            speed_modifier: 0.0,
            fuel: RESET_FUEL,
            fatigue: RESET_FATIGUE,
        }
    }
}

impl SimulationState {
    #[must_use]
    pub fn is_arrived(&self) -> bool {
        self.mode == Mode::Arrived
    }

    /// Speed factor applied to the base rate, floored at `floor`.
    #[must_use]
    pub fn effective_speed(&self, floor: f64) -> f64 {
        (self.speed_multiplier + self.speed_modifier).max(floor)
    }
}

/// Partial update merged into a [`SimulationState`]; unset fields are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatePatch {
    pub mode: Option<Mode>,
    pub auto: Option<bool>,
    pub km: Option<f64>,
    pub progress: Option<f64>,
    pub day_index: Option<usize>,
    pub segment_progress: Option<f64>,
    pub speed_multiplier: Option<f64>,
    pub speed_modifier: Option<f64>,
    pub fuel: Option<f64>,
    pub fatigue: Option<f64>,
}

impl Patch<SimulationState> for StatePatch {
    fn apply(self, state: &mut SimulationState) {
        if let Some(mode) = self.mode {
            state.mode = mode;
        }
        if let Some(auto) = self.auto {
            state.auto = auto;
        }
        if let Some(km) = self.km {
            state.km = km;
        }
        if let Some(progress) = self.progress {
            state.progress = progress;
        }
        if let Some(day_index) = self.day_index {
            state.day_index = day_index;
        }
        if let Some(segment_progress) = self.segment_progress {
            state.segment_progress = segment_progress;
        }
        if let Some(multiplier) = self.speed_multiplier {
            state.speed_multiplier = multiplier;
        }
        if let Some(modifier) = self.speed_modifier {
            state.speed_modifier = modifier;
        }
        if let Some(fuel) = self.fuel {
            state.fuel = fuel;
        }
        if let Some(fatigue) = self.fatigue {
            state.fatigue = fatigue;
        }
    }
}
