//! Stall watchdog that turns unattended playback back on.
//!
//! A host that loses focus (backgrounded tab, sleeping display) can leave the
//! vehicle parked with `auto` off. The guard samples the position once per
//! watch interval and asks for a resume when a driving vehicle has barely
//! moved since the previous sample.
use std::time::Duration;

use crate::constants::{AUTOPLAY_MIN_DELTA_KM, AUTOPLAY_WATCH_INTERVAL_SECS};
use crate::state::{Mode, SimulationState};

#[derive(Debug, Clone, PartialEq)]
pub struct AutoplayGuard {
    interval: Duration,
    min_delta_km: f64,
    since_sample: Duration,
    last_km: f64,
}

impl AutoplayGuard {
    /// Guard with the stock 2.2 s interval and 0.08 km threshold.
    #[must_use]
    pub fn new(initial_km: f64) -> Self {
        Self::with_limits(
            initial_km,
            Duration::from_secs_f64(AUTOPLAY_WATCH_INTERVAL_SECS),
            AUTOPLAY_MIN_DELTA_KM,
        )
    }

    #[must_use]
    pub const fn with_limits(initial_km: f64, interval: Duration, min_delta_km: f64) -> Self {
        Self {
            interval,
            min_delta_km,
            since_sample: Duration::ZERO,
            last_km: initial_km,
        }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Account for `elapsed` host time and sample `state` if an interval
    /// boundary was crossed.
    ///
    /// Returns `true` when playback should be resumed. Several boundaries
    /// crossed in one call still produce a single sample.
    pub fn observe(&mut self, elapsed: Duration, state: &SimulationState) -> bool {
        self.since_sample += elapsed;
        if self.interval.is_zero() || self.since_sample < self.interval {
            return false;
        }
        let whole = self.since_sample.as_nanos() / self.interval.as_nanos();
        let consumed = self.interval.as_nanos() * whole;
        let leftover = self.since_sample.as_nanos() - consumed;
        self.since_sample = Duration::from_nanos(u64::try_from(leftover).unwrap_or(0));

        let moved = (state.km - self.last_km).abs();
        self.last_km = state.km;
        let stalled = state.mode == Mode::Driving && moved < self.min_delta_km;
        if stalled {
            log::debug!("autoplay guard: moved {moved:.3} km in {:?}; resuming", self.interval);
        }
        stalled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(km: f64) -> SimulationState {
        SimulationState {
            km,
            ..SimulationState::default()
        }
    }

    #[test]
    fn quiet_until_interval_elapses() {
        let mut guard = AutoplayGuard::new(0.0);
        assert!(!guard.observe(Duration::from_secs(2), &at(0.0)));
        assert!(guard.observe(Duration::from_millis(300), &at(0.0)));
    }

    #[test]
    fn moving_vehicle_is_left_alone() {
        let mut guard = AutoplayGuard::new(0.0);
        assert!(!guard.observe(Duration::from_secs(3), &at(0.8)));
        assert!(!guard.observe(Duration::from_secs(3), &at(1.6)));
        assert!(guard.observe(Duration::from_secs(3), &at(1.6)));
    }

    #[test]
    fn arrived_vehicle_never_resumes() {
        let mut guard = AutoplayGuard::new(100.0);
        let arrived = SimulationState {
            mode: Mode::Arrived,
            km: 100.0,
            ..SimulationState::default()
        };
        assert!(!guard.observe(Duration::from_secs(5), &arrived));
    }

    #[test]
    fn long_gap_samples_once_and_keeps_remainder() {
        let mut guard = AutoplayGuard::with_limits(0.0, Duration::from_secs(2), 0.08);
        assert!(guard.observe(Duration::from_secs(7), &at(0.0)));
        // 1 s carried over from the long gap.
        assert!(guard.observe(Duration::from_secs(1), &at(0.0)));
    }
}
