//! Time-driven playback over a [`JourneyModel`].
//!
//! The engine is the single writer of the journey [`Store`]. Each frame it
//! advances the vehicle, derives the dependent fields, commits the snapshot
//! and then fires every narrative event whose trigger the committed position
//! has reached. Operator jumps (seek, nudge, reset, jump-to-day) move the
//! vehicle without firing anything; they recompute the event cursor from the
//! new position instead.
use std::rc::Rc;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::constants::{
    KM_PRECISION, MIN_SEGMENT_KM, RESOURCE_MAX, RESOURCE_MIN, SPEED_MULTIPLIER_BASE,
};
use crate::model::{JourneyModel, NarrativeEvent};
use crate::numbers::{clamp_finite, round_to};
use crate::scheduler::{FrameHandle, FrameScheduler, ManualScheduler};
use crate::state::{Mode, SimulationState};
use crate::store::{Store, StoreReader};

/// Callback invoked once per crossed narrative event.
pub type EventHandler = Box<dyn FnMut(&NarrativeEvent, &SimulationState)>;

/// Options for [`JourneyEngine::seek_to_km`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeekOptions {
    /// Resume unattended playback after the jump.
    pub auto: bool,
}

/// Direction for [`JourneyEngine::step_speed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedStep {
    Faster,
    Slower,
}

/// Recompute `progress`, `day_index`, `segment_progress` and the committed
/// one-decimal `km` from `next.km`.
///
/// Arrived states are pinned to the end of the route with playback off.
#[must_use]
pub fn derive(model: &JourneyModel, next: SimulationState) -> SimulationState {
    let total_km = model.total_km();
    let mut km = round_to(model.clamp_km(next.km), KM_PRECISION).min(total_km);
    let mut auto = next.auto;
    if next.mode == Mode::Arrived {
        km = total_km;
        auto = false;
    }

    let day_index = model.day_index_by_km(km);
    let segment_progress = model.segments().get(day_index).map_or(0.0, |segment| {
        let span = (segment.end_km - segment.start_km).max(MIN_SEGMENT_KM);
        clamp_finite((km - segment.start_km) / span, 0.0, 1.0)
    });

    SimulationState {
        auto,
        km,
        progress: km / total_km,
        day_index,
        segment_progress,
        ..next
    }
}

/// Playback controller owning the journey store and the frame clock.
pub struct JourneyEngine<F: FrameScheduler = ManualScheduler> {
    model: Rc<JourneyModel>,
    store: Store<SimulationState>,
    config: EngineConfig,
    scheduler: F,
    on_event: Option<EventHandler>,
    running: bool,
    pending_frame: Option<FrameHandle>,
    last_frame_at: Option<Duration>,
    event_cursor: usize,
    // Unrounded position; the store only ever sees the one-decimal value.
    odometer_km: f64,
}

impl<F: FrameScheduler> JourneyEngine<F> {
    /// Take ownership of `store` and play `model` through it.
    ///
    /// Every narrative event at or beyond the store's starting position is
    /// still pending, so an event anchored at 0 km fires on the first tick.
    #[must_use]
    pub fn new(model: Rc<JourneyModel>, store: Store<SimulationState>, scheduler: F) -> Self {
        let odometer_km = store.with_state(|state| model.clamp_km(state.km));
        Self {
            model,
            store,
            config: EngineConfig::default_config(),
            scheduler,
            on_event: None,
            running: false,
            pending_frame: None,
            last_frame_at: None,
            event_cursor: 0,
            odometer_km,
        }
    }

    /// Replace the tuning. The config is not validated here; out-of-range
    /// or inverted bounds still clamp without panicking.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Register the narrative event callback, replacing any previous one.
    #[must_use]
    pub fn with_event_handler(
        mut self,
        handler: impl FnMut(&NarrativeEvent, &SimulationState) + 'static,
    ) -> Self {
        self.on_event = Some(Box::new(handler));
        self
    }

    pub fn set_event_handler(
        &mut self,
        handler: impl FnMut(&NarrativeEvent, &SimulationState) + 'static,
    ) {
        self.on_event = Some(Box::new(handler));
    }

    #[must_use]
    pub fn model(&self) -> &JourneyModel {
        &self.model
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read-only store handle for renderers.
    #[must_use]
    pub fn reader(&self) -> StoreReader<SimulationState> {
        self.store.reader()
    }

    #[must_use]
    pub fn state(&self) -> SimulationState {
        self.store.get_state()
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub const fn scheduler(&self) -> &F {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut F {
        &mut self.scheduler
    }

    /// Begin requesting frames. No-op while already running.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.last_frame_at = None;
        self.pending_frame = Some(self.scheduler.request_frame());
        log::debug!("playback clock started");
    }

    /// Stop the clock and cancel the outstanding frame. Safe to repeat.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        if let Some(handle) = self.pending_frame.take() {
            self.scheduler.cancel_frame(handle);
        }
        log::debug!("playback clock stopped");
    }

    /// Deliver a scheduled frame at host time `timestamp`.
    ///
    /// Returns `false` (and does nothing) when the engine is stopped or the
    /// handle is not the frame it is waiting on.
    pub fn frame(&mut self, handle: FrameHandle, timestamp: Duration) -> bool {
        if !self.running || self.pending_frame != Some(handle) {
            log::debug!("ignoring stale frame {handle:?}");
            return false;
        }
        self.pending_frame = None;

        let elapsed_ms = self.last_frame_at.map_or(self.config.frame_dt_default_ms, |prev| {
            timestamp.saturating_sub(prev).as_secs_f64() * 1000.0
        });
        self.last_frame_at = Some(timestamp);
        self.tick(elapsed_ms / 1000.0);

        if self.running {
            self.pending_frame = Some(self.scheduler.request_frame());
        }
        true
    }

    /// Run one tick for `elapsed` without going through the scheduler.
    ///
    /// The elapsed time is clamped into the configured frame bounds exactly as
    /// a scheduled frame would be.
    pub fn advance(&mut self, elapsed: Duration) {
        self.tick(elapsed.as_secs_f64());
    }

    fn tick(&mut self, elapsed_secs: f64) {
        let dt_ms = clamp_finite(
            elapsed_secs * 1000.0,
            self.config.frame_dt_min_ms,
            self.config.frame_dt_max_ms,
        );
        let dt = dt_ms / 1000.0;

        let mut next = self.store.get_state();
        next.km = self.odometer_km;
        if next.mode == Mode::Driving {
            if next.auto {
                let speed = next.effective_speed(self.config.effective_speed_floor);
                let delta_km = self.config.base_km_per_sec * speed * dt;
                next.km += delta_km;
                next.fuel = clamp_resource(next.fuel - delta_km * self.config.fuel_per_km);
                next.fatigue = clamp_resource(next.fatigue + delta_km * self.config.fatigue_per_km);
            } else {
                next.fatigue =
                    clamp_resource(next.fatigue - self.config.fatigue_recovery_per_sec * dt);
            }
        }
        self.odometer_km = self.model.clamp_km(next.km);

        let committed = self.commit(next);
        self.fire_crossed(&committed);

        let total_km = self.model.total_km();
        if committed.mode == Mode::Driving && committed.km >= total_km {
            self.odometer_km = total_km;
            self.commit(SimulationState {
                mode: Mode::Arrived,
                auto: false,
                ..committed
            });
            log::info!("arrived at end of route ({total_km} km)");
        }
    }

    fn fire_crossed(&mut self, snapshot: &SimulationState) {
        let model = Rc::clone(&self.model);
        while let Some(event) = model.events().get(self.event_cursor) {
            if snapshot.km < event.trigger_km {
                break;
            }
            log::info!(
                "narrative event {} at {:.1} km ({})",
                event.id,
                snapshot.km,
                event.payload.title
            );
            if let Some(handler) = self.on_event.as_mut() {
                handler(event, snapshot);
            }
            self.event_cursor += 1;
        }
    }

    fn commit(&self, next: SimulationState) -> SimulationState {
        let derived = derive(&self.model, next);
        log::trace!(
            "commit km={:.1} day={} mode={:?} auto={}",
            derived.km,
            derived.day_index,
            derived.mode,
            derived.auto
        );
        self.store.set_state(derived.clone());
        derived
    }

    /// Move to `km`, commit `next` there and resynchronize the cursor.
    fn reposition(&mut self, next: SimulationState, km: f64) -> SimulationState {
        self.odometer_km = self.model.clamp_km(km);
        let committed = self.commit(SimulationState {
            km: self.odometer_km,
            ..next
        });
        self.event_cursor = self.model.events_resolved_at(committed.km);
        log::debug!(
            "repositioned to {:.1} km; {} events resolved",
            committed.km,
            self.event_cursor
        );
        committed
    }

    pub fn set_auto(&mut self, auto: bool) {
        let next = SimulationState {
            auto,
            km: self.odometer_km,
            ..self.store.get_state()
        };
        self.commit(next);
    }

    pub fn toggle_auto(&mut self) {
        let auto = self.store.with_state(|state| state.auto);
        self.set_auto(!auto);
    }

    /// Set the speed multiplier, clamped into the configured bounds.
    pub fn set_speed_multiplier(&mut self, multiplier: f64) {
        let speed_multiplier = clamp_finite(
            multiplier,
            self.config.speed_multiplier_min,
            self.config.speed_multiplier_max,
        );
        let next = SimulationState {
            speed_multiplier,
            km: self.odometer_km,
            ..self.store.get_state()
        };
        self.commit(next);
    }

    /// Speed button: step up by one increment, wrapping to 1x at the cap.
    pub fn cycle_speed(&mut self) {
        let current = self.store.with_state(|state| state.speed_multiplier);
        let next = if current >= self.config.speed_cycle_wrap {
            SPEED_MULTIPLIER_BASE
        } else {
            current + self.config.speed_multiplier_step
        };
        self.set_speed_multiplier(next);
    }

    pub fn step_speed(&mut self, step: SpeedStep) {
        let current = self.store.with_state(|state| state.speed_multiplier);
        let delta = match step {
            SpeedStep::Faster => self.config.speed_multiplier_step,
            SpeedStep::Slower => -self.config.speed_multiplier_step,
        };
        self.set_speed_multiplier(current + delta);
    }

    /// Terrain or mood adjustment added to the multiplier.
    pub fn set_speed_modifier(&mut self, modifier: f64) {
        let limit = self.config.speed_modifier_limit;
        let next = SimulationState {
            speed_modifier: clamp_finite(modifier, -limit, limit),
            km: self.odometer_km,
            ..self.store.get_state()
        };
        self.commit(next);
    }

    /// Move by `delta_km` and pause playback. Fires nothing.
    ///
    /// Nudging back from the end of the route leaves the arrived mode.
    pub fn nudge_km(&mut self, delta_km: f64) {
        let delta_km = if delta_km.is_finite() { delta_km } else { 0.0 };
        let target = self.model.clamp_km(self.odometer_km + delta_km);
        let current = self.store.get_state();
        let mode = if target < self.model.total_km() {
            Mode::Driving
        } else {
            current.mode
        };
        self.reposition(
            SimulationState {
                mode,
                auto: false,
                ..current
            },
            target,
        );
    }

    /// Jump to `km` and resume driving. Fires nothing.
    pub fn seek_to_km(&mut self, km: f64, options: SeekOptions) {
        let next = SimulationState {
            mode: Mode::Driving,
            auto: options.auto,
            ..self.store.get_state()
        };
        self.reposition(next, km);
    }

    /// Restart at `km` with fresh crew resources and playback paused.
    pub fn reset_to_km(&mut self, km: f64) {
        let next = SimulationState {
            mode: Mode::Driving,
            auto: false,
            fuel: self.config.reset_fuel,
            fatigue: self.config.reset_fatigue,
            speed_modifier: 0.0,
            ..self.store.get_state()
        };
        self.reposition(next, km);
    }

    /// [`Self::reset_to_km`] at the start of the route.
    pub fn reset(&mut self) {
        self.reset_to_km(0.0);
    }

    /// Reset to the end of the day with `day_id`. Returns `false` for an
    /// unknown day.
    pub fn jump_to_day(&mut self, day_id: u32) -> bool {
        let Some(end_km) = self.model.segment_by_day_id(day_id).map(|s| s.end_km) else {
            log::warn!("jump_to_day: no day with id {day_id}");
            return false;
        };
        self.reset_to_km(end_km);
        true
    }
}

impl JourneyEngine<ManualScheduler> {
    /// Deliver the oldest queued frame at `timestamp`.
    ///
    /// Returns `false` when nothing was queued or the frame was stale.
    pub fn pump(&mut self, timestamp: Duration) -> bool {
        match self.scheduler.next_due() {
            Some(handle) => self.frame(handle, timestamp),
            None => false,
        }
    }
}

fn clamp_resource(value: f64) -> f64 {
    clamp_finite(value, RESOURCE_MIN, RESOURCE_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itinerary::{DayPlan, Itinerary};
    use std::cell::RefCell;

    const FRAME: Duration = Duration::from_millis(120);

    fn day(id: u32, drive: &str) -> DayPlan {
        DayPlan {
            id,
            title: format!("Day {id}"),
            drive: drive.to_string(),
            sleep: format!("Town {id}"),
            ..DayPlan::default()
        }
    }

    fn two_day_model() -> Rc<JourneyModel> {
        Rc::new(JourneyModel::new(Itinerary {
            days: vec![day(1, "40km 1h"), day(2, "60km 1h")],
            ..Itinerary::default()
        }))
    }

    type Fired = Rc<RefCell<Vec<(String, f64)>>>;

    fn engine_with_log(model: Rc<JourneyModel>) -> (JourneyEngine, Fired) {
        let fired: Fired = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&fired);
        let store = Store::new(SimulationState::default());
        let engine = JourneyEngine::new(model, store, ManualScheduler::new())
            .with_event_handler(move |event, state| {
                sink.borrow_mut().push((event.id.clone(), state.km));
            });
        (engine, fired)
    }

    fn drive_until_arrived(engine: &mut JourneyEngine, max_ticks: usize) {
        for _ in 0..max_ticks {
            if engine.state().is_arrived() {
                return;
            }
            engine.advance(FRAME);
        }
    }

    #[test]
    fn derive_is_idempotent() {
        let model = two_day_model();
        let raw = SimulationState {
            km: 57.36,
            ..SimulationState::default()
        };
        let once = derive(&model, raw);
        let twice = derive(&model, once.clone());
        assert_eq!(once, twice);
        assert!((once.km - 57.4).abs() < 1e-9);
        assert_eq!(once.day_index, 1);
        assert!((once.progress - 0.574).abs() < 1e-9);
    }

    #[test]
    fn derive_pins_arrived_state() {
        let model = two_day_model();
        let state = derive(
            &model,
            SimulationState {
                mode: Mode::Arrived,
                auto: true,
                km: 12.0,
                ..SimulationState::default()
            },
        );
        assert!((state.km - 100.0).abs() < f64::EPSILON);
        assert!(!state.auto);
        assert!((state.segment_progress - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn forward_play_fires_each_arrival_once_and_arrives() {
        let (mut engine, fired) = engine_with_log(two_day_model());
        engine.set_speed_multiplier(3.0);
        drive_until_arrived(&mut engine, 5_000);

        let state = engine.state();
        assert!(state.is_arrived());
        assert!(!state.auto);
        assert!((state.km - 100.0).abs() < f64::EPSILON);

        let fired = fired.borrow();
        let ids: Vec<&str> = fired.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["arrival_1", "arrival_2"]);
        assert!(fired[0].1 >= 40.0 && fired[0].1 < 40.3);
        assert!((fired[1].1 - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn arrived_engine_stays_put() {
        let (mut engine, fired) = engine_with_log(two_day_model());
        engine.seek_to_km(99.9, SeekOptions { auto: true });
        drive_until_arrived(&mut engine, 50);
        let count = fired.borrow().len();
        for _ in 0..20 {
            engine.advance(FRAME);
        }
        assert!(engine.state().is_arrived());
        assert_eq!(fired.borrow().len(), count);
    }

    #[test]
    fn scrub_fires_nothing_then_resume_fires_crossed_arrival() {
        let (mut engine, fired) = engine_with_log(two_day_model());
        engine.seek_to_km(90.0, SeekOptions::default());
        engine.nudge_km(-60.0);
        assert!(fired.borrow().is_empty());
        assert!((engine.state().km - 30.0).abs() < f64::EPSILON);
        assert!(!engine.state().auto);

        engine.set_auto(true);
        engine.set_speed_multiplier(3.0);
        for _ in 0..200 {
            engine.advance(FRAME);
        }
        let fired = fired.borrow();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0, "arrival_1");
    }

    #[test]
    fn seeking_twice_is_stable() {
        let (mut engine, fired) = engine_with_log(two_day_model());
        engine.seek_to_km(64.25, SeekOptions::default());
        let first = engine.state();
        engine.seek_to_km(64.25, SeekOptions::default());
        assert_eq!(first, engine.state());
        assert_eq!(engine.event_cursor, 1);
        assert!(fired.borrow().is_empty());
    }

    #[test]
    fn speed_multiplier_is_clamped() {
        let (mut engine, _) = engine_with_log(two_day_model());
        engine.set_speed_multiplier(10.0);
        assert!((engine.state().speed_multiplier - 3.0).abs() < f64::EPSILON);
        engine.set_speed_multiplier(0.0);
        assert!((engine.state().speed_multiplier - 0.5).abs() < f64::EPSILON);
        engine.set_speed_multiplier(f64::NAN);
        assert!((engine.state().speed_multiplier - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn cycle_and_step_speed() {
        let (mut engine, _) = engine_with_log(two_day_model());
        engine.cycle_speed();
        assert!((engine.state().speed_multiplier - 1.5).abs() < f64::EPSILON);
        engine.cycle_speed();
        engine.cycle_speed();
        assert!((engine.state().speed_multiplier - 1.0).abs() < f64::EPSILON);

        for _ in 0..10 {
            engine.step_speed(SpeedStep::Faster);
        }
        assert!((engine.state().speed_multiplier - 3.0).abs() < f64::EPSILON);
        engine.step_speed(SpeedStep::Slower);
        assert!((engine.state().speed_multiplier - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn speed_modifier_is_clamped_and_floored() {
        let (mut engine, _) = engine_with_log(two_day_model());
        engine.set_speed_modifier(-9.0);
        let state = engine.state();
        assert!((state.speed_modifier + 2.5).abs() < f64::EPSILON);
        assert!((state.effective_speed(0.5) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn sustained_driving_keeps_resources_in_bounds() {
        let model = Rc::new(JourneyModel::new(Itinerary {
            days: vec![day(1, "9000km 1h")],
            ..Itinerary::default()
        }));
        let (mut engine, _) = engine_with_log(model);
        engine.set_speed_multiplier(3.0);
        for _ in 0..30_000 {
            engine.advance(FRAME);
        }
        let state = engine.state();
        assert!(state.fuel >= 0.0);
        assert!(state.fuel < 1e-9);
        assert!(state.fatigue <= 100.0);
        assert!((state.fatigue - 100.0).abs() < 1e-9);
    }

    #[test]
    fn paused_driving_recovers_fatigue_without_moving() {
        let (mut engine, _) = engine_with_log(two_day_model());
        engine.seek_to_km(20.0, SeekOptions::default());
        let before = engine.state();
        engine.advance(Duration::from_secs(1));
        let after = engine.state();
        assert!((after.km - before.km).abs() < f64::EPSILON);
        // One tick covers at most 120 ms.
        assert!((after.fatigue - (before.fatigue - 1.2 * 0.12)).abs() < 1e-9);
        assert!((after.fuel - before.fuel).abs() < f64::EPSILON);
    }

    #[test]
    fn tiny_frames_still_advance_the_committed_position() {
        let (mut engine, _) = engine_with_log(two_day_model());
        for _ in 0..100 {
            engine.advance(Duration::from_millis(16));
        }
        let state = engine.state();
        // 100 × 16 ms at 22 km/min ≈ 0.59 km.
        assert!((state.km - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn reset_restores_resources_and_pauses() {
        let (mut engine, _) = engine_with_log(two_day_model());
        engine.set_speed_modifier(1.0);
        for _ in 0..50 {
            engine.advance(FRAME);
        }
        engine.reset_to_km(55.0);
        let state = engine.state();
        assert!((state.km - 55.0).abs() < f64::EPSILON);
        assert!(!state.auto);
        assert!((state.fuel - 100.0).abs() < f64::EPSILON);
        assert!((state.fatigue - 10.0).abs() < f64::EPSILON);
        assert!(state.speed_modifier.abs() < f64::EPSILON);
        assert_eq!(engine.event_cursor, 1);
    }

    #[test]
    fn jump_to_day_lands_on_day_end() {
        let (mut engine, fired) = engine_with_log(two_day_model());
        assert!(engine.jump_to_day(1));
        assert!((engine.state().km - 40.0).abs() < f64::EPSILON);
        assert_eq!(engine.state().day_index, 0);
        assert!(!engine.jump_to_day(42));
        assert!(fired.borrow().is_empty());
    }

    #[test]
    fn nudge_back_from_arrival_resumes_driving_mode() {
        let (mut engine, _) = engine_with_log(two_day_model());
        engine.seek_to_km(100.0, SeekOptions { auto: true });
        engine.advance(FRAME);
        assert!(engine.state().is_arrived());
        engine.nudge_km(-25.0);
        let state = engine.state();
        assert_eq!(state.mode, Mode::Driving);
        assert!((state.km - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn stop_cancels_pending_frame() {
        let (mut engine, _) = engine_with_log(two_day_model());
        engine.start();
        engine.start();
        assert_eq!(engine.scheduler().pending(), 1);
        assert!(engine.pump(Duration::ZERO));
        let handle = engine
            .scheduler_mut()
            .next_due()
            .expect("engine re-requests while running");
        engine.stop();
        engine.stop();
        assert!(!engine.frame(handle, Duration::from_millis(16)));
        assert_eq!(engine.scheduler().pending(), 0);
        assert!(!engine.is_running());
    }

    #[test]
    fn first_frame_uses_default_elapsed_time() {
        let (mut engine, _) = engine_with_log(two_day_model());
        engine.start();
        // The timestamp is ignored on the first frame.
        assert!(engine.pump(Duration::from_secs(500)));
        let expected = 22.0 / 60.0 * 0.016;
        assert!((engine.odometer_km - expected).abs() < 1e-12);
    }

    #[test]
    fn frame_gaps_are_clamped() {
        let (mut engine, _) = engine_with_log(two_day_model());
        engine.start();
        engine.pump(Duration::ZERO);
        let after_first = engine.odometer_km;
        engine.pump(Duration::from_secs(10));
        let step = engine.odometer_km - after_first;
        assert!((step - 22.0 / 60.0 * 0.12).abs() < 1e-12);
    }

    #[test]
    fn stale_handle_is_ignored() {
        let (mut engine, _) = engine_with_log(two_day_model());
        engine.start();
        assert!(!engine.frame(FrameHandle(99), Duration::ZERO));
        assert!(engine.state().km.abs() < f64::EPSILON);
    }

    #[test]
    fn event_at_route_start_fires_on_first_tick() {
        let model = Rc::new(JourneyModel::new(Itinerary {
            days: vec![day(1, "rest day"), day(2, "30km 1h")],
            ..Itinerary::default()
        }));
        let (mut engine, fired) = engine_with_log(model);
        engine.advance(FRAME);
        assert_eq!(fired.borrow()[0].0, "arrival_1");
    }

    #[test]
    fn unvalidated_config_degrades_instead_of_panicking() {
        let config = EngineConfig {
            speed_modifier_limit: -1.0,
            speed_multiplier_min: 4.0,
            frame_dt_min_ms: f64::NAN,
            ..EngineConfig::default_config()
        };
        assert!(config.validate().is_err());
        let (engine, _) = engine_with_log(two_day_model());
        let mut engine = engine.with_config(config);

        engine.set_speed_modifier(0.5);
        assert!((engine.state().speed_modifier - 0.5).abs() < f64::EPSILON);
        engine.set_speed_multiplier(10.0);
        assert!((engine.state().speed_multiplier - 4.0).abs() < f64::EPSILON);

        engine.set_auto(true);
        engine.advance(FRAME);
        let state = engine.state();
        assert!(state.km.is_finite() && state.km > 0.0);
    }
}
