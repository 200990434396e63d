use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use roadreel_core::{
    AutoplayGuard, EngineConfig, EventKind, Itinerary, JourneyEngine, JourneyModel,
    ManualScheduler, SimulationState, Store, Subscription,
};

const MAX_RECORDED_VIOLATIONS: usize = 16;
const AUDIT_TOLERANCE: f64 = 1e-9;

/// Itinerary model and engine tuning shared by every scenario run.
#[derive(Debug, Clone)]
pub struct TesterAssets {
    pub model: Rc<JourneyModel>,
    pub config: EngineConfig,
}

impl TesterAssets {
    /// Load overrides from disk, falling back to the embedded itinerary and
    /// the stock tuning.
    pub fn load(itinerary: Option<&Path>, config: Option<&Path>) -> Result<Self> {
        let itinerary = match itinerary {
            Some(path) => Itinerary::from_path(path)
                .with_context(|| format!("failed to load itinerary {}", path.display()))?,
            None => Itinerary::default_itinerary(),
        };
        let config = match config {
            Some(path) => EngineConfig::from_path(path)
                .with_context(|| format!("failed to load engine config {}", path.display()))?,
            None => EngineConfig::default_config(),
        };
        Ok(Self {
            model: Rc::new(JourneyModel::new(itinerary)),
            config,
        })
    }
}

/// A narrative event as delivered to the engine's handler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiredEvent {
    pub id: String,
    pub kind: EventKind,
    pub trigger_km: f64,
    pub fired_at_km: f64,
}

/// Invariant checks applied to every snapshot the store publishes.
#[derive(Debug, Clone)]
pub struct StateAudit {
    pub snapshots: usize,
    pub min_fuel: f64,
    pub max_fatigue: f64,
    pub violations: Vec<String>,
    total_km: f64,
}

impl StateAudit {
    fn new(total_km: f64) -> Self {
        Self {
            snapshots: 0,
            min_fuel: f64::INFINITY,
            max_fatigue: f64::NEG_INFINITY,
            violations: Vec::new(),
            total_km,
        }
    }

    fn record(&mut self, state: &SimulationState) {
        self.snapshots += 1;
        self.min_fuel = self.min_fuel.min(state.fuel);
        self.max_fatigue = self.max_fatigue.max(state.fatigue);

        let total = self.total_km;
        if !(0.0..=total).contains(&state.km) {
            self.violation(format!("km {} outside [0, {total}]", state.km));
        }
        if (state.progress - state.km / total).abs() > AUDIT_TOLERANCE {
            self.violation(format!("progress {} != km / total", state.progress));
        }
        if !(0.0..=1.0).contains(&state.segment_progress) {
            self.violation(format!("segment progress {}", state.segment_progress));
        }
        if !(0.0..=100.0).contains(&state.fuel) || !(0.0..=100.0).contains(&state.fatigue) {
            self.violation(format!(
                "fuel {} / fatigue {} out of range",
                state.fuel, state.fatigue
            ));
        }
        if state.is_arrived() && (state.auto || (state.km - total).abs() > AUDIT_TOLERANCE) {
            self.violation(format!(
                "arrived at {} km with auto={}",
                state.km, state.auto
            ));
        }
    }

    fn violation(&mut self, message: String) {
        if self.violations.len() < MAX_RECORDED_VIOLATIONS {
            self.violations.push(format!("snapshot {}: {message}", self.snapshots));
        }
    }

    /// Fail with the first recorded violation, if any.
    pub fn ensure_clean(&self) -> Result<()> {
        match self.violations.first() {
            Some(first) => bail!(
                "{} state invariant violation(s); first: {first}",
                self.violations.len()
            ),
            None => Ok(()),
        }
    }
}

/// Everything a finished playback run produced.
#[derive(Debug, Clone)]
pub struct PlaybackSummary {
    pub frames: usize,
    pub final_state: SimulationState,
    pub fired: Vec<FiredEvent>,
    pub audit: StateAudit,
}

/// Headless host: owns an engine, feeds it frames at a fixed cadence and
/// records what it publishes.
pub struct PlaybackDriver {
    engine: JourneyEngine,
    fired: Rc<RefCell<Vec<FiredEvent>>>,
    audit: Rc<RefCell<StateAudit>>,
    subscription: Option<Subscription>,
    guard: Option<AutoplayGuard>,
    frame_interval: Duration,
    clock: Duration,
    frames: usize,
}

impl PlaybackDriver {
    pub fn new(assets: &TesterAssets, frame_interval: Duration) -> Self {
        Self::with_config(assets, assets.config.clone(), frame_interval)
    }

    pub fn with_config(
        assets: &TesterAssets,
        config: EngineConfig,
        frame_interval: Duration,
    ) -> Self {
        let initial = SimulationState {
            fuel: config.reset_fuel,
            fatigue: config.reset_fatigue,
            ..SimulationState::default()
        };
        let fired = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&fired);
        let engine = JourneyEngine::new(
            Rc::clone(&assets.model),
            Store::new(initial),
            ManualScheduler::new(),
        )
        .with_config(config)
        .with_event_handler(move |event, state| {
            sink.borrow_mut().push(FiredEvent {
                id: event.id.clone(),
                kind: event.kind,
                trigger_km: event.trigger_km,
                fired_at_km: state.km,
            });
        });

        let audit = Rc::new(RefCell::new(StateAudit::new(assets.model.total_km())));
        let observer = Rc::clone(&audit);
        let subscription = engine
            .reader()
            .subscribe(move |state: &SimulationState| observer.borrow_mut().record(state));

        Self {
            engine,
            fired,
            audit,
            subscription: Some(subscription),
            guard: None,
            frame_interval,
            clock: Duration::ZERO,
            frames: 0,
        }
    }

    /// Start watching for stalls from the current position.
    pub fn arm_autoplay_guard(&mut self) {
        self.guard = Some(AutoplayGuard::new(self.engine.state().km));
    }

    pub fn engine_mut(&mut self) -> &mut JourneyEngine {
        &mut self.engine
    }

    pub fn state(&self) -> SimulationState {
        self.engine.state()
    }

    pub fn fired_count(&self) -> usize {
        self.fired.borrow().len()
    }

    /// Events recorded from index `from` onwards.
    pub fn fired_since(&self, from: usize) -> Vec<FiredEvent> {
        self.fired.borrow().get(from..).map(<[_]>::to_vec).unwrap_or_default()
    }

    /// Deliver `count` frames, starting the clock first if needed.
    pub fn run_frames(&mut self, count: usize) {
        self.engine.start();
        for _ in 0..count {
            self.clock += self.frame_interval;
            if !self.engine.pump(self.clock) {
                log::warn!("frame at {:?} was not delivered", self.clock);
            }
            self.frames += 1;
            self.observe_guard();
        }
    }

    /// Deliver frames until `done` holds for the committed state.
    ///
    /// Returns `false` if `max_frames` ran out first.
    pub fn run_until(
        &mut self,
        max_frames: usize,
        done: impl Fn(&SimulationState) -> bool,
    ) -> bool {
        for _ in 0..max_frames {
            if done(&self.engine.state()) {
                return true;
            }
            self.run_frames(1);
        }
        done(&self.engine.state())
    }

    pub fn run_until_arrived(&mut self, max_frames: usize) -> bool {
        self.run_until(max_frames, SimulationState::is_arrived)
    }

    fn observe_guard(&mut self) {
        let Some(guard) = self.guard.as_mut() else {
            return;
        };
        let state = self.engine.state();
        if guard.observe(self.frame_interval, &state) && !state.auto {
            log::debug!("autoplay guard resuming at {:.1} km", state.km);
            self.engine.set_auto(true);
        }
    }

    /// Stop the clock, detach the audit subscriber and hand back the record.
    pub fn finish(mut self) -> PlaybackSummary {
        self.engine.stop();
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        let audit = self.audit.borrow().clone();
        let fired = self.fired.borrow().clone();
        PlaybackSummary {
            frames: self.frames,
            final_state: self.engine.state(),
            fired,
            audit,
        }
    }
}
