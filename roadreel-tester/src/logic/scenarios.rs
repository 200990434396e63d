use anyhow::{Result, ensure};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::time::Duration;

use roadreel_core::numbers::{clamp_finite, floor_f64_to_usize};
use roadreel_core::{EngineConfig, NUDGE_BUTTON_KM, NUDGE_STEP_KM, SeekOptions, SpeedStep, derive};

use super::playback::{PlaybackDriver, TesterAssets};

const PLAYBACK_SPEED: f64 = 3.0;
const SCRUB_MARGIN_KM: f64 = 10.0;
const FUZZ_STEPS: usize = 160;
const FUZZ_MAX_BURST: usize = 60;
const SEEK_PROBES: usize = 24;

/// Inputs shared by one scenario run.
pub struct ScenarioCtx<'a> {
    pub assets: &'a TesterAssets,
    pub seed: u64,
    pub frame_interval: Duration,
}

/// What a passing scenario did.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScenarioOutcome {
    pub frames: usize,
    pub events_fired: usize,
}

pub struct PlaybackScenario {
    pub key: &'static str,
    pub description: &'static str,
    run: fn(&ScenarioCtx<'_>) -> Result<ScenarioOutcome>,
}

impl PlaybackScenario {
    pub fn run(&self, ctx: &ScenarioCtx<'_>) -> Result<ScenarioOutcome> {
        (self.run)(ctx)
    }
}

const CATALOG: &[PlaybackScenario] = &[
    PlaybackScenario {
        key: "full-playback",
        description: "Play the whole route; every event fires once, in order",
        run: full_playback,
    },
    PlaybackScenario {
        key: "scrub-resume",
        description: "Seek and nudge fire nothing; resuming fires the re-crossed event once",
        run: scrub_resume,
    },
    PlaybackScenario {
        key: "seek-idempotence",
        description: "Repeated seeks land on identical, already-derived states",
        run: seek_idempotence,
    },
    PlaybackScenario {
        key: "speed-controls",
        description: "Multiplier clamps, speed button cycling and arrow-key steps",
        run: speed_controls,
    },
    PlaybackScenario {
        key: "resource-bounds",
        description: "Fuel and fatigue stay within [0, 100]; paused fatigue recovers",
        run: resource_bounds,
    },
    PlaybackScenario {
        key: "jump-to-day",
        description: "Quick-jump lands on each day's end without firing events",
        run: jump_to_day,
    },
    PlaybackScenario {
        key: "clock-control",
        description: "stop() cancels the pending frame; restart uses the default first frame",
        run: clock_control,
    },
    PlaybackScenario {
        key: "autoplay-guard",
        description: "A stalled, paused vehicle is resumed by the watchdog",
        run: autoplay_guard,
    },
    PlaybackScenario {
        key: "scrub-fuzz",
        description: "Seeded random operator input never double-fires or fires on jumps",
        run: scrub_fuzz,
    },
];

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    CATALOG
        .iter()
        .map(|scenario| (scenario.key, scenario.description))
        .collect()
}

pub fn get_scenario(key: &str) -> Option<&'static PlaybackScenario> {
    CATALOG.iter().find(|scenario| scenario.key == key)
}

pub fn all_scenario_keys() -> Vec<String> {
    CATALOG
        .iter()
        .map(|scenario| scenario.key.to_string())
        .collect()
}

/// Frames needed to cover `km` at `speed`, doubled for slack.
fn frame_budget(config: &EngineConfig, frame_interval: Duration, km: f64, speed: f64) -> usize {
    let dt_ms = clamp_finite(
        frame_interval.as_secs_f64() * 1000.0,
        config.frame_dt_min_ms,
        config.frame_dt_max_ms,
    );
    let speed = speed.max(config.effective_speed_floor);
    let per_frame = config.base_km_per_sec * speed * dt_ms / 1000.0;
    floor_f64_to_usize((km / per_frame).ceil()) * 2 + 120
}

fn frames_for(config: &EngineConfig, frame_interval: Duration, span: Duration) -> usize {
    let dt_ms = clamp_finite(
        frame_interval.as_secs_f64() * 1000.0,
        config.frame_dt_min_ms,
        config.frame_dt_max_ms,
    );
    floor_f64_to_usize((span.as_secs_f64() * 1000.0 / dt_ms).ceil()) + 1
}

fn full_playback(ctx: &ScenarioCtx<'_>) -> Result<ScenarioOutcome> {
    let model = &ctx.assets.model;
    let mut driver = PlaybackDriver::new(ctx.assets, ctx.frame_interval);
    driver.engine_mut().set_speed_multiplier(PLAYBACK_SPEED);

    let total_km = model.total_km();
    let budget = frame_budget(&ctx.assets.config, ctx.frame_interval, total_km, PLAYBACK_SPEED);
    ensure!(
        driver.run_until_arrived(budget),
        "vehicle did not arrive within {budget} frames"
    );
    let summary = driver.finish();

    let expected: Vec<&str> = model.events().iter().map(|event| event.id.as_str()).collect();
    let fired: Vec<&str> = summary.fired.iter().map(|event| event.id.as_str()).collect();
    ensure!(fired == expected, "fired {fired:?}, expected {expected:?}");
    for event in &summary.fired {
        ensure!(
            event.fired_at_km >= event.trigger_km,
            "{} fired at {} km before its trigger {}",
            event.id,
            event.fired_at_km,
            event.trigger_km
        );
    }

    let state = &summary.final_state;
    ensure!(state.is_arrived(), "final mode is {:?}", state.mode);
    ensure!(!state.auto, "auto still on after arrival");
    ensure!(
        (state.km - model.total_km()).abs() < f64::EPSILON,
        "arrived at {} km, route is {} km",
        state.km,
        model.total_km()
    );
    summary.audit.ensure_clean()?;

    Ok(ScenarioOutcome {
        frames: summary.frames,
        events_fired: summary.fired.len(),
    })
}

fn scrub_resume(ctx: &ScenarioCtx<'_>) -> Result<ScenarioOutcome> {
    let model = &ctx.assets.model;
    let Some(target) = model.events().iter().find(|event| event.trigger_km > 0.0) else {
        log::info!("scrub-resume: itinerary has no events past the start");
        return Ok(ScenarioOutcome::default());
    };

    let mut driver = PlaybackDriver::new(ctx.assets, ctx.frame_interval);
    let far_km = model.total_km() * 0.9;
    let back_to = (target.trigger_km - SCRUB_MARGIN_KM).max(0.0);
    driver.engine_mut().seek_to_km(far_km, SeekOptions::default());
    driver.engine_mut().nudge_km(back_to - far_km);
    ensure!(
        driver.fired_count() == 0,
        "scrubbing fired {:?}",
        driver.fired_since(0)
    );
    let paused = driver.state();
    ensure!(!paused.auto, "nudge left auto on");

    driver.engine_mut().set_auto(true);
    driver.engine_mut().set_speed_multiplier(PLAYBACK_SPEED);
    let goal = target.trigger_km + 1.0;
    let distance = goal - paused.km;
    let budget = frame_budget(&ctx.assets.config, ctx.frame_interval, distance, PLAYBACK_SPEED);
    ensure!(
        driver.run_until(budget, |state| state.km >= goal || state.is_arrived()),
        "did not re-cross {} within {budget} frames",
        target.id
    );

    let summary = driver.finish();
    let end_km = summary.final_state.km;
    let expected: Vec<&str> = model
        .events()
        .iter()
        .filter(|event| event.trigger_km > paused.km && event.trigger_km <= end_km)
        .map(|event| event.id.as_str())
        .collect();
    let fired: Vec<&str> = summary.fired.iter().map(|event| event.id.as_str()).collect();
    ensure!(fired == expected, "fired {fired:?}, expected {expected:?}");
    ensure!(
        fired.iter().filter(|id| **id == target.id).count() == 1,
        "{} should fire exactly once",
        target.id
    );
    summary.audit.ensure_clean()?;

    Ok(ScenarioOutcome {
        frames: summary.frames,
        events_fired: summary.fired.len(),
    })
}

fn seek_idempotence(ctx: &ScenarioCtx<'_>) -> Result<ScenarioOutcome> {
    let model = &ctx.assets.model;
    let mut rng = ChaCha8Rng::seed_from_u64(ctx.seed);
    let mut driver = PlaybackDriver::new(ctx.assets, ctx.frame_interval);

    for _ in 0..SEEK_PROBES {
        let km = rng.gen_range(0.0..=model.total_km());
        let auto = rng.gen_bool(0.5);
        driver.engine_mut().seek_to_km(km, SeekOptions { auto });
        let first = driver.state();
        driver.engine_mut().seek_to_km(km, SeekOptions { auto });
        let second = driver.state();
        ensure!(first == second, "seek to {km} drifted: {first:?} vs {second:?}");
        ensure!(
            derive(model, second.clone()) == second,
            "committed state at {km} is not a derive fixed point"
        );
    }
    ensure!(
        driver.fired_count() == 0,
        "seeking fired {:?}",
        driver.fired_since(0)
    );
    let summary = driver.finish();
    summary.audit.ensure_clean()?;
    Ok(ScenarioOutcome::default())
}

fn speed_controls(ctx: &ScenarioCtx<'_>) -> Result<ScenarioOutcome> {
    let config = &ctx.assets.config;
    let mut driver = PlaybackDriver::new(ctx.assets, ctx.frame_interval);
    let engine = driver.engine_mut();
    let multiplier = |engine: &roadreel_core::JourneyEngine| engine.state().speed_multiplier;

    engine.set_speed_multiplier(10.0);
    ensure!(
        (multiplier(engine) - config.speed_multiplier_max).abs() < f64::EPSILON,
        "10x not clamped to max, got {}",
        multiplier(engine)
    );
    engine.set_speed_multiplier(0.0);
    ensure!(
        (multiplier(engine) - config.speed_multiplier_min).abs() < f64::EPSILON,
        "0x not clamped to min, got {}",
        multiplier(engine)
    );
    engine.set_speed_multiplier(f64::NAN);
    ensure!(multiplier(engine).is_finite(), "NaN multiplier leaked into state");

    engine.set_speed_multiplier(1.0);
    for _ in 0..8 {
        let current = multiplier(engine);
        let expected = if current >= config.speed_cycle_wrap {
            1.0
        } else {
            clamp_finite(
                current + config.speed_multiplier_step,
                config.speed_multiplier_min,
                config.speed_multiplier_max,
            )
        };
        engine.cycle_speed();
        ensure!(
            (multiplier(engine) - expected).abs() < f64::EPSILON,
            "cycle from {current} gave {}, expected {expected}",
            multiplier(engine)
        );
    }

    for _ in 0..20 {
        engine.step_speed(SpeedStep::Faster);
    }
    ensure!(
        (multiplier(engine) - config.speed_multiplier_max).abs() < f64::EPSILON,
        "stepping up overshot to {}",
        multiplier(engine)
    );
    for _ in 0..20 {
        engine.step_speed(SpeedStep::Slower);
    }
    ensure!(
        (multiplier(engine) - config.speed_multiplier_min).abs() < f64::EPSILON,
        "stepping down undershot to {}",
        multiplier(engine)
    );

    engine.set_speed_modifier(-100.0);
    let state = engine.state();
    ensure!(
        (state.speed_modifier + config.speed_modifier_limit).abs() < f64::EPSILON,
        "modifier not clamped, got {}",
        state.speed_modifier
    );
    ensure!(
        state.effective_speed(config.effective_speed_floor) >= config.effective_speed_floor,
        "effective speed fell below the floor"
    );

    let summary = driver.finish();
    summary.audit.ensure_clean()?;
    Ok(ScenarioOutcome::default())
}

fn resource_bounds(ctx: &ScenarioCtx<'_>) -> Result<ScenarioOutcome> {
    let model = &ctx.assets.model;
    // Exaggerated burn rates so both clamps are exercised on any route.
    let config = EngineConfig {
        fuel_per_km: 1.0,
        fatigue_per_km: 1.0,
        ..ctx.assets.config.clone()
    };
    let mut driver = PlaybackDriver::with_config(ctx.assets, config.clone(), ctx.frame_interval);
    driver.engine_mut().set_speed_multiplier(PLAYBACK_SPEED);
    let budget = frame_budget(&config, ctx.frame_interval, model.total_km(), PLAYBACK_SPEED);
    ensure!(
        driver.run_until_arrived(budget),
        "vehicle did not arrive within {budget} frames"
    );

    driver.engine_mut().reset_to_km(model.total_km() / 2.0);
    let paused = driver.state();
    if config.fatigue_recovery_per_sec > 0.0 {
        let rest_secs = config.reset_fatigue / config.fatigue_recovery_per_sec + 1.0;
        let rest = Duration::from_secs_f64(rest_secs);
        driver.run_frames(frames_for(&config, ctx.frame_interval, rest));
        let rested = driver.state();
        ensure!(
            (rested.km - paused.km).abs() < f64::EPSILON,
            "paused vehicle moved from {} to {}",
            paused.km,
            rested.km
        );
        ensure!(
            (rested.fuel - paused.fuel).abs() < f64::EPSILON,
            "fuel changed while paused"
        );
        ensure!(
            rested.fatigue.abs() < f64::EPSILON,
            "fatigue only recovered to {}",
            rested.fatigue
        );
    }

    let summary = driver.finish();
    let audit = &summary.audit;
    audit.ensure_clean()?;
    ensure!(audit.min_fuel >= 0.0, "fuel dropped to {}", audit.min_fuel);
    ensure!(audit.max_fatigue <= 100.0, "fatigue rose to {}", audit.max_fatigue);
    if model.total_km() >= 100.0 {
        ensure!(audit.min_fuel.abs() < f64::EPSILON, "fuel clamp never engaged");
        ensure!(
            (audit.max_fatigue - 100.0).abs() < f64::EPSILON,
            "fatigue clamp never engaged"
        );
    }

    Ok(ScenarioOutcome {
        frames: summary.frames,
        events_fired: summary.fired.len(),
    })
}

fn jump_to_day(ctx: &ScenarioCtx<'_>) -> Result<ScenarioOutcome> {
    let model = &ctx.assets.model;
    let mut driver = PlaybackDriver::new(ctx.assets, ctx.frame_interval);

    for segment in model.segments() {
        ensure!(
            driver.engine_mut().jump_to_day(segment.day_id),
            "day {} rejected",
            segment.day_id
        );
        let state = driver.state();
        ensure!(
            (state.km - segment.end_km).abs() < f64::EPSILON,
            "day {} landed at {} km, expected {}",
            segment.day_id,
            state.km,
            segment.end_km
        );
        ensure!(
            state.day_index == model.day_index_by_km(segment.end_km),
            "day {} reported index {}",
            segment.day_id,
            state.day_index
        );
        ensure!(!state.auto, "jump left auto on");
    }
    let unknown = model.segments().iter().map(|s| s.day_id).max().unwrap_or(0) + 1;
    ensure!(
        !driver.engine_mut().jump_to_day(unknown),
        "unknown day {unknown} accepted"
    );
    ensure!(
        driver.fired_count() == 0,
        "jumping fired {:?}",
        driver.fired_since(0)
    );

    let summary = driver.finish();
    summary.audit.ensure_clean()?;
    Ok(ScenarioOutcome::default())
}

fn clock_control(ctx: &ScenarioCtx<'_>) -> Result<ScenarioOutcome> {
    let config = &ctx.assets.config;
    let mut driver = PlaybackDriver::new(ctx.assets, ctx.frame_interval);
    driver.run_frames(10);

    let engine = driver.engine_mut();
    engine.stop();
    engine.stop();
    let before = engine.state();
    ensure!(
        engine.scheduler().pending() == 0,
        "stop() left {} frame(s) queued",
        engine.scheduler().pending()
    );
    ensure!(!engine.pump(Duration::from_secs(3600)), "stopped engine ran a frame");
    ensure!(engine.state() == before, "state changed while stopped");

    engine.start();
    engine.start();
    ensure!(
        engine.scheduler().pending() == 1,
        "start() queued {} frames",
        engine.scheduler().pending()
    );
    // The first frame after a restart ignores the host timestamp gap.
    ensure!(engine.pump(Duration::from_secs(7200)), "restarted engine skipped its frame");
    let moved = engine.state().km - before.km;
    let max_step = config.base_km_per_sec
        * before.effective_speed(config.effective_speed_floor)
        * config.frame_dt_default_ms
        / 1000.0;
    ensure!(
        moved <= max_step + 0.1,
        "first frame after restart moved {moved} km (limit {max_step})"
    );

    let summary = driver.finish();
    summary.audit.ensure_clean()?;
    Ok(ScenarioOutcome {
        frames: summary.frames,
        events_fired: summary.fired.len(),
    })
}

fn autoplay_guard(ctx: &ScenarioCtx<'_>) -> Result<ScenarioOutcome> {
    let model = &ctx.assets.model;
    let config = &ctx.assets.config;
    let mut driver = PlaybackDriver::new(ctx.assets, ctx.frame_interval);
    driver
        .engine_mut()
        .seek_to_km(model.total_km() * 0.3, SeekOptions::default());
    let parked = driver.state();
    ensure!(!parked.auto, "seek without auto left playback on");

    driver.arm_autoplay_guard();
    driver.run_frames(frames_for(config, ctx.frame_interval, Duration::from_secs(5)));

    let state = driver.state();
    ensure!(state.auto, "watchdog never resumed playback");
    ensure!(
        state.km > parked.km,
        "vehicle still parked at {} km",
        state.km
    );

    let summary = driver.finish();
    summary.audit.ensure_clean()?;
    Ok(ScenarioOutcome {
        frames: summary.frames,
        events_fired: summary.fired.len(),
    })
}

#[derive(Debug, Clone, Copy)]
enum FuzzOp {
    Seek,
    Nudge,
    ToggleAuto,
    StepSpeed,
    Frames,
    JumpToDay,
    Reset,
}

impl FuzzOp {
    const ALL: [Self; 7] = [
        Self::Seek,
        Self::Nudge,
        Self::ToggleAuto,
        Self::StepSpeed,
        Self::Frames,
        Self::JumpToDay,
        Self::Reset,
    ];

    const fn repositions(self) -> bool {
        matches!(self, Self::Seek | Self::Nudge | Self::JumpToDay | Self::Reset)
    }
}

fn scrub_fuzz(ctx: &ScenarioCtx<'_>) -> Result<ScenarioOutcome> {
    let model = &ctx.assets.model;
    let total_km = model.total_km();
    let mut rng = ChaCha8Rng::seed_from_u64(ctx.seed);
    let mut driver = PlaybackDriver::new(ctx.assets, ctx.frame_interval);
    let mut fired_this_pass: HashSet<String> = HashSet::new();
    let max_day = model.segments().iter().map(|s| s.day_id).max().unwrap_or(0);

    for step in 0..FUZZ_STEPS {
        let op = FuzzOp::ALL[rng.gen_range(0..FuzzOp::ALL.len())];
        let fired_before = driver.fired_count();
        let engine = driver.engine_mut();
        match op {
            FuzzOp::Seek => {
                let km = rng.gen_range(0.0..=total_km);
                engine.seek_to_km(km, SeekOptions { auto: rng.gen_bool(0.5) });
            }
            FuzzOp::Nudge => {
                let magnitude = if rng.gen_bool(0.5) { NUDGE_STEP_KM } else { NUDGE_BUTTON_KM };
                let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                engine.nudge_km(sign * magnitude);
            }
            FuzzOp::ToggleAuto => engine.toggle_auto(),
            FuzzOp::StepSpeed => engine.step_speed(if rng.gen_bool(0.5) {
                SpeedStep::Faster
            } else {
                SpeedStep::Slower
            }),
            FuzzOp::Frames => {}
            FuzzOp::JumpToDay => {
                let day_id = rng.gen_range(0..=max_day + 1);
                engine.jump_to_day(day_id);
            }
            FuzzOp::Reset => engine.reset_to_km(rng.gen_range(0.0..=total_km)),
        }
        if matches!(op, FuzzOp::Frames) {
            driver.run_frames(rng.gen_range(1..=FUZZ_MAX_BURST));
        }

        let new_events = driver.fired_since(fired_before);
        if !matches!(op, FuzzOp::Frames) {
            ensure!(
                new_events.is_empty(),
                "step {step}: {op:?} fired {:?}",
                new_events
            );
        }
        if op.repositions() {
            fired_this_pass.clear();
        }
        for event in new_events {
            ensure!(
                event.fired_at_km >= event.trigger_km,
                "step {step}: {} fired at {} km before trigger {}",
                event.id,
                event.fired_at_km,
                event.trigger_km
            );
            ensure!(
                fired_this_pass.insert(event.id.clone()),
                "step {step}: {} fired twice without a jump in between",
                event.id
            );
        }
        log::trace!("fuzz step {step}: {op:?} -> {:.1} km", driver.state().km);
    }

    // A clean pass from the start must still fire everything past 0 km once.
    let checkpoint = driver.fired_count();
    driver.engine_mut().seek_to_km(0.0, SeekOptions { auto: true });
    driver.engine_mut().set_speed_multiplier(PLAYBACK_SPEED);
    let budget = frame_budget(&ctx.assets.config, ctx.frame_interval, total_km, PLAYBACK_SPEED);
    ensure!(
        driver.run_until_arrived(budget),
        "final pass did not arrive within {budget} frames"
    );
    let final_pass: Vec<String> = driver
        .fired_since(checkpoint)
        .into_iter()
        .map(|event| event.id)
        .collect();
    let expected: Vec<String> = model
        .events()
        .iter()
        .filter(|event| event.trigger_km > 0.0)
        .map(|event| event.id.clone())
        .collect();
    ensure!(
        final_pass == expected,
        "final pass fired {final_pass:?}, expected {expected:?}"
    );

    let summary = driver.finish();
    summary.audit.ensure_clean()?;
    Ok(ScenarioOutcome {
        frames: summary.frames,
        events_fired: summary.fired.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(assets: &TesterAssets, seed: u64) -> ScenarioCtx<'_> {
        ScenarioCtx {
            assets,
            seed,
            frame_interval: Duration::from_millis(120),
        }
    }

    #[test]
    fn catalog_keys_are_unique() {
        let keys = all_scenario_keys();
        let unique: HashSet<&String> = keys.iter().collect();
        assert_eq!(keys.len(), unique.len());
        assert!(get_scenario("full-playback").is_some());
        assert!(get_scenario("nope").is_none());
    }

    #[test]
    fn every_scenario_passes_on_embedded_itinerary() {
        let assets = TesterAssets::load(None, None).expect("embedded assets");
        for key in all_scenario_keys() {
            let scenario = get_scenario(&key).expect("catalog key");
            scenario
                .run(&ctx(&assets, 7))
                .unwrap_or_else(|err| panic!("{key} failed: {err:#}"));
        }
    }

    #[test]
    fn fuzz_is_stable_across_seeds() {
        let assets = TesterAssets::load(None, None).expect("embedded assets");
        for seed in [1, 2, 1337] {
            scrub_fuzz(&ctx(&assets, seed))
                .unwrap_or_else(|err| panic!("seed {seed}: {err:#}"));
        }
    }

    #[test]
    fn budget_covers_route_with_slack() {
        let config = EngineConfig::default_config();
        let frames = frame_budget(&config, Duration::from_millis(120), 44.0, 1.0);
        // 22 km/min over 120 ms frames is 0.044 km per frame.
        assert!(frames >= 2_000);
    }
}
