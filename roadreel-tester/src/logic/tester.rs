use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::playback::TesterAssets;
use super::scenarios::{PlaybackScenario, ScenarioCtx};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub frames: usize,
    pub events_fired: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

/// Runs catalog scenarios against one set of assets.
pub struct LogicTester {
    assets: TesterAssets,
    frame_interval: Duration,
    verbose: bool,
}

impl LogicTester {
    pub const fn new(assets: TesterAssets, frame_interval: Duration, verbose: bool) -> Self {
        Self {
            assets,
            frame_interval,
            verbose,
        }
    }

    pub fn run_scenario(&self, scenario: &PlaybackScenario, seeds: &[u64]) -> Vec<ScenarioResult> {
        seeds
            .iter()
            .map(|&seed| {
                if self.verbose {
                    println!(
                        "🧪 Testing scenario: {} (seed: {seed})",
                        scenario.key.bright_white()
                    );
                }
                self.run_single(scenario, seed)
            })
            .collect()
    }

    fn run_single(&self, scenario: &PlaybackScenario, seed: u64) -> ScenarioResult {
        let ctx = ScenarioCtx {
            assets: &self.assets,
            seed,
            frame_interval: self.frame_interval,
        };
        let started = Instant::now();
        let outcome = scenario.run(&ctx);
        let duration = started.elapsed();

        match outcome {
            Ok(outcome) => {
                log::debug!(
                    "{} seed {seed}: {} frames, {} events",
                    scenario.key,
                    outcome.frames,
                    outcome.events_fired
                );
                ScenarioResult {
                    scenario_name: scenario.key.to_string(),
                    seed,
                    passed: true,
                    frames: outcome.frames,
                    events_fired: outcome.events_fired,
                    failures: Vec::new(),
                    duration,
                }
            }
            Err(err) => ScenarioResult {
                scenario_name: scenario.key.to_string(),
                seed,
                passed: false,
                frames: 0,
                events_fired: 0,
                failures: vec![format!("{err:#}")],
                duration,
            },
        }
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}
