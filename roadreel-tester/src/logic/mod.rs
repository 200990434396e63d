pub mod playback;
pub mod reports;
pub mod scenarios;
pub mod tester;

pub use playback::TesterAssets;
pub use scenarios::{all_scenario_keys, get_scenario, list_scenarios};
pub use tester::{LogicTester, ScenarioResult};
