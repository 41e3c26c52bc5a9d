//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use greengrid_sim::config::ScenarioConfig;
use greengrid_sim::live::NoSeed;
use greengrid_sim::narration::ScriptedNarrator;
use greengrid_sim::runner::{RunResult, run_headless};
use greengrid_sim::sim::anomaly::AnomalyThresholds;

/// Baseline scenario shortened to `steps` ticks.
pub fn short_scenario(steps: usize) -> ScenarioConfig {
    let mut scenario = ScenarioConfig::baseline();
    scenario.simulation.steps = steps;
    scenario
}

/// Thresholds loose enough that the generator never trips them.
pub fn quiet_thresholds() -> AnomalyThresholds {
    AnomalyThresholds {
        voltage_drop_percent: 100.0,
        load_increase_percent: 1000.0,
        frequency_deviation_hz: 50.0,
        max_co2_intensity: 10_000.0,
    }
}

/// Scenario whose voltage trigger sits above any generated voltage, so
/// the first tick opens an incident and every revert reopens one.
pub fn hair_trigger_scenario(steps: usize) -> ScenarioConfig {
    let mut scenario = short_scenario(steps);
    scenario.thresholds = AnomalyThresholds {
        voltage_drop_percent: -10.0,
        ..quiet_thresholds()
    };
    scenario
}

/// Runs `scenario` offline with the scripted narrator.
pub fn run_scripted(scenario: &ScenarioConfig) -> RunResult {
    run_headless(scenario, &ScriptedNarrator, &mut NoSeed)
}
