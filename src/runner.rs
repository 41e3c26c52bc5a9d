//! Headless scenario runner.
//!
//! Drives the engine for a fixed number of ticks, answering every trigger
//! synchronously through a narrator and refreshing the live seed on the
//! configured poll interval.

use crate::config::ScenarioConfig;
use crate::live::SeedSource;
use crate::narration::{Narrator, narrate_or_fallback};
use crate::sim::engine::Engine;
use crate::sim::kpi::KpiReport;
use crate::sim::types::{AgentLog, LiveSeed, MetricSample};

/// Everything a headless run produced.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Every sample, in tick order.
    pub samples: Vec<MetricSample>,
    /// Every agent log line, in release order.
    pub logs: Vec<AgentLog>,
    pub kpi: KpiReport,
}

/// Runs `scenario` to completion.
///
/// # Arguments
///
/// * `scenario` - Validated scenario
/// * `narrator` - Answers anomaly triggers; failures fall back to `IGNORE`
/// * `seeds` - Live seed provider, polled only for live sources
pub fn run_headless(
    scenario: &ScenarioConfig,
    narrator: &dyn Narrator,
    seeds: &mut dyn SeedSource,
) -> RunResult {
    let mut engine = Engine::new(
        scenario.engine_settings(),
        scenario.grid.clone(),
        scenario.thresholds.clone(),
    );
    let live = scenario.live.source.is_live();
    let poll_every = scenario.poll_every_ticks();
    let steps = scenario.simulation.steps;

    tracing::info!(
        steps,
        seed = scenario.simulation.seed,
        source = %scenario.live.source,
        narrator = narrator.name(),
        "starting headless run"
    );

    let mut samples = Vec::with_capacity(steps);
    let mut logs = Vec::new();
    let mut seed: Option<LiveSeed> = None;

    for step in 0..steps as u64 {
        if live && step % poll_every == 0 {
            // a failed fetch keeps the previous seed
            if let Some(fresh) = seeds.fetch() {
                seed = Some(fresh);
            }
        }

        let report = engine.tick(if live { seed.as_ref() } else { None });
        logs.extend(report.logs);
        if let Some(request) = report.trigger {
            let narration = narrate_or_fallback(narrator, &request);
            logs.extend(engine.resolve_incident(narration));
        }
        samples.push(report.sample);
    }

    let kpi = KpiReport::from_samples(
        &samples,
        scenario.simulation.sim_ms_per_tick,
        engine.incident_count(),
    );
    tracing::info!(incidents = kpi.incident_count, "headless run finished");

    RunResult { samples, logs, kpi }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::{DataSource, NoSeed};
    use crate::narration::ScriptedNarrator;

    #[test]
    fn same_scenario_and_seed_is_deterministic() {
        let scenario = ScenarioConfig::heatwave();
        let a = run_headless(&scenario, &ScriptedNarrator, &mut NoSeed);
        let b = run_headless(&scenario, &ScriptedNarrator, &mut NoSeed);
        assert_eq!(a.samples, b.samples);
        assert_eq!(a.logs, b.logs);
    }

    #[test]
    fn runs_requested_steps() {
        let mut scenario = ScenarioConfig::baseline();
        scenario.simulation.steps = 17;
        let result = run_headless(&scenario, &ScriptedNarrator, &mut NoSeed);
        assert_eq!(result.samples.len(), 17);
        assert_eq!(result.kpi.samples, 17);
    }

    #[test]
    fn live_source_polls_on_interval() {
        let mut scenario = ScenarioConfig::baseline();
        scenario.simulation.steps = 10;
        scenario.live.source = DataSource::Eia;
        scenario.live.poll_interval_ms = 4000;
        let mut calls = 0;
        let mut source = || {
            calls += 1;
            Some(LiveSeed {
                solar_kw: Some(123.0),
                ..LiveSeed::default()
            })
        };
        let result = run_headless(&scenario, &ScriptedNarrator, &mut source);
        // ticks 0, 4, 8
        assert_eq!(calls, 3);
        assert!(result.samples.iter().all(|s| s.is_live && s.solar_kw == 123.0));
        assert_eq!(result.kpi.live_samples, 10);
    }

    #[test]
    fn failed_fetch_keeps_previous_seed() {
        let mut scenario = ScenarioConfig::baseline();
        scenario.simulation.steps = 6;
        scenario.live.source = DataSource::ElectricityMaps;
        scenario.live.poll_interval_ms = 2000;
        let mut calls = 0;
        let mut source = || {
            calls += 1;
            (calls == 1).then(|| LiveSeed {
                wind_kw: Some(77.0),
                ..LiveSeed::default()
            })
        };
        let result = run_headless(&scenario, &ScriptedNarrator, &mut source);
        assert!(result.samples.iter().all(|s| s.wind_kw == 77.0));
    }

    #[test]
    fn simulation_source_never_polls() {
        let mut scenario = ScenarioConfig::baseline();
        scenario.simulation.steps = 5;
        let mut calls = 0;
        let mut source = || {
            calls += 1;
            Some(LiveSeed::default())
        };
        let result = run_headless(&scenario, &ScriptedNarrator, &mut source);
        assert_eq!(calls, 0);
        assert!(result.samples.iter().all(|s| !s.is_live));
    }
}
