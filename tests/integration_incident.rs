//! Integration tests for the anomaly → negotiation → action → revert cycle.

mod common;

use greengrid_sim::sim::types::AgentRole;

fn messages(result: &greengrid_sim::runner::RunResult) -> Vec<&str> {
    result.logs.iter().map(|l| l.message.as_str()).collect()
}

#[test]
fn incident_runs_full_cycle() {
    let result = common::run_scripted(&common::hair_trigger_scenario(12));
    let logs = &result.logs;

    assert!(logs[0].message.starts_with("ANOMALY DETECTED: Voltage Drop"));
    assert!(logs[0].message.ends_with("Triggering Multi-Agent Negotiation..."));
    assert_eq!(logs[0].elapsed_ms, 1000);

    // four transcript lines, first released at resolve time
    let roles: Vec<AgentRole> = logs[1..5].iter().map(|l| l.role).collect();
    assert_eq!(
        roles,
        [
            AgentRole::WeatherForecaster,
            AgentRole::GridManager,
            AgentRole::SafetyCritic,
            AgentRole::OptimizationWriter,
        ]
    );
    let released: Vec<u64> = logs[1..5].iter().map(|l| l.elapsed_ms).collect();
    assert_eq!(released, [1000, 3000, 4000, 5000]);

    assert_eq!(logs[5].message, "CONSENSUS REACHED: EXECUTING DISPATCH_BATTERY");
    assert_eq!(logs[5].elapsed_ms, 7000);
    assert_eq!(logs[6].message, "Stability restored. Agents standing by.");
    assert_eq!(logs[6].elapsed_ms, 12_000);
}

#[test]
fn override_applies_between_activation_and_revert() {
    let result = common::run_scripted(&common::hair_trigger_scenario(12));
    for s in &result.samples {
        if (7..=11).contains(&s.tick) {
            assert_eq!(s.battery_discharge_kw, 200.0, "tick {}", s.tick);
        } else if s.tick <= 6 {
            assert!(s.battery_discharge_kw <= 150.0, "tick {}", s.tick);
        }
    }
}

#[test]
fn balanced_bias_holds_dispatched_battery_through_revert() {
    let scenario = common::hair_trigger_scenario(12);
    assert_eq!(scenario.grid.optimization_bias, 50.0);
    let result = common::run_scripted(&scenario);
    let revert_tick = &result.samples[11];
    assert_eq!(revert_tick.tick, 12);
    assert_eq!(revert_tick.battery_discharge_kw, 200.0);
    assert!(
        result
            .logs
            .iter()
            .any(|l| l.message == "Stability restored. Agents standing by." && l.elapsed_ms == 12_000)
    );
}

#[test]
fn triggers_during_incident_are_dropped() {
    let result = common::run_scripted(&common::hair_trigger_scenario(30));
    let detections = messages(&result)
        .iter()
        .filter(|m| m.starts_with("ANOMALY DETECTED"))
        .count();
    // one incident per 11 s cycle (ticks 1, 12, 23)
    assert_eq!(detections, 3);
    assert_eq!(result.kpi.incident_count, 3);
}

#[test]
fn quiet_thresholds_never_open_incidents_on_clear_weather() {
    let mut scenario = common::short_scenario(10);
    scenario.thresholds = common::quiet_thresholds();
    let result = common::run_scripted(&scenario);
    let non_weather = messages(&result)
        .iter()
        .filter(|m| m.starts_with("ANOMALY DETECTED") && !m.contains("Predictive Alert"))
        .count();
    assert_eq!(non_weather, 0);
}
