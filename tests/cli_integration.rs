//! End-to-end tests through the compiled binary.

use std::path::PathBuf;
use std::process::{Command, Output};

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_greengrid-sim"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("greengrid-sim process should run")
}

fn peak_load(stdout: &str) -> f64 {
    stdout
        .lines()
        .find_map(|l| l.strip_prefix("Peak load:"))
        .and_then(|rest| rest.trim().trim_end_matches("kW").trim().parse().ok())
        .expect("KPI block should contain a peak load line")
}

#[test]
fn preset_run_prints_samples_and_kpis() {
    let output = run(&["--preset", "baseline", "--steps", "15"]);
    assert!(
        output.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).expect("stdout should be valid UTF-8");
    assert!(stdout.contains("--- KPI Report ---"));
    assert!(stdout.contains("Samples:               15"));
}

#[test]
fn scenario_files_produce_distinct_dynamics() {
    let baseline = run(&["--scenario", "scenarios/baseline.toml", "--steps", "60"]);
    let heatwave = run(&["--scenario", "scenarios/heatwave.toml", "--steps", "60"]);
    assert!(baseline.status.success());
    assert!(heatwave.status.success());

    let base_peak = peak_load(&String::from_utf8_lossy(&baseline.stdout));
    let heat_peak = peak_load(&String::from_utf8_lossy(&heatwave.stdout));
    assert!(
        heat_peak > base_peak,
        "expected heatwave peak {heat_peak:.1} above baseline {base_peak:.1}"
    );
}

#[test]
fn telemetry_out_writes_one_row_per_tick() {
    let path = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("cli_telemetry.csv");
    let path_str = path.to_string_lossy().to_string();
    let output = run(&["--steps", "25", "--telemetry-out", &path_str]);
    assert!(output.status.success());

    let csv = std::fs::read_to_string(&path).expect("CSV should exist");
    let mut lines = csv.lines();
    assert!(
        lines
            .next()
            .is_some_and(|h| h.starts_with("tick,timestamp_ms,load_kw"))
    );
    assert_eq!(lines.count(), 25);
}

#[test]
fn invalid_override_exits_with_field_errors() {
    let output = run(&["--steps", "0"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("simulation.steps"), "stderr={stderr}");
}

#[test]
fn unknown_scenario_key_is_rejected() {
    let path = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("cli_bad_scenario.toml");
    std::fs::write(&path, "[grid]\nsolar_eficiency = 0.5\n").expect("write scenario");
    let output = run(&["--scenario", &path.to_string_lossy()]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn scenario_and_preset_are_mutually_exclusive() {
    let output = run(&["--scenario", "scenarios/baseline.toml", "--preset", "baseline"]);
    assert!(!output.status.success());
}

#[test]
fn gemini_without_key_falls_back_to_ignore() {
    let path = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("cli_overloaded.toml");
    std::fs::write(
        &path,
        "[grid]\nload_multiplier = 2.0\n\n[thresholds]\nload_increase_percent = 10.0\n",
    )
    .expect("write scenario");

    let output = Command::new(env!("CARGO_BIN_EXE_greengrid-sim"))
        .args(["--scenario", &path.to_string_lossy(), "--narrator", "gemini", "--steps", "12"])
        .env_remove("RUST_LOG")
        .env_remove("GEMINI_API_KEY")
        .output()
        .expect("greengrid-sim process should run");
    assert!(
        output.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ANOMALY DETECTED"), "stdout={stdout}");
    assert!(stdout.contains("CONSENSUS REACHED: EXECUTING IGNORE"), "stdout={stdout}");
}
