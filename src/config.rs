//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::live::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_RESPONDENT, DEFAULT_ZONE, DataSource};
use crate::narration::{DEFAULT_MODEL, NarratorKind};
use crate::sim::anomaly::{
    AnomalyThresholds, BIAS_RANGE, FREQUENCY_DEVIATION_RANGE, LOAD_INCREASE_RANGE, MAX_CO2_RANGE,
    VOLTAGE_DROP_RANGE,
};
use crate::sim::engine::EngineSettings;
use crate::sim::incident::IncidentTimings;
use crate::sim::types::SimulationConfig;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Run length, timing, and buffers.
    #[serde(default)]
    pub simulation: RunConfig,
    /// Operator generation and dispatch settings.
    #[serde(default)]
    pub grid: SimulationConfig,
    /// Anomaly trip points.
    #[serde(default)]
    pub thresholds: AnomalyThresholds,
    /// Live data provider.
    #[serde(default)]
    pub live: LiveConfig,
    /// Negotiation narrator and incident timings.
    #[serde(default)]
    pub narration: NarrationConfig,
}

/// Run length, timing, and buffers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Master random seed.
    pub seed: u64,
    /// Ticks in a headless run (must be > 0).
    pub steps: usize,
    /// Wall-clock time per tick (ms, must be > 0).
    pub tick_interval_ms: u64,
    /// Simulated time per tick (ms, must be > 0).
    pub sim_ms_per_tick: u64,
    /// Rolling sample history length (must be > 0).
    pub history_len: usize,
    /// Rolling agent log length (must be > 0).
    pub log_len: usize,
    /// Simulated clock at start (ms).
    pub start_timestamp_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        let engine = EngineSettings::default();
        Self {
            seed: engine.seed,
            steps: 120,
            tick_interval_ms: engine.tick_interval_ms,
            sim_ms_per_tick: engine.sim_ms_per_tick,
            history_len: engine.history_len,
            log_len: engine.log_len,
            start_timestamp_ms: engine.start_timestamp_ms,
        }
    }
}

/// Live data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LiveConfig {
    /// `"simulation"`, `"electricity_maps"`, or `"eia"`.
    pub source: DataSource,
    /// Electricity Maps zone.
    pub zone: String,
    /// EIA balancing authority.
    pub eia_respondent: String,
    /// Interval between fetches (ms, must be > 0).
    pub poll_interval_ms: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            source: DataSource::Simulation,
            zone: DEFAULT_ZONE.to_string(),
            eia_respondent: DEFAULT_RESPONDENT.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

/// Negotiation narrator and incident timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NarrationConfig {
    /// `"scripted"` or `"gemini"`.
    pub narrator: NarratorKind,
    /// Model identifier for remote narrators.
    pub model: String,
    /// Gap between transcript lines (ms).
    pub stagger_ms: u64,
    /// Pause before the action executes (ms).
    pub settle_ms: u64,
    /// Duration of the corrective action (ms, must be > 0).
    pub revert_ms: u64,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        let timings = IncidentTimings::default();
        Self {
            narrator: NarratorKind::Scripted,
            model: DEFAULT_MODEL.to_string(),
            stagger_ms: timings.stagger_ms,
            settle_ms: timings.settle_ms,
            revert_ms: timings.revert_ms,
        }
    }
}

impl NarrationConfig {
    pub fn timings(&self) -> IncidentTimings {
        IncidentTimings {
            stagger_ms: self.stagger_ms,
            settle_ms: self.settle_ms,
            revert_ms: self.revert_ms,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.steps"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

fn check_range(
    errors: &mut Vec<ConfigError>,
    field: &str,
    value: f64,
    range: &std::ops::RangeInclusive<f64>,
) {
    if !range.contains(&value) {
        errors.push(ConfigError::new(
            field,
            format!("must be in [{}, {}], got {value}", range.start(), range.end()),
        ));
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario (dashboard start-up settings).
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the heatwave preset: heavy demand and hot-weather solar loss.
    pub fn heatwave() -> Self {
        Self {
            grid: SimulationConfig {
                load_multiplier: 1.8,
                solar_efficiency: 0.85,
                ..SimulationConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the fog-bank preset: solar collapse with a green-leaning operator.
    pub fn fog_bank() -> Self {
        Self {
            grid: SimulationConfig {
                solar_efficiency: 0.3,
                optimization_bias: 70.0,
                ..SimulationConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the green-priority preset: aggressive battery use, tight CO2 ceiling.
    pub fn green_priority() -> Self {
        Self {
            grid: SimulationConfig {
                optimization_bias: 90.0,
                ..SimulationConfig::default()
            },
            thresholds: AnomalyThresholds {
                max_co2_intensity: 250.0,
                ..AnomalyThresholds::default()
            },
            ..Self::default()
        }
    }

    /// Returns the cost-priority preset: battery parked, loose CO2 ceiling.
    pub fn cost_priority() -> Self {
        Self {
            grid: SimulationConfig {
                optimization_bias: 10.0,
                ..SimulationConfig::default()
            },
            thresholds: AnomalyThresholds {
                max_co2_intensity: 700.0,
                ..AnomalyThresholds::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &[
        "baseline",
        "heatwave",
        "fog_bank",
        "green_priority",
        "cost_priority",
    ];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "heatwave" => Ok(Self::heatwave()),
            "fog_bank" => Ok(Self::fog_bank()),
            "green_priority" => Ok(Self::green_priority()),
            "cost_priority" => Ok(Self::cost_priority()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Engine parameters derived from this scenario.
    pub fn engine_settings(&self) -> EngineSettings {
        let s = &self.simulation;
        EngineSettings {
            seed: s.seed,
            tick_interval_ms: s.tick_interval_ms,
            sim_ms_per_tick: s.sim_ms_per_tick,
            history_len: s.history_len,
            log_len: s.log_len,
            start_timestamp_ms: s.start_timestamp_ms,
            timings: self.narration.timings(),
        }
    }

    /// Ticks between live fetches (at least 1).
    pub fn poll_every_ticks(&self) -> u64 {
        let tick = self.simulation.tick_interval_ms.max(1);
        (self.live.poll_interval_ms / tick).max(1)
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let s = &self.simulation;
        if s.steps == 0 {
            errors.push(ConfigError::new("simulation.steps", "must be > 0"));
        }
        if s.tick_interval_ms == 0 {
            errors.push(ConfigError::new("simulation.tick_interval_ms", "must be > 0"));
        }
        if s.sim_ms_per_tick == 0 {
            errors.push(ConfigError::new("simulation.sim_ms_per_tick", "must be > 0"));
        }
        if s.history_len == 0 {
            errors.push(ConfigError::new("simulation.history_len", "must be > 0"));
        }
        if s.log_len == 0 {
            errors.push(ConfigError::new("simulation.log_len", "must be > 0"));
        }

        let g = &self.grid;
        for (field, value) in [
            ("grid.solar_efficiency", g.solar_efficiency),
            ("grid.wind_efficiency", g.wind_efficiency),
            ("grid.load_multiplier", g.load_multiplier),
            ("grid.battery_capacity", g.battery_capacity),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                errors.push(ConfigError::new(field, "must be a finite value >= 0"));
            }
        }
        check_range(&mut errors, "grid.optimization_bias", g.optimization_bias, &BIAS_RANGE);

        let t = &self.thresholds;
        check_range(
            &mut errors,
            "thresholds.voltage_drop_percent",
            t.voltage_drop_percent,
            &VOLTAGE_DROP_RANGE,
        );
        check_range(
            &mut errors,
            "thresholds.load_increase_percent",
            t.load_increase_percent,
            &LOAD_INCREASE_RANGE,
        );
        check_range(
            &mut errors,
            "thresholds.frequency_deviation_hz",
            t.frequency_deviation_hz,
            &FREQUENCY_DEVIATION_RANGE,
        );
        check_range(
            &mut errors,
            "thresholds.max_co2_intensity",
            t.max_co2_intensity,
            &MAX_CO2_RANGE,
        );

        let l = &self.live;
        if l.poll_interval_ms == 0 {
            errors.push(ConfigError::new("live.poll_interval_ms", "must be > 0"));
        }
        if l.source == DataSource::ElectricityMaps && l.zone.trim().is_empty() {
            errors.push(ConfigError::new("live.zone", "must not be empty"));
        }
        if l.source == DataSource::Eia && l.eia_respondent.trim().is_empty() {
            errors.push(ConfigError::new("live.eia_respondent", "must not be empty"));
        }

        let n = &self.narration;
        if n.revert_ms == 0 {
            errors.push(ConfigError::new("narration.revert_ms", "must be > 0"));
        }
        if n.narrator == NarratorKind::Gemini && n.model.trim().is_empty() {
            errors.push(ConfigError::new("narration.model", "must not be empty"));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = ScenarioConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent");
        assert!(err.is_err());
        assert!(err.is_err_and(|e| e.message.contains("unknown preset")));
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[simulation]
seed = 7
steps = 300
tick_interval_ms = 500
sim_ms_per_tick = 4000
history_len = 30

[grid]
solar_efficiency = 0.9
load_multiplier = 1.2
optimization_bias = 80

[thresholds]
voltage_drop_percent = 5
max_co2_intensity = 300

[live]
source = "eia"
eia_respondent = "CISO"
poll_interval_ms = 60000

[narration]
narrator = "gemini"
stagger_ms = 800
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok();
        let cfg = cfg.as_ref();
        assert_eq!(cfg.map(|c| c.simulation.steps), Some(300));
        assert_eq!(cfg.map(|c| c.grid.optimization_bias), Some(80.0));
        assert_eq!(cfg.map(|c| c.live.source), Some(DataSource::Eia));
        assert_eq!(cfg.map(|c| c.narration.narrator), Some(NarratorKind::Gemini));
        assert_eq!(cfg.map(|c| c.narration.settle_ms), Some(1000));
        assert_eq!(cfg.map(|c| c.poll_every_ticks()), Some(120));
        assert_eq!(cfg.map(|c| c.validate().len()), Some(0));
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[grid]
solar_efficiency = 1.0
bogus_field = true
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn unknown_source_is_rejected() {
        let toml = r#"
[live]
source = "smart_meter"
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn validation_catches_zero_steps() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.steps = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "simulation.steps"));
    }

    #[test]
    fn validation_reports_every_threshold() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.thresholds = AnomalyThresholds {
            voltage_drop_percent: 0.5,
            load_increase_percent: 150.0,
            frequency_deviation_hz: 3.0,
            max_co2_intensity: 50.0,
        };
        cfg.grid.optimization_bias = 120.0;
        let errors = cfg.validate();
        assert_eq!(errors.len(), 5, "{errors:?}");
        assert!(errors.iter().any(|e| e.field == "grid.optimization_bias"));
    }

    #[test]
    fn validation_catches_negative_multiplier() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.grid.load_multiplier = -1.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "grid.load_multiplier"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn heatwave_raises_demand() {
        let base = ScenarioConfig::baseline();
        let hot = ScenarioConfig::heatwave();
        assert!(hot.grid.load_multiplier > base.grid.load_multiplier);
    }

    #[test]
    fn engine_settings_follow_scenario() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.seed = 99;
        cfg.narration.revert_ms = 2500;
        let settings = cfg.engine_settings();
        assert_eq!(settings.seed, 99);
        assert_eq!(settings.timings.revert_ms, 2500);
        assert_eq!(settings.history_len, 60);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[simulation]
seed = 99
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).ok();
        assert_eq!(cfg.as_ref().map(|c| c.simulation.seed), Some(99));
        assert_eq!(cfg.as_ref().map(|c| c.simulation.steps), Some(120));
        assert_eq!(cfg.as_ref().map(|c| c.thresholds.voltage_drop_percent), Some(9.0));
        assert_eq!(cfg.map(|c| c.live.zone), Some("US-CAL-CISO".to_string()));
    }
}
