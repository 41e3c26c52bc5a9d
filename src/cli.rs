//! Command-line arguments.

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::config::{ConfigError, ScenarioConfig};
use crate::live::{ApiKeys, DataSource};
use crate::narration::NarratorKind;

/// Smart-grid telemetry simulator with multi-agent incident handling.
#[derive(Parser, Debug)]
#[command(name = "greengrid-sim", version, about, long_about = None)]
pub struct Cli {
    /// Load the scenario from a TOML file
    #[arg(long, conflicts_with = "preset")]
    pub scenario: Option<PathBuf>,

    /// Use a built-in preset (baseline, heatwave, fog_bank, green_priority, cost_priority)
    #[arg(long)]
    pub preset: Option<String>,

    /// Override the random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the number of ticks in a headless run
    #[arg(long)]
    pub steps: Option<usize>,

    /// Generation-mix data source
    #[arg(long, value_enum)]
    pub source: Option<DataSource>,

    /// Electricity Maps zone
    #[arg(long)]
    pub zone: Option<String>,

    /// EIA balancing authority
    #[arg(long)]
    pub respondent: Option<String>,

    #[arg(long, env = "ELECTRICITY_MAPS_API_KEY", hide_env_values = true)]
    pub electricity_maps_key: Option<String>,

    #[arg(long, env = "EIA_API_KEY", hide_env_values = true)]
    pub eia_key: Option<String>,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_key: Option<String>,

    /// Negotiation narrator
    #[arg(long, value_enum)]
    pub narrator: Option<NarratorKind>,

    /// Model for the remote narrator
    #[arg(long)]
    pub model: Option<String>,

    /// Export samples to CSV
    #[arg(long)]
    pub telemetry_out: Option<PathBuf>,

    /// Export the agent log to CSV
    #[arg(long)]
    pub log_out: Option<PathBuf>,

    /// Print a compliance summary for the final sample
    #[arg(long)]
    pub esg_report: bool,

    /// Start the REST API server after the run
    #[cfg(feature = "api")]
    #[arg(long)]
    pub serve: bool,

    /// API server port
    #[cfg(feature = "api")]
    #[arg(long, default_value_t = 3000)]
    pub port: u16,

    /// Open the live dashboard instead of a headless run
    #[cfg(feature = "tui")]
    #[arg(long)]
    pub tui: bool,

    /// Write dashboard logs to this file (discarded otherwise)
    #[cfg(feature = "tui")]
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Resolves the scenario: `--scenario`, then `--preset`, then baseline,
    /// with command-line overrides applied on top.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an unreadable file or unknown preset.
    pub fn load_scenario(&self) -> Result<ScenarioConfig, ConfigError> {
        let mut scenario = match (&self.scenario, &self.preset) {
            (Some(path), _) => ScenarioConfig::from_toml_file(Path::new(path))?,
            (None, Some(name)) => ScenarioConfig::from_preset(name)?,
            (None, None) => ScenarioConfig::baseline(),
        };
        self.apply_overrides(&mut scenario);
        Ok(scenario)
    }

    fn apply_overrides(&self, scenario: &mut ScenarioConfig) {
        if let Some(seed) = self.seed {
            scenario.simulation.seed = seed;
        }
        if let Some(steps) = self.steps {
            scenario.simulation.steps = steps;
        }
        if let Some(source) = self.source {
            scenario.live.source = source;
        }
        if let Some(zone) = &self.zone {
            scenario.live.zone.clone_from(zone);
        }
        if let Some(respondent) = &self.respondent {
            scenario.live.eia_respondent.clone_from(respondent);
        }
        if let Some(narrator) = self.narrator {
            scenario.narration.narrator = narrator;
        }
        if let Some(model) = &self.model {
            scenario.narration.model.clone_from(model);
        }
    }

    /// Live provider credentials from flags or environment.
    pub fn api_keys(&self) -> ApiKeys {
        ApiKeys {
            electricity_maps: self.electricity_maps_key.clone(),
            eia: self.eia_key.clone(),
        }
    }
}
