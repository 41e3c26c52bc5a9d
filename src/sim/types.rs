//! Core simulation types: telemetry samples, operator settings, and live seeds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Nominal distribution voltage (V).
pub const NOMINAL_VOLTAGE_V: f64 = 230.0;
/// Nominal system frequency (Hz).
pub const NOMINAL_FREQUENCY_HZ: f64 = 50.0;
/// Nominal load used to scale the load-spike threshold (kW).
pub const NOMINAL_LOAD_KW: f64 = 500.0;

/// Short-range weather outlook derived from the slow weather cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeatherForecast {
    /// No generation-relevant weather ahead.
    #[default]
    Clear,
    /// Fog bank approaching; solar output will collapse.
    FogIncoming,
    /// Wind lull approaching; wind output will collapse.
    LowWindCorridor,
}

impl WeatherForecast {
    /// Returns the wire label (`"CLEAR"`, `"FOG_INCOMING"`, `"LOW_WIND_CORRIDOR"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clear => "CLEAR",
            Self::FogIncoming => "FOG_INCOMING",
            Self::LowWindCorridor => "LOW_WIND_CORRIDOR",
        }
    }

    /// Returns `true` for [`WeatherForecast::Clear`].
    pub fn is_clear(self) -> bool {
        self == Self::Clear
    }
}

impl fmt::Display for WeatherForecast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One telemetry record produced by the generator.
///
/// Samples are plain values: the generator creates a new one per tick and
/// corrective actions return modified copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Tick index (1-based, the first generated sample is tick 1).
    pub tick: u64,
    /// Simulated wall-clock time in milliseconds.
    pub timestamp_ms: u64,
    /// Demand (kW).
    pub load_kw: f64,
    /// Solar generation (kW).
    pub solar_kw: f64,
    /// Wind generation (kW).
    pub wind_kw: f64,
    /// External grid / fossil backup supply (kW).
    pub grid_supply_kw: f64,
    /// Battery discharge into the microgrid (kW).
    pub battery_discharge_kw: f64,
    /// Bus voltage (V).
    pub voltage_v: f64,
    /// System frequency (Hz).
    pub frequency_hz: f64,
    /// Carbon intensity of the supply mix (g/kWh).
    pub co2_intensity: f64,
    /// Blended supply cost ($/kWh).
    pub cost_per_kwh: f64,
    /// Weather outlook at this tick.
    pub weather_forecast: WeatherForecast,
    /// Running total of CO2 avoided versus an 800 g/kWh baseline (kg).
    pub accumulated_co2_saved_kg: f64,
    /// Whether the generation mix came from a live data provider.
    pub is_live: bool,
}

impl MetricSample {
    /// Renewable generation (solar + wind) in kW.
    pub fn renewable_kw(&self) -> f64 {
        self.solar_kw + self.wind_kw
    }
}

impl fmt::Display for MetricSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>4} | load={:>7.2}  solar={:>6.2}  wind={:>6.2}  grid={:>7.2}  bat={:>6.2} kW \
             | {:>6.2} V  {:>5.2} Hz | co2={:>5.1} g/kWh  cost=${:.3} | {} | saved={:.1} kg{}",
            self.tick,
            self.load_kw,
            self.solar_kw,
            self.wind_kw,
            self.grid_supply_kw,
            self.battery_discharge_kw,
            self.voltage_v,
            self.frequency_hz,
            self.co2_intensity,
            self.cost_per_kwh,
            self.weather_forecast,
            self.accumulated_co2_saved_kg,
            if self.is_live { " [live]" } else { "" },
        )
    }
}

/// Operator-tunable generation and dispatch settings, read on every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Solar derating factor (1.0 = nominal).
    pub solar_efficiency: f64,
    /// Wind derating factor (1.0 = nominal).
    pub wind_efficiency: f64,
    /// Demand multiplier used for stress testing.
    pub load_multiplier: f64,
    /// Battery power ceiling (kW); bias-driven dispatch never exceeds it.
    pub battery_capacity: f64,
    /// 0 = cheapest supply, 100 = greenest supply.
    pub optimization_bias: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            solar_efficiency: 1.0,
            wind_efficiency: 1.0,
            load_multiplier: 1.0,
            battery_capacity: 1000.0,
            optimization_bias: 50.0,
        }
    }
}

/// Partial sample supplied by a live data provider.
///
/// Any present field overrides the synthetic value for that tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveSeed {
    /// Solar generation (kW, already scaled to microgrid range).
    pub solar_kw: Option<f64>,
    /// Wind generation (kW).
    pub wind_kw: Option<f64>,
    /// Demand before the operator load multiplier (kW).
    pub load_kw: Option<f64>,
    /// Conventional supply (kW).
    pub grid_supply_kw: Option<f64>,
    /// Carbon intensity (g/kWh).
    pub co2_intensity: Option<f64>,
}

/// Dashboard status banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GridStatus {
    /// No incident in flight.
    #[default]
    Normal,
    /// An anomaly is being negotiated or corrected.
    Optimizing,
}

impl fmt::Display for GridStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "NORMAL",
            Self::Optimizing => "OPTIMIZING",
        })
    }
}

/// Speaker attached to an agent log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentRole {
    #[serde(rename = "Grid_Manager")]
    GridManager,
    #[serde(rename = "Optimization_Writer")]
    OptimizationWriter,
    #[serde(rename = "Safety_Critic")]
    SafetyCritic,
    #[serde(rename = "Weather_Forecaster")]
    WeatherForecaster,
    #[serde(rename = "ESG_Auditor")]
    EsgAuditor,
    System,
}

impl AgentRole {
    /// Returns the wire label, e.g. `"Grid_Manager"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GridManager => "Grid_Manager",
            Self::OptimizationWriter => "Optimization_Writer",
            Self::SafetyCritic => "Safety_Critic",
            Self::WeatherForecaster => "Weather_Forecaster",
            Self::EsgAuditor => "ESG_Auditor",
            Self::System => "System",
        }
    }

    /// Parses a wire label exactly; `None` for anything else.
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Grid_Manager" => Some(Self::GridManager),
            "Optimization_Writer" => Some(Self::OptimizationWriter),
            "Safety_Critic" => Some(Self::SafetyCritic),
            "Weather_Forecaster" => Some(Self::WeatherForecaster),
            "ESG_Auditor" => Some(Self::EsgAuditor),
            "System" => Some(Self::System),
            _ => None,
        }
    }

    /// Parses a narrator-supplied label. Unrecognised labels map to
    /// [`AgentRole::System`].
    pub fn from_label(label: &str) -> Self {
        Self::parse_label(label).unwrap_or(Self::System)
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the agent activity log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentLog {
    /// Monotonic id within one engine.
    pub id: u64,
    /// Engine clock when the line was released (ms).
    pub elapsed_ms: u64,
    pub role: AgentRole,
    pub message: String,
}

impl fmt::Display for AgentLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:>7.1}s] {:<19} {}",
            self.elapsed_ms as f64 / 1000.0,
            self.role,
            self.message
        )
    }
}

/// Rounds `value` to `decimals` decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}
