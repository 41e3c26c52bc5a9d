//! Prompt construction and response parsing for generative narrators.

use serde::Deserialize;

use super::{AgentLine, Narration, NarrationError, NarrationRequest};
use crate::sim::actions::FALLBACK_ACTION;
use crate::sim::types::{AgentRole, MetricSample};

/// Bias label when stability and emissions come first.
pub const ESG_STRATEGY: &str = "MAXIMIZE_ESG_AND_STABILITY";
/// Bias label when cost comes first.
pub const PROFIT_STRATEGY: &str = "MAXIMIZE_PROFIT_MINIMIZE_COST";

/// Returns the strategy label for an optimization bias.
pub fn strategy_label(bias: f64) -> &'static str {
    if bias > 50.0 {
        ESG_STRATEGY
    } else {
        PROFIT_STRATEGY
    }
}

/// Builds the multi-agent negotiation prompt.
pub fn negotiation_prompt(request: &NarrationRequest) -> String {
    let m = &request.sample;
    let t = &request.thresholds;
    let strategy = strategy_label(request.bias);
    let voltage_floor = format!("{:.1}", t.voltage_trigger_v());

    format!(
        "Role: You are a Multi-Agent Smart Grid Control System with Predictive Capabilities.

Context:
- Optimization Strategy: {strategy} (Slider Value: {bias}/100)
- Weather Forecast: {forecast}
- Accumulated CO2 Saved: {saved} kg

Telemetry (Current State):
- Voltage: {voltage}V (Safe Range: > {voltage_floor}V)
- Frequency: {frequency}Hz (Safe Range: 50Hz ± {freq_dev})
- CO2 Intensity: {co2}g/kWh (Limit: < {co2_max})
- Load: {load}kW
- Solar: {solar}kW | Wind: {wind}kW
- Battery Output: {battery}kW

Anomaly/Event: {anomaly}

Predictive Weather Agent:
- If Forecast is NOT \"CLEAR\", inject future-state variables into the optimization.
- Switch the constraint from \"P_wind <= Current_Wind\" to \"P_wind <= f(Forecast_Wind)\".
- If FOG_INCOMING: anticipate a 60% solar drop.
- If LOW_WIND_CORRIDOR: anticipate a 70% wind drop.

Agents:
1. [Weather_Forecaster]: analyzes the forecast and orders pre-emptive action on imminent bad weather.
2. [Grid_Manager]: maximizes profit, but accepts spending now to prevent a blackout later.
3. [Safety_Critic]: denies any plan that risks Voltage < {voltage_floor}V or Frequency Deviation > {freq_dev}Hz.
4. [Optimization_Writer]: mediates and computes the new dispatch plan using the forecasted constraints.

Output Format (JSON):
{{
  \"logs\": [
    {{ \"role\": \"Weather_Forecaster\", \"message\": \"...\" }},
    {{ \"role\": \"Grid_Manager\", \"message\": \"...\" }},
    {{ \"role\": \"Safety_Critic\", \"message\": \"...\" }},
    {{ \"role\": \"Optimization_Writer\", \"message\": \"...\" }}
  ],
  \"final_action\": \"DISPATCH_BATTERY\" | \"CURTAIL_LOAD\" | \"BOOST_TURBINE\" | \"PREEMPTIVE_STORAGE\"
}}

Style: internal monologue, show the friction between cost and safety, and name the constraint shift in the Optimization_Writer line.
",
        bias = request.bias,
        forecast = m.weather_forecast,
        saved = m.accumulated_co2_saved_kg,
        voltage = m.voltage_v,
        frequency = m.frequency_hz,
        freq_dev = t.frequency_deviation_hz,
        co2 = m.co2_intensity,
        co2_max = t.max_co2_intensity,
        load = m.load_kw,
        solar = m.solar_kw,
        wind = m.wind_kw,
        battery = m.battery_discharge_kw,
        anomaly = request.anomaly,
    )
}

/// Builds the compliance summary prompt.
pub fn summary_prompt(sample: &MetricSample) -> String {
    format!(
        "Generate a professional, audit-ready ESG Executive Summary for the GreenGrid smart grid.

Data:
- Total CO2 Avoided: {} kg
- Current Carbon Intensity: {} g/kWh
- Grid Status: Stable

Format: Markdown, 3-4 sentences, regulatory tone. Highlight the predictive contribution to \
sustainability and the weather adaptation logic.
",
        sample.accumulated_co2_saved_kg, sample.co2_intensity
    )
}

#[derive(Debug, Deserialize)]
struct RawNarration {
    logs: Vec<RawLine>,
    #[serde(default)]
    final_action: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLine {
    #[serde(default)]
    role: String,
    #[serde(default)]
    message: String,
}

/// Parses a `{logs: [{role, message}], final_action}` document.
///
/// Unknown roles become [`AgentRole::System`]; a missing or empty
/// `final_action` becomes `IGNORE`.
///
/// # Errors
///
/// Returns [`NarrationError::Malformed`] when the text is not JSON or lacks
/// a `logs` array.
pub fn parse_narration(text: &str) -> Result<Narration, NarrationError> {
    let raw: RawNarration =
        serde_json::from_str(text).map_err(|e| NarrationError::Malformed(e.to_string()))?;
    let transcript = raw
        .logs
        .into_iter()
        .map(|l| AgentLine::new(AgentRole::from_label(&l.role), l.message))
        .collect();
    let action = raw
        .final_action
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| FALLBACK_ACTION.to_string());
    Ok(Narration { transcript, action })
}
