//! Offline narrator with canned transcripts.

use super::prompt::strategy_label;
use super::{AgentLine, Narration, NarrationError, NarrationRequest, Narrator};
use crate::sim::actions::CorrectiveAction;
use crate::sim::anomaly::Anomaly;
use crate::sim::types::{AgentRole, MetricSample};

/// Deterministic narrator used when no generative backend is configured.
///
/// Every anomaly kind maps to a fixed corrective action, and the transcript
/// is assembled from the request so that repeated runs print the same lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedNarrator;

/// Action the scripted agents settle on for an anomaly.
pub fn recommended_action(anomaly: &Anomaly) -> CorrectiveAction {
    match anomaly {
        Anomaly::VoltageDrop { .. } | Anomaly::Co2Intensity { .. } => {
            CorrectiveAction::DispatchBattery
        }
        Anomaly::LoadSpike { .. } => CorrectiveAction::CurtailLoad,
        Anomaly::FrequencyDeviation { .. } => CorrectiveAction::BoostTurbine,
        Anomaly::WeatherTransition { .. } => CorrectiveAction::PreemptiveStorage,
    }
}

impl Narrator for ScriptedNarrator {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn narrate(&self, request: &NarrationRequest) -> Result<Narration, NarrationError> {
        let m = &request.sample;
        let t = &request.thresholds;
        let action = recommended_action(&request.anomaly);

        let forecast_line = if m.weather_forecast.is_clear() {
            "Forecast CLEAR. No future-state constraints to inject.".to_string()
        } else {
            format!(
                "{} detected T-minus 10 mins. Initiating storage spin-up.",
                m.weather_forecast
            )
        };
        let manager_line = format!(
            "Strategy {}. Grid import at {:.0} kW costing ${:.3}/kWh; {} is acceptable if it prevents a trip.",
            strategy_label(request.bias),
            m.grid_supply_kw,
            m.cost_per_kwh,
            action
        );
        let critic_line = format!(
            "Voltage {:.2} V against a {:.1} V floor, frequency {:.2} Hz within ±{} Hz required. {}",
            m.voltage_v,
            t.voltage_trigger_v(),
            m.frequency_hz,
            t.frequency_deviation_hz,
            match request.anomaly {
                Anomaly::VoltageDrop { .. } | Anomaly::FrequencyDeviation { .. } => {
                    "Current state is unsafe."
                }
                _ => "Plan approved if margins hold.",
            }
        );
        let writer_line = format!(
            "Recalculating for {}: load {:.0} kW, solar {:.0} kW, wind {:.0} kW. New plan: {}.",
            request.anomaly, m.load_kw, m.solar_kw, m.wind_kw, action
        );

        Ok(Narration {
            transcript: vec![
                AgentLine::new(AgentRole::WeatherForecaster, forecast_line),
                AgentLine::new(AgentRole::GridManager, manager_line),
                AgentLine::new(AgentRole::SafetyCritic, critic_line),
                AgentLine::new(AgentRole::OptimizationWriter, writer_line),
            ],
            action: action.as_str().to_string(),
        })
    }

    fn compliance_summary(&self, sample: &MetricSample) -> Result<String, NarrationError> {
        Ok(format!(
            "**ESG Executive Summary.** The GreenGrid microgrid has avoided {:.1} kg of CO2 \
             against an 800 g/kWh baseline, with current carbon intensity at {:.1} g/kWh. \
             Predictive weather monitoring (current outlook: {}) pre-positions storage ahead of \
             renewable shortfalls, keeping the grid stable without fossil ramp-ups.",
            sample.accumulated_co2_saved_kg, sample.co2_intensity, sample.weather_forecast
        ))
    }
}
