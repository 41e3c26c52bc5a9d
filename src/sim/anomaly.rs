//! Threshold evaluation.
//!
//! At most one anomaly is reported per tick; checks run in a fixed priority
//! order and the first breach wins.

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::types::{MetricSample, NOMINAL_FREQUENCY_HZ, NOMINAL_LOAD_KW, NOMINAL_VOLTAGE_V, WeatherForecast};

/// Operator range for [`AnomalyThresholds::voltage_drop_percent`].
pub const VOLTAGE_DROP_RANGE: RangeInclusive<f64> = 1.0..=20.0;
/// Operator range for [`AnomalyThresholds::load_increase_percent`].
pub const LOAD_INCREASE_RANGE: RangeInclusive<f64> = 10.0..=100.0;
/// Operator range for [`AnomalyThresholds::frequency_deviation_hz`].
pub const FREQUENCY_DEVIATION_RANGE: RangeInclusive<f64> = 0.1..=2.0;
/// Operator range for [`AnomalyThresholds::max_co2_intensity`].
pub const MAX_CO2_RANGE: RangeInclusive<f64> = 100.0..=800.0;
/// Operator range for the optimization bias.
pub const BIAS_RANGE: RangeInclusive<f64> = 0.0..=100.0;

/// Operator-tunable trip points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnomalyThresholds {
    /// Allowed sag below nominal voltage (%).
    pub voltage_drop_percent: f64,
    /// Allowed rise above nominal load (%).
    pub load_increase_percent: f64,
    /// Allowed deviation from 50 Hz.
    pub frequency_deviation_hz: f64,
    /// Carbon intensity ceiling (g/kWh).
    pub max_co2_intensity: f64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            voltage_drop_percent: 9.0,
            load_increase_percent: 60.0,
            frequency_deviation_hz: 0.5,
            max_co2_intensity: 450.0,
        }
    }
}

impl AnomalyThresholds {
    /// Voltage below which a drop is reported.
    pub fn voltage_trigger_v(&self) -> f64 {
        NOMINAL_VOLTAGE_V * (1.0 - self.voltage_drop_percent / 100.0)
    }

    /// Load above which a spike is reported.
    pub fn load_trigger_kw(&self) -> f64 {
        NOMINAL_LOAD_KW * (1.0 + self.load_increase_percent / 100.0)
    }
}

/// A single-cause threshold breach.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// Voltage fell below the configured floor.
    VoltageDrop { limit_percent: f64 },
    /// Load rose above the configured ceiling.
    LoadSpike { limit_percent: f64 },
    /// Frequency left the allowed band.
    FrequencyDeviation { frequency_hz: f64 },
    /// Carbon intensity exceeded the ESG ceiling.
    Co2Intensity { intensity: f64, max: f64 },
    /// Forecast changed from clear to a generation-relevant event.
    WeatherTransition { forecast: WeatherForecast },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VoltageDrop { limit_percent } => {
                write!(f, "Voltage Drop (-{limit_percent}% limit)")
            }
            Self::LoadSpike { limit_percent } => write!(f, "Load Spike (+{limit_percent}% limit)"),
            Self::FrequencyDeviation { frequency_hz } => {
                write!(f, "Frequency Deviation ({frequency_hz:.2}Hz)")
            }
            Self::Co2Intensity { intensity, max } => {
                write!(f, "ESG Violation: CO2 Intensity ({intensity:.0}g/kWh > {max})")
            }
            Self::WeatherTransition { forecast } => write!(f, "Predictive Alert: {forecast}"),
        }
    }
}

/// Checks `sample` against `thresholds`.
///
/// # Arguments
///
/// * `sample` - Sample to inspect
/// * `prev` - Previous sample, used for forecast transitions
/// * `thresholds` - Current trip points
///
/// # Returns
///
/// The highest-priority breach, or `None`.
pub fn evaluate(
    sample: &MetricSample,
    prev: Option<&MetricSample>,
    thresholds: &AnomalyThresholds,
) -> Option<Anomaly> {
    if sample.voltage_v < thresholds.voltage_trigger_v() {
        return Some(Anomaly::VoltageDrop {
            limit_percent: thresholds.voltage_drop_percent,
        });
    }
    if sample.load_kw > thresholds.load_trigger_kw() {
        return Some(Anomaly::LoadSpike {
            limit_percent: thresholds.load_increase_percent,
        });
    }
    if (sample.frequency_hz - NOMINAL_FREQUENCY_HZ).abs() > thresholds.frequency_deviation_hz {
        return Some(Anomaly::FrequencyDeviation {
            frequency_hz: sample.frequency_hz,
        });
    }
    if sample.co2_intensity > thresholds.max_co2_intensity {
        return Some(Anomaly::Co2Intensity {
            intensity: sample.co2_intensity,
            max: thresholds.max_co2_intensity,
        });
    }
    let was_clear = prev.is_some_and(|p| p.weather_forecast.is_clear());
    if !sample.weather_forecast.is_clear() && was_clear {
        return Some(Anomaly::WeatherTransition {
            forecast: sample.weather_forecast,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nominal() -> MetricSample {
        MetricSample {
            tick: 1,
            timestamp_ms: 2000,
            load_kw: 500.0,
            solar_kw: 150.0,
            wind_kw: 200.0,
            grid_supply_kw: 150.0,
            battery_discharge_kw: 0.0,
            voltage_v: 230.0,
            frequency_hz: 50.0,
            co2_intensity: 120.0,
            cost_per_kwh: 0.095,
            weather_forecast: WeatherForecast::Clear,
            accumulated_co2_saved_kg: 0.3,
            is_live: false,
        }
    }

    #[test]
    fn voltage_trigger_uses_percent_of_nominal() {
        let t = AnomalyThresholds::default();
        assert!((t.voltage_trigger_v() - 209.3).abs() < 1e-9);
        assert!((t.load_trigger_kw() - 800.0).abs() < 1e-9);
    }

    #[test]
    fn low_voltage_is_reported() {
        let t = AnomalyThresholds::default();
        let sample = MetricSample {
            voltage_v: 200.0,
            ..nominal()
        };
        let anomaly = evaluate(&sample, None, &t);
        assert_eq!(anomaly, Some(Anomaly::VoltageDrop { limit_percent: 9.0 }));
        assert_eq!(
            anomaly.map(|a| a.to_string()).as_deref(),
            Some("Voltage Drop (-9% limit)")
        );

        let ok = MetricSample {
            voltage_v: 215.0,
            ..nominal()
        };
        assert_eq!(evaluate(&ok, None, &t), None);
    }

    #[test]
    fn voltage_outranks_load_and_frequency() {
        let sample = MetricSample {
            voltage_v: 190.0,
            load_kw: 950.0,
            frequency_hz: 48.0,
            co2_intensity: 700.0,
            ..nominal()
        };
        assert!(matches!(
            evaluate(&sample, None, &AnomalyThresholds::default()),
            Some(Anomaly::VoltageDrop { .. })
        ));
    }

    #[test]
    fn load_spike_reason() {
        let sample = MetricSample {
            load_kw: 820.0,
            ..nominal()
        };
        let reason = evaluate(&sample, None, &AnomalyThresholds::default()).map(|a| a.to_string());
        assert_eq!(reason.as_deref(), Some("Load Spike (+60% limit)"));
    }

    #[test]
    fn frequency_deviation_reason() {
        let sample = MetricSample {
            frequency_hz: 49.3,
            ..nominal()
        };
        let reason = evaluate(&sample, None, &AnomalyThresholds::default()).map(|a| a.to_string());
        assert_eq!(reason.as_deref(), Some("Frequency Deviation (49.30Hz)"));
    }

    #[test]
    fn co2_reason() {
        let sample = MetricSample {
            co2_intensity: 512.4,
            ..nominal()
        };
        let reason = evaluate(&sample, None, &AnomalyThresholds::default()).map(|a| a.to_string());
        assert_eq!(
            reason.as_deref(),
            Some("ESG Violation: CO2 Intensity (512g/kWh > 450)")
        );
    }

    #[test]
    fn weather_alert_only_on_transition() {
        let t = AnomalyThresholds::default();
        let foggy = MetricSample {
            weather_forecast: WeatherForecast::FogIncoming,
            ..nominal()
        };
        let reason = evaluate(&foggy, Some(&nominal()), &t).map(|a| a.to_string());
        assert_eq!(reason.as_deref(), Some("Predictive Alert: FOG_INCOMING"));

        assert_eq!(evaluate(&foggy, Some(&foggy), &t), None);
        assert_eq!(evaluate(&foggy, None, &t), None);
    }
}
