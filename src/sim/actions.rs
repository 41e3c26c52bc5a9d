//! Corrective actions applied on top of freshly generated samples.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::Serialize;

use super::noise::uniform_noise;
use super::types::{MetricSample, round_to};

/// Action name used when negotiation fails or recommends nothing.
pub const FALLBACK_ACTION: &str = "IGNORE";

const DISPATCH_BATTERY_KW: f64 = 200.0;
const PREEMPTIVE_STORAGE_KW: f64 = 150.0;
const CURTAIL_FACTOR: f64 = 0.8;
const TURBINE_BOOST_KW: f64 = 100.0;

/// Known corrective actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CorrectiveAction {
    /// Force the battery to 200 kW and shrink grid import accordingly.
    DispatchBattery,
    /// Shed 20 % of demand.
    CurtailLoad,
    /// Add 100 kW of conventional supply.
    BoostTurbine,
    /// Pre-charge storage ahead of forecast weather (150 kW output).
    PreemptiveStorage,
}

impl CorrectiveAction {
    /// All known actions in declaration order.
    pub const ALL: [Self; 4] = [
        Self::DispatchBattery,
        Self::CurtailLoad,
        Self::BoostTurbine,
        Self::PreemptiveStorage,
    ];

    /// Returns the wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DispatchBattery => "DISPATCH_BATTERY",
            Self::CurtailLoad => "CURTAIL_LOAD",
            Self::BoostTurbine => "BOOST_TURBINE",
            Self::PreemptiveStorage => "PREEMPTIVE_STORAGE",
        }
    }

    /// Returns a modified copy of `sample`.
    pub fn apply<R: Rng + ?Sized>(self, sample: &MetricSample, rng: &mut R) -> MetricSample {
        let mut next = sample.clone();
        match self {
            Self::DispatchBattery => {
                next.battery_discharge_kw = DISPATCH_BATTERY_KW;
                next.grid_supply_kw =
                    (next.load_kw - next.solar_kw - next.wind_kw - DISPATCH_BATTERY_KW).max(0.0);
                next.voltage_v = 230.0 + uniform_noise(rng, 1.0);
            }
            Self::CurtailLoad => {
                next.load_kw *= CURTAIL_FACTOR;
                next.voltage_v = 235.0 + uniform_noise(rng, 1.0);
            }
            Self::BoostTurbine => {
                next.grid_supply_kw += TURBINE_BOOST_KW;
                next.voltage_v = 228.0 + uniform_noise(rng, 1.0);
            }
            Self::PreemptiveStorage => {
                next.battery_discharge_kw = PREEMPTIVE_STORAGE_KW;
                next.voltage_v = 232.0 + uniform_noise(rng, 0.5);
            }
        }
        next.load_kw = round_to(next.load_kw, 2);
        next.grid_supply_kw = round_to(next.grid_supply_kw, 2);
        next.voltage_v = round_to(next.voltage_v, 2);
        next
    }
}

impl fmt::Display for CorrectiveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by [`CorrectiveAction::from_str`] for names outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown corrective action \"{0}\"")]
pub struct UnknownAction(pub String);

impl FromStr for CorrectiveAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s.trim())
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

/// Applies the named action, leaving the sample untouched for unknown names.
///
/// # Arguments
///
/// * `sample` - Freshly generated sample
/// * `action_name` - Wire name, e.g. `"CURTAIL_LOAD"`
/// * `rng` - Noise source
pub fn apply_corrective_action<R: Rng + ?Sized>(
    sample: &MetricSample,
    action_name: &str,
    rng: &mut R,
) -> MetricSample {
    match action_name.parse::<CorrectiveAction>() {
        Ok(action) => action.apply(sample, rng),
        Err(err) => {
            tracing::debug!(%err, "leaving sample unchanged");
            sample.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::types::WeatherForecast;
    use rand::{SeedableRng, rngs::StdRng};

    fn sample(load_kw: f64) -> MetricSample {
        MetricSample {
            tick: 10,
            timestamp_ms: 20_000,
            load_kw,
            solar_kw: 150.0,
            wind_kw: 100.0,
            grid_supply_kw: 350.0,
            battery_discharge_kw: 0.0,
            voltage_v: 221.4,
            frequency_hz: 50.01,
            co2_intensity: 241.7,
            cost_per_kwh: 0.138,
            weather_forecast: WeatherForecast::Clear,
            accumulated_co2_saved_kg: 40.2,
            is_live: false,
        }
    }

    #[test]
    fn curtail_load_sheds_twenty_percent() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = apply_corrective_action(&sample(600.0), "CURTAIL_LOAD", &mut rng);
        assert_eq!(out.load_kw, 480.0);
        assert!((out.voltage_v - 235.0).abs() <= 0.5);
    }

    #[test]
    fn dispatch_battery_recomputes_grid_residual() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = apply_corrective_action(&sample(600.0), "DISPATCH_BATTERY", &mut rng);
        assert_eq!(out.battery_discharge_kw, 200.0);
        assert_eq!(out.grid_supply_kw, 150.0);
        assert!((out.voltage_v - 230.0).abs() <= 0.5);

        let small = apply_corrective_action(&sample(300.0), "DISPATCH_BATTERY", &mut rng);
        assert_eq!(small.grid_supply_kw, 0.0);
    }

    #[test]
    fn boost_turbine_adds_supply() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = apply_corrective_action(&sample(600.0), "BOOST_TURBINE", &mut rng);
        assert_eq!(out.grid_supply_kw, 450.0);
        assert!((out.voltage_v - 228.0).abs() <= 0.5);
    }

    #[test]
    fn preemptive_storage_sets_battery() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = apply_corrective_action(&sample(600.0), "PREEMPTIVE_STORAGE", &mut rng);
        assert_eq!(out.battery_discharge_kw, 150.0);
        assert!((out.voltage_v - 232.0).abs() <= 0.25);
    }

    #[test]
    fn unknown_action_is_a_no_op() {
        let mut rng = StdRng::seed_from_u64(1);
        let input = sample(600.0);
        assert_eq!(apply_corrective_action(&input, FALLBACK_ACTION, &mut rng), input);
        assert_eq!(apply_corrective_action(&input, "REBOOT_SUN", &mut rng), input);
    }

    #[test]
    fn parses_known_names() {
        for action in CorrectiveAction::ALL {
            assert_eq!(action.as_str().parse::<CorrectiveAction>(), Ok(action));
        }
        assert!("dispatch_battery".parse::<CorrectiveAction>().is_err());
    }
}
