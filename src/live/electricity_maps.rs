//! Electricity Maps power-breakdown adapter.

use std::collections::HashMap;

use serde::Deserialize;

use crate::sim::types::LiveSeed;

#[cfg(feature = "live")]
use super::{LiveDataError, ensure_success};

/// Grid-scale MW to microgrid-scale kW.
pub const SCALE: f64 = 0.05;

/// Latest power-breakdown endpoint.
pub const URL: &str = "https://api.electricitymap.org/v3/power-breakdown/latest";

/// Production sources lumped into conventional grid supply.
const GRID_SOURCES: [&str; 8] = [
    "nuclear",
    "geothermal",
    "biomass",
    "coal",
    "gas",
    "hydro",
    "oil",
    "unknown",
];

/// Subset of the `power-breakdown/latest` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerBreakdown {
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub carbon_intensity: Option<f64>,
    #[serde(default)]
    pub power_production_breakdown: HashMap<String, Option<f64>>,
}

impl PowerBreakdown {
    fn mw(&self, source: &str) -> f64 {
        self.power_production_breakdown
            .get(source)
            .copied()
            .flatten()
            .unwrap_or(0.0)
    }
}

/// Scales a breakdown into a seed; load is assumed to match generation.
pub fn reshape(breakdown: &PowerBreakdown) -> LiveSeed {
    let solar = breakdown.mw("solar");
    let wind = breakdown.mw("wind");
    let grid: f64 = GRID_SOURCES.iter().map(|s| breakdown.mw(s)).sum();
    LiveSeed {
        solar_kw: Some(solar * SCALE),
        wind_kw: Some(wind * SCALE),
        grid_supply_kw: Some(grid * SCALE),
        load_kw: Some((solar + wind + grid) * SCALE),
        co2_intensity: Some(breakdown.carbon_intensity.unwrap_or(0.0)),
    }
}

/// Fetches the latest breakdown for `zone`.
///
/// # Errors
///
/// Returns a [`LiveDataError`] on transport failure, non-2xx status, or an
/// undecodable body.
#[cfg(feature = "live")]
pub fn fetch(
    client: &reqwest::blocking::Client,
    api_key: &str,
    zone: &str,
) -> Result<LiveSeed, LiveDataError> {
    let response = client
        .get(URL)
        .query(&[("zone", zone)])
        .header("auth-token", api_key)
        .send()?;
    let breakdown: PowerBreakdown = ensure_success(response)?.json()?;
    tracing::debug!(zone = breakdown.zone.as_deref().unwrap_or(zone), "electricity maps snapshot");
    Ok(reshape(&breakdown))
}
