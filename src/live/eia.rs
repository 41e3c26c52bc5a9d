//! U.S. EIA hourly fuel-type adapter.
//!
//! The API returns one flattened record per fuel type and hour. Only the
//! records of the newest period are kept; their mix is normalised so total
//! generation equals [`TARGET_TOTAL_KW`].

use serde::Deserialize;

use crate::sim::types::LiveSeed;

#[cfg(feature = "live")]
use super::{LiveDataError, ensure_success};

/// Hourly fuel-type data endpoint.
pub const URL: &str = "https://api.eia.gov/v2/electricity/rto/fuel-type-data/data";
/// Total microgrid load after normalisation (kW).
pub const TARGET_TOTAL_KW: f64 = 1000.0;
/// Carbon intensity assumed for fuel codes without a factor (g/kWh).
pub const UNKNOWN_FUEL_CO2: f64 = 400.0;

#[cfg(feature = "live")]
const PAGE_LENGTH: &str = "30";

/// Carbon intensity by EIA fuel code (g/kWh).
pub fn co2_factor(fuel_type: &str) -> f64 {
    match fuel_type {
        "SUN" => 40.0,
        "WND" => 11.0,
        "NG" => 450.0,
        "COL" => 820.0,
        "NUC" => 12.0,
        "WAT" => 24.0,
        "OTH" => 500.0,
        _ => UNKNOWN_FUEL_CO2,
    }
}

/// One fuel-type record.
#[derive(Debug, Clone, Deserialize)]
pub struct EiaRecord {
    pub period: String,
    #[serde(default)]
    pub fueltype: String,
    /// Generation (MWh). EIA serialises numbers as strings on some routes.
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

impl EiaRecord {
    fn mwh(&self) -> f64 {
        match &self.value {
            Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

#[cfg_attr(not(feature = "live"), allow(dead_code))]
#[derive(Debug, Deserialize)]
struct EiaEnvelope {
    response: EiaData,
}

#[cfg_attr(not(feature = "live"), allow(dead_code))]
#[derive(Debug, Deserialize)]
struct EiaData {
    #[serde(default)]
    data: Vec<EiaRecord>,
}

/// Reshapes records sorted newest-first into a seed.
///
/// # Returns
///
/// `None` when there are no records or the newest period sums to zero.
pub fn reshape(records: &[EiaRecord]) -> Option<LiveSeed> {
    let latest = &records.first()?.period;

    let mut solar = 0.0;
    let mut wind = 0.0;
    let mut grid = 0.0;
    let mut total = 0.0;
    let mut weighted_co2 = 0.0;

    for r in records.iter().filter(|r| &r.period == latest) {
        let mwh = r.mwh();
        match r.fueltype.as_str() {
            "SUN" => solar += mwh,
            "WND" => wind += mwh,
            _ => grid += mwh,
        }
        total += mwh;
        weighted_co2 += mwh * co2_factor(&r.fueltype);
    }

    if total == 0.0 {
        return None;
    }

    let scale = TARGET_TOTAL_KW / total;
    Some(LiveSeed {
        solar_kw: Some(solar * scale),
        wind_kw: Some(wind * scale),
        grid_supply_kw: Some(grid * scale),
        load_kw: Some(total * scale),
        co2_intensity: Some(weighted_co2 / total),
    })
}

/// Fetches the newest hour of fuel-type data for `respondent`.
///
/// # Errors
///
/// Returns a [`LiveDataError`] on transport failure, non-2xx status, an
/// undecodable body, or an empty dataset.
#[cfg(feature = "live")]
pub fn fetch(
    client: &reqwest::blocking::Client,
    api_key: &str,
    respondent: &str,
) -> Result<LiveSeed, LiveDataError> {
    let response = client
        .get(URL)
        .query(&[
            ("api_key", api_key),
            ("frequency", "local-hourly"),
            ("data[0]", "value"),
            ("facets[respondent][]", respondent),
            ("sort[0][column]", "period"),
            ("sort[0][direction]", "desc"),
            ("length", PAGE_LENGTH),
        ])
        .send()?;
    let envelope: EiaEnvelope = ensure_success(response)?.json()?;
    tracing::debug!(respondent, records = envelope.response.data.len(), "eia snapshot");
    reshape(&envelope.response.data).ok_or(LiveDataError::NoData)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(period: &str, fuel: &str, value: serde_json::Value) -> EiaRecord {
        EiaRecord {
            period: period.into(),
            fueltype: fuel.into(),
            value: Some(value),
        }
    }

    #[test]
    fn keeps_only_latest_period_and_normalises() {
        let records = vec![
            record("2024-06-01T14", "SUN", 20.into()),
            record("2024-06-01T14", "WND", 30.into()),
            record("2024-06-01T14", "NG", "50".into()),
            record("2024-06-01T13", "COL", 900.into()),
        ];
        let seed = reshape(&records);
        let seed = seed.as_ref();
        assert_eq!(seed.and_then(|s| s.solar_kw), Some(200.0));
        assert_eq!(seed.and_then(|s| s.wind_kw), Some(300.0));
        assert_eq!(seed.and_then(|s| s.grid_supply_kw), Some(500.0));
        assert_eq!(seed.and_then(|s| s.load_kw), Some(1000.0));
        // (20*40 + 30*11 + 50*450) / 100
        let co2 = seed.and_then(|s| s.co2_intensity).unwrap_or_default();
        assert!((co2 - 236.3).abs() < 1e-9);
    }

    #[test]
    fn unknown_fuel_counts_as_grid() {
        let records = vec![record("p", "BAT", 10.into())];
        let seed = reshape(&records);
        assert_eq!(seed.as_ref().and_then(|s| s.grid_supply_kw), Some(1000.0));
        assert_eq!(seed.and_then(|s| s.co2_intensity), Some(400.0));
    }

    #[test]
    fn empty_or_zero_is_no_data() {
        assert!(reshape(&[]).is_none());
        let zeros = vec![record("p", "SUN", 0.into()), record("p", "NG", serde_json::Value::Null)];
        assert!(reshape(&zeros).is_none());
    }

    #[test]
    fn envelope_decodes() {
        let raw = r#"{"response": {"data": [
            {"period": "2024-06-01T14", "respondent": "TEX", "fueltype": "WND", "value": 12000, "value-units": "megawatthours"}
        ]}}"#;
        let envelope: Option<EiaEnvelope> = serde_json::from_str(raw).ok();
        assert_eq!(envelope.map(|e| e.response.data.len()), Some(1));
    }
}
