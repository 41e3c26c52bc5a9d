//! API response and query types.

use serde::{Deserialize, Serialize};

use crate::config::ScenarioConfig;
use crate::sim::kpi::KpiReport;
use crate::sim::types::MetricSample;

/// Combined state response: scenario, KPIs, and latest sample.
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub scenario: ScenarioConfig,
    pub kpi: KpiReport,
    /// Most recent sample; `null` for an empty run.
    pub latest: Option<MetricSample>,
    /// Total agent log lines recorded.
    pub log_count: usize,
}

/// Optional range query parameters for the telemetry endpoint.
#[derive(Debug, Deserialize)]
pub struct TelemetryQuery {
    /// First tick (inclusive).
    pub from: Option<u64>,
    /// Last tick (inclusive).
    pub to: Option<u64>,
}

/// Optional filter for the logs endpoint.
#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    /// Role wire label, e.g. `Safety_Critic`.
    pub role: Option<String>,
}

/// Error response body for 400-class errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_state_serialises_latest_as_null() {
        let resp = StateResponse {
            scenario: ScenarioConfig::baseline(),
            kpi: KpiReport::from_samples(&[], 2000, 0),
            latest: None,
            log_count: 0,
        };
        let json = serde_json::to_value(&resp).ok();
        assert_eq!(json.as_ref().map(|j| j["latest"].is_null()), Some(true));
        assert_eq!(
            json.as_ref().map(|j| j["scenario"]["live"]["source"].clone()),
            Some(serde_json::json!("simulation"))
        );
    }
}
