//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::AppState;
use super::types::{ErrorResponse, LogsQuery, StateResponse, TelemetryQuery};
use crate::sim::types::{AgentLog, AgentRole, MetricSample};

/// Returns the scenario, KPI report, and latest sample.
///
/// `GET /state` → 200 + `StateResponse` JSON
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    Json(StateResponse {
        scenario: state.scenario.clone(),
        kpi: state.kpi.clone(),
        latest: state.samples.last().cloned(),
        log_count: state.logs.len(),
    })
}

/// Returns samples, optionally filtered by tick range.
///
/// `GET /telemetry` → 200 + `Vec<MetricSample>` JSON
/// `GET /telemetry?from=N&to=M` → filtered range (inclusive)
/// `GET /telemetry?from=10&to=5` → 400 + `ErrorResponse`
pub async fn get_telemetry(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TelemetryQuery>,
) -> impl IntoResponse {
    let from = query.from.unwrap_or(0);
    let to = query.to.unwrap_or(u64::MAX);

    if from > to {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("`from` ({from}) must be <= `to` ({to})"),
            }),
        ));
    }

    let samples: Vec<MetricSample> = state
        .samples
        .iter()
        .filter(|s| s.tick >= from && s.tick <= to)
        .cloned()
        .collect();

    Ok(Json(samples))
}

/// Returns the agent log, optionally restricted to one role.
///
/// `GET /logs` → 200 + `Vec<AgentLog>` JSON
/// `GET /logs?role=Safety_Critic` → lines spoken by that role
/// `GET /logs?role=Janitor` → 400 + `ErrorResponse`
pub async fn get_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogsQuery>,
) -> impl IntoResponse {
    let role = match query.role.as_deref() {
        None => None,
        Some(label) => match AgentRole::parse_label(label) {
            Some(role) => Some(role),
            None => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: format!("unknown role \"{label}\""),
                    }),
                ));
            }
        },
    };

    let logs: Vec<AgentLog> = state
        .logs
        .iter()
        .filter(|l| role.is_none_or(|r| l.role == r))
        .cloned()
        .collect();
    Ok(Json(logs))
}
