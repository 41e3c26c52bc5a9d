//! REST API over a completed headless run.
//!
//! Provides three GET endpoints:
//! - `/state` returns the scenario, KPI report, and latest sample
//! - `/telemetry` returns samples with optional tick range filtering
//! - `/logs` returns the agent log, optionally filtered by role

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use crate::config::ScenarioConfig;
use crate::runner::RunResult;
use crate::sim::kpi::KpiReport;
use crate::sim::types::{AgentLog, MetricSample};

pub use types::{ErrorResponse, LogsQuery, StateResponse, TelemetryQuery};

/// Immutable application state shared across all request handlers.
///
/// Built once after the run completes and wrapped in `Arc`; handlers only
/// read from it.
pub struct AppState {
    /// Scenario the run was driven by.
    pub scenario: ScenarioConfig,
    pub kpi: KpiReport,
    /// Samples in tick order.
    pub samples: Vec<MetricSample>,
    /// Agent log in release order.
    pub logs: Vec<AgentLog>,
}

impl AppState {
    /// Wraps a finished run for serving.
    pub fn from_run(scenario: ScenarioConfig, run: RunResult) -> Self {
        Self {
            scenario,
            kpi: run.kpi,
            samples: run.samples,
            logs: run.logs,
        }
    }
}

/// Builds the axum router with all API routes.
///
/// # Arguments
///
/// * `state` - Shared application state
///
/// # Returns
///
/// Configured `Router` ready to serve.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/state", get(handlers::get_state))
        .route("/telemetry", get(handlers::get_telemetry))
        .route("/logs", get(handlers::get_logs))
        .with_state(state)
}

/// Binds to the given address and serves the API until the process exits.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
