//! Smart-grid telemetry simulator with threshold monitoring and a
//! multi-agent incident cycle.

/// REST API over a completed run (feature `api`).
#[cfg(feature = "api")]
pub mod api;
pub mod cli;
pub mod config;
pub mod io;
/// Live generation-mix providers.
pub mod live;
pub mod logging;
/// Negotiation narrators.
pub mod narration;
pub mod runner;
/// Telemetry generator, evaluator, incident cycle, and engine.
pub mod sim;
/// Live terminal dashboard (feature `tui`).
#[cfg(feature = "tui")]
pub mod tui;
