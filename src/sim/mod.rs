/// Corrective actions applied during an incident.
pub mod actions;
pub mod anomaly;
/// Engine wall clock.
pub mod clock;
pub mod engine;
pub mod generator;
/// Incident state machine.
pub mod incident;
pub mod kpi;
pub mod noise;
pub mod types;
