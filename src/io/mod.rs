/// CSV export of telemetry and agent logs.
pub mod export;
