//! CSV export for telemetry samples and the agent log.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::{AgentLog, MetricSample};

/// Column header for telemetry export.
const HEADER: &str = "tick,timestamp_ms,load_kw,solar_kw,wind_kw,grid_supply_kw,\
                      battery_discharge_kw,voltage_v,frequency_hz,co2_intensity,\
                      cost_per_kwh,weather_forecast,accumulated_co2_saved_kg,is_live";

/// Column header for agent log export.
const LOG_HEADER: &str = "id,elapsed_ms,role,message";

/// Exports samples to a CSV file at the given path.
///
/// Writes a header row followed by one data row per sample. Produces
/// deterministic output for identical inputs.
///
/// # Arguments
///
/// * `samples` - Samples in tick order
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(samples: &[MetricSample], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(samples, buf)
}

/// Writes samples as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(samples: &[MetricSample], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for s in samples {
        wtr.write_record(&[
            s.tick.to_string(),
            s.timestamp_ms.to_string(),
            format!("{:.2}", s.load_kw),
            format!("{:.2}", s.solar_kw),
            format!("{:.2}", s.wind_kw),
            format!("{:.2}", s.grid_supply_kw),
            format!("{:.2}", s.battery_discharge_kw),
            format!("{:.2}", s.voltage_v),
            format!("{:.2}", s.frequency_hz),
            format!("{:.1}", s.co2_intensity),
            format!("{:.3}", s.cost_per_kwh),
            s.weather_forecast.as_str().to_string(),
            format!("{:.1}", s.accumulated_co2_saved_kg),
            s.is_live.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes agent log lines as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_log_csv(logs: &[AgentLog], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(LOG_HEADER.split(','))?;
    for l in logs {
        wtr.write_record(&[
            l.id.to_string(),
            l.elapsed_ms.to_string(),
            l.role.as_str().to_string(),
            l.message.clone(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Exports agent log lines to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_log_csv(logs: &[AgentLog], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_log_csv(logs, io::BufWriter::new(file))
}
