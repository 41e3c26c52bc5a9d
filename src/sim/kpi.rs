//! Post-hoc KPI computation from a sample run.

use std::fmt;

use serde::Serialize;

use super::types::MetricSample;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Aggregate key performance indicators derived from a complete run.
///
/// Computed post-hoc from the recorded samples so the report always agrees
/// with the exported telemetry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiReport {
    /// Number of samples covered.
    pub samples: usize,
    /// Lowest bus voltage (V).
    pub min_voltage_v: f64,
    /// Highest bus voltage (V).
    pub max_voltage_v: f64,
    /// Peak demand (kW).
    pub peak_load_kw: f64,
    /// Mean carbon intensity (g/kWh).
    pub mean_co2_intensity: f64,
    /// Mean supply cost ($/kWh).
    pub mean_cost_per_kwh: f64,
    /// Renewable energy as a share of total supply (%).
    pub renewable_share_pct: f64,
    /// Energy delivered by the battery (kWh).
    pub battery_energy_kwh: f64,
    /// CO2 avoided over the run (kg), from the final accumulator.
    pub co2_avoided_kg: f64,
    /// Incidents opened during the run.
    pub incident_count: u64,
    /// Samples whose mix came from a live provider.
    pub live_samples: usize,
}

impl KpiReport {
    /// Computes all KPIs from the recorded samples.
    ///
    /// # Arguments
    ///
    /// * `samples` - Samples in tick order
    /// * `sim_ms_per_tick` - Simulated duration of one sample
    /// * `incident_count` - Incidents opened during the run
    ///
    /// # Returns
    ///
    /// A `KpiReport` with all fields populated (zeros for an empty run).
    pub fn from_samples(samples: &[MetricSample], sim_ms_per_tick: u64, incident_count: u64) -> Self {
        if samples.is_empty() {
            return Self {
                samples: 0,
                min_voltage_v: 0.0,
                max_voltage_v: 0.0,
                peak_load_kw: 0.0,
                mean_co2_intensity: 0.0,
                mean_cost_per_kwh: 0.0,
                renewable_share_pct: 0.0,
                battery_energy_kwh: 0.0,
                co2_avoided_kg: 0.0,
                incident_count,
                live_samples: 0,
            };
        }

        let n = samples.len() as f64;
        let dt_hours = sim_ms_per_tick as f64 / MS_PER_HOUR;
        let mut min_v = f64::INFINITY;
        let mut max_v = f64::NEG_INFINITY;
        let mut peak_load = 0.0_f64;
        let mut co2_sum = 0.0;
        let mut cost_sum = 0.0;
        let mut renewable_kw_sum = 0.0;
        let mut supply_kw_sum = 0.0;
        let mut battery_kw_sum = 0.0;
        let mut live = 0_usize;

        for s in samples {
            min_v = min_v.min(s.voltage_v);
            max_v = max_v.max(s.voltage_v);
            peak_load = peak_load.max(s.load_kw);
            co2_sum += s.co2_intensity;
            cost_sum += s.cost_per_kwh;
            renewable_kw_sum += s.renewable_kw();
            supply_kw_sum += s.renewable_kw() + s.grid_supply_kw + s.battery_discharge_kw;
            battery_kw_sum += s.battery_discharge_kw;
            if s.is_live {
                live += 1;
            }
        }

        let renewable_share_pct = if supply_kw_sum > 0.0 {
            100.0 * renewable_kw_sum / supply_kw_sum
        } else {
            0.0
        };

        Self {
            samples: samples.len(),
            min_voltage_v: min_v,
            max_voltage_v: max_v,
            peak_load_kw: peak_load,
            mean_co2_intensity: co2_sum / n,
            mean_cost_per_kwh: cost_sum / n,
            renewable_share_pct,
            battery_energy_kwh: battery_kw_sum * dt_hours,
            co2_avoided_kg: samples
                .last()
                .map_or(0.0, |s| s.accumulated_co2_saved_kg),
            incident_count,
            live_samples: live,
        }
    }
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(f, "Samples:               {}", self.samples)?;
        writeln!(
            f,
            "Voltage range:         {:.2} - {:.2} V",
            self.min_voltage_v, self.max_voltage_v
        )?;
        writeln!(f, "Peak load:             {:.2} kW", self.peak_load_kw)?;
        writeln!(f, "Mean CO2 intensity:    {:.1} g/kWh", self.mean_co2_intensity)?;
        writeln!(f, "Mean cost:             ${:.3}/kWh", self.mean_cost_per_kwh)?;
        writeln!(f, "Renewable share:       {:.1}%", self.renewable_share_pct)?;
        writeln!(f, "Battery energy:        {:.2} kWh", self.battery_energy_kwh)?;
        writeln!(f, "CO2 avoided:           {:.1} kg", self.co2_avoided_kg)?;
        writeln!(f, "Incidents:             {}", self.incident_count)?;
        write!(f, "Live samples:          {}", self.live_samples)
    }
}
