//! Synthetic grid telemetry generator.
//!
//! Produces one [`MetricSample`] per tick from a day/night sinusoid, a slower
//! weather cycle, uniform noise, and an optional [`LiveSeed`] that replaces the
//! synthetic generation mix. All mutable counters live in [`SimulatorState`],
//! so independent generators never interfere with each other.

use rand::{SeedableRng, rngs::StdRng};
use serde::Serialize;

use super::noise::uniform_noise;
use super::types::{
    LiveSeed, MetricSample, NOMINAL_FREQUENCY_HZ, NOMINAL_VOLTAGE_V, SimulationConfig,
    WeatherForecast, round_to,
};

/// Phase advance per tick (radians).
pub const PHASE_STEP: f64 = 0.05;
/// Default simulated milliseconds per tick.
pub const DEFAULT_SIM_MS_PER_TICK: u64 = 2000;

const BASE_LOAD_KW: f64 = 500.0;
const BASE_SOLAR_KW: f64 = 300.0;
const BASE_WIND_KW: f64 = 200.0;
const MIN_LOAD_KW: f64 = 200.0;

const FOG_BAND: f64 = 0.7;
const LOW_WIND_BAND: f64 = -0.7;
const FOG_DERATE_BAND: f64 = 0.85;
const LOW_WIND_DERATE_BAND: f64 = -0.85;
const FOG_SOLAR_DERATE: f64 = 0.4;
const LOW_WIND_DERATE: f64 = 0.3;

/// Bias above which the battery covers renewable shortfalls.
pub const GREEN_BIAS_THRESHOLD: f64 = 60.0;
/// Bias below which the battery is parked.
pub const CHEAP_BIAS_THRESHOLD: f64 = 40.0;
/// Hard ceiling on bias-driven battery dispatch (kW).
pub const MAX_BIAS_DISCHARGE_KW: f64 = 150.0;

const DROOP_KNEE_KW: f64 = 800.0;
const DROOP_V_PER_KW: f64 = 0.15;
const WEATHER_VOLTAGE_PENALTY_V: f64 = 2.0;
const STIFF_GRID_KW: f64 = 600.0;
const STIFF_GRID_BONUS_V: f64 = 2.0;
const UNDERVOLTAGE_KNEE_V: f64 = 215.0;
const UNDERVOLTAGE_FREQ_PENALTY_HZ: f64 = 0.2;

const GRID_CO2_G_PER_KWH: f64 = 400.0;
const RENEWABLE_CO2_G_PER_KWH: f64 = 20.0;
const GRID_COST_PER_KWH: f64 = 0.20;
const RENEWABLE_COST_PER_KWH: f64 = 0.05;
/// Coal-like baseline the savings accumulator is measured against (g/kWh).
pub const BASELINE_CO2_G_PER_KWH: f64 = 800.0;

/// Mutable counters carried between ticks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatorState {
    /// Number of samples produced so far.
    pub tick: u64,
    /// Accumulated phase (radians).
    pub phase: f64,
    /// Simulated clock (ms).
    pub timestamp_ms: u64,
    /// Running CO2-avoided total (kg, unrounded).
    pub accumulated_co2_saved_kg: f64,
}

impl SimulatorState {
    /// Creates a fresh state starting at `start_timestamp_ms`.
    pub fn new(start_timestamp_ms: u64) -> Self {
        Self {
            tick: 0,
            phase: 0.0,
            timestamp_ms: start_timestamp_ms,
            accumulated_co2_saved_kg: 0.0,
        }
    }
}

impl Default for SimulatorState {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Stepwise telemetry generator.
///
/// # Examples
///
/// ```
/// use greengrid_sim::sim::generator::TelemetryGenerator;
/// use greengrid_sim::sim::types::SimulationConfig;
///
/// let mut generator = TelemetryGenerator::new(42);
/// let first = generator.next(None, &SimulationConfig::default(), false, None);
/// assert!(first.load_kw >= 200.0);
/// assert_eq!(first.tick, 1);
/// ```
#[derive(Debug, Clone)]
pub struct TelemetryGenerator {
    state: SimulatorState,
    sim_ms_per_tick: u64,
    rng: StdRng,
}

impl TelemetryGenerator {
    /// Creates a generator with a fresh state and the given noise seed.
    pub fn new(seed: u64) -> Self {
        Self::with_state(SimulatorState::default(), DEFAULT_SIM_MS_PER_TICK, seed)
    }

    /// Creates a generator resuming from an explicit state.
    ///
    /// # Arguments
    ///
    /// * `state` - Counters to continue from
    /// * `sim_ms_per_tick` - Simulated time added per tick
    /// * `seed` - Noise seed
    pub fn with_state(state: SimulatorState, sim_ms_per_tick: u64, seed: u64) -> Self {
        Self {
            state,
            sim_ms_per_tick,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns the current counters.
    pub fn state(&self) -> &SimulatorState {
        &self.state
    }

    /// Gives corrective actions access to the same noise stream.
    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Produces the next sample.
    ///
    /// # Arguments
    ///
    /// * `prev` - Previous sample (battery dispatch is held over from it)
    /// * `config` - Operator settings for this tick
    /// * `is_overridden` - `true` while a corrective action owns the battery
    /// * `live_seed` - Optional live generation mix
    pub fn next(
        &mut self,
        prev: Option<&MetricSample>,
        config: &SimulationConfig,
        is_overridden: bool,
        live_seed: Option<&LiveSeed>,
    ) -> MetricSample {
        self.state.tick += 1;
        self.state.timestamp_ms += self.sim_ms_per_tick;
        self.state.phase += PHASE_STEP;
        let phase = self.state.phase;

        let time_of_day = phase.sin() * 0.5 + 0.5;
        let weather_cycle = (phase * 0.5).sin();
        let weather_forecast = classify_weather(weather_cycle);

        let mut solar_eff = config.solar_efficiency;
        let mut wind_eff = config.wind_efficiency;
        if weather_cycle > FOG_DERATE_BAND {
            solar_eff *= FOG_SOLAR_DERATE;
        }
        if weather_cycle < LOW_WIND_DERATE_BAND {
            wind_eff *= LOW_WIND_DERATE;
        }

        let mut solar = (BASE_SOLAR_KW * time_of_day * solar_eff
            + uniform_noise(&mut self.rng, 20.0))
        .max(0.0);
        let mut wind = (BASE_WIND_KW * (phase * 0.3).cos().abs() * wind_eff
            + uniform_noise(&mut self.rng, 50.0))
        .max(0.0);
        let mut load = ((BASE_LOAD_KW + (phase * 2.0).sin() * 100.0) * config.load_multiplier
            + uniform_noise(&mut self.rng, 15.0))
        .max(MIN_LOAD_KW);

        let mut grid_supply = 0.0;
        let mut co2_intensity = 0.0;

        if let Some(seed) = live_seed {
            solar = seed.solar_kw.map_or(solar, |v| v.max(0.0));
            wind = seed.wind_kw.map_or(wind, |v| v.max(0.0));
            load = seed
                .load_kw
                .map_or(load, |v| (v * config.load_multiplier).max(0.0));
            grid_supply = seed.grid_supply_kw.unwrap_or(0.0).max(0.0);
            co2_intensity = seed.co2_intensity.unwrap_or(0.0).max(0.0);
        }

        let battery = dispatch_battery(
            prev.map_or(0.0, |p| p.battery_discharge_kw),
            load,
            solar + wind,
            config,
            is_overridden,
        );

        let renewable = solar + wind;
        if live_seed.is_none() {
            grid_supply = (load - renewable - battery).max(0.0);
        }

        let mut target_voltage = NOMINAL_VOLTAGE_V;
        if load > DROOP_KNEE_KW {
            target_voltage -= (load - DROOP_KNEE_KW) * DROOP_V_PER_KW;
        }
        if !weather_forecast.is_clear() {
            target_voltage -= WEATHER_VOLTAGE_PENALTY_V;
        }
        if live_seed.is_some() && grid_supply > STIFF_GRID_KW {
            target_voltage += STIFF_GRID_BONUS_V;
        }
        let voltage = target_voltage + uniform_noise(&mut self.rng, 2.0);

        let mut frequency = NOMINAL_FREQUENCY_HZ + uniform_noise(&mut self.rng, 0.05);
        if voltage < UNDERVOLTAGE_KNEE_V {
            frequency -= UNDERVOLTAGE_FREQ_PENALTY_HZ;
        }

        let total_gen = renewable + grid_supply + battery;
        let divisor = if total_gen == 0.0 { 1.0 } else { total_gen };
        if live_seed.is_none() {
            co2_intensity =
                (grid_supply * GRID_CO2_G_PER_KWH + renewable * RENEWABLE_CO2_G_PER_KWH) / divisor;
        }
        let cost = (grid_supply * GRID_COST_PER_KWH + renewable * RENEWABLE_COST_PER_KWH) / divisor;

        let baseline_co2 = load * BASELINE_CO2_G_PER_KWH;
        let actual_co2 = total_gen * co2_intensity;
        let saved = ((baseline_co2 - actual_co2) / 1000.0).max(0.0);
        self.state.accumulated_co2_saved_kg += saved;

        tracing::trace!(
            tick = self.state.tick,
            phase,
            %weather_forecast,
            live = live_seed.is_some(),
            "generated sample"
        );

        MetricSample {
            tick: self.state.tick,
            timestamp_ms: self.state.timestamp_ms,
            load_kw: round_to(load, 2),
            solar_kw: round_to(solar, 2),
            wind_kw: round_to(wind, 2),
            grid_supply_kw: round_to(grid_supply, 2),
            battery_discharge_kw: round_to(battery, 2),
            voltage_v: round_to(voltage, 2),
            frequency_hz: round_to(frequency, 2),
            co2_intensity: round_to(co2_intensity, 1),
            cost_per_kwh: round_to(cost, 3),
            weather_forecast,
            accumulated_co2_saved_kg: round_to(self.state.accumulated_co2_saved_kg, 1),
            is_live: live_seed.is_some(),
        }
    }
}

/// Maps the weather cycle value onto a forecast band.
pub fn classify_weather(weather_cycle: f64) -> WeatherForecast {
    if weather_cycle > FOG_BAND {
        WeatherForecast::FogIncoming
    } else if weather_cycle < LOW_WIND_BAND {
        WeatherForecast::LowWindCorridor
    } else {
        WeatherForecast::Clear
    }
}

/// Applies the bias dispatch rule to the held-over battery output.
///
/// While overridden the previous value is kept untouched.
pub fn dispatch_battery(
    previous_kw: f64,
    load_kw: f64,
    renewable_kw: f64,
    config: &SimulationConfig,
    is_overridden: bool,
) -> f64 {
    if is_overridden {
        return previous_kw;
    }
    if config.optimization_bias > GREEN_BIAS_THRESHOLD && load_kw > renewable_kw {
        let ceiling = MAX_BIAS_DISCHARGE_KW.min(config.battery_capacity.max(0.0));
        (load_kw - renewable_kw).min(ceiling)
    } else if config.optimization_bias < CHEAP_BIAS_THRESHOLD {
        0.0
    } else {
        previous_kw
    }
}
