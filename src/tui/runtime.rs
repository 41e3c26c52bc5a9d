//! Engine driver and TUI application state.
//!
//! The engine runs on the UI thread. Live fetches happen on a background
//! worker that publishes seeds over a channel, and each negotiation or
//! compliance report runs on its own short-lived thread.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::ScenarioConfig;
use crate::live::{DataSource, LiveFeed, SeedSource};
use crate::narration::{Narration, Narrator, narrate_or_fallback, summary_or_fallback};
use crate::sim::anomaly::{
    BIAS_RANGE, FREQUENCY_DEVIATION_RANGE, LOAD_INCREASE_RANGE, MAX_CO2_RANGE, VOLTAGE_DROP_RANGE,
};
use crate::sim::engine::Engine;
use crate::sim::types::{AgentRole, LiveSeed, MetricSample, round_to};

/// Tick interval options in milliseconds (slowest → fastest).
const SPEED_LEVELS_MS: [u64; 5] = [2000, 1000, 500, 250, 100];

/// Default speed index (1 s).
const DEFAULT_SPEED_IDX: usize = 1;

/// Load multiplier applied by the stress key.
pub const STRESS_LOAD_MULTIPLIER: f64 = 2.0;
/// Solar efficiency applied by the fog key.
pub const FOG_SOLAR_EFFICIENCY: f64 = 0.3;

/// Increments for the operator dials.
const BIAS_STEP: f64 = 10.0;
const VOLTAGE_STEP: f64 = 1.0;
const LOAD_STEP: f64 = 5.0;
const FREQUENCY_STEP: f64 = 0.1;
const CO2_STEP: f64 = 25.0;

/// Operator-adjustable threshold dial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dial {
    Bias,
    VoltageDrop,
    LoadIncrease,
    FrequencyDeviation,
    MaxCo2,
}

/// Handle to the background live-fetch worker.
///
/// Dropping the handle disconnects the control channel, which stops the
/// worker after its current wait.
struct LiveWorker {
    control: Sender<DataSource>,
    seeds: Receiver<LiveSeed>,
}

impl LiveWorker {
    fn spawn(mut feed: LiveFeed, poll_interval: Duration) -> Self {
        let (control, control_rx) = mpsc::channel::<DataSource>();
        let (seed_tx, seeds) = mpsc::channel();
        thread::spawn(move || {
            loop {
                if let Some(seed) = feed.fetch() {
                    if seed_tx.send(seed).is_err() {
                        return;
                    }
                }
                match control_rx.recv_timeout(poll_interval) {
                    Ok(source) => {
                        tracing::info!(%source, "live source switched");
                        feed.set_source(source);
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }
        });
        Self { control, seeds }
    }
}

/// TUI application state.
pub struct App {
    engine: Engine,
    /// Scenario the app was started with (kept for restart).
    scenario: ScenarioConfig,
    narrator: Arc<dyn Narrator>,
    worker: Option<LiveWorker>,
    /// Active data source.
    pub source: DataSource,
    /// Most recent live seed; kept until a newer one arrives.
    pub seed: Option<LiveSeed>,
    narration: Option<Receiver<Narration>>,
    report: Option<Receiver<String>>,
    /// Last compliance summary requested with the report key.
    pub esg_report: Option<String>,
    /// Whether the simulation is paused.
    pub paused: bool,
    /// Current index into `SPEED_LEVELS_MS`.
    pub speed_idx: usize,
    /// Whether the user has requested quit.
    pub quit: bool,
    /// When the last simulation tick was executed.
    pub last_tick: Instant,
}

impl App {
    /// Creates an app for `scenario`.
    ///
    /// # Arguments
    ///
    /// * `scenario` - Validated scenario
    /// * `narrator` - Answers anomaly triggers and report requests
    /// * `feed` - Live provider; `None` runs without a fetch worker
    pub fn new(scenario: ScenarioConfig, narrator: Arc<dyn Narrator>, feed: Option<LiveFeed>) -> Self {
        let engine = Engine::new(
            scenario.engine_settings(),
            scenario.grid.clone(),
            scenario.thresholds.clone(),
        );
        let poll = Duration::from_millis(scenario.live.poll_interval_ms.max(1));
        let worker = feed.map(|f| LiveWorker::spawn(f, poll));
        Self {
            engine,
            source: scenario.live.source,
            scenario,
            narrator,
            worker,
            seed: None,
            narration: None,
            report: None,
            esg_report: None,
            paused: false,
            speed_idx: DEFAULT_SPEED_IDX,
            quit: false,
            last_tick: Instant::now(),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn narrator_name(&self) -> &'static str {
        self.narrator.name()
    }

    /// Returns `true` while a negotiation thread has not answered.
    pub fn is_negotiating(&self) -> bool {
        self.narration.is_some()
    }

    /// Collects background results and advances the engine one tick.
    pub fn tick(&mut self) {
        self.poll_background(false);
        let seed = if self.source.is_live() {
            self.seed.as_ref()
        } else {
            None
        };
        let report = self.engine.tick(seed);
        if let Some(request) = report.trigger {
            let narrator = Arc::clone(&self.narrator);
            let (tx, rx) = mpsc::channel();
            thread::spawn(move || {
                let _ = tx.send(narrate_or_fallback(narrator.as_ref(), &request));
            });
            self.narration = Some(rx);
        }
    }

    /// Drains the live worker, narration and report channels.
    ///
    /// With `block` set, waits for outstanding narration and report threads.
    fn poll_background(&mut self, block: bool) {
        if let Some(worker) = &self.worker {
            while let Ok(seed) = worker.seeds.try_recv() {
                self.seed = Some(seed);
            }
        }

        if let Some(rx) = self.narration.take() {
            match receive(&rx, block) {
                Ok(narration) => {
                    self.engine.resolve_incident(narration);
                }
                Err(TryRecvError::Empty) => self.narration = Some(rx),
                Err(TryRecvError::Disconnected) => {
                    self.engine.resolve_incident(Narration::fallback());
                }
            }
        }

        if let Some(rx) = self.report.take() {
            match receive(&rx, block) {
                Ok(text) => self.esg_report = Some(text),
                Err(TryRecvError::Empty) => self.report = Some(rx),
                Err(TryRecvError::Disconnected) => {}
            }
        }
    }

    /// Toggles pause/resume.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Increases simulation speed (shorter tick interval).
    pub fn speed_up(&mut self) {
        if self.speed_idx + 1 < SPEED_LEVELS_MS.len() {
            self.speed_idx += 1;
        }
    }

    /// Decreases simulation speed (longer tick interval).
    pub fn speed_down(&mut self) {
        if self.speed_idx > 0 {
            self.speed_idx -= 1;
        }
    }

    /// Returns the current tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        SPEED_LEVELS_MS[self.speed_idx]
    }

    /// Restarts the engine from the scenario's initial settings.
    ///
    /// Outstanding narration is discarded; the live seed is kept.
    pub fn restart(&mut self) {
        self.narration = None;
        self.engine.restart();
        *self.engine.thresholds_mut() = self.scenario.thresholds.clone();
        self.paused = false;
    }

    /// Doubles demand until the next incident reverts it.
    pub fn simulate_stress(&mut self) {
        self.engine.config_mut().load_multiplier = STRESS_LOAD_MULTIPLIER;
        self.engine.log(
            AgentRole::System,
            format!("OPERATOR: load stress applied (x{STRESS_LOAD_MULTIPLIER:.1})"),
        );
    }

    /// Derates solar output until the next incident reverts it.
    pub fn simulate_fog(&mut self) {
        self.engine.config_mut().solar_efficiency = FOG_SOLAR_EFFICIENCY;
        self.engine.log(
            AgentRole::System,
            format!("OPERATOR: fog bank simulated (solar x{FOG_SOLAR_EFFICIENCY:.1})"),
        );
    }

    /// Nudges a dial by `steps` increments, clamped to its range.
    pub fn adjust(&mut self, dial: Dial, steps: i32) {
        let delta = f64::from(steps);
        match dial {
            Dial::Bias => {
                let c = self.engine.config_mut();
                c.optimization_bias = step_within(c.optimization_bias, delta * BIAS_STEP, &BIAS_RANGE);
            }
            Dial::VoltageDrop => {
                let t = self.engine.thresholds_mut();
                t.voltage_drop_percent =
                    step_within(t.voltage_drop_percent, delta * VOLTAGE_STEP, &VOLTAGE_DROP_RANGE);
            }
            Dial::LoadIncrease => {
                let t = self.engine.thresholds_mut();
                t.load_increase_percent =
                    step_within(t.load_increase_percent, delta * LOAD_STEP, &LOAD_INCREASE_RANGE);
            }
            Dial::FrequencyDeviation => {
                let t = self.engine.thresholds_mut();
                t.frequency_deviation_hz = step_within(
                    t.frequency_deviation_hz,
                    delta * FREQUENCY_STEP,
                    &FREQUENCY_DEVIATION_RANGE,
                );
            }
            Dial::MaxCo2 => {
                let t = self.engine.thresholds_mut();
                t.max_co2_intensity = step_within(t.max_co2_intensity, delta * CO2_STEP, &MAX_CO2_RANGE);
            }
        }
    }

    /// Switches to the next data source and drops the previous source's seed.
    pub fn cycle_source(&mut self) {
        self.source = self.source.cycle();
        self.seed = None;
        if let Some(worker) = &self.worker {
            let _ = worker.control.send(self.source);
        }
        self.engine
            .log(AgentRole::System, format!("DATA SOURCE: {}", self.source));
    }

    /// Requests a compliance summary for the latest sample.
    pub fn request_report(&mut self) {
        if self.report.is_some() {
            return;
        }
        let Some(sample) = self.engine.latest().cloned() else {
            return;
        };
        let narrator = Arc::clone(&self.narrator);
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(summary_or_fallback(narrator.as_ref(), &sample));
        });
        self.report = Some(rx);
    }

    /// Dismisses the displayed report.
    pub fn dismiss_report(&mut self) {
        self.esg_report = None;
    }

    /// Returns the most recent sample, if any.
    pub fn last_sample(&self) -> Option<&MetricSample> {
        self.engine.latest()
    }
}

fn receive<T>(rx: &Receiver<T>, block: bool) -> Result<T, TryRecvError> {
    if block {
        rx.recv().map_err(|_| TryRecvError::Disconnected)
    } else {
        rx.try_recv()
    }
}

fn step_within(value: f64, delta: f64, range: &RangeInclusive<f64>) -> f64 {
    round_to((value + delta).clamp(*range.start(), *range.end()), 2)
}
