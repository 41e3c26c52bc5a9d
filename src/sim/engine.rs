//! Simulation engine that orchestrates generation, overrides, evaluation, and incidents.

use std::collections::VecDeque;

use super::actions::apply_corrective_action;
use super::anomaly::{AnomalyThresholds, evaluate};
use super::clock::TickClock;
use super::generator::{DEFAULT_SIM_MS_PER_TICK, SimulatorState, TelemetryGenerator};
use super::incident::{Incident, IncidentEvent, IncidentTimings};
use super::types::{AgentLog, AgentRole, GridStatus, LiveSeed, MetricSample, SimulationConfig};
use crate::narration::{Narration, NarrationRequest};

/// Load multiplier above which a revert restores 1.0.
const STRESS_LOAD_RESET_ABOVE: f64 = 1.5;
/// Solar efficiency below which a revert restores 1.0.
const SOLAR_DERATE_RESET_BELOW: f64 = 0.5;

/// Fixed engine parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Noise seed.
    pub seed: u64,
    /// Engine clock advance per tick (ms).
    pub tick_interval_ms: u64,
    /// Simulated time advance per tick (ms).
    pub sim_ms_per_tick: u64,
    /// Samples kept in the rolling history.
    pub history_len: usize,
    /// Agent log lines kept.
    pub log_len: usize,
    /// Simulated clock at start (ms).
    pub start_timestamp_ms: u64,
    pub timings: IncidentTimings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            seed: 42,
            tick_interval_ms: 1000,
            sim_ms_per_tick: DEFAULT_SIM_MS_PER_TICK,
            history_len: 60,
            log_len: 200,
            start_timestamp_ms: 0,
            timings: IncidentTimings::default(),
        }
    }
}

/// Outcome of one engine tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Sample recorded for this tick, overrides applied.
    pub sample: MetricSample,
    /// Set when this tick opened an incident; hand it to a narrator and
    /// pass the answer to [`Engine::resolve_incident`].
    pub trigger: Option<NarrationRequest>,
    /// Agent log lines released during this tick.
    pub logs: Vec<AgentLog>,
}

/// Single-threaded grid engine.
///
/// Owns the generator, operator settings, rolling history and log, and the
/// in-flight incident. Narration happens outside: [`Engine::tick`] returns a
/// trigger and the caller answers it whenever the narrator is done.
pub struct Engine {
    settings: EngineSettings,
    generator: TelemetryGenerator,
    config: SimulationConfig,
    initial_config: SimulationConfig,
    thresholds: AnomalyThresholds,
    history: VecDeque<MetricSample>,
    logs: VecDeque<AgentLog>,
    status: GridStatus,
    incident: Incident,
    clock: TickClock,
    next_log_id: u64,
    incident_count: u64,
}

impl Engine {
    /// Creates a new engine.
    ///
    /// # Arguments
    ///
    /// * `settings` - Timing, seed, and buffer sizes
    /// * `config` - Initial operator settings
    /// * `thresholds` - Initial trip points
    pub fn new(
        settings: EngineSettings,
        config: SimulationConfig,
        thresholds: AnomalyThresholds,
    ) -> Self {
        let generator = Self::build_generator(&settings);
        let clock = TickClock::new(settings.tick_interval_ms);
        let incident = Incident::new(settings.timings);
        Self {
            history: VecDeque::with_capacity(settings.history_len),
            logs: VecDeque::with_capacity(settings.log_len),
            settings,
            generator,
            initial_config: config.clone(),
            config,
            thresholds,
            status: GridStatus::Normal,
            incident,
            clock,
            next_log_id: 0,
            incident_count: 0,
        }
    }

    fn build_generator(settings: &EngineSettings) -> TelemetryGenerator {
        TelemetryGenerator::with_state(
            SimulatorState::new(settings.start_timestamp_ms),
            settings.sim_ms_per_tick,
            settings.seed,
        )
    }

    /// Advances one tick.
    ///
    /// Releases due incident events, generates a sample, applies any active
    /// override, and evaluates thresholds when no incident is in flight.
    ///
    /// # Arguments
    ///
    /// * `live_seed` - Latest live generation mix, if a live source is active
    pub fn tick(&mut self, live_seed: Option<&LiveSeed>) -> TickReport {
        let now = self.clock.tick();
        let mut released = Vec::new();

        for event in self.incident.due(now) {
            released.push(self.apply_event(event));
        }

        let override_action = self.incident.active_action().map(str::to_owned);
        let prev = self.history.back();
        let mut sample =
            self.generator
                .next(prev, &self.config, override_action.is_some(), live_seed);
        if let Some(action) = &override_action {
            sample = apply_corrective_action(&sample, action, self.generator.rng_mut());
        }

        let anomaly = if self.incident.is_idle() {
            evaluate(&sample, prev, &self.thresholds)
        } else {
            None
        };

        let mut trigger = None;
        if let Some(anomaly) = anomaly.filter(|a| self.incident.begin(a.clone(), now)) {
            self.status = GridStatus::Optimizing;
            self.incident_count += 1;
            tracing::info!(tick = sample.tick, reason = %anomaly, "anomaly detected");
            released.push(self.push_log(
                AgentRole::System,
                format!("ANOMALY DETECTED: {anomaly}. Triggering Multi-Agent Negotiation..."),
            ));
            trigger = Some(NarrationRequest {
                sample: sample.clone(),
                anomaly,
                thresholds: self.thresholds.clone(),
                bias: self.config.optimization_bias,
            });
        }

        tracing::debug!(
            tick = sample.tick,
            load_kw = sample.load_kw,
            voltage_v = sample.voltage_v,
            overridden = override_action.is_some(),
            "tick"
        );

        if self.history.len() >= self.settings.history_len.max(1) {
            self.history.pop_front();
        }
        self.history.push_back(sample.clone());

        TickReport {
            sample,
            trigger,
            logs: released,
        }
    }

    /// Feeds a narrator answer into the pending incident.
    ///
    /// Schedules the transcript on the configured stagger and the action
    /// after the settle delay, measured from the current engine clock. Lines
    /// due immediately are released and returned.
    ///
    /// An answer with no pending incident is ignored.
    pub fn resolve_incident(&mut self, narration: Narration) -> Vec<AgentLog> {
        let now = self.clock.elapsed_ms();
        let lines = narration.transcript.len();
        let action = narration.action.clone();
        if !self.incident.resolve(narration, now) {
            tracing::warn!(%action, "narration arrived with no pending incident, dropping");
            return Vec::new();
        }
        tracing::info!(%action, lines, "negotiation resolved");

        self.incident
            .due(now)
            .into_iter()
            .map(|event| self.apply_event(event))
            .collect()
    }

    fn apply_event(&mut self, event: IncidentEvent) -> AgentLog {
        let now = self.clock.elapsed_ms();
        match event {
            IncidentEvent::Line(line) => self.push_log(line.role, line.message),
            IncidentEvent::Activate { action } => {
                tracing::info!(%action, elapsed_ms = now, "corrective action engaged");
                self.push_log(
                    AgentRole::System,
                    format!("CONSENSUS REACHED: EXECUTING {action}"),
                )
            }
            IncidentEvent::Revert => {
                self.restore_after_incident();
                tracing::info!(elapsed_ms = now, "corrective action reverted");
                self.push_log(AgentRole::System, "Stability restored. Agents standing by.")
            }
        }
    }

    /// Appends an operator-visible log line.
    pub fn log(&mut self, role: AgentRole, message: impl Into<String>) -> AgentLog {
        self.push_log(role, message)
    }

    /// Returns to the initial settings and an empty history.
    pub fn restart(&mut self) {
        self.generator = Self::build_generator(&self.settings);
        self.config = self.initial_config.clone();
        self.history.clear();
        self.logs.clear();
        self.status = GridStatus::Normal;
        self.incident.clear();
        self.clock.reset();
        self.incident_count = 0;
        tracing::info!("engine restarted");
    }

    fn restore_after_incident(&mut self) {
        self.status = GridStatus::Normal;
        if self.config.load_multiplier > STRESS_LOAD_RESET_ABOVE {
            self.config.load_multiplier = 1.0;
        }
        if self.config.solar_efficiency < SOLAR_DERATE_RESET_BELOW {
            self.config.solar_efficiency = 1.0;
        }
    }

    fn push_log(&mut self, role: AgentRole, message: impl Into<String>) -> AgentLog {
        let entry = AgentLog {
            id: self.next_log_id,
            elapsed_ms: self.clock.elapsed_ms(),
            role,
            message: message.into(),
        };
        self.next_log_id += 1;
        if self.logs.len() >= self.settings.log_len.max(1) {
            self.logs.pop_front();
        }
        self.logs.push_back(entry.clone());
        entry
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<&MetricSample> {
        self.history.back()
    }

    /// Rolling sample history, oldest first.
    pub fn history(&self) -> &VecDeque<MetricSample> {
        &self.history
    }

    /// Rolling agent log, oldest first.
    pub fn logs(&self) -> &VecDeque<AgentLog> {
        &self.logs
    }

    pub fn status(&self) -> GridStatus {
        self.status
    }

    /// `true` while a corrective action is applied to samples.
    pub fn is_overridden(&self) -> bool {
        self.incident.active_action().is_some()
    }

    pub fn incident(&self) -> &Incident {
        &self.incident
    }

    /// Incidents opened since start or the last restart.
    pub fn incident_count(&self) -> u64 {
        self.incident_count
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.clock.elapsed_ms()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SimulationConfig {
        &mut self.config
    }

    pub fn thresholds(&self) -> &AnomalyThresholds {
        &self.thresholds
    }

    pub fn thresholds_mut(&mut self) -> &mut AnomalyThresholds {
        &mut self.thresholds
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narration::AgentLine;
    use crate::sim::anomaly::Anomaly;

    /// Thresholds loose enough that the default generator never trips them.
    fn quiet_thresholds() -> AnomalyThresholds {
        AnomalyThresholds {
            voltage_drop_percent: 20.0,
            load_increase_percent: 100.0,
            frequency_deviation_hz: 2.0,
            max_co2_intensity: 800.0,
        }
    }

    /// A voltage floor above nominal trips on the first sample.
    fn hair_trigger() -> AnomalyThresholds {
        AnomalyThresholds {
            voltage_drop_percent: -10.0,
            ..quiet_thresholds()
        }
    }

    fn narration(lines: usize, action: &str) -> Narration {
        Narration {
            transcript: (0..lines)
                .map(|i| AgentLine::new(AgentRole::SafetyCritic, format!("check {i}")))
                .collect(),
            action: action.to_string(),
        }
    }

    #[test]
    fn history_is_bounded() {
        let settings = EngineSettings {
            history_len: 5,
            ..EngineSettings::default()
        };
        let mut engine = Engine::new(settings, SimulationConfig::default(), quiet_thresholds());
        for _ in 0..12 {
            engine.tick(None);
        }
        assert_eq!(engine.history().len(), 5);
        assert_eq!(engine.latest().map(|s| s.tick), Some(12));
        assert_eq!(engine.history().front().map(|s| s.tick), Some(8));
    }

    #[test]
    fn anomaly_opens_incident_and_logs() {
        let mut engine = Engine::new(
            EngineSettings::default(),
            SimulationConfig::default(),
            hair_trigger(),
        );
        let report = engine.tick(None);
        let trigger = report.trigger.as_ref();
        assert!(matches!(
            trigger.map(|t| &t.anomaly),
            Some(Anomaly::VoltageDrop { .. })
        ));
        assert_eq!(engine.status(), GridStatus::Optimizing);
        assert_eq!(report.logs.len(), 1);
        assert!(report.logs[0].message.starts_with("ANOMALY DETECTED: Voltage Drop"));
        assert!(
            report.logs[0]
                .message
                .ends_with("Triggering Multi-Agent Negotiation...")
        );
    }

    #[test]
    fn concurrent_triggers_are_dropped() {
        let mut engine = Engine::new(
            EngineSettings::default(),
            SimulationConfig::default(),
            hair_trigger(),
        );
        assert!(engine.tick(None).trigger.is_some());
        for _ in 0..5 {
            assert!(engine.tick(None).trigger.is_none());
        }
        assert_eq!(engine.incident_count(), 1);
    }

    #[test]
    fn full_incident_cycle() {
        let mut engine = Engine::new(
            EngineSettings::default(),
            SimulationConfig::default(),
            hair_trigger(),
        );
        // t = 1000
        assert!(engine.tick(None).trigger.is_some());
        let first = engine.resolve_incident(narration(3, "DISPATCH_BATTERY"));
        assert_eq!(first.len(), 1);

        // lines at 1000, 2200, 3400; action at 1000 + 3600 + 1000 = 5600
        let mut line_ticks = Vec::new();
        let mut activated_at = None;
        let mut reverted_at = None;
        for _ in 0..12 {
            let report = engine.tick(None);
            let t = engine.elapsed_ms();
            for log in &report.logs {
                if log.message.starts_with("check") {
                    line_ticks.push(t);
                }
                if log.message == "CONSENSUS REACHED: EXECUTING DISPATCH_BATTERY" {
                    activated_at = Some(t);
                    assert_eq!(report.sample.battery_discharge_kw, 200.0);
                    *engine.thresholds_mut() = quiet_thresholds();
                }
                if log.message == "Stability restored. Agents standing by." {
                    reverted_at = Some(t);
                }
            }
            if activated_at.is_some() && reverted_at.is_none() {
                assert!(engine.is_overridden());
                assert_eq!(engine.status(), GridStatus::Optimizing);
            }
            if reverted_at.is_some() {
                break;
            }
        }
        assert_eq!(line_ticks, vec![3000, 4000]);
        assert_eq!(activated_at, Some(6000));
        // 5600 + 5000
        assert_eq!(reverted_at, Some(11_000));
        assert!(!engine.is_overridden());
        assert_eq!(engine.status(), GridStatus::Normal);
    }

    #[test]
    fn revert_resets_stress_settings() {
        let settings = EngineSettings {
            timings: IncidentTimings {
                stagger_ms: 0,
                settle_ms: 0,
                revert_ms: 1000,
            },
            ..EngineSettings::default()
        };
        let mut engine = Engine::new(settings, SimulationConfig::default(), hair_trigger());
        engine.tick(None);
        *engine.thresholds_mut() = quiet_thresholds();
        engine.config_mut().load_multiplier = 2.0;
        engine.config_mut().solar_efficiency = 0.3;
        engine.config_mut().wind_efficiency = 0.2;
        let released = engine.resolve_incident(Narration::fallback());
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].message, "CONSENSUS REACHED: EXECUTING IGNORE");
        engine.tick(None);
        assert!(engine.incident().is_idle());
        assert_eq!(engine.config().load_multiplier, 1.0);
        assert_eq!(engine.config().solar_efficiency, 1.0);
        assert_eq!(engine.config().wind_efficiency, 0.2);
    }

    #[test]
    fn stray_narration_is_ignored() {
        let mut engine = Engine::new(
            EngineSettings::default(),
            SimulationConfig::default(),
            quiet_thresholds(),
        );
        engine.tick(None);
        assert!(engine.resolve_incident(narration(2, "CURTAIL_LOAD")).is_empty());
        assert!(engine.incident().is_idle());
    }

    #[test]
    fn restart_clears_state() {
        let mut engine = Engine::new(
            EngineSettings::default(),
            SimulationConfig::default(),
            hair_trigger(),
        );
        engine.tick(None);
        engine.config_mut().optimization_bias = 90.0;
        engine.restart();
        assert!(engine.history().is_empty());
        assert!(engine.logs().is_empty());
        assert_eq!(engine.status(), GridStatus::Normal);
        assert_eq!(engine.config().optimization_bias, 50.0);
        assert_eq!(engine.tick(None).sample.tick, 1);
    }

    #[test]
    fn live_seed_marks_samples() {
        let mut engine = Engine::new(
            EngineSettings::default(),
            SimulationConfig::default(),
            quiet_thresholds(),
        );
        let seed = LiveSeed {
            solar_kw: Some(50.0),
            ..LiveSeed::default()
        };
        let report = engine.tick(Some(&seed));
        assert!(report.sample.is_live);
        assert_eq!(report.sample.solar_kw, 50.0);
    }
}
