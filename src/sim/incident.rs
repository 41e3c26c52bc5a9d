//! Incident lifecycle: trigger, narration, staggered release, override, revert.
//!
//! An incident is a small state machine driven by the engine clock. Nothing
//! here sleeps; events are scheduled against elapsed milliseconds and released
//! by [`Incident::due`] on the tick that reaches them.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::anomaly::Anomaly;
use crate::narration::{AgentLine, Narration};

/// Delays between incident stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentTimings {
    /// Gap between consecutive transcript lines (ms).
    pub stagger_ms: u64,
    /// Pause after the last line before the action executes (ms).
    pub settle_ms: u64,
    /// How long the corrective action stays in force (ms).
    pub revert_ms: u64,
}

impl Default for IncidentTimings {
    fn default() -> Self {
        Self {
            stagger_ms: 1200,
            settle_ms: 1000,
            revert_ms: 5000,
        }
    }
}

/// Something the incident wants the engine to do now.
#[derive(Debug, Clone, PartialEq)]
pub enum IncidentEvent {
    /// Publish a transcript line.
    Line(AgentLine),
    /// Start applying `action` to every sample.
    Activate { action: String },
    /// Stop the override and restore normal operation.
    Revert,
}

#[derive(Debug, Clone, PartialEq)]
struct Scheduled {
    due_ms: u64,
    event: IncidentEvent,
}

/// Where the current incident stands.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum IncidentPhase {
    /// Nothing in flight; the evaluator may trigger.
    #[default]
    Idle,
    /// Waiting for a narrator to answer.
    AwaitingNarration { anomaly: Anomaly, since_ms: u64 },
    /// Transcript lines are being released.
    Negotiating { action: String },
    /// The corrective action is in force.
    Active { action: String, revert_at_ms: u64 },
}

/// Single in-flight incident.
#[derive(Debug, Clone, Default)]
pub struct Incident {
    phase: IncidentPhase,
    queue: VecDeque<Scheduled>,
    timings: IncidentTimings,
}

impl Incident {
    pub fn new(timings: IncidentTimings) -> Self {
        Self {
            phase: IncidentPhase::Idle,
            queue: VecDeque::new(),
            timings,
        }
    }

    pub fn phase(&self) -> &IncidentPhase {
        &self.phase
    }

    pub fn timings(&self) -> IncidentTimings {
        self.timings
    }

    /// `true` when no incident is in flight.
    pub fn is_idle(&self) -> bool {
        self.phase == IncidentPhase::Idle
    }

    /// Action currently overriding samples, if any.
    pub fn active_action(&self) -> Option<&str> {
        match &self.phase {
            IncidentPhase::Active { action, .. } => Some(action),
            _ => None,
        }
    }

    /// Opens an incident for `anomaly`.
    ///
    /// # Returns
    ///
    /// `false` (and no state change) if another incident is already in flight.
    pub fn begin(&mut self, anomaly: Anomaly, now_ms: u64) -> bool {
        if !self.is_idle() {
            return false;
        }
        self.phase = IncidentPhase::AwaitingNarration {
            anomaly,
            since_ms: now_ms,
        };
        true
    }

    /// Schedules the transcript and the activation for a narrator answer.
    ///
    /// Line `i` is due at `now + i * stagger`; the action activates at
    /// `now + n * stagger + settle`.
    ///
    /// # Returns
    ///
    /// `false` if the incident was not awaiting narration.
    pub fn resolve(&mut self, narration: Narration, now_ms: u64) -> bool {
        if !matches!(self.phase, IncidentPhase::AwaitingNarration { .. }) {
            return false;
        }
        let stagger = self.timings.stagger_ms;
        let n = narration.transcript.len() as u64;
        for (i, line) in narration.transcript.into_iter().enumerate() {
            self.queue.push_back(Scheduled {
                due_ms: now_ms + i as u64 * stagger,
                event: IncidentEvent::Line(line),
            });
        }
        self.queue.push_back(Scheduled {
            due_ms: now_ms + n * stagger + self.timings.settle_ms,
            event: IncidentEvent::Activate {
                action: narration.action.clone(),
            },
        });
        self.phase = IncidentPhase::Negotiating {
            action: narration.action,
        };
        true
    }

    /// Releases every event due at or before `now_ms`, advancing the phase.
    pub fn due(&mut self, now_ms: u64) -> Vec<IncidentEvent> {
        let mut released = Vec::new();
        while self.queue.front().is_some_and(|s| s.due_ms <= now_ms) {
            let Some(Scheduled { due_ms, event }) = self.queue.pop_front() else {
                break;
            };
            if let IncidentEvent::Activate { action } = &event {
                let revert_at_ms = due_ms + self.timings.revert_ms;
                self.phase = IncidentPhase::Active {
                    action: action.clone(),
                    revert_at_ms,
                };
                self.queue.push_back(Scheduled {
                    due_ms: revert_at_ms,
                    event: IncidentEvent::Revert,
                });
            }
            if event == IncidentEvent::Revert {
                self.phase = IncidentPhase::Idle;
            }
            released.push(event);
        }
        released
    }

    /// Drops any in-flight incident.
    pub fn clear(&mut self) {
        self.phase = IncidentPhase::Idle;
        self.queue.clear();
    }
}
