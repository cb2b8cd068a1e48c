//! Run log: everything the reference loops did, in order.
//!
//! RULE: The log is append only. Two runs with the same seed and
//! configuration must produce identical logs.

use crate::{
    action::{Action, Actor},
    error::EngineResult,
    simulation::RunOutcome,
    types::{SimTime, TargetId, UnitId},
};
use serde::{Deserialize, Serialize};

/// Every event emitted during simulation.
/// Variants may be added; never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Snapshot loop ──────────────────────────────
    ActionApplied {
        time:        SimTime,
        action:      Action,
        duration:    SimTime,
        energy_cost: f64,
    },

    // ── Stepping loop ──────────────────────────────
    ActionStarted {
        time:   SimTime,
        actor:  Actor,
        action: Action,
    },
    ActionCompleted {
        time:   SimTime,
        actor:  Actor,
        action: Action,
    },

    // ── Both ───────────────────────────────────────
    TargetCleaned {
        time:   SimTime,
        target: TargetId,
        unit:   Option<UnitId>,
    },
    RunFinished {
        time:    SimTime,
        outcome: RunOutcome,
        steps:   u64,
    },
}

impl SimEvent {
    pub fn time(&self) -> SimTime {
        match self {
            SimEvent::ActionApplied { time, .. }
            | SimEvent::ActionStarted { time, .. }
            | SimEvent::ActionCompleted { time, .. }
            | SimEvent::TargetCleaned { time, .. }
            | SimEvent::RunFinished { time, .. } => *time,
        }
    }

    /// Stable string name of the variant.
    pub fn event_type(&self) -> &'static str {
        match self {
            SimEvent::ActionApplied { .. }   => "action_applied",
            SimEvent::ActionStarted { .. }   => "action_started",
            SimEvent::ActionCompleted { .. } => "action_completed",
            SimEvent::TargetCleaned { .. }   => "target_cleaned",
            SimEvent::RunFinished { .. }     => "run_finished",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub seq:        u64,
    pub time:       SimTime,
    pub event_type: String,
    pub payload:    String, // JSON-serialized SimEvent
}

#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<SimEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: SimEvent) {
        log::trace!("event #{} {}", self.events.len(), event.event_type());
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimEvent> {
        self.events.iter()
    }

    pub fn last(&self) -> Option<&SimEvent> {
        self.events.last()
    }

    pub fn entries(&self) -> EngineResult<Vec<EventLogEntry>> {
        self.events
            .iter()
            .enumerate()
            .map(|(seq, event)| -> EngineResult<EventLogEntry> {
                Ok(EventLogEntry {
                    seq:        seq as u64,
                    time:       event.time(),
                    event_type: event.event_type().to_string(),
                    payload:    serde_json::to_string(event)?,
                })
            })
            .collect()
    }

    /// One JSON object per line.
    pub fn to_json_lines(&self) -> EngineResult<String> {
        let mut out = String::new();
        for event in &self.events {
            out.push_str(&serde_json::to_string(event)?);
            out.push('\n');
        }
        Ok(out)
    }
}
