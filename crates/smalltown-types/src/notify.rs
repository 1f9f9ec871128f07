//! Outbound notification and status types.
//!
//! The simulation emits these as plain data. Whatever transport sits on the
//! other side (websocket, log, test harness) decides how to deliver them.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{AgentState, RunState};
use crate::ids::AgentId;
use crate::structs::{AgentSnapshot, Attributes, Event, Position};
use crate::time::SimTime;

/// Partial update of an agent. Unset fields did not change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentUpdate {
    /// New tile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// New behavioral state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<AgentState>,
    /// New attributes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
    /// New action label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_action: Option<String>,
}

impl AgentUpdate {
    /// True if nothing changed.
    pub const fn is_empty(&self) -> bool {
        self.position.is_none()
            && self.state.is_none()
            && self.attributes.is_none()
            && self.current_action.is_none()
    }
}

/// A message for observers of the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// An agent changed.
    AgentUpdated {
        /// Which agent.
        agent_id: AgentId,
        /// What changed.
        update: AgentUpdate,
    },
    /// An event was recorded.
    EventRecorded {
        /// The event.
        event: Event,
    },
    /// Simulated time advanced.
    TimeAdvanced {
        /// Current simulated time.
        current_time: SimTime,
        /// Current one-based day.
        day_count: u64,
    },
}

/// Answer to a status query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StatusSnapshot {
    /// Scheduler state.
    pub state: RunState,
    /// Wall-clock milliseconds since the last start, zero when stopped.
    pub uptime_ms: u64,
    /// Current simulated time.
    pub current_time: SimTime,
    /// Current one-based day.
    pub day_count: u64,
    /// Every agent.
    pub agents: Vec<AgentSnapshot>,
}
