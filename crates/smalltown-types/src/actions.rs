//! Actions an agent can choose in response to a decision prompt.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::Direction;
use crate::structs::Position;

/// Where a move is headed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum MoveTarget {
    /// One tile in a direction.
    Direction(Direction),
    /// A distant tile. The agent takes one path step toward it per decision.
    Destination(Position),
}

/// A typed action parsed from a decision-service reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Move one tile.
    Move {
        /// Direction or destination.
        target: MoveTarget,
    },
    /// Say something, optionally to someone.
    Speak {
        /// Words spoken.
        message: String,
        /// Name of the addressee.
        target: Option<String>,
    },
    /// Interact with another agent.
    Interact {
        /// Name of the other agent.
        target: Option<String>,
        /// Words exchanged, if any.
        message: Option<String>,
        /// Description of the interaction.
        interaction: Option<String>,
    },
    /// Work toward a goal.
    PursueGoal {
        /// The goal.
        goal: String,
        /// Self-assigned priority.
        priority: Option<u32>,
    },
    /// Stroll to a random nearby tile.
    Wander,
    /// Do nothing this cycle.
    #[default]
    Idle,
}

impl Action {
    /// Upper-case label matching the reply grammar.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Move { .. } => "MOVE",
            Self::Speak { .. } => "SPEAK",
            Self::Interact { .. } => "INTERACT",
            Self::PursueGoal { .. } => "PURSUE_GOAL",
            Self::Wander => "WANDER",
            Self::Idle => "IDLE",
        }
    }
}
