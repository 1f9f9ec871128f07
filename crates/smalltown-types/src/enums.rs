//! Enumeration types for the Smalltown simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// Behavioral state of an agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// Not doing anything in particular.
    #[default]
    Idle,
    /// Walking between tiles.
    Moving,
    /// In conversation.
    Talking,
    /// Engaged in a non-verbal interaction.
    Interacting,
    /// Pursuing a goal.
    Working,
    /// Recovering energy.
    Resting,
}

/// Sentiment classification of a piece of dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    /// Friendly or appreciative.
    Positive,
    /// Hostile or unhappy.
    Negative,
    /// Neither, or tied.
    Neutral,
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// What kind of experience a memory records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// A conversation or exchange with another agent.
    Interaction,
    /// Being affected by a town event.
    Event,
    /// Something seen or overheard.
    Observation,
    /// An internal feeling.
    Emotion,
}

/// Ordinal importance of a memory (1 to 4).
///
/// Ordering follows the numeric rank, so `Low < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    /// Rank 1.
    Low = 1,
    /// Rank 2.
    Medium = 2,
    /// Rank 3.
    High = 3,
    /// Rank 4.
    Critical = 4,
}

impl Importance {
    /// Numeric rank in `1..=4`.
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// Rank normalized to `0.25..=1.0` for relevance scoring.
    pub fn weight(self) -> f64 {
        f64::from(self.rank()) / 4.0
    }

    /// Upper-case label used in prompts and digests.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Category of a town event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Something between residents.
    Social,
    /// Weather and surroundings.
    Environmental,
    /// Something that happens to one resident.
    Personal,
    /// Town-wide happenings.
    Town,
}

impl EventKind {
    /// All categories in generator order.
    pub const ALL: [Self; 4] = [Self::Social, Self::Environmental, Self::Personal, Self::Town];

    /// Lower-case label, also used as a memory tag.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Social => "social",
            Self::Environmental => "environmental",
            Self::Personal => "personal",
            Self::Town => "town",
        }
    }

    /// Parse a label case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(label.trim()))
    }
}

/// Blast radius of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum EventScope {
    /// Only explicitly listed agents.
    Individual,
    /// Listed agents plus anyone within the local radius of the event position.
    Local,
    /// Everyone.
    Global,
}

impl EventScope {
    /// Lower-case label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Local => "local",
            Self::Global => "global",
        }
    }

    /// Parse a label case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        [Self::Individual, Self::Local, Self::Global]
            .into_iter()
            .find(|scope| scope.label().eq_ignore_ascii_case(label.trim()))
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Terrain of a single grid tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    /// Open ground.
    #[default]
    Ground,
    /// A residence. Not walkable.
    House,
    /// A shop building. Not walkable.
    Shop,
    /// Green space.
    Park,
    /// Paved street.
    Road,
}

impl Terrain {
    /// Whether agents may stand on this terrain.
    pub const fn is_walkable(self) -> bool {
        matches!(self, Self::Ground | Self::Park | Self::Road)
    }

    /// Lower-case label used in prompts.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ground => "ground",
            Self::House => "house",
            Self::Shop => "shop",
            Self::Park => "park",
            Self::Road => "road",
        }
    }
}

/// One of the four grid directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Toward row 0.
    Up,
    /// Toward the last row.
    Down,
    /// Toward column 0.
    Left,
    /// Toward the last column.
    Right,
}

impl Direction {
    /// Unit `(dx, dy)` vector. The y axis grows downward.
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    /// Parse a direction token case-insensitively.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "UP" => Some(Self::Up),
            "DOWN" => Some(Self::Down),
            "LEFT" => Some(Self::Left),
            "RIGHT" => Some(Self::Right),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Lifecycle state of the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Not ticking. Initial and terminal state.
    #[default]
    Stopped,
    /// Ticking.
    Running,
    /// Ticking suspended until resumed.
    Paused,
}
