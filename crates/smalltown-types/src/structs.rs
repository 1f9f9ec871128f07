//! Core entity structs: positions, attributes, relationships, memories,
//! events, and agent snapshots.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{AgentState, Direction, EventKind, EventScope, Importance, MemoryKind};
use crate::ids::{AgentId, EventId, MemoryId};
use crate::time::SimTime;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A tile coordinate. `x` grows to the right, `y` grows downward.
///
/// Ordering is row-major (`y` first) so sorted positions read like the grid.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// Row.
    pub y: i32,
    /// Column.
    pub x: i32,
}

impl Position {
    /// Construct a position.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighboring tile in `direction` (may be off-grid).
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Taxicab distance.
    pub const fn manhattan(self, other: Self) -> u32 {
        self.x
            .abs_diff(other.x)
            .saturating_add(self.y.abs_diff(other.y))
    }

    /// Largest per-axis distance (square neighborhood).
    pub const fn chebyshev(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy { dx } else { dy }
    }

    /// Straight-line distance.
    pub fn euclidean(self, other: Self) -> f64 {
        let dx = f64::from(self.x.abs_diff(other.x));
        let dy = f64::from(self.y.abs_diff(other.y));
        dx.hypot(dy)
    }

    /// True if the positions share an edge.
    pub const fn is_adjacent(self, other: Self) -> bool {
        self.manhattan(other) == 1
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// Lower bound of mood.
pub const MOOD_MIN: i32 = -100;
/// Upper bound of every attribute.
pub const ATTRIBUTE_MAX: i32 = 100;

/// Numeric attributes of an agent.
///
/// Energy and sociability live in `0..=100`, mood in `-100..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Attributes {
    /// Physical energy.
    pub energy: i32,
    /// Emotional state, negative is unhappy.
    pub mood: i32,
    /// Desire for company.
    pub sociability: i32,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            energy: 100,
            mood: 50,
            sociability: 50,
        }
    }
}

impl Attributes {
    /// Build attributes, clamping each value into its valid range.
    pub fn clamped(energy: i32, mood: i32, sociability: i32) -> Self {
        Self {
            energy: energy.clamp(0, ATTRIBUTE_MAX),
            mood: mood.clamp(MOOD_MIN, ATTRIBUTE_MAX),
            sociability: sociability.clamp(0, ATTRIBUTE_MAX),
        }
    }

    /// Apply a delta, clamping each attribute into its valid range.
    pub fn apply(&mut self, delta: &ImpactDelta) {
        *self = Self::clamped(
            self.energy.saturating_add(delta.energy),
            self.mood.saturating_add(delta.mood),
            self.sociability.saturating_add(delta.sociability),
        );
    }
}

/// Attribute changes carried by an event or a reaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ImpactDelta {
    /// Change in mood.
    #[serde(default)]
    pub mood: i32,
    /// Change in energy.
    #[serde(default)]
    pub energy: i32,
    /// Change in sociability.
    #[serde(default)]
    pub sociability: i32,
}

// ---------------------------------------------------------------------------
// Relationship
// ---------------------------------------------------------------------------

/// One agent's view of another.
///
/// Stored only in the holder's map. Nothing mirrors it into the other
/// agent's map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Relationship {
    /// Signed affinity in `-100..=100`.
    pub affinity: i32,
    /// Number of recorded interactions, of any sentiment.
    pub interactions: u32,
    /// When the last interaction happened.
    pub last_interaction: Option<SimTime>,
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// A single entry in an agent's memory log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Memory {
    /// Unique id.
    pub id: MemoryId,
    /// What kind of experience this is.
    pub kind: MemoryKind,
    /// When it was formed.
    pub timestamp: SimTime,
    /// Free text.
    pub content: String,
    /// Retention and ranking weight.
    pub importance: Importance,
    /// Agents involved.
    pub related_agents: Vec<AgentId>,
    /// Where it happened, as a label such as `(3, 4)`.
    pub location: Option<String>,
    /// Emotion felt.
    pub emotion: Option<String>,
    /// Free-form tags.
    pub tags: Vec<String>,
}

impl Memory {
    /// Create a memory with no optional fields set.
    pub fn new(
        kind: MemoryKind,
        timestamp: SimTime,
        content: impl Into<String>,
        importance: Importance,
    ) -> Self {
        Self {
            id: MemoryId::new(),
            kind,
            timestamp,
            content: content.into(),
            importance,
            related_agents: Vec::new(),
            location: None,
            emotion: None,
            tags: Vec::new(),
        }
    }

    /// Attach related agents.
    #[must_use]
    pub fn with_related(mut self, agents: impl IntoIterator<Item = AgentId>) -> Self {
        self.related_agents.extend(agents);
        self
    }

    /// Attach tags.
    #[must_use]
    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Attach a location label.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Attach an emotion label.
    #[must_use]
    pub fn with_emotion(mut self, emotion: impl Into<String>) -> Self {
        self.emotion = Some(emotion.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Category-specific details of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventDetail {
    /// Two residents ran into each other.
    Social {
        /// Agent the event was centred on.
        initiator: AgentId,
        /// The other participant.
        partner: AgentId,
    },
    /// Weather or surroundings changed.
    Environmental,
    /// Something happened to a single resident.
    Personal {
        /// The resident concerned.
        subject: AgentId,
    },
    /// A town-wide happening.
    Town {
        /// Set when this is the start-of-day announcement.
        new_day: Option<u64>,
    },
    /// Produced by the decision service during an event chain.
    Chain {
        /// One-based round within its chain.
        round: u32,
        /// Zero for a top-level chain, one for a chain triggered by a reaction.
        depth: u32,
    },
}

/// Metadata attached to an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventMetadata {
    /// Typed details.
    pub detail: EventDetail,
    /// Unprocessed generator output, kept for inspection.
    pub raw_payload: Option<String>,
}

impl EventMetadata {
    /// Metadata with no raw payload.
    pub const fn typed(detail: EventDetail) -> Self {
        Self {
            detail,
            raw_payload: None,
        }
    }
}

/// A recorded town event. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    /// Unique id.
    pub id: EventId,
    /// Category.
    pub kind: EventKind,
    /// Blast radius.
    pub scope: EventScope,
    /// What happened.
    pub description: String,
    /// Where it happened, if anywhere in particular.
    pub position: Option<Position>,
    /// Agents explicitly affected.
    pub affected: Vec<AgentId>,
    /// When it began.
    pub start: SimTime,
    /// How long it lasts, in simulated milliseconds.
    pub duration_ms: u64,
    /// Attribute changes applied to affected agents.
    pub impact: ImpactDelta,
    /// Category details and raw generator output.
    pub metadata: EventMetadata,
}

impl Event {
    /// When the event stops being active.
    pub const fn end(&self) -> SimTime {
        self.start.plus_millis(self.duration_ms)
    }

    /// True while `now` lies within `[start, end)`.
    pub fn is_active(&self, now: SimTime) -> bool {
        self.start <= now && now < self.end()
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Read-only view of an agent for status queries and notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentSnapshot {
    /// Agent id.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Current tile.
    pub position: Position,
    /// Behavioral state.
    pub state: AgentState,
    /// Current attributes.
    pub attributes: Attributes,
    /// What the agent is doing, in words.
    pub current_action: String,
    /// Decision-service profile.
    pub llm_profile: String,
    /// Number of memories held.
    pub memory_count: u32,
}
