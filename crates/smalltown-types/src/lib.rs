//! Shared type definitions for the Smalltown simulation.
//!
//! Every crate in the workspace speaks in these types. They also flow to
//! `TypeScript` via `ts-rs` for any front end that renders the town.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for agents, events, and memories
//! - [`enums`] -- Enumerations (agent state, memory kind, terrain, event scope)
//! - [`structs`] -- Entity structs (positions, memories, events, snapshots)
//! - [`actions`] -- Typed actions parsed from decision replies
//! - [`notify`] -- Outbound notifications and status snapshots
//! - [`time`] -- Simulated clock values and time-of-day bands

pub mod actions;
pub mod enums;
pub mod ids;
pub mod notify;
pub mod structs;
pub mod time;

pub use actions::{Action, MoveTarget};
pub use enums::{
    AgentState, Direction, EventKind, EventScope, Importance, MemoryKind, RunState, Sentiment,
    Terrain,
};
pub use ids::{AgentId, EventId, MemoryId};
pub use notify::{AgentUpdate, Notification, StatusSnapshot};
pub use structs::{
    ATTRIBUTE_MAX, AgentSnapshot, Attributes, Event, EventDetail, EventMetadata, ImpactDelta,
    MOOD_MIN, Memory, Position, Relationship,
};
pub use time::{MS_PER_DAY, MS_PER_HOUR, MS_PER_SECOND, SimTime, TimeOfDay};

#[cfg(test)]
mod tests {
    #[test]
    fn export_bindings() {
        // Writes TypeScript bindings into `bindings/` next to the crate.
        use ts_rs::TS;

        let _ = crate::ids::AgentId::export_all();
        let _ = crate::ids::EventId::export_all();
        let _ = crate::ids::MemoryId::export_all();

        let _ = crate::enums::AgentState::export_all();
        let _ = crate::enums::Sentiment::export_all();
        let _ = crate::enums::MemoryKind::export_all();
        let _ = crate::enums::Importance::export_all();
        let _ = crate::enums::EventKind::export_all();
        let _ = crate::enums::EventScope::export_all();
        let _ = crate::enums::Terrain::export_all();
        let _ = crate::enums::Direction::export_all();
        let _ = crate::enums::RunState::export_all();

        let _ = crate::structs::Position::export_all();
        let _ = crate::structs::Attributes::export_all();
        let _ = crate::structs::ImpactDelta::export_all();
        let _ = crate::structs::Relationship::export_all();
        let _ = crate::structs::Memory::export_all();
        let _ = crate::structs::EventDetail::export_all();
        let _ = crate::structs::EventMetadata::export_all();
        let _ = crate::structs::Event::export_all();
        let _ = crate::structs::AgentSnapshot::export_all();

        let _ = crate::actions::MoveTarget::export_all();
        let _ = crate::actions::Action::export_all();

        let _ = crate::notify::AgentUpdate::export_all();
        let _ = crate::notify::Notification::export_all();
        let _ = crate::notify::StatusSnapshot::export_all();

        let _ = crate::time::SimTime::export_all();
        let _ = crate::time::TimeOfDay::export_all();
    }
}
