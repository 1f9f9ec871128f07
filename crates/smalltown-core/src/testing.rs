//! Shared fixtures for unit tests.

#![allow(clippy::unwrap_used)]

use smalltown_agents::{Agent, AgentProfile, PromptEngine};
use smalltown_types::{
    Event, EventDetail, EventId, EventKind, EventMetadata, EventScope, ImpactDelta, SimTime,
};

use crate::config::SimulationConfig;
use crate::simulation::Simulation;

/// A resident profile at `(x, y)` with default attributes.
pub(crate) fn profile(name: &str, x: i32, y: i32) -> AgentProfile {
    serde_json::from_value(serde_json::json!({
        "name": name,
        "personality": "easygoing",
        "position": { "x": x, "y": y },
    }))
    .unwrap()
}

/// An agent built from [`profile`].
pub(crate) fn make_agent(name: &str, x: i32, y: i32) -> Agent {
    Agent::from_profile(profile(name, x, y), 100)
}

/// A global town event that lasts one minute from time zero.
pub(crate) fn make_event(description: &str) -> Event {
    Event {
        id: EventId::new(),
        kind: EventKind::Town,
        scope: EventScope::Global,
        description: description.to_owned(),
        position: None,
        affected: Vec::new(),
        start: SimTime::ZERO,
        duration_ms: 60_000,
        impact: ImpactDelta::default(),
        metadata: EventMetadata::typed(EventDetail::Town { new_day: None }),
    }
}

/// A simulation on the default town holding exactly `residents`.
pub(crate) fn simulation(residents: &[(&str, i32, i32)]) -> Simulation {
    let config = SimulationConfig {
        residents: residents
            .iter()
            .map(|&(name, x, y)| profile(name, x, y))
            .collect(),
        ..SimulationConfig::default()
    };
    Simulation::new(config, PromptEngine::builtin().unwrap()).unwrap()
}
