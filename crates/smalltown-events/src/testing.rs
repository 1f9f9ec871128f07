//! Shared fixtures for unit tests.

#![allow(clippy::unwrap_used)]

use smalltown_agents::{Agent, AgentProfile, AgentRoster};

/// An agent with default attributes at `(x, y)`.
pub(crate) fn make_agent(name: &str, x: i32, y: i32) -> Agent {
    let profile: AgentProfile = serde_json::from_value(serde_json::json!({
        "name": name,
        "personality": "easygoing",
        "position": { "x": x, "y": y },
    }))
    .unwrap();
    Agent::from_profile(profile, 100)
}

/// A roster with one agent per name, placed along row 0.
pub(crate) fn roster(names: &[&str]) -> AgentRoster {
    let mut roster = AgentRoster::new();
    for (i, name) in names.iter().enumerate() {
        let x = i32::try_from(i).unwrap();
        roster.insert(make_agent(name, x, 0)).unwrap();
    }
    roster
}
