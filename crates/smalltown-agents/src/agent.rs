//! Residents and the roster that owns them.
//!
//! The [`AgentRoster`] is an arena: agents live in a `Vec` in insertion
//! order, and an `AgentId -> index` map gives constant-time lookup. Grid
//! tiles refer to agents only by [`AgentId`], so the roster is the sole
//! owner of every agent record.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use smalltown_types::{
    AgentId, AgentSnapshot, AgentState, Attributes, Memory, Position, Relationship,
};

use crate::error::AgentError;
use crate::memory::MemoryStore;

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Everything needed to create a resident. Loaded from config or presets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Display name. Unique within the roster.
    pub name: String,
    /// Short personality description used in prompts.
    #[serde(default)]
    pub personality: String,
    /// Mood word used in prompts.
    #[serde(default = "default_mood_label")]
    pub mood: String,
    /// Character traits.
    #[serde(default)]
    pub traits: Vec<String>,
    /// Daily routine, `HH:MM` to activity.
    #[serde(default)]
    pub schedule: BTreeMap<String, String>,
    /// Named needs, each `0..=100`.
    #[serde(default)]
    pub needs: BTreeMap<String, i32>,
    /// Starting tile.
    pub position: Position,
    /// Starting behavioral state.
    #[serde(default)]
    pub state: AgentState,
    /// Starting attributes.
    #[serde(default)]
    pub attributes: Attributes,
    /// Starting action label.
    #[serde(default)]
    pub current_action: String,
    /// Decision-service profile id.
    #[serde(default = "default_llm_profile")]
    pub llm_profile: String,
}

fn default_mood_label() -> String {
    "calm".to_owned()
}

fn default_llm_profile() -> String {
    "default".to_owned()
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// A resident of the town.
///
/// `position` must always match the grid tile that names this agent as its
/// occupant. Only code that also updates the grid should change it.
#[derive(Debug, Clone)]
pub struct Agent {
    /// Unique id.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Personality description.
    pub personality: String,
    /// Mood word.
    pub mood: String,
    /// Character traits.
    pub traits: Vec<String>,
    /// Daily routine.
    pub schedule: BTreeMap<String, String>,
    /// Named needs.
    pub needs: BTreeMap<String, i32>,
    /// Current tile.
    pub position: Position,
    /// Behavioral state.
    pub state: AgentState,
    /// Numeric attributes.
    pub attributes: Attributes,
    /// This agent's view of others. Never mirrored automatically.
    pub relationships: BTreeMap<AgentId, Relationship>,
    /// Owned memory log.
    pub memory: MemoryStore,
    /// What the agent is doing, in words.
    pub current_action: String,
    /// Decision-service profile id.
    pub llm_profile: String,
}

impl Agent {
    /// Create an agent from a profile with a fresh id and empty memory.
    pub fn from_profile(profile: AgentProfile, memory_capacity: usize) -> Self {
        Self {
            id: AgentId::new(),
            name: profile.name,
            personality: profile.personality,
            mood: profile.mood,
            traits: profile.traits,
            schedule: profile.schedule,
            needs: profile.needs,
            position: profile.position,
            state: profile.state,
            attributes: Attributes::clamped(
                profile.attributes.energy,
                profile.attributes.mood,
                profile.attributes.sociability,
            ),
            relationships: BTreeMap::new(),
            memory: MemoryStore::new(memory_capacity),
            current_action: profile.current_action,
            llm_profile: profile.llm_profile,
        }
    }

    /// This agent's relationship record for `other`, if one exists.
    pub fn relationship_with(&self, other: AgentId) -> Option<&Relationship> {
        self.relationships.get(&other)
    }

    /// Append a memory to this agent's log.
    pub fn remember(&mut self, memory: Memory) {
        self.memory.record(memory);
    }

    /// Read-only view for status queries.
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            name: self.name.clone(),
            position: self.position,
            state: self.state,
            attributes: self.attributes,
            current_action: self.current_action.clone(),
            llm_profile: self.llm_profile.clone(),
            memory_count: u32::try_from(self.memory.len()).unwrap_or(u32::MAX),
        }
    }
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// Owning collection of agents with stable iteration order.
#[derive(Debug, Clone, Default)]
pub struct AgentRoster {
    slots: Vec<Agent>,
    index: HashMap<AgentId, usize>,
}

impl AgentRoster {
    /// An empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of agents.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if there are no agents.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Add an agent at the end of the iteration order.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DuplicateName`] if the name is taken.
    pub fn insert(&mut self, agent: Agent) -> Result<AgentId, AgentError> {
        if self.find_by_name(&agent.name).is_some() {
            return Err(AgentError::DuplicateName(agent.name));
        }
        let id = agent.id;
        self.index.insert(id, self.slots.len());
        self.slots.push(agent);
        Ok(id)
    }

    /// Remove an agent, preserving the order of the rest.
    pub fn remove(&mut self, id: AgentId) -> Option<Agent> {
        let slot = self.index.remove(&id)?;
        if slot >= self.slots.len() {
            return None;
        }
        let agent = self.slots.remove(slot);
        for (i, remaining) in self.slots.iter().enumerate().skip(slot) {
            self.index.insert(remaining.id, i);
        }
        Some(agent)
    }

    /// Look up an agent.
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.index.get(&id).and_then(|&i| self.slots.get(i))
    }

    /// Look up an agent mutably.
    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        let slot = *self.index.get(&id)?;
        self.slots.get_mut(slot)
    }

    /// Look up an agent.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::AgentNotFound`] if absent.
    pub fn require(&self, id: AgentId) -> Result<&Agent, AgentError> {
        self.get(id).ok_or(AgentError::AgentNotFound(id))
    }

    /// Look up an agent mutably.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::AgentNotFound`] if absent.
    pub fn require_mut(&mut self, id: AgentId) -> Result<&mut Agent, AgentError> {
        self.get_mut(id).ok_or(AgentError::AgentNotFound(id))
    }

    /// Find an agent by name (case-insensitive) or by the string form of
    /// its id. Decision replies name their targets either way.
    pub fn find_by_name(&self, name: &str) -> Option<&Agent> {
        let wanted = name.trim();
        self.slots.iter().find(|a| {
            a.name.eq_ignore_ascii_case(wanted) || a.id.to_string() == wanted
        })
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.slots.iter()
    }

    /// Iterate mutably in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        self.slots.iter_mut()
    }

    /// All ids in insertion order.
    pub fn ids(&self) -> Vec<AgentId> {
        self.slots.iter().map(|a| a.id).collect()
    }

    /// Snapshots of every agent in insertion order.
    pub fn snapshots(&self) -> Vec<AgentSnapshot> {
        self.slots.iter().map(Agent::snapshot).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_agent(name: &str, x: i32, y: i32) -> Agent {
        Agent::from_profile(
            AgentProfile {
                name: name.to_owned(),
                personality: "easygoing".to_owned(),
                mood: default_mood_label(),
                traits: Vec::new(),
                schedule: BTreeMap::new(),
                needs: BTreeMap::new(),
                position: Position::new(x, y),
                state: AgentState::Idle,
                attributes: Attributes::default(),
                current_action: String::new(),
                llm_profile: default_llm_profile(),
            },
            100,
        )
    }

    #[test]
    fn insertion_order_is_iteration_order() {
        let mut roster = AgentRoster::new();
        let a = roster.insert(make_agent("Ana", 0, 0)).unwrap();
        let b = roster.insert(make_agent("Ben", 1, 0)).unwrap();
        let c = roster.insert(make_agent("Cal", 2, 0)).unwrap();
        assert_eq!(roster.ids(), vec![a, b, c]);
    }

    #[test]
    fn remove_reindexes_remaining_agents() {
        let mut roster = AgentRoster::new();
        let a = roster.insert(make_agent("Ana", 0, 0)).unwrap();
        let b = roster.insert(make_agent("Ben", 1, 0)).unwrap();
        let c = roster.insert(make_agent("Cal", 2, 0)).unwrap();
        assert_eq!(roster.remove(b).map(|x| x.name), Some("Ben".to_owned()));
        assert_eq!(roster.ids(), vec![a, c]);
        assert_eq!(roster.get(c).map(|x| x.name.as_str()), Some("Cal"));
        assert!(roster.get(b).is_none());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut roster = AgentRoster::new();
        roster.insert(make_agent("Ana", 0, 0)).unwrap();
        assert!(matches!(
            roster.insert(make_agent("ana", 1, 1)),
            Err(AgentError::DuplicateName(_))
        ));
    }

    #[test]
    fn find_by_name_or_id() {
        let mut roster = AgentRoster::new();
        let id = roster.insert(make_agent("Ana", 0, 0)).unwrap();
        assert_eq!(roster.find_by_name(" ANA ").map(|a| a.id), Some(id));
        assert_eq!(roster.find_by_name(&id.to_string()).map(|a| a.id), Some(id));
        assert!(roster.find_by_name("Zed").is_none());
    }

    #[test]
    fn profile_attributes_are_clamped() {
        let profile = AgentProfile {
            attributes: Attributes {
                energy: 150,
                mood: -300,
                sociability: 20,
            },
            ..serde_json::from_value(serde_json::json!({
                "name": "Dee",
                "position": {"x": 1, "y": 1}
            }))
            .unwrap()
        };
        let dee = Agent::from_profile(profile, 10);
        assert_eq!(dee.attributes.energy, 100);
        assert_eq!(dee.attributes.mood, -100);
        assert_eq!(dee.llm_profile, "default");
    }
}
