//! Perception assembly for decision prompts.
//!
//! Before an agent decides, the pipeline gathers what it can see: the tile
//! it stands on, residents within [`PerceptionSettings::nearby_radius`]
//! tiles (square reach) together with how it feels about each of them, its
//! most important memories, the latest town events, and the time of day.
//! [`Environment::describe`] turns that into the text the decision template
//! embeds.

use minijinja::context;
use smalltown_agents::{Agent, AgentError, AgentRoster, Persona, PromptEngine, PromptKind};
use smalltown_events::EventLog;
use smalltown_types::{Importance, Position, Relationship, SimTime, Terrain, TimeOfDay};
use smalltown_world::Grid;

/// Limits on what goes into a decision prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerceptionSettings {
    /// Square reach for listing nearby residents.
    pub nearby_radius: u32,
    /// Memories shown, most important first.
    pub memory_count: usize,
    /// Latest event descriptions shown.
    pub recent_events: usize,
}

impl Default for PerceptionSettings {
    fn default() -> Self {
        Self {
            nearby_radius: 3,
            memory_count: 3,
            recent_events: 5,
        }
    }
}

/// A resident the perceiving agent can see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NearbyAgent {
    /// Display name.
    pub name: String,
    /// The perceiver's record of this resident, if they have met.
    pub relationship: Option<Relationship>,
    /// What the resident is doing.
    pub current_action: String,
}

/// Everything one agent perceives at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Where the agent stands.
    pub position: Position,
    /// Terrain under the agent.
    pub terrain: Terrain,
    /// Visible residents in roster order.
    pub nearby: Vec<NearbyAgent>,
    /// Memories as `(importance, content)`, most important first.
    pub memories: Vec<(Importance, String)>,
    /// Latest event descriptions, oldest first.
    pub recent_events: Vec<String>,
    /// Band of the day.
    pub time_of_day: TimeOfDay,
    /// Clock reading, `HH:MM`.
    pub clock: String,
}

/// Gather what `agent` perceives.
pub fn perceive(
    grid: &Grid,
    roster: &AgentRoster,
    events: &EventLog,
    agent: &Agent,
    now: SimTime,
    settings: PerceptionSettings,
) -> Environment {
    let nearby = roster
        .iter()
        .filter(|other| {
            other.id != agent.id && other.position.chebyshev(agent.position) <= settings.nearby_radius
        })
        .map(|other| NearbyAgent {
            name: other.name.clone(),
            relationship: agent.relationship_with(other.id).copied(),
            current_action: other.current_action.clone(),
        })
        .collect();

    let memories = agent
        .memory
        .most_important(settings.memory_count)
        .into_iter()
        .map(|m| (m.importance, m.content.clone()))
        .collect();

    Environment {
        position: agent.position,
        terrain: grid.terrain_at(agent.position).unwrap_or_default(),
        nearby,
        memories,
        recent_events: events.recent_descriptions(settings.recent_events),
        time_of_day: now.time_of_day(),
        clock: now.formatted(),
    }
}

impl Environment {
    /// Render as prompt text.
    pub fn describe(&self) -> String {
        let mut out = String::from("Current surroundings:\n");
        out.push_str(&format!(
            "Location: you are on a {} tile at {}.\n",
            self.terrain.label(),
            self.position
        ));

        if !self.nearby.is_empty() {
            out.push_str("\nNearby residents:\n");
            for other in &self.nearby {
                let relation = other.relationship.map_or_else(
                    || "first meeting".to_owned(),
                    |r| format!("affinity {}, {} interactions", r.affinity, r.interactions),
                );
                let doing = if other.current_action.is_empty() {
                    "standing here"
                } else {
                    other.current_action.as_str()
                };
                out.push_str(&format!("- {} ({relation}) is {doing}\n", other.name));
            }
        }

        if !self.memories.is_empty() {
            out.push_str("\nThings you remember:\n");
            for (importance, content) in &self.memories {
                out.push_str(&format!("- [{}] {content}\n", importance.label()));
            }
        }

        if !self.recent_events.is_empty() {
            out.push_str("\nRecent events:\n");
            for event in &self.recent_events {
                out.push_str(&format!("- {event}\n"));
            }
        }

        out.push_str(&format!(
            "\nIt is {} ({}).",
            self.time_of_day.label(),
            self.clock
        ));
        out
    }
}

/// Perceive and render in one step.
pub fn compose_environment_prompt(
    grid: &Grid,
    roster: &AgentRoster,
    events: &EventLog,
    agent: &Agent,
    now: SimTime,
    settings: PerceptionSettings,
) -> String {
    perceive(grid, roster, events, agent, now, settings).describe()
}

/// Wrap an environment description in the decision template.
///
/// # Errors
///
/// Returns [`AgentError::Template`] if the template fails to render.
pub fn compose_decision_prompt(
    prompts: &PromptEngine,
    agent: &Agent,
    environment: &str,
) -> Result<String, AgentError> {
    prompts.render(
        PromptKind::Decision,
        context! {
            agent => Persona::of(agent),
            environment => environment,
        },
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use smalltown_types::{Memory, MemoryKind, Sentiment};

    use super::*;
    use crate::testing::{make_agent, make_event};

    fn scene() -> (Grid, AgentRoster, Vec<smalltown_types::AgentId>) {
        let grid = smalltown_world::town().unwrap();
        let mut roster = AgentRoster::new();
        let ids = vec![
            roster.insert(make_agent("Ming", 5, 5)).unwrap(),
            roster.insert(make_agent("Hong", 7, 7)).unwrap(),
            roster.insert(make_agent("Zhang", 9, 5)).unwrap(),
        ];
        (grid, roster, ids)
    }

    #[test]
    fn nearby_uses_square_reach_and_relationship_summary() {
        let (grid, mut roster, ids) = scene();
        let ming = roster.get_mut(ids[0]).unwrap();
        smalltown_agents::update_relationship(
            &mut ming.relationships,
            ids[1],
            Sentiment::Positive,
            2,
            SimTime::ZERO,
        );
        roster.get_mut(ids[1]).unwrap().current_action = "reading".to_owned();

        let ming = roster.get(ids[0]).unwrap();
        let env = perceive(
            &grid,
            &roster,
            &EventLog::new(),
            ming,
            SimTime::from_hours(9),
            PerceptionSettings::default(),
        );
        assert_eq!(env.nearby.len(), 1);
        assert_eq!(env.nearby[0].name, "Hong");

        let text = env.describe();
        assert!(text.starts_with("Current surroundings:\nLocation: you are on a "));
        assert!(text.contains("\n\nNearby residents:\n- Hong (affinity 10, 1 interactions) is reading\n"));
        assert!(text.ends_with("It is morning (09:00)."));
        assert!(!text.contains("Zhang"));
    }

    #[test]
    fn strangers_are_first_meetings() {
        let (grid, roster, ids) = scene();
        let hong = roster.get(ids[1]).unwrap();
        let text = compose_environment_prompt(
            &grid,
            &roster,
            &EventLog::new(),
            hong,
            SimTime::from_hours(14),
            PerceptionSettings::default(),
        );
        assert!(text.contains("- Ming (first meeting) is standing here"));
        assert!(text.contains("It is afternoon"));
    }

    #[test]
    fn memories_are_top_three_by_importance() {
        let (grid, mut roster, ids) = scene();
        let ming = roster.get_mut(ids[0]).unwrap();
        for (content, importance) in [
            ("walked", Importance::Low),
            ("met Hong", Importance::Medium),
            ("festival", Importance::Critical),
            ("new goal", Importance::High),
        ] {
            ming.remember(Memory::new(MemoryKind::Event, SimTime::ZERO, content, importance));
        }
        let ming = roster.get(ids[0]).unwrap();
        let env = perceive(
            &grid,
            &roster,
            &EventLog::new(),
            ming,
            SimTime::ZERO,
            PerceptionSettings::default(),
        );
        let contents: Vec<&str> = env.memories.iter().map(|(_, c)| c.as_str()).collect();
        assert_eq!(contents, vec!["festival", "new goal", "met Hong"]);
        assert!(env.describe().contains("- [CRITICAL] festival"));
    }

    #[test]
    fn recent_events_are_the_last_five() {
        let (grid, roster, ids) = scene();
        let mut log = EventLog::new();
        for i in 0..7 {
            log.record(make_event(&format!("event {i}")));
        }
        let env = perceive(
            &grid,
            &roster,
            &log,
            roster.get(ids[0]).unwrap(),
            SimTime::ZERO,
            PerceptionSettings::default(),
        );
        assert_eq!(env.recent_events.first().map(String::as_str), Some("event 2"));
        assert_eq!(env.recent_events.len(), 5);
    }

    #[test]
    fn terrain_and_decision_template() {
        let (grid, roster, ids) = scene();
        let ming = roster.get(ids[0]).unwrap();
        let env = perceive(
            &grid,
            &roster,
            &EventLog::new(),
            ming,
            SimTime::ZERO,
            PerceptionSettings::default(),
        );
        assert_eq!(Some(env.terrain), grid.terrain_at(ming.position));

        let prompts = PromptEngine::builtin().unwrap();
        let prompt = compose_decision_prompt(&prompts, ming, &env.describe()).unwrap();
        assert!(prompt.contains("You are Ming."));
        assert!(prompt.contains("ACTION: [MOVE|INTERACT|SPEAK|PURSUE_GOAL|WANDER|IDLE]"));
        assert!(prompt.contains("Current surroundings:"));
    }
}
