//! Applying recorded events to residents.
//!
//! An agent is *affected* by an event when it is listed explicitly, when the
//! event is global, or when the event is local and the agent stands within
//! [`ProcessorConfig::local_radius`] of it. Affected agents take the impact
//! and remember the event. Unaffected agents within
//! [`ProcessorConfig::notify_radius`] only note that they saw it happen.

use smalltown_agents::AgentRoster;
use smalltown_types::{
    AgentId, Event, EventScope, Importance, Memory, MemoryKind, Position,
};
use tracing::debug;

/// Distances used when propagating events. Measured in straight-line tiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessorConfig {
    /// Reach of a local event.
    pub local_radius: f64,
    /// Reach of the "heard about it" observation.
    pub notify_radius: f64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            local_radius: 5.0,
            notify_radius: 8.0,
        }
    }
}

/// Who an event reached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Propagation {
    /// Agents that took the impact, in roster order.
    pub affected: Vec<AgentId>,
    /// Agents that only observed it, in roster order.
    pub observers: Vec<AgentId>,
}

/// Applies events to agents.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventProcessor {
    config: ProcessorConfig,
}

impl EventProcessor {
    /// A processor with the given radii.
    pub const fn new(config: ProcessorConfig) -> Self {
        Self { config }
    }

    /// Current radii.
    pub const fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Whether `event` affects the agent `id` standing at `position`.
    pub fn is_affected(&self, event: &Event, id: AgentId, position: Position) -> bool {
        if event.affected.contains(&id) {
            return true;
        }
        match event.scope {
            EventScope::Global => true,
            EventScope::Local => event
                .position
                .is_some_and(|origin| origin.euclidean(position) <= self.config.local_radius),
            EventScope::Individual => false,
        }
    }

    /// Apply `event` to every agent in `roster`.
    ///
    /// Impact is clamped per attribute. Affected agents record an event
    /// memory (high importance for global events, medium otherwise); nearby
    /// unaffected agents record a low-importance observation.
    pub fn process(&self, event: &Event, roster: &mut AgentRoster) -> Propagation {
        let mut outcome = Propagation::default();
        let location = event.position.map(|p| p.to_string());
        let kind = event.kind.label();

        for agent in roster.iter_mut() {
            if self.is_affected(event, agent.id, agent.position) {
                agent.attributes.apply(&event.impact);
                let importance = if event.scope == EventScope::Global {
                    Importance::High
                } else {
                    Importance::Medium
                };
                let mut memory = Memory::new(
                    MemoryKind::Event,
                    event.start,
                    event.description.clone(),
                    importance,
                )
                .with_related(event.affected.iter().copied())
                .with_tags([kind]);
                if let Some(location) = &location {
                    memory = memory.with_location(location.clone());
                }
                agent.remember(memory);
                outcome.affected.push(agent.id);
            } else if let Some(origin) = event.position
                && origin.euclidean(agent.position) <= self.config.notify_radius
            {
                let memory = Memory::new(
                    MemoryKind::Observation,
                    event.start,
                    format!("Observed: {}", event.description),
                    Importance::Low,
                )
                .with_related(event.affected.iter().copied())
                .with_location(origin.to_string())
                .with_tags(["observation", kind]);
                agent.remember(memory);
                outcome.observers.push(agent.id);
            }
        }

        debug!(
            event_id = %event.id,
            affected = outcome.affected.len(),
            observers = outcome.observers.len(),
            "event propagated"
        );
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use smalltown_types::{
        EventDetail, EventId, EventKind, EventMetadata, ImpactDelta, SimTime,
    };

    use super::*;
    use crate::testing::make_agent;

    fn event(scope: EventScope, position: Option<Position>, affected: Vec<AgentId>) -> Event {
        Event {
            id: EventId::new(),
            kind: EventKind::Town,
            scope,
            description: "A fair opens".to_owned(),
            position,
            affected,
            start: SimTime::from_hours(9),
            duration_ms: 60_000,
            impact: ImpactDelta {
                mood: 10,
                energy: -200,
                sociability: 5,
            },
            metadata: EventMetadata::typed(EventDetail::Town { new_day: None }),
        }
    }

    fn town(agents: &[(&str, i32, i32)]) -> (AgentRoster, Vec<AgentId>) {
        let mut roster = AgentRoster::new();
        let ids = agents
            .iter()
            .map(|(name, x, y)| roster.insert(make_agent(name, *x, *y)).unwrap())
            .collect();
        (roster, ids)
    }

    #[test]
    fn local_scope_uses_radius() {
        let (mut roster, ids) = town(&[("Near", 5, 5), ("Far", 20, 20)]);
        let fair = event(EventScope::Local, Some(Position::new(5, 5)), Vec::new());
        let outcome = EventProcessor::default().process(&fair, &mut roster);
        assert_eq!(outcome.affected, vec![ids[0]]);
        assert!(outcome.observers.is_empty());
        assert_eq!(roster.get(ids[0]).unwrap().attributes.mood, 60);
        assert_eq!(roster.get(ids[1]).unwrap().attributes.mood, 50);
    }

    #[test]
    fn global_scope_reaches_everyone_with_high_importance() {
        let (mut roster, ids) = town(&[("Ana", 0, 0), ("Ben", 50, 50)]);
        let fair = event(EventScope::Global, None, Vec::new());
        let outcome = EventProcessor::default().process(&fair, &mut roster);
        assert_eq!(outcome.affected, ids);
        for id in &ids {
            let agent = roster.get(*id).unwrap();
            let memory = agent.memory.entries().last().unwrap();
            assert_eq!(memory.kind, MemoryKind::Event);
            assert_eq!(memory.importance, Importance::High);
            assert_eq!(memory.tags, vec!["town"]);
            assert_eq!(agent.attributes.energy, 0);
        }
    }

    #[test]
    fn individual_scope_only_touches_listed_agents() {
        let (mut roster, ids) = town(&[("Ana", 0, 0), ("Ben", 0, 1)]);
        let nap = event(EventScope::Individual, None, vec![ids[1]]);
        let outcome = EventProcessor::default().process(&nap, &mut roster);
        assert_eq!(outcome.affected, vec![ids[1]]);
        assert!(roster.get(ids[0]).unwrap().memory.is_empty());
        let memory = roster.get(ids[1]).unwrap().memory.entries().last().unwrap();
        assert_eq!(memory.importance, Importance::Medium);
    }

    #[test]
    fn bystanders_in_notification_range_observe() {
        let (mut roster, ids) = town(&[("Host", 0, 0), ("Nearby", 6, 0), ("Remote", 9, 0)]);
        let party = event(EventScope::Individual, Some(Position::new(0, 0)), vec![ids[0]]);
        let outcome = EventProcessor::default().process(&party, &mut roster);
        assert_eq!(outcome.affected, vec![ids[0]]);
        assert_eq!(outcome.observers, vec![ids[1]]);

        let seen = roster.get(ids[1]).unwrap().memory.entries().last().unwrap();
        assert_eq!(seen.kind, MemoryKind::Observation);
        assert_eq!(seen.importance, Importance::Low);
        assert_eq!(seen.content, "Observed: A fair opens");
        assert_eq!(seen.tags, vec!["observation", "town"]);
        assert_eq!(seen.location.as_deref(), Some("(0, 0)"));
        assert_eq!(roster.get(ids[1]).unwrap().attributes.mood, 50);
        assert!(roster.get(ids[2]).unwrap().memory.is_empty());
    }

    #[test]
    fn listed_agent_is_affected_regardless_of_distance() {
        let processor = EventProcessor::default();
        let far = AgentId::new();
        let ev = event(EventScope::Local, Some(Position::new(0, 0)), vec![far]);
        assert!(processor.is_affected(&ev, far, Position::new(40, 40)));
        assert!(!processor.is_affected(&ev, AgentId::new(), Position::new(40, 40)));
    }
}
