//! The append-only record of everything that has happened in town.

use smalltown_types::{AgentId, Event, EventId, EventKind, SimTime};

/// Recorded events in the order they were recorded.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// An empty log.
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Append an event and return its id.
    pub fn record(&mut self, event: Event) -> EventId {
        let id = event.id;
        self.events.push(event);
        id
    }

    /// Look up an event by id.
    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    /// All events, oldest first.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// The most recent event, if any.
    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }

    /// Descriptions of the last `n` events, oldest first.
    pub fn recent_descriptions(&self, n: usize) -> Vec<String> {
        let skip = self.events.len().saturating_sub(n);
        self.events
            .iter()
            .skip(skip)
            .map(|e| e.description.clone())
            .collect()
    }

    /// Events whose `[start, start + duration)` window contains `now`.
    pub fn active(&self, now: SimTime) -> Vec<&Event> {
        self.events.iter().filter(|e| e.is_active(now)).collect()
    }

    /// Events of one category.
    pub fn by_kind(&self, kind: EventKind) -> Vec<&Event> {
        self.events.iter().filter(|e| e.kind == kind).collect()
    }

    /// Events that list `agent` as affected, by start time. Events that
    /// reached the agent only through their radius are not included.
    pub fn for_agent(&self, agent: AgentId) -> Vec<&Event> {
        let mut events: Vec<&Event> = self
            .events
            .iter()
            .filter(|e| e.affected.contains(&agent))
            .collect();
        events.sort_by_key(|e| e.start);
        events
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use smalltown_types::{EventDetail, EventMetadata, EventScope, ImpactDelta};

    use super::*;

    fn event(kind: EventKind, description: &str, start: u64, duration_ms: u64) -> Event {
        Event {
            id: EventId::new(),
            kind,
            scope: EventScope::Global,
            description: description.to_owned(),
            position: None,
            affected: Vec::new(),
            start: SimTime(start),
            duration_ms,
            impact: ImpactDelta::default(),
            metadata: EventMetadata::typed(EventDetail::Environmental),
        }
    }

    #[test]
    fn recent_descriptions_keep_order() {
        let mut log = EventLog::new();
        for (i, name) in ["a", "b", "c", "d"].iter().enumerate() {
            log.record(event(EventKind::Town, name, i as u64, 10));
        }
        assert_eq!(log.recent_descriptions(2), vec!["c", "d"]);
        assert_eq!(log.recent_descriptions(10).len(), 4);
    }

    #[test]
    fn active_respects_duration_window() {
        let mut log = EventLog::new();
        log.record(event(EventKind::Social, "short", 0, 100));
        log.record(event(EventKind::Town, "long", 0, 1_000));
        let active: Vec<_> = log
            .active(SimTime(500))
            .iter()
            .map(|e| e.description.as_str())
            .collect();
        assert_eq!(active, vec!["long"]);
    }

    #[test]
    fn for_agent_lists_only_their_events_by_start() {
        let ana = AgentId::new();
        let ben = AgentId::new();
        let mut log = EventLog::new();
        let mut late = event(EventKind::Social, "picnic", 5_000, 100);
        late.affected = vec![ana, ben];
        let mut early = event(EventKind::Personal, "headache", 1_000, 100);
        early.affected = vec![ana];
        let mut other = event(EventKind::Personal, "lost keys", 2_000, 100);
        other.affected = vec![ben];
        log.record(late);
        log.record(early);
        log.record(other);
        log.record(event(EventKind::Town, "bells", 3_000, 100));

        let ana_events: Vec<_> = log
            .for_agent(ana)
            .iter()
            .map(|e| e.description.as_str())
            .collect();
        assert_eq!(ana_events, vec!["headache", "picnic"]);
        assert_eq!(log.for_agent(ben).len(), 2);
        assert!(log.for_agent(AgentId::new()).is_empty());
    }

    #[test]
    fn record_returns_id_and_filters_by_kind() {
        let mut log = EventLog::new();
        let id = log.record(event(EventKind::Personal, "nap", 0, 10));
        log.record(event(EventKind::Town, "fair", 0, 10));
        assert_eq!(log.get(id).unwrap().description, "nap");
        assert_eq!(log.by_kind(EventKind::Town).len(), 1);
        log.clear();
        assert!(log.is_empty());
    }
}
