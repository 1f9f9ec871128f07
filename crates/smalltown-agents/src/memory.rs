//! Per-agent memory: a bounded, append-only log ranked by importance and
//! recency.
//!
//! ## Retention
//!
//! The log holds at most `capacity` entries (default 1000). When a new entry
//! pushes it over, the lowest-ranked entry is dropped, where rank orders by
//! importance first and timestamp second. Survivors keep their original
//! order, so the log always reads oldest to newest.
//!
//! ## Relevance
//!
//! [`MemoryStore::query`] scores each match in `[0, 1]`:
//!
//! ```text
//! 0.3 * exp(-age / 24h) + 0.3 * importance / 4 + 0.2 * tag_overlap + 0.2 * emotion_match
//! ```
//!
//! `tag_overlap` is the fraction of query tags present on the memory.


use smalltown_types::{AgentId, Importance, MS_PER_DAY, Memory, MemoryId, MemoryKind, SimTime};

/// Default number of memories retained per agent.
pub const DEFAULT_CAPACITY: usize = 1000;

const RECENCY_WEIGHT: f64 = 0.3;
const IMPORTANCE_WEIGHT: f64 = 0.3;
const TAG_WEIGHT: f64 = 0.2;
const EMOTION_WEIGHT: f64 = 0.2;

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Filters for [`MemoryStore::query`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryQuery {
    /// Only this kind.
    pub kind: Option<MemoryKind>,
    /// At least this important.
    pub min_importance: Option<Importance>,
    /// Involving any of these agents.
    pub related_agents: Vec<AgentId>,
    /// Formed within this inclusive range.
    pub time_range: Option<(SimTime, SimTime)>,
    /// At exactly this location label.
    pub location: Option<String>,
    /// With exactly this emotion.
    pub emotion: Option<String>,
    /// Carrying any of these tags.
    pub tags: Vec<String>,
    /// Keep only the top `limit` results.
    pub limit: Option<usize>,
}

impl MemoryQuery {
    /// A query that matches everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to one kind.
    #[must_use]
    pub const fn kind(mut self, kind: MemoryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restrict to a minimum importance.
    #[must_use]
    pub const fn min_importance(mut self, importance: Importance) -> Self {
        self.min_importance = Some(importance);
        self
    }

    /// Restrict to memories involving `agent`.
    #[must_use]
    pub fn related_to(mut self, agent: AgentId) -> Self {
        self.related_agents.push(agent);
        self
    }

    /// Restrict to an inclusive time range.
    #[must_use]
    pub const fn between(mut self, start: SimTime, end: SimTime) -> Self {
        self.time_range = Some((start, end));
        self
    }

    /// Restrict to a location label.
    #[must_use]
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Restrict to an emotion label.
    #[must_use]
    pub fn feeling(mut self, emotion: impl Into<String>) -> Self {
        self.emotion = Some(emotion.into());
        self
    }

    /// Restrict to memories carrying any of `tags`.
    #[must_use]
    pub fn tagged<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Truncate results.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, memory: &Memory) -> bool {
        if self.kind.is_some_and(|k| k != memory.kind) {
            return false;
        }
        if self.min_importance.is_some_and(|min| memory.importance < min) {
            return false;
        }
        if self.location.as_ref().is_some_and(|l| memory.location.as_ref() != Some(l)) {
            return false;
        }
        if self.emotion.as_ref().is_some_and(|e| memory.emotion.as_ref() != Some(e)) {
            return false;
        }
        if !self.related_agents.is_empty()
            && !memory
                .related_agents
                .iter()
                .any(|id| self.related_agents.contains(id))
        {
            return false;
        }
        if let Some((start, end)) = self.time_range
            && (memory.timestamp < start || memory.timestamp > end)
        {
            return false;
        }
        if !self.tags.is_empty() && !memory.tags.iter().any(|t| self.tags.contains(t)) {
            return false;
        }
        true
    }

    #[allow(clippy::cast_precision_loss)]
    fn relevance(&self, memory: &Memory, now: SimTime) -> f64 {
        let age_days = now.millis_since(memory.timestamp) as f64 / MS_PER_DAY as f64;
        let mut score = RECENCY_WEIGHT * (-age_days).exp();
        score += IMPORTANCE_WEIGHT * memory.importance.weight();
        if !self.tags.is_empty() {
            let shared = self.tags.iter().filter(|t| memory.tags.contains(t)).count();
            score += TAG_WEIGHT * (shared as f64 / self.tags.len() as f64);
        }
        if self.emotion.is_some() && self.emotion == memory.emotion {
            score += EMOTION_WEIGHT;
        }
        score.min(1.0)
    }
}

/// A query match with its relevance.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMemory<'a> {
    /// The memory.
    pub memory: &'a Memory,
    /// Relevance in `[0, 1]`.
    pub relevance: f64,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Bounded memory log owned by one agent.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    entries: Vec<Memory>,
    capacity: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MemoryStore {
    /// An empty store holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Maximum number of retained entries.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[Memory] {
        &self.entries
    }

    /// Append a memory, evicting the lowest-ranked entry if over capacity.
    pub fn record(&mut self, memory: Memory) -> MemoryId {
        let id = memory.id;
        self.entries.push(memory);
        while self.entries.len() > self.capacity {
            let weakest = self
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, m)| (m.importance, m.timestamp))
                .map(|(i, _)| i);
            match weakest {
                Some(i) => {
                    self.entries.remove(i);
                }
                None => break,
            }
        }
        id
    }

    /// Find a memory by id.
    pub fn get(&self, id: MemoryId) -> Option<&Memory> {
        self.entries.iter().find(|m| m.id == id)
    }

    /// Matches sorted by relevance, highest first.
    pub fn query(&self, query: &MemoryQuery, now: SimTime) -> Vec<ScoredMemory<'_>> {
        let mut results: Vec<ScoredMemory<'_>> = self
            .entries
            .iter()
            .filter(|m| query.matches(m))
            .map(|memory| ScoredMemory {
                memory,
                relevance: query.relevance(memory, now),
            })
            .collect();
        results.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        if let Some(limit) = query.limit {
            results.truncate(limit);
        }
        results
    }

    /// Human-readable digest of the matches in time order.
    pub fn summarize(&self, query: &MemoryQuery, now: SimTime) -> String {
        let mut results = self.query(query, now);
        if results.is_empty() {
            return "No relevant memories.".to_owned();
        }
        results.sort_by_key(|r| r.memory.timestamp);

        let mut digest = String::from("Memory digest:\n");
        for result in results {
            digest.push_str(&format!(
                "[{}] (importance: {}, relevance: {:.2})\n{}\n\n",
                result.memory.timestamp,
                result.memory.importance.label(),
                result.relevance,
                result.memory.content,
            ));
        }
        digest
    }

    /// Change a memory's importance. Unknown ids are ignored.
    pub fn set_importance(&mut self, id: MemoryId, importance: Importance) {
        if let Some(memory) = self.entries.iter_mut().find(|m| m.id == id) {
            memory.importance = importance;
        }
    }

    /// Add tags to a memory, skipping ones it already has. Unknown ids are
    /// ignored.
    pub fn add_tags<S: Into<String>>(&mut self, id: MemoryId, tags: impl IntoIterator<Item = S>) {
        if let Some(memory) = self.entries.iter_mut().find(|m| m.id == id) {
            for tag in tags {
                let tag = tag.into();
                if !memory.tags.contains(&tag) {
                    memory.tags.push(tag);
                }
            }
        }
    }

    /// Memories involving `agent`, newest first.
    pub fn with_agent(&self, agent: AgentId) -> Vec<&Memory> {
        let mut found: Vec<&Memory> = self
            .entries
            .iter()
            .filter(|m| m.related_agents.contains(&agent))
            .collect();
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        found
    }

    /// The `n` newest memories, newest first.
    pub fn recent(&self, n: usize) -> Vec<&Memory> {
        let mut found: Vec<&Memory> = self.entries.iter().collect();
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        found.truncate(n);
        found
    }

    /// The `n` most important memories, newer first among equals.
    pub fn most_important(&self, n: usize) -> Vec<&Memory> {
        let mut found: Vec<&Memory> = self.entries.iter().collect();
        found.sort_by(|a, b| {
            b.importance
                .cmp(&a.importance)
                .then(b.timestamp.cmp(&a.timestamp))
        });
        found.truncate(n);
        found
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use smalltown_types::MS_PER_HOUR;

    use super::*;

    fn memory(at: u64, importance: Importance, content: &str) -> Memory {
        Memory::new(MemoryKind::Observation, SimTime(at), content, importance)
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut store = MemoryStore::new(5);
        for i in 0..50 {
            store.record(memory(i, Importance::Low, "tick"));
            assert!(store.len() <= 5);
        }
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn eviction_keeps_highest_ranked() {
        let mut store = MemoryStore::new(3);
        store.record(memory(1, Importance::Critical, "old but critical"));
        store.record(memory(2, Importance::Low, "old and low"));
        store.record(memory(3, Importance::Low, "newer low"));
        store.record(memory(4, Importance::Medium, "medium"));

        let kept: Vec<&str> = store.entries().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(kept, vec!["old but critical", "newer low", "medium"]);

        // No survivor ranks below anything evicted.
        let evicted_rank = (Importance::Low, SimTime(2));
        for m in store.entries() {
            assert!((m.importance, m.timestamp) > evicted_rank);
        }
    }

    #[test]
    fn filters_combine() {
        let ana = AgentId::new();
        let mut store = MemoryStore::new(10);
        store.record(
            Memory::new(MemoryKind::Interaction, SimTime(10), "chat", Importance::Medium)
                .with_related([ana])
                .with_tags(["dialogue"])
                .with_location("(1, 1)")
                .with_emotion("happy"),
        );
        store.record(memory(20, Importance::High, "saw a bird"));

        let now = SimTime(30);
        assert_eq!(store.query(&MemoryQuery::all(), now).len(), 2);
        assert_eq!(store.query(&MemoryQuery::all().kind(MemoryKind::Interaction), now).len(), 1);
        assert_eq!(store.query(&MemoryQuery::all().min_importance(Importance::High), now).len(), 1);
        assert_eq!(store.query(&MemoryQuery::all().related_to(ana), now).len(), 1);
        assert_eq!(store.query(&MemoryQuery::all().at("(1, 1)"), now).len(), 1);
        assert_eq!(store.query(&MemoryQuery::all().feeling("sad"), now).len(), 0);
        assert_eq!(store.query(&MemoryQuery::all().tagged(["dialogue", "x"]), now).len(), 1);
        assert_eq!(
            store
                .query(&MemoryQuery::all().between(SimTime(10), SimTime(20)), now)
                .len(),
            2
        );
        assert_eq!(
            store
                .query(&MemoryQuery::all().between(SimTime(11), SimTime(19)), now)
                .len(),
            0
        );
    }

    #[test]
    fn relevance_formula() {
        let mut store = MemoryStore::new(10);
        store.record(
            Memory::new(MemoryKind::Event, SimTime(0), "party", Importance::Critical)
                .with_tags(["town"])
                .with_emotion("happy"),
        );
        let query = MemoryQuery::all().tagged(["town", "rain"]).feeling("happy");
        let results = store.query(&query, SimTime(0));
        // 0.3 * 1 + 0.3 * 1 + 0.2 * 0.5 + 0.2 = 0.9
        assert!((results.first().unwrap().relevance - 0.9).abs() < 1e-9);

        let later = store.query(&MemoryQuery::all(), SimTime(MS_PER_DAY));
        // 0.3 * e^-1 + 0.3
        let expected = 0.3 * (-1.0_f64).exp() + 0.3;
        assert!((later.first().unwrap().relevance - expected).abs() < 1e-9);
    }

    #[test]
    fn results_sorted_and_limited() {
        let mut store = MemoryStore::new(10);
        store.record(memory(0, Importance::Low, "low"));
        store.record(memory(0, Importance::High, "high"));
        store.record(memory(0, Importance::Medium, "medium"));
        let results = store.query(&MemoryQuery::all().limit(2), SimTime(MS_PER_HOUR));
        let contents: Vec<&str> = results.iter().map(|r| r.memory.content.as_str()).collect();
        assert_eq!(contents, vec!["high", "medium"]);
    }

    #[test]
    fn summary_is_time_ordered() {
        let mut store = MemoryStore::new(10);
        store.record(memory(MS_PER_HOUR * 9, Importance::High, "second"));
        store.record(memory(MS_PER_HOUR * 8, Importance::Low, "first"));
        let digest = store.summarize(&MemoryQuery::all(), SimTime(MS_PER_HOUR * 10));
        assert!(digest.starts_with("Memory digest:\n[day 1 08:00] (importance: LOW"));
        let first = digest.find("first").unwrap();
        let second = digest.find("second").unwrap();
        assert!(first < second);
        // One blank line after every entry.
        assert!(digest.contains("\nfirst\n\n[day 1 09:00]"));
        assert!(digest.ends_with("\nsecond\n\n"));
    }

    #[test]
    fn empty_summary_message() {
        let store = MemoryStore::default();
        assert_eq!(
            store.summarize(&MemoryQuery::all(), SimTime::ZERO),
            "No relevant memories."
        );
    }

    #[test]
    fn amendments_by_id() {
        let mut store = MemoryStore::new(10);
        let id = store.record(memory(0, Importance::Low, "x").with_tags(["a"]));
        store.set_importance(id, Importance::Critical);
        store.add_tags(id, ["a", "b"]);
        let m = store.get(id).unwrap();
        assert_eq!(m.importance, Importance::Critical);
        assert_eq!(m.tags, vec!["a".to_owned(), "b".to_owned()]);

        // Unknown ids are a no-op.
        store.set_importance(MemoryId::new(), Importance::Low);
        store.add_tags(MemoryId::new(), ["c"]);
        assert_eq!(store.get(id).unwrap().importance, Importance::Critical);
    }

    #[test]
    fn recent_and_with_agent_are_newest_first() {
        let ana = AgentId::new();
        let mut store = MemoryStore::new(10);
        store.record(memory(1, Importance::Low, "a").with_related([ana]));
        store.record(memory(3, Importance::Low, "b"));
        store.record(memory(2, Importance::Low, "c").with_related([ana]));
        let recent: Vec<&str> = store.recent(2).iter().map(|m| m.content.as_str()).collect();
        assert_eq!(recent, vec!["b", "c"]);
        let with: Vec<&str> = store.with_agent(ana).iter().map(|m| m.content.as_str()).collect();
        assert_eq!(with, vec!["c", "a"]);
    }
}
