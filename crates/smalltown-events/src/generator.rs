//! Synthetic event generation.
//!
//! The generator rate-limits itself with a minimum interval between events
//! and a ceiling on concurrently active events. When both allow, it draws a
//! category from a weighted cumulative distribution and fills in one of a
//! few category templates with randomized impact:
//!
//! | Category      | Weight | Scope      | Duration | Impact                              |
//! |---------------|--------|------------|----------|-------------------------------------|
//! | Social        | 0.4    | local      | 5 min    | mood 0..20, sociability 0..15       |
//! | Environmental | 0.2    | global     | 15 min   | mood 0..10                          |
//! | Personal      | 0.3    | individual | 3 min    | mood -5..10, energy -10..0          |
//! | Town          | 0.1    | global     | 30 min   | mood 0..25, sociability 0..20       |

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use smalltown_agents::{Agent, AgentRoster};
use smalltown_types::{
    Event, EventDetail, EventId, EventKind, EventMetadata, EventScope, ImpactDelta, MS_PER_SECOND,
    SimTime,
};
use tracing::debug;

const MINUTE_MS: u64 = 60 * MS_PER_SECOND;
const SOCIAL_DURATION_MS: u64 = 5 * MINUTE_MS;
const ENVIRONMENTAL_DURATION_MS: u64 = 15 * MINUTE_MS;
const PERSONAL_DURATION_MS: u64 = 3 * MINUTE_MS;
const TOWN_DURATION_MS: u64 = 30 * MINUTE_MS;
const DAY_START_DURATION_MS: u64 = 5 * MINUTE_MS;
const DEFAULT_MIN_INTERVAL_MS: u64 = 5 * MS_PER_SECOND;

/// Relative weights for each event category.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CategoryWeights {
    /// Social events.
    pub social: f64,
    /// Environmental events.
    pub environmental: f64,
    /// Personal events.
    pub personal: f64,
    /// Town events.
    pub town: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            social: 0.4,
            environmental: 0.2,
            personal: 0.3,
            town: 0.1,
        }
    }
}

impl CategoryWeights {
    fn entries(&self) -> [(EventKind, f64); 4] {
        [
            (EventKind::Social, self.social),
            (EventKind::Environmental, self.environmental),
            (EventKind::Personal, self.personal),
            (EventKind::Town, self.town),
        ]
    }

    /// Sum of the non-negative weights.
    pub fn total(&self) -> f64 {
        self.entries().iter().map(|(_, w)| w.max(0.0)).sum()
    }

    /// True if every weight is finite and non-negative and the total is
    /// positive.
    pub fn is_valid(&self) -> bool {
        self.entries()
            .iter()
            .all(|(_, w)| w.is_finite() && *w >= 0.0)
            && self.total() > 0.0
    }

    /// Pick the category whose cumulative band contains `roll`, where `roll`
    /// lies in `[0, total)`.
    pub fn select(&self, roll: f64) -> Option<EventKind> {
        let mut cumulative = 0.0;
        for (kind, weight) in self.entries() {
            cumulative += weight.max(0.0);
            if roll < cumulative {
                return Some(kind);
            }
        }
        None
    }
}

/// Rate limits and weights for the generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorConfig {
    /// Minimum simulated time between two generated events.
    pub min_interval_ms: u64,
    /// No event is generated while this many are active.
    pub max_active: usize,
    /// Category distribution.
    pub weights: CategoryWeights,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            max_active: 10,
            weights: CategoryWeights::default(),
        }
    }
}

/// Produces template events at a bounded rate.
#[derive(Debug, Clone)]
pub struct EventGenerator {
    config: GeneratorConfig,
    last_event: SimTime,
}

impl EventGenerator {
    /// A generator whose interval clock starts at `now`.
    pub const fn new(config: GeneratorConfig, now: SimTime) -> Self {
        Self {
            config,
            last_event: now,
        }
    }

    /// Current configuration.
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// When the last event was generated (or the generator was reset).
    pub const fn last_event(&self) -> SimTime {
        self.last_event
    }

    /// Restart the interval clock at `now`.
    pub const fn reset(&mut self, now: SimTime) {
        self.last_event = now;
    }

    /// Try to produce an event.
    ///
    /// Returns `None` when the minimum interval has not elapsed, when
    /// `active` is at the ceiling, when there are no agents, or when a social
    /// event is drawn with fewer than two agents.
    pub fn try_generate<R: Rng + ?Sized>(
        &mut self,
        agents: &AgentRoster,
        active: usize,
        now: SimTime,
        rng: &mut R,
    ) -> Option<Event> {
        if now.millis_since(self.last_event) < self.config.min_interval_ms
            || active >= self.config.max_active
        {
            return None;
        }
        let residents: Vec<&Agent> = agents.iter().collect();
        if residents.is_empty() {
            return None;
        }
        let total = self.config.weights.total();
        if total <= 0.0 {
            return None;
        }
        let kind = self.config.weights.select(rng.random_range(0.0..total))?;
        let anchor = residents.choose(rng)?;

        let event = match kind {
            EventKind::Social => social_event(&residents, now, rng),
            EventKind::Environmental => Some(environmental_event(anchor, now, rng)),
            EventKind::Personal => Some(personal_event(anchor, now, rng)),
            EventKind::Town => Some(town_event(anchor, now, rng)),
        }?;

        debug!(kind = event.kind.label(), description = %event.description, "generated event");
        self.last_event = now;
        Some(event)
    }
}

fn template<'a, R: Rng + ?Sized>(options: &[&'a str], rng: &mut R) -> &'a str {
    options.choose(rng).copied().unwrap_or_default()
}

fn social_event<R: Rng + ?Sized>(
    residents: &[&Agent],
    now: SimTime,
    rng: &mut R,
) -> Option<Event> {
    if residents.len() < 2 {
        return None;
    }
    let mut pair = residents.choose_multiple(rng, 2);
    let first = *pair.next()?;
    let second = *pair.next()?;
    let description = match rng.random_range(0..3) {
        0 => format!("{} and {} strike up a pleasant conversation.", first.name, second.name),
        1 => format!("{} is telling {} a funny story.", first.name, second.name),
        _ => format!("{} invites {} for a walk.", first.name, second.name),
    };
    Some(Event {
        id: EventId::new(),
        kind: EventKind::Social,
        scope: EventScope::Local,
        description,
        position: Some(first.position),
        affected: vec![first.id, second.id],
        start: now,
        duration_ms: SOCIAL_DURATION_MS,
        impact: ImpactDelta {
            mood: rng.random_range(0..20),
            energy: 0,
            sociability: rng.random_range(0..15),
        },
        metadata: EventMetadata::typed(EventDetail::Social {
            initiator: first.id,
            partner: second.id,
        }),
    })
}

fn environmental_event<R: Rng + ?Sized>(anchor: &Agent, now: SimTime, rng: &mut R) -> Event {
    let description = template(
        &[
            "The sky suddenly clears up.",
            "A fresh breeze blows through town.",
            "Birdsong drifts in from the distance.",
        ],
        rng,
    );
    Event {
        id: EventId::new(),
        kind: EventKind::Environmental,
        scope: EventScope::Global,
        description: description.to_owned(),
        position: Some(anchor.position),
        affected: Vec::new(),
        start: now,
        duration_ms: ENVIRONMENTAL_DURATION_MS,
        impact: ImpactDelta {
            mood: rng.random_range(0..10),
            ..ImpactDelta::default()
        },
        metadata: EventMetadata::typed(EventDetail::Environmental),
    }
}

fn personal_event<R: Rng + ?Sized>(subject: &Agent, now: SimTime, rng: &mut R) -> Event {
    let description = match rng.random_range(0..3) {
        0 => format!("{} is thinking over the plans for today.", subject.name),
        1 => format!("{} feels a little tired and needs a rest.", subject.name),
        _ => format!("{} remembers something happy.", subject.name),
    };
    Event {
        id: EventId::new(),
        kind: EventKind::Personal,
        scope: EventScope::Individual,
        description,
        position: Some(subject.position),
        affected: vec![subject.id],
        start: now,
        duration_ms: PERSONAL_DURATION_MS,
        impact: ImpactDelta {
            mood: rng.random_range(-5..10),
            energy: rng.random_range(-10..=0),
            sociability: 0,
        },
        metadata: EventMetadata::typed(EventDetail::Personal {
            subject: subject.id,
        }),
    }
}

fn town_event<R: Rng + ?Sized>(anchor: &Agent, now: SimTime, rng: &mut R) -> Event {
    let description = template(
        &[
            "A small market opens on the town square.",
            "Residents are discussing the latest news.",
            "The library hosts a book-sharing evening.",
        ],
        rng,
    );
    Event {
        id: EventId::new(),
        kind: EventKind::Town,
        scope: EventScope::Global,
        description: description.to_owned(),
        position: Some(anchor.position),
        affected: Vec::new(),
        start: now,
        duration_ms: TOWN_DURATION_MS,
        impact: ImpactDelta {
            mood: rng.random_range(0..25),
            energy: 0,
            sociability: rng.random_range(0..20),
        },
        metadata: EventMetadata::typed(EventDetail::Town { new_day: None }),
    }
}

/// The global announcement recorded when day `day` begins.
///
/// Every resident is listed as affected and gets a small mood lift.
pub fn day_start_event(day: u64, agents: &AgentRoster, now: SimTime) -> Event {
    Event {
        id: EventId::new(),
        kind: EventKind::Town,
        scope: EventScope::Global,
        description: format!("A new day begins. It is day {day}."),
        position: None,
        affected: agents.ids(),
        start: now,
        duration_ms: DAY_START_DURATION_MS,
        impact: ImpactDelta {
            mood: 5,
            ..ImpactDelta::default()
        },
        metadata: EventMetadata::typed(EventDetail::Town { new_day: Some(day) }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::testing::roster;

    #[test]
    fn cumulative_selection_uses_bands() {
        let weights = CategoryWeights::default();
        assert_eq!(weights.select(0.0), Some(EventKind::Social));
        assert_eq!(weights.select(0.39), Some(EventKind::Social));
        assert_eq!(weights.select(0.45), Some(EventKind::Environmental));
        assert_eq!(weights.select(0.75), Some(EventKind::Personal));
        assert_eq!(weights.select(0.95), Some(EventKind::Town));
        assert_eq!(weights.select(1.5), None);
    }

    #[test]
    fn zero_weights_are_invalid() {
        let weights = CategoryWeights {
            social: 0.0,
            environmental: 0.0,
            personal: 0.0,
            town: 0.0,
        };
        assert!(!weights.is_valid());
        assert!(CategoryWeights::default().is_valid());
    }

    #[test]
    fn respects_minimum_interval() {
        let agents = roster(&["Ana", "Ben"]);
        let mut rng = SmallRng::seed_from_u64(1);
        let mut generator = EventGenerator::new(GeneratorConfig::default(), SimTime::ZERO);
        assert!(
            generator
                .try_generate(&agents, 0, SimTime(4_999), &mut rng)
                .is_none()
        );
        assert!(
            generator
                .try_generate(&agents, 0, SimTime(5_000), &mut rng)
                .is_some()
        );
        assert_eq!(generator.last_event(), SimTime(5_000));
        assert!(
            generator
                .try_generate(&agents, 0, SimTime(6_000), &mut rng)
                .is_none()
        );
    }

    #[test]
    fn respects_active_ceiling_and_empty_roster() {
        let agents = roster(&["Ana", "Ben"]);
        let mut rng = SmallRng::seed_from_u64(2);
        let mut generator = EventGenerator::new(GeneratorConfig::default(), SimTime::ZERO);
        let later = SimTime::from_secs(60);
        assert!(generator.try_generate(&agents, 10, later, &mut rng).is_none());
        assert!(
            generator
                .try_generate(&AgentRoster::new(), 0, later, &mut rng)
                .is_none()
        );
    }

    #[test]
    fn social_events_pick_two_distinct_agents() {
        let agents = roster(&["Ana", "Ben", "Cy"]);
        let config = GeneratorConfig {
            min_interval_ms: 0,
            weights: CategoryWeights {
                social: 1.0,
                environmental: 0.0,
                personal: 0.0,
                town: 0.0,
            },
            ..GeneratorConfig::default()
        };
        let mut generator = EventGenerator::new(config, SimTime::ZERO);
        let mut rng = SmallRng::seed_from_u64(3);
        for step in 0..20 {
            let event = generator
                .try_generate(&agents, 0, SimTime(step), &mut rng)
                .unwrap();
            assert_eq!(event.kind, EventKind::Social);
            assert_eq!(event.scope, EventScope::Local);
            assert_eq!(event.affected.len(), 2);
            assert_ne!(event.affected[0], event.affected[1]);
            assert!((0..20).contains(&event.impact.mood));
            assert!((0..15).contains(&event.impact.sociability));
        }
    }

    #[test]
    fn social_draw_with_one_agent_yields_nothing() {
        let agents = roster(&["Solo"]);
        let config = GeneratorConfig {
            min_interval_ms: 0,
            weights: CategoryWeights {
                social: 1.0,
                environmental: 0.0,
                personal: 0.0,
                town: 0.0,
            },
            ..GeneratorConfig::default()
        };
        let mut generator = EventGenerator::new(config, SimTime::ZERO);
        let mut rng = SmallRng::seed_from_u64(4);
        assert!(
            generator
                .try_generate(&agents, 0, SimTime(1), &mut rng)
                .is_none()
        );
        assert_eq!(generator.last_event(), SimTime::ZERO);
    }

    #[test]
    fn personal_impacts_stay_in_range() {
        let agents = roster(&["Ana"]);
        let config = GeneratorConfig {
            min_interval_ms: 0,
            weights: CategoryWeights {
                social: 0.0,
                environmental: 0.0,
                personal: 1.0,
                town: 0.0,
            },
            ..GeneratorConfig::default()
        };
        let mut generator = EventGenerator::new(config, SimTime::ZERO);
        let mut rng = SmallRng::seed_from_u64(5);
        for step in 0..50 {
            let event = generator
                .try_generate(&agents, 0, SimTime(step), &mut rng)
                .unwrap();
            assert_eq!(event.scope, EventScope::Individual);
            assert!((-5..10).contains(&event.impact.mood));
            assert!((-10..=0).contains(&event.impact.energy));
        }
    }

    #[test]
    fn day_start_lists_every_resident() {
        let agents = roster(&["Ana", "Ben"]);
        let event = day_start_event(2, &agents, SimTime::from_hours(24));
        assert_eq!(event.scope, EventScope::Global);
        assert_eq!(event.kind, EventKind::Town);
        assert_eq!(event.affected, agents.ids());
        assert_eq!(
            event.metadata.detail,
            EventDetail::Town { new_day: Some(2) }
        );
    }
}
