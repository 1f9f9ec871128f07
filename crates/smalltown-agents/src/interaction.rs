//! Range checks, relationship bookkeeping, and dialogue resolution.
//!
//! Relationships are one-sided. [`update_relationship`] only touches the
//! acting agent's view of the target; the target's view of the actor is left
//! alone. Every update counts as an interaction, negative ones included.

use smalltown_types::{AgentId, AgentState, Position, Relationship, Sentiment, SimTime, TimeOfDay};
use tracing::{debug, warn};

use crate::agent::AgentRoster;
use crate::grammar;
use crate::prompt::{PromptEngine, PromptKind};
use crate::service::{DecisionService, RetryPolicy, call_with_retry};

/// Default reach for talking and interacting.
pub const INTERACTION_RANGE: u32 = 1;

const AFFINITY_MIN: i32 = -100;
const AFFINITY_MAX: i32 = 100;
const SENTIMENT_STEP: i32 = 5;

const POSITIVE_WORDS: &[&str] = &[
    "like", "love", "happy", "glad", "thank", "good", "great", "wonderful", "help", "nice",
];
const NEGATIVE_WORDS: &[&str] = &[
    "hate", "angry", "sad", "annoy", "bad", "terrible", "awful", "upset",
];

/// True if both coordinate deltas are within `radius` (a square, not a
/// circle).
pub const fn in_range(a: Position, b: Position, radius: u32) -> bool {
    a.chebyshev(b) <= radius
}

/// Adjust the holder's view of `target` within its `relationships` map.
///
/// Positive adds `5 * intensity`, negative subtracts `5 * intensity`, neutral
/// adds `intensity`. Affinity is clamped to `-100..=100` and the interaction
/// count always increases by one.
pub fn update_relationship(
    relationships: &mut std::collections::BTreeMap<AgentId, Relationship>,
    target: AgentId,
    sentiment: Sentiment,
    intensity: i32,
    now: SimTime,
) -> Relationship {
    let record = relationships.entry(target).or_default();
    let delta = match sentiment {
        Sentiment::Positive => SENTIMENT_STEP.saturating_mul(intensity),
        Sentiment::Negative => SENTIMENT_STEP.saturating_mul(intensity).saturating_neg(),
        Sentiment::Neutral => intensity,
    };
    record.affinity = record
        .affinity
        .saturating_add(delta)
        .clamp(AFFINITY_MIN, AFFINITY_MAX);
    record.interactions = record.interactions.saturating_add(1);
    record.last_interaction = Some(now);
    *record
}

/// Classify text by counting positive and negative keywords. Ties are
/// neutral.
pub fn classify_sentiment(text: &str) -> Sentiment {
    let lowered = text.to_lowercase();
    let positive = POSITIVE_WORDS.iter().filter(|w| lowered.contains(*w)).count();
    let negative = NEGATIVE_WORDS.iter().filter(|w| lowered.contains(*w)).count();
    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}

// ---------------------------------------------------------------------------
// Dialogue resolution
// ---------------------------------------------------------------------------

/// Situation passed into dialogue and interaction prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionContext {
    /// Where the exchange happens.
    pub location: String,
    /// When.
    pub time_of_day: TimeOfDay,
    /// Recent town events.
    pub recent_events: Vec<String>,
    /// Earlier lines of this conversation.
    pub previous_lines: Vec<String>,
    /// Simulated time, for relationship bookkeeping.
    pub now: SimTime,
    /// How close the participants must stand, usually [`INTERACTION_RANGE`].
    pub range: u32,
}

/// Result of a dialogue or interaction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionOutcome {
    /// The initiator said `message`.
    Spoke {
        /// The line produced.
        message: String,
        /// How the relationship was classified.
        sentiment: Sentiment,
    },
    /// Nothing happened. `reason` is meant for people.
    Failed {
        /// Explanation.
        reason: String,
    },
}

impl InteractionOutcome {
    fn failed(reason: &str) -> Self {
        Self::Failed {
            reason: reason.to_owned(),
        }
    }

    /// The spoken line or the failure reason.
    pub fn text(&self) -> &str {
        match self {
            Self::Spoke { message, .. } => message,
            Self::Failed { reason } => reason,
        }
    }

    /// True if something was said.
    pub const fn succeeded(&self) -> bool {
        matches!(self, Self::Spoke { .. })
    }
}

/// Which exchange to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExchangeKind {
    Dialogue,
    Interaction,
}

impl ExchangeKind {
    const fn noun(self) -> &'static str {
        match self {
            Self::Dialogue => "Dialogue",
            Self::Interaction => "Interaction",
        }
    }
}

/// Have `initiator` say something to `target`.
///
/// On success the initiator starts talking, its current action becomes the
/// line, and its view of the target gets a neutral update.
#[allow(clippy::too_many_arguments)]
pub async fn resolve_dialogue<S: DecisionService + ?Sized>(
    roster: &mut AgentRoster,
    initiator: AgentId,
    target: AgentId,
    context: &InteractionContext,
    prompts: &PromptEngine,
    service: &S,
    policy: RetryPolicy,
) -> InteractionOutcome {
    resolve(roster, initiator, target, context, prompts, service, policy, ExchangeKind::Dialogue)
        .await
}

/// Have `initiator` interact with `target`.
///
/// Like [`resolve_dialogue`] but the reply must also carry an
/// `ACTION: INTERACT` or `ACTION: SPEAK` token, and the relationship update
/// follows the sentiment of the line.
#[allow(clippy::too_many_arguments)]
pub async fn resolve_interaction<S: DecisionService + ?Sized>(
    roster: &mut AgentRoster,
    initiator: AgentId,
    target: AgentId,
    context: &InteractionContext,
    prompts: &PromptEngine,
    service: &S,
    policy: RetryPolicy,
) -> InteractionOutcome {
    resolve(roster, initiator, target, context, prompts, service, policy, ExchangeKind::Interaction)
        .await
}

#[allow(clippy::too_many_arguments)]
async fn resolve<S: DecisionService + ?Sized>(
    roster: &mut AgentRoster,
    initiator: AgentId,
    target: AgentId,
    context: &InteractionContext,
    prompts: &PromptEngine,
    service: &S,
    policy: RetryPolicy,
    kind: ExchangeKind,
) -> InteractionOutcome {
    let noun = kind.noun();
    let (Some(me), Some(them)) = (roster.get(initiator), roster.get(target)) else {
        return InteractionOutcome::failed(&format!("{noun} failed: participant missing"));
    };
    if initiator == target || !in_range(me.position, them.position, context.range) {
        return InteractionOutcome::failed(&format!("{noun} failed: too far away"));
    }

    let template = match kind {
        ExchangeKind::Dialogue => PromptKind::Dialogue,
        ExchangeKind::Interaction => PromptKind::Interaction,
    };
    let prompt = match prompts.render_exchange(template, me, them, context) {
        Ok(prompt) => prompt,
        Err(e) => {
            warn!(error = %e, "failed to render exchange prompt");
            return InteractionOutcome::failed(&format!("{noun} generation failed"));
        }
    };
    let profile = me.llm_profile.clone();

    let reply = match call_with_retry(service, policy, &profile, &prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(agent_id = %initiator, error = %e, "exchange skipped");
            return InteractionOutcome::failed(&format!("{noun} generation failed"));
        }
    };

    let action_ok = match kind {
        ExchangeKind::Dialogue => true,
        ExchangeKind::Interaction => matches!(
            grammar::action_token(&reply).as_deref(),
            Some("INTERACT" | "SPEAK")
        ),
    };
    let Some(message) = grammar::message(&reply).filter(|_| action_ok) else {
        debug!(agent_id = %initiator, reply, "unparseable exchange reply");
        return InteractionOutcome::failed(&format!("{noun} generation failed"));
    };

    let sentiment = match kind {
        ExchangeKind::Dialogue => Sentiment::Neutral,
        ExchangeKind::Interaction => classify_sentiment(&message),
    };
    let Some(me) = roster.get_mut(initiator) else {
        return InteractionOutcome::failed(&format!("{noun} failed: participant missing"));
    };
    me.state = AgentState::Talking;
    me.current_action.clone_from(&message);
    update_relationship(&mut me.relationships, target, sentiment, 1, context.now);

    InteractionOutcome::Spoke { message, sentiment }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::agent::tests::make_agent;
    use crate::service::ScriptedService;

    fn context() -> InteractionContext {
        InteractionContext {
            location: "road".to_owned(),
            time_of_day: TimeOfDay::Morning,
            recent_events: vec!["A street fair opened".to_owned()],
            previous_lines: Vec::new(),
            now: SimTime(1_000),
            range: INTERACTION_RANGE,
        }
    }

    fn pair(bx: i32, by: i32) -> (AgentRoster, AgentId, AgentId) {
        let mut roster = AgentRoster::new();
        let a = roster.insert(make_agent("Ana", 0, 0)).unwrap();
        let b = roster.insert(make_agent("Ben", bx, by)).unwrap();
        (roster, a, b)
    }

    #[test]
    fn range_is_a_square() {
        let origin = Position::new(5, 5);
        assert!(in_range(origin, Position::new(6, 6), 1));
        assert!(in_range(origin, Position::new(4, 5), 1));
        assert!(!in_range(origin, Position::new(7, 5), 1));
        assert!(in_range(origin, Position::new(7, 7), 2));
    }

    #[test]
    fn three_positive_updates_reach_fifteen() {
        let mut map = BTreeMap::new();
        let target = AgentId::new();
        for _ in 0..3 {
            update_relationship(&mut map, target, Sentiment::Positive, 1, SimTime::ZERO);
        }
        let record = map.get(&target).unwrap();
        assert_eq!(record.affinity, 15);
        assert_eq!(record.interactions, 3);
    }

    #[test]
    fn affinity_stays_bounded() {
        let mut map = BTreeMap::new();
        let target = AgentId::new();
        let mut last_count = 0;
        for i in 0..60 {
            let sentiment = if i < 30 { Sentiment::Positive } else { Sentiment::Negative };
            let record = update_relationship(&mut map, target, sentiment, 2, SimTime(i));
            assert!((-100..=100).contains(&record.affinity));
            assert!(record.interactions > last_count);
            last_count = record.interactions;
        }
        assert_eq!(map.get(&target).unwrap().affinity, -100);
    }

    #[test]
    fn positive_caps_at_one_hundred() {
        let mut map = BTreeMap::new();
        let target = AgentId::new();
        for _ in 0..25 {
            update_relationship(&mut map, target, Sentiment::Positive, 1, SimTime::ZERO);
        }
        assert_eq!(map.get(&target).unwrap().affinity, 100);
        assert_eq!(map.get(&target).unwrap().interactions, 25);
    }

    #[test]
    fn neutral_adds_intensity() {
        let mut map = BTreeMap::new();
        let target = AgentId::new();
        let record = update_relationship(&mut map, target, Sentiment::Neutral, 3, SimTime(9));
        assert_eq!(record.affinity, 3);
        assert_eq!(record.last_interaction, Some(SimTime(9)));
    }

    #[test]
    fn negative_interactions_still_count() {
        let mut map = BTreeMap::new();
        let target = AgentId::new();
        update_relationship(&mut map, target, Sentiment::Negative, 1, SimTime::ZERO);
        let record = map.get(&target).unwrap();
        assert_eq!(record.affinity, -5);
        assert_eq!(record.interactions, 1);
    }

    #[test]
    fn sentiment_majority_wins() {
        assert_eq!(classify_sentiment("Thanks, that was great!"), Sentiment::Positive);
        assert_eq!(classify_sentiment("I hate this terrible rain"), Sentiment::Negative);
        assert_eq!(classify_sentiment("Good grief, how annoying"), Sentiment::Neutral);
        assert_eq!(classify_sentiment("The bus is late"), Sentiment::Neutral);
    }

    #[tokio::test]
    async fn dialogue_updates_initiator_only() {
        let (mut roster, a, b) = pair(1, 1);
        let service = ScriptedService::new().then_reply(r#"MESSAGE: "Morning, Ben!""#);
        let prompts = PromptEngine::builtin().unwrap();
        let outcome = resolve_dialogue(
            &mut roster, a, b, &context(), &prompts, &service, RetryPolicy::once(),
        )
        .await;
        assert_eq!(outcome.text(), "Morning, Ben!");

        let ana = roster.get(a).unwrap();
        assert_eq!(ana.state, AgentState::Talking);
        assert_eq!(ana.current_action, "Morning, Ben!");
        assert_eq!(ana.relationship_with(b).unwrap().affinity, 1);
        // One-sided: Ben's view of Ana is untouched.
        assert!(roster.get(b).unwrap().relationship_with(a).is_none());
    }

    #[tokio::test]
    async fn out_of_range_fails_without_calling_service() {
        let (mut roster, a, b) = pair(3, 0);
        let service = ScriptedService::always(r#"MESSAGE: "hi""#);
        let prompts = PromptEngine::builtin().unwrap();
        let outcome = resolve_dialogue(
            &mut roster, a, b, &context(), &prompts, &service, RetryPolicy::once(),
        )
        .await;
        assert_eq!(outcome.text(), "Dialogue failed: too far away");
        assert_eq!(service.calls(), 0);
        assert!(roster.get(a).unwrap().relationships.is_empty());
    }

    #[tokio::test]
    async fn unparseable_reply_leaves_relationship_alone() {
        let (mut roster, a, b) = pair(1, 0);
        let service = ScriptedService::new().then_reply("I would rather not.");
        let prompts = PromptEngine::builtin().unwrap();
        let outcome = resolve_dialogue(
            &mut roster, a, b, &context(), &prompts, &service, RetryPolicy::once(),
        )
        .await;
        assert!(!outcome.succeeded());
        assert!(roster.get(a).unwrap().relationships.is_empty());
    }

    #[tokio::test]
    async fn interaction_uses_sentiment() {
        let (mut roster, a, b) = pair(0, 1);
        let service = ScriptedService::new()
            .then_reply("ACTION: INTERACT\nTARGET: Ben\nMESSAGE: \"Thanks for the help, you're great\"");
        let prompts = PromptEngine::builtin().unwrap();
        let outcome = resolve_interaction(
            &mut roster, a, b, &context(), &prompts, &service, RetryPolicy::once(),
        )
        .await;
        assert!(matches!(outcome, InteractionOutcome::Spoke { sentiment: Sentiment::Positive, .. }));
        assert_eq!(roster.get(a).unwrap().relationship_with(b).unwrap().affinity, 5);
    }

    #[tokio::test]
    async fn interaction_requires_action_token() {
        let (mut roster, a, b) = pair(0, 1);
        let service = ScriptedService::new().then_reply("MESSAGE: \"hello\"");
        let prompts = PromptEngine::builtin().unwrap();
        let outcome = resolve_interaction(
            &mut roster, a, b, &context(), &prompts, &service, RetryPolicy::once(),
        )
        .await;
        assert_eq!(outcome.text(), "Interaction generation failed");
    }

    #[tokio::test]
    async fn service_failure_is_contained() {
        let (mut roster, a, b) = pair(0, 1);
        let service = ScriptedService::new().then_fail("offline");
        let prompts = PromptEngine::builtin().unwrap();
        let outcome = resolve_dialogue(
            &mut roster, a, b, &context(), &prompts, &service, RetryPolicy::once(),
        )
        .await;
        assert_eq!(outcome.text(), "Dialogue generation failed");
        assert_eq!(roster.get(a).unwrap().state, AgentState::Idle);
    }
}
