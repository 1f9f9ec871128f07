//! Event chains: event, reactions, and follow-on events.
//!
//! A chain runs a fixed number of rounds. Each round asks the decision
//! service for an event, records and propagates it, then asks every listed
//! agent how it reacts. A reaction may set off a follow-on event, which runs
//! as a nested chain of [`ChainConfig::nested_rounds`] rounds. Nested chains
//! never spawn further chains beyond [`ChainConfig::max_depth`].
//!
//! Work is kept on an explicit stack of pending rounds rather than in
//! recursive calls. Each pending round carries its own remaining budget and
//! depth, so termination never depends on what the service replies.
//!
//! Finished rounds are summarized into a rolling history that later rounds,
//! and later chains, see in their prompt.

use std::collections::VecDeque;

use minijinja::context;
use rand::Rng;
use rand::seq::IndexedRandom;
use smalltown_agents::{
    AgentRoster, DecisionService, Persona, PromptEngine, PromptKind, RetryPolicy, call_with_retry,
};
use smalltown_types::{
    AgentId, Event, EventDetail, EventId, EventMetadata, Importance, MS_PER_SECOND, Memory,
    MemoryKind, SimTime,
};
use tracing::{info, warn};

use crate::error::EventError;
use crate::log::EventLog;
use crate::parse::{ParsedEvent, interpret_event_reply};
use crate::processor::{EventProcessor, Propagation};
use crate::reaction::{Reaction, UNKNOWN_ACTION, parse_reaction};

const DEFAULT_EVENT_DURATION_MS: u64 = 5 * 60 * MS_PER_SECOND;

/// Bounds and defaults for chains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    /// Rounds in a top-level chain.
    pub rounds: u32,
    /// Rounds in a chain set off by a reaction.
    pub nested_rounds: u32,
    /// How deep reaction-triggered chains may nest.
    pub max_depth: u32,
    /// History lines kept and shown to the event prompt.
    pub history_window: usize,
    /// Duration for events whose reply gave none.
    pub default_duration_ms: u64,
    /// Decision-service profile used to generate events.
    pub profile: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rounds: 2,
            nested_rounds: 1,
            max_depth: 1,
            history_window: 5,
            default_duration_ms: DEFAULT_EVENT_DURATION_MS,
            profile: "default".to_owned(),
        }
    }
}

/// One completed round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStep {
    /// The recorded event.
    pub event_id: EventId,
    /// Its description.
    pub description: String,
    /// One-based round within its chain.
    pub round: u32,
    /// Zero for the top-level chain.
    pub depth: u32,
    /// Who the processor reached, including residents the event did not
    /// name but whose radius it covered.
    pub propagation: Propagation,
    /// Reactions, in roster order of the affected agents.
    pub reactions: Vec<Reaction>,
}

/// Everything a chain did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainReport {
    /// Completed rounds in execution order.
    pub steps: Vec<ChainStep>,
    /// Prompts that failed to render and service calls that failed after
    /// retries. Each one skipped an event or a single reaction.
    pub failures: u32,
}

/// Mutable world state a chain works on.
pub struct ChainTown<'a> {
    /// Residents.
    pub roster: &'a mut AgentRoster,
    /// Where events are recorded.
    pub log: &'a mut EventLog,
    /// Applies impact and memories.
    pub processor: &'a EventProcessor,
    /// Current simulated time.
    pub now: SimTime,
}

/// The collaborators a chain calls out to.
pub struct ChainServices<'a, S: ?Sized> {
    /// Prompt templates.
    pub prompts: &'a PromptEngine,
    /// Decision service.
    pub service: &'a S,
    /// Retry policy for every call.
    pub policy: RetryPolicy,
}

struct PendingRound {
    seed: Option<String>,
    rounds_left: u32,
    round: u32,
    depth: u32,
}

impl PendingRound {
    fn next_round(&self, seed: Option<String>) -> Option<Self> {
        (self.rounds_left > 1).then(|| Self {
            seed,
            rounds_left: self.rounds_left.saturating_sub(1),
            round: self.round.saturating_add(1),
            depth: self.depth,
        })
    }
}

/// Runs chains and keeps the rolling history between them.
#[derive(Debug, Clone, Default)]
pub struct EventChain {
    config: ChainConfig,
    history: VecDeque<String>,
}

impl EventChain {
    /// A chain runner with empty history.
    pub const fn new(config: ChainConfig) -> Self {
        Self {
            config,
            history: VecDeque::new(),
        }
    }

    /// Current configuration.
    pub const fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// History lines, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    /// Forget all history.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn remember(&mut self, line: String) {
        self.history.push_back(line);
        while self.history.len() > self.config.history_window.max(1) {
            self.history.pop_front();
        }
    }

    /// Run one top-level chain, optionally seeded with a description of what
    /// prompted it.
    ///
    /// Render and service failures are logged and counted in the report.
    /// They skip the event or reaction concerned and the chain carries on,
    /// so events already recorded are always reported.
    pub async fn run<S, R>(
        &mut self,
        town: ChainTown<'_>,
        services: &ChainServices<'_, S>,
        seed: Option<String>,
        rng: &mut R,
    ) -> ChainReport
    where
        S: DecisionService + ?Sized,
        R: Rng + ?Sized,
    {
        let ChainTown {
            roster,
            log,
            processor,
            now,
        } = town;
        let mut report = ChainReport::default();
        let mut pending = vec![PendingRound {
            seed,
            rounds_left: self.config.rounds,
            round: 1,
            depth: 0,
        }];

        while let Some(job) = pending.pop() {
            if job.rounds_left == 0 {
                continue;
            }

            let prompt = match self.event_prompt(services.prompts, roster, now, job.seed.as_deref()) {
                Ok(prompt) => prompt,
                Err(e) => {
                    warn!(round = job.round, depth = job.depth, error = %e, "chain event prompt failed");
                    report.failures = report.failures.saturating_add(1);
                    pending.extend(job.next_round(job.seed.clone()));
                    continue;
                }
            };
            let reply = match call_with_retry(
                services.service,
                services.policy,
                &self.config.profile,
                &prompt,
            )
            .await
            {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(round = job.round, depth = job.depth, error = %e, "chain event generation failed");
                    report.failures = report.failures.saturating_add(1);
                    pending.extend(job.next_round(job.seed.clone()));
                    continue;
                }
            };
            let Some(parsed) = interpret_event_reply(&reply) else {
                warn!(round = job.round, depth = job.depth, "chain event reply was empty");
                pending.extend(job.next_round(job.seed.clone()));
                continue;
            };

            let event = self.place(parsed, reply, &job, roster, now, rng);
            let propagation = processor.process(&event, roster);
            log.record(event.clone());
            info!(
                event_id = %event.id,
                kind = event.kind.label(),
                scope = event.scope.label(),
                round = job.round,
                depth = job.depth,
                "chain event recorded"
            );

            let mut reactions = Vec::new();
            let mut nested = Vec::new();
            for agent_id in &event.affected {
                let Some(agent) = roster.get(*agent_id) else {
                    continue;
                };
                let prompt = match services.prompts.render(
                    PromptKind::Reaction,
                    context! { agent => Persona::of(agent), event => &event },
                ) {
                    Ok(prompt) => prompt,
                    Err(e) => {
                        warn!(agent_id = %agent_id, error = %e, "reaction prompt failed");
                        report.failures = report.failures.saturating_add(1);
                        continue;
                    }
                };
                let profile = agent.llm_profile.clone();
                let name = agent.name.clone();
                let reply =
                    match call_with_retry(services.service, services.policy, &profile, &prompt)
                        .await
                    {
                        Ok(reply) => reply,
                        Err(e) => {
                            warn!(agent_id = %agent_id, error = %e, "reaction request failed");
                            report.failures = report.failures.saturating_add(1);
                            continue;
                        }
                    };
                let reaction = parse_reaction(*agent_id, &reply);
                apply_reaction(roster, &reaction, &event, now);
                if let Some(trigger) = &reaction.triggered_event
                    && job.depth < self.config.max_depth
                {
                    nested.push(PendingRound {
                        seed: Some(format!("{name}'s reaction set off: {trigger}")),
                        rounds_left: self.config.nested_rounds,
                        round: 1,
                        depth: job.depth.saturating_add(1),
                    });
                }
                reactions.push(reaction);
            }

            let line = history_line(&event, &reactions, roster);
            self.remember(line.clone());

            pending.extend(job.next_round(Some(line)));
            // Nested chains run before the next round, in reaction order.
            pending.extend(nested.into_iter().rev());

            report.steps.push(ChainStep {
                event_id: event.id,
                description: event.description,
                round: job.round,
                depth: job.depth,
                propagation,
                reactions,
            });
        }

        report
    }

    fn event_prompt(
        &self,
        prompts: &PromptEngine,
        roster: &AgentRoster,
        now: SimTime,
        seed: Option<&str>,
    ) -> Result<String, EventError> {
        let residents: Vec<Persona<'_>> = roster.iter().map(Persona::of).collect();
        let history: Vec<&str> = self.history().collect();
        Ok(prompts.render(
            PromptKind::Event,
            context! {
                time => now.formatted(),
                time_of_day => now.time_of_day().label(),
                day => now.day(),
                residents => residents,
                history => history,
                seed => seed,
            },
        )?)
    }

    fn place<R: Rng + ?Sized>(
        &self,
        parsed: ParsedEvent,
        reply: String,
        job: &PendingRound,
        roster: &AgentRoster,
        now: SimTime,
        rng: &mut R,
    ) -> Event {
        let mut affected: Vec<AgentId> = Vec::new();
        for id in parsed
            .affected_names
            .iter()
            .filter_map(|name| roster.find_by_name(name).map(|a| a.id))
        {
            if !affected.contains(&id) {
                affected.push(id);
            }
        }
        if affected.is_empty() {
            affected = random_affected(roster, rng);
        }
        let position = affected
            .first()
            .and_then(|id| roster.get(*id))
            .map(|a| a.position);

        Event {
            id: EventId::new(),
            kind: parsed.kind,
            scope: parsed.scope,
            description: parsed.description,
            position,
            affected,
            start: now,
            duration_ms: parsed.duration_ms.unwrap_or(self.config.default_duration_ms),
            impact: parsed.impact,
            metadata: EventMetadata {
                detail: EventDetail::Chain {
                    round: job.round,
                    depth: job.depth,
                },
                raw_payload: Some(reply),
            },
        }
    }
}

/// Between one and all residents, chosen uniformly.
pub fn random_affected<R: Rng + ?Sized>(roster: &AgentRoster, rng: &mut R) -> Vec<AgentId> {
    let ids = roster.ids();
    if ids.is_empty() {
        return Vec::new();
    }
    let count = rng.random_range(1..=ids.len());
    ids.choose_multiple(rng, count).copied().collect()
}

fn apply_reaction(roster: &mut AgentRoster, reaction: &Reaction, event: &Event, now: SimTime) {
    let Some(agent) = roster.get_mut(reaction.agent_id) else {
        return;
    };
    agent.attributes.apply(&reaction.state_change);
    if reaction.action != UNKNOWN_ACTION && !reaction.action.is_empty() {
        agent.current_action.clone_from(&reaction.action);
    }
    let what = if reaction.detail.is_empty() {
        &reaction.action
    } else {
        &reaction.detail
    };
    let mut memory = Memory::new(
        MemoryKind::Emotion,
        now,
        format!("Reacted to \"{}\": {what}", event.description),
        Importance::Medium,
    )
    .with_related(event.affected.iter().copied())
    .with_tags(["reaction", event.kind.label()]);
    if let Some(emotion) = &reaction.emotion_change {
        agent.mood.clone_from(emotion);
        memory = memory.with_emotion(emotion.clone());
    }
    agent.remember(memory);
}

fn history_line(event: &Event, reactions: &[Reaction], roster: &AgentRoster) -> String {
    if reactions.is_empty() {
        return format!("Event: {}", event.description);
    }
    let summaries: Vec<String> = reactions
        .iter()
        .map(|r| {
            let name = roster.get(r.agent_id).map_or("someone", |a| a.name.as_str());
            r.summary(name)
        })
        .collect();
    format!("Event: {} | Reactions: {}", event.description, summaries.join("; "))
}
