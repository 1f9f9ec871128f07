//! The decision pipeline: perceive, prompt, parse, execute.
//!
//! One decision for one agent runs through four steps:
//!
//! 1. **Perceive** -- [`compose_environment_prompt`] describes the agent's
//!    surroundings and the decision template wraps it.
//! 2. **Prompt** -- the decision service answers through the bounded retry
//!    policy. Exhausted retries surface as [`DecisionError::Service`]; the
//!    scheduler skips the agent for that cycle.
//! 3. **Parse** -- [`parse_reply`] reads the `ACTION:` grammar. Anything
//!    unrecognizable becomes [`Action::Idle`].
//! 4. **Execute** -- [`execute_action`] applies the action to the town and
//!    records what the agent did in its memory.
//!
//! [`compose_environment_prompt`]: crate::perception::compose_environment_prompt

use smalltown_agents::{
    AgentError, DecisionService, InteractionContext, InteractionOutcome, ServiceError,
    call_with_retry, grammar, in_range, resolve_interaction,
};
use smalltown_types::{
    Action, AgentId, AgentSnapshot, AgentState, AgentUpdate, Importance, Memory, MemoryKind,
    MoveTarget, Position,
};
use smalltown_world::{next_step, random_walkable_position};
use tracing::{debug, info};

use crate::perception::{compose_decision_prompt, compose_environment_prompt};
use crate::simulation::Simulation;

/// Manhattan reach of a wander.
pub const WANDER_RADIUS: u32 = 3;

/// Errors that end one agent's decision early.
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    /// The agent is gone or its prompt could not be rendered.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// The decision service gave up.
    #[error("decision service failed: {0}")]
    Service(#[from] ServiceError),
}

/// What executing an action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    /// Who acted.
    pub agent_id: AgentId,
    /// Grammar label of the action.
    pub action: &'static str,
    /// Whether the action took effect.
    pub succeeded: bool,
    /// What happened, or why nothing did.
    pub detail: String,
    /// Visible changes to the agent.
    pub update: AgentUpdate,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Read an action from a decision reply.
///
/// Never fails: a reply with no recognizable `ACTION:` token is
/// [`Action::Idle`]. A `MOVE` with neither a direction nor a destination is
/// also idle.
pub fn parse_reply(text: &str) -> Action {
    let Some(token) = grammar::action_token(text) else {
        debug!(reply = text, "no action token in reply, idling");
        return Action::Idle;
    };
    match token.as_str() {
        "MOVE" => {
            let target = grammar::direction(text)
                .map(MoveTarget::Direction)
                .or_else(|| grammar::destination(text).map(MoveTarget::Destination));
            target.map_or(Action::Idle, |target| Action::Move { target })
        }
        "SPEAK" => Action::Speak {
            message: grammar::message(text).unwrap_or_default(),
            target: grammar::target(text),
        },
        "INTERACT" => Action::Interact {
            target: grammar::target(text),
            message: grammar::message(text),
            interaction: grammar::interaction(text),
        },
        "PURSUE_GOAL" => Action::PursueGoal {
            goal: grammar::goal(text).unwrap_or_default(),
            priority: grammar::priority(text),
        },
        "WANDER" => Action::Wander,
        _ => Action::Idle,
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run one full decision for `agent_id`.
///
/// # Errors
///
/// Returns [`DecisionError`] if the agent is missing, its prompt fails to
/// render, or the service exhausts its retries. The town is unchanged in
/// each case.
pub async fn decide_for_agent<S: DecisionService + ?Sized>(
    sim: &mut Simulation,
    service: &S,
    agent_id: AgentId,
) -> Result<ActionReport, DecisionError> {
    let agent = sim.roster.require(agent_id)?;
    let environment = compose_environment_prompt(
        &sim.grid,
        &sim.roster,
        &sim.events,
        agent,
        sim.clock.now(),
        sim.config.perception_settings(),
    );
    let prompt = compose_decision_prompt(&sim.prompts, agent, &environment)?;
    let profile = agent.llm_profile.clone();

    let reply = call_with_retry(service, sim.config.retry_policy(), &profile, &prompt).await?;
    let action = parse_reply(&reply);
    info!(agent_id = %agent_id, action = action.label(), "Agent decided");

    let report = execute_action(sim, service, agent_id, &action).await?;
    debug!(
        agent_id = %agent_id,
        succeeded = report.succeeded,
        detail = %report.detail,
        "Action executed"
    );
    Ok(report)
}

/// Apply `action` for `agent_id`.
///
/// Blocked moves and unresolved exchanges are reported with
/// `succeeded == false` and leave the town unchanged.
///
/// # Errors
///
/// Returns [`DecisionError::Agent`] if the agent does not exist.
pub async fn execute_action<S: DecisionService + ?Sized>(
    sim: &mut Simulation,
    service: &S,
    agent_id: AgentId,
    action: &Action,
) -> Result<ActionReport, DecisionError> {
    let before = sim.roster.require(agent_id)?.snapshot();
    let (succeeded, detail) = match action {
        Action::Move { target } => step(sim, agent_id, *target)?,
        Action::Wander => wander(sim, agent_id)?,
        Action::Speak { message, target } => speak(sim, agent_id, message, target.as_deref())?,
        Action::Interact {
            target,
            message,
            interaction,
        } => {
            let words = message.as_deref().or(interaction.as_deref());
            interact(sim, service, agent_id, target.as_deref(), words).await?
        }
        Action::PursueGoal { goal, priority } => pursue(sim, agent_id, goal, *priority)?,
        Action::Idle => {
            if sim.config.scheduler.wander_when_idle {
                wander(sim, agent_id)?
            } else {
                sim.roster.require_mut(agent_id)?.state = AgentState::Idle;
                (true, "idle".to_owned())
            }
        }
    };
    let after = sim.roster.require(agent_id)?.snapshot();
    Ok(ActionReport {
        agent_id,
        action: action.label(),
        succeeded,
        detail,
        update: changes(&before, &after),
    })
}

fn changes(before: &AgentSnapshot, after: &AgentSnapshot) -> AgentUpdate {
    AgentUpdate {
        position: (before.position != after.position).then_some(after.position),
        state: (before.state != after.state).then_some(after.state),
        attributes: (before.attributes != after.attributes).then_some(after.attributes),
        current_action: (before.current_action != after.current_action)
            .then(|| after.current_action.clone()),
    }
}

type Outcome = (bool, String);

fn relocate(
    sim: &mut Simulation,
    agent_id: AgentId,
    to: Position,
    verb: &str,
) -> Result<Outcome, DecisionError> {
    if sim.move_agent(agent_id, to).is_err() {
        return Ok((false, format!("cannot enter {to}")));
    }
    let now = sim.clock.now();
    let agent = sim.roster.require_mut(agent_id)?;
    agent.state = AgentState::Moving;
    agent.remember(
        Memory::new(
            MemoryKind::Observation,
            now,
            format!("{verb} to {to}"),
            Importance::Low,
        )
        .with_location(to.to_string())
        .with_tags(["movement"]),
    );
    Ok((true, format!("{verb} to {to}")))
}

fn step(
    sim: &mut Simulation,
    agent_id: AgentId,
    target: MoveTarget,
) -> Result<Outcome, DecisionError> {
    let from = sim.roster.require(agent_id)?.position;
    let to = match target {
        MoveTarget::Direction(direction) => from.step(direction),
        MoveTarget::Destination(goal) => next_step(&sim.grid, from, goal),
    };
    if to == from {
        return Ok((false, "blocked".to_owned()));
    }
    relocate(sim, agent_id, to, "Moved")
}

fn wander(sim: &mut Simulation, agent_id: AgentId) -> Result<Outcome, DecisionError> {
    let from = sim.roster.require(agent_id)?.position;
    match random_walkable_position(&sim.grid, from, WANDER_RADIUS, &mut sim.rng) {
        Some(to) => relocate(sim, agent_id, to, "Wandered"),
        None => Ok((false, "nowhere to wander".to_owned())),
    }
}

fn speak(
    sim: &mut Simulation,
    agent_id: AgentId,
    message: &str,
    target: Option<&str>,
) -> Result<Outcome, DecisionError> {
    if message.is_empty() {
        return Ok((false, "nothing to say".to_owned()));
    }
    let addressee = target.and_then(|t| sim.roster.find_by_name(t)).map(|a| (a.id, a.name.clone()));
    let now = sim.clock.now();
    let agent = sim.roster.require_mut(agent_id)?;
    agent.state = AgentState::Talking;
    agent.current_action = message.to_owned();

    let listener = addressee
        .as_ref()
        .map_or("those nearby", |(_, name)| name.as_str());
    let mut memory = Memory::new(
        MemoryKind::Interaction,
        now,
        format!("Said to {listener}: {message}"),
        Importance::Medium,
    )
    .with_location(agent.position.to_string())
    .with_tags(["dialogue", listener]);
    if let Some((id, _)) = &addressee {
        memory = memory.with_related([*id]);
    }
    agent.remember(memory);
    Ok((true, format!("said \"{message}\" to {listener}")))
}

async fn interact<S: DecisionService + ?Sized>(
    sim: &mut Simulation,
    service: &S,
    agent_id: AgentId,
    target: Option<&str>,
    words: Option<&str>,
) -> Result<Outcome, DecisionError> {
    let me = sim.roster.require(agent_id)?;
    let position = me.position;
    let partner = target
        .and_then(|t| sim.roster.find_by_name(t))
        .filter(|other| other.id != agent_id)
        .map(|other| (other.id, other.name.clone(), other.position));
    let now = sim.clock.now();
    let range = sim.config.interaction.range;

    if let Some((partner_id, name, partner_position)) = partner.clone()
        && in_range(position, partner_position, range)
    {
        let context = InteractionContext {
            location: sim
                .grid
                .terrain_at(position)
                .unwrap_or_default()
                .label()
                .to_owned(),
            time_of_day: now.time_of_day(),
            recent_events: sim
                .events
                .recent_descriptions(sim.config.perception.recent_events),
            previous_lines: Vec::new(),
            now,
            range,
        };
        let policy = sim.config.retry_policy();
        let outcome = resolve_interaction(
            &mut sim.roster,
            agent_id,
            partner_id,
            &context,
            &sim.prompts,
            service,
            policy,
        )
        .await;
        return match outcome {
            InteractionOutcome::Spoke { message, sentiment } => {
                let agent = sim.roster.require_mut(agent_id)?;
                agent.remember(
                    Memory::new(
                        MemoryKind::Interaction,
                        now,
                        format!("Interacted with {name}: {message}"),
                        Importance::Medium,
                    )
                    .with_related([partner_id])
                    .with_location(position.to_string())
                    .with_tags(["interaction", name.as_str()]),
                );
                Ok((true, format!("{sentiment:?} exchange with {name}: {message}")))
            }
            InteractionOutcome::Failed { reason } => Ok((false, reason)),
        };
    }

    // Nobody in reach to resolve against: note the gesture and move on.
    let (related, name) = partner.map_or((None, "someone".to_owned()), |(id, name, _)| {
        (Some(id), name)
    });
    let agent = sim.roster.require_mut(agent_id)?;
    agent.state = AgentState::Interacting;
    agent.current_action = words.unwrap_or("interacting").to_owned();
    let mut memory = Memory::new(
        MemoryKind::Interaction,
        now,
        format!("Interacted with {name}: {}", words.unwrap_or_default()),
        Importance::Medium,
    )
    .with_location(position.to_string())
    .with_tags(["interaction", name.as_str()]);
    if let Some(id) = related {
        memory = memory.with_related([id]);
    }
    agent.remember(memory);
    Ok((true, format!("interacted with {name} from afar")))
}

fn pursue(
    sim: &mut Simulation,
    agent_id: AgentId,
    goal: &str,
    priority: Option<u32>,
) -> Result<Outcome, DecisionError> {
    if goal.is_empty() {
        return Ok((false, "no goal given".to_owned()));
    }
    let now = sim.clock.now();
    let agent = sim.roster.require_mut(agent_id)?;
    agent.state = AgentState::Working;
    agent.current_action = format!("Pursuing goal: {goal}");
    let mut tags = vec!["goal".to_owned()];
    if let Some(priority) = priority {
        tags.push(format!("priority-{priority}"));
    }
    agent.remember(
        Memory::new(
            MemoryKind::Event,
            now,
            format!("Set a new goal: {goal}"),
            Importance::High,
        )
        .with_tags(tags),
    );
    Ok((true, format!("pursuing {goal}")))
}
