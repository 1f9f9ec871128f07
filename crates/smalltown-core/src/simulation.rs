//! The simulation aggregate.
//!
//! [`Simulation`] owns every piece of mutable world state: the grid, the
//! roster, the event log, the clock, the event engine, the prompt templates,
//! the per-agent decision cadence, and the random number generator. Every
//! component call receives it (or the fields it needs) by reference. There
//! is no global state.
//!
//! Grid occupancy is kept in step with agent positions here: agents enter
//! and leave the town, and move, only through methods on this type.

use std::collections::HashMap;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use smalltown_agents::{Agent, AgentError, AgentProfile, AgentRoster, PromptEngine, default_residents};
use smalltown_events::{EventChain, EventGenerator, EventLog, EventProcessor, Propagation};
use smalltown_types::{
    AgentId, Event, EventId, Position, RunState, SimTime, StatusSnapshot,
};
use smalltown_world::{Grid, WorldError, parse_layout, town};
use tracing::{debug, info};

use crate::clock::{ClockError, SimClock};
use crate::config::{SimulationConfig, ValidationError};

/// Errors raised while building or mutating the simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// The configuration is out of range.
    #[error(transparent)]
    Config(#[from] ValidationError),

    /// The clock could not be built.
    #[error(transparent)]
    Clock(#[from] ClockError),

    /// A grid operation failed.
    #[error(transparent)]
    World(#[from] WorldError),

    /// A roster operation failed.
    #[error(transparent)]
    Agent(#[from] AgentError),
}

/// The whole town.
#[derive(Debug)]
pub struct Simulation {
    pub(crate) config: SimulationConfig,
    pub(crate) grid: Grid,
    pub(crate) roster: AgentRoster,
    pub(crate) events: EventLog,
    pub(crate) clock: SimClock,
    pub(crate) generator: EventGenerator,
    pub(crate) processor: EventProcessor,
    pub(crate) chain: EventChain,
    pub(crate) prompts: PromptEngine,
    pub(crate) rng: SmallRng,
    /// Simulated time each agent last decided.
    last_processed: HashMap<AgentId, SimTime>,
    /// Residents restored by [`reset`](Self::reset).
    initial: Vec<AgentProfile>,
}

impl Simulation {
    /// Build the town described by `config`.
    ///
    /// Residents come from `config.residents`, or the four default
    /// residents when that list is empty. Their first decisions are
    /// staggered across one processing interval.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid, the layout does not parse,
    /// or a resident cannot be placed.
    pub fn new(config: SimulationConfig, prompts: PromptEngine) -> Result<Self, SimulationError> {
        config.validate()?;
        let grid = if config.world.layout.is_empty() {
            town()?
        } else {
            parse_layout(&config.world.layout)?
        };
        let clock = SimClock::new(config.world.start_hour)?;
        let initial = if config.residents.is_empty() {
            default_residents()
        } else {
            config.residents.clone()
        };

        let mut sim = Self {
            generator: EventGenerator::new(config.generator_config(), clock.now()),
            processor: EventProcessor::new(config.processor_config()),
            chain: EventChain::new(config.chain_config()),
            rng: SmallRng::seed_from_u64(config.world.seed),
            grid,
            roster: AgentRoster::new(),
            events: EventLog::new(),
            clock,
            prompts,
            last_processed: HashMap::new(),
            initial,
            config,
        };
        sim.populate()?;
        info!(
            agents = sim.roster.len(),
            width = sim.grid.width(),
            height = sim.grid.height(),
            time = %sim.clock.now(),
            "Simulation initialized"
        );
        Ok(sim)
    }

    fn populate(&mut self) -> Result<(), SimulationError> {
        let interval = self.config.processing_interval_ms();
        for profile in self.initial.clone() {
            let id = self.admit(profile)?;
            let offset = self.rng.random_range(0..interval.max(1));
            let last = SimTime(
                self.clock
                    .now()
                    .0
                    .saturating_sub(interval)
                    .saturating_add(offset),
            );
            self.last_processed.insert(id, last);
        }
        Ok(())
    }

    fn admit(&mut self, profile: AgentProfile) -> Result<AgentId, SimulationError> {
        let agent = Agent::from_profile(profile, self.config.memory.capacity);
        let (name, position) = (agent.name.clone(), agent.position);
        let id = self.roster.insert(agent)?;
        if let Err(source) = self.grid.place(id, position) {
            self.roster.remove(id);
            return Err(AgentError::Placement { name, source }.into());
        }
        Ok(id)
    }

    /// Restore the starting residents, grid occupancy, clock, event log,
    /// and random stream.
    ///
    /// # Errors
    ///
    /// Fails if a starting resident can no longer be placed.
    pub fn reset(&mut self) -> Result<(), SimulationError> {
        self.grid.clear_occupants();
        self.roster = AgentRoster::new();
        self.events.clear();
        self.clock.reset();
        self.generator.reset(self.clock.now());
        self.chain.clear_history();
        self.last_processed.clear();
        self.rng = SmallRng::seed_from_u64(self.config.world.seed);
        self.populate()?;
        info!(agents = self.roster.len(), "Simulation reset");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Residents
    // -----------------------------------------------------------------------

    /// Add a resident. Its first decision comes one full processing
    /// interval from now.
    ///
    /// # Errors
    ///
    /// Fails if the name is taken or the starting tile cannot be placed on.
    /// Nothing changes on failure.
    pub fn add_agent(&mut self, profile: AgentProfile) -> Result<AgentId, SimulationError> {
        let id = self.admit(profile)?;
        self.last_processed.insert(id, self.clock.now());
        info!(agent_id = %id, "Agent added");
        Ok(id)
    }

    /// Remove a resident and clear its tile.
    pub fn remove_agent(&mut self, id: AgentId) -> Option<Agent> {
        let agent = self.roster.remove(id)?;
        self.grid.vacate(id, agent.position);
        self.last_processed.remove(&id);
        info!(agent_id = %id, name = %agent.name, "Agent removed");
        Some(agent)
    }

    /// Move a resident to `to`, updating grid occupancy and its position
    /// together.
    ///
    /// # Errors
    ///
    /// Fails if the agent is unknown or the tile cannot be entered. Nothing
    /// changes on failure.
    pub fn move_agent(&mut self, id: AgentId, to: Position) -> Result<(), SimulationError> {
        let agent = self.roster.require_mut(id)?;
        self.grid.relocate(id, agent.position, to)?;
        debug!(agent_id = %id, from = %agent.position, to = %to, "Agent moved");
        agent.position = to;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Cadence
    // -----------------------------------------------------------------------

    /// Whether `id` may decide at the current time.
    pub fn is_due(&self, id: AgentId) -> bool {
        let interval = self.config.processing_interval_ms();
        self.last_processed
            .get(&id)
            .is_none_or(|last| self.clock.now().millis_since(*last) >= interval)
    }

    /// Agents that may decide now, in roster order.
    pub fn due_agents(&self) -> Vec<AgentId> {
        self.roster
            .iter()
            .map(|a| a.id)
            .filter(|id| self.is_due(*id))
            .collect()
    }

    /// Record that `id` decided at the current time.
    pub fn mark_processed(&mut self, id: AgentId) {
        self.last_processed.insert(id, self.clock.now());
    }

    /// When `id` last decided.
    pub fn last_processed(&self, id: AgentId) -> Option<SimTime> {
        self.last_processed.get(&id).copied()
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Apply `event` to the residents and append it to the log.
    pub fn record_event(&mut self, event: Event) -> (EventId, Propagation) {
        let propagation = self.processor.process(&event, &mut self.roster);
        info!(
            event_id = %event.id,
            kind = event.kind.label(),
            scope = event.scope.label(),
            affected = propagation.affected.len(),
            "Event recorded"
        );
        let id = self.events.record(event);
        (id, propagation)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Configuration the town was built from.
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The grid.
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The residents.
    pub const fn roster(&self) -> &AgentRoster {
        &self.roster
    }

    /// The event log.
    pub const fn events(&self) -> &EventLog {
        &self.events
    }

    /// The clock.
    pub const fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Mutable clock, for operators and tests that jump in time.
    pub const fn clock_mut(&mut self) -> &mut SimClock {
        &mut self.clock
    }

    /// Current simulated time.
    pub const fn now(&self) -> SimTime {
        self.clock.now()
    }

    /// Status answer for the given scheduler state and uptime.
    pub fn status(&self, state: RunState, uptime_ms: u64) -> StatusSnapshot {
        StatusSnapshot {
            state,
            uptime_ms,
            current_time: self.clock.now(),
            day_count: self.clock.day(),
            agents: self.roster.snapshots(),
        }
    }
}
