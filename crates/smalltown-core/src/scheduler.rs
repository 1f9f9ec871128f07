//! The scheduler: one tick, and the loop that repeats it.
//!
//! A tick runs to completion before the next one is scheduled:
//!
//! 1. **Clock** -- advance simulated time by `tick_sim_ms * time_scale` and
//!    announce each day entered with one global town event.
//! 2. **Decisions** -- when auto decisions are on, every agent whose last
//!    decision lies at least one processing interval behind runs the
//!    decision pipeline, in roster order. A failed decision is logged and
//!    the agent waits for its next interval.
//! 3. **Events** -- with probability `event_frequency` the event engine
//!    runs once, synthetic or chained per configuration. Failures inside
//!    the engine are logged and do not abort the tick.
//!
//! Only an error escaping the tick itself stops the loop, and it stops it
//! for good: the operator state drops to Stopped and stays there until
//! someone starts it again.

use std::time::Duration;

use rand::Rng;
use smalltown_agents::DecisionService;
use smalltown_events::{ChainServices, ChainTown, day_start_event};
use smalltown_types::{AgentId, AgentUpdate, EventId, Notification, RunState, SimTime};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::clock::ClockError;
use crate::config::EventMode;
use crate::decision::decide_for_agent;
use crate::hub::NotificationHub;
use crate::operator::{OperatorState, Settings};
use crate::simulation::Simulation;

/// Errors that abort a whole tick and stop the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// Simulated time could not advance.
    #[error("clock error: {0}")]
    Clock(#[from] ClockError),
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Simulated time after the tick.
    pub time: SimTime,
    /// Day after the tick.
    pub day: u64,
    /// Days announced during the tick.
    pub days_started: Vec<u64>,
    /// Decisions completed.
    pub decisions: u32,
    /// Decisions that failed and were skipped.
    pub decision_failures: u32,
    /// Events recorded by the event engine, day announcements excluded.
    pub events: Vec<EventId>,
}

/// Totals for one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks that completed.
    pub total_ticks: u64,
    /// Ticks that failed and stopped the town.
    pub failed_ticks: u64,
}

/// Simulated milliseconds per tick at `time_scale`.
pub fn sim_step_ms(base_ms: u64, time_scale: f64) -> u64 {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let step = (base_ms as f64 * time_scale).round() as u64;
    step.max(1)
}

/// Real delay before the next tick: `max(min_ms, base_ms / time_scale)`.
pub fn real_delay(base_ms: u64, time_scale: f64, min_ms: u64) -> Duration {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let scaled = (base_ms as f64 / time_scale).round() as u64;
    Duration::from_millis(scaled.max(min_ms))
}

/// Run one tick.
///
/// # Errors
///
/// Returns [`TickError::Clock`] if simulated time would overflow. Nothing
/// else in a tick is fatal.
pub async fn tick<S: DecisionService + ?Sized>(
    sim: &mut Simulation,
    service: &S,
    settings: Settings,
    hub: &NotificationHub,
) -> Result<TickSummary, TickError> {
    let step = sim_step_ms(sim.config.world.tick_sim_ms, settings.time_scale);
    let entered = sim.clock.advance(step)?;
    let now = sim.clock.now();
    debug!(time = %now, step_ms = step, "Tick");
    hub.publish(Notification::TimeAdvanced {
        current_time: now,
        day_count: sim.clock.day(),
    });

    let mut summary = TickSummary {
        time: now,
        day: sim.clock.day(),
        ..TickSummary::default()
    };

    for day in entered {
        info!(day, "New day");
        let event = day_start_event(day, &sim.roster, now);
        hub.publish(Notification::EventRecorded {
            event: event.clone(),
        });
        let (_, propagation) = sim.record_event(event);
        publish_attributes(sim, hub, &propagation.affected);
        summary.days_started.push(day);
    }

    if settings.auto_decisions {
        for agent_id in sim.due_agents() {
            match decide_for_agent(sim, service, agent_id).await {
                Ok(report) => {
                    summary.decisions = summary.decisions.saturating_add(1);
                    if !report.update.is_empty() {
                        hub.publish(Notification::AgentUpdated {
                            agent_id,
                            update: report.update,
                        });
                    }
                }
                Err(e) => {
                    warn!(agent_id = %agent_id, error = %e, "Decision skipped");
                    summary.decision_failures = summary.decision_failures.saturating_add(1);
                }
            }
            sim.mark_processed(agent_id);
        }
    }

    if sim.rng.random::<f64>() < settings.event_frequency {
        summary.events = run_event_engine(sim, service, hub).await;
    }

    Ok(summary)
}

/// Run the configured event engine once.
async fn run_event_engine<S: DecisionService + ?Sized>(
    sim: &mut Simulation,
    service: &S,
    hub: &NotificationHub,
) -> Vec<EventId> {
    let now = sim.clock.now();
    match sim.config.events.mode {
        EventMode::Synthetic => {
            let active = sim.events.active(now).len();
            let Some(event) = sim
                .generator
                .try_generate(&sim.roster, active, now, &mut sim.rng)
            else {
                return Vec::new();
            };
            hub.publish(Notification::EventRecorded {
                event: event.clone(),
            });
            let (id, propagation) = sim.record_event(event);
            publish_attributes(sim, hub, &propagation.affected);
            vec![id]
        }
        EventMode::Chain => {
            let policy = sim.config.retry_policy();
            let town = ChainTown {
                roster: &mut sim.roster,
                log: &mut sim.events,
                processor: &sim.processor,
                now,
            };
            let services = ChainServices {
                prompts: &sim.prompts,
                service,
                policy,
            };
            let report = sim.chain.run(town, &services, None, &mut sim.rng).await;
            if report.failures > 0 {
                warn!(failures = report.failures, "Event chain finished with failures");
            }
            let mut ids = Vec::with_capacity(report.steps.len());
            for step in report.steps {
                let Some(event) = sim.events.get(step.event_id).cloned() else {
                    continue;
                };
                hub.publish(Notification::EventRecorded { event });
                publish_attributes(sim, hub, &step.propagation.affected);
                ids.push(step.event_id);
            }
            ids
        }
    }
}

fn publish_attributes(sim: &Simulation, hub: &NotificationHub, agents: &[AgentId]) {
    for &agent_id in agents {
        let Some(agent) = sim.roster.get(agent_id) else {
            continue;
        };
        hub.publish(Notification::AgentUpdated {
            agent_id,
            update: AgentUpdate {
                attributes: Some(agent.attributes),
                ..AgentUpdate::default()
            },
        });
    }
}

async fn publish_status(sim: &Simulation, operator: &OperatorState, hub: &NotificationHub) {
    hub.set_status(sim.status(operator.run_state(), operator.uptime_ms()))
        .await;
}

/// Drive the town until shutdown is requested.
///
/// While Stopped or Paused the loop sleeps until the operator changes
/// something. While Running it ticks, then waits out [`real_delay`]. The
/// wait ends early only for pause, stop, reset, or shutdown, so those take
/// effect at the next tick boundary and settings changes never add ticks.
pub async fn run<S: DecisionService + ?Sized>(
    sim: &mut Simulation,
    service: &S,
    operator: &OperatorState,
    hub: &NotificationHub,
) -> RunSummary {
    let mut summary = RunSummary::default();
    info!(agents = sim.roster.len(), "Scheduler loop starting");

    loop {
        if operator.is_shutdown_requested() {
            info!("Shutdown requested");
            break;
        }

        if operator.take_reset() {
            operator.stop();
            if let Err(e) = sim.reset() {
                error!(error = %e, "Simulation reset failed");
            }
            publish_status(sim, operator, hub).await;
            continue;
        }

        if operator.run_state() != RunState::Running {
            publish_status(sim, operator, hub).await;
            operator.changed().await;
            continue;
        }

        let settings = operator.settings().await;
        match tick(sim, service, settings, hub).await {
            Ok(_) => summary.total_ticks = summary.total_ticks.saturating_add(1),
            Err(e) => {
                error!(error = %e, "Tick failed, stopping simulation");
                summary.failed_ticks = summary.failed_ticks.saturating_add(1);
                operator.stop();
            }
        }
        publish_status(sim, operator, hub).await;

        let delay = real_delay(
            sim.config.world.tick_interval_ms,
            settings.time_scale,
            sim.config.scheduler.min_real_delay_ms,
        );
        wait_for_next_tick(operator, delay).await;
    }

    info!(
        total_ticks = summary.total_ticks,
        failed_ticks = summary.failed_ticks,
        "Scheduler loop exited"
    );
    summary
}

/// Sleep until `delay` has passed since now. Operator wake-ups only cut the
/// wait short when the loop has something else to do: the state left
/// Running, or a reset or shutdown is pending. Settings changes and
/// leftover wake-ups keep waiting for the same deadline.
async fn wait_for_next_tick(operator: &OperatorState, delay: Duration) {
    let deadline = Instant::now().checked_add(delay).unwrap_or_else(Instant::now);
    loop {
        tokio::select! {
            () = tokio::time::sleep_until(deadline) => return,
            () = operator.changed() => {
                if operator.run_state() != RunState::Running
                    || operator.is_reset_requested()
                    || operator.is_shutdown_requested()
                {
                    return;
                }
            }
        }
    }
}
