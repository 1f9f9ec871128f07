//! Clock, decision pipeline, scheduler, and operator controls for the
//! Smalltown simulation.
//!
//! This crate ties the town together. A [`Simulation`] owns the grid, the
//! residents, the event log and the clock; the [`scheduler`] advances it
//! one tick at a time, asking each due resident what it wants to do and
//! occasionally letting something happen to the town.
//!
//! # Modules
//!
//! - [`clock`] -- Simulated time with day rollover detection.
//! - [`config`] -- Configuration loading from `smalltown-config.yaml` into
//!   strongly-typed structs.
//! - [`perception`] -- What an agent sees, rendered as prompt text.
//! - [`decision`] -- Reply parsing and action execution.
//! - [`simulation`] -- The town aggregate and per-agent cadence.
//! - [`scheduler`] -- The tick and the loop around it.
//! - [`operator`] -- Run state and runtime settings shared with a control
//!   surface.
//! - [`hub`] -- Outbound notifications and the cached status.

pub mod clock;
pub mod config;
pub mod decision;
pub mod hub;
pub mod operator;
pub mod perception;
pub mod scheduler;
pub mod simulation;

#[cfg(test)]
mod testing;

pub use clock::{ClockError, SimClock};
pub use config::{ConfigError, EventMode, LogFormat, SimulationConfig, ValidationError};
pub use decision::{ActionReport, DecisionError, decide_for_agent, execute_action, parse_reply};
pub use hub::NotificationHub;
pub use operator::{OperatorState, Settings, SettingsUpdate};
pub use perception::{Environment, PerceptionSettings, compose_environment_prompt, perceive};
pub use scheduler::{RunSummary, TickError, TickSummary, run, tick};
pub use simulation::{Simulation, SimulationError};
