//! Events for the Smalltown simulation.
//!
//! Events are things that happen to residents: a conversation in the
//! street, a change in the weather, a market on the square. They come from
//! two sources. The [`generator`] synthesizes them from weighted templates.
//! The [`chain`] orchestrator asks the decision service for them and lets
//! residents react, which may set off further events. Either way the
//! [`processor`] decides who is affected and applies the consequences, and
//! the [`log`] keeps the record.
//!
//! # Modules
//!
//! - [`generator`] -- Rate-limited weighted event synthesis and the
//!   start-of-day announcement.
//! - [`processor`] -- Scope-based propagation, impact, and event memories.
//! - [`parse`] -- Event reply grammar and JSON form.
//! - [`reaction`] -- Agent reaction replies.
//! - [`chain`] -- Bounded event/reaction chains with rolling history.
//! - [`log`] -- The append-only event log.
//! - [`error`] -- Error types for chain execution.

pub mod chain;
pub mod error;
pub mod generator;
pub mod log;
pub mod parse;
pub mod processor;
pub mod reaction;

#[cfg(test)]
mod testing;

pub use chain::{
    ChainConfig, ChainReport, ChainServices, ChainStep, ChainTown, EventChain, random_affected,
};
pub use error::EventError;
pub use generator::{CategoryWeights, EventGenerator, GeneratorConfig, day_start_event};
pub use log::EventLog;
pub use parse::{ParsedEvent, interpret_event_reply, parse_event_grammar, parse_event_json};
pub use processor::{EventProcessor, ProcessorConfig, Propagation};
pub use reaction::{Reaction, parse_reaction};
