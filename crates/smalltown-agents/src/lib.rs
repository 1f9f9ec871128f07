//! Residents of the Smalltown simulation and the seams they think through.
//!
//! # Modules
//!
//! - [`agent`] -- Agent records, profiles, and the arena roster that owns them.
//! - [`memory`] -- Bounded per-agent memory with importance-aware eviction,
//!   filtered queries, and relevance scoring.
//! - [`interaction`] -- Proximity checks, sentiment, relationship updates,
//!   and dialogue/interaction resolution.
//! - [`service`] -- The [`DecisionService`] contract, bounded retry, and a
//!   scripted implementation.
//! - [`grammar`] -- `KEY: value` extraction shared by every reply parser.
//! - [`prompt`] -- `minijinja` prompt templates.
//! - [`presets`] -- The default residents.
//! - [`error`] -- Error types for roster management and templating.

pub mod agent;
pub mod error;
pub mod grammar;
pub mod interaction;
pub mod memory;
pub mod presets;
pub mod prompt;
pub mod service;

pub use agent::{Agent, AgentProfile, AgentRoster};
pub use error::AgentError;
pub use interaction::{
    INTERACTION_RANGE, InteractionContext, InteractionOutcome, classify_sentiment, in_range,
    resolve_dialogue, resolve_interaction, update_relationship,
};
pub use memory::{MemoryQuery, MemoryStore, ScoredMemory};
pub use presets::default_residents;
pub use prompt::{Persona, PromptEngine, PromptKind};
pub use service::{DecisionService, RetryPolicy, ScriptedService, ServiceError, call_with_retry};
