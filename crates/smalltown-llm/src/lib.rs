//! Decision-service backends for the Smalltown simulation.
//!
//! The town asks a [`DecisionService`] for every decision, exchange,
//! event, and reaction. This crate provides the production one: a
//! [`ProfileRouter`] that sends each call to the backend of the calling
//! agent's `llm_profile`.
//!
//! # Modules
//!
//! - [`config`] -- The `llm` section of `smalltown-config.yaml`.
//! - [`backend`] -- OpenAI-compatible, Anthropic, `DashScope`, and offline
//!   backends.
//! - [`router`] -- Profile routing with default fallback.
//! - [`error`] -- Backend construction errors.
//!
//! [`DecisionService`]: smalltown_agents::DecisionService

pub mod backend;
pub mod config;
pub mod error;
pub mod router;

pub use backend::{LlmBackend, create_backend};
pub use config::{BackendKind, LlmConfig, ProfileConfig};
pub use error::LlmError;
pub use router::ProfileRouter;
