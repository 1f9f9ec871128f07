//! Error types for the `smalltown-events` crate.

use smalltown_agents::{AgentError, ServiceError};

/// Errors raised while generating or chaining events.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// A prompt could not be rendered.
    #[error(transparent)]
    Prompt(#[from] AgentError),

    /// The decision service failed after its retries.
    #[error("event generation failed: {0}")]
    Service(#[from] ServiceError),
}
