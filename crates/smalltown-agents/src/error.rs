//! Error types for the `smalltown-agents` crate.

use smalltown_types::AgentId;
use smalltown_world::WorldError;

/// Errors that can occur while managing the roster.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// No agent with the given ID exists.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// Another agent already uses this name.
    #[error("duplicate agent name: {0}")]
    DuplicateName(String),

    /// The agent could not be placed on the grid.
    #[error("cannot place agent {name}: {source}")]
    Placement {
        /// Name of the agent being placed.
        name: String,
        /// Grid error.
        #[source]
        source: WorldError,
    },

    /// A prompt template failed to load or render.
    #[error("template error: {0}")]
    Template(String),
}
