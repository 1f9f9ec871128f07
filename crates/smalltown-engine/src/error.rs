//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup so that `main` can
//! propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: smalltown_core::ConfigError,
    },

    /// Prompt templates could not be loaded.
    #[error("prompt error: {source}")]
    Prompt {
        /// The underlying template error.
        #[from]
        source: smalltown_agents::AgentError,
    },

    /// The town could not be built.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: smalltown_core::SimulationError,
    },

    /// A decision backend could not be built.
    #[error("backend error: {source}")]
    Llm {
        /// The underlying backend error.
        #[from]
        source: smalltown_llm::LlmError,
    },

    /// The log filter did not parse.
    #[error("invalid log filter {filter:?}: {message}")]
    Logging {
        /// The rejected filter.
        filter: String,
        /// Parser message.
        message: String,
    },
}
