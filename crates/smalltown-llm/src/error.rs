//! Error types for backend configuration.
//!
//! Failures of individual calls are not here: backends report those as
//! [`ServiceError`](smalltown_agents::ServiceError) so the retry loop can
//! handle them.

/// Errors that can occur while building decision-service backends.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML.
    #[error("failed to parse llm config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A profile names an API key variable that is not set.
    #[error("profile {profile:?} needs environment variable {var}")]
    MissingApiKey {
        /// Profile id.
        profile: String,
        /// Variable name.
        var: String,
    },

    /// The default profile is not among the configured profiles.
    #[error("default profile {0:?} is not configured")]
    UnknownDefault(String),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl From<serde_yml::Error> for LlmError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}
