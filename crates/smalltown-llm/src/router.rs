//! Per-agent profile routing.

use std::collections::BTreeMap;
use std::future::Future;

use smalltown_agents::{DecisionService, ServiceError};
use tracing::{debug, info};

use crate::backend::{LlmBackend, create_backend};
use crate::config::LlmConfig;
use crate::error::LlmError;

/// Routes each call to the backend of the caller's profile, or to the
/// default profile when that id is not configured.
#[derive(Debug)]
pub struct ProfileRouter {
    backends: BTreeMap<String, LlmBackend>,
    default_profile: String,
}

impl ProfileRouter {
    /// Build every configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::UnknownDefault`] if the default profile is not
    /// configured, or the first backend construction error.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        if !config.profiles.contains_key(&config.default_profile) {
            return Err(LlmError::UnknownDefault(config.default_profile.clone()));
        }
        let mut backends = BTreeMap::new();
        for (id, profile) in &config.profiles {
            let backend = create_backend(id, profile)?;
            info!(profile = %id, backend = backend.name(), model = %profile.model, "Decision backend ready");
            backends.insert(id.clone(), backend);
        }
        Ok(Self {
            backends,
            default_profile: config.default_profile.clone(),
        })
    }

    /// The backend serving `profile`.
    pub fn route(&self, profile: &str) -> Option<&LlmBackend> {
        self.backends.get(profile).or_else(|| {
            debug!(profile, fallback = %self.default_profile, "profile not configured, using default");
            self.backends.get(&self.default_profile)
        })
    }

    /// Configured profile ids.
    pub fn profiles(&self) -> impl Iterator<Item = &str> {
        self.backends.keys().map(String::as_str)
    }
}

impl DecisionService for ProfileRouter {
    fn complete(
        &self,
        profile: &str,
        prompt: &str,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send {
        let backend = self.route(profile);
        let missing = ServiceError::UnknownProfile(profile.to_owned());
        async move {
            match backend {
                Some(backend) => backend.complete(prompt).await,
                None => Err(missing),
            }
        }
    }
}
