//! LLM backend implementations.
//!
//! Uses enum dispatch instead of trait objects because async methods are
//! not dyn-compatible. Every HTTP backend sends the rendered prompt as a
//! single user turn and returns the reply text; the simulation parses it.
//!
//! Failures are reported as [`ServiceError`] so that the caller's retry
//! policy applies: connection problems as `Transport`, non-2xx answers as
//! `Status`, and bodies without a reply as `Malformed`.

use std::time::Duration;

use smalltown_agents::ServiceError;
use tracing::debug;

use crate::config::{BackendKind, ProfileConfig};
use crate::error::LlmError;

// ---------------------------------------------------------------------------
// Unified backend enum
// ---------------------------------------------------------------------------

/// One configured backend.
#[derive(Debug)]
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API.
    OpenAi(HttpBackend),
    /// Anthropic Messages API.
    Anthropic(HttpBackend),
    /// Alibaba `DashScope` text generation API.
    DashScope(HttpBackend),
    /// A fixed reply, no network.
    Offline(String),
}

impl LlmBackend {
    /// Send a prompt and return the reply text.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the request fails, the service answers
    /// with an error status, or the body holds no reply.
    pub async fn complete(&self, prompt: &str) -> Result<String, ServiceError> {
        match self {
            Self::OpenAi(http) => {
                let body = serde_json::json!({
                    "model": http.model,
                    "messages": [{"role": "user", "content": prompt}],
                    "temperature": http.temperature,
                    "max_tokens": http.max_tokens,
                });
                let json = http.post("chat/completions", &body).await?;
                extract_openai_content(&json)
            }
            Self::Anthropic(http) => {
                let body = serde_json::json!({
                    "model": http.model,
                    "max_tokens": http.max_tokens,
                    "temperature": http.temperature,
                    "messages": [{"role": "user", "content": prompt}],
                });
                let json = http.post("messages", &body).await?;
                extract_anthropic_content(&json)
            }
            Self::DashScope(http) => {
                let body = serde_json::json!({
                    "model": http.model,
                    "input": {"prompt": prompt},
                    "parameters": {
                        "temperature": http.temperature,
                        "top_p": 0.8,
                        "result_format": "text",
                    },
                });
                let json = http
                    .post("services/aigc/text-generation/generation", &body)
                    .await?;
                extract_dashscope_content(&json)
            }
            Self::Offline(reply) => Ok(reply.clone()),
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
            Self::DashScope(_) => "dashscope",
            Self::Offline(_) => "offline",
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP plumbing
// ---------------------------------------------------------------------------

/// Connection details shared by every HTTP backend.
#[derive(Debug)]
pub struct HttpBackend {
    client: reqwest::Client,
    kind: BackendKind,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl HttpBackend {
    fn new(config: &ProfileConfig, api_key: Option<String>) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            kind: config.kind,
            base_url: config.base_url().to_owned(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ServiceError> {
        let url = format!("{}/{path}", self.base_url);
        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = match self.kind {
                BackendKind::Anthropic => request
                    .header("x-api-key", key)
                    .header("anthropic-version", "2023-06-01"),
                _ => request.bearer_auth(key),
            };
        }

        debug!(url = %url, model = %self.model, "sending decision request");
        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(format!("response is not JSON: {e}")))
    }
}

fn text_at(json: &serde_json::Value, pointer: &str) -> Result<String, ServiceError> {
    json.pointer(pointer)
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| ServiceError::Malformed(format!("response missing {pointer}")))
}

/// Extract the reply from an `OpenAI` chat completions response.
fn extract_openai_content(json: &serde_json::Value) -> Result<String, ServiceError> {
    text_at(json, "/choices/0/message/content")
}

/// Extract the reply from an Anthropic Messages API response.
fn extract_anthropic_content(json: &serde_json::Value) -> Result<String, ServiceError> {
    text_at(json, "/content/0/text")
}

/// Extract the reply from a `DashScope` text generation response.
fn extract_dashscope_content(json: &serde_json::Value) -> Result<String, ServiceError> {
    text_at(json, "/output/text")
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Create the backend for profile `id`.
///
/// # Errors
///
/// Returns [`LlmError::MissingApiKey`] if the profile names an unset key
/// variable, or [`LlmError::Client`] if the HTTP client cannot be built.
pub fn create_backend(id: &str, config: &ProfileConfig) -> Result<LlmBackend, LlmError> {
    Ok(match config.kind {
        BackendKind::Offline => LlmBackend::Offline(config.reply.clone()),
        BackendKind::OpenAi => LlmBackend::OpenAi(HttpBackend::new(config, api_key(id, config)?)?),
        BackendKind::Anthropic => {
            LlmBackend::Anthropic(HttpBackend::new(config, api_key(id, config)?)?)
        }
        BackendKind::DashScope => {
            LlmBackend::DashScope(HttpBackend::new(config, api_key(id, config)?)?)
        }
    })
}

fn api_key(id: &str, config: &ProfileConfig) -> Result<Option<String>, LlmError> {
    config
        .api_key_env
        .as_ref()
        .map(|var| {
            std::env::var(var)
                .ok()
                .ok_or_else(|| LlmError::MissingApiKey {
                    profile: id.to_owned(),
                    var: var.clone(),
                })
        })
        .transpose()
}
