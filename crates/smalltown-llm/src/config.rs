//! The `llm` section of `smalltown-config.yaml`.
//!
//! Each profile names one backend. Agents refer to profiles by id through
//! their `llm_profile`; ids that are not configured fall back to
//! [`LlmConfig::default_profile`]. API keys never live in the file: a
//! profile names the environment variable that holds its key.
//!
//! ```yaml
//! llm:
//!   default_profile: default
//!   profiles:
//!     default:
//!       kind: offline
//!       reply: "ACTION: WANDER"
//!     qwen-max:
//!       kind: dashscope
//!       model: qwen-max
//!       api_key_env: DASHSCOPE_API_KEY
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::LlmError;

/// Which wire format a profile speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// OpenAI-compatible chat completions (`OpenAI`, `DeepSeek`, Ollama).
    #[serde(rename = "openai", alias = "deepseek", alias = "ollama")]
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
    /// Alibaba `DashScope` text generation.
    #[serde(rename = "dashscope")]
    DashScope,
    /// No network: a fixed reply.
    #[default]
    Offline,
}

impl BackendKind {
    /// Base URL used when the profile gives none.
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::DashScope => "https://dashscope.aliyuncs.com/api/v1",
            Self::Offline => "",
        }
    }
}

/// One backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProfileConfig {
    /// Wire format.
    #[serde(default)]
    pub kind: BackendKind,

    /// API root. Defaults per kind.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Model identifier sent with each request.
    #[serde(default)]
    pub model: String,

    /// Environment variable holding the API key. Unset means no
    /// authentication, which suits local endpoints.
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Reply length cap.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Fixed reply of an offline profile.
    #[serde(default = "default_offline_reply")]
    pub reply: String,
}

impl ProfileConfig {
    /// An offline profile answering `reply`.
    pub fn offline(reply: impl Into<String>) -> Self {
        Self {
            kind: BackendKind::Offline,
            base_url: None,
            model: String::new(),
            api_key_env: None,
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            reply: reply.into(),
        }
    }

    /// The configured base URL or the kind's default, without a trailing
    /// slash.
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.kind.default_base_url())
            .trim_end_matches('/')
    }
}

/// Backend profiles and the fallback among them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Profile used for agents whose profile is not configured.
    pub default_profile: String,
    /// Profiles by id.
    pub profiles: BTreeMap<String, ProfileConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(
            default_profile_id(),
            ProfileConfig::offline(default_offline_reply()),
        );
        Self {
            default_profile: default_profile_id(),
            profiles,
        }
    }
}

/// Just the `llm` key of the shared file; every other section is ignored.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    llm: LlmConfig,
}

impl LlmConfig {
    /// Load the `llm` section from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Io`] if the file cannot be read, or
    /// [`LlmError::Yaml`] if it is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, LlmError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse the `llm` section from a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Yaml`] if the document is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, LlmError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: ConfigFile = serde_yml::from_str(yaml)?;
        Ok(file.llm)
    }
}

fn default_profile_id() -> String {
    "default".to_owned()
}

fn default_offline_reply() -> String {
    "ACTION: WANDER".to_owned()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_temperature() -> f64 {
    0.7
}

const fn default_max_tokens() -> u32 {
    512
}
