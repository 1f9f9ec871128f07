//! Configuration parsing for the Smalltown simulation.
//!
//! Loads simulation parameters from `smalltown-config.yaml`. Every section
//! and field has a default, so an empty file yields the standard town.
//! Parsing only checks shape; [`SimulationConfig::validate`] checks ranges.
//!
//! The `llm` section of the same file belongs to the backend crate and is
//! ignored here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use smalltown_agents::{AgentProfile, RetryPolicy};
use smalltown_events::{CategoryWeights, ChainConfig, GeneratorConfig, ProcessorConfig};
use smalltown_types::MS_PER_SECOND;

use crate::operator::Settings;
use crate::perception::PerceptionSettings;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is out of range.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// An out-of-range setting. Nothing is changed when one is returned.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ValidationError {
    /// Time scale must be a positive, finite number.
    #[error("time scale must be greater than 0, got {0}")]
    TimeScale(f64),

    /// Event frequency is a probability.
    #[error("event frequency must be between 0 and 1, got {0}")]
    EventFrequency(f64),

    /// Category weights must be non-negative with a positive sum.
    #[error("event category weights must be non-negative and sum to more than 0")]
    CategoryWeights,

    /// Start hour must fall within a day.
    #[error("start hour must be below 24, got {0}")]
    StartHour(u64),

    /// A count or duration that must not be zero.
    #[error("{field} must be greater than 0")]
    Zero {
        /// Config path of the offending field.
        field: &'static str,
    },

    /// A radius that must be a positive, finite number.
    #[error("{field} must be greater than 0, got {value}")]
    Radius {
        /// Config path of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
}

/// Top-level configuration for the simulation.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Grid, seed, and tick timing.
    pub world: WorldConfig,
    /// Scheduler cadence and runtime-adjustable settings.
    pub scheduler: SchedulerConfig,
    /// What agents see when deciding.
    pub perception: PerceptionConfig,
    /// Per-agent memory.
    pub memory: MemoryConfig,
    /// Dialogue and interaction.
    pub interaction: InteractionConfig,
    /// Event generation, propagation, and chains.
    pub events: EventsConfig,
    /// Decision-service retry policy.
    pub service: ServiceConfig,
    /// Prompt templates.
    pub prompts: PromptsConfig,
    /// Log output.
    pub logging: LoggingConfig,
    /// Starting residents. Empty means the four default residents.
    pub residents: Vec<AgentProfile>,
}

impl SimulationConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the YAML is malformed.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Check every range constraint.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.world.start_hour >= 24 {
            return Err(ValidationError::StartHour(self.world.start_hour));
        }
        nonzero("world.tick_interval_ms", self.world.tick_interval_ms)?;
        nonzero("world.tick_sim_ms", self.world.tick_sim_ms)?;
        self.settings().validate()?;
        nonzero(
            "scheduler.processing_interval_secs",
            self.scheduler.processing_interval_secs,
        )?;
        nonzero("memory.capacity", self.memory.capacity)?;
        if !self.events.weights.is_valid() {
            return Err(ValidationError::CategoryWeights);
        }
        radius("events.local_radius", self.events.local_radius)?;
        radius("events.notify_radius", self.events.notify_radius)?;
        nonzero("events.max_active", self.events.max_active)?;
        nonzero("events.chain_rounds", self.events.chain_rounds)?;
        nonzero("service.max_attempts", self.service.max_attempts)?;
        Ok(())
    }

    /// Starting runtime settings.
    pub const fn settings(&self) -> Settings {
        Settings {
            time_scale: self.scheduler.time_scale,
            event_frequency: self.scheduler.event_frequency,
            auto_decisions: self.scheduler.auto_decisions,
        }
    }

    /// Minimum simulated gap between two decisions of one agent.
    pub const fn processing_interval_ms(&self) -> u64 {
        self.scheduler
            .processing_interval_secs
            .saturating_mul(MS_PER_SECOND)
    }

    /// Retry policy for decision-service calls.
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.service.max_attempts,
            base_delay: Duration::from_millis(self.service.base_delay_ms),
        }
    }

    /// Perception limits for decision prompts.
    pub const fn perception_settings(&self) -> PerceptionSettings {
        PerceptionSettings {
            nearby_radius: self.perception.nearby_radius,
            memory_count: self.perception.memory_count,
            recent_events: self.perception.recent_events,
        }
    }

    /// Settings for the synthetic event generator.
    pub const fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            min_interval_ms: self.events.min_interval_secs.saturating_mul(MS_PER_SECOND),
            max_active: self.events.max_active,
            weights: self.events.weights,
        }
    }

    /// Radii for event propagation.
    pub const fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            local_radius: self.events.local_radius,
            notify_radius: self.events.notify_radius,
        }
    }

    /// Bounds for event chains.
    pub fn chain_config(&self) -> ChainConfig {
        ChainConfig {
            rounds: self.events.chain_rounds,
            history_window: self.events.chain_history,
            default_duration_ms: self
                .events
                .event_duration_secs
                .saturating_mul(MS_PER_SECOND),
            profile: self.events.chain_profile.clone(),
            ..ChainConfig::default()
        }
    }
}

fn nonzero<T: Default + PartialEq>(field: &'static str, value: T) -> Result<(), ValidationError> {
    if value == T::default() {
        Err(ValidationError::Zero { field })
    } else {
        Ok(())
    }
}

fn radius(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::Radius { field, value })
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Grid, randomness, and tick timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Seed for stagger offsets, wandering, and event rolls.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Layout rows using the town terrain symbols. Empty means the
    /// built-in town.
    #[serde(default)]
    pub layout: Vec<String>,

    /// Real-time milliseconds between ticks at time scale 1.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Simulated milliseconds per tick at time scale 1.
    #[serde(default = "default_tick_sim_ms")]
    pub tick_sim_ms: u64,

    /// Hour of day 1 the clock starts at.
    #[serde(default = "default_start_hour")]
    pub start_hour: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            layout: Vec::new(),
            tick_interval_ms: default_tick_interval_ms(),
            tick_sim_ms: default_tick_sim_ms(),
            start_hour: default_start_hour(),
        }
    }
}

/// Scheduler cadence.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SchedulerConfig {
    /// Multiplier on simulated time per tick. Runtime-adjustable.
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,

    /// Per-tick probability of invoking the event engine. Runtime-adjustable.
    #[serde(default = "default_event_frequency")]
    pub event_frequency: f64,

    /// Whether agents decide on their own. Runtime-adjustable.
    #[serde(default = "default_true")]
    pub auto_decisions: bool,

    /// Minimum simulated seconds between two decisions of one agent.
    #[serde(default = "default_processing_interval_secs")]
    pub processing_interval_secs: u64,

    /// Floor on the real-time delay between ticks.
    #[serde(default = "default_min_real_delay_ms")]
    pub min_real_delay_ms: u64,

    /// Idle decisions stroll to a nearby tile instead of standing still.
    #[serde(default)]
    pub wander_when_idle: bool,

    /// Start ticking as soon as the engine is up.
    #[serde(default = "default_true")]
    pub autostart: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            time_scale: default_time_scale(),
            event_frequency: default_event_frequency(),
            auto_decisions: true,
            processing_interval_secs: default_processing_interval_secs(),
            min_real_delay_ms: default_min_real_delay_ms(),
            wander_when_idle: false,
            autostart: true,
        }
    }
}

/// What goes into a decision prompt.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PerceptionConfig {
    /// Agents within this many tiles (either axis) are listed.
    #[serde(default = "default_nearby_radius")]
    pub nearby_radius: u32,

    /// Memories shown, most important first.
    #[serde(default = "default_memory_count")]
    pub memory_count: usize,

    /// Recent event descriptions shown.
    #[serde(default = "default_recent_events")]
    pub recent_events: usize,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            nearby_radius: default_nearby_radius(),
            memory_count: default_memory_count(),
            recent_events: default_recent_events(),
        }
    }
}

/// Per-agent memory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MemoryConfig {
    /// Entries kept per agent.
    #[serde(default = "default_memory_capacity")]
    pub capacity: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_memory_capacity(),
        }
    }
}

/// Dialogue and interaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InteractionConfig {
    /// Chebyshev reach for talking and interacting.
    #[serde(default = "default_interaction_range")]
    pub range: u32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            range: default_interaction_range(),
        }
    }
}

/// Where events come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventMode {
    /// Weighted templates, no service calls.
    #[default]
    Synthetic,
    /// Event chains through the decision service.
    Chain,
}

/// Event generation, propagation, and chains.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventsConfig {
    /// Event source.
    #[serde(default)]
    pub mode: EventMode,

    /// Minimum simulated seconds between synthetic events.
    #[serde(default = "default_event_min_interval_secs")]
    pub min_interval_secs: u64,

    /// No synthetic event while this many are active.
    #[serde(default = "default_max_active_events")]
    pub max_active: usize,

    /// Synthetic category distribution.
    #[serde(default)]
    pub weights: CategoryWeights,

    /// Reach of local events, in tiles.
    #[serde(default = "default_local_radius")]
    pub local_radius: f64,

    /// Reach of bystander observations, in tiles.
    #[serde(default = "default_notify_radius")]
    pub notify_radius: f64,

    /// Rounds per top-level chain.
    #[serde(default = "default_chain_rounds")]
    pub chain_rounds: u32,

    /// History lines carried between chain rounds.
    #[serde(default = "default_chain_history")]
    pub chain_history: usize,

    /// Decision-service profile that writes chain events.
    #[serde(default = "default_chain_profile")]
    pub chain_profile: String,

    /// Duration of chain events whose reply gave none.
    #[serde(default = "default_event_duration_secs")]
    pub event_duration_secs: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            mode: EventMode::default(),
            min_interval_secs: default_event_min_interval_secs(),
            max_active: default_max_active_events(),
            weights: CategoryWeights::default(),
            local_radius: default_local_radius(),
            notify_radius: default_notify_radius(),
            chain_rounds: default_chain_rounds(),
            chain_history: default_chain_history(),
            chain_profile: default_chain_profile(),
            event_duration_secs: default_event_duration_secs(),
        }
    }
}

/// Decision-service retries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    /// Total attempts per call.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first failure; later delays grow linearly.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

/// Prompt templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Directory of `*.j2` overrides. Missing files use the built-ins.
    pub dir: Option<PathBuf>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Log output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_seed() -> u64 {
    42
}

const fn default_tick_interval_ms() -> u64 {
    1_000
}

const fn default_tick_sim_ms() -> u64 {
    1_000
}

const fn default_start_hour() -> u64 {
    8
}

const fn default_time_scale() -> f64 {
    1.0
}

const fn default_event_frequency() -> f64 {
    0.1
}

const fn default_processing_interval_secs() -> u64 {
    10
}

const fn default_min_real_delay_ms() -> u64 {
    50
}

const fn default_nearby_radius() -> u32 {
    3
}

const fn default_memory_count() -> usize {
    3
}

const fn default_recent_events() -> usize {
    5
}

const fn default_memory_capacity() -> usize {
    1_000
}

const fn default_interaction_range() -> u32 {
    1
}

const fn default_event_min_interval_secs() -> u64 {
    5
}

const fn default_max_active_events() -> usize {
    10
}

const fn default_local_radius() -> f64 {
    5.0
}

const fn default_notify_radius() -> f64 {
    8.0
}

const fn default_chain_rounds() -> u32 {
    2
}

const fn default_chain_history() -> usize {
    5
}

fn default_chain_profile() -> String {
    "default".to_owned()
}

const fn default_event_duration_secs() -> u64 {
    300
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = SimulationConfig::parse("{}").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.world.start_hour, 8);
        assert_eq!(config.scheduler.processing_interval_secs, 10);
        assert_eq!(config.perception.nearby_radius, 3);
        assert_eq!(config.memory.capacity, 1_000);
        assert_eq!(config.events.mode, EventMode::Synthetic);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_partial_sections_and_residents() {
        let yaml = r"
scheduler:
  time_scale: 4.0
  event_frequency: 0.25
events:
  mode: chain
  weights:
    social: 1.0
    environmental: 0.0
    personal: 0.0
    town: 0.0
logging:
  format: json
residents:
  - name: Ana
    position: { x: 2, y: 4 }
llm:
  default_profile: offline
";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert!((config.scheduler.time_scale - 4.0).abs() < f64::EPSILON);
        assert!(config.scheduler.auto_decisions);
        assert_eq!(config.events.mode, EventMode::Chain);
        assert!((config.events.weights.social - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.residents.len(), 1);
        assert_eq!(config.residents[0].llm_profile, "default");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        let err = SimulationConfig::parse("scheduler: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut config = SimulationConfig::default();
        config.scheduler.time_scale = 0.0;
        assert_eq!(config.validate(), Err(ValidationError::TimeScale(0.0)));

        let mut config = SimulationConfig::default();
        config.scheduler.event_frequency = 1.5;
        assert_eq!(config.validate(), Err(ValidationError::EventFrequency(1.5)));

        let mut config = SimulationConfig::default();
        config.memory.capacity = 0;
        assert_eq!(
            config.validate(),
            Err(ValidationError::Zero {
                field: "memory.capacity"
            })
        );

        let mut config = SimulationConfig::default();
        config.events.weights = CategoryWeights {
            social: 0.0,
            environmental: 0.0,
            personal: 0.0,
            town: 0.0,
        };
        assert_eq!(config.validate(), Err(ValidationError::CategoryWeights));

        let mut config = SimulationConfig::default();
        config.scheduler.processing_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn derived_component_configs_follow_sections() {
        let config = SimulationConfig::default();
        assert_eq!(config.processing_interval_ms(), 10_000);
        assert_eq!(config.generator_config().min_interval_ms, 5_000);
        assert_eq!(config.chain_config().rounds, 2);
        assert_eq!(config.chain_config().default_duration_ms, 300_000);
        assert_eq!(config.retry_policy().max_attempts, 3);
        assert_eq!(config.perception_settings().recent_events, 5);
    }
}
