//! Engine binary for the Smalltown simulation.
//!
//! Loads configuration, builds the town and its decision backends, and
//! drives the scheduler loop until Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `smalltown-config.yaml` (or `SMALLTOWN_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Load prompt templates
//! 4. Build the town and its residents
//! 5. Build one decision backend per LLM profile
//! 6. Create operator state and the notification hub
//! 7. Run the scheduler loop until shutdown
//! 8. Log the result

mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use smalltown_agents::PromptEngine;
use smalltown_core::{LogFormat, NotificationHub, OperatorState, Simulation, SimulationConfig};
use smalltown_llm::{LlmConfig, ProfileRouter};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Environment variable overriding the config file path.
const CONFIG_ENV: &str = "SMALLTOWN_CONFIG";

/// Config file used when [`CONFIG_ENV`] is unset.
const DEFAULT_CONFIG_PATH: &str = "smalltown-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let path = config_path();
    let config = load_config(&path)?;

    // 2. Initialize structured logging.
    init_logging(&config)?;
    info!(
        path = %path.display(),
        seed = config.world.seed,
        tick_interval_ms = config.world.tick_interval_ms,
        time_scale = config.scheduler.time_scale,
        event_mode = ?config.events.mode,
        "Configuration loaded"
    );

    // 3. Load prompt templates.
    let prompts = match &config.prompts.dir {
        Some(dir) => {
            info!(dir = %dir.display(), "Loading prompt templates");
            PromptEngine::from_dir(dir).map_err(EngineError::from)?
        }
        None => PromptEngine::builtin().map_err(EngineError::from)?,
    };

    // 4. Build the town.
    let settings = config.settings();
    let autostart = config.scheduler.autostart;
    let mut sim = Simulation::new(config, prompts).map_err(EngineError::from)?;

    // 5. Build decision backends.
    let llm_config = if path.exists() {
        LlmConfig::from_file(&path).map_err(EngineError::from)?
    } else {
        LlmConfig::default()
    };
    let router = ProfileRouter::from_config(&llm_config).map_err(EngineError::from)?;

    // 6. Operator controls and notifications.
    let operator = Arc::new(OperatorState::new(settings));
    let hub = NotificationHub::new();
    if autostart {
        operator.start();
        info!("Autostart enabled, simulation running");
    } else {
        info!("Simulation stopped, waiting for start");
    }

    spawn_ctrl_c_handler(Arc::clone(&operator));

    // 7. Run until shutdown.
    let summary = smalltown_core::run(&mut sim, &router, &operator, &hub).await;

    // 8. Log results.
    info!(
        total_ticks = summary.total_ticks,
        failed_ticks = summary.failed_ticks,
        day = sim.clock().day(),
        "smalltown-engine shutdown complete"
    );

    Ok(())
}

/// The config file path: `SMALLTOWN_CONFIG` or `smalltown-config.yaml`.
fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV).map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load the simulation configuration, or defaults when the file is absent.
fn load_config(path: &Path) -> Result<SimulationConfig, EngineError> {
    if path.exists() {
        Ok(SimulationConfig::from_file(path)?)
    } else {
        // Logging is not up yet.
        eprintln!("config file {} not found, using defaults", path.display());
        Ok(SimulationConfig::default())
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_logging(config: &SimulationConfig) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .map_err(|e| EngineError::Logging {
            filter: config.logging.level.clone(),
            message: e.to_string(),
        })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
    Ok(())
}

/// Request a shutdown on Ctrl-C. The loop exits at the next tick boundary.
fn spawn_ctrl_c_handler(operator: Arc<OperatorState>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                operator.request_shutdown();
            }
            Err(e) => error!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });
}
