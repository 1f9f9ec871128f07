//! Operator control state for runtime simulation management.
//!
//! This module provides shared state used by the scheduler loop and
//! whatever control surface sits in front of it. An operator can start,
//! pause, stop, and reset the town, change its settings, and request a
//! clean shutdown, all without stopping the process.
//!
//! # State machine
//!
//! ```text
//!            start                pause
//! Stopped ---------> Running <---------> Paused
//!    ^                  |        start      |
//!    |      stop        |                   |
//!    +------------------+-------------------+
//! ```
//!
//! Transitions are lock-free. Every successful transition wakes the
//! scheduler loop, which picks up the new state at its next tick boundary.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU8, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use smalltown_types::RunState;
use tokio::sync::{Notify, RwLock};
use tracing::info;

use crate::config::ValidationError;

/// Settings an operator may change while the town runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Multiplier on simulated time per tick and on tick rate. Positive.
    pub time_scale: f64,
    /// Per-tick probability of running the event engine, in `[0, 1]`.
    pub event_frequency: f64,
    /// Whether agents decide on their own.
    pub auto_decisions: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            event_frequency: 0.1,
            auto_decisions: true,
        }
    }
}

impl Settings {
    /// Check every range constraint.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TimeScale`] for a time scale that is not a
    /// positive finite number, and [`ValidationError::EventFrequency`] for a
    /// frequency outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.time_scale.is_finite() || self.time_scale <= 0.0 {
            return Err(ValidationError::TimeScale(self.time_scale));
        }
        if !(0.0..=1.0).contains(&self.event_frequency) {
            return Err(ValidationError::EventFrequency(self.event_frequency));
        }
        Ok(())
    }
}

/// A partial settings change. Unset fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsUpdate {
    /// New time scale.
    pub time_scale: Option<f64>,
    /// New event frequency.
    pub event_frequency: Option<f64>,
    /// New auto-decision flag.
    pub auto_decisions: Option<bool>,
}

impl SettingsUpdate {
    /// `current` with this update laid over it.
    pub fn apply(self, current: Settings) -> Settings {
        Settings {
            time_scale: self.time_scale.unwrap_or(current.time_scale),
            event_frequency: self.event_frequency.unwrap_or(current.event_frequency),
            auto_decisions: self.auto_decisions.unwrap_or(current.auto_decisions),
        }
    }
}

const fn encode(state: RunState) -> u8 {
    match state {
        RunState::Stopped => 0,
        RunState::Running => 1,
        RunState::Paused => 2,
    }
}

const fn decode(raw: u8) -> RunState {
    match raw {
        1 => RunState::Running,
        2 => RunState::Paused,
        _ => RunState::Stopped,
    }
}

/// Shared operator control state.
///
/// Wrapped in an `Arc` and shared between the scheduler loop and the
/// control surface. Run state and flags are atomics so the loop reads them
/// without locking.
#[derive(Debug)]
pub struct OperatorState {
    /// Encoded [`RunState`].
    state: AtomicU8,

    /// Wakes the scheduler loop after any change.
    changed: Notify,

    /// Whether a process shutdown has been requested.
    shutdown: AtomicBool,

    /// Whether a town reset is waiting for the loop.
    reset_requested: AtomicBool,

    /// Runtime-adjustable settings.
    settings: RwLock<Settings>,

    /// Wall-clock epoch milliseconds of the last start. Zero when stopped.
    started_at_ms: AtomicI64,
}

impl OperatorState {
    /// A stopped operator with the given starting settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            state: AtomicU8::new(encode(RunState::Stopped)),
            changed: Notify::new(),
            shutdown: AtomicBool::new(false),
            reset_requested: AtomicBool::new(false),
            settings: RwLock::new(settings),
            started_at_ms: AtomicI64::new(0),
        }
    }

    /// Current run state.
    pub fn run_state(&self) -> RunState {
        decode(self.state.load(Ordering::Acquire))
    }

    /// Wait until something changes.
    pub async fn changed(&self) {
        self.changed.notified().await;
    }

    fn wake(&self) {
        self.changed.notify_one();
    }

    /// Apply `step` to the run state atomically. Returns the previous state
    /// if `step` allowed the transition.
    fn transition(&self, step: impl Fn(RunState) -> Option<RunState>) -> Option<RunState> {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                step(decode(raw)).map(encode)
            })
            .ok()
            .map(decode)
    }

    // -----------------------------------------------------------------------
    // Start / Pause / Stop
    // -----------------------------------------------------------------------

    /// Start or resume. Returns `false` if already running.
    ///
    /// Starting from Stopped records the wall-clock start time. Resuming
    /// from Paused keeps it.
    pub fn start(&self) -> bool {
        let previous = self.transition(|state| {
            (state != RunState::Running).then_some(RunState::Running)
        });
        match previous {
            Some(RunState::Stopped) => {
                self.started_at_ms
                    .store(Utc::now().timestamp_millis(), Ordering::Release);
                info!("Simulation started");
            }
            Some(_) => info!("Simulation resumed"),
            None => return false,
        }
        self.wake();
        true
    }

    /// Pause a running town. Returns `false` in any other state.
    pub fn pause(&self) -> bool {
        let paused = self
            .transition(|state| (state == RunState::Running).then_some(RunState::Paused))
            .is_some();
        if paused {
            info!("Simulation paused");
            self.wake();
        }
        paused
    }

    /// Stop a running or paused town and clear its uptime. Returns `false`
    /// if already stopped.
    pub fn stop(&self) -> bool {
        let stopped = self
            .transition(|state| (state != RunState::Stopped).then_some(RunState::Stopped))
            .is_some();
        if stopped {
            self.started_at_ms.store(0, Ordering::Release);
            info!("Simulation stopped");
            self.wake();
        }
        stopped
    }

    /// Wall-clock milliseconds since the last start. Zero when stopped.
    pub fn uptime_ms(&self) -> u64 {
        let started = self.started_at_ms.load(Ordering::Acquire);
        if started == 0 || self.run_state() == RunState::Stopped {
            return 0;
        }
        let elapsed = Utc::now().timestamp_millis().saturating_sub(started);
        u64::try_from(elapsed.max(0)).unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Reset / Shutdown
    // -----------------------------------------------------------------------

    /// Ask the loop to restore the town to its initial state and stop.
    pub fn request_reset(&self) {
        self.reset_requested.store(true, Ordering::Release);
        self.wake();
    }

    /// Whether a reset is waiting for the loop.
    pub fn is_reset_requested(&self) -> bool {
        self.reset_requested.load(Ordering::Acquire)
    }

    /// Consume a pending reset request.
    pub fn take_reset(&self) -> bool {
        self.reset_requested.swap(false, Ordering::AcqRel)
    }

    /// Ask the loop to exit.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.wake();
    }

    /// Whether a shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    /// Current settings.
    pub async fn settings(&self) -> Settings {
        *self.settings.read().await
    }

    /// Validate and store a settings change. Nothing is stored on error.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] of the first out-of-range value.
    pub async fn apply_settings(&self, update: SettingsUpdate) -> Result<Settings, ValidationError> {
        let mut guard = self.settings.write().await;
        let next = update.apply(*guard);
        next.validate()?;
        *guard = next;
        info!(
            time_scale = next.time_scale,
            event_frequency = next.event_frequency,
            auto_decisions = next.auto_decisions,
            "Settings updated"
        );
        drop(guard);
        self.wake();
        Ok(next)
    }
}

impl Default for OperatorState {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
