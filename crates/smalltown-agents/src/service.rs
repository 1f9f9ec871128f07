//! The decision-service contract: text prompt in, text reply out.
//!
//! The simulation never cares how a reply is produced. It hands a prompt to
//! a [`DecisionService`] along with the agent's profile id and gets text
//! back, or a [`ServiceError`]. [`call_with_retry`] wraps one call in a
//! bounded retry loop with linearly growing delays.
//!
//! [`ScriptedService`] replays canned replies and is used in tests and for
//! running the town without network access.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, warn};

/// Errors from a decision-service call.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The request could not be sent or the connection failed.
    #[error("request failed: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("service returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnosis.
        body: String,
    },

    /// The response did not contain a reply.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// No backend is configured for the requested profile.
    #[error("no decision service for profile {0:?}")]
    UnknownProfile(String),

    /// Every attempt failed.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// The final failure.
        last: Box<ServiceError>,
    },
}

/// Something that turns prompts into replies.
///
/// `profile` selects the backend or model; implementations may ignore it.
pub trait DecisionService: Send + Sync {
    /// Produce a reply for `prompt`.
    fn complete(
        &self,
        profile: &str,
        prompt: &str,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send;
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

/// Bounded retry with linear backoff.
///
/// After failed attempt `n` (one-based) the caller sleeps `base_delay * n`
/// before trying again. No sleep follows the final attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least 1.
    pub max_attempts: u32,
    /// Delay unit.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1_000),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub const fn once() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay after failed attempt `attempt` (one-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Call `service` until it succeeds or `policy` runs out of attempts.
///
/// # Errors
///
/// Returns [`ServiceError::Exhausted`] carrying the last failure.
pub async fn call_with_retry<S: DecisionService + ?Sized>(
    service: &S,
    policy: RetryPolicy,
    profile: &str,
    prompt: &str,
) -> Result<String, ServiceError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 1;
    loop {
        match service.complete(profile, prompt).await {
            Ok(reply) => {
                debug!(profile, attempt, "decision service replied");
                return Ok(reply);
            }
            Err(e) if attempt >= attempts => {
                warn!(profile, attempts, error = %e, "decision service exhausted retries");
                return Err(ServiceError::Exhausted {
                    attempts,
                    last: Box::new(e),
                });
            }
            Err(e) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    profile,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "decision service call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt = attempt.saturating_add(1);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Scripted service
// ---------------------------------------------------------------------------

/// Replays queued replies in order, then falls back to a fixed reply.
///
/// Queued failures are returned as [`ServiceError::Transport`]. Every prompt
/// received is recorded for inspection.
#[derive(Debug, Default)]
pub struct ScriptedService {
    queue: Mutex<VecDeque<Result<String, ServiceError>>>,
    fallback: Option<String>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedService {
    /// A service that fails once its queue is empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// A service that always answers `reply` once its queue is empty.
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            fallback: Some(reply.into()),
            ..Self::default()
        }
    }

    /// Queue a successful reply.
    #[must_use]
    pub fn then_reply(self, reply: impl Into<String>) -> Self {
        self.push(Ok(reply.into()));
        self
    }

    /// Queue a failure.
    #[must_use]
    pub fn then_fail(self, reason: impl Into<String>) -> Self {
        self.push(Err(ServiceError::Transport(reason.into())));
        self
    }

    fn push(&self, item: Result<String, ServiceError>) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(item);
        }
    }

    /// `(profile, prompt)` pairs received so far.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or_default()
    }

    fn next_reply(&self, profile: &str, prompt: &str) -> Result<String, ServiceError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push((profile.to_owned(), prompt.to_owned()));
        }
        let queued = self.queue.lock().ok().and_then(|mut q| q.pop_front());
        match (queued, &self.fallback) {
            (Some(item), _) => item,
            (None, Some(reply)) => Ok(reply.clone()),
            (None, None) => Err(ServiceError::Transport("script exhausted".to_owned())),
        }
    }
}

impl DecisionService for ScriptedService {
    fn complete(
        &self,
        profile: &str,
        prompt: &str,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send {
        let reply = self.next_reply(profile, prompt);
        async move { reply }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn succeeds_first_try() {
        let service = ScriptedService::new().then_reply("ACTION: IDLE");
        let reply = call_with_retry(&service, RetryPolicy::default(), "p", "hello").await;
        assert_eq!(reply.unwrap(), "ACTION: IDLE");
        assert_eq!(service.calls(), 1);
        assert_eq!(service.prompts(), vec![("p".to_owned(), "hello".to_owned())]);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_with_linear_backoff() {
        let service = ScriptedService::new()
            .then_fail("boom")
            .then_fail("boom")
            .then_reply("ok");
        let started = tokio::time::Instant::now();
        let reply = call_with_retry(&service, RetryPolicy::default(), "p", "x").await;
        assert_eq!(reply.unwrap(), "ok");
        assert_eq!(service.calls(), 3);
        // 1s after the first failure, 2s after the second.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_last_error() {
        let service = ScriptedService::new()
            .then_fail("one")
            .then_fail("two")
            .then_fail("three");
        let err = call_with_retry(&service, RetryPolicy::default(), "p", "x")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ServiceError::Exhausted {
                attempts: 3,
                last: Box::new(ServiceError::Transport("three".to_owned())),
            }
        );
        assert_eq!(service.calls(), 3);
    }

    #[tokio::test]
    async fn single_attempt_policy_does_not_sleep() {
        let service = ScriptedService::new();
        let err = call_with_retry(&service, RetryPolicy::once(), "p", "x").await;
        assert!(matches!(err, Err(ServiceError::Exhausted { attempts: 1, .. })));
    }

    #[test]
    fn delays_grow_linearly() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(250),
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(250));
        assert_eq!(policy.delay_after(3), Duration::from_millis(750));
    }

    #[tokio::test]
    async fn fallback_after_queue() {
        let service = ScriptedService::always("ACTION: IDLE").then_reply("first");
        assert_eq!(service.complete("p", "x").await.unwrap(), "first");
        assert_eq!(service.complete("p", "x").await.unwrap(), "ACTION: IDLE");
    }
}
