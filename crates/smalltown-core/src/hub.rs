//! Fan-out of simulation notifications and the latest status.
//!
//! The scheduler publishes every [`Notification`] here and refreshes the
//! stored [`StatusSnapshot`] after each loop iteration. Any number of
//! subscribers may listen; a slow subscriber that falls more than
//! [`NOTIFICATION_CAPACITY`] messages behind skips ahead rather than
//! holding the town back.

use smalltown_types::{Notification, StatusSnapshot};
use tokio::sync::{RwLock, broadcast};
use tracing::trace;

use crate::operator::OperatorState;

/// Messages buffered per subscriber.
pub const NOTIFICATION_CAPACITY: usize = 256;

/// Broadcast channel plus status cache.
#[derive(Debug)]
pub struct NotificationHub {
    sender: broadcast::Sender<Notification>,
    status: RwLock<StatusSnapshot>,
}

impl NotificationHub {
    /// A hub with [`NOTIFICATION_CAPACITY`] buffering.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            sender,
            status: RwLock::new(StatusSnapshot::default()),
        }
    }

    /// Listen for future notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Send to every current subscriber. Returns how many received it;
    /// zero subscribers is not an error.
    pub fn publish(&self, notification: Notification) -> usize {
        self.sender.send(notification).unwrap_or_else(|_| {
            trace!("notification dropped, no subscribers");
            0
        })
    }

    /// Replace the cached status.
    pub async fn set_status(&self, status: StatusSnapshot) {
        *self.status.write().await = status;
    }

    /// The cached status with the live run state and uptime laid over it.
    pub async fn status(&self, operator: &OperatorState) -> StatusSnapshot {
        let mut status = self.status.read().await.clone();
        status.state = operator.run_state();
        status.uptime_ms = operator.uptime_ms();
        status
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use smalltown_types::{RunState, SimTime};

    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_notifications() {
        let hub = NotificationHub::new();
        let mut rx = hub.subscribe();
        let sent = hub.publish(Notification::TimeAdvanced {
            current_time: SimTime::from_hours(9),
            day_count: 1,
        });
        assert_eq!(sent, 1);
        let got = rx.recv().await.unwrap();
        assert!(matches!(got, Notification::TimeAdvanced { day_count: 1, .. }));
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let hub = NotificationHub::new();
        let sent = hub.publish(Notification::TimeAdvanced {
            current_time: SimTime::ZERO,
            day_count: 1,
        });
        assert_eq!(sent, 0);
    }

    #[tokio::test]
    async fn status_overlays_live_operator_state() {
        let hub = NotificationHub::new();
        hub.set_status(StatusSnapshot {
            state: RunState::Stopped,
            day_count: 3,
            ..StatusSnapshot::default()
        })
        .await;

        let operator = OperatorState::default();
        operator.start();
        let status = hub.status(&operator).await;
        assert_eq!(status.state, RunState::Running);
        assert_eq!(status.day_count, 3);
    }
}
