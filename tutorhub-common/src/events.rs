//! Event bus for in-process push notifications
//!
//! Handlers emit [`TutorHubEvent`]s after the corresponding rows are
//! committed; SSE connections subscribe and forward the events addressed to
//! their user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events pushed to connected clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TutorHubEvent {
    /// A notification row was stored for `receiver_id`
    NotificationCreated {
        notification_id: i64,
        receiver_id: i64,
        message: String,
        url_link: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Sessions were (re)generated for a student profile
    ///
    /// Sent to the tutor and the parent so open calendars refresh.
    SchedulesChanged {
        student_profile_id: i64,
        receiver_ids: Vec<i64>,
        timestamp: DateTime<Utc>,
    },
}

impl TutorHubEvent {
    /// Event type name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            TutorHubEvent::NotificationCreated { .. } => "NotificationCreated",
            TutorHubEvent::SchedulesChanged { .. } => "SchedulesChanged",
        }
    }

    /// Whether the event should be delivered to `user_id`
    pub fn is_addressed_to(&self, user_id: i64) -> bool {
        match self {
            TutorHubEvent::NotificationCreated { receiver_id, .. } => *receiver_id == user_id,
            TutorHubEvent::SchedulesChanged { receiver_ids, .. } => receiver_ids.contains(&user_id),
        }
    }
}

/// Broadcast channel shared by handlers and SSE streams
///
/// Cloning is cheap; all clones share the same channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TutorHubEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    ///
    /// ```
    /// use tutorhub_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<TutorHubEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: TutorHubEvent,
    ) -> Result<usize, broadcast::error::SendError<TutorHubEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Notifications are persisted before they are emitted, so a user with
    /// no open stream still sees them when listing.
    pub fn emit_lossy(&self, event: TutorHubEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(receiver_id: i64) -> TutorHubEvent {
        TutorHubEvent::NotificationCreated {
            notification_id: 1,
            receiver_id,
            message: "Your certificate was approved".to_string(),
            url_link: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_event_addressing() {
        assert!(notification(7).is_addressed_to(7));
        assert!(!notification(7).is_addressed_to(8));

        let changed = TutorHubEvent::SchedulesChanged {
            student_profile_id: 3,
            receiver_ids: vec![1, 2],
            timestamp: Utc::now(),
        };
        assert!(changed.is_addressed_to(2));
        assert!(!changed.is_addressed_to(3));
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let json = serde_json::to_value(notification(5)).unwrap();
        assert_eq!(json["type"], "NotificationCreated");
        assert_eq!(json["receiver_id"], 5);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(notification(1)).is_err());
        bus.emit_lossy(notification(1));
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        assert_eq!(bus.emit(notification(9)).unwrap(), 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type(), "NotificationCreated");
        assert!(received.is_addressed_to(9));
    }
}
