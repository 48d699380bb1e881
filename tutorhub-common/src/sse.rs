//! Server-Sent Events (SSE) utilities

use crate::events::{EventBus, TutorHubEvent};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Create an SSE stream of the events addressed to one user
///
/// Sends a `ConnectionStatus` event on connect, then forwards every event
/// for which [`TutorHubEvent::is_addressed_to`] holds. A comment heartbeat
/// is sent every 15 seconds.
pub fn create_user_event_stream(
    event_bus: &EventBus,
    user_id: i64,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected for user {}", user_id);

    let mut rx = event_bus.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            tokio::select! {
                _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {
                    debug!("SSE: Sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                received = rx.recv() => {
                    match received {
                        Ok(event) if event.is_addressed_to(user_id) => {
                            match sse_event(&event) {
                                Ok(sse) => yield Ok(sse),
                                Err(e) => warn!("SSE: Failed to serialize event {}: {}", event.event_type(), e),
                            }
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("SSE: user {} stream lagged, {} events skipped", user_id, skipped);
                        }
                        Err(RecvError::Closed) => {
                            info!("SSE: event bus closed, ending stream for user {}", user_id);
                            break;
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}

/// Convert an event into an SSE frame named after its type
pub fn sse_event(event: &TutorHubEvent) -> serde_json::Result<Event> {
    let data = serde_json::to_string(event)?;
    Ok(Event::default().event(event.event_type()).data(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_sse_event_serializes() {
        let event = TutorHubEvent::NotificationCreated {
            notification_id: 4,
            receiver_id: 2,
            message: "hello".to_string(),
            url_link: Some("/student-profiles/1".to_string()),
            timestamp: Utc::now(),
        };
        assert!(sse_event(&event).is_ok());
    }

    #[tokio::test]
    async fn test_stream_creation_subscribes() {
        let bus = EventBus::new(10);
        let _sse = create_user_event_stream(&bus, 1);
        assert_eq!(bus.subscriber_count(), 1);
    }
}
