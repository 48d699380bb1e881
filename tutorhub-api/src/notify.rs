//! Notification hub
//!
//! A notification is stored first, then pushed to any open SSE stream of
//! its receiver. Notifications are side effects of an operation that has
//! already succeeded, so failures here are logged and swallowed.

use tracing::warn;
use tutorhub_common::events::TutorHubEvent;
use tutorhub_common::time;

use crate::db::{notifications, users};
use crate::mail::EmailMessage;
use crate::AppState;

/// Store and push a notification to one user
pub async fn send(state: &AppState, receiver_id: i64, message: &str, url_link: Option<&str>) {
    match notifications::insert(&state.db, receiver_id, message, url_link).await {
        Ok(notification_id) => state.event_bus.emit_lossy(TutorHubEvent::NotificationCreated {
            notification_id,
            receiver_id,
            message: message.to_string(),
            url_link: url_link.map(str::to_string),
            timestamp: time::now(),
        }),
        Err(e) => warn!("Could not store notification for user {}: {}", receiver_id, e),
    }
}

/// Notify every staff member and manager
pub async fn send_to_moderators(state: &AppState, message: &str, url_link: Option<&str>) {
    match users::moderator_ids(&state.db).await {
        Ok(ids) => {
            for id in ids {
                send(state, id, message, url_link).await;
            }
        }
        Err(e) => warn!("Could not load moderators for notification: {}", e),
    }
}

/// Queue an email
pub fn email(state: &AppState, message: EmailMessage) {
    state.mail.enqueue(message);
}

/// Absolute link into the client application
pub fn link(state: &AppState, path: &str) -> String {
    format!(
        "{}{}",
        state.config.api.public_base_url.trim_end_matches('/'),
        path
    )
}
