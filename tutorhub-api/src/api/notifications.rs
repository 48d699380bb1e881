//! The caller's notifications and their live stream

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use serde::Serialize;
use tracing::debug;
use tutorhub_common::resources::entities;

use crate::auth::AuthUser;
use crate::db::notifications::{self, Notification};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{page_for, ListQuery};
use crate::response::{ok, paged, ApiJson, AppPath, AppQuery};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedRead {
    pub updated: u64,
}

/// GET /api/v1/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    caller: AuthUser,
    AppQuery(query): AppQuery<ListQuery>,
) -> ApiResult<ApiJson<Vec<Notification>>> {
    let total = notifications::count_for(&state.db, caller.id).await?;
    let page = page_for(total, &query, state.page_size());
    let rows = notifications::list_for(&state.db, caller.id, page.page_size, page.offset()).await?;
    Ok(paged(rows, page))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    caller: AuthUser,
) -> ApiResult<ApiJson<UnreadCount>> {
    let unread_count = notifications::unread_count(&state.db, caller.id).await?;
    Ok(ok(UnreadCount { unread_count }))
}

/// PUT /api/v1/notifications/:id/read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<ApiJson<Notification>> {
    let notification = notifications::find_by_id(&state.db, id)
        .await?
        .filter(|n| n.receiver_id == caller.id)
        .ok_or_else(|| ApiError::not_found(entities::NOTIFICATION))?;

    if !notification.is_read {
        notifications::mark_read(&state.db, id).await?;
    }
    let notification = notifications::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::NOTIFICATION))?;
    Ok(ok(notification))
}

/// PUT /api/v1/notifications/read-all
pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    caller: AuthUser,
) -> ApiResult<ApiJson<MarkedRead>> {
    let updated = notifications::mark_all_read(&state.db, caller.id).await?;
    debug!("User {} marked {} notifications read", caller.id, updated);
    Ok(ok(MarkedRead { updated }))
}

/// GET /api/v1/notifications/stream
///
/// Server-Sent Events for the caller. Browsers cannot set headers on an
/// `EventSource`, so the token may also come as `?access_token=`.
pub async fn notification_stream(State(state): State<AppState>, caller: AuthUser) -> impl IntoResponse {
    tutorhub_common::sse::create_user_event_stream(&state.event_bus, caller.id)
}

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", put(mark_all_notifications_read))
        .route("/notifications/stream", get(notification_stream))
        .route("/notifications/:id/read", put(mark_notification_read))
}
