//! Parents asking tutors to teach their child

use axum::{
    extract::State,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use tracing::info;
use tutorhub_common::db::{ApprovalStatus, Role};
use tutorhub_common::resources::entities;

use crate::api::review::StatusChange;
use crate::auth::AuthUser;
use crate::db::tutor_requests::{self, TutorRequest, TutorRequestFilter};
use crate::db::{children, tutors};
use crate::error::{ApiError, ApiResult};
use crate::mail::templates;
use crate::notify;
use crate::pagination::{page_for, ListQuery};
use crate::response::{created, ok, paged, ApiJson, AppJson, AppPath, AppQuery};
use crate::AppState;

const ORDER: &[(&str, &str)] = &[("createdDate", "r.created_date")];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTutorRequest {
    pub tutor_id: i64,
    pub child_id: i64,
    #[serde(default)]
    pub description: String,
}

async fn find(state: &AppState, id: i64) -> ApiResult<TutorRequest> {
    tutor_requests::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::TUTOR_REQUEST))
}

/// POST /api/v1/tutor-requests
pub async fn create_tutor_request(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<CreateTutorRequest>,
) -> ApiResult<ApiJson<TutorRequest>> {
    caller.require(&[Role::Parent])?;

    let child = children::find_by_id(&state.db, req.child_id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::CHILD_INFORMATION))?;
    if child.parent_id != caller.id {
        return Err(ApiError::Forbidden);
    }
    if !tutors::exists(&state.db, req.tutor_id).await? {
        return Err(ApiError::not_found(entities::TUTOR));
    }
    if tutor_requests::pending_exists(&state.db, caller.id, req.tutor_id, req.child_id).await? {
        return Err(ApiError::duplicate(entities::TUTOR_REQUEST));
    }

    let id = tutor_requests::insert(
        &state.db,
        caller.id,
        req.tutor_id,
        req.child_id,
        req.description.trim(),
    )
    .await?;
    let request = find(&state, id).await?;
    info!(
        "Parent {} requested tutor {} for child {}",
        caller.id, req.tutor_id, req.child_id
    );

    let path = format!("/tutor-requests/{}", id);
    notify::send(
        &state,
        request.tutor_id,
        &format!("{} asked you to teach {}", request.parent_name, request.child_name),
        Some(&path),
    )
    .await;
    notify::email(
        &state,
        templates::tutor_request_received(
            &request.tutor_email,
            &request.tutor_name,
            &request.parent_name,
            &request.child_name,
            &request.description,
            &notify::link(&state, &path),
        ),
    );

    Ok(created(request))
}

/// GET /api/v1/tutor-requests
///
/// Parents see the requests they sent, tutors the ones they received.
pub async fn list_tutor_requests(
    State(state): State<AppState>,
    caller: AuthUser,
    AppQuery(query): AppQuery<ListQuery>,
) -> ApiResult<ApiJson<Vec<TutorRequest>>> {
    let mut filter = TutorRequestFilter {
        status: query.approval_status()?,
        search: query.search_pattern(),
        ..Default::default()
    };
    match caller.role {
        Role::Parent => filter.parent_id = Some(caller.id),
        Role::Tutor => filter.tutor_id = Some(caller.id),
        Role::Staff | Role::Manager => {}
    }

    let total = tutor_requests::count(&state.db, &filter).await?;
    let page = page_for(total, &query, state.page_size());
    let rows = tutor_requests::list(
        &state.db,
        &filter,
        &query.order_clause(ORDER, "r.id"),
        page.page_size,
        page.offset(),
    )
    .await?;

    Ok(paged(rows, page))
}

/// GET /api/v1/tutor-requests/:id
pub async fn get_tutor_request(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<ApiJson<TutorRequest>> {
    let request = find(&state, id).await?;
    if !caller.is_moderator() && request.parent_id != caller.id && request.tutor_id != caller.id {
        return Err(ApiError::Forbidden);
    }
    Ok(ok(request))
}

/// PUT /api/v1/tutor-requests/:id/status
pub async fn answer_tutor_request(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(change): AppJson<StatusChange>,
) -> ApiResult<ApiJson<TutorRequest>> {
    caller.require(&[Role::Tutor])?;
    let (status, reason) = change.decision()?;

    let request = find(&state, id).await?;
    if request.tutor_id != caller.id {
        return Err(ApiError::Forbidden);
    }
    if request.request_status != ApprovalStatus::Pending
        || !tutor_requests::answer(&state.db, id, status, reason).await?
    {
        return Err(ApiError::already_processed(entities::TUTOR_REQUEST));
    }
    info!("Tutor {} answered request {} with {}", caller.id, id, status);

    let approved = status == ApprovalStatus::Approve;
    let path = format!("/tutor-requests/{}", id);
    let message = if approved {
        format!("{} accepted your request for {}", request.tutor_name, request.child_name)
    } else {
        format!(
            "{} declined your request for {}: {}",
            request.tutor_name,
            request.child_name,
            reason.unwrap_or_default()
        )
    };
    notify::send(&state, request.parent_id, &message, Some(&path)).await;
    notify::email(
        &state,
        templates::tutor_request_answered(
            &request.parent_email,
            &request.parent_name,
            &request.tutor_name,
            &request.child_name,
            approved,
            reason,
            &notify::link(&state, &path),
        ),
    );

    Ok(ok(find(&state, id).await?))
}

pub fn tutor_request_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/tutor-requests",
            post(create_tutor_request).get(list_tutor_requests),
        )
        .route("/tutor-requests/:id", get(get_tutor_request))
        .route("/tutor-requests/:id/status", put(answer_tutor_request))
}
