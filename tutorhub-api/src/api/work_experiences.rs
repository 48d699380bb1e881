//! Tutor work experiences and their review

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use tracing::info;
use tutorhub_common::db::{ApprovalStatus, Role};
use tutorhub_common::resources::entities;

use crate::api::registrations::WorkExperienceInput;
use crate::api::review::StatusChange;
use crate::auth::AuthUser;
use crate::db::moderation::{self, Moderated};
use crate::db::work_experiences::{self, WorkExperience};
use crate::db::{Owner, ReviewFilter};
use crate::error::{ApiError, ApiResult};
use crate::notify;
use crate::pagination::{page_for, ListQuery};
use crate::response::{created, ok, paged, ApiJson, AppJson, AppPath, AppQuery};
use crate::AppState;

const ORDER: &[(&str, &str)] = &[("createdDate", "created_date"), ("startDate", "start_date")];

async fn find(state: &AppState, id: i64) -> ApiResult<WorkExperience> {
    work_experiences::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::WORK_EXPERIENCE))
}

/// POST /api/v1/work-experiences
pub async fn create_work_experience(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<WorkExperienceInput>,
) -> ApiResult<ApiJson<WorkExperience>> {
    caller.require(&[Role::Tutor])?;
    let experience = req.validate()?;

    let id = work_experiences::insert(&state.db, Owner::Tutor(caller.id), &experience).await?;
    info!("Tutor {} submitted work experience {}", caller.id, id);
    notify::send_to_moderators(
        &state,
        &format!("{} submitted a work experience at {}", caller.full_name, experience.company_name),
        Some(&format!("/work-experiences/{}", id)),
    )
    .await;

    Ok(created(find(&state, id).await?))
}

/// GET /api/v1/work-experiences
pub async fn list_work_experiences(
    State(state): State<AppState>,
    caller: AuthUser,
    AppQuery(query): AppQuery<ListQuery>,
) -> ApiResult<ApiJson<Vec<WorkExperience>>> {
    caller.require(&[Role::Tutor, Role::Staff, Role::Manager])?;

    let filter = ReviewFilter {
        owner_id: (!caller.is_moderator()).then_some(caller.id),
        status: query.approval_status()?,
        search: query.search_pattern(),
    };
    let total = work_experiences::count(&state.db, &filter).await?;
    let page = page_for(total, &query, state.page_size());
    let rows = work_experiences::list(
        &state.db,
        &filter,
        &query.order_clause(ORDER, "id"),
        page.page_size,
        page.offset(),
    )
    .await?;

    Ok(paged(rows, page))
}

/// GET /api/v1/work-experiences/:id
pub async fn get_work_experience(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<ApiJson<WorkExperience>> {
    let experience = find(&state, id).await?;
    if !caller.is_moderator() && experience.tutor_id != Some(caller.id) {
        return Err(ApiError::Forbidden);
    }
    Ok(ok(experience))
}

/// PUT /api/v1/work-experiences/:id/status
pub async fn change_work_experience_status(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(change): AppJson<StatusChange>,
) -> ApiResult<ApiJson<WorkExperience>> {
    caller.require_moderator()?;
    let (status, reason) = change.decision()?;

    let experience = find(&state, id).await?;
    if experience.request_status != ApprovalStatus::Pending
        || !moderation::review(&state.db, Moderated::WorkExperiences, id, status, reason, caller.id).await?
    {
        return Err(ApiError::already_processed(entities::WORK_EXPERIENCE));
    }
    info!("Work experience {} set to {} by {}", id, status, caller.id);

    if let Some(tutor_id) = experience.tutor_id {
        let message = match status {
            ApprovalStatus::Approve => {
                format!("Your work experience at {} was approved", experience.company_name)
            }
            _ => format!(
                "Your work experience at {} was rejected: {}",
                experience.company_name,
                reason.unwrap_or_default()
            ),
        };
        notify::send(&state, tutor_id, &message, Some(&format!("/work-experiences/{}", id))).await;
    }

    Ok(ok(find(&state, id).await?))
}

/// DELETE /api/v1/work-experiences/:id
pub async fn delete_work_experience(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<StatusCode> {
    let experience = find(&state, id).await?;
    if experience.tutor_id != Some(caller.id) {
        return Err(ApiError::Forbidden);
    }

    work_experiences::soft_delete(&state.db, id).await?;
    info!("Tutor {} deleted work experience {}", caller.id, id);
    Ok(StatusCode::NO_CONTENT)
}

pub fn work_experience_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/work-experiences",
            post(create_work_experience).get(list_work_experiences),
        )
        .route(
            "/work-experiences/:id",
            get(get_work_experience).delete(delete_work_experience),
        )
        .route("/work-experiences/:id/status", put(change_work_experience_status))
}
