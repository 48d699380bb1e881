//! Syllabuses: versioned exercise plans per age range

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use tracing::info;
use tutorhub_common::db::{ApprovalStatus, Role};
use tutorhub_common::resources::{entities, fields};

use crate::api::review::{self, StatusChange};
use crate::api::validate;
use crate::auth::AuthUser;
use crate::db::exercises;
use crate::db::syllabuses::{self, NewSyllabus, Syllabus};
use crate::db::versioning::{self, Versioned};
use crate::db::ReviewFilter;
use crate::error::{ApiError, ApiResult};
use crate::notify;
use crate::pagination::{page_for, ListQuery};
use crate::response::{created, ok, paged, ApiJson, AppJson, AppPath, AppQuery};
use crate::AppState;

const ORDER: &[(&str, &str)] = &[("createdDate", "created_date"), ("ageFrom", "age_from")];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedExercise {
    pub exercise_type_id: i64,
    pub exercise_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSyllabusRequest {
    pub age_from: i64,
    pub age_end: i64,
    pub description: String,
    pub original_syllabus_id: Option<i64>,
    #[serde(default)]
    pub exercises: Vec<PlannedExercise>,
}

async fn find(state: &AppState, id: i64) -> ApiResult<Syllabus> {
    syllabuses::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::SYLLABUS))
}

/// POST /api/v1/syllabuses
///
/// Every planned exercise must be one of the tutor's approved, active
/// exercises of the named type.
pub async fn create_syllabus(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<CreateSyllabusRequest>,
) -> ApiResult<ApiJson<Syllabus>> {
    caller.require(&[Role::Tutor])?;
    validate::age_range(req.age_from, req.age_end)?;
    let description = validate::required(&req.description, fields::DESCRIPTION)?;

    let mut planned = Vec::with_capacity(req.exercises.len());
    for item in &req.exercises {
        if !exercises::is_usable(&state.db, item.exercise_id, caller.id, item.exercise_type_id).await? {
            return Err(ApiError::not_found(entities::EXERCISE));
        }
        let pair = (item.exercise_type_id, item.exercise_id);
        if !planned.contains(&pair) {
            planned.push(pair);
        }
    }

    let (original_syllabus_id, version_number) = match req.original_syllabus_id {
        Some(original_id) => {
            let original = find(&state, original_id).await?;
            if original.tutor_id != caller.id {
                return Err(ApiError::Forbidden);
            }
            let (root, version) = review::next_version(&state.db, Versioned::Syllabus, original_id).await?;
            (Some(root), version)
        }
        None => {
            if syllabuses::age_range_taken(&state.db, caller.id, req.age_from, req.age_end).await? {
                return Err(ApiError::duplicate(entities::SYLLABUS));
            }
            (None, 1)
        }
    };

    let mut tx = state.db.begin().await?;
    let id = syllabuses::insert(
        &mut *tx,
        caller.id,
        &NewSyllabus {
            age_from: req.age_from,
            age_end: req.age_end,
            description,
            original_syllabus_id,
            version_number,
            exercises: &planned,
        },
    )
    .await?;
    tx.commit().await?;

    info!(
        "Tutor {} submitted syllabus {} (version {}, {} exercises)",
        caller.id,
        id,
        version_number,
        planned.len()
    );
    notify::send_to_moderators(
        &state,
        &format!(
            "{} submitted a syllabus for ages {}-{}",
            caller.full_name, req.age_from, req.age_end
        ),
        Some(&format!("/syllabuses/{}", id)),
    )
    .await;

    Ok(created(find(&state, id).await?))
}

/// GET /api/v1/syllabuses
pub async fn list_syllabuses(
    State(state): State<AppState>,
    caller: AuthUser,
    AppQuery(query): AppQuery<ListQuery>,
) -> ApiResult<ApiJson<Vec<Syllabus>>> {
    caller.require(&[Role::Tutor, Role::Staff, Role::Manager])?;

    let filter = ReviewFilter {
        owner_id: (!caller.is_moderator()).then_some(caller.id),
        status: query.approval_status()?,
        search: query.search_pattern(),
    };
    let total = syllabuses::count(&state.db, &filter).await?;
    let page = page_for(total, &query, state.page_size());
    let rows = syllabuses::list(
        &state.db,
        &filter,
        &query.order_clause(ORDER, "id"),
        page.page_size,
        page.offset(),
    )
    .await?;

    Ok(paged(rows, page))
}

/// GET /api/v1/syllabuses/:id
pub async fn get_syllabus(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<ApiJson<Syllabus>> {
    let syllabus = find(&state, id).await?;
    if !syllabus.is_active && !caller.is_moderator() && syllabus.tutor_id != caller.id {
        return Err(ApiError::Forbidden);
    }
    Ok(ok(syllabus))
}

/// GET /api/v1/syllabuses/:id/versions
pub async fn list_syllabus_versions(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<ApiJson<Vec<Syllabus>>> {
    let syllabus = find(&state, id).await?;
    if !caller.is_moderator() && syllabus.tutor_id != caller.id {
        return Err(ApiError::Forbidden);
    }

    let root = versioning::lineage_root(&state.db, Versioned::Syllabus, id)
        .await?
        .unwrap_or(id);
    Ok(ok(syllabuses::versions(&state.db, root).await?))
}

/// PUT /api/v1/syllabuses/:id/status
pub async fn change_syllabus_status(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(change): AppJson<StatusChange>,
) -> ApiResult<ApiJson<Syllabus>> {
    caller.require_moderator()?;
    let (status, reason) = change.decision()?;

    let syllabus = find(&state, id).await?;
    if syllabus.request_status != ApprovalStatus::Pending
        || !review::review_version(&state.db, Versioned::Syllabus, id, status, reason, caller.id).await?
    {
        return Err(ApiError::already_processed(entities::SYLLABUS));
    }
    info!("Syllabus {} set to {} by {}", id, status, caller.id);

    let message = match status {
        ApprovalStatus::Approve => format!(
            "Your syllabus for ages {}-{} (version {}) was approved",
            syllabus.age_from, syllabus.age_end, syllabus.version_number
        ),
        _ => format!(
            "Your syllabus for ages {}-{} was rejected: {}",
            syllabus.age_from,
            syllabus.age_end,
            reason.unwrap_or_default()
        ),
    };
    notify::send(&state, syllabus.tutor_id, &message, Some(&format!("/syllabuses/{}", id))).await;

    Ok(ok(find(&state, id).await?))
}

/// DELETE /api/v1/syllabuses/:id
pub async fn delete_syllabus(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<StatusCode> {
    let syllabus = find(&state, id).await?;
    if syllabus.tutor_id != caller.id {
        return Err(ApiError::Forbidden);
    }
    if syllabus.request_status != ApprovalStatus::Pending {
        return Err(review::only_pending_deletable(entities::SYLLABUS));
    }

    syllabuses::soft_delete(&state.db, id).await?;
    info!("Tutor {} deleted syllabus {}", caller.id, id);
    Ok(StatusCode::NO_CONTENT)
}

pub fn syllabus_routes() -> Router<AppState> {
    Router::new()
        .route("/syllabuses", post(create_syllabus).get(list_syllabuses))
        .route("/syllabuses/:id", get(get_syllabus).delete(delete_syllabus))
        .route("/syllabuses/:id/versions", get(list_syllabus_versions))
        .route("/syllabuses/:id/status", put(change_syllabus_status))
}
