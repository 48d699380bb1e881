//! Exercises: versioned activities a tutor uses in sessions

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
use crate::db::exercise_types;
use crate::db::exercises::{self, Exercise, NewExercise};
use crate::db::versioning::{self, Versioned};
use crate::db::ReviewFilter;
use crate::error::{ApiError, ApiResult};
use crate::notify;
use crate::pagination::{page_for, ListQuery};
use crate::response::{created, ok, paged, ApiJson, AppJson, AppPath, AppQuery};
use crate::AppState;

const ORDER: &[(&str, &str)] = &[
    ("createdDate", "e.created_date"),
    ("exerciseName", "e.exercise_name"),
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExerciseRequest {
    pub exercise_type_id: i64,
    pub exercise_name: String,
    #[serde(default)]
    pub description: String,
    pub original_exercise_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseTypeQuery {
    pub exercise_type_id: Option<i64>,
}

async fn find(state: &AppState, id: i64) -> ApiResult<Exercise> {
    exercises::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::EXERCISE))
}

/// POST /api/v1/exercises
pub async fn create_exercise(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<CreateExerciseRequest>,
) -> ApiResult<ApiJson<Exercise>> {
    caller.require(&[Role::Tutor])?;
    let exercise_name = validate::required(&req.exercise_name, fields::EXERCISE_NAME)?;

    let exercise_type = exercise_types::find_by_id(&state.db, req.exercise_type_id)
        .await?
        .filter(|t| !t.is_hide)
        .ok_or_else(|| ApiError::not_found(entities::EXERCISE_TYPE))?;

    let (original_exercise_id, version_number) = match req.original_exercise_id {
        Some(original_id) => {
            let original = find(&state, original_id).await?;
            if original.tutor_id != caller.id {
                return Err(ApiError::Forbidden);
            }
            let (root, version) = review::next_version(&state.db, Versioned::Exercise, original_id).await?;
            (Some(root), version)
        }
        None => {
            if exercises::name_exists_for_tutor(&state.db, caller.id, exercise_name).await? {
                return Err(ApiError::duplicate(entities::EXERCISE));
            }
            (None, 1)
        }
    };

    let id = exercises::insert(
        &state.db,
        caller.id,
        &NewExercise {
            exercise_type_id: exercise_type.id,
            exercise_name,
            description: req.description.trim(),
            original_exercise_id,
            version_number,
        },
    )
    .await?;
    info!(
        "Tutor {} submitted exercise {} (version {})",
        caller.id, id, version_number
    );
    notify::send_to_moderators(
        &state,
        &format!("{} submitted the exercise \"{}\"", caller.full_name, exercise_name),
        Some(&format!("/exercises/{}", id)),
    )
    .await;

    Ok(created(find(&state, id).await?))
}

/// GET /api/v1/exercises
pub async fn list_exercises(
    State(state): State<AppState>,
    caller: AuthUser,
    AppQuery(query): AppQuery<ListQuery>,
    AppQuery(by_type): AppQuery<ExerciseTypeQuery>,
) -> ApiResult<ApiJson<Vec<Exercise>>> {
    caller.require(&[Role::Tutor, Role::Staff, Role::Manager])?;

    let filter = ReviewFilter {
        owner_id: (!caller.is_moderator()).then_some(caller.id),
        status: query.approval_status()?,
        search: query.search_pattern(),
    };
    let total = exercises::count(&state.db, &filter, by_type.exercise_type_id).await?;
    let page = page_for(total, &query, state.page_size());
    let rows = exercises::list(
        &state.db,
        &filter,
        by_type.exercise_type_id,
        &query.order_clause(ORDER, "e.id"),
        page.page_size,
        page.offset(),
    )
    .await?;

    Ok(paged(rows, page))
}

/// GET /api/v1/exercises/:id
pub async fn get_exercise(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<ApiJson<Exercise>> {
    let exercise = find(&state, id).await?;
    if !exercise.is_active && !caller.is_moderator() && exercise.tutor_id != caller.id {
        return Err(ApiError::Forbidden);
    }
    Ok(ok(exercise))
}

/// GET /api/v1/exercises/:id/versions
pub async fn list_exercise_versions(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<ApiJson<Vec<Exercise>>> {
    let exercise = find(&state, id).await?;
    if !caller.is_moderator() && exercise.tutor_id != caller.id {
        return Err(ApiError::Forbidden);
    }

    let root = versioning::lineage_root(&state.db, Versioned::Exercise, id)
        .await?
        .unwrap_or(id);
    Ok(ok(exercises::versions(&state.db, root).await?))
}

/// PUT /api/v1/exercises/:id/status
pub async fn change_exercise_status(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(change): AppJson<StatusChange>,
) -> ApiResult<ApiJson<Exercise>> {
    caller.require_moderator()?;
    let (status, reason) = change.decision()?;

    let exercise = find(&state, id).await?;
    if exercise.request_status != ApprovalStatus::Pending
        || !review::review_version(&state.db, Versioned::Exercise, id, status, reason, caller.id).await?
    {
        return Err(ApiError::already_processed(entities::EXERCISE));
    }
    info!("Exercise {} set to {} by {}", id, status, caller.id);

    let message = match status {
        ApprovalStatus::Approve => format!("Your exercise \"{}\" was approved", exercise.exercise_name),
        _ => format!(
            "Your exercise \"{}\" was rejected: {}",
            exercise.exercise_name,
            reason.unwrap_or_default()
        ),
    };
    notify::send(&state, exercise.tutor_id, &message, Some(&format!("/exercises/{}", id))).await;

    Ok(ok(find(&state, id).await?))
}

/// DELETE /api/v1/exercises/:id
pub async fn delete_exercise(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<StatusCode> {
    let exercise = find(&state, id).await?;
    if exercise.tutor_id != caller.id {
        return Err(ApiError::Forbidden);
    }
    if exercise.request_status != ApprovalStatus::Pending {
        return Err(review::only_pending_deletable(entities::EXERCISE));
    }

    exercises::soft_delete(&state.db, id).await?;
    info!("Tutor {} deleted exercise {}", caller.id, id);
    Ok(StatusCode::NO_CONTENT)
}

pub fn exercise_routes() -> Router<AppState> {
    Router::new()
        .route("/exercises", post(create_exercise).get(list_exercises))
        .route("/exercises/:id", get(get_exercise).delete(delete_exercise))
        .route("/exercises/:id/versions", get(list_exercise_versions))
        .route("/exercises/:id/status", put(change_exercise_status))
}
