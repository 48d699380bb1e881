//! Exercise types managed by staff

use axum::{
    extract::State,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use tracing::info;
use tutorhub_common::db::Role;
use tutorhub_common::resources::{entities, fields};

use crate::api::validate;
use crate::auth::AuthUser;
use crate::db::exercise_types::{self, ExerciseType};
use crate::db::exercises::{self, Exercise};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{page_for, ListQuery};
use crate::response::{created, ok, paged, ApiJson, AppJson, AppPath, AppQuery};
use crate::AppState;

const ORDER: &[(&str, &str)] = &[
    ("createdDate", "created_date"),
    ("exerciseTypeName", "exercise_type_name"),
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseTypeRequest {
    pub exercise_type_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityRequest {
    pub is_hide: bool,
}

async fn find(state: &AppState, id: i64) -> ApiResult<ExerciseType> {
    exercise_types::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::EXERCISE_TYPE))
}

/// POST /api/v1/exercise-types
pub async fn create_exercise_type(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<ExerciseTypeRequest>,
) -> ApiResult<ApiJson<ExerciseType>> {
    caller.require_moderator()?;
    let name = validate::required(&req.exercise_type_name, fields::EXERCISE_TYPE_NAME)?;
    if exercise_types::name_exists(&state.db, name, None).await? {
        return Err(ApiError::duplicate(entities::EXERCISE_TYPE));
    }

    let id = exercise_types::insert(&state.db, name, caller.id).await?;
    info!("Exercise type {} ({}) created by {}", id, name, caller.id);
    Ok(created(find(&state, id).await?))
}

/// GET /api/v1/exercise-types
///
/// Hidden types are listed for moderators only.
pub async fn list_exercise_types(
    State(state): State<AppState>,
    caller: AuthUser,
    AppQuery(query): AppQuery<ListQuery>,
) -> ApiResult<ApiJson<Vec<ExerciseType>>> {
    let include_hidden = caller.is_moderator();
    let search = query.search_pattern();

    let total = exercise_types::count(&state.db, include_hidden, &search).await?;
    let page = page_for(total, &query, state.page_size());
    let rows = exercise_types::list(
        &state.db,
        include_hidden,
        &search,
        &query.order_clause(ORDER, "id"),
        page.page_size,
        page.offset(),
    )
    .await?;

    Ok(paged(rows, page))
}

/// PUT /api/v1/exercise-types/:id
pub async fn rename_exercise_type(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<ExerciseTypeRequest>,
) -> ApiResult<ApiJson<ExerciseType>> {
    caller.require_moderator()?;
    let name = validate::required(&req.exercise_type_name, fields::EXERCISE_TYPE_NAME)?;
    find(&state, id).await?;
    if exercise_types::name_exists(&state.db, name, Some(id)).await? {
        return Err(ApiError::duplicate(entities::EXERCISE_TYPE));
    }

    exercise_types::rename(&state.db, id, name).await?;
    Ok(ok(find(&state, id).await?))
}

/// PUT /api/v1/exercise-types/:id/visibility
pub async fn set_exercise_type_visibility(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<VisibilityRequest>,
) -> ApiResult<ApiJson<ExerciseType>> {
    caller.require_moderator()?;
    find(&state, id).await?;

    exercise_types::set_hidden(&state.db, id, req.is_hide).await?;
    info!("Exercise type {} hidden={} by {}", id, req.is_hide, caller.id);
    Ok(ok(find(&state, id).await?))
}

/// GET /api/v1/exercise-types/:id/exercises
///
/// Approved, active exercises of the type; a tutor sees only their own.
pub async fn list_exercises_of_type(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<ApiJson<Vec<Exercise>>> {
    let exercise_type = find(&state, id).await?;
    if exercise_type.is_hide && !caller.is_moderator() {
        return Err(ApiError::not_found(entities::EXERCISE_TYPE));
    }

    let tutor_id = (caller.role == Role::Tutor).then_some(caller.id);
    Ok(ok(exercises::active_of_type(&state.db, id, tutor_id).await?))
}

pub fn exercise_type_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/exercise-types",
            get(list_exercise_types).post(create_exercise_type),
        )
        .route("/exercise-types/:id", put(rename_exercise_type))
        .route("/exercise-types/:id/visibility", put(set_exercise_type_visibility))
        .route("/exercise-types/:id/exercises", get(list_exercises_of_type))
}
