//! Curriculums: versioned teaching plans per age range

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
use crate::db::curriculums::{self, Curriculum, NewCurriculum};
use crate::db::versioning::{self, Versioned};
use crate::db::{Owner, ReviewFilter};
use crate::error::{ApiError, ApiResult};
use crate::notify;
use crate::pagination::{page_for, ListQuery};
use crate::response::{created, ok, paged, ApiJson, AppJson, AppPath, AppQuery};
use crate::AppState;

const ORDER: &[(&str, &str)] = &[("createdDate", "created_date"), ("ageFrom", "age_from")];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCurriculumRequest {
    pub age_from: i64,
    pub age_end: i64,
    pub description: String,
    /// Submit as a new version of this curriculum
    pub original_curriculum_id: Option<i64>,
}

async fn find(state: &AppState, id: i64) -> ApiResult<Curriculum> {
    curriculums::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::CURRICULUM))
}

/// POST /api/v1/curriculums
pub async fn create_curriculum(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<CreateCurriculumRequest>,
) -> ApiResult<ApiJson<Curriculum>> {
    caller.require(&[Role::Tutor])?;
    validate::age_range(req.age_from, req.age_end)?;
    let description = validate::required(&req.description, fields::DESCRIPTION)?;

    let (original_curriculum_id, version_number) = match req.original_curriculum_id {
        Some(original_id) => {
            let original = find(&state, original_id).await?;
            if original.tutor_id != Some(caller.id) {
                return Err(ApiError::Forbidden);
            }
            let (root, version) = review::next_version(&state.db, Versioned::Curriculum, original_id).await?;
            (Some(root), version)
        }
        None => {
            if curriculums::age_range_taken(&state.db, caller.id, req.age_from, req.age_end).await? {
                return Err(ApiError::duplicate(entities::CURRICULUM));
            }
            (None, 1)
        }
    };

    let id = curriculums::insert(
        &state.db,
        Owner::Tutor(caller.id),
        &NewCurriculum {
            age_from: req.age_from,
            age_end: req.age_end,
            description,
            original_curriculum_id,
            version_number,
        },
    )
    .await?;
    info!(
        "Tutor {} submitted curriculum {} (version {})",
        caller.id, id, version_number
    );
    notify::send_to_moderators(
        &state,
        &format!(
            "{} submitted a curriculum for ages {}-{}",
            caller.full_name, req.age_from, req.age_end
        ),
        Some(&format!("/curriculums/{}", id)),
    )
    .await;

    Ok(created(find(&state, id).await?))
}

/// GET /api/v1/curriculums
pub async fn list_curriculums(
    State(state): State<AppState>,
    caller: AuthUser,
    AppQuery(query): AppQuery<ListQuery>,
) -> ApiResult<ApiJson<Vec<Curriculum>>> {
    caller.require(&[Role::Tutor, Role::Staff, Role::Manager])?;

    let filter = ReviewFilter {
        owner_id: (!caller.is_moderator()).then_some(caller.id),
        status: query.approval_status()?,
        search: query.search_pattern(),
    };
    let total = curriculums::count(&state.db, &filter).await?;
    let page = page_for(total, &query, state.page_size());
    let rows = curriculums::list(
        &state.db,
        &filter,
        &query.order_clause(ORDER, "id"),
        page.page_size,
        page.offset(),
    )
    .await?;

    Ok(paged(rows, page))
}

/// GET /api/v1/curriculums/:id
///
/// Active curriculums are public through the tutor profile; anything else
/// is visible to its tutor and moderators only.
pub async fn get_curriculum(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<ApiJson<Curriculum>> {
    let curriculum = find(&state, id).await?;
    if !curriculum.is_active && !caller.is_moderator() && curriculum.tutor_id != Some(caller.id) {
        return Err(ApiError::Forbidden);
    }
    Ok(ok(curriculum))
}

/// GET /api/v1/curriculums/:id/versions
pub async fn list_curriculum_versions(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<ApiJson<Vec<Curriculum>>> {
    let curriculum = find(&state, id).await?;
    if !caller.is_moderator() && curriculum.tutor_id != Some(caller.id) {
        return Err(ApiError::Forbidden);
    }

    let root = versioning::lineage_root(&state.db, Versioned::Curriculum, id)
        .await?
        .unwrap_or(id);
    Ok(ok(curriculums::versions(&state.db, root).await?))
}

/// PUT /api/v1/curriculums/:id/status
pub async fn change_curriculum_status(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(change): AppJson<StatusChange>,
) -> ApiResult<ApiJson<Curriculum>> {
    caller.require_moderator()?;
    let (status, reason) = change.decision()?;

    let curriculum = find(&state, id).await?;
    if curriculum.request_status != ApprovalStatus::Pending
        || !review::review_version(&state.db, Versioned::Curriculum, id, status, reason, caller.id).await?
    {
        return Err(ApiError::already_processed(entities::CURRICULUM));
    }
    info!("Curriculum {} set to {} by {}", id, status, caller.id);

    if let Some(tutor_id) = curriculum.tutor_id {
        let message = match status {
            ApprovalStatus::Approve => format!(
                "Your curriculum for ages {}-{} (version {}) was approved",
                curriculum.age_from, curriculum.age_end, curriculum.version_number
            ),
            _ => format!(
                "Your curriculum for ages {}-{} was rejected: {}",
                curriculum.age_from,
                curriculum.age_end,
                reason.unwrap_or_default()
            ),
        };
        notify::send(&state, tutor_id, &message, Some(&format!("/curriculums/{}", id))).await;
    }

    Ok(ok(find(&state, id).await?))
}

/// DELETE /api/v1/curriculums/:id
pub async fn delete_curriculum(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<StatusCode> {
    let curriculum = find(&state, id).await?;
    if curriculum.tutor_id != Some(caller.id) {
        return Err(ApiError::Forbidden);
    }
    if curriculum.request_status != ApprovalStatus::Pending {
        return Err(review::only_pending_deletable(entities::CURRICULUM));
    }

    curriculums::soft_delete(&state.db, id).await?;
    info!("Tutor {} deleted curriculum {}", caller.id, id);
    Ok(StatusCode::NO_CONTENT)
}

pub fn curriculum_routes() -> Router<AppState> {
    Router::new()
        .route("/curriculums", post(create_curriculum).get(list_curriculums))
        .route("/curriculums/:id", get(get_curriculum).delete(delete_curriculum))
        .route("/curriculums/:id/versions", get(list_curriculum_versions))
        .route("/curriculums/:id/status", put(change_curriculum_status))
}
