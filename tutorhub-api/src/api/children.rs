//! A parent's children

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;
use tutorhub_common::db::Role;
use tutorhub_common::resources::{entities, fields};

use crate::api::validate;
use crate::auth::AuthUser;
use crate::db::children::{self, ChildFields, ChildInformation};
use crate::error::{ApiError, ApiResult};
use crate::response::{created, ok, ApiJson, AppJson, AppPath};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildRequest {
    pub name: String,
    pub is_male: bool,
    pub birth_date: NaiveDate,
    pub image_url: Option<String>,
    pub medical_history: Option<String>,
}

impl ChildRequest {
    fn validate(&self) -> ApiResult<ChildFields<'_>> {
        let name = validate::required(&self.name, fields::CHILD_NAME)?;
        validate::not_in_future(self.birth_date, fields::BIRTH_DATE)?;
        Ok(ChildFields {
            name,
            is_male: self.is_male,
            birth_date: self.birth_date,
            image_url: self.image_url.as_deref(),
            medical_history: self.medical_history.as_deref(),
        })
    }
}

/// The child, if it belongs to `caller`
async fn find_own(state: &AppState, caller: &AuthUser, id: i64) -> ApiResult<ChildInformation> {
    let child = children::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::CHILD_INFORMATION))?;
    if child.parent_id != caller.id {
        return Err(ApiError::Forbidden);
    }
    Ok(child)
}

/// POST /api/v1/children
pub async fn create_child(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<ChildRequest>,
) -> ApiResult<ApiJson<ChildInformation>> {
    caller.require(&[Role::Parent])?;
    let child = req.validate()?;

    let id = children::insert(&state.db, caller.id, &child).await?;
    info!("Parent {} added child {}", caller.id, id);
    Ok(created(find_own(&state, &caller, id).await?))
}

/// GET /api/v1/children
pub async fn list_children(
    State(state): State<AppState>,
    caller: AuthUser,
) -> ApiResult<ApiJson<Vec<ChildInformation>>> {
    caller.require(&[Role::Parent])?;
    Ok(ok(children::list_for_parent(&state.db, caller.id).await?))
}

/// GET /api/v1/children/:id
pub async fn get_child(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<ApiJson<ChildInformation>> {
    Ok(ok(find_own(&state, &caller, id).await?))
}

/// PUT /api/v1/children/:id
pub async fn update_child(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<ChildRequest>,
) -> ApiResult<ApiJson<ChildInformation>> {
    find_own(&state, &caller, id).await?;
    let child = req.validate()?;

    children::update(&state.db, id, &child).await?;
    Ok(ok(find_own(&state, &caller, id).await?))
}

pub fn child_routes() -> Router<AppState> {
    Router::new()
        .route("/children", post(create_child).get(list_children))
        .route("/children/:id", get(get_child).put(update_child))
}
