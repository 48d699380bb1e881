//! Tutor certificates and their review

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use tracing::info;
use tutorhub_common::db::{ApprovalStatus, Role};
use tutorhub_common::resources::entities;

use crate::api::registrations::CertificateInput;
use crate::api::review::StatusChange;
use crate::auth::AuthUser;
use crate::db::certificates::{self, Certificate};
use crate::db::moderation::{self, Moderated};
use crate::db::{Owner, ReviewFilter};
use crate::error::{ApiError, ApiResult};
use crate::notify;
use crate::pagination::{page_for, ListQuery};
use crate::response::{created, ok, paged, ApiJson, AppJson, AppPath, AppQuery};
use crate::AppState;

const ORDER: &[(&str, &str)] = &[
    ("createdDate", "created_date"),
    ("issuingDate", "issuing_date"),
    ("certificateName", "certificate_name"),
];

async fn find(state: &AppState, id: i64) -> ApiResult<Certificate> {
    certificates::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::CERTIFICATE))
}

/// POST /api/v1/certificates
pub async fn create_certificate(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<CertificateInput>,
) -> ApiResult<ApiJson<Certificate>> {
    caller.require(&[Role::Tutor])?;
    let certificate = req.validate()?;

    if certificates::name_exists_for_tutor(&state.db, caller.id, certificate.certificate_name).await? {
        return Err(ApiError::duplicate(entities::CERTIFICATE));
    }

    let mut conn = state.db.acquire().await?;
    let id = certificates::insert(&mut conn, Owner::Tutor(caller.id), &certificate).await?;
    drop(conn);

    info!("Tutor {} submitted certificate {}", caller.id, id);
    notify::send_to_moderators(
        &state,
        &format!("{} submitted the certificate \"{}\"", caller.full_name, certificate.certificate_name),
        Some(&format!("/certificates/{}", id)),
    )
    .await;

    Ok(created(find(&state, id).await?))
}

/// GET /api/v1/certificates
///
/// Moderators see every tutor's certificates, tutors only their own.
pub async fn list_certificates(
    State(state): State<AppState>,
    caller: AuthUser,
    AppQuery(query): AppQuery<ListQuery>,
) -> ApiResult<ApiJson<Vec<Certificate>>> {
    caller.require(&[Role::Tutor, Role::Staff, Role::Manager])?;

    let filter = ReviewFilter {
        owner_id: (!caller.is_moderator()).then_some(caller.id),
        status: query.approval_status()?,
        search: query.search_pattern(),
    };
    let total = certificates::count(&state.db, &filter).await?;
    let page = page_for(total, &query, state.page_size());
    let rows = certificates::list(
        &state.db,
        &filter,
        &query.order_clause(ORDER, "id"),
        page.page_size,
        page.offset(),
    )
    .await?;

    Ok(paged(rows, page))
}

/// GET /api/v1/certificates/:id
pub async fn get_certificate(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<ApiJson<Certificate>> {
    let certificate = find(&state, id).await?;
    if !caller.is_moderator() && certificate.tutor_id != Some(caller.id) {
        return Err(ApiError::Forbidden);
    }
    Ok(ok(certificate))
}

/// PUT /api/v1/certificates/:id/status
pub async fn change_certificate_status(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(change): AppJson<StatusChange>,
) -> ApiResult<ApiJson<Certificate>> {
    caller.require_moderator()?;
    let (status, reason) = change.decision()?;

    let certificate = find(&state, id).await?;
    if certificate.request_status != ApprovalStatus::Pending {
        return Err(ApiError::already_processed(entities::CERTIFICATE));
    }
    if !moderation::review(&state.db, Moderated::Certificates, id, status, reason, caller.id).await? {
        return Err(ApiError::already_processed(entities::CERTIFICATE));
    }
    info!("Certificate {} set to {} by {}", id, status, caller.id);

    if let Some(tutor_id) = certificate.tutor_id {
        let message = match status {
            ApprovalStatus::Approve => format!("Your certificate \"{}\" was approved", certificate.certificate_name),
            _ => format!(
                "Your certificate \"{}\" was rejected: {}",
                certificate.certificate_name,
                reason.unwrap_or_default()
            ),
        };
        notify::send(&state, tutor_id, &message, Some(&format!("/certificates/{}", id))).await;
    }

    Ok(ok(find(&state, id).await?))
}

/// DELETE /api/v1/certificates/:id
pub async fn delete_certificate(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<StatusCode> {
    let certificate = find(&state, id).await?;
    if certificate.tutor_id != Some(caller.id) {
        return Err(ApiError::Forbidden);
    }

    certificates::soft_delete(&state.db, id).await?;
    info!("Tutor {} deleted certificate {}", caller.id, id);
    Ok(StatusCode::NO_CONTENT)
}

pub fn certificate_routes() -> Router<AppState> {
    Router::new()
        .route("/certificates", post(create_certificate).get(list_certificates))
        .route("/certificates/:id", get(get_certificate).delete(delete_certificate))
        .route("/certificates/:id/status", put(change_certificate_status))
}
