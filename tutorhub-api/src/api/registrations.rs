//! Tutor registration requests
//!
//! Prospective tutors apply without an account. A request carries the
//! qualifications (certificates, work experiences, curriculums) that become
//! the tutor's own rows when staff approve it.

use axum::{
    extract::State,
    routing::{get, post, put},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;
use tutorhub_common::api::{generate_password, hash_password};
use tutorhub_common::db::{ApprovalStatus, Role};
use tutorhub_common::resources::{entities, fields, keys};

use crate::api::auth::validate_email;
use crate::api::review::StatusChange;
use crate::api::validate;
use crate::auth::AuthUser;
use crate::db::certificates::{self, Certificate, NewCertificate};
use crate::db::curriculums::{self, Curriculum, NewCurriculum};
use crate::db::moderation::{self, Moderated};
use crate::db::registrations::{self, NewRegistration, TutorRegistrationRequest};
use crate::db::tutors::{self, TutorProfile};
use crate::db::users::{self, NewUser};
use crate::db::work_experiences::{self, NewWorkExperience, WorkExperience};
use crate::db::{Owner, ReviewFilter};
use crate::error::{ApiError, ApiResult};
use crate::mail::templates;
use crate::notify;
use crate::pagination::{page_for, ListQuery};
use crate::response::{created, ok, paged, ApiJson, AppJson, AppPath, AppQuery};
use crate::AppState;

const GENERATED_PASSWORD_LENGTH: usize = 12;

const ORDER: &[(&str, &str)] = &[("createdDate", "created_date"), ("fullName", "full_name")];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateInput {
    pub certificate_name: String,
    pub issuing_institution: String,
    pub identity_card_number: Option<String>,
    pub issuing_date: NaiveDate,
    pub expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub medias: Vec<String>,
}

impl CertificateInput {
    /// Field checks shared with the tutor's own certificate endpoint
    pub fn validate(&self) -> ApiResult<NewCertificate<'_>> {
        let certificate_name = validate::required(&self.certificate_name, fields::CERTIFICATE_NAME)?;
        validate::date_range(self.issuing_date, self.expiration_date)?;
        validate::not_in_future(self.issuing_date, fields::ISSUING_DATE)?;
        Ok(NewCertificate {
            certificate_name,
            issuing_institution: self.issuing_institution.trim(),
            identity_card_number: self.identity_card_number.as_deref(),
            issuing_date: self.issuing_date,
            expiration_date: self.expiration_date,
            medias: &self.medias,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperienceInput {
    pub company_name: String,
    pub position: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl WorkExperienceInput {
    pub fn validate(&self) -> ApiResult<NewWorkExperience<'_>> {
        validate::date_range(self.start_date, self.end_date)?;
        validate::not_in_future(self.start_date, fields::START_DATE)?;
        Ok(NewWorkExperience {
            company_name: self.company_name.trim(),
            position: self.position.trim(),
            start_date: self.start_date,
            end_date: self.end_date,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumInput {
    pub age_from: i64,
    pub age_end: i64,
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRegistrationRequest {
    pub email: String,
    pub full_name: String,
    pub phone_number: String,
    pub image_url: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: NaiveDate,
    pub start_age: i64,
    pub end_age: i64,
    #[serde(default)]
    pub about_me: String,
    pub price_per_hour: f64,
    #[serde(default)]
    pub certificates: Vec<CertificateInput>,
    #[serde(default)]
    pub work_experiences: Vec<WorkExperienceInput>,
    #[serde(default)]
    pub curriculums: Vec<CurriculumInput>,
}

/// Request with everything submitted alongside it
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDetail {
    #[serde(flatten)]
    pub request: TutorRegistrationRequest,
    pub certificates: Vec<Certificate>,
    pub work_experiences: Vec<WorkExperience>,
    pub curriculums: Vec<Curriculum>,
}

async fn load_detail(state: &AppState, id: i64) -> ApiResult<RegistrationDetail> {
    let request = registrations::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::TUTOR_REGISTRATION_REQUEST))?;

    Ok(RegistrationDetail {
        certificates: certificates::for_registration(&state.db, id).await?,
        work_experiences: work_experiences::for_registration(&state.db, id).await?,
        curriculums: curriculums::for_registration(&state.db, id).await?,
        request,
    })
}

fn unique_certificate_names(certificates: &[CertificateInput]) -> ApiResult<()> {
    let mut seen = HashSet::new();
    for certificate in certificates {
        if !seen.insert(certificate.certificate_name.trim().to_lowercase()) {
            return Err(ApiError::duplicate(entities::CERTIFICATE));
        }
    }
    Ok(())
}

/// POST /api/v1/tutor-registration-requests
///
/// Public. The request and its nested rows are stored in one transaction.
pub async fn create_registration(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateRegistrationRequest>,
) -> ApiResult<ApiJson<RegistrationDetail>> {
    validate_email(&req.email)?;
    let email = req.email.trim();
    let full_name = validate::required(&req.full_name, fields::FULL_NAME)?;
    validate::required(&req.phone_number, fields::PHONE_NUMBER)?;
    validate::age_range(req.start_age, req.end_age)?;
    validate::not_in_future(req.date_of_birth, fields::BIRTH_DATE)?;
    if req.price_per_hour < 0.0 {
        return Err(ApiError::bad_request(keys::BAD_REQUEST));
    }
    unique_certificate_names(&req.certificates)?;

    let new_certificates = req
        .certificates
        .iter()
        .map(CertificateInput::validate)
        .collect::<ApiResult<Vec<_>>>()?;
    let new_experiences = req
        .work_experiences
        .iter()
        .map(WorkExperienceInput::validate)
        .collect::<ApiResult<Vec<_>>>()?;
    for curriculum in &req.curriculums {
        validate::age_range(curriculum.age_from, curriculum.age_end)?;
    }

    if users::email_exists(&state.db, email).await? {
        return Err(ApiError::bad_request_with(keys::EMAIL_IN_USE, &[email]));
    }
    if registrations::pending_exists_for_email(&state.db, email).await? {
        return Err(ApiError::bad_request_with(keys::PENDING_REGISTRATION_EXISTS, &[email]));
    }

    let mut tx = state.db.begin().await?;
    let id = registrations::insert(
        &mut *tx,
        &NewRegistration {
            email,
            full_name,
            phone_number: req.phone_number.trim(),
            image_url: req.image_url.as_deref(),
            address: req.address.as_deref(),
            date_of_birth: req.date_of_birth,
            start_age: req.start_age,
            end_age: req.end_age,
            about_me: req.about_me.trim(),
            price_per_hour: req.price_per_hour,
        },
    )
    .await?;

    let owner = Owner::Registration(id);
    for certificate in &new_certificates {
        certificates::insert(&mut *tx, owner, certificate).await?;
    }
    for experience in &new_experiences {
        work_experiences::insert(&mut *tx, owner, experience).await?;
    }
    for curriculum in &req.curriculums {
        curriculums::insert(
            &mut *tx,
            owner,
            &NewCurriculum {
                age_from: curriculum.age_from,
                age_end: curriculum.age_end,
                description: curriculum.description.trim(),
                original_curriculum_id: None,
                version_number: 1,
            },
        )
        .await?;
    }
    tx.commit().await?;

    info!("Tutor registration request {} submitted by {}", id, email);
    notify::send_to_moderators(
        &state,
        &format!("{} applied to become a tutor", full_name),
        Some(&format!("/tutor-registration-requests/{}", id)),
    )
    .await;

    Ok(created(load_detail(&state, id).await?))
}

/// GET /api/v1/tutor-registration-requests
pub async fn list_registrations(
    State(state): State<AppState>,
    caller: AuthUser,
    AppQuery(query): AppQuery<ListQuery>,
) -> ApiResult<ApiJson<Vec<TutorRegistrationRequest>>> {
    caller.require_moderator()?;

    let filter = ReviewFilter {
        owner_id: None,
        status: query.approval_status()?,
        search: query.search_pattern(),
    };
    let total = registrations::count(&state.db, &filter).await?;
    let page = page_for(total, &query, state.page_size());
    let rows = registrations::list(
        &state.db,
        &filter,
        &query.order_clause(ORDER, "id"),
        page.page_size,
        page.offset(),
    )
    .await?;

    Ok(paged(rows, page))
}

/// GET /api/v1/tutor-registration-requests/:id
pub async fn get_registration(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<ApiJson<RegistrationDetail>> {
    caller.require_moderator()?;
    Ok(ok(load_detail(&state, id).await?))
}

/// PUT /api/v1/tutor-registration-requests/:id/status
pub async fn change_registration_status(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(change): AppJson<StatusChange>,
) -> ApiResult<ApiJson<RegistrationDetail>> {
    caller.require_moderator()?;
    let (status, reason) = change.decision()?;

    let request = registrations::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::TUTOR_REGISTRATION_REQUEST))?;
    if request.request_status != ApprovalStatus::Pending {
        return Err(ApiError::already_processed(entities::TUTOR_REGISTRATION_REQUEST));
    }

    match status {
        ApprovalStatus::Approve => approve(&state, &caller, &request).await?,
        _ => reject(&state, &caller, &request, reason.unwrap_or_default()).await?,
    }

    Ok(ok(load_detail(&state, id).await?))
}

async fn approve(state: &AppState, caller: &AuthUser, request: &TutorRegistrationRequest) -> ApiResult<()> {
    if users::email_exists(&state.db, &request.email).await? {
        return Err(ApiError::bad_request_with(keys::EMAIL_IN_USE, &[&request.email]));
    }

    let password = generate_password(GENERATED_PASSWORD_LENGTH);
    let password_hash = hash_password(&password)?;

    let mut tx = state.db.begin().await?;
    let reviewed = moderation::review(
        &mut *tx,
        Moderated::TutorRegistrationRequests,
        request.id,
        ApprovalStatus::Approve,
        None,
        caller.id,
    )
    .await?;
    if !reviewed {
        return Err(ApiError::already_processed(entities::TUTOR_REGISTRATION_REQUEST));
    }

    let tutor_id = users::insert(
        &mut *tx,
        &NewUser {
            email: &request.email,
            full_name: &request.full_name,
            phone_number: Some(&request.phone_number),
            address: request.address.as_deref(),
            image_url: request.image_url.as_deref(),
            password_hash: &password_hash,
            role: Role::Tutor,
        },
    )
    .await?;
    tutors::insert(
        &mut *tx,
        tutor_id,
        &TutorProfile {
            date_of_birth: Some(request.date_of_birth),
            start_age: request.start_age,
            end_age: request.end_age,
            about_me: &request.about_me,
            price_per_hour: request.price_per_hour,
        },
    )
    .await?;
    certificates::transfer_from_registration(&mut *tx, request.id, tutor_id, ApprovalStatus::Approve, caller.id)
        .await?;
    work_experiences::transfer_from_registration(
        &mut *tx,
        request.id,
        tutor_id,
        ApprovalStatus::Approve,
        caller.id,
    )
    .await?;
    curriculums::activate_from_registration(&mut *tx, request.id, tutor_id, caller.id).await?;
    tx.commit().await?;

    info!(
        "Registration request {} approved by {}; tutor account {} created",
        request.id, caller.id, tutor_id
    );
    notify::email(
        state,
        templates::registration_approved(
            &request.email,
            &request.full_name,
            &password,
            &notify::link(state, "/login"),
        ),
    );
    Ok(())
}

async fn reject(
    state: &AppState,
    caller: &AuthUser,
    request: &TutorRegistrationRequest,
    reason: &str,
) -> ApiResult<()> {
    let mut tx = state.db.begin().await?;
    let reviewed = moderation::review(
        &mut *tx,
        Moderated::TutorRegistrationRequests,
        request.id,
        ApprovalStatus::Reject,
        Some(reason),
        caller.id,
    )
    .await?;
    if !reviewed {
        return Err(ApiError::already_processed(entities::TUTOR_REGISTRATION_REQUEST));
    }
    certificates::reject_for_registration(&mut *tx, request.id, caller.id).await?;
    work_experiences::reject_for_registration(&mut *tx, request.id, caller.id).await?;
    curriculums::reject_for_registration(&mut *tx, request.id, caller.id).await?;
    tx.commit().await?;

    info!("Registration request {} rejected by {}", request.id, caller.id);
    notify::email(
        state,
        templates::registration_rejected(&request.email, &request.full_name, reason),
    );
    Ok(())
}

pub fn registration_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/tutor-registration-requests",
            post(create_registration).get(list_registrations),
        )
        .route("/tutor-registration-requests/:id", get(get_registration))
        .route(
            "/tutor-registration-requests/:id/status",
            put(change_registration_status),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn certificate(name: &str) -> CertificateInput {
        CertificateInput {
            certificate_name: name.to_string(),
            issuing_institution: "Behavior Analyst Board".to_string(),
            identity_card_number: None,
            issuing_date: NaiveDate::from_ymd_opt(2022, 5, 1).unwrap(),
            expiration_date: None,
            medias: Vec::new(),
        }
    }

    #[test]
    fn test_certificate_names_unique_within_request() {
        assert!(unique_certificate_names(&[certificate("ABA"), certificate("PECS")]).is_ok());
        assert!(unique_certificate_names(&[certificate("ABA"), certificate(" aba ")]).is_err());
    }

    #[test]
    fn test_certificate_expiring_before_issue_is_rejected() {
        let mut input = certificate("ABA");
        input.expiration_date = NaiveDate::from_ymd_opt(2021, 1, 1);
        assert!(input.validate().is_err());

        input.expiration_date = NaiveDate::from_ymd_opt(2027, 1, 1);
        assert!(input.validate().is_ok());
    }
}
