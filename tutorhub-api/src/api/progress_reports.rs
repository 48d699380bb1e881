//! Progress reports a tutor writes for a student profile

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;
use tutorhub_common::db::{Role, StudentProfileStatus};
use tutorhub_common::resources::{entities, fields, keys};

use crate::api::student_profiles::{self, ChosenOption};
use crate::api::validate;
use crate::auth::AuthUser;
use crate::db::assessments::{self, ResultOwner};
use crate::db::progress_reports::{self, ProgressReport, ReportFields};
use crate::db::student_profiles::StudentProfile;
use crate::error::{ApiError, ApiResult};
use crate::notify;
use crate::response::{created, ok, ApiJson, AppJson, AppPath, AppQuery};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub from: NaiveDate,
    pub to: NaiveDate,
    #[serde(default)]
    pub achieved: String,
    #[serde(default)]
    pub failed: String,
    #[serde(default)]
    pub note_from_tutor: String,
    #[serde(default)]
    pub assessment_results: Vec<ChosenOption>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub student_profile_id: i64,
    #[serde(flatten)]
    pub report: ReportRequest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub student_profile_id: i64,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ReportRequest {
    fn validate(&self) -> ApiResult<ReportFields<'_>> {
        validate::date_range(self.from, Some(self.to))?;
        validate::not_in_future(self.to, fields::REPORT_END_DATE)?;
        Ok(ReportFields {
            from_date: self.from,
            to_date: self.to,
            achieved: self.achieved.trim(),
            failed: self.failed.trim(),
            note_from_tutor: self.note_from_tutor.trim(),
        })
    }
}

async fn find(state: &AppState, id: i64) -> ApiResult<ProgressReport> {
    progress_reports::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::PROGRESS_REPORT))
}

/// The profile, if the caller tutors it and it is being taught
async fn teaching_profile(state: &AppState, caller: &AuthUser, id: i64) -> ApiResult<StudentProfile> {
    let profile = student_profiles::find(state, id).await?;
    if profile.tutor_id != caller.id {
        return Err(ApiError::Forbidden);
    }
    if profile.status != StudentProfileStatus::Teaching {
        return Err(ApiError::bad_request(keys::PROFILE_NOT_TEACHING));
    }
    Ok(profile)
}

/// POST /api/v1/progress-reports
pub async fn create_progress_report(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<CreateReportRequest>,
) -> ApiResult<ApiJson<ProgressReport>> {
    caller.require(&[Role::Tutor])?;
    let profile = teaching_profile(&state, &caller, req.student_profile_id).await?;
    let fields = req.report.validate()?;

    if progress_reports::period_overlaps(&state.db, profile.id, fields.from_date, fields.to_date, None).await? {
        return Err(ApiError::bad_request(keys::REPORT_OVERLAP));
    }
    student_profiles::check_choices(&state, &req.report.assessment_results).await?;

    let mut tx = state.db.begin().await?;
    let id = progress_reports::insert(&mut *tx, profile.id, caller.id, &fields).await?;
    for choice in &req.report.assessment_results {
        assessments::insert_result(
            &mut *tx,
            ResultOwner::ProgressReport(id),
            choice.question_id,
            choice.option_id,
        )
        .await?;
    }
    tx.commit().await?;

    info!(
        "Tutor {} wrote progress report {} for profile {} ({} to {})",
        caller.id, id, profile.id, fields.from_date, fields.to_date
    );
    notify::send(
        &state,
        profile.parent_id,
        &format!(
            "A new progress report for {} covers {} to {}",
            profile.child_name, fields.from_date, fields.to_date
        ),
        Some(&format!("/progress-reports/{}", id)),
    )
    .await;

    Ok(created(find(&state, id).await?))
}

/// GET /api/v1/progress-reports?studentProfileId=&from=&to=
pub async fn list_progress_reports(
    State(state): State<AppState>,
    caller: AuthUser,
    AppQuery(query): AppQuery<ReportQuery>,
) -> ApiResult<ApiJson<Vec<ProgressReport>>> {
    let profile = student_profiles::find(&state, query.student_profile_id).await?;
    if profile.tutor_id != caller.id && profile.parent_id != caller.id {
        return Err(ApiError::Forbidden);
    }
    if let (Some(from), to) = (query.from, query.to) {
        validate::date_range(from, to)?;
    }

    Ok(ok(progress_reports::list_for_profile(&state.db, profile.id, query.from, query.to).await?))
}

/// GET /api/v1/progress-reports/:id
pub async fn get_progress_report(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<ApiJson<ProgressReport>> {
    let report = find(&state, id).await?;
    let profile = student_profiles::find(&state, report.student_profile_id).await?;
    if profile.tutor_id != caller.id && profile.parent_id != caller.id {
        return Err(ApiError::Forbidden);
    }
    Ok(ok(report))
}

/// PUT /api/v1/progress-reports/:id
///
/// Replaces the report's period, texts and assessment results.
pub async fn update_progress_report(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<ReportRequest>,
) -> ApiResult<ApiJson<ProgressReport>> {
    caller.require(&[Role::Tutor])?;
    let report = find(&state, id).await?;
    if report.tutor_id != caller.id {
        return Err(ApiError::Forbidden);
    }
    let fields = req.validate()?;

    let overlaps = progress_reports::period_overlaps(
        &state.db,
        report.student_profile_id,
        fields.from_date,
        fields.to_date,
        Some(id),
    )
    .await?;
    if overlaps {
        return Err(ApiError::bad_request(keys::REPORT_OVERLAP));
    }
    student_profiles::check_choices(&state, &req.assessment_results).await?;

    let mut tx = state.db.begin().await?;
    progress_reports::update(&mut *tx, id, &fields).await?;
    assessments::delete_results_for_report(&mut *tx, id).await?;
    for choice in &req.assessment_results {
        assessments::insert_result(
            &mut *tx,
            ResultOwner::ProgressReport(id),
            choice.question_id,
            choice.option_id,
        )
        .await?;
    }
    tx.commit().await?;
    info!("Tutor {} updated progress report {}", caller.id, id);

    Ok(ok(find(&state, id).await?))
}

pub fn progress_report_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/progress-reports",
            post(create_progress_report).get(list_progress_reports),
        )
        .route(
            "/progress-reports/:id",
            get(get_progress_report).put(update_progress_report),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tutorhub_common::time;

    fn request(from: NaiveDate, to: NaiveDate) -> ReportRequest {
        ReportRequest {
            from,
            to,
            achieved: "  counts to ten ".to_string(),
            failed: String::new(),
            note_from_tutor: String::new(),
            assessment_results: Vec::new(),
        }
    }

    #[test]
    fn test_report_period_rules() {
        let today = time::today();
        let week_ago = today - Duration::days(7);

        let last_week = request(week_ago, today);
        let fields = last_week.validate().unwrap();
        assert_eq!(fields.achieved, "counts to ten");

        assert!(request(today, week_ago).validate().is_err());
        assert!(request(week_ago, today + Duration::days(1)).validate().is_err());
    }
}
