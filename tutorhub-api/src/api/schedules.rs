//! Concrete teaching sessions

use axum::{
    extract::State,
    routing::{get, put},
    Router,
};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use tracing::{info, warn};
use tutorhub_common::db::{ApprovalStatus, AttendanceStatus, PassingStatus, Role};
use tutorhub_common::resources::{entities, fields, keys};
use tutorhub_common::time;

use crate::api::validate;
use crate::auth::AuthUser;
use crate::db::schedules::{self, Schedule, ScheduleFilter, SessionOutcome};
use crate::db::{exercises, student_profiles, syllabuses};
use crate::error::{ApiError, ApiResult};
use crate::notify;
use crate::response::{ok, ApiJson, AppJson, AppPath, AppQuery};
use crate::scheduling;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub student_profile_id: Option<i64>,
}

impl ScheduleQuery {
    /// Requested window, the current Monday-to-Sunday week by default
    fn window(&self, today: NaiveDate) -> ApiResult<(NaiveDate, NaiveDate)> {
        let from = self.from.unwrap_or_else(|| time::week_start(today));
        let to = self.to.unwrap_or_else(|| time::week_end(from));
        validate::date_range(from, Some(to))?;
        Ok((from, to))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeRequest {
    pub attendance_status: AttendanceStatus,
    pub passing_status: PassingStatus,
    pub note: Option<String>,
    pub syllabus_id: Option<i64>,
    pub exercise_type_id: Option<i64>,
    pub exercise_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleRequest {
    pub schedule_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

async fn find(state: &AppState, id: i64) -> ApiResult<Schedule> {
    schedules::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::SCHEDULE))
}

async fn find_own(state: &AppState, caller: &AuthUser, id: i64) -> ApiResult<Schedule> {
    let schedule = find(state, id).await?;
    if schedule.tutor_id != caller.id {
        return Err(ApiError::Forbidden);
    }
    Ok(schedule)
}

/// GET /api/v1/schedules
pub async fn list_schedules(
    State(state): State<AppState>,
    caller: AuthUser,
    AppQuery(query): AppQuery<ScheduleQuery>,
) -> ApiResult<ApiJson<Vec<Schedule>>> {
    caller.require(&[Role::Tutor, Role::Parent])?;
    let (from, to) = query.window(time::today())?;

    let mut filter = ScheduleFilter {
        student_profile_id: query.student_profile_id,
        ..Default::default()
    };
    match caller.role {
        Role::Tutor => filter.tutor_id = Some(caller.id),
        _ => filter.parent_id = Some(caller.id),
    }

    Ok(ok(schedules::list_range(&state.db, &filter, from, to).await?))
}

/// GET /api/v1/schedules/:id
pub async fn get_schedule(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<ApiJson<Schedule>> {
    let schedule = find(&state, id).await?;
    if schedule.tutor_id != caller.id && !caller.is_moderator() {
        let is_parent = student_profiles::find_by_id(&state.db, schedule.student_profile_id)
            .await?
            .is_some_and(|p| p.parent_id == caller.id);
        if !is_parent {
            return Err(ApiError::Forbidden);
        }
    }
    Ok(ok(schedule))
}

/// PUT /api/v1/schedules/:id
///
/// Records attendance, the evaluation and the exercise worked on. An
/// assigned exercise must be one of the tutor's approved, active exercises,
/// and an assigned syllabus must be the tutor's active one.
pub async fn record_schedule_outcome(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<OutcomeRequest>,
) -> ApiResult<ApiJson<Schedule>> {
    caller.require(&[Role::Tutor])?;
    find_own(&state, &caller, id).await?;

    if let Some(syllabus_id) = req.syllabus_id {
        let usable = syllabuses::find_by_id(&state.db, syllabus_id)
            .await?
            .is_some_and(|s| {
                s.tutor_id == caller.id && s.is_active && s.request_status == ApprovalStatus::Approve
            });
        if !usable {
            return Err(ApiError::not_found(entities::SYLLABUS));
        }
    }
    match (req.exercise_type_id, req.exercise_id) {
        (Some(type_id), Some(exercise_id)) => {
            if !exercises::is_usable(&state.db, exercise_id, caller.id, type_id).await? {
                return Err(ApiError::not_found(entities::EXERCISE));
            }
        }
        (None, Some(_)) => return Err(ApiError::not_found(entities::EXERCISE_TYPE)),
        _ => {}
    }

    let note = req.note.as_deref().map(str::trim).filter(|n| !n.is_empty());
    schedules::record_outcome(
        &state.db,
        id,
        &SessionOutcome {
            attendance_status: req.attendance_status,
            passing_status: req.passing_status,
            note,
            syllabus_id: req.syllabus_id,
            exercise_type_id: req.exercise_type_id,
            exercise_id: req.exercise_id,
        },
    )
    .await?;
    info!(
        "Tutor {} recorded session {}: {} / {}",
        caller.id, id, req.attendance_status, req.passing_status
    );

    Ok(ok(find(&state, id).await?))
}

/// PUT /api/v1/schedules/:id/reschedule
pub async fn reschedule_session(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<RescheduleRequest>,
) -> ApiResult<ApiJson<Schedule>> {
    caller.require(&[Role::Tutor])?;
    let schedule = find_own(&state, &caller, id).await?;

    if schedule.attendance_status != AttendanceStatus::NotYet {
        return Err(ApiError::bad_request(keys::ONLY_NOT_YET_CHANGEABLE));
    }
    validate::not_in_past(req.schedule_date, fields::SCHEDULE_DATE)?;
    validate::not_started(
        req.schedule_date,
        req.start_time,
        time::now().naive_utc(),
        fields::START_TIME,
    )?;
    if req.start_time >= req.end_time {
        return Err(ApiError::bad_request(keys::INVALID_TIME_RANGE));
    }

    let clash = schedules::tutor_sessions_on(&state.db, caller.id, req.schedule_date, Some(id))
        .await?
        .into_iter()
        .any(|s| scheduling::intervals_overlap(req.start_time, req.end_time, s.start_time, s.end_time));
    if clash {
        let date = req.schedule_date.format("%Y-%m-%d").to_string();
        return Err(ApiError::bad_request_with(keys::SCHEDULE_OVERLAP, &[&date]));
    }

    schedules::reschedule(&state.db, id, req.schedule_date, req.start_time, req.end_time).await?;
    info!(
        "Tutor {} moved session {} from {} to {} {}-{}",
        caller.id,
        id,
        schedule.schedule_date,
        req.schedule_date,
        req.start_time.format("%H:%M"),
        req.end_time.format("%H:%M")
    );

    if let Err(e) =
        scheduling::notify_schedules_changed(&state.db, &state.event_bus, schedule.student_profile_id).await
    {
        warn!("Failed to push calendar refresh for session {}: {}", id, e);
    }
    if let Some(profile) = student_profiles::find_by_id(&state.db, schedule.student_profile_id).await? {
        notify::send(
            &state,
            profile.parent_id,
            &format!(
                "The session of {} on {} was moved to {} at {}",
                schedule.child_name,
                schedule.schedule_date,
                req.schedule_date,
                req.start_time.format("%H:%M")
            ),
            Some(&format!("/schedules/{}", id)),
        )
        .await;
    }

    Ok(ok(find(&state, id).await?))
}

pub fn schedule_routes() -> Router<AppState> {
    Router::new()
        .route("/schedules", get(list_schedules))
        .route("/schedules/:id", get(get_schedule).put(record_schedule_outcome))
        .route("/schedules/:id/reschedule", put(reschedule_session))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_window_defaults_to_current_week() {
        // 2024-05-15 is a Wednesday
        let query = ScheduleQuery::default();
        let (from, to) = query.window(date("2024-05-15")).unwrap();
        assert_eq!(from, date("2024-05-13"));
        assert_eq!(to, date("2024-05-19"));
    }

    #[test]
    fn test_window_rejects_reversed_range() {
        let query = ScheduleQuery {
            from: Some(date("2024-05-20")),
            to: Some(date("2024-05-10")),
            student_profile_id: None,
        };
        assert!(query.window(date("2024-05-15")).is_err());
    }
}
