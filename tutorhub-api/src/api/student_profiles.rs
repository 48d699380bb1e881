//! Student profiles: a tutor taking on a child after an accepted request

use axum::{
    extract::State,
    routing::{get, post, put},
    Router,
};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tutorhub_common::db::{ApprovalStatus, Role, StudentProfileStatus};
use tutorhub_common::resources::{entities, keys};
use tutorhub_common::time;

use crate::auth::AuthUser;
use crate::db::assessments::{self, AssessmentResult, ResultOwner};
use crate::db::student_profiles::{self, StudentProfile, StudentProfileFilter};
use crate::db::time_slots::{self, ScheduleTimeSlot};
use crate::db::{schedules, tutor_requests};
use crate::error::{ApiError, ApiResult};
use crate::notify;
use crate::pagination::{page_for, ListQuery};
use crate::response::{created, ok, paged, ApiJson, AppJson, AppPath, AppQuery};
use crate::scheduling::{self, SlotError, WeeklySlot};
use crate::AppState;

const ORDER: &[(&str, &str)] = &[
    ("createdDate", "sp.created_date"),
    ("childName", "c.name"),
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChosenOption {
    pub question_id: i64,
    pub option_id: i64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlotInput {
    pub weekday: i64,
    pub from_time: NaiveTime,
    pub to_time: NaiveTime,
}

impl TimeSlotInput {
    pub fn weekly(&self) -> ApiResult<WeeklySlot> {
        WeeklySlot::new(self.weekday, self.from_time, self.to_time).map_err(slot_error)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentProfileRequest {
    pub tutor_request_id: i64,
    #[serde(default)]
    pub initial_condition: String,
    #[serde(default)]
    pub initial_assessment_results: Vec<ChosenOption>,
    #[serde(default)]
    pub schedule_time_slots: Vec<TimeSlotInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDecision {
    pub status: StudentProfileStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfileDetail {
    #[serde(flatten)]
    pub profile: StudentProfile,
    pub schedule_time_slots: Vec<ScheduleTimeSlot>,
    pub initial_assessment_results: Vec<AssessmentResult>,
}

pub(crate) fn slot_error(err: SlotError) -> ApiError {
    match err {
        SlotError::InvalidWeekday => ApiError::bad_request(keys::INVALID_WEEKDAY),
        SlotError::InvalidTimeRange => ApiError::bad_request(keys::INVALID_TIME_RANGE),
    }
}

pub(crate) fn overlap_error(slot: &WeeklySlot) -> ApiError {
    ApiError::bad_request_with(keys::TIME_SLOT_OVERLAP, &[&slot.label()])
}

/// Reject slots that overlap each other or the tutor's other commitments
pub(crate) async fn check_slots(
    state: &AppState,
    tutor_id: i64,
    slots: &[WeeklySlot],
    except_slot: Option<i64>,
) -> ApiResult<()> {
    if let Some(slot) = scheduling::find_internal_overlap(slots) {
        return Err(overlap_error(&slot));
    }

    let committed: Vec<WeeklySlot> = time_slots::committed_for_tutor(&state.db, tutor_id, except_slot)
        .await?
        .iter()
        .filter_map(|s| s.weekly().ok())
        .collect();
    match scheduling::find_conflict(slots, &committed) {
        Some(slot) => Err(overlap_error(&slot)),
        None => Ok(()),
    }
}

/// Every option must belong to its question and no question may repeat
pub(crate) async fn check_choices(state: &AppState, choices: &[ChosenOption]) -> ApiResult<()> {
    let mut answered: Vec<i64> = Vec::with_capacity(choices.len());
    for choice in choices {
        let question = choice.question_id.to_string();
        if answered.contains(&choice.question_id) {
            return Err(ApiError::bad_request_with(keys::QUESTION_ANSWERED_TWICE, &[&question]));
        }
        if !assessments::option_belongs(&state.db, choice.question_id, choice.option_id).await? {
            return Err(ApiError::bad_request_with(keys::OPTION_NOT_IN_QUESTION, &[&question]));
        }
        answered.push(choice.question_id);
    }
    Ok(())
}

pub(crate) async fn find(state: &AppState, id: i64) -> ApiResult<StudentProfile> {
    student_profiles::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::STUDENT_PROFILE))
}

/// The profile, if the caller is its tutor, the child's parent or a moderator
pub(crate) async fn find_visible(state: &AppState, caller: &AuthUser, id: i64) -> ApiResult<StudentProfile> {
    let profile = find(state, id).await?;
    if !caller.is_moderator() && profile.tutor_id != caller.id && profile.parent_id != caller.id {
        return Err(ApiError::Forbidden);
    }
    Ok(profile)
}

/// Create missing sessions for a teaching profile and push a calendar refresh
pub(crate) async fn regenerate(state: &AppState, profile_id: i64) {
    let result = match scheduling::generate_for_profile(&state.db, profile_id, time::today()).await {
        Ok(_) => scheduling::notify_schedules_changed(&state.db, &state.event_bus, profile_id).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        warn!("Failed to regenerate sessions for student profile {}: {}", profile_id, e);
    }
}

async fn detail(state: &AppState, profile: StudentProfile) -> ApiResult<StudentProfileDetail> {
    let schedule_time_slots = time_slots::for_profile(&state.db, profile.id).await?;
    let initial_assessment_results = assessments::results_for_profile(&state.db, profile.id).await?;
    Ok(StudentProfileDetail {
        profile,
        schedule_time_slots,
        initial_assessment_results,
    })
}

/// POST /api/v1/student-profiles
pub async fn create_student_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<CreateStudentProfileRequest>,
) -> ApiResult<ApiJson<StudentProfileDetail>> {
    caller.require(&[Role::Tutor])?;

    let request = tutor_requests::find_by_id(&state.db, req.tutor_request_id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::TUTOR_REQUEST))?;
    if request.tutor_id != caller.id {
        return Err(ApiError::Forbidden);
    }
    if request.request_status != ApprovalStatus::Approve {
        return Err(ApiError::bad_request_with(
            keys::INVALID_STATUS,
            &[request.request_status.as_str()],
        ));
    }
    if student_profiles::exists_for_request(&state.db, request.id).await? {
        return Err(ApiError::duplicate(entities::STUDENT_PROFILE));
    }

    check_choices(&state, &req.initial_assessment_results).await?;

    let slots = req
        .schedule_time_slots
        .iter()
        .map(TimeSlotInput::weekly)
        .collect::<ApiResult<Vec<_>>>()?;
    check_slots(&state, caller.id, &slots, None).await?;

    let mut tx = state.db.begin().await?;
    let id = student_profiles::insert(
        &mut *tx,
        caller.id,
        request.child_id,
        request.id,
        req.initial_condition.trim(),
    )
    .await?;
    for choice in &req.initial_assessment_results {
        assessments::insert_result(
            &mut *tx,
            ResultOwner::StudentProfile(id),
            choice.question_id,
            choice.option_id,
        )
        .await?;
    }
    for slot in &slots {
        time_slots::insert(&mut *tx, id, slot).await?;
    }
    tx.commit().await?;

    info!(
        "Tutor {} created student profile {} for child {} ({} slots)",
        caller.id,
        id,
        request.child_id,
        slots.len()
    );
    notify::send(
        &state,
        request.parent_id,
        &format!(
            "{} created a student profile for {}. Please review it.",
            request.tutor_name, request.child_name
        ),
        Some(&format!("/student-profiles/{}", id)),
    )
    .await;

    let profile = find(&state, id).await?;
    Ok(created(detail(&state, profile).await?))
}

/// GET /api/v1/student-profiles
pub async fn list_student_profiles(
    State(state): State<AppState>,
    caller: AuthUser,
    AppQuery(query): AppQuery<ListQuery>,
) -> ApiResult<ApiJson<Vec<StudentProfile>>> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) if s.eq_ignore_ascii_case("all") => None,
        Some(s) => Some(
            s.parse::<StudentProfileStatus>()
                .map_err(|_| ApiError::bad_request_with(keys::INVALID_STATUS, &[s]))?,
        ),
    };
    let mut filter = StudentProfileFilter {
        status,
        search: query.search_pattern(),
        ..Default::default()
    };
    match caller.role {
        Role::Tutor => filter.tutor_id = Some(caller.id),
        Role::Parent => filter.parent_id = Some(caller.id),
        Role::Staff | Role::Manager => {}
    }

    let total = student_profiles::count(&state.db, &filter).await?;
    let page = page_for(total, &query, state.page_size());
    let rows = student_profiles::list(
        &state.db,
        &filter,
        &query.order_clause(ORDER, "sp.id"),
        page.page_size,
        page.offset(),
    )
    .await?;

    Ok(paged(rows, page))
}

/// GET /api/v1/student-profiles/:id
pub async fn get_student_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<ApiJson<StudentProfileDetail>> {
    let profile = find_visible(&state, &caller, id).await?;
    Ok(ok(detail(&state, profile).await?))
}

/// PUT /api/v1/student-profiles/:id/approval
///
/// The parent accepts (`TEACHING`) or declines (`REJECT`) a pending profile.
/// Accepting materializes the upcoming sessions right away.
pub async fn answer_student_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(decision): AppJson<ProfileDecision>,
) -> ApiResult<ApiJson<StudentProfileDetail>> {
    caller.require(&[Role::Parent])?;
    if !matches!(
        decision.status,
        StudentProfileStatus::Teaching | StudentProfileStatus::Reject
    ) {
        return Err(ApiError::bad_request_with(
            keys::INVALID_STATUS,
            &[decision.status.as_str()],
        ));
    }

    let profile = find(&state, id).await?;
    if profile.parent_id != caller.id {
        return Err(ApiError::Forbidden);
    }
    if !student_profiles::transition(&state.db, id, StudentProfileStatus::Pending, decision.status).await? {
        return Err(ApiError::already_processed(entities::STUDENT_PROFILE));
    }
    info!("Parent {} set student profile {} to {}", caller.id, id, decision.status);

    let message = if decision.status == StudentProfileStatus::Teaching {
        regenerate(&state, id).await;
        format!("The parent of {} accepted your student profile", profile.child_name)
    } else {
        format!("The parent of {} declined your student profile", profile.child_name)
    };
    notify::send(&state, profile.tutor_id, &message, Some(&format!("/student-profiles/{}", id))).await;

    let profile = find(&state, id).await?;
    Ok(ok(detail(&state, profile).await?))
}

/// PUT /api/v1/student-profiles/:id/close
///
/// Either side stops a teaching profile; sessions from today on are removed.
pub async fn close_student_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<ApiJson<StudentProfileDetail>> {
    let profile = find(&state, id).await?;
    if profile.tutor_id != caller.id && profile.parent_id != caller.id {
        return Err(ApiError::Forbidden);
    }
    if profile.status != StudentProfileStatus::Teaching {
        return Err(ApiError::bad_request(keys::PROFILE_NOT_TEACHING));
    }

    let mut tx = state.db.begin().await?;
    let stopped = student_profiles::transition(
        &mut *tx,
        id,
        StudentProfileStatus::Teaching,
        StudentProfileStatus::Stop,
    )
    .await?;
    if !stopped {
        return Err(ApiError::already_processed(entities::STUDENT_PROFILE));
    }
    let removed = schedules::delete_upcoming_for_profile(&mut *tx, id, time::today()).await?;
    tx.commit().await?;
    info!(
        "Student profile {} stopped by {} ({} upcoming sessions removed)",
        id, caller.id, removed
    );

    if let Err(e) = scheduling::notify_schedules_changed(&state.db, &state.event_bus, id).await {
        warn!("Failed to push calendar refresh for student profile {}: {}", id, e);
    }
    let other = if caller.id == profile.tutor_id {
        profile.parent_id
    } else {
        profile.tutor_id
    };
    notify::send(
        &state,
        other,
        &format!("Teaching of {} has been stopped", profile.child_name),
        Some(&format!("/student-profiles/{}", id)),
    )
    .await;

    let profile = find(&state, id).await?;
    Ok(ok(detail(&state, profile).await?))
}

pub fn student_profile_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/student-profiles",
            post(create_student_profile).get(list_student_profiles),
        )
        .route("/student-profiles/:id", get(get_student_profile))
        .route("/student-profiles/:id/approval", put(answer_student_profile))
        .route("/student-profiles/:id/close", put(close_student_profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn at(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn test_slot_input_validation() {
        let bad_day = TimeSlotInput {
            weekday: 7,
            from_time: at(9),
            to_time: at(10),
        };
        assert_eq!(bad_day.weekly().unwrap_err().status(), StatusCode::BAD_REQUEST);

        let reversed = TimeSlotInput {
            weekday: 1,
            from_time: at(10),
            to_time: at(9),
        };
        assert!(reversed.weekly().is_err());

        let fine = TimeSlotInput {
            weekday: 1,
            from_time: at(9),
            to_time: at(10),
        };
        assert_eq!(fine.weekly().unwrap().label(), "Mon 09:00-10:00");
    }
}
