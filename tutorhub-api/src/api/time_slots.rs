//! Weekly time slots of a student profile

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Router,
};
use tracing::{info, warn};
use tutorhub_common::db::StudentProfileStatus;
use tutorhub_common::resources::{entities, keys};
use tutorhub_common::time;

use crate::api::student_profiles::{self, TimeSlotInput};
use crate::auth::AuthUser;
use crate::db::schedules;
use crate::db::student_profiles::StudentProfile;
use crate::db::time_slots::{self, ScheduleTimeSlot};
use crate::error::{ApiError, ApiResult};
use crate::response::{created, ok, ApiJson, AppJson, AppPath};
use crate::scheduling;
use crate::AppState;

/// Slots may only change while the profile is pending or being taught
fn ensure_editable(profile: &StudentProfile) -> ApiResult<()> {
    match profile.status {
        StudentProfileStatus::Pending | StudentProfileStatus::Teaching => Ok(()),
        other => Err(ApiError::bad_request_with(keys::INVALID_STATUS, &[other.as_str()])),
    }
}

/// The slot and its profile, if the caller tutors that profile
async fn find_own(state: &AppState, caller: &AuthUser, id: i64) -> ApiResult<(ScheduleTimeSlot, StudentProfile)> {
    let slot = time_slots::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::SCHEDULE_TIME_SLOT))?;
    let profile = student_profiles::find(state, slot.student_profile_id).await?;
    if profile.tutor_id != caller.id {
        return Err(ApiError::Forbidden);
    }
    Ok((slot, profile))
}

async fn find(state: &AppState, id: i64) -> ApiResult<ScheduleTimeSlot> {
    time_slots::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::SCHEDULE_TIME_SLOT))
}

/// GET /api/v1/student-profiles/:id/time-slots
pub async fn list_time_slots(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(profile_id): AppPath<i64>,
) -> ApiResult<ApiJson<Vec<ScheduleTimeSlot>>> {
    student_profiles::find_visible(&state, &caller, profile_id).await?;
    Ok(ok(time_slots::for_profile(&state.db, profile_id).await?))
}

/// POST /api/v1/student-profiles/:id/time-slots
pub async fn add_time_slot(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(profile_id): AppPath<i64>,
    AppJson(req): AppJson<TimeSlotInput>,
) -> ApiResult<ApiJson<ScheduleTimeSlot>> {
    let profile = student_profiles::find(&state, profile_id).await?;
    if profile.tutor_id != caller.id {
        return Err(ApiError::Forbidden);
    }
    ensure_editable(&profile)?;

    let slot = req.weekly()?;
    student_profiles::check_slots(&state, caller.id, &[slot], None).await?;

    let id = time_slots::insert(&state.db, profile_id, &slot).await?;
    info!("Tutor {} added slot {} ({}) to profile {}", caller.id, id, slot.label(), profile_id);

    if profile.status == StudentProfileStatus::Teaching {
        student_profiles::regenerate(&state, profile_id).await;
    }
    Ok(created(find(&state, id).await?))
}

/// PUT /api/v1/time-slots/:id
///
/// Upcoming untouched sessions of the slot are replaced with ones at the new
/// time.
pub async fn update_time_slot(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<TimeSlotInput>,
) -> ApiResult<ApiJson<ScheduleTimeSlot>> {
    let (_, profile) = find_own(&state, &caller, id).await?;
    ensure_editable(&profile)?;

    let slot = req.weekly()?;
    student_profiles::check_slots(&state, caller.id, &[slot], Some(id)).await?;

    let mut tx = state.db.begin().await?;
    time_slots::update(&mut *tx, id, &slot).await?;
    let removed = schedules::delete_upcoming_for_slot(&mut *tx, id, time::today()).await?;
    tx.commit().await?;
    info!(
        "Tutor {} moved slot {} to {} ({} upcoming sessions replaced)",
        caller.id,
        id,
        slot.label(),
        removed
    );

    if profile.status == StudentProfileStatus::Teaching {
        student_profiles::regenerate(&state, profile.id).await;
    }
    Ok(ok(find(&state, id).await?))
}

/// DELETE /api/v1/time-slots/:id
pub async fn delete_time_slot(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<StatusCode> {
    let (_, profile) = find_own(&state, &caller, id).await?;
    ensure_editable(&profile)?;

    let mut tx = state.db.begin().await?;
    time_slots::soft_delete(&mut *tx, id).await?;
    let removed = schedules::delete_upcoming_for_slot(&mut *tx, id, time::today()).await?;
    tx.commit().await?;
    info!(
        "Tutor {} deleted slot {} ({} upcoming sessions removed)",
        caller.id, id, removed
    );

    if removed > 0 {
        if let Err(e) = scheduling::notify_schedules_changed(&state.db, &state.event_bus, profile.id).await {
            warn!("Failed to push calendar refresh for student profile {}: {}", profile.id, e);
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

pub fn time_slot_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/student-profiles/:id/time-slots",
            get(list_time_slots).post(add_time_slot),
        )
        .route("/time-slots/:id", put(update_time_slot).delete(delete_time_slot))
}
