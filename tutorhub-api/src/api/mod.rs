//! HTTP API handlers for tutorhub-api
//!
//! Every route lives under `/api/v1` except `/health`. Each module exposes a
//! `*_routes()` function returning its sub-router.

pub mod assessments;
pub mod auth;
pub mod certificates;
pub mod children;
pub mod curriculums;
pub mod exercise_types;
pub mod exercises;
pub mod health;
pub mod media;
pub mod notifications;
pub mod progress_reports;
pub mod registrations;
pub mod schedules;
pub mod student_profiles;
pub mod syllabuses;
pub mod test_bank;
pub mod time_slots;
pub mod tutor_requests;
pub mod tutors;
pub mod work_experiences;

mod review;
mod validate;

pub use health::health_routes;

use axum::Router;

use crate::AppState;

/// Routes mounted under `/api/v1`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::build_info_routes())
        .merge(auth::auth_routes())
        .merge(registrations::registration_routes())
        .merge(tutors::tutor_routes())
        .merge(certificates::certificate_routes())
        .merge(work_experiences::work_experience_routes())
        .merge(curriculums::curriculum_routes())
        .merge(exercise_types::exercise_type_routes())
        .merge(exercises::exercise_routes())
        .merge(syllabuses::syllabus_routes())
        .merge(children::child_routes())
        .merge(tutor_requests::tutor_request_routes())
        .merge(student_profiles::student_profile_routes())
        .merge(time_slots::time_slot_routes())
        .merge(schedules::schedule_routes())
        .merge(assessments::assessment_routes())
        .merge(progress_reports::progress_report_routes())
        .merge(test_bank::test_routes())
        .merge(notifications::notification_routes())
        .merge(media::media_routes())
}
