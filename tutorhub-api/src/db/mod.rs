//! Repository layer
//!
//! One module per table family. Functions take a pool, a generic executor or
//! a connection (for multi-statement inserts run inside a transaction) and
//! return `sqlx::Result`; handlers turn those into API errors.

pub mod assessments;
pub mod certificates;
pub mod children;
pub mod curriculums;
pub mod exercise_types;
pub mod exercises;
pub mod moderation;
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
pub mod users;
pub mod versioning;
pub mod work_experiences;

use tutorhub_common::db::ApprovalStatus;

/// Owner of a qualification row: an approved tutor or a pending registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Tutor(i64),
    Registration(i64),
}

impl Owner {
    /// `(tutor_id, tutor_registration_request_id)` column values
    pub fn split(self) -> (Option<i64>, Option<i64>) {
        match self {
            Owner::Tutor(id) => (Some(id), None),
            Owner::Registration(id) => (None, Some(id)),
        }
    }
}

/// Filter shared by the moderated listings
#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    /// Restrict to one tutor's rows
    pub owner_id: Option<i64>,
    pub status: Option<ApprovalStatus>,
    /// `LIKE` pattern
    pub search: Option<String>,
}
