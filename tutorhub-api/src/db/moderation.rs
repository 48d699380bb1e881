//! Approval workflow columns shared by moderated tables
//!
//! Every moderated table carries `request_status`, `rejection_reason`,
//! `approved_by_id` and `updated_date`.

use sqlx::SqliteExecutor;
use tutorhub_common::db::ApprovalStatus;
use tutorhub_common::time;

/// Tables that go through staff review
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Moderated {
    TutorRegistrationRequests,
    Certificates,
    WorkExperiences,
    Curriculums,
    Exercises,
    Syllabuses,
}

impl Moderated {
    pub fn table(&self) -> &'static str {
        match self {
            Moderated::TutorRegistrationRequests => "tutor_registration_requests",
            Moderated::Certificates => "certificates",
            Moderated::WorkExperiences => "work_experiences",
            Moderated::Curriculums => "curriculums",
            Moderated::Exercises => "exercises",
            Moderated::Syllabuses => "syllabuses",
        }
    }
}

/// Record a review decision on a row that is still `PENDING`
///
/// Returns false when the row does not exist or was already reviewed, so
/// two moderators racing on the same row cannot both succeed.
pub async fn review<'e, E: SqliteExecutor<'e>>(
    executor: E,
    target: Moderated,
    id: i64,
    status: ApprovalStatus,
    rejection_reason: Option<&str>,
    reviewer_id: i64,
) -> sqlx::Result<bool> {
    let sql = format!(
        r#"
        UPDATE {}
        SET request_status = ?, rejection_reason = ?, approved_by_id = ?, updated_date = ?
        WHERE id = ? AND request_status = 'PENDING'
        "#,
        target.table()
    );

    let result = sqlx::query(&sql)
        .bind(status)
        .bind(rejection_reason)
        .bind(reviewer_id)
        .bind(time::now())
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutorhub_common::db::init_memory_database;

    #[tokio::test]
    async fn test_review_only_once() {
        let pool = init_memory_database().await.unwrap();
        sqlx::query(
            "INSERT INTO users (id, email, full_name, password_hash, role, created_date) \
             VALUES (1, 'staff@example.com', 'Staff', 'x', 'STAFF', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO work_experiences (id, tutor_id, company_name, position, start_date, \
             request_status, created_date) \
             VALUES (5, NULL, 'Sunrise Center', 'Therapist', '2020-01-01', 'PENDING', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let first = review(&pool, Moderated::WorkExperiences, 5, ApprovalStatus::Approve, None, 1)
            .await
            .unwrap();
        let second = review(&pool, Moderated::WorkExperiences, 5, ApprovalStatus::Reject, Some("late"), 1)
            .await
            .unwrap();
        assert!(first);
        assert!(!second);

        let status: String = sqlx::query_scalar("SELECT request_status FROM work_experiences WHERE id = 5")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(status, "APPROVE");
    }
}
