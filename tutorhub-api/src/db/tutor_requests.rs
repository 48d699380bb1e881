//! Tutor request queries
//!
//! A parent asks a tutor to teach one of their children; the tutor answers
//! with `APPROVE` or `REJECT`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tutorhub_common::db::ApprovalStatus;
use tutorhub_common::time;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorRequest {
    pub id: i64,
    pub parent_id: i64,
    pub parent_name: String,
    pub parent_email: String,
    pub tutor_id: i64,
    pub tutor_name: String,
    pub tutor_email: String,
    pub child_id: i64,
    pub child_name: String,
    pub description: String,
    pub request_status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub has_student_profile: bool,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
}

/// Which side of the request the caller is on
#[derive(Debug, Clone, Default)]
pub struct TutorRequestFilter {
    pub parent_id: Option<i64>,
    pub tutor_id: Option<i64>,
    pub status: Option<ApprovalStatus>,
    pub search: Option<String>,
}

const SELECT: &str = r#"
    SELECT r.id, r.parent_id, p.full_name AS parent_name, p.email AS parent_email,
           r.tutor_id, t.full_name AS tutor_name, t.email AS tutor_email,
           r.child_id, c.name AS child_name, r.description, r.request_status,
           r.rejection_reason,
           EXISTS (SELECT 1 FROM student_profiles sp WHERE sp.tutor_request_id = r.id)
               AS has_student_profile,
           r.created_date, r.updated_date
    FROM tutor_requests r
    JOIN users p ON p.id = r.parent_id
    JOIN users t ON t.id = r.tutor_id
    JOIN child_informations c ON c.id = r.child_id
"#;

const FILTER: &str = r#"
    WHERE (?1 IS NULL OR r.parent_id = ?1)
      AND (?2 IS NULL OR r.tutor_id = ?2)
      AND (?3 IS NULL OR r.request_status = ?3)
      AND (?4 IS NULL OR p.full_name LIKE ?4 OR t.full_name LIKE ?4 OR c.name LIKE ?4)
"#;

pub async fn insert(
    pool: &SqlitePool,
    parent_id: i64,
    tutor_id: i64,
    child_id: i64,
    description: &str,
) -> sqlx::Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO tutor_requests (parent_id, tutor_id, child_id, description, request_status,
                                    created_date)
        VALUES (?, ?, ?, ?, 'PENDING', ?)
        "#,
    )
    .bind(parent_id)
    .bind(tutor_id)
    .bind(child_id)
    .bind(description)
    .bind(time::now())
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<TutorRequest>> {
    sqlx::query_as::<_, TutorRequest>(&format!("{SELECT} WHERE r.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn pending_exists(
    pool: &SqlitePool,
    parent_id: i64,
    tutor_id: i64,
    child_id: i64,
) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM tutor_requests
        WHERE parent_id = ? AND tutor_id = ? AND child_id = ? AND request_status = 'PENDING'
        "#,
    )
    .bind(parent_id)
    .bind(tutor_id)
    .bind(child_id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub async fn count(pool: &SqlitePool, filter: &TutorRequestFilter) -> sqlx::Result<i64> {
    sqlx::query_scalar(&format!(
        r#"
        SELECT COUNT(*) FROM tutor_requests r
        JOIN users p ON p.id = r.parent_id
        JOIN users t ON t.id = r.tutor_id
        JOIN child_informations c ON c.id = r.child_id
        {FILTER}
        "#
    ))
    .bind(filter.parent_id)
    .bind(filter.tutor_id)
    .bind(filter.status)
    .bind(&filter.search)
    .fetch_one(pool)
    .await
}

pub async fn list(
    pool: &SqlitePool,
    filter: &TutorRequestFilter,
    order: &str,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<TutorRequest>> {
    sqlx::query_as::<_, TutorRequest>(&format!("{SELECT} {FILTER} {order} LIMIT ?5 OFFSET ?6"))
        .bind(filter.parent_id)
        .bind(filter.tutor_id)
        .bind(filter.status)
        .bind(&filter.search)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

/// Answer a pending request; false when it was already answered
pub async fn answer(
    pool: &SqlitePool,
    id: i64,
    status: ApprovalStatus,
    rejection_reason: Option<&str>,
) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE tutor_requests
        SET request_status = ?, rejection_reason = ?, updated_date = ?
        WHERE id = ? AND request_status = 'PENDING'
        "#,
    )
    .bind(status)
    .bind(rejection_reason)
    .bind(time::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
