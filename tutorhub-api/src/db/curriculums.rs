//! Curriculum queries

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use tutorhub_common::db::ApprovalStatus;
use tutorhub_common::time;

use super::{Owner, ReviewFilter};

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Curriculum {
    pub id: i64,
    pub tutor_id: Option<i64>,
    pub tutor_registration_request_id: Option<i64>,
    pub age_from: i64,
    pub age_end: i64,
    pub description: String,
    pub original_curriculum_id: Option<i64>,
    pub version_number: i64,
    pub is_active: bool,
    pub request_status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub approved_by_id: Option<i64>,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewCurriculum<'a> {
    pub age_from: i64,
    pub age_end: i64,
    pub description: &'a str,
    pub original_curriculum_id: Option<i64>,
    pub version_number: i64,
}

const COLUMNS: &str = "id, tutor_id, tutor_registration_request_id, age_from, age_end, \
                       description, original_curriculum_id, version_number, is_active, \
                       request_status, rejection_reason, approved_by_id, created_date, updated_date";

const FILTER: &str = r#"
    WHERE is_deleted = 0 AND tutor_id IS NOT NULL
      AND (?1 IS NULL OR tutor_id = ?1)
      AND (?2 IS NULL OR request_status = ?2)
      AND (?3 IS NULL OR description LIKE ?3)
"#;

pub async fn insert<'e, E: SqliteExecutor<'e>>(
    executor: E,
    owner: Owner,
    curriculum: &NewCurriculum<'_>,
) -> sqlx::Result<i64> {
    let (tutor_id, request_id) = owner.split();
    let result = sqlx::query(
        r#"
        INSERT INTO curriculums (tutor_id, tutor_registration_request_id, age_from, age_end,
                                 description, original_curriculum_id, version_number, is_active,
                                 request_status, created_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, 0, 'PENDING', ?)
        "#,
    )
    .bind(tutor_id)
    .bind(request_id)
    .bind(curriculum.age_from)
    .bind(curriculum.age_end)
    .bind(curriculum.description)
    .bind(curriculum.original_curriculum_id)
    .bind(curriculum.version_number)
    .bind(time::now())
    .execute(executor)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<Curriculum>> {
    sqlx::query_as::<_, Curriculum>(&format!(
        "SELECT {COLUMNS} FROM curriculums WHERE id = ? AND is_deleted = 0"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// A live curriculum for the same age range blocks a second, unversioned one
pub async fn age_range_taken(
    pool: &SqlitePool,
    tutor_id: i64,
    age_from: i64,
    age_end: i64,
) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM curriculums
        WHERE tutor_id = ? AND age_from = ? AND age_end = ? AND is_deleted = 0
          AND (request_status = 'PENDING' OR is_active = 1)
        "#,
    )
    .bind(tutor_id)
    .bind(age_from)
    .bind(age_end)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub async fn count(pool: &SqlitePool, filter: &ReviewFilter) -> sqlx::Result<i64> {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM curriculums {FILTER}"))
        .bind(filter.owner_id)
        .bind(filter.status)
        .bind(&filter.search)
        .fetch_one(pool)
        .await
}

pub async fn list(
    pool: &SqlitePool,
    filter: &ReviewFilter,
    order: &str,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<Curriculum>> {
    sqlx::query_as::<_, Curriculum>(&format!(
        "SELECT {COLUMNS} FROM curriculums {FILTER} {order} LIMIT ?4 OFFSET ?5"
    ))
    .bind(filter.owner_id)
    .bind(filter.status)
    .bind(&filter.search)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn active_for_tutor(pool: &SqlitePool, tutor_id: i64) -> sqlx::Result<Vec<Curriculum>> {
    sqlx::query_as::<_, Curriculum>(&format!(
        "SELECT {COLUMNS} FROM curriculums \
         WHERE tutor_id = ? AND is_deleted = 0 AND is_active = 1 ORDER BY age_from"
    ))
    .bind(tutor_id)
    .fetch_all(pool)
    .await
}

pub async fn for_registration(pool: &SqlitePool, request_id: i64) -> sqlx::Result<Vec<Curriculum>> {
    sqlx::query_as::<_, Curriculum>(&format!(
        "SELECT {COLUMNS} FROM curriculums WHERE tutor_registration_request_id = ? ORDER BY id"
    ))
    .bind(request_id)
    .fetch_all(pool)
    .await
}

/// Every version of the lineage rooted at `root_id`, newest first
pub async fn versions(pool: &SqlitePool, root_id: i64) -> sqlx::Result<Vec<Curriculum>> {
    sqlx::query_as::<_, Curriculum>(&format!(
        "SELECT {COLUMNS} FROM curriculums \
         WHERE (id = ?1 OR original_curriculum_id = ?1) AND is_deleted = 0 \
         ORDER BY version_number DESC"
    ))
    .bind(root_id)
    .fetch_all(pool)
    .await
}

/// Approved registration: curriculums become the tutor's active first versions
pub async fn activate_from_registration<'e, E: SqliteExecutor<'e>>(
    executor: E,
    request_id: i64,
    tutor_id: i64,
    reviewer_id: i64,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE curriculums
        SET tutor_id = ?, request_status = 'APPROVE', is_active = 1, version_number = 1,
            approved_by_id = ?, updated_date = ?
        WHERE tutor_registration_request_id = ?
        "#,
    )
    .bind(tutor_id)
    .bind(reviewer_id)
    .bind(time::now())
    .bind(request_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn reject_for_registration<'e, E: SqliteExecutor<'e>>(
    executor: E,
    request_id: i64,
    reviewer_id: i64,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE curriculums
        SET request_status = 'REJECT', approved_by_id = ?, updated_date = ?
        WHERE tutor_registration_request_id = ?
        "#,
    )
    .bind(reviewer_id)
    .bind(time::now())
    .bind(request_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn soft_delete(pool: &SqlitePool, id: i64) -> sqlx::Result<()> {
    sqlx::query("UPDATE curriculums SET is_deleted = 1, updated_date = ? WHERE id = ?")
        .bind(time::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
