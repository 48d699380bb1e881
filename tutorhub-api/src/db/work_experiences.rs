//! Work experience queries

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use tutorhub_common::db::ApprovalStatus;
use tutorhub_common::time;

use super::{Owner, ReviewFilter};

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperience {
    pub id: i64,
    pub tutor_id: Option<i64>,
    pub tutor_registration_request_id: Option<i64>,
    pub company_name: String,
    pub position: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub request_status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub approved_by_id: Option<i64>,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewWorkExperience<'a> {
    pub company_name: &'a str,
    pub position: &'a str,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

const COLUMNS: &str = "id, tutor_id, tutor_registration_request_id, company_name, position, \
                       start_date, end_date, request_status, rejection_reason, approved_by_id, \
                       created_date, updated_date";

const FILTER: &str = r#"
    WHERE is_deleted = 0 AND tutor_id IS NOT NULL
      AND (?1 IS NULL OR tutor_id = ?1)
      AND (?2 IS NULL OR request_status = ?2)
      AND (?3 IS NULL OR company_name LIKE ?3 OR position LIKE ?3)
"#;

pub async fn insert<'e, E: SqliteExecutor<'e>>(
    executor: E,
    owner: Owner,
    experience: &NewWorkExperience<'_>,
) -> sqlx::Result<i64> {
    let (tutor_id, request_id) = owner.split();
    let result = sqlx::query(
        r#"
        INSERT INTO work_experiences (tutor_id, tutor_registration_request_id, company_name,
                                      position, start_date, end_date, request_status, created_date)
        VALUES (?, ?, ?, ?, ?, ?, 'PENDING', ?)
        "#,
    )
    .bind(tutor_id)
    .bind(request_id)
    .bind(experience.company_name)
    .bind(experience.position)
    .bind(experience.start_date)
    .bind(experience.end_date)
    .bind(time::now())
    .execute(executor)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<WorkExperience>> {
    sqlx::query_as::<_, WorkExperience>(&format!(
        "SELECT {COLUMNS} FROM work_experiences WHERE id = ? AND is_deleted = 0"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn count(pool: &SqlitePool, filter: &ReviewFilter) -> sqlx::Result<i64> {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM work_experiences {FILTER}"))
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
) -> sqlx::Result<Vec<WorkExperience>> {
    sqlx::query_as::<_, WorkExperience>(&format!(
        "SELECT {COLUMNS} FROM work_experiences {FILTER} {order} LIMIT ?4 OFFSET ?5"
    ))
    .bind(filter.owner_id)
    .bind(filter.status)
    .bind(&filter.search)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn approved_for_tutor(pool: &SqlitePool, tutor_id: i64) -> sqlx::Result<Vec<WorkExperience>> {
    sqlx::query_as::<_, WorkExperience>(&format!(
        "SELECT {COLUMNS} FROM work_experiences \
         WHERE tutor_id = ? AND is_deleted = 0 AND request_status = 'APPROVE' ORDER BY start_date DESC"
    ))
    .bind(tutor_id)
    .fetch_all(pool)
    .await
}

pub async fn for_registration(pool: &SqlitePool, request_id: i64) -> sqlx::Result<Vec<WorkExperience>> {
    sqlx::query_as::<_, WorkExperience>(&format!(
        "SELECT {COLUMNS} FROM work_experiences WHERE tutor_registration_request_id = ? ORDER BY id"
    ))
    .bind(request_id)
    .fetch_all(pool)
    .await
}

pub async fn transfer_from_registration<'e, E: SqliteExecutor<'e>>(
    executor: E,
    request_id: i64,
    tutor_id: i64,
    status: ApprovalStatus,
    reviewer_id: i64,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE work_experiences
        SET tutor_id = ?, request_status = ?, approved_by_id = ?, updated_date = ?
        WHERE tutor_registration_request_id = ?
        "#,
    )
    .bind(tutor_id)
    .bind(status)
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
        UPDATE work_experiences
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
    sqlx::query("UPDATE work_experiences SET is_deleted = 1, updated_date = ? WHERE id = ?")
        .bind(time::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
