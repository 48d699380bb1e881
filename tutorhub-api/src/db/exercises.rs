//! Exercise queries

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use tutorhub_common::db::ApprovalStatus;
use tutorhub_common::time;

use super::ReviewFilter;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: i64,
    pub tutor_id: i64,
    pub exercise_type_id: i64,
    pub exercise_type_name: String,
    pub exercise_name: String,
    pub description: String,
    pub original_exercise_id: Option<i64>,
    pub version_number: i64,
    pub is_active: bool,
    pub request_status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub approved_by_id: Option<i64>,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewExercise<'a> {
    pub exercise_type_id: i64,
    pub exercise_name: &'a str,
    pub description: &'a str,
    pub original_exercise_id: Option<i64>,
    pub version_number: i64,
}

const SELECT: &str = r#"
    SELECT e.id, e.tutor_id, e.exercise_type_id, et.exercise_type_name, e.exercise_name,
           e.description, e.original_exercise_id, e.version_number, e.is_active,
           e.request_status, e.rejection_reason, e.approved_by_id, e.created_date, e.updated_date
    FROM exercises e
    JOIN exercise_types et ON et.id = e.exercise_type_id
"#;

const FILTER: &str = r#"
    WHERE e.is_deleted = 0
      AND (?1 IS NULL OR e.tutor_id = ?1)
      AND (?2 IS NULL OR e.request_status = ?2)
      AND (?3 IS NULL OR e.exercise_name LIKE ?3 OR e.description LIKE ?3)
      AND (?4 IS NULL OR e.exercise_type_id = ?4)
"#;

pub async fn insert<'e, E: SqliteExecutor<'e>>(
    executor: E,
    tutor_id: i64,
    exercise: &NewExercise<'_>,
) -> sqlx::Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO exercises (tutor_id, exercise_type_id, exercise_name, description,
                               original_exercise_id, version_number, is_active,
                               request_status, created_date)
        VALUES (?, ?, ?, ?, ?, ?, 0, 'PENDING', ?)
        "#,
    )
    .bind(tutor_id)
    .bind(exercise.exercise_type_id)
    .bind(exercise.exercise_name.trim())
    .bind(exercise.description)
    .bind(exercise.original_exercise_id)
    .bind(exercise.version_number)
    .bind(time::now())
    .execute(executor)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<Exercise>> {
    sqlx::query_as::<_, Exercise>(&format!("{SELECT} WHERE e.id = ? AND e.is_deleted = 0"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Whether the tutor already has a live exercise with this name
pub async fn name_exists_for_tutor(pool: &SqlitePool, tutor_id: i64, name: &str) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM exercises
        WHERE tutor_id = ? AND exercise_name = ? COLLATE NOCASE
          AND is_deleted = 0 AND request_status != 'REJECT'
        "#,
    )
    .bind(tutor_id)
    .bind(name.trim())
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub async fn count(pool: &SqlitePool, filter: &ReviewFilter, type_id: Option<i64>) -> sqlx::Result<i64> {
    sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM exercises e JOIN exercise_types et ON et.id = e.exercise_type_id {FILTER}"
    ))
    .bind(filter.owner_id)
    .bind(filter.status)
    .bind(&filter.search)
    .bind(type_id)
    .fetch_one(pool)
    .await
}

pub async fn list(
    pool: &SqlitePool,
    filter: &ReviewFilter,
    type_id: Option<i64>,
    order: &str,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<Exercise>> {
    sqlx::query_as::<_, Exercise>(&format!(
        "{SELECT} {FILTER} {order} LIMIT ?5 OFFSET ?6"
    ))
    .bind(filter.owner_id)
    .bind(filter.status)
    .bind(&filter.search)
    .bind(type_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// Approved, active exercises of a type, optionally limited to one tutor
pub async fn active_of_type(
    pool: &SqlitePool,
    type_id: i64,
    tutor_id: Option<i64>,
) -> sqlx::Result<Vec<Exercise>> {
    sqlx::query_as::<_, Exercise>(&format!(
        "{SELECT} WHERE e.exercise_type_id = ?1 AND e.is_deleted = 0 AND e.is_active = 1 \
         AND e.request_status = 'APPROVE' AND (?2 IS NULL OR e.tutor_id = ?2) \
         ORDER BY e.exercise_name"
    ))
    .bind(type_id)
    .bind(tutor_id)
    .fetch_all(pool)
    .await
}

/// Whether `exercise_id` is an approved, active exercise of the tutor with the given type
pub async fn is_usable(
    pool: &SqlitePool,
    exercise_id: i64,
    tutor_id: i64,
    type_id: i64,
) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM exercises
        WHERE id = ? AND tutor_id = ? AND exercise_type_id = ?
          AND is_deleted = 0 AND is_active = 1 AND request_status = 'APPROVE'
        "#,
    )
    .bind(exercise_id)
    .bind(tutor_id)
    .bind(type_id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub async fn versions(pool: &SqlitePool, root_id: i64) -> sqlx::Result<Vec<Exercise>> {
    sqlx::query_as::<_, Exercise>(&format!(
        "{SELECT} WHERE (e.id = ?1 OR e.original_exercise_id = ?1) AND e.is_deleted = 0 \
         ORDER BY e.version_number DESC"
    ))
    .bind(root_id)
    .fetch_all(pool)
    .await
}

pub async fn soft_delete(pool: &SqlitePool, id: i64) -> sqlx::Result<()> {
    sqlx::query("UPDATE exercises SET is_deleted = 1, updated_date = ? WHERE id = ?")
        .bind(time::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
