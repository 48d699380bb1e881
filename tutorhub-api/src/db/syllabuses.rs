//! Syllabus queries

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tutorhub_common::db::ApprovalStatus;
use tutorhub_common::time;

use super::ReviewFilter;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Syllabus {
    pub id: i64,
    pub tutor_id: i64,
    pub age_from: i64,
    pub age_end: i64,
    pub description: String,
    pub original_syllabus_id: Option<i64>,
    pub version_number: i64,
    pub is_active: bool,
    pub request_status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub approved_by_id: Option<i64>,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    pub exercises: Vec<SyllabusExercise>,
}

/// Exercise planned in a syllabus
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyllabusExercise {
    #[serde(skip)]
    pub syllabus_id: i64,
    pub exercise_type_id: i64,
    pub exercise_type_name: String,
    pub exercise_id: i64,
    pub exercise_name: String,
}

#[derive(Debug, Clone)]
pub struct NewSyllabus<'a> {
    pub age_from: i64,
    pub age_end: i64,
    pub description: &'a str,
    pub original_syllabus_id: Option<i64>,
    pub version_number: i64,
    /// `(exercise_type_id, exercise_id)` pairs
    pub exercises: &'a [(i64, i64)],
}

const COLUMNS: &str = "id, tutor_id, age_from, age_end, description, original_syllabus_id, \
                       version_number, is_active, request_status, rejection_reason, \
                       approved_by_id, created_date, updated_date";

const FILTER: &str = r#"
    WHERE is_deleted = 0
      AND (?1 IS NULL OR tutor_id = ?1)
      AND (?2 IS NULL OR request_status = ?2)
      AND (?3 IS NULL OR description LIKE ?3)
"#;

pub async fn insert(
    conn: &mut SqliteConnection,
    tutor_id: i64,
    syllabus: &NewSyllabus<'_>,
) -> sqlx::Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO syllabuses (tutor_id, age_from, age_end, description, original_syllabus_id,
                                version_number, is_active, request_status, created_date)
        VALUES (?, ?, ?, ?, ?, ?, 0, 'PENDING', ?)
        "#,
    )
    .bind(tutor_id)
    .bind(syllabus.age_from)
    .bind(syllabus.age_end)
    .bind(syllabus.description)
    .bind(syllabus.original_syllabus_id)
    .bind(syllabus.version_number)
    .bind(time::now())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    for (type_id, exercise_id) in syllabus.exercises {
        sqlx::query(
            "INSERT INTO syllabus_exercises (syllabus_id, exercise_type_id, exercise_id) VALUES (?, ?, ?)",
        )
        .bind(id)
        .bind(type_id)
        .bind(exercise_id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(id)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<Syllabus>> {
    let syllabus = sqlx::query_as::<_, Syllabus>(&format!(
        "SELECT {COLUMNS} FROM syllabuses WHERE id = ? AND is_deleted = 0"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match syllabus {
        Some(mut s) => {
            s.exercises = load_exercises(pool, &[s.id]).await?.remove(&s.id).unwrap_or_default();
            Ok(Some(s))
        }
        None => Ok(None),
    }
}

pub async fn age_range_taken(
    pool: &SqlitePool,
    tutor_id: i64,
    age_from: i64,
    age_end: i64,
) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM syllabuses
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
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM syllabuses {FILTER}"))
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
) -> sqlx::Result<Vec<Syllabus>> {
    let mut rows = sqlx::query_as::<_, Syllabus>(&format!(
        "SELECT {COLUMNS} FROM syllabuses {FILTER} {order} LIMIT ?4 OFFSET ?5"
    ))
    .bind(filter.owner_id)
    .bind(filter.status)
    .bind(&filter.search)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    attach_exercises(pool, &mut rows).await?;
    Ok(rows)
}

pub async fn versions(pool: &SqlitePool, root_id: i64) -> sqlx::Result<Vec<Syllabus>> {
    let mut rows = sqlx::query_as::<_, Syllabus>(&format!(
        "SELECT {COLUMNS} FROM syllabuses \
         WHERE (id = ?1 OR original_syllabus_id = ?1) AND is_deleted = 0 \
         ORDER BY version_number DESC"
    ))
    .bind(root_id)
    .fetch_all(pool)
    .await?;

    attach_exercises(pool, &mut rows).await?;
    Ok(rows)
}

pub async fn soft_delete(pool: &SqlitePool, id: i64) -> sqlx::Result<()> {
    sqlx::query("UPDATE syllabuses SET is_deleted = 1, updated_date = ? WHERE id = ?")
        .bind(time::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

async fn load_exercises(
    pool: &SqlitePool,
    ids: &[i64],
) -> sqlx::Result<HashMap<i64, Vec<SyllabusExercise>>> {
    let mut by_syllabus: HashMap<i64, Vec<SyllabusExercise>> = HashMap::new();
    if ids.is_empty() {
        return Ok(by_syllabus);
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        r#"
        SELECT se.syllabus_id, se.exercise_type_id, et.exercise_type_name,
               se.exercise_id, e.exercise_name
        FROM syllabus_exercises se
        JOIN exercise_types et ON et.id = se.exercise_type_id
        JOIN exercises e ON e.id = se.exercise_id
        WHERE se.syllabus_id IN ({placeholders})
        ORDER BY et.exercise_type_name, e.exercise_name
        "#
    );
    let mut query = sqlx::query_as::<_, SyllabusExercise>(&sql);
    for id in ids {
        query = query.bind(id);
    }

    for row in query.fetch_all(pool).await? {
        by_syllabus.entry(row.syllabus_id).or_default().push(row);
    }
    Ok(by_syllabus)
}

async fn attach_exercises(pool: &SqlitePool, rows: &mut [Syllabus]) -> sqlx::Result<()> {
    let ids: Vec<i64> = rows.iter().map(|s| s.id).collect();
    let mut exercises = load_exercises(pool, &ids).await?;
    for row in rows.iter_mut() {
        row.exercises = exercises.remove(&row.id).unwrap_or_default();
    }
    Ok(())
}
