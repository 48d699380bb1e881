//! Exercise type queries

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tutorhub_common::time;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseType {
    pub id: i64,
    pub exercise_type_name: String,
    pub is_hide: bool,
    pub submitter_id: Option<i64>,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
}

const COLUMNS: &str = "id, exercise_type_name, is_hide, submitter_id, created_date, updated_date";

const FILTER: &str = r#"
    WHERE (?1 = 1 OR is_hide = 0)
      AND (?2 IS NULL OR exercise_type_name LIKE ?2)
"#;

pub async fn insert(pool: &SqlitePool, name: &str, submitter_id: i64) -> sqlx::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO exercise_types (exercise_type_name, is_hide, submitter_id, created_date) \
         VALUES (?, 0, ?, ?)",
    )
    .bind(name.trim())
    .bind(submitter_id)
    .bind(time::now())
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Case-insensitive name check, optionally ignoring one row (for renames)
pub async fn name_exists(pool: &SqlitePool, name: &str, except_id: Option<i64>) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM exercise_types WHERE exercise_type_name = ? AND (? IS NULL OR id != ?)",
    )
    .bind(name.trim())
    .bind(except_id)
    .bind(except_id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<ExerciseType>> {
    sqlx::query_as::<_, ExerciseType>(&format!("SELECT {COLUMNS} FROM exercise_types WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn count(pool: &SqlitePool, include_hidden: bool, search: &Option<String>) -> sqlx::Result<i64> {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM exercise_types {FILTER}"))
        .bind(include_hidden)
        .bind(search)
        .fetch_one(pool)
        .await
}

pub async fn list(
    pool: &SqlitePool,
    include_hidden: bool,
    search: &Option<String>,
    order: &str,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<ExerciseType>> {
    sqlx::query_as::<_, ExerciseType>(&format!(
        "SELECT {COLUMNS} FROM exercise_types {FILTER} {order} LIMIT ?3 OFFSET ?4"
    ))
    .bind(include_hidden)
    .bind(search)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn rename(pool: &SqlitePool, id: i64, name: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE exercise_types SET exercise_type_name = ?, updated_date = ? WHERE id = ?")
        .bind(name.trim())
        .bind(time::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_hidden(pool: &SqlitePool, id: i64, hidden: bool) -> sqlx::Result<()> {
    sqlx::query("UPDATE exercise_types SET is_hide = ?, updated_date = ? WHERE id = ?")
        .bind(hidden)
        .bind(time::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutorhub_common::db::init_memory_database;

    #[tokio::test]
    async fn test_hidden_types_filtered() {
        let pool = init_memory_database().await.unwrap();
        sqlx::query(
            "INSERT INTO users (id, email, full_name, password_hash, role, created_date) \
             VALUES (1, 'staff@example.com', 'Staff', 'x', 'STAFF', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let speech = insert(&pool, "Speech", 1).await.unwrap();
        insert(&pool, "Motor skills", 1).await.unwrap();
        set_hidden(&pool, speech, true).await.unwrap();

        assert_eq!(count(&pool, false, &None).await.unwrap(), 1);
        assert_eq!(count(&pool, true, &None).await.unwrap(), 2);

        assert!(name_exists(&pool, "speech", None).await.unwrap());
        assert!(!name_exists(&pool, "speech", Some(speech)).await.unwrap());
    }
}
