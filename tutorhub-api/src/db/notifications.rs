//! Notification queries

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tutorhub_common::time;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub receiver_id: i64,
    pub message: String,
    pub url_link: Option<String>,
    pub is_read: bool,
    pub created_date: DateTime<Utc>,
}

const COLUMNS: &str = "id, receiver_id, message, url_link, is_read, created_date";

pub async fn insert(
    pool: &SqlitePool,
    receiver_id: i64,
    message: &str,
    url_link: Option<&str>,
) -> sqlx::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO notifications (receiver_id, message, url_link, is_read, created_date) VALUES (?, ?, ?, 0, ?)",
    )
    .bind(receiver_id)
    .bind(message)
    .bind(url_link)
    .bind(time::now())
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn count_for(pool: &SqlitePool, receiver_id: i64) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE receiver_id = ?")
        .bind(receiver_id)
        .fetch_one(pool)
        .await
}

pub async fn unread_count(pool: &SqlitePool, receiver_id: i64) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE receiver_id = ? AND is_read = 0")
        .bind(receiver_id)
        .fetch_one(pool)
        .await
}

/// Newest first
pub async fn list_for(
    pool: &SqlitePool,
    receiver_id: i64,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<Notification>> {
    sqlx::query_as::<_, Notification>(&format!(
        "SELECT {COLUMNS} FROM notifications WHERE receiver_id = ? \
         ORDER BY created_date DESC, id DESC LIMIT ? OFFSET ?"
    ))
    .bind(receiver_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<Notification>> {
    sqlx::query_as::<_, Notification>(&format!("SELECT {COLUMNS} FROM notifications WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn mark_read(pool: &SqlitePool, id: i64) -> sqlx::Result<()> {
    sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Returns how many notifications changed
pub async fn mark_all_read(pool: &SqlitePool, receiver_id: i64) -> sqlx::Result<u64> {
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE receiver_id = ? AND is_read = 0")
        .bind(receiver_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutorhub_common::db::init_memory_database;

    #[tokio::test]
    async fn test_unread_and_mark_all() {
        let pool = init_memory_database().await.unwrap();
        let user = sqlx::query(
            "INSERT INTO users (email, password_hash, full_name, role, created_date) VALUES ('p@x.io', 'h', 'P', 'PARENT', ?)",
        )
        .bind(time::now())
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();

        let first = insert(&pool, user, "one", None).await.unwrap();
        insert(&pool, user, "two", Some("/schedules")).await.unwrap();
        assert_eq!(unread_count(&pool, user).await.unwrap(), 2);

        mark_read(&pool, first).await.unwrap();
        assert_eq!(unread_count(&pool, user).await.unwrap(), 1);
        assert_eq!(mark_all_read(&pool, user).await.unwrap(), 1);
        assert_eq!(unread_count(&pool, user).await.unwrap(), 0);

        let listed = list_for(&pool, user, 10, 0).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].message, "two");
    }
}
