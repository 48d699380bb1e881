//! User account queries

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use tutorhub_common::db::Role;
use tutorhub_common::time;

/// Row of the `users` table
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub image_url: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_locked_out: bool,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
}

/// Values for a new account
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub full_name: &'a str,
    pub phone_number: Option<&'a str>,
    pub address: Option<&'a str>,
    pub image_url: Option<&'a str>,
    pub password_hash: &'a str,
    pub role: Role,
}

const USER_COLUMNS: &str = "id, email, full_name, phone_number, address, image_url, \
                            password_hash, role, is_locked_out, created_date, updated_date";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Email lookup is case-insensitive (column collation)
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
        .bind(email.trim())
        .fetch_optional(pool)
        .await
}

pub async fn email_exists<'e, E: SqliteExecutor<'e>>(executor: E, email: &str) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(email.trim())
        .fetch_one(executor)
        .await?;
    Ok(count > 0)
}

/// Insert an account and return its id
pub async fn insert<'e, E: SqliteExecutor<'e>>(executor: E, user: &NewUser<'_>) -> sqlx::Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (email, full_name, phone_number, address, image_url,
                           password_hash, role, is_locked_out, created_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(user.email.trim())
    .bind(user.full_name)
    .bind(user.phone_number)
    .bind(user.address)
    .bind(user.image_url)
    .bind(user.password_hash)
    .bind(user.role)
    .bind(time::now())
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update_password(pool: &SqlitePool, id: i64, password_hash: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE users SET password_hash = ?, updated_date = ? WHERE id = ?")
        .bind(password_hash)
        .bind(time::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Update contact details shown on the profile
pub async fn update_contact<'e, E: SqliteExecutor<'e>>(
    executor: E,
    id: i64,
    full_name: &str,
    phone_number: Option<&str>,
    address: Option<&str>,
    image_url: Option<&str>,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET full_name = ?, phone_number = ?, address = ?, image_url = ?, updated_date = ?
        WHERE id = ?
        "#,
    )
    .bind(full_name)
    .bind(phone_number)
    .bind(address)
    .bind(image_url)
    .bind(time::now())
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn set_locked_out(pool: &SqlitePool, id: i64, locked: bool) -> sqlx::Result<bool> {
    let result = sqlx::query("UPDATE users SET is_locked_out = ?, updated_date = ? WHERE id = ?")
        .bind(locked)
        .bind(time::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Ids of all staff and manager accounts, used to notify moderators
pub async fn moderator_ids(pool: &SqlitePool) -> sqlx::Result<Vec<i64>> {
    sqlx::query_scalar(
        "SELECT id FROM users WHERE role IN ('STAFF', 'MANAGER') AND is_locked_out = 0",
    )
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutorhub_common::db::init_memory_database;

    fn parent<'a>(email: &'a str) -> NewUser<'a> {
        NewUser {
            email,
            full_name: "Parent One",
            phone_number: Some("0900000000"),
            address: None,
            image_url: None,
            password_hash: "hash",
            role: Role::Parent,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let pool = init_memory_database().await.unwrap();
        let id = insert(&pool, &parent("p1@example.com")).await.unwrap();

        let by_id = find_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(by_id.role, Role::Parent);
        assert!(!by_id.is_locked_out);

        let by_email = find_by_email(&pool, "P1@Example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, id);
        assert!(email_exists(&pool, "p1@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_password_hash_not_serialized() {
        let pool = init_memory_database().await.unwrap();
        let id = insert(&pool, &parent("p2@example.com")).await.unwrap();
        let user = find_by_id(&pool, id).await.unwrap().unwrap();

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["fullName"], "Parent One");
    }

    #[tokio::test]
    async fn test_lock_out() {
        let pool = init_memory_database().await.unwrap();
        let id = insert(&pool, &parent("p3@example.com")).await.unwrap();
        assert!(set_locked_out(&pool, id, true).await.unwrap());
        assert!(find_by_id(&pool, id).await.unwrap().unwrap().is_locked_out);
        assert!(!set_locked_out(&pool, 999, true).await.unwrap());
    }
}
