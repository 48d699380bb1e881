//! Runtime key-value settings

use crate::Result;
use sqlx::SqlitePool;

/// Read a setting, `None` when the key is absent or NULL
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;
    Ok(value.flatten())
}

/// Insert or replace a setting
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;

    #[tokio::test]
    async fn test_missing_setting_is_none() {
        let pool = init_memory_database().await.unwrap();
        assert_eq!(get_setting(&pool, "nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get_overwrites() {
        let pool = init_memory_database().await.unwrap();
        set_setting(&pool, "jwt_secret", "one").await.unwrap();
        set_setting(&pool, "jwt_secret", "two").await.unwrap();
        assert_eq!(
            get_setting(&pool, "jwt_secret").await.unwrap().as_deref(),
            Some("two")
        );
    }
}
