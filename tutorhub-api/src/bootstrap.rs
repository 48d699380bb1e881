//! First-start account provisioning

use sqlx::SqlitePool;
use tracing::{info, warn};
use tutorhub_common::api::hash_password;
use tutorhub_common::config::BootstrapConfig;
use tutorhub_common::db::Role;
use tutorhub_common::Result;

use crate::db::users::{self, NewUser};

/// Create the configured manager account when no user has that email
///
/// Returns true when the account was created.
pub async fn ensure_manager_account(pool: &SqlitePool, config: &BootstrapConfig) -> Result<bool> {
    let email = config.manager_email.trim();
    if email.is_empty() {
        warn!("No bootstrap manager email configured");
        return Ok(false);
    }

    if users::email_exists(pool, email).await? {
        return Ok(false);
    }

    let password_hash = hash_password(&config.manager_password)?;
    users::insert(
        pool,
        &NewUser {
            email,
            full_name: "Manager",
            phone_number: None,
            address: None,
            image_url: None,
            password_hash: &password_hash,
            role: Role::Manager,
        },
    )
    .await?;

    info!("Created bootstrap manager account {}", email);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutorhub_common::db::init_memory_database;

    #[tokio::test]
    async fn test_manager_created_once() {
        let pool = init_memory_database().await.unwrap();
        let config = BootstrapConfig::default();

        assert!(ensure_manager_account(&pool, &config).await.unwrap());
        assert!(!ensure_manager_account(&pool, &config).await.unwrap());

        let user = users::find_by_email(&pool, &config.manager_email).await.unwrap().unwrap();
        assert_eq!(user.role, Role::Manager);
    }
}
