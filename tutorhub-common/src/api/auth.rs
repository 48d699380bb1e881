//! Bearer token issuing and verification
//!
//! Tokens are HS256 JWTs carrying the user id, email and role. The signing
//! secret comes from configuration; when configuration leaves it empty the
//! secret is loaded from the `settings` table, and generated on first start.

use crate::db::models::Role;
use crate::db::settings::{get_setting, set_setting};
use crate::{Error, Result};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

/// Settings key holding the generated signing secret
pub const JWT_SECRET_KEY: &str = "jwt_secret";

/// Payload stored in the token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i64,
    pub email: String,
    pub role: Role,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
}

/// Issues and verifies bearer tokens
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    expiry_minutes: i64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("expiry_minutes", &self.expiry_minutes)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Create a token service; the secret must be at least 32 characters
    pub fn new(secret: String, expiry_minutes: i64) -> Result<Self> {
        if secret.len() < 32 {
            return Err(Error::Config(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }
        Ok(Self {
            secret,
            expiry_minutes,
        })
    }

    pub fn expiry_minutes(&self) -> i64 {
        self.expiry_minutes
    }

    /// Issue a token for a user
    pub fn issue(&self, user_id: i64, email: &str, role: Role) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role,
            iat: now,
            exp: now + self.expiry_minutes * 60,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| Error::Auth(format!("Failed to issue token: {}", e)))
    }

    /// Verify signature and expiry, returning the claims
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|err| {
            let reason = match err.kind() {
                ErrorKind::ExpiredSignature => "Token expired",
                ErrorKind::InvalidSignature => "Invalid signature",
                ErrorKind::InvalidToken => "Invalid token",
                _ => "Token validation failed",
            };
            Error::Auth(reason.to_string())
        })
    }
}

/// Load the signing secret, generating and storing one if missing
pub async fn load_jwt_secret(pool: &SqlitePool) -> Result<String> {
    if let Some(secret) = get_setting(pool, JWT_SECRET_KEY).await? {
        if secret.len() >= 32 {
            return Ok(secret);
        }
    }

    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let secret: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();

    set_setting(pool, JWT_SECRET_KEY, &secret).await?;
    info!("Generated new token signing secret");

    Ok(secret)
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_short_secret_rejected() {
        assert!(TokenService::new("short".to_string(), 60).is_err());
    }

    #[test]
    fn test_issue_and_verify() {
        let service = TokenService::new(SECRET.to_string(), 60).unwrap();
        let token = service.issue(42, "tutor@example.com", Role::Tutor).unwrap();

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.email, "tutor@example.com");
        assert_eq!(claims.role, Role::Tutor);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_signed_with_other_secret_rejected() {
        let issuer = TokenService::new(SECRET.to_string(), 60).unwrap();
        let verifier = TokenService::new("fedcba9876543210fedcba9876543210".to_string(), 60).unwrap();
        let token = issuer.issue(1, "a@b.c", Role::Parent).unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        // Expired well beyond the default 60s leeway
        let service = TokenService::new(SECRET.to_string(), -10).unwrap();
        let token = service.issue(1, "a@b.c", Role::Parent).unwrap();
        assert!(service.verify(&token).is_err());
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer   abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[tokio::test]
    async fn test_secret_generated_once_then_reused() {
        let pool = init_memory_database().await.unwrap();
        let first = load_jwt_secret(&pool).await.unwrap();
        let second = load_jwt_secret(&pool).await.unwrap();
        assert_eq!(first.len(), 64);
        assert_eq!(first, second);
    }
}
