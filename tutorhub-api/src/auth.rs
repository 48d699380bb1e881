//! Authenticated caller extractor
//!
//! The bearer token is read from the `Authorization` header, or from the
//! `access_token` query parameter for clients that cannot set headers
//! (browser `EventSource`). The user row is reloaded on every request so a
//! locked account is refused immediately.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::Deserialize;
use tracing::debug;
use tutorhub_common::api::bearer_token;
use tutorhub_common::db::Role;

use crate::db::users;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// The signed-in user
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

impl AuthUser {
    /// 403 unless the caller has one of `roles`
    pub fn require(&self, roles: &[Role]) -> ApiResult<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }

    /// 403 unless the caller is staff or a manager
    pub fn require_moderator(&self) -> ApiResult<()> {
        self.require(&[Role::Staff, Role::Manager])
    }

    pub fn is_moderator(&self) -> bool {
        self.role.is_moderator()
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    access_token: Option<String>,
}

fn token_from_parts(parts: &Parts) -> Option<String> {
    if let Some(token) = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
    {
        return Some(token.to_string());
    }

    Query::<TokenQuery>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(q)| q.access_token)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts).ok_or(ApiError::Unauthorized)?;
        let claims = state.tokens.verify(&token).map_err(|e| {
            debug!("Rejected token: {}", e);
            ApiError::Unauthorized
        })?;

        let user = users::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or(ApiError::Unauthorized)?;
        if user.is_locked_out {
            debug!("Locked account {} attempted access", user.id);
            return Err(ApiError::Forbidden);
        }

        Ok(AuthUser {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(uri: &str, auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_token_from_header() {
        let p = parts("/api/v1/auth/me", Some("Bearer abc.def"));
        assert_eq!(token_from_parts(&p).as_deref(), Some("abc.def"));
    }

    #[test]
    fn test_token_from_query() {
        let p = parts("/api/v1/notifications/stream?access_token=xyz", None);
        assert_eq!(token_from_parts(&p).as_deref(), Some("xyz"));
    }

    #[test]
    fn test_missing_token() {
        assert!(token_from_parts(&parts("/api/v1/auth/me", None)).is_none());
        assert!(token_from_parts(&parts("/x?access_token=", None)).is_none());
        assert!(token_from_parts(&parts("/x", Some("Basic Zm9v"))).is_none());
    }

    #[test]
    fn test_role_checks() {
        let user = AuthUser {
            id: 1,
            email: "t@x.io".to_string(),
            full_name: "T".to_string(),
            role: Role::Tutor,
        };
        assert!(user.require(&[Role::Tutor]).is_ok());
        assert!(matches!(user.require(&[Role::Parent]), Err(ApiError::Forbidden)));
        assert!(matches!(user.require_moderator(), Err(ApiError::Forbidden)));
        assert!(!user.is_moderator());
    }
}
