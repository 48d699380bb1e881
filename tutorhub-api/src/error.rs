//! Error types for tutorhub-api
//!
//! Every error is answered with the standard [`ApiResponse`] envelope.
//! Unexpected failures are logged and answered with a generic message so
//! internals never leak to clients.

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};
use tutorhub_common::api::ApiResponse;
use tutorhub_common::resources::{self, keys};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing, invalid or expired token (401)
    #[error("Unauthorized")]
    Unauthorized,

    /// Role not allowed or resource owned by someone else (403)
    #[error("Forbidden")]
    Forbidden,

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 404 with the localized "<entity> was not found." message
    pub fn not_found(entity: &str) -> Self {
        ApiError::NotFound(resources::global().not_found(entity))
    }

    /// 400 with a localized message
    pub fn bad_request(key: &str) -> Self {
        ApiError::BadRequest(resources::global().get(key))
    }

    /// 400 with a localized, formatted message
    pub fn bad_request_with(key: &str, args: &[&str]) -> Self {
        ApiError::BadRequest(resources::global().format(key, args))
    }

    /// 400 "<entity> already exists."
    pub fn duplicate(entity: &str) -> Self {
        ApiError::BadRequest(resources::global().duplicate(entity))
    }

    /// 400 "<entity> has already been processed."
    pub fn already_processed(entity: &str) -> Self {
        ApiError::BadRequest(resources::global().already_processed(entity))
    }

    /// 400 "<field> is required."
    pub fn required(field: &str) -> Self {
        ApiError::BadRequest(resources::global().required(field))
    }

    /// 400 "<field> cannot be in the future."
    pub fn date_in_future(field: &str) -> Self {
        let resources = resources::global();
        ApiError::BadRequest(resources.format(keys::DATE_IN_FUTURE, &[&resources.field(field)]))
    }

    /// 400 "<field> cannot be in the past."
    pub fn date_in_past(field: &str) -> Self {
        let resources = resources::global();
        ApiError::BadRequest(resources.format(keys::DATE_IN_PAST, &[&resources.field(field)]))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let resources = resources::global();

        let message = match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => msg,
            ApiError::Unauthorized => resources.get(keys::UNAUTHORIZED),
            ApiError::Forbidden => resources.get(keys::FORBIDDEN),
            ApiError::Internal(detail) => {
                error!("Internal server error: {}", detail);
                resources.get(keys::INTERNAL_SERVER_ERROR)
            }
        };

        let body: ApiResponse<()> = ApiResponse::failure(status.as_u16(), vec![message]);
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Internal(format!("Database error: {}", err))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(format!("IO error: {}", err))
    }
}

impl From<tutorhub_common::Error> for ApiError {
    fn from(err: tutorhub_common::Error) -> Self {
        use tutorhub_common::Error;
        match err {
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Auth(msg) => {
                warn!("Authentication failure: {}", msg);
                ApiError::Unauthorized
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_envelope() {
        let response = ApiError::not_found(resources::entities::CERTIFICATE).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        assert_eq!(json["isSuccess"], false);
        assert_eq!(json["statusCode"], 404);
        assert_eq!(json["errorMessages"][0], "Certificate was not found.");
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let response = ApiError::Internal("disk on fire".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        let message = json["errorMessages"][0].as_str().unwrap();
        assert!(!message.contains("disk on fire"));
    }

    #[test]
    fn test_common_error_mapping() {
        let err: ApiError = tutorhub_common::Error::InvalidInput("bad".to_string()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = tutorhub_common::Error::Auth("expired".to_string()).into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err: ApiError = tutorhub_common::Error::Config("x".to_string()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
