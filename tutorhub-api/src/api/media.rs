//! Media uploads

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    routing::post,
    Router,
};
use serde::Serialize;
use tracing::info;
use tutorhub_common::resources::keys;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::response::{created, ApiJson};
use crate::storage;
use crate::AppState;

const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedMedia {
    pub file_name: String,
    pub url: String,
}

/// POST /api/v1/media
///
/// Accepts one `file` part (image or PDF) and returns its public URL.
pub async fn upload_media(
    State(state): State<AppState>,
    caller: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<ApiJson<UploadedMedia>> {
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let extension = storage::extension_for(&content_type)
            .ok_or_else(|| ApiError::bad_request_with(keys::UPLOAD_UNSUPPORTED_TYPE, &[&content_type]))?;

        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(ApiError::bad_request(keys::UPLOAD_MISSING_FILE));
        }
        if bytes.len() > state.config.storage.max_upload_bytes {
            return Err(ApiError::bad_request(keys::UPLOAD_TOO_LARGE));
        }

        let file_name = state.storage.save(extension, &bytes).await?;
        info!(
            "User {} uploaded {} ({} bytes, {})",
            caller.id,
            file_name,
            bytes.len(),
            content_type
        );

        let url = state.media_url(&file_name);
        return Ok(created(UploadedMedia { file_name, url }));
    }

    Err(ApiError::bad_request(keys::UPLOAD_MISSING_FILE))
}

pub fn media_routes() -> Router<AppState> {
    Router::new().route("/media", post(upload_media))
}
