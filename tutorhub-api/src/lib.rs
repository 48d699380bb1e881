//! tutorhub-api library interface
//!
//! Exposes the router and application state so integration tests can drive
//! the service in-process.

pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod db;
pub mod error;
pub mod mail;
pub mod notify;
pub mod pagination;
pub mod response;
pub mod scheduling;
pub mod storage;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tutorhub_common::api::TokenService;
use tutorhub_common::config::TomlConfig;
use tutorhub_common::events::EventBus;

use crate::mail::MailQueue;
use crate::storage::{BlobStorage, FsBlobStorage};

/// Multipart framing overhead allowed on top of the upload limit
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<TomlConfig>,
    pub tokens: TokenService,
    /// Push notifications and calendar refreshes for SSE streams
    pub event_bus: EventBus,
    pub mail: MailQueue,
    pub storage: Arc<dyn BlobStorage>,
    /// Directory served under `/media`
    pub media_root: PathBuf,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        config: TomlConfig,
        tokens: TokenService,
        event_bus: EventBus,
        mail: MailQueue,
        media_root: PathBuf,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            tokens,
            event_bus,
            mail,
            storage: Arc::new(FsBlobStorage::new(media_root.clone())),
            media_root,
            startup_time: Utc::now(),
        }
    }

    pub fn page_size(&self) -> i64 {
        self.config.api.page_size.max(1)
    }

    /// Public URL of a stored media file
    pub fn media_url(&self, name: &str) -> String {
        format!(
            "{}/media/{}",
            self.config.api.public_base_url.trim_end_matches('/'),
            name
        )
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.storage.max_upload_bytes + BODY_LIMIT_SLACK;
    let media = ServeDir::new(&state.media_root);

    Router::new()
        .nest("/api/v1", api::api_routes())
        .merge(api::health_routes())
        .nest_service("/media", media)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
