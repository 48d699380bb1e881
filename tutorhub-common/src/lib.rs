//! # TutorHub Common Library
//!
//! Shared code for the TutorHub service including:
//! - Bootstrap configuration and root folder resolution
//! - Database initialization, schema and shared domain enums
//! - Token and password primitives for API authentication
//! - Localized resource strings
//! - Event bus and SSE helpers for push notifications

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod resources;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
