//! Shared HTTP API primitives
//!
//! This module contains ONLY framework-independent code: token issuing and
//! verification, password hashing and the response envelope types. The HTTP
//! service wraps these with its Axum extractors and responses.

pub mod auth;
pub mod password;
pub mod types;

pub use auth::{bearer_token, load_jwt_secret, Claims, TokenService, JWT_SECRET_KEY};
pub use password::{generate_password, hash_password, verify_password};
pub use types::{ApiResponse, Pagination};
