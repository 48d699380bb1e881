//! Common error types for TutorHub

use thiserror::Error;

/// Common result type for TutorHub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the library and the HTTP service
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file or embedded table could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token issuing or verification error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Rejected argument, such as a media name with path separators
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
