//! Database initialization, settings and shared domain enums

pub mod init;
pub mod models;
pub mod settings;

pub use init::*;
pub use models::*;
