//! Uploaded media storage

mod fs;

pub use fs::FsBlobStorage;

use async_trait::async_trait;
use tutorhub_common::Result;

/// Content types accepted for upload and the extension stored with each
pub const ALLOWED_CONTENT_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("application/pdf", "pdf"),
];

/// Extension for an accepted content type
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    ALLOWED_CONTENT_TYPES
        .iter()
        .find(|(ty, _)| ty.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
}

/// Blob store for uploaded files
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `bytes` under a fresh name and return that name
    async fn save(&self, extension: &str, bytes: &[u8]) -> Result<String>;

    /// Remove a stored file; false when it did not exist
    async fn delete(&self, name: &str) -> Result<bool>;

    async fn exists(&self, name: &str) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for_content_types() {
        assert_eq!(extension_for("image/png"), Some("png"));
        assert_eq!(extension_for("IMAGE/JPEG"), Some("jpg"));
        assert_eq!(extension_for("application/pdf; charset=binary"), Some("pdf"));
        assert_eq!(extension_for("text/html"), None);
        assert_eq!(extension_for(""), None);
    }
}
