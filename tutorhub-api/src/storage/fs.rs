//! Filesystem blob storage under `<root>/media`

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use tutorhub_common::{Error, Result};
use uuid::Uuid;

use super::BlobStorage;

#[derive(Debug, Clone)]
pub struct FsBlobStorage {
    root: PathBuf,
}

impl FsBlobStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a stored name, refusing anything that is not a plain file name
    fn path_for(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
            && !name.starts_with('.');
        if !valid {
            return Err(Error::InvalidInput(format!("Invalid media name: {}", name)));
        }
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl BlobStorage for FsBlobStorage {
    async fn save(&self, extension: &str, bytes: &[u8]) -> Result<String> {
        fs::create_dir_all(&self.root).await?;
        let name = format!("{}.{}", Uuid::new_v4(), extension);
        let path = self.path_for(&name)?;
        fs::write(&path, bytes).await?;
        debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(name)
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name)?;
        Ok(fs::try_exists(&path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_and_delete() {
        let dir = TempDir::new().unwrap();
        let storage = FsBlobStorage::new(dir.path().join("media"));

        let name = storage.save("png", b"\x89PNG").await.unwrap();
        assert!(name.ends_with(".png"));
        assert!(storage.exists(&name).await.unwrap());
        assert_eq!(std::fs::read(storage.root().join(&name)).unwrap(), b"\x89PNG");

        assert!(storage.delete(&name).await.unwrap());
        assert!(!storage.delete(&name).await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let storage = FsBlobStorage::new(dir.path().to_path_buf());
        assert!(storage.exists("../secret").await.is_err());
        assert!(storage.delete("a/b.png").await.is_err());
        assert!(storage.exists(".hidden").await.is_err());
    }
}
