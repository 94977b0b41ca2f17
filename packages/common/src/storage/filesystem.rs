use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::error::StorageError;
use super::traits::{Disk, join_url, validate_key};

/// Filesystem-backed disk.
///
/// Keys map directly onto paths below `root`. Writes land in
/// `{root}/.tmp` first and are renamed into place.
pub struct FilesystemDisk {
    root: PathBuf,
    url: String,
}

impl FilesystemDisk {
    /// Create a new filesystem disk, creating `root` if needed.
    pub async fn new(root: PathBuf, url: impl Into<String>) -> Result<Self, StorageError> {
        fs::create_dir_all(&root).await?;
        fs::create_dir_all(root.join(".tmp")).await?;
        Ok(Self {
            root,
            url: url.into(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Compute the filesystem path for a key.
    fn full_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(validate_key(path)?))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.root
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl Disk for FilesystemDisk {
    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full_path = self.full_path(path)?;
        match fs::read(&full_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put_with_type(
        &self,
        path: &str,
        data: &[u8],
        _content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        let full_path = self.full_path(path)?;
        debug!(path, size = data.len(), "filesystem disk: put");

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &full_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        let full_path = self.full_path(path)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let full_path = self.full_path(path)?;
        Ok(fs::try_exists(&full_path).await?)
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.url, path)
    }
}
