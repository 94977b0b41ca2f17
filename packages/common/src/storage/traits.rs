use async_trait::async_trait;

use super::error::StorageError;
use super::upload::UploadedFile;

/// Path-addressed file storage.
///
/// Paths are relative keys such as `avatars/0190c0de.png`; how they map to
/// files or objects is up to the implementation.
#[async_trait]
pub trait Disk: Send + Sync {
    /// Store an uploaded file under `directory` with a generated name and
    /// return the key it was written to.
    async fn store(&self, file: &UploadedFile, directory: &str) -> Result<String, StorageError> {
        let path = file.generate_path(directory);
        self.put_with_type(&path, file.contents(), file.content_type())
            .await?;
        Ok(path)
    }

    /// Retrieve all bytes stored at `path`.
    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Write `data` to `path`, replacing anything already there.
    async fn put(&self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        self.put_with_type(path, data, None).await
    }

    /// Write `data` to `path` with an optional content type hint.
    async fn put_with_type(
        &self,
        path: &str,
        data: &[u8],
        content_type: Option<&str>,
    ) -> Result<(), StorageError>;

    /// Delete the object at `path`.
    ///
    /// Returns `true` if it was deleted, `false` if it did not exist.
    async fn delete(&self, path: &str) -> Result<bool, StorageError>;

    /// Check whether an object exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Public URL for `path`. Does not check existence.
    fn url(&self, path: &str) -> String;
}

/// Join a base URL and a storage key with exactly one slash between them.
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if base.is_empty() {
        format!("/{path}")
    } else {
        format!("{base}/{path}")
    }
}

/// Reject keys that are empty, absolute, or contain `..` segments.
pub fn validate_key(path: &str) -> Result<&str, StorageError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(StorageError::InvalidPath("path cannot be empty".into()));
    }
    if trimmed.contains('\0') {
        return Err(StorageError::InvalidPath(format!(
            "path must not contain null bytes: {trimmed:?}"
        )));
    }
    if trimmed.starts_with('/') || trimmed.starts_with('\\') {
        return Err(StorageError::InvalidPath(format!(
            "path must be relative: {trimmed}"
        )));
    }
    if trimmed.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(StorageError::InvalidPath(format!(
            "path must not contain '..' traversal: {trimmed}"
        )));
    }
    Ok(trimmed)
}
