use std::fmt;

/// Errors that can occur during disk operations.
#[derive(Debug)]
pub enum StorageError {
    /// No object exists at the requested path.
    NotFound(String),
    /// An I/O error occurred.
    Io(std::io::Error),
    /// The path is empty, absolute, or escapes the disk root.
    InvalidPath(String),
    /// The remote backend rejected the request.
    Backend(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "file not found: {path}"),
            Self::Io(err) => write!(f, "storage IO error: {err}"),
            Self::InvalidPath(msg) => write!(f, "invalid storage path: {msg}"),
            Self::Backend(msg) => write!(f, "storage backend error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

#[cfg(feature = "object-storage")]
impl From<s3::error::S3Error> for StorageError {
    fn from(err: s3::error::S3Error) -> Self {
        Self::Backend(err.to_string())
    }
}
