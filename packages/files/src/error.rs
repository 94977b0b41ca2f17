use common::StorageError;
use thiserror::Error;

use crate::record::RecordError;

#[derive(Debug, Error)]
pub enum FilesError {
    #[error("Failed to write {path} to disk '{disk}': {source}")]
    StorageWrite {
        disk: String,
        path: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to read {path} from disk '{disk}': {source}")]
    StorageRead {
        disk: String,
        path: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to delete {path} from disk '{disk}': {source}")]
    StorageDelete {
        disk: String,
        path: String,
        #[source]
        source: StorageError,
    },

    #[error("File {path} does not exist on disk '{disk}'")]
    MissingFile { disk: String, path: String },

    #[error("Storage disk '{0}' is not configured")]
    UnknownDisk(String),

    #[error("Failed to decode image {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode image {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid files column: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Persistence(#[from] RecordError),
}

pub type Result<T> = std::result::Result<T, FilesError>;
