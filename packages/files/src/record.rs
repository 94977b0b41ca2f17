use async_trait::async_trait;
use thiserror::Error;

/// The persistence layer failed to save a record.
#[derive(Debug, Error)]
#[error("Failed to save record: {0}")]
pub struct RecordError(#[source] Box<dyn std::error::Error + Send + Sync>);

impl RecordError {
    pub fn new(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(err.into())
    }
}

#[cfg(feature = "sea-orm")]
impl From<sea_orm::DbErr> for RecordError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::new(err)
    }
}

/// A persisted record with a `files` text column.
#[async_trait]
pub trait FileRecord: Send {
    /// Raw value of the `files` column.
    fn files_json(&self) -> Option<String>;

    /// Replace the raw value of the `files` column in memory.
    fn set_files_json(&mut self, value: Option<String>);

    /// Persist the record.
    async fn save(&mut self) -> Result<(), RecordError>;
}

#[async_trait]
impl<R: FileRecord + ?Sized> FileRecord for &mut R {
    fn files_json(&self) -> Option<String> {
        (**self).files_json()
    }

    fn set_files_json(&mut self, value: Option<String>) {
        (**self).set_files_json(value)
    }

    async fn save(&mut self) -> Result<(), RecordError> {
        (**self).save().await
    }
}
