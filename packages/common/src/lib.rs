pub mod config;
pub mod storage;

pub use config::{DiskConfig, FilesConfig, MigrationConfig, MissingFilePolicy};
pub use storage::{Disk, DiskRegistry, StorageError, UploadedFile};
