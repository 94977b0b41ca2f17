//! Named file collections on persisted records.
//!
//! A record keeps a JSON map of collection name to stored file entries in
//! its `files` column. [`Files`] holds the shared disks and settings, and
//! [`Files::attach`] wraps a record in [`HasFiles`], which uploads, deletes,
//! lists and replaces files and serves resized image variants.

pub mod collection;
#[cfg(feature = "sea-orm")]
pub mod entity;
pub mod error;
pub mod has_files;
pub mod processor;
pub mod record;
pub mod resize;

#[cfg(test)]
mod testing;

pub use collection::{CollectionMap, FileEntry};
#[cfg(feature = "sea-orm")]
pub use entity::EntityRecord;
pub use error::{FilesError, Result};
pub use has_files::{CollectionItem, Files, HasFiles};
pub use processor::{ImageProcessor, ProcessError, RasterProcessor};
pub use record::{FileRecord, RecordError};
pub use resize::{ResizedVariants, variant_path};

pub use common::{
    Disk, DiskConfig, DiskRegistry, FilesConfig, MissingFilePolicy, StorageError, UploadedFile,
};
