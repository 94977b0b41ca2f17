use std::sync::Arc;

use common::{Disk, DiskRegistry, FilesConfig, MissingFilePolicy, StorageError, UploadedFile};
use tracing::{debug, info, instrument, warn};

use crate::collection::{CollectionMap, FileEntry};
use crate::error::{FilesError, Result};
use crate::processor::{ImageProcessor, RasterProcessor};
use crate::record::FileRecord;
use crate::resize::ResizedVariants;

/// Services shared by every record that carries files: configuration,
/// disks and the resized-variant resolver.
///
/// Cheap to clone; build it once at startup.
#[derive(Clone)]
pub struct Files {
    config: Arc<FilesConfig>,
    disks: DiskRegistry,
    variants: ResizedVariants,
}

impl Files {
    pub fn new(config: FilesConfig, disks: DiskRegistry) -> Self {
        let variants = ResizedVariants::new(
            config.resized_image_path.clone(),
            Arc::new(RasterProcessor::default()),
        );
        Self {
            config: Arc::new(config),
            disks,
            variants,
        }
    }

    /// Build the disks declared in `config` and wrap them.
    pub async fn from_config(config: FilesConfig) -> std::result::Result<Self, StorageError> {
        let disks = DiskRegistry::from_config(&config).await?;
        Ok(Self::new(config, disks))
    }

    /// Swap the image processor used for resized variants.
    pub fn with_processor(mut self, processor: Arc<dyn ImageProcessor>) -> Self {
        self.variants = ResizedVariants::new(self.config.resized_image_path.clone(), processor);
        self
    }

    pub fn config(&self) -> &FilesConfig {
        &self.config
    }

    pub fn disks(&self) -> &DiskRegistry {
        &self.disks
    }

    /// Attach file operations to `record`, using the configured default disk.
    pub fn attach<R: FileRecord>(&self, record: R) -> HasFiles<R> {
        HasFiles {
            record,
            storage_disk: self.config.storage_disk.clone(),
            files: self.clone(),
        }
    }

    fn disk(&self, name: &str) -> Result<Arc<dyn Disk>> {
        self.disks
            .get(name)
            .ok_or_else(|| FilesError::UnknownDisk(name.to_string()))
    }
}

/// One element returned by a collection query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionItem {
    /// The stored entry, when no resize was requested.
    Entry(FileEntry),
    /// Public URL of a resized variant.
    Resized(String),
}

impl CollectionItem {
    pub fn entry(&self) -> Option<&FileEntry> {
        match self {
            Self::Entry(entry) => Some(entry),
            Self::Resized(_) => None,
        }
    }

    pub fn resized_url(&self) -> Option<&str> {
        match self {
            Self::Entry(_) => None,
            Self::Resized(url) => Some(url),
        }
    }
}

/// A record with named file collections in its `files` column.
///
/// Every mutating call performs its storage work first and then saves the
/// record exactly once. If the save fails, the column value held in memory
/// is put back; storage side effects are not undone.
pub struct HasFiles<R> {
    record: R,
    storage_disk: String,
    files: Files,
}

impl<R: FileRecord> HasFiles<R> {
    /// Use `disk` for this record whenever a call does not name one.
    pub fn with_storage_disk(mut self, disk: impl Into<String>) -> Self {
        self.storage_disk = disk.into();
        self
    }

    pub fn storage_disk(&self) -> &str {
        &self.storage_disk
    }

    pub fn record(&self) -> &R {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut R {
        &mut self.record
    }

    pub fn into_record(self) -> R {
        self.record
    }

    fn disk_name<'a>(&'a self, disk: Option<&'a str>) -> &'a str {
        match disk {
            Some(name) if !name.is_empty() => name,
            _ => &self.storage_disk,
        }
    }

    /// All collections on the record. Empty when the column is unset.
    pub fn get_files(&self) -> Result<CollectionMap> {
        Ok(CollectionMap::decode(self.record.files_json().as_deref())?)
    }

    /// Store `file` on the disk under the collection's directory and append
    /// it to the collection.
    ///
    /// Returns the stored path.
    #[instrument(
        skip(self, file),
        fields(file = %file.original_name(), size = file.len())
    )]
    pub async fn upload_file(
        &mut self,
        file: &UploadedFile,
        collection: Option<&str>,
        disk: Option<&str>,
    ) -> Result<String> {
        let disk_name = self.disk_name(disk).to_string();
        let collection = self
            .files
            .config
            .collection_or_default(collection)
            .to_string();
        let mut files = self.get_files()?;

        let path = self
            .files
            .disk(&disk_name)?
            .store(file, &collection)
            .await
            .map_err(|source| FilesError::StorageWrite {
                disk: disk_name.clone(),
                path: collection.clone(),
                source,
            })?;

        files.push(&collection, FileEntry::new(path.clone()));
        self.commit(&files).await?;

        info!(%path, %collection, disk = %disk_name, "Uploaded file");
        Ok(path)
    }

    /// Delete `path` from the disk, then drop every entry with that path
    /// from the collection.
    #[instrument(skip(self))]
    pub async fn delete_file(
        &mut self,
        path: &str,
        collection: Option<&str>,
        disk: Option<&str>,
    ) -> Result<()> {
        let disk_name = self.disk_name(disk).to_string();
        let collection = self
            .files
            .config
            .collection_or_default(collection)
            .to_string();
        let mut files = self.get_files()?;

        let deleted = self
            .files
            .disk(&disk_name)?
            .delete(path)
            .await
            .map_err(|source| FilesError::StorageDelete {
                disk: disk_name.clone(),
                path: path.to_string(),
                source,
            })?;

        if !deleted {
            match self.files.config.missing_file_on_delete {
                MissingFilePolicy::Ignore => {
                    warn!(path, disk = %disk_name, "File was already missing from disk");
                }
                MissingFilePolicy::Error => {
                    return Err(FilesError::MissingFile {
                        disk: disk_name,
                        path: path.to_string(),
                    });
                }
            }
        }

        let removed = files.remove_path(&collection, path);
        if removed == 0 {
            debug!(path, %collection, "No collection entry referenced the file");
        }
        self.commit(&files).await?;

        info!(path, %collection, removed, "Deleted file");
        Ok(())
    }

    /// Entries of a collection in insertion order.
    ///
    /// When both `width` and `height` are given and non-zero, every entry is
    /// replaced by the URL of its resized variant instead. A single
    /// dimension means no resize.
    #[instrument(skip(self))]
    pub async fn get_files_from_collection(
        &self,
        collection: Option<&str>,
        width: Option<u32>,
        height: Option<u32>,
        disk: Option<&str>,
    ) -> Result<Vec<CollectionItem>> {
        let collection = self.files.config.collection_or_default(collection);
        let files = self.get_files()?;
        let entries = files.collection(collection);

        let Some((width, height)) = requested_size(width, height) else {
            return Ok(entries.iter().cloned().map(CollectionItem::Entry).collect());
        };

        let disk_name = self.disk_name(disk);
        let disk = self.files.disk(disk_name)?;
        let mut urls = Vec::with_capacity(entries.len());
        for entry in entries {
            let url = self
                .files
                .variants
                .url(disk.as_ref(), disk_name, &entry.path, width, height)
                .await?;
            urls.push(CollectionItem::Resized(url));
        }
        Ok(urls)
    }

    /// First element of [`get_files_from_collection`](Self::get_files_from_collection),
    /// or `None` when the collection is empty.
    ///
    /// Only the first entry is resized.
    #[instrument(skip(self))]
    pub async fn get_first_file_from_collection(
        &self,
        collection: Option<&str>,
        width: Option<u32>,
        height: Option<u32>,
        disk: Option<&str>,
    ) -> Result<Option<CollectionItem>> {
        let collection = self.files.config.collection_or_default(collection);
        let files = self.get_files()?;
        let Some(first) = files.first(collection) else {
            return Ok(None);
        };

        let Some((width, height)) = requested_size(width, height) else {
            return Ok(Some(CollectionItem::Entry(first.clone())));
        };

        let disk_name = self.disk_name(disk);
        let disk = self.files.disk(disk_name)?;
        let url = self
            .files
            .variants
            .url(disk.as_ref(), disk_name, &first.path, width, height)
            .await?;
        Ok(Some(CollectionItem::Resized(url)))
    }

    /// Delete the collection's first file, then upload `new_file` into it.
    ///
    /// On an empty collection this is a plain upload. Returns the new path.
    #[instrument(skip(self, new_file), fields(file = %new_file.original_name()))]
    pub async fn replace_file_in_collection(
        &mut self,
        new_file: &UploadedFile,
        collection: Option<&str>,
        disk: Option<&str>,
    ) -> Result<String> {
        let collection = self
            .files
            .config
            .collection_or_default(collection)
            .to_string();
        let disk_name = self.disk_name(disk).to_string();

        let old = self.get_files()?.first(&collection).map(|e| e.path.clone());
        if let Some(old) = old {
            self.delete_file(&old, Some(&collection), Some(&disk_name))
                .await?;
        }

        self.upload_file(new_file, Some(&collection), Some(&disk_name))
            .await
    }

    /// Write `files` into the column and save, restoring the previous
    /// column value if the save fails.
    async fn commit(&mut self, files: &CollectionMap) -> Result<()> {
        let previous = self.record.files_json();
        self.record.set_files_json(Some(files.encode()?));
        if let Err(err) = self.record.save().await {
            self.record.set_files_json(previous);
            return Err(err.into());
        }
        Ok(())
    }
}

/// Both dimensions, or nothing. Zero counts as not given.
fn requested_size(width: Option<u32>, height: Option<u32>) -> Option<(u32, u32)> {
    match (width.filter(|w| *w > 0), height.filter(|h| *h > 0)) {
        (Some(w), Some(h)) => Some((w, h)),
        (None, None) => None,
        (w, h) => {
            debug!(?w, ?h, "Only one dimension given, skipping resize");
            None
        }
    }
}
