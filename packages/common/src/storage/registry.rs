use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use super::error::StorageError;
use super::filesystem::FilesystemDisk;
use super::traits::Disk;
use crate::config::{DiskConfig, FilesConfig};

/// Named disks available to the application.
#[derive(Clone, Default)]
pub struct DiskRegistry {
    disks: HashMap<String, Arc<dyn Disk>>,
}

impl DiskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every disk declared in `config.disks`.
    pub async fn from_config(config: &FilesConfig) -> Result<Self, StorageError> {
        let mut registry = Self::new();
        for (name, disk_config) in &config.disks {
            let disk = build_disk(disk_config).await?;
            info!(disk = %name, "Registered storage disk");
            registry.insert(name.clone(), disk);
        }
        Ok(registry)
    }

    /// Register (or replace) a disk under `name`.
    pub fn insert(&mut self, name: impl Into<String>, disk: Arc<dyn Disk>) {
        self.disks.insert(name.into(), disk);
    }

    pub fn with_disk(mut self, name: impl Into<String>, disk: Arc<dyn Disk>) -> Self {
        self.insert(name, disk);
        self
    }

    /// Look up a disk by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Disk>> {
        self.disks.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.disks.contains_key(name)
    }

    /// Registered disk names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.disks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

async fn build_disk(config: &DiskConfig) -> Result<Arc<dyn Disk>, StorageError> {
    match config {
        DiskConfig::Local { root, url } => {
            Ok(Arc::new(FilesystemDisk::new(root.clone(), url.clone()).await?))
        }
        #[cfg(feature = "object-storage")]
        DiskConfig::S3 {
            bucket,
            region,
            endpoint,
            access_key,
            secret_key,
            url,
            path_style,
        } => {
            use super::object::{ObjectStorageDisk, ObjectStorageOptions};
            Ok(Arc::new(ObjectStorageDisk::new(ObjectStorageOptions {
                bucket: bucket.clone(),
                region: region.clone(),
                endpoint: endpoint.clone(),
                access_key: access_key.clone(),
                secret_key: secret_key.clone(),
                url: url.clone(),
                path_style: *path_style,
            })?))
        }
        #[cfg(not(feature = "object-storage"))]
        DiskConfig::S3 { bucket, .. } => Err(StorageError::Backend(format!(
            "disk for bucket '{bucket}' needs the `object-storage` feature"
        ))),
    }
}
