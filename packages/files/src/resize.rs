//! Lazily materialized resized copies of stored images.
//!
//! A variant of `avatars/xyz.png` at 100x100 lives at
//! `resized/100x100/xyz.png` on the same disk. Only the basename of the
//! source goes into the key, so two sources with the same basename on one
//! disk share a variant. Variants are never cleaned up.

use std::sync::Arc;

use common::Disk;
use tracing::{debug, info, instrument};

use crate::error::{FilesError, Result};
use crate::processor::{ImageProcessor, ProcessError};

/// Derive the storage key of a resized variant: the substituted template
/// followed directly by the source basename.
pub fn variant_path(template: &str, source: &str, width: u32, height: u32) -> String {
    let directory = template
        .replace("{width}", &width.to_string())
        .replace("{height}", &height.to_string());
    let basename = source.rsplit('/').next().unwrap_or(source);
    format!("{directory}{basename}")
}

/// Resolves resized variants, generating them on first request.
#[derive(Clone)]
pub struct ResizedVariants {
    template: String,
    processor: Arc<dyn ImageProcessor>,
}

impl ResizedVariants {
    pub fn new(template: impl Into<String>, processor: Arc<dyn ImageProcessor>) -> Self {
        Self {
            template: template.into(),
            processor,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Return the public URL of `source` resized to fit `width` x `height`,
    /// creating the variant if it does not exist yet.
    #[instrument(skip(self, disk), fields(variant = tracing::field::Empty))]
    pub async fn url(
        &self,
        disk: &dyn Disk,
        disk_name: &str,
        source: &str,
        width: u32,
        height: u32,
    ) -> Result<String> {
        let variant = variant_path(&self.template, source, width, height);
        tracing::Span::current().record("variant", variant.as_str());

        let exists = disk
            .exists(&variant)
            .await
            .map_err(|err| FilesError::StorageRead {
                disk: disk_name.to_string(),
                path: variant.clone(),
                source: err,
            })?;

        if exists {
            debug!("Resized variant already exists");
            return Ok(disk.url(&variant));
        }

        let original = disk
            .get(source)
            .await
            .map_err(|err| FilesError::StorageRead {
                disk: disk_name.to_string(),
                path: source.to_string(),
                source: err,
            })?;

        let resized = self
            .processor
            .resize(&original, width, height)
            .map_err(|err| match err {
                ProcessError::Decode(e) => FilesError::Decode {
                    path: source.to_string(),
                    source: e,
                },
                ProcessError::Encode(e) => FilesError::Encode {
                    path: source.to_string(),
                    source: e,
                },
            })?;

        disk.put(&variant, &resized)
            .await
            .map_err(|err| FilesError::StorageWrite {
                disk: disk_name.to_string(),
                path: variant.clone(),
                source: err,
            })?;

        info!(size = resized.len(), "Generated resized variant");
        Ok(disk.url(&variant))
    }
}
