use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use tracing::debug;

use super::error::StorageError;
use super::traits::{Disk, join_url, validate_key};

/// Connection settings for an [`ObjectStorageDisk`].
#[derive(Debug, Clone)]
pub struct ObjectStorageOptions {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub url: Option<String>,
    pub path_style: bool,
}

/// Disk backed by an S3-compatible bucket.
pub struct ObjectStorageDisk {
    bucket: Box<Bucket>,
    url: String,
}

impl ObjectStorageDisk {
    pub fn new(options: ObjectStorageOptions) -> Result<Self, StorageError> {
        let region = match options.endpoint {
            Some(endpoint) => Region::Custom {
                region: options.region,
                endpoint,
            },
            None => options
                .region
                .parse::<Region>()
                .map_err(|e| StorageError::Backend(format!("invalid region: {e}")))?,
        };

        let credentials = Credentials::new(
            options.access_key.as_deref(),
            options.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("invalid credentials: {e}")))?;

        let mut bucket = Bucket::new(&options.bucket, region, credentials)?;
        if options.path_style {
            bucket = bucket.with_path_style();
        }

        let url = options.url.unwrap_or_else(|| bucket.url());
        Ok(Self { bucket, url })
    }
}

/// Map a non-2xx status into an error. 404 becomes `NotFound`.
fn check_status(path: &str, status: u16) -> Result<(), StorageError> {
    match status {
        200..=299 => Ok(()),
        404 => Err(StorageError::NotFound(path.to_string())),
        other => Err(StorageError::Backend(format!(
            "unexpected status {other} for {path}"
        ))),
    }
}

#[async_trait]
impl Disk for ObjectStorageDisk {
    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let key = validate_key(path)?;
        let response = self.bucket.get_object(key).await?;
        check_status(key, response.status_code())?;
        Ok(response.bytes().to_vec())
    }

    async fn put_with_type(
        &self,
        path: &str,
        data: &[u8],
        content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        let key = validate_key(path)?;
        debug!(path = key, size = data.len(), "object storage disk: put");
        let response = match content_type {
            Some(content_type) => {
                self.bucket
                    .put_object_with_content_type(key, data, content_type)
                    .await?
            }
            None => self.bucket.put_object(key, data).await?,
        };
        check_status(key, response.status_code())
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        // S3 answers DELETE with 204 whether or not the key existed.
        if !self.exists(path).await? {
            return Ok(false);
        }
        let key = validate_key(path)?;
        let response = self.bucket.delete_object(key).await?;
        check_status(key, response.status_code())?;
        Ok(true)
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let key = validate_key(path)?;
        let (_, status) = self.bucket.head_object(key).await?;
        match check_status(key, status) {
            Ok(()) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.url, path)
    }
}
