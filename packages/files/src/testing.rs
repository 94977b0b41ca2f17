//! In-memory doubles for the record, disk and image seams.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use common::storage::join_url;
use common::{Disk, StorageError};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::processor::{ImageProcessor, ProcessError, RasterProcessor};
use crate::record::{FileRecord, RecordError};

/// Encode a solid PNG of the given size.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        width,
        height,
        Rgba([10, 120, 200, 255]),
    ));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

#[derive(Default)]
pub struct MemoryRecord {
    pub files: Option<String>,
    pub saves: usize,
    pub fail_saves: bool,
}

impl MemoryRecord {
    pub fn with_files(files: &str) -> Self {
        Self {
            files: Some(files.to_string()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl FileRecord for MemoryRecord {
    fn files_json(&self) -> Option<String> {
        self.files.clone()
    }

    fn set_files_json(&mut self, value: Option<String>) {
        self.files = value;
    }

    async fn save(&mut self) -> Result<(), RecordError> {
        if self.fail_saves {
            return Err(RecordError::new("database is read-only"));
        }
        self.saves += 1;
        Ok(())
    }
}

pub struct MemoryDisk {
    url: String,
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
    fail_reads: AtomicBool,
    deletes: AtomicUsize,
}

impl MemoryDisk {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            objects: Mutex::new(BTreeMap::new()),
            fail_writes: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            deletes: AtomicUsize::new(0),
        }
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    /// Make `get` and `exists` fail.
    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<(), StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("connection refused".into()));
        }
        Ok(())
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// Number of delete calls, successful or not.
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Disk for MemoryDisk {
    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.check_reads()?;
        self.contents(path)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn put_with_type(
        &self,
        path: &str,
        data: &[u8],
        _content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("disk is full".into()));
        }
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("permission denied".into()));
        }
        Ok(self.objects.lock().unwrap().remove(path).is_some())
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        self.check_reads()?;
        Ok(self.objects.lock().unwrap().contains_key(path))
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.url, path)
    }
}

/// Real resizing, with a call counter.
#[derive(Default)]
pub struct CountingProcessor {
    inner: RasterProcessor,
    calls: AtomicUsize,
}

impl CountingProcessor {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageProcessor for CountingProcessor {
    fn resize(&self, data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ProcessError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.resize(data, width, height)
    }
}
