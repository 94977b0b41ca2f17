use std::path::Path;

use uuid::Uuid;

/// An uploaded file waiting to be stored on a disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    original_name: String,
    content_type: Option<String>,
    contents: Vec<u8>,
}

impl UploadedFile {
    /// Wrap raw bytes with the client-supplied filename.
    ///
    /// The content type is guessed from the filename extension.
    pub fn new(original_name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        let original_name = original_name.into();
        let content_type = mime_guess::from_path(&original_name)
            .first()
            .map(|m| m.to_string());
        Self {
            original_name,
            content_type,
            contents: contents.into(),
        }
    }

    /// Override the guessed content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Extension for the stored name: the original one if present, otherwise
    /// one derived from the content type.
    pub fn extension(&self) -> Option<String> {
        let from_name = Path::new(&self.original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .map(|ext| ext.to_ascii_lowercase());

        from_name.or_else(|| {
            let mime = self.content_type.as_deref()?;
            mime_guess::get_mime_extensions_str(mime)
                .and_then(|exts| exts.first())
                .map(|ext| ext.to_string())
        })
    }

    /// Generate a fresh storage key under `directory`.
    ///
    /// Names are UUIDv7 so keys sort by upload time within a directory.
    pub fn generate_path(&self, directory: &str) -> String {
        let stem = Uuid::now_v7().simple().to_string();
        let name = match self.extension() {
            Some(ext) => format!("{stem}.{ext}"),
            None => stem,
        };
        let directory = directory.trim_matches('/');
        if directory.is_empty() {
            name
        } else {
            format!("{directory}/{name}")
        }
    }
}
