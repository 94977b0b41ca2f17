use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat};
use thiserror::Error;

/// Failure inside an [`ImageProcessor`].
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to decode image: {0}")]
    Decode(#[source] ImageError),
    #[error("Failed to encode image: {0}")]
    Encode(#[source] ImageError),
}

/// Turns source image bytes into a resized copy.
pub trait ImageProcessor: Send + Sync {
    /// Decode `data`, shrink or grow it to fit within `width` x `height`
    /// keeping its aspect ratio, and encode the result.
    fn resize(&self, data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ProcessError>;
}

/// [`ImageProcessor`] backed by the `image` crate.
///
/// Output keeps the source format; unknown formats are written as PNG.
#[derive(Debug, Clone, Copy)]
pub struct RasterProcessor {
    filter: FilterType,
}

impl RasterProcessor {
    pub fn new(filter: FilterType) -> Self {
        Self { filter }
    }
}

impl Default for RasterProcessor {
    fn default() -> Self {
        Self::new(FilterType::Lanczos3)
    }
}

impl ImageProcessor for RasterProcessor {
    fn resize(&self, data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ProcessError> {
        let format = image::guess_format(data).unwrap_or(ImageFormat::Png);
        let img = image::load_from_memory(data).map_err(ProcessError::Decode)?;

        let resized = img.resize(width, height, self.filter);

        // JPEG has no alpha channel.
        let resized = match format {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(resized.to_rgb8()),
            _ => resized,
        };

        let mut buf = Cursor::new(Vec::new());
        resized
            .write_to(&mut buf, format)
            .map_err(ProcessError::Encode)?;
        Ok(buf.into_inner())
    }
}
