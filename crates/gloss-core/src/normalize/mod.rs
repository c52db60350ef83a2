//! Format normalization to the canonical encoding.
//!
//! Every image that is stored or sent to the image-edit API goes through
//! [`Normalizer`] first, which turns any decodable raster into PNG with an
//! RGBA8 pixel layout. Normalizing once at the boundary means nothing
//! downstream has to care which format a user uploaded.

mod preview;
mod sniff;

pub use preview::{content_hash, data_uri, decode_data_uri, PreviewGenerator};
pub use sniff::looks_like_image;

use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// An image in the canonical encoding.
#[derive(Debug, Clone)]
pub struct CanonicalImage {
    /// PNG bytes with an RGBA8 pixel layout
    pub png: Vec<u8>,
    /// Format detected in the input
    pub source_format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

/// Converts arbitrary image bytes to canonical PNG RGBA8.
#[derive(Debug, Clone)]
pub struct Normalizer {
    limits: LimitsConfig,
}

impl Normalizer {
    /// Create a new normalizer with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Normalize an in-memory image with dimension checks and timeout.
    ///
    /// `name` is only used to label errors and logs.
    pub async fn normalize(
        &self,
        bytes: Vec<u8>,
        name: &str,
    ) -> Result<CanonicalImage, PipelineError> {
        let name_owned = name.to_string();
        let max_dim = self.limits.max_image_dimension;
        let timeout_duration = Duration::from_millis(self.limits.decode_timeout_ms);

        let result = timeout(timeout_duration, async {
            tokio::task::spawn_blocking(move || Self::normalize_sync(&bytes, &name_owned, max_dim))
                .await
        })
        .await;

        match result {
            Ok(Ok(Ok(canonical))) => {
                tracing::debug!(
                    name,
                    format = format_to_string(canonical.source_format),
                    width = canonical.width,
                    height = canonical.height,
                    bytes = canonical.png.len(),
                    "Normalized image"
                );
                Ok(canonical)
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(e)) => Err(PipelineError::Normalization {
                name: name.to_string(),
                message: format!("Task join error: {}", e),
            }),
            Err(_) => Err(PipelineError::Timeout {
                name: name.to_string(),
                stage: "normalize".to_string(),
                timeout_ms: self.limits.decode_timeout_ms,
            }),
        }
    }

    /// Synchronous decode + re-encode (runs in spawn_blocking).
    pub fn normalize_sync(
        bytes: &[u8],
        name: &str,
        max_dim: u32,
    ) -> Result<CanonicalImage, PipelineError> {
        let fail = |message: String| PipelineError::Normalization {
            name: name.to_string(),
            message,
        };

        if !looks_like_image(bytes) {
            return Err(fail(
                "Unrecognized image format (invalid magic bytes)".to_string(),
            ));
        }

        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| fail(format!("Cannot detect image format: {}", e)))?;
        let source_format = reader
            .format()
            .ok_or_else(|| fail("Cannot detect image format".to_string()))?;
        let image = reader.decode().map_err(|e| fail(e.to_string()))?;

        let (width, height) = image.dimensions();
        if width > max_dim || height > max_dim {
            return Err(fail(format!(
                "Image too large ({width}x{height} > {max_dim})"
            )));
        }

        let rgba = DynamicImage::ImageRgba8(image.into_rgba8());
        let mut buffer = Cursor::new(Vec::new());
        rgba.write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| fail(format!("PNG encoding failed: {}", e)))?;

        Ok(CanonicalImage {
            png: buffer.into_inner(),
            source_format,
            width,
            height,
        })
    }
}

/// Convert an ImageFormat to a string representation.
pub fn format_to_string(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Png => "png",
        ImageFormat::WebP => "webp",
        ImageFormat::Gif => "gif",
        ImageFormat::Tiff => "tiff",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Avif => "avif",
        _ => "unknown",
    }
}
