//! Inline previews: data URIs, content hashes and small local thumbnails.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Encode bytes as a `data:` URI.
pub fn data_uri(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{content_type};base64,{}", BASE64.encode(bytes))
}

/// Split a base64 `data:` URI into its MIME type and decoded payload.
///
/// Returns `None` for anything that is not a base64 data URI.
pub fn decode_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let content_type = meta.strip_suffix(";base64")?;
    let bytes = BASE64.decode(payload.trim()).ok()?;
    Some((content_type.to_string(), bytes))
}

/// BLAKE3 hex digest of a byte buffer.
pub fn content_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Generates small inline previews of local files.
pub struct PreviewGenerator {
    size: u32,
}

impl PreviewGenerator {
    /// Create a generator producing previews whose longest edge is `size`.
    pub fn new(size: u32) -> Self {
        Self { size }
    }

    /// Generate a WebP preview and return it as a data URI.
    ///
    /// Returns `None` if encoding fails.
    pub fn generate(&self, image: &DynamicImage) -> Option<String> {
        let thumbnail = image.thumbnail(self.size, self.size);

        let mut buffer = Cursor::new(Vec::new());
        thumbnail.write_to(&mut buffer, ImageFormat::WebP).ok()?;

        Some(data_uri("image/webp", &buffer.into_inner()))
    }

    /// Decode arbitrary image bytes and generate a preview from them.
    pub fn generate_from_bytes(&self, bytes: &[u8]) -> Option<String> {
        let image = image::load_from_memory(bytes).ok()?;
        self.generate(&image)
    }
}
