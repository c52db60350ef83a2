//! Magic-byte sniffing to reject obvious non-images before a full decode.

/// Check whether the leading bytes match a raster format we can decode.
///
/// This is a cheap pre-filter; passing it does not guarantee the payload
/// decodes.
pub fn looks_like_image(bytes: &[u8]) -> bool {
    if bytes.len() < 4 {
        return false;
    }

    // JPEG: FF D8 FF
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return true;
    }

    // PNG: 89 50 4E 47
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        return true;
    }

    // GIF: GIF8
    if bytes.starts_with(b"GIF8") {
        return true;
    }

    // WebP: RIFF....WEBP
    if bytes.starts_with(b"RIFF") {
        if bytes.len() >= 12 {
            return &bytes[8..12] == b"WEBP";
        }
        // Truncated header, let the decoder decide
        return true;
    }

    // BMP: BM
    if bytes.starts_with(b"BM") {
        return true;
    }

    // TIFF: II or MM followed by version 42
    if bytes.starts_with(&[b'I', b'I', 0x2A, 0x00]) || bytes.starts_with(&[b'M', b'M', 0x00, 0x2A])
    {
        return true;
    }

    // AVIF/HEIF: ftyp box at offset 4
    bytes.len() >= 12 && &bytes[4..8] == b"ftyp"
}
