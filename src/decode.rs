//! Decoding of raw sprite sheet bytes into RGBA pixel buffers.
//!
//! Runs on pool threads. The resulting [`DecodedImage`] is moved to the
//! coordinating thread, which hands it to the texture backend.

use std::path::{Path, PathBuf};

use image::ImageFormat;

use crate::error::{PreloadError, Result};

/// PNG magic bytes: 89 50 4E 47 0D 0A 1A 0A
const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Decoded image data ready for texture creation.
#[derive(Debug)]
pub struct DecodedImage {
    /// Path the bytes were read from
    pub path: PathBuf,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// RGBA8 pixel data (width * height * 4 bytes)
    pub rgba: Vec<u8>,
}

impl DecodedImage {
    /// Wrap an already decoded RGBA8 buffer.
    pub fn from_rgba8(path: impl Into<PathBuf>, width: u32, height: u32, rgba: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            width,
            height,
            rgba,
        }
    }

    /// Size of the pixel buffer in bytes.
    pub fn byte_len(&self) -> usize {
        self.rgba.len()
    }
}

/// Whether the bytes start with the PNG signature.
pub fn is_png(data: &[u8]) -> bool {
    data.starts_with(&PNG_SIGNATURE)
}

/// Decode PNG bytes into RGBA8.
pub fn decode_png(path: &Path, data: &[u8]) -> Result<DecodedImage> {
    if !is_png(data) {
        return Err(PreloadError::decode(path, "missing PNG signature"));
    }

    let img = image::load_from_memory_with_format(data, ImageFormat::Png)
        .map_err(|e| PreloadError::decode(path, e.to_string()))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(PreloadError::decode(path, "image has no pixels"));
    }

    log::trace!("Decoded {:?}: {}x{}", path, width, height);

    Ok(DecodedImage {
        path: path.to_path_buf(),
        width,
        height,
        rgba: rgba.into_raw(),
    })
}
