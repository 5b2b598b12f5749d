//! Image loading utilities.
//!
//! Decodes image sources (files, base64 data URIs, raw encoded bytes) into
//! [`RasterImage`]s, and encodes raster images back to PNG for embedding.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine;
use composer_core::{ImageSource, RasterImage};
use image::ImageEncoder;

use crate::error::{RenderError, RenderResult};

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// WebP (alpha support).
    WebP,
    /// Unknown/other format.
    Unknown,
}

impl ImageFormat {
    /// Detect format from file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "webp" => Self::WebP,
            _ => Self::Unknown,
        }
    }

    /// Detect format from a file path's extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map_or(Self::Unknown, Self::from_extension)
    }

    /// Detect format from MIME type.
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        match mime.to_lowercase().as_str() {
            "image/png" => Self::Png,
            "image/jpeg" | "image/jpg" => Self::Jpeg,
            "image/webp" => Self::WebP,
            _ => Self::Unknown,
        }
    }

    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.len() < 4 {
            return Self::Unknown;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Self::Png;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Self::WebP;
        }

        Self::Unknown
    }
}

/// Decode encoded image bytes (PNG, JPEG, WebP, ...) to RGBA pixels.
///
/// # Errors
///
/// Returns [`RenderError::Decode`] if the bytes are not a decodable image.
pub fn decode_image(data: &[u8]) -> RenderResult<RasterImage> {
    let format = ImageFormat::from_magic_bytes(data);

    let img = image::load_from_memory(data)
        .map_err(|e| RenderError::Decode(format!("{format:?} data: {e}")))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    tracing::trace!("Decoded {format:?} image {width}x{height}");

    RasterImage::new(width, height, rgba.into_raw()).map_err(|e| RenderError::Decode(e.to_string()))
}

/// Decode an image from a data URI.
///
/// Supports formats like: `data:image/png;base64,iVBORw0KGgo...`
///
/// # Errors
///
/// Returns an error if the data URI is malformed or the image cannot be decoded.
pub fn decode_data_uri(uri: &str) -> RenderResult<RasterImage> {
    let uri_data = uri
        .strip_prefix("data:")
        .ok_or_else(|| RenderError::Decode("Not a data URI".to_string()))?;

    // Find the comma separating metadata from data
    let (metadata, encoded_data) = uri_data
        .split_once(',')
        .ok_or_else(|| RenderError::Decode("Invalid data URI: missing comma".to_string()))?;

    let bytes = if metadata.contains(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(encoded_data.trim())
            .map_err(|e| RenderError::Decode(format!("Failed to decode base64: {e}")))?
    } else {
        percent_decode(encoded_data)?
    };

    let declared = ImageFormat::from_mime(metadata.split(';').next().unwrap_or_default());
    let actual = ImageFormat::from_magic_bytes(&bytes);
    if declared != ImageFormat::Unknown && actual != ImageFormat::Unknown && declared != actual {
        tracing::warn!("Data URI declares {declared:?} but contains {actual:?}");
    }

    decode_image(&bytes)
}

/// Simple URL decoding (percent-encoding).
fn percent_decode(input: &str) -> RenderResult<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = input
                .get(i + 1..i + 3)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| RenderError::Decode("Invalid URL encoding".to_string()))?;
            result.push(byte);
            i += 3;
        } else {
            result.push(bytes[i]);
            i += 1;
        }
    }

    Ok(result)
}

/// Encode a raster image as PNG bytes.
///
/// # Errors
///
/// Returns [`RenderError::Export`] if encoding fails.
pub fn encode_png(image: &RasterImage) -> RenderResult<Vec<u8>> {
    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(
            image.pixels(),
            image.width(),
            image.height(),
            image::ColorType::Rgba8.into(),
        )
        .map_err(|e| RenderError::Export(format!("PNG encoding failed: {e}")))?;
    Ok(buf)
}

/// Encode a raster image as a `data:image/png;base64,...` URI.
///
/// # Errors
///
/// Returns [`RenderError::Export`] if encoding fails.
pub fn encode_data_uri(image: &RasterImage) -> RenderResult<String> {
    let png = encode_png(image)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(png);
    Ok(format!("data:image/png;base64,{encoded}"))
}

/// Loads images from their sources.
///
/// Implementations are used on export to re-read an annotation background
/// from where it came from instead of reading back the live surface.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Load and decode the image behind `source`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Decode`] if the source cannot be read or
    /// decoded.
    async fn load(&self, source: &ImageSource) -> RenderResult<RasterImage>;
}

/// [`ImageProvider`] that reads files with `tokio::fs` and decodes with the
/// `image` crate.
#[derive(Debug, Clone, Default)]
pub struct DecodingImageProvider {
    base_dir: Option<PathBuf>,
}

impl DecodingImageProvider {
    /// Provider resolving relative paths against the working directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider resolving relative paths against `dir`.
    #[must_use]
    pub fn with_base_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(dir.into()),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[async_trait]
impl ImageProvider for DecodingImageProvider {
    async fn load(&self, source: &ImageSource) -> RenderResult<RasterImage> {
        match source {
            ImageSource::Path(path) => {
                let path = self.resolve(path);
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|e| RenderError::Decode(format!("{}: {e}", path.display())))?;
                let by_name = ImageFormat::from_path(&path);
                let by_content = ImageFormat::from_magic_bytes(&bytes);
                if by_name != ImageFormat::Unknown && by_content != by_name {
                    tracing::warn!(
                        "{} has a {by_name:?} extension but {by_content:?} content",
                        path.display()
                    );
                }
                tracing::debug!("Loaded {} ({} bytes)", path.display(), bytes.len());
                decode_image(&bytes)
            }
            ImageSource::DataUri(uri) => decode_data_uri(uri),
            ImageSource::Bytes(bytes) => decode_image(bytes),
        }
    }
}
