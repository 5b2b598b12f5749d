//! Decoded raster images and the references they were loaded from.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{CanvasError, CanvasResult};

/// Where an image came from.
///
/// The annotation layer keeps its background by source so that export can
/// load a fresh copy instead of reading back the live surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ImageSource {
    /// A file on disk.
    Path(PathBuf),
    /// A `data:` URI (base64 or percent-encoded).
    DataUri(String),
    /// Encoded bytes held in memory (e.g. a pasted clipboard blob).
    #[serde(skip)]
    Bytes(Arc<[u8]>),
}

impl ImageSource {
    /// Short human-readable description for logging.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::DataUri(uri) => {
                let head: String = uri.chars().take(32).collect();
                format!("{head}...")
            }
            Self::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        }
    }
}

/// Decoded RGBA8 pixel data with its natural size.
///
/// Cloning is cheap; the pixel buffer is shared.
#[derive(Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl RasterImage {
    /// Wrap an RGBA8 buffer.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidImage`] if either dimension is zero or
    /// the buffer length is not `width * height * 4`.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> CanvasResult<Self> {
        if width == 0 || height == 0 {
            return Err(CanvasError::InvalidImage(format!(
                "zero-sized image {width}x{height}"
            )));
        }
        let expected = u64::from(width) * u64::from(height) * 4;
        if rgba.len() as u64 != expected {
            return Err(CanvasError::InvalidImage(format!(
                "expected {expected} bytes for {width}x{height}, got {}",
                rgba.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels: rgba.into(),
        })
    }

    /// An image filled with a single colour.
    ///
    /// # Errors
    ///
    /// Returns an error if either dimension is zero.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> CanvasResult<Self> {
        let count = (width as usize) * (height as usize);
        Self::new(width, height, rgba.repeat(count))
    }

    /// Natural width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Natural height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Natural width / natural height.
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    /// Raw RGBA8 pixels, row-major.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Serialized as its size only; hosts keep their own pixels, keyed by the
/// element they bound them to.
impl Serialize for RasterImage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("RasterImage", 2)?;
        state.serialize_field("width", &self.width)?;
        state.serialize_field("height", &self.height)?;
        state.end()
    }
}

impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_size() {
        assert!(RasterImage::new(0, 10, Vec::new()).is_err());
        assert!(RasterImage::solid(10, 0, [0, 0, 0, 255]).is_err());
    }

    #[test]
    fn test_rejects_wrong_buffer_length() {
        let result = RasterImage::new(2, 2, vec![0; 15]);
        assert!(matches!(result, Err(CanvasError::InvalidImage(_))));
    }

    #[test]
    fn test_solid_image() {
        let image = RasterImage::solid(3, 2, [255, 0, 0, 255]).expect("valid");
        assert_eq!(image.pixels().len(), 24);
        assert_eq!(&image.pixels()[0..4], &[255, 0, 0, 255]);
        assert!((image.aspect_ratio() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_describe_source() {
        let source = ImageSource::Bytes(Arc::from(vec![1u8, 2, 3]));
        assert_eq!(source.describe(), "<3 bytes>");
        let path = ImageSource::Path(PathBuf::from("diagram.png"));
        assert_eq!(path.describe(), "diagram.png");
    }
}
