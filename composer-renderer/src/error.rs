//! Renderer error types.

use composer_core::CanvasError;
use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while loading, rendering or delivering images.
#[derive(Debug, Error)]
pub enum RenderError {
    /// An image source could not be read or decoded.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Rasterization or encoding failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// A raster sink refused or failed the delivery.
    #[error("Delivery failed: {0}")]
    Sink(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the canvas core.
    #[error(transparent)]
    Core(#[from] CanvasError),
}
