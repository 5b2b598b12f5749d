//! Error types for compositing operations.

use thiserror::Error;

/// Result type for compositing operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Errors that can occur in compositing operations.
///
/// Rejected transforms (resizing below the minimum size, removing the last
/// element) are not errors; those operations return `false` instead.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// Element not found in the registry.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Pixel buffer or dimensions do not describe a usable image.
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Invalid operation on the scene.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Configuration values are inconsistent.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading a configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
