//! # Report Composer Renderer
//!
//! Turns the display lists produced by `composer-core` into pixels and
//! encoded files.
//!
//! ```text
//! ┌──────────────┐   DisplayList   ┌─────────────┐  PNG/JPEG/SVG  ┌────────────┐
//! │ composer-core│ ──────────────▶ │SceneExporter│ ─────────────▶ │ RasterSink │
//! └──────────────┘                 └─────────────┘                └────────────┘
//!        ▲                                                          file, memory,
//!        │ RasterImage                                              fallback chain
//! ┌──────────────┐
//! │ImageProvider │  decode files, data URIs
//! └──────────────┘
//! ```
//!
//! Live frames and exports share one rasterizer: an SVG intermediate
//! rendered by resvg into a tiny-skia pixmap.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod export;
pub mod image;
pub mod sink;

pub use crate::image::{
    decode_data_uri, decode_image, encode_data_uri, encode_png, DecodingImageProvider,
    ImageFormat, ImageProvider,
};
pub use error::{RenderError, RenderResult};
pub use export::{ExportConfig, ExportFormat, SceneExporter};
pub use sink::{Delivery, FallbackSink, FileSink, MemorySink, RasterSink};
