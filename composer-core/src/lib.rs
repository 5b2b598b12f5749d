//! # Report Composer Core
//!
//! Canvas logic for composing prostate MRI report figures: a freehand
//! lesion annotation layer and a free-form image compositing canvas.
//! Compiles to WASM for use in the browser.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              composer-core                  │
//! ├─────────────────────────────────────────────┤
//! │  CompositionCanvas  │  AnnotationLayer      │
//! │  - Placed elements  │  - Pen / eraser       │
//! │  - Viewport         │  - Lesion legend      │
//! │  - Pointer states   │  - Background image   │
//! ├─────────────────────────────────────────────┤
//! │  Display lists (live frames and exports)    │
//! │  FrameScheduler (redraw coalescing)         │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The core never touches pixels: every redraw and export produces a
//! [`DisplayList`] that `composer-renderer` rasterizes.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod annotation;
pub mod canvas;
pub mod config;
pub mod display;
pub mod element;
pub mod error;
pub mod event;
pub mod frame;
pub mod geometry;
pub mod image;
pub mod interaction;
pub mod viewport;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use annotation::{AnnotationLayer, LesionPen, LiveSegment, Stroke, StyloPreview, Tool};
pub use canvas::{parse_viewport_size, CompositionCanvas, SceneSnapshot};
pub use config::{AnnotationPolicy, CanvasPolicy, ComposerConfig, Size, Theme};
pub use display::{Color, DisplayList, DrawCommand, TextAlign};
pub use element::{ElementId, ElementRole, PlacedElement};
pub use error::{CanvasError, CanvasResult};
pub use event::{to_canvas_coordinates, PointerEvent, PointerPhase};
pub use frame::FrameScheduler;
pub use geometry::{Cursor, Handle, Point, Rect};
pub use image::{ImageSource, RasterImage};
pub use interaction::{BindTarget, Interaction};
pub use viewport::Viewport;

/// Composer core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
