//! Policy values for the composition canvas and the annotation layer.
//!
//! Every field has a default, so a configuration file only needs to list
//! the values it changes:
//!
//! ```json
//! { "canvas": { "resize_sensitivity": 0.5 }, "annotation": { "eraser_radius": 14 } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::display::Color;
use crate::{CanvasError, CanvasResult};

/// A width × height pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Size {
    /// Create a size.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Colour scheme of the annotation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light background, dark text.
    #[default]
    Light,
    /// Dark background, light text.
    Dark,
}

/// Policy values for [`CompositionCanvas`](crate::CompositionCanvas).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasPolicy {
    /// Viewport size of a fresh canvas.
    pub default_viewport: Size,
    /// Smallest allowed viewport.
    pub min_viewport: Size,
    /// Largest allowed viewport.
    pub max_viewport: Size,
    /// Factor applied to pointer deltas while resizing the viewport.
    pub resize_sensitivity: f64,
    /// Minimum element width and height.
    pub element_min_size: f64,
    /// Side of an element resize hotspot.
    pub element_handle_size: f64,
    /// Side of a viewport resize hotspot.
    pub viewport_handle_size: f64,
    /// Pointer deltas below this on both axes are ignored.
    pub move_epsilon: f64,
    /// Draw the alignment grid in live frames.
    pub show_grid: bool,
    /// Grid cell size.
    pub grid_spacing: f64,
    /// Initial size of an added screenshot slot.
    pub screenshot_slot: Size,
    /// Gap kept around added screenshot slots.
    pub screenshot_margin: f64,
}

impl Default for CanvasPolicy {
    fn default() -> Self {
        Self {
            default_viewport: Size::new(1430.0, 680.0),
            min_viewport: Size::new(50.0, 50.0),
            max_viewport: Size::new(3000.0, 2000.0),
            resize_sensitivity: 0.3,
            element_min_size: 50.0,
            element_handle_size: 8.0,
            viewport_handle_size: 16.0,
            move_epsilon: 1.0,
            show_grid: true,
            grid_spacing: 20.0,
            screenshot_slot: Size::new(600.0, 400.0),
            screenshot_margin: 20.0,
        }
    }
}

impl CanvasPolicy {
    /// Clamp a viewport size into `[min_viewport, max_viewport]`.
    ///
    /// Never panics: with contradictory bounds (min above max) the maximum
    /// wins.
    #[must_use]
    pub fn clamp_viewport(&self, width: f64, height: f64) -> Size {
        Size::new(
            width
                .max(self.min_viewport.width)
                .min(self.max_viewport.width),
            height
                .max(self.min_viewport.height)
                .min(self.max_viewport.height),
        )
    }

    /// Check the policy for contradictory values.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Config`] describing the first problem found.
    pub fn validate(&self) -> CanvasResult<()> {
        if self.min_viewport.width <= 0.0 || self.min_viewport.height <= 0.0 {
            return Err(CanvasError::Config(
                "min_viewport must be positive".to_string(),
            ));
        }
        if self.min_viewport.width > self.max_viewport.width
            || self.min_viewport.height > self.max_viewport.height
        {
            return Err(CanvasError::Config(
                "min_viewport exceeds max_viewport".to_string(),
            ));
        }
        if self.resize_sensitivity <= 0.0 {
            return Err(CanvasError::Config(
                "resize_sensitivity must be positive".to_string(),
            ));
        }
        if self.element_min_size <= 0.0
            || self.element_handle_size <= 0.0
            || self.viewport_handle_size <= 0.0
        {
            return Err(CanvasError::Config(
                "element and handle sizes must be positive".to_string(),
            ));
        }
        if self.grid_spacing <= 0.0 {
            return Err(CanvasError::Config(
                "grid_spacing must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Policy values for [`AnnotationLayer`](crate::AnnotationLayer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationPolicy {
    /// Eraser hit radius around the pointer.
    pub eraser_radius: f64,
    /// Height of the legend strip below the background image.
    pub legend_height: f64,
    /// Maximum legend columns.
    pub legend_columns: usize,
    /// Width of one legend entry.
    pub legend_item_width: f64,
    /// Distance between legend rows.
    pub legend_row_height: f64,
    /// Legend heading.
    pub legend_title: String,
    /// Legend entry label prefix, followed by the lesion number.
    pub lesion_label: String,
    /// Pen width of a fresh layer.
    pub default_line_width: f64,
    /// Pen colours; registering a lesion advances to the next one.
    pub palette: Vec<Color>,
    /// Surface size used while no background image is loaded.
    pub fallback_surface: Size,
    /// Colour scheme for live redraws.
    pub theme: Theme,
}

impl Default for AnnotationPolicy {
    fn default() -> Self {
        Self {
            eraser_radius: 10.0,
            legend_height: 80.0,
            legend_columns: 5,
            legend_item_width: 100.0,
            legend_row_height: 25.0,
            legend_title: "Lesions:".to_string(),
            lesion_label: "Lesion".to_string(),
            default_line_width: 3.0,
            palette: vec![
                Color::ACCENT,
                Color::rgb(0xe1, 0x57, 0x59),
                Color::rgb(0x59, 0xa1, 0x4f),
                Color::rgb(0xf2, 0x8e, 0x2b),
                Color::rgb(0xb0, 0x7a, 0xa1),
                Color::rgb(0xed, 0xc9, 0x48),
            ],
            fallback_surface: Size::new(800.0, 680.0),
            theme: Theme::Light,
        }
    }
}

impl AnnotationPolicy {
    /// First palette colour, used for a fresh pen.
    #[must_use]
    pub fn default_color(&self) -> Color {
        self.palette.first().copied().unwrap_or(Color::ACCENT)
    }

    /// Check the policy for contradictory values.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Config`] describing the first problem found.
    pub fn validate(&self) -> CanvasResult<()> {
        if self.eraser_radius <= 0.0 {
            return Err(CanvasError::Config(
                "eraser_radius must be positive".to_string(),
            ));
        }
        if self.legend_columns == 0 {
            return Err(CanvasError::Config(
                "legend_columns must be at least 1".to_string(),
            ));
        }
        if self.palette.is_empty() {
            return Err(CanvasError::Config("palette must not be empty".to_string()));
        }
        if self.default_line_width <= 0.0 {
            return Err(CanvasError::Config(
                "default_line_width must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Composition canvas policy.
    pub canvas: CanvasPolicy,
    /// Annotation layer policy.
    pub annotation: AnnotationPolicy,
}

impl ComposerConfig {
    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the values are invalid.
    pub fn from_json_str(json: &str) -> CanvasResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> CanvasResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Self::from_json_str(&json)
    }

    /// Validate both policies.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Config`] describing the first problem found.
    pub fn validate(&self) -> CanvasResult<()> {
        self.canvas.validate()?;
        self.annotation.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        ComposerConfig::default().validate().expect("defaults valid");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ComposerConfig::from_json_str(
            r#"{"canvas":{"resize_sensitivity":0.5},"annotation":{"eraser_radius":14}}"#,
        )
        .expect("valid config");
        assert!((config.canvas.resize_sensitivity - 0.5).abs() < f64::EPSILON);
        assert!((config.annotation.eraser_radius - 14.0).abs() < f64::EPSILON);
        assert_eq!(config.canvas.default_viewport, Size::new(1430.0, 680.0));
        assert_eq!(config.annotation.legend_columns, 5);
    }

    #[test]
    fn test_rejects_inverted_viewport_bounds() {
        let result = ComposerConfig::from_json_str(
            r#"{"canvas":{"min_viewport":{"width":500,"height":50},"max_viewport":{"width":100,"height":100}}}"#,
        );
        assert!(matches!(result, Err(CanvasError::Config(_))));
    }

    #[test]
    fn test_rejects_empty_palette() {
        let result = ComposerConfig::from_json_str(r#"{"annotation":{"palette":[]}}"#);
        assert!(matches!(result, Err(CanvasError::Config(_))));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let result = ComposerConfig::from_json_str("{ nope");
        assert!(matches!(result, Err(CanvasError::Serialization(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r##"{{"annotation":{{"theme":"dark","palette":["#ff0000"]}}}}"##)
            .expect("write");
        let config = ComposerConfig::from_file(file.path()).expect("load");
        assert_eq!(config.annotation.theme, Theme::Dark);
        assert_eq!(config.annotation.default_color(), Color::rgb(0xff, 0, 0));
    }

    #[test]
    fn test_clamp_viewport() {
        let policy = CanvasPolicy::default();
        assert_eq!(policy.clamp_viewport(10.0, 5000.0), Size::new(50.0, 2000.0));
        assert_eq!(policy.clamp_viewport(800.0, 600.0), Size::new(800.0, 600.0));
    }

    #[test]
    fn test_clamp_viewport_with_inverted_bounds_does_not_panic() {
        let policy = CanvasPolicy {
            min_viewport: Size::new(500.0, 50.0),
            max_viewport: Size::new(100.0, 100.0),
            ..CanvasPolicy::default()
        };
        assert_eq!(policy.clamp_viewport(300.0, 75.0), Size::new(100.0, 75.0));
    }
}
