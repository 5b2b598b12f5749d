//! Display lists: the drawing commands a frame or an export consists of.
//!
//! The core never touches pixels. Redraw and export both produce a
//! [`DisplayList`], and the renderer crate turns it into a raster image.
//! Commands that only exist for editing (grid, handles, placeholders) are
//! distinct variants so an export list can be checked for their absence.

use serde::{Deserialize, Serialize};

use crate::element::ElementId;
use crate::geometry::{Point, Rect};
use crate::image::RasterImage;
use crate::{CanvasError, CanvasResult};

/// An RGBA8 colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(0xff, 0xff, 0xff);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Theme accent blue, used for selection and export borders.
    pub const ACCENT: Self = Self::rgb(0x51, 0xab, 0xe4);

    /// Opaque colour from components.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Config`] if the string is not a hex colour.
    pub fn from_hex(hex: &str) -> CanvasResult<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
            return Err(CanvasError::Config(format!("invalid colour '{hex}'")));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| CanvasError::Config(format!("invalid colour '{hex}'")))
        };
        let a = if digits.len() == 8 { channel(6)? } else { 0xff };
        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a,
        })
    }

    /// Format as `#rrggbb`, or `#rrggbbaa` when not opaque.
    #[must_use]
    pub fn to_hex(self) -> String {
        if self.a == 0xff {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Alpha as a 0.0..=1.0 opacity.
    #[must_use]
    pub fn opacity(self) -> f64 {
        f64::from(self.a) / 255.0
    }
}

impl Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

/// Horizontal text alignment relative to the anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    /// Anchor is the left edge.
    Left,
    /// Anchor is the centre.
    Center,
}

/// A single drawing command.
///
/// Serializes with an `op` tag (`"fill_rect"`, `"image"`, ...) so a
/// JavaScript host can paint frames itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
#[allow(missing_docs)] // Variant fields documented at variant level
pub enum DrawCommand {
    /// Fill `rect` with `color`.
    FillRect { rect: Rect, color: Color },
    /// Outline `rect`, optionally dashed with `[dash, gap]`.
    StrokeRect {
        rect: Rect,
        color: Color,
        width: f64,
        dash: Option<[f64; 2]>,
    },
    /// Straight line segment.
    Line {
        from: Point,
        to: Point,
        color: Color,
        width: f64,
    },
    /// Open polyline with round caps and joins (a pen stroke).
    Polyline {
        points: Vec<Point>,
        color: Color,
        width: f64,
    },
    /// Outlined ellipse.
    Ellipse {
        center: Point,
        rx: f64,
        ry: f64,
        color: Color,
        width: f64,
    },
    /// Raster image scaled into `rect` (no aspect preservation). `element`
    /// names the slot the image is bound to, if any.
    Image {
        image: RasterImage,
        rect: Rect,
        element: Option<ElementId>,
    },
    /// Text anchored at its baseline.
    Text {
        anchor: Point,
        content: String,
        size: f64,
        bold: bool,
        color: Color,
        align: TextAlign,
    },
    /// Decorative rounded frame around the whole surface.
    RoundedBorder {
        width: f64,
        height: f64,
        radius: f64,
        stroke_width: f64,
        color: Color,
    },
    /// Editor-only alignment grid.
    Grid {
        width: f64,
        height: f64,
        spacing: f64,
        color: Color,
        line_width: f64,
    },
    /// Editor-only element resize handle.
    ElementHandle {
        rect: Rect,
        fill: Color,
        stroke: Color,
    },
    /// Editor-only viewport resize handle, drawn as a circle inscribed in `rect`.
    ViewportHandle {
        rect: Rect,
        fill: Color,
        stroke: Color,
    },
}

impl DrawCommand {
    /// Whether the command is editor decoration that must never be exported.
    #[must_use]
    pub fn is_editor_only(&self) -> bool {
        matches!(
            self,
            Self::Grid { .. } | Self::ElementHandle { .. } | Self::ViewportHandle { .. }
        )
    }
}

/// An ordered list of drawing commands for a surface of fixed size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayList {
    /// Surface width in pixels.
    pub width: f64,
    /// Surface height in pixels.
    pub height: f64,
    /// Commands in paint order.
    pub commands: Vec<DrawCommand>,
}

impl DisplayList {
    /// Create an empty list for a surface of the given size.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    /// Append a command.
    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    /// Fill the whole surface.
    pub fn fill_background(&mut self, color: Color) {
        self.push(DrawCommand::FillRect {
            rect: Rect::new(0.0, 0.0, self.width, self.height),
            color,
        });
    }

    /// Whether any command is editor-only decoration.
    #[must_use]
    pub fn has_editor_decoration(&self) -> bool {
        self.commands.iter().any(DrawCommand::is_editor_only)
    }

    /// Number of image commands.
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Image { .. }))
            .count()
    }

    /// Number of commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the list has no commands.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_hex_roundtrip() {
        let color = Color::from_hex("#51abe4").expect("valid");
        assert_eq!(color, Color::ACCENT);
        assert_eq!(color.to_hex(), "#51abe4");

        let translucent = Color::from_hex("f0f0f080").expect("valid");
        assert_eq!(translucent.a, 0x80);
        assert_eq!(translucent.to_hex(), "#f0f0f080");
    }

    #[test]
    fn test_color_rejects_garbage() {
        assert!(Color::from_hex("#12345").is_err());
        assert!(Color::from_hex("#gggggg").is_err());
        assert!(Color::from_hex("#ééé").is_err());
    }

    #[test]
    fn test_color_serde() {
        let json = serde_json::to_string(&Color::rgb(1, 2, 3)).expect("serialize");
        assert_eq!(json, "\"#010203\"");
        let back: Color = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, Color::rgb(1, 2, 3));
    }

    #[test]
    fn test_display_list_serializes_tagged_commands() {
        let id = ElementId::new();
        let mut list = DisplayList::new(100.0, 50.0);
        list.fill_background(Color::WHITE);
        list.push(DrawCommand::Image {
            image: RasterImage::solid(3, 2, [0, 0, 0, 255]).expect("image"),
            rect: Rect::new(0.0, 0.0, 30.0, 20.0),
            element: Some(id),
        });

        let value = serde_json::to_value(&list).expect("serialize");
        assert_eq!(value["commands"][0]["op"], "fill_rect");
        assert_eq!(value["commands"][0]["color"], "#ffffff");
        let image = &value["commands"][1];
        assert_eq!(image["op"], "image");
        assert_eq!(image["element"], id.to_string().as_str());
        assert_eq!(image["image"], serde_json::json!({"width": 3, "height": 2}));
    }

    #[test]
    fn test_editor_decoration_detection() {
        let mut list = DisplayList::new(100.0, 100.0);
        list.fill_background(Color::WHITE);
        assert!(!list.has_editor_decoration());

        list.push(DrawCommand::ElementHandle {
            rect: Rect::square(0.0, 0.0, 8.0),
            fill: Color::ACCENT,
            stroke: Color::WHITE,
        });
        assert!(list.has_editor_decoration());
        assert_eq!(list.len(), 2);
    }
}
