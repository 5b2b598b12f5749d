//! Freehand lesion annotation over a background diagram.
//!
//! The surface is the background image at natural size with a legend strip
//! below it. Strokes are committed on pointer-up and erased whole.

use serde::{Deserialize, Serialize};

use crate::config::{AnnotationPolicy, Size, Theme};
use crate::display::{Color, DisplayList, DrawCommand, TextAlign};
use crate::event::{PointerEvent, PointerPhase};
use crate::frame::FrameScheduler;
use crate::geometry::{Point, Rect};
use crate::image::{ImageSource, RasterImage};

const OUTLINE_COLOR: Color = Color::rgb(0x33, 0x33, 0x33);
const CAPTION_COLOR: Color = Color::rgb(0x66, 0x66, 0x66);
const ERASER_PREVIEW_DIAMETER: f64 = 20.0;

/// Active drawing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Draws strokes.
    #[default]
    Pen,
    /// Removes whole strokes near the pointer.
    Eraser,
}

/// Pen settings for one lesion; also a legend entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LesionPen {
    /// Lesion number shown in the legend.
    pub number: u32,
    /// Stroke colour.
    pub color: Color,
    /// Stroke width.
    pub line_width: f64,
}

/// A committed pen gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    /// Recorded pointer positions, in order.
    pub points: Vec<Point>,
    /// Stroke colour.
    pub color: Color,
    /// Stroke width.
    pub width: f64,
    /// Lesion the stroke belongs to.
    pub lesion_number: u32,
}

impl Stroke {
    /// Whether any point lies strictly closer than `radius` to `at`.
    #[must_use]
    pub fn passes_within(&self, at: Point, radius: f64) -> bool {
        self.points.iter().any(|p| p.distance_to(at) < radius)
    }
}

/// The segment just added to the in-progress stroke, for incremental
/// painting between full redraws.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveSegment {
    /// Previous pointer position.
    pub from: Point,
    /// New pointer position.
    pub to: Point,
    /// Pen colour.
    pub color: Color,
    /// Pen width.
    pub width: f64,
}

/// Pointer preview ("stylo") following the cursor over the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyloPreview {
    /// Diameter of the preview dot.
    pub diameter: f64,
    /// Fill colour; `None` for the eraser's hollow ring.
    pub fill: Option<Color>,
}

#[derive(Debug, Clone, Copy)]
struct ThemeColors {
    background: Color,
    legend: Color,
    text: Color,
}

impl ThemeColors {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                background: Color::rgb(0xf8, 0xf8, 0xf8),
                legend: Color::rgb(0xff, 0xfe, 0xfc),
                text: Color::BLACK,
            },
            Theme::Dark => Self {
                background: Color::rgb(0x1a, 0x1a, 0x1a),
                legend: Color::rgb(0x2a, 0x2a, 0x2a),
                text: Color::WHITE,
            },
        }
    }
}

/// Freehand annotation state: background, strokes, pen and legend.
#[derive(Debug, Clone)]
pub struct AnnotationLayer {
    policy: AnnotationPolicy,
    background: Option<ImageSource>,
    image: Option<RasterImage>,
    strokes: Vec<Stroke>,
    current: Option<Stroke>,
    drawing: bool,
    last: Point,
    tool: Tool,
    pen: LesionPen,
    palette_index: usize,
    legend: Vec<LesionPen>,
    editing: Option<usize>,
    theme: Theme,
    frames: FrameScheduler,
}

impl AnnotationLayer {
    /// Create an empty layer.
    #[must_use]
    pub fn new(policy: AnnotationPolicy) -> Self {
        let pen = LesionPen {
            number: 1,
            color: policy.default_color(),
            line_width: policy.default_line_width,
        };
        let theme = policy.theme;
        Self {
            policy,
            background: None,
            image: None,
            strokes: Vec::new(),
            current: None,
            drawing: false,
            last: Point::new(0.0, 0.0),
            tool: Tool::Pen,
            pen,
            palette_index: 0,
            legend: Vec::new(),
            editing: None,
            theme,
            frames: FrameScheduler::new(),
        }
    }

    /// Create a layer with the default policy.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(AnnotationPolicy::default())
    }

    // ----------------------------------------------------------------------
    // Pen and tool
    // ----------------------------------------------------------------------

    /// Active tool.
    #[must_use]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switch tool.
    pub fn set_tool(&mut self, tool: Tool) {
        tracing::debug!("Annotation tool: {tool:?}");
        self.tool = tool;
    }

    /// Current pen.
    #[must_use]
    pub fn pen(&self) -> LesionPen {
        self.pen
    }

    /// Set the pen colour.
    pub fn set_color(&mut self, color: Color) {
        self.pen.color = color;
    }

    /// Set the pen width (ignored unless positive).
    pub fn set_line_width(&mut self, width: f64) {
        if width > 0.0 {
            self.pen.line_width = width;
        }
    }

    /// Set the lesion number the next strokes belong to.
    pub fn set_lesion_number(&mut self, number: u32) {
        self.pen.number = number;
    }

    /// Current colour scheme.
    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Switch colour scheme.
    pub fn set_theme(&mut self, theme: Theme) {
        if self.theme != theme {
            self.theme = theme;
            self.request_redraw();
        }
    }

    /// Preview dot for the pointer: the pen colour at pen width, or a
    /// hollow ring for the eraser.
    #[must_use]
    pub fn stylo(&self) -> StyloPreview {
        match self.tool {
            Tool::Pen => StyloPreview {
                diameter: self.pen.line_width,
                fill: Some(self.pen.color),
            },
            Tool::Eraser => StyloPreview {
                diameter: ERASER_PREVIEW_DIAMETER,
                fill: None,
            },
        }
    }

    // ----------------------------------------------------------------------
    // Background and surface
    // ----------------------------------------------------------------------

    /// Set the background source and, if it loaded, its decoded image.
    ///
    /// Passing `None` for the image keeps the source (for export reload) but
    /// shows the default outline.
    pub fn set_background(&mut self, source: ImageSource, image: Option<RasterImage>) {
        match &image {
            Some(img) => tracing::debug!(
                "Annotation background {} ({}x{})",
                source.describe(),
                img.width(),
                img.height()
            ),
            None => tracing::warn!(
                "Annotation background {} not loaded; using default outline",
                source.describe()
            ),
        }
        self.background = Some(source);
        self.image = image;
        self.request_redraw();
    }

    /// Where the background came from.
    #[must_use]
    pub fn background_source(&self) -> Option<&ImageSource> {
        self.background.as_ref()
    }

    /// The loaded background image.
    #[must_use]
    pub fn background_image(&self) -> Option<&RasterImage> {
        self.image.as_ref()
    }

    /// Surface size: the background at natural size plus the legend strip,
    /// or the fallback size without a background.
    #[must_use]
    pub fn surface_size(&self) -> Size {
        Self::surface_for(self.image.as_ref(), &self.policy)
    }

    fn surface_for(image: Option<&RasterImage>, policy: &AnnotationPolicy) -> Size {
        match image {
            Some(img) => Size::new(
                f64::from(img.width()),
                f64::from(img.height()) + policy.legend_height,
            ),
            None => policy.fallback_surface,
        }
    }

    // ----------------------------------------------------------------------
    // Strokes
    // ----------------------------------------------------------------------

    /// Committed strokes in draw order.
    #[must_use]
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// The stroke being drawn, if any.
    #[must_use]
    pub fn current_stroke(&self) -> Option<&Stroke> {
        self.current.as_ref()
    }

    /// Whether a pointer gesture is active.
    #[must_use]
    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    /// Dispatch a pointer event. Returns the segment to paint immediately,
    /// if the pen extended the in-progress stroke.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> Option<LiveSegment> {
        match event.phase {
            PointerPhase::Down if event.is_primary() => {
                self.on_pointer_down(event.position);
                None
            }
            PointerPhase::Down => None,
            PointerPhase::Move => self.on_pointer_move(event.position),
            PointerPhase::Up => {
                self.on_pointer_up();
                None
            }
        }
    }

    /// Start a gesture. The pen opens a stroke at `pos`.
    pub fn on_pointer_down(&mut self, pos: Point) {
        self.drawing = true;
        self.last = pos;
        if self.tool == Tool::Pen {
            self.current = Some(Stroke {
                points: vec![pos],
                color: self.pen.color,
                width: self.pen.line_width,
                lesion_number: self.pen.number,
            });
        }
    }

    /// Continue the gesture: extend the stroke, or erase around `pos`.
    pub fn on_pointer_move(&mut self, pos: Point) -> Option<LiveSegment> {
        if !self.drawing {
            return None;
        }
        let from = self.last;
        self.last = pos;

        match self.tool {
            Tool::Eraser => {
                self.erase_at(pos);
                None
            }
            Tool::Pen => {
                let stroke = self.current.as_mut()?;
                stroke.points.push(pos);
                Some(LiveSegment {
                    from,
                    to: pos,
                    color: stroke.color,
                    width: stroke.width,
                })
            }
        }
    }

    /// End the gesture, committing the pen stroke. A stroke whose gesture
    /// ends with the eraser selected is discarded.
    pub fn on_pointer_up(&mut self) {
        match self.current.take() {
            Some(stroke) if self.drawing && self.tool == Tool::Pen => {
                tracing::trace!(
                    "Committed stroke with {} points for lesion {}",
                    stroke.points.len(),
                    stroke.lesion_number
                );
                self.strokes.push(stroke);
                self.request_redraw();
            }
            Some(_) => {
                tracing::debug!("Discarded stroke: tool changed during the gesture");
                // Live segments were already painted
                self.request_redraw();
            }
            None => {}
        }
        self.drawing = false;
    }

    /// Remove every stroke with a point strictly within the eraser radius of
    /// `at`. Returns the number removed; a redraw is requested only if that
    /// is non-zero.
    pub fn erase_at(&mut self, at: Point) -> usize {
        let radius = self.policy.eraser_radius;
        let before = self.strokes.len();
        self.strokes.retain(|s| !s.passes_within(at, radius));
        let removed = before - self.strokes.len();
        if removed > 0 {
            tracing::debug!("Erased {removed} stroke(s) at ({}, {})", at.x, at.y);
            self.request_redraw();
        }
        removed
    }

    // ----------------------------------------------------------------------
    // Legend
    // ----------------------------------------------------------------------

    /// Legend entries in order.
    #[must_use]
    pub fn legend(&self) -> &[LesionPen] {
        &self.legend
    }

    /// Entry selected for overwrite by the next [`register_lesion`](Self::register_lesion).
    #[must_use]
    pub fn editing(&self) -> Option<usize> {
        self.editing
    }

    /// Record the current pen in the legend.
    ///
    /// With an entry selected for edit, that entry is overwritten and the
    /// selection cleared. Otherwise the pen is appended, the lesion number
    /// advances by one and the colour moves to the next palette entry.
    pub fn register_lesion(&mut self) {
        if let Some(index) = self.editing.take() {
            if let Some(entry) = self.legend.get_mut(index) {
                *entry = self.pen;
                tracing::debug!("Updated legend entry {index} for lesion {}", self.pen.number);
            }
        } else {
            self.legend.push(self.pen);
            tracing::debug!("Registered lesion {}", self.pen.number);
            self.pen.number += 1;
            if !self.policy.palette.is_empty() {
                self.palette_index = (self.palette_index + 1) % self.policy.palette.len();
                self.pen.color = self.policy.palette[self.palette_index];
            }
        }
        self.request_redraw();
    }

    /// Select a legend entry for editing and load it into the pen.
    ///
    /// Returns `false` if the index is out of range.
    pub fn select_lesion_for_edit(&mut self, index: usize) -> bool {
        let Some(entry) = self.legend.get(index).copied() else {
            return false;
        };
        self.editing = Some(index);
        self.pen = entry;
        true
    }

    /// Remove a legend entry. Strokes drawn for it are kept.
    pub fn remove_lesion(&mut self, index: usize) -> Option<LesionPen> {
        if index >= self.legend.len() {
            return None;
        }
        let removed = self.legend.remove(index);
        self.editing = match self.editing {
            Some(i) if i == index => None,
            Some(i) if i > index => Some(i - 1),
            other => other,
        };
        self.request_redraw();
        Some(removed)
    }

    /// Clear strokes, legend and selection, and restore the default pen.
    /// The background is kept.
    pub fn reset(&mut self) {
        tracing::debug!("Resetting annotation layer");
        self.strokes.clear();
        self.legend.clear();
        self.current = None;
        self.drawing = false;
        self.editing = None;
        self.tool = Tool::Pen;
        self.palette_index = 0;
        self.pen = LesionPen {
            number: 1,
            color: self.policy.default_color(),
            line_width: self.policy.default_line_width,
        };
        self.request_redraw();
    }

    // ----------------------------------------------------------------------
    // Redraw and export
    // ----------------------------------------------------------------------

    /// Ask for a redraw on the next frame.
    pub fn request_redraw(&mut self) {
        self.frames.request();
    }

    /// Whether a redraw is pending.
    #[must_use]
    pub fn needs_redraw(&self) -> bool {
        self.frames.is_pending()
    }

    /// The live frame, if a redraw was requested since the last call.
    pub fn next_frame(&mut self) -> Option<DisplayList> {
        if self.frames.take() {
            Some(self.live_display_list())
        } else {
            None
        }
    }

    /// Full redraw in the current theme.
    #[must_use]
    pub fn live_display_list(&self) -> DisplayList {
        let colors = ThemeColors::for_theme(self.theme);
        self.compose(self.image.as_ref(), colors.background, colors)
    }

    /// Export frame: white background, light theme, with `background` being
    /// the image freshly reloaded from [`background_source`](Self::background_source).
    #[must_use]
    pub fn export_display_list(&self, background: Option<&RasterImage>) -> DisplayList {
        self.compose(background, Color::WHITE, ThemeColors::for_theme(Theme::Light))
    }

    fn compose(&self, image: Option<&RasterImage>, fill: Color, colors: ThemeColors) -> DisplayList {
        let size = Self::surface_for(image, &self.policy);
        let mut list = DisplayList::new(size.width, size.height);
        list.fill_background(fill);

        if let Some(img) = image {
            list.push(DrawCommand::Image {
                image: img.clone(),
                rect: Rect::new(0.0, 0.0, f64::from(img.width()), f64::from(img.height())),
                element: None,
            });
        } else {
            push_default_outline(&mut list, size);
        }

        for stroke in &self.strokes {
            list.push(DrawCommand::Polyline {
                points: stroke.points.clone(),
                color: stroke.color,
                width: stroke.width,
            });
        }

        let image_height = size.height - self.policy.legend_height;
        self.push_legend(&mut list, size.width, image_height, colors);
        list
    }

    fn push_legend(&self, list: &mut DisplayList, width: f64, image_height: f64, colors: ThemeColors) {
        let policy = &self.policy;
        list.push(DrawCommand::FillRect {
            rect: Rect::new(0.0, image_height, width, policy.legend_height),
            color: colors.legend,
        });
        list.push(DrawCommand::Text {
            anchor: Point::new(width / 2.0, image_height + 25.0),
            content: policy.legend_title.clone(),
            size: 16.0,
            bold: true,
            color: colors.text,
            align: TextAlign::Center,
        });

        let per_row = policy.legend_columns.min(self.legend.len());
        if per_row == 0 {
            return;
        }
        #[allow(clippy::cast_precision_loss)] // Legend sizes are tiny
        let start_x = (width - policy.legend_item_width * per_row as f64) / 2.0;
        let start_y = image_height + 40.0;

        for (index, entry) in self.legend.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let (row, col) = ((index / per_row) as f64, (index % per_row) as f64);
            let x = start_x + col * policy.legend_item_width;
            let y = start_y + row * policy.legend_row_height;

            list.push(DrawCommand::FillRect {
                rect: Rect::new(x, y - 12.0, 15.0, 15.0),
                color: entry.color,
            });
            list.push(DrawCommand::Text {
                anchor: Point::new(x + 25.0, y),
                content: format!("{} {}", policy.lesion_label, entry.number),
                size: 14.0,
                bold: false,
                color: colors.text,
                align: TextAlign::Left,
            });
        }
    }
}

impl Default for AnnotationLayer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn push_default_outline(list: &mut DisplayList, size: Size) {
    let (cx, cy) = (size.width / 2.0, size.height / 2.0);
    list.push(DrawCommand::Ellipse {
        center: Point::new(cx, cy - 40.0),
        rx: 200.0,
        ry: 150.0,
        color: OUTLINE_COLOR,
        width: 2.0,
    });
    list.push(DrawCommand::Text {
        anchor: Point::new(cx, cy + 200.0),
        content: "Prostate Diagram".to_string(),
        size: 16.0,
        bold: false,
        color: CAPTION_COLOR,
        align: TextAlign::Center,
    });
}
