//! Placed elements - the resizable image slots of a composition.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{Handle, Rect};
use crate::image::RasterImage;

/// Size difference (per axis) under which a pre-sized slot counts as
/// already holding the image at its natural size.
pub const PRESIZED_TOLERANCE: f64 = 10.0;

/// Unique identifier for an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    /// Create a new unique element ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a slot is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementRole {
    /// The primary screenshot slot.
    Screenshot,
    /// The slot receiving the annotated diagram.
    Diagram,
    /// A screenshot slot added after the default layout.
    AdditionalScreenshot,
}

/// A positioned, resizable rectangle that may hold a bound raster image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedElement {
    /// Unique identifier.
    pub id: ElementId,
    /// What the slot is for.
    pub role: ElementRole,
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
    /// Smallest width a resize may produce.
    pub min_width: f64,
    /// Smallest height a resize may produce.
    pub min_height: f64,
    /// Bound image, if any.
    #[serde(skip)]
    image: Option<RasterImage>,
    /// Natural width of the bound image (0 while unbound).
    pub natural_width: f64,
    /// Natural height of the bound image (0 while unbound).
    pub natural_height: f64,
    /// `natural_width / natural_height` once bound, 1.0 before.
    pub aspect_ratio: f64,
    /// Whether this element is selected.
    pub selected: bool,
    /// Slot was sized to an image's native pixels before binding, so
    /// binding must not re-fit it.
    pub presized: bool,
}

impl PlacedElement {
    /// Create an unbound element. A rectangle smaller than `min_size` on
    /// either axis is grown to it.
    #[must_use]
    pub fn new(role: ElementRole, rect: Rect, min_size: f64) -> Self {
        Self {
            id: ElementId::new(),
            role,
            x: rect.x,
            y: rect.y,
            width: rect.width.max(min_size),
            height: rect.height.max(min_size),
            min_width: min_size,
            min_height: min_size,
            image: None,
            natural_width: 0.0,
            natural_height: 0.0,
            aspect_ratio: 1.0,
            selected: false,
            presized: false,
        }
    }

    /// Current bounds.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Overwrite the bounds without any checks.
    pub fn set_rect(&mut self, rect: Rect) {
        self.x = rect.x;
        self.y = rect.y;
        self.width = rect.width;
        self.height = rect.height;
    }

    /// The bound image.
    #[must_use]
    pub fn image(&self) -> Option<&RasterImage> {
        self.image.as_ref()
    }

    /// Whether an image is bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.image.is_some()
    }

    /// Inclusive bounds test.
    #[must_use]
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.rect().contains(x, y)
    }

    /// The eight handle hotspots, derived from the current bounds.
    #[must_use]
    pub fn handle_rects(&self, size: f64) -> [(Handle, Rect); 8] {
        let bounds = self.rect();
        Handle::ELEMENT_ORDER.map(|h| (h, h.element_hotspot(&bounds, size)))
    }

    /// First handle whose hotspot contains the point.
    #[must_use]
    pub fn handle_at(&self, x: f64, y: f64, size: f64) -> Option<Handle> {
        self.handle_rects(size)
            .into_iter()
            .find(|(_, rect)| rect.contains(x, y))
            .map(|(handle, _)| handle)
    }

    /// Bind an image, re-fitting the bounds to its aspect ratio.
    ///
    /// A pre-sized slot whose size already matches the image's natural size
    /// (within [`PRESIZED_TOLERANCE`]) keeps its bounds.
    pub fn bind_image(&mut self, image: RasterImage) {
        self.natural_width = f64::from(image.width());
        self.natural_height = f64::from(image.height());
        self.aspect_ratio = image.aspect_ratio();
        self.image = Some(image);

        if self.presized
            && (self.width - self.natural_width).abs() < PRESIZED_TOLERANCE
            && (self.height - self.natural_height).abs() < PRESIZED_TOLERANCE
        {
            tracing::debug!("Keeping natural-size bounds for pre-sized element {}", self.id);
            return;
        }

        self.fit_to_current_bounds();
    }

    /// Shrink the bounds to the bound image's aspect ratio, centred inside
    /// the current bounds.
    fn fit_to_current_bounds(&mut self) {
        let original = self.rect();
        let (width, height) = if original.width / original.height > self.aspect_ratio {
            (original.height * self.aspect_ratio, original.height)
        } else {
            (original.width, original.width / self.aspect_ratio)
        };

        self.x = original.x + (original.width - width) / 2.0;
        self.y = original.y + (original.height - height) / 2.0;
        self.width = width;
        self.height = height;

        tracing::trace!(
            "Fitted element {} to {}x{} at ({}, {})",
            self.id,
            width,
            height,
            self.x,
            self.y
        );
    }

    /// Resize from a drag-start `snapshot` by the cumulative pointer delta.
    ///
    /// Corner handles keep the aspect ratio of a bound image and anchor the
    /// opposite corner. Returns `false` and leaves the element untouched if
    /// the result would be smaller than the minimum size.
    pub fn resize_from_handle(&mut self, handle: Handle, dx: f64, dy: f64, snapshot: Rect) -> bool {
        let Rect {
            x: ox,
            y: oy,
            width: ow,
            height: oh,
        } = snapshot;
        let (mut x, mut y, mut w, mut h) = (ox, oy, ow, oh);

        match handle {
            Handle::Nw => {
                x = ox + dx;
                y = oy + dy;
                w = ow - dx;
                h = oh - dy;
            }
            Handle::Ne => {
                y = oy + dy;
                w = ow + dx;
                h = oh - dy;
            }
            Handle::Se => {
                w = ow + dx;
                h = oh + dy;
            }
            Handle::Sw => {
                x = ox + dx;
                w = ow - dx;
                h = oh + dy;
            }
            Handle::N => {
                y = oy + dy;
                h = oh - dy;
            }
            Handle::E => w = ow + dx,
            Handle::S => h = oh + dy,
            Handle::W => {
                x = ox + dx;
                w = ow - dx;
            }
        }

        if handle.is_corner() && self.is_bound() {
            match handle {
                Handle::Nw | Handle::Se => h = w / self.aspect_ratio,
                _ => w = h * self.aspect_ratio,
            }
            if matches!(handle, Handle::Nw | Handle::Ne) {
                y = oy + oh - h;
            }
            if matches!(handle, Handle::Nw | Handle::Sw) {
                x = ox + ow - w;
            }
        }

        if w < self.min_width || h < self.min_height {
            tracing::trace!(
                "Rejected resize of {} to {}x{} (minimum {}x{})",
                self.id,
                w,
                h,
                self.min_width,
                self.min_height
            );
            return false;
        }

        self.set_rect(Rect::new(x, y, w, h));
        true
    }

    /// Translate from a drag-start `snapshot` by the cumulative pointer delta.
    pub fn move_by(&mut self, dx: f64, dy: f64, snapshot: Rect) {
        self.x = snapshot.x + dx;
        self.y = snapshot.y + dy;
    }
}
