//! Plain geometric primitives shared by elements, the viewport and strokes.

use serde::{Deserialize, Serialize};

/// A point in the shared canvas coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate (pixels from left).
    pub x: f64,
    /// Y coordinate (pixels from top).
    pub y: f64,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Rect {
    /// Create a rectangle from position and size.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A square of side `size` whose top-left corner is at (`x`, `y`).
    #[must_use]
    pub const fn square(x: f64, y: f64, size: f64) -> Self {
        Self::new(x, y, size, size)
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Centre point.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Inclusive containment test: points on the boundary are inside.
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    /// Shrink the rectangle by `amount` on every side.
    #[must_use]
    pub fn inset(&self, amount: f64) -> Self {
        Self::new(
            self.x + amount,
            self.y + amount,
            self.width - amount * 2.0,
            self.height - amount * 2.0,
        )
    }
}

/// One of the eight resize handles of a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handle {
    /// Top-left corner.
    Nw,
    /// Top-right corner.
    Ne,
    /// Bottom-right corner.
    Se,
    /// Bottom-left corner.
    Sw,
    /// Top edge.
    N,
    /// Right edge.
    E,
    /// Bottom edge.
    S,
    /// Left edge.
    W,
}

impl Handle {
    /// Hit-test order for element handles.
    pub const ELEMENT_ORDER: [Self; 8] = [
        Self::Nw,
        Self::Ne,
        Self::Se,
        Self::Sw,
        Self::N,
        Self::E,
        Self::S,
        Self::W,
    ];

    /// Hit-test order for viewport handles.
    pub const VIEWPORT_ORDER: [Self; 8] = [
        Self::Nw,
        Self::Ne,
        Self::Sw,
        Self::Se,
        Self::N,
        Self::S,
        Self::W,
        Self::E,
    ];

    /// Whether this is a corner handle.
    #[must_use]
    pub fn is_corner(self) -> bool {
        matches!(self, Self::Nw | Self::Ne | Self::Se | Self::Sw)
    }

    /// Lowercase compass name (`"nw"`, `"e"`, ...).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nw => "nw",
            Self::Ne => "ne",
            Self::Se => "se",
            Self::Sw => "sw",
            Self::N => "n",
            Self::E => "e",
            Self::S => "s",
            Self::W => "w",
        }
    }

    /// Parse a compass name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ELEMENT_ORDER
            .into_iter()
            .find(|h| h.as_str().eq_ignore_ascii_case(name))
    }

    /// Hotspot for an element handle: a square of `size` centred on the
    /// corner or edge midpoint of `bounds`.
    #[must_use]
    pub fn element_hotspot(self, bounds: &Rect, size: f64) -> Rect {
        let half = size / 2.0;
        let (cx, cy) = match self {
            Self::Nw => (bounds.x, bounds.y),
            Self::Ne => (bounds.right(), bounds.y),
            Self::Se => (bounds.right(), bounds.bottom()),
            Self::Sw => (bounds.x, bounds.bottom()),
            Self::N => (bounds.x + bounds.width / 2.0, bounds.y),
            Self::E => (bounds.right(), bounds.y + bounds.height / 2.0),
            Self::S => (bounds.x + bounds.width / 2.0, bounds.bottom()),
            Self::W => (bounds.x, bounds.y + bounds.height / 2.0),
        };
        Rect::square(cx - half, cy - half, size)
    }

    /// Hotspot for a viewport handle: a square of `size` placed inside the
    /// viewport frame of `width` × `height`.
    #[must_use]
    pub fn viewport_hotspot(self, width: f64, height: f64, size: f64) -> Rect {
        let (x, y) = match self {
            Self::Nw => (0.0, 0.0),
            Self::Ne => (width - size, 0.0),
            Self::Sw => (0.0, height - size),
            Self::Se => (width - size, height - size),
            Self::N => (width / 2.0 - size / 2.0, 0.0),
            Self::S => (width / 2.0 - size / 2.0, height - size),
            Self::W => (0.0, height / 2.0 - size / 2.0),
            Self::E => (width - size, height / 2.0 - size / 2.0),
        };
        Rect::square(x, y, size)
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pointer cursor to show for the current hover/drag target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "handle", rename_all = "snake_case")]
pub enum Cursor {
    /// Plain arrow.
    Default,
    /// Over an element body.
    Move,
    /// Over an element resize handle.
    ElementResize(Handle),
    /// Over a viewport resize handle.
    ViewportResize(Handle),
}

impl Cursor {
    /// CSS cursor name.
    #[must_use]
    pub fn css_name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Move => "move",
            Self::ElementResize(h) => match h {
                Handle::Nw => "nw-resize",
                Handle::Ne => "ne-resize",
                Handle::Se => "se-resize",
                Handle::Sw => "sw-resize",
                Handle::N => "n-resize",
                Handle::E => "e-resize",
                Handle::S => "s-resize",
                Handle::W => "w-resize",
            },
            Self::ViewportResize(h) => match h {
                Handle::Nw | Handle::Se => "nwse-resize",
                Handle::Ne | Handle::Sw => "nesw-resize",
                Handle::N | Handle::S => "ns-resize",
                Handle::E | Handle::W => "ew-resize",
            },
        }
    }
}
