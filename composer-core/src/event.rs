//! Pointer input for the composition canvas and the annotation layer.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Button pressed.
    Down,
    /// Pointer moved (pressed or hovering).
    Move,
    /// Button released.
    Up,
}

/// A pointer (mouse, pen or touch) event in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Phase of this event.
    pub phase: PointerPhase,
    /// Position in canvas coordinates.
    pub position: Point,
    /// Button (0 = primary, 1 = middle, 2 = secondary).
    pub button: u8,
}

impl PointerEvent {
    /// Primary button pressed at (`x`, `y`).
    #[must_use]
    pub fn down(x: f64, y: f64) -> Self {
        Self::new(PointerPhase::Down, x, y)
    }

    /// Pointer moved to (`x`, `y`).
    #[must_use]
    pub fn moved(x: f64, y: f64) -> Self {
        Self::new(PointerPhase::Move, x, y)
    }

    /// Primary button released at (`x`, `y`).
    #[must_use]
    pub fn up(x: f64, y: f64) -> Self {
        Self::new(PointerPhase::Up, x, y)
    }

    /// Use a different button.
    #[must_use]
    pub fn with_button(mut self, button: u8) -> Self {
        self.button = button;
        self
    }

    /// Whether the primary button is involved.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.button == 0
    }

    fn new(phase: PointerPhase, x: f64, y: f64) -> Self {
        Self {
            phase,
            position: Point::new(x, y),
            button: 0,
        }
    }
}

/// Map a position on a displayed (CSS-scaled) surface back to canvas
/// coordinates.
///
/// `display_*` is the on-screen size of the surface, `surface_*` its logical
/// size. A zero display size leaves the position unscaled.
#[must_use]
pub fn to_canvas_coordinates(
    client: Point,
    display_width: f64,
    display_height: f64,
    surface_width: f64,
    surface_height: f64,
) -> Point {
    let scale_x = if display_width > 0.0 {
        surface_width / display_width
    } else {
        1.0
    };
    let scale_y = if display_height > 0.0 {
        surface_height / display_height
    } else {
        1.0
    };
    Point::new(client.x * scale_x, client.y * scale_y)
}
