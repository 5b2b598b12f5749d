//! Pointer interaction state of the composition canvas.

use serde::{Deserialize, Serialize};

use crate::element::ElementId;
use crate::geometry::{Handle, Point, Rect};
use crate::viewport::Viewport;

/// The single active pointer gesture, if any.
///
/// Entered on pointer-down, left on pointer-up. Each active state carries
/// the drag anchor and the snapshot every move is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
#[allow(missing_docs)] // Variant fields documented at variant level
pub enum Interaction {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Dragging a viewport handle; `start` is the viewport at pointer-down.
    ViewportResizing {
        handle: Handle,
        anchor: Point,
        start: Viewport,
    },
    /// Dragging an element handle; `snapshot` is its rectangle at pointer-down.
    ElementResizing {
        id: ElementId,
        handle: Handle,
        anchor: Point,
        snapshot: Rect,
    },
    /// Dragging an element body; `snapshot` is its rectangle at pointer-down.
    ElementMoving {
        id: ElementId,
        anchor: Point,
        snapshot: Rect,
    },
}

impl Interaction {
    /// Whether no gesture is active.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Whether the viewport is being resized.
    #[must_use]
    pub fn is_resizing_viewport(&self) -> bool {
        matches!(self, Self::ViewportResizing { .. })
    }

    /// Pointer position at gesture start.
    #[must_use]
    pub fn anchor(&self) -> Option<Point> {
        match self {
            Self::Idle => None,
            Self::ViewportResizing { anchor, .. }
            | Self::ElementResizing { anchor, .. }
            | Self::ElementMoving { anchor, .. } => Some(*anchor),
        }
    }

    /// Element targeted by the gesture.
    #[must_use]
    pub fn active_element(&self) -> Option<ElementId> {
        match self {
            Self::ElementResizing { id, .. } | Self::ElementMoving { id, .. } => Some(*id),
            Self::Idle | Self::ViewportResizing { .. } => None,
        }
    }

    /// Handle being dragged.
    #[must_use]
    pub fn active_handle(&self) -> Option<Handle> {
        match self {
            Self::ViewportResizing { handle, .. } | Self::ElementResizing { handle, .. } => {
                Some(*handle)
            }
            Self::Idle | Self::ElementMoving { .. } => None,
        }
    }
}

/// Where an image should be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindTarget {
    /// The primary screenshot slot.
    Screenshot,
    /// The diagram slot.
    Diagram,
    /// A specific element.
    Element(ElementId),
    /// The first empty screenshot slot, adding one if none is free.
    NextFreeScreenshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_accessors() {
        let state = Interaction::default();
        assert!(state.is_idle());
        assert_eq!(state.anchor(), None);
        assert_eq!(state.active_element(), None);
        assert_eq!(state.active_handle(), None);
    }

    #[test]
    fn test_active_accessors() {
        let id = ElementId::new();
        let state = Interaction::ElementResizing {
            id,
            handle: Handle::Se,
            anchor: Point::new(1.0, 2.0),
            snapshot: Rect::new(0.0, 0.0, 10.0, 10.0),
        };
        assert!(!state.is_idle());
        assert!(!state.is_resizing_viewport());
        assert_eq!(state.active_element(), Some(id));
        assert_eq!(state.active_handle(), Some(Handle::Se));
        assert_eq!(state.anchor(), Some(Point::new(1.0, 2.0)));
    }
}
