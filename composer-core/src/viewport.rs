//! Viewport sizing with crop/extend semantics.

use serde::{Deserialize, Serialize};

use crate::config::CanvasPolicy;
use crate::geometry::{Handle, Rect};

/// Logical pixel size of the visible and exported frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Viewport {
    /// Create a viewport, clamped to the policy bounds.
    #[must_use]
    pub fn new(width: f64, height: f64, policy: &CanvasPolicy) -> Self {
        let size = policy.clamp_viewport(width, height);
        Self {
            width: size.width,
            height: size.height,
        }
    }

    /// The frame as a rectangle at the origin.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    /// The eight resize hotspots, in hit-test order.
    #[must_use]
    pub fn handle_rects(&self, size: f64) -> [(Handle, Rect); 8] {
        Handle::VIEWPORT_ORDER.map(|h| (h, h.viewport_hotspot(self.width, self.height, size)))
    }

    /// First resize hotspot containing the point.
    #[must_use]
    pub fn handle_at(&self, x: f64, y: f64, size: f64) -> Option<Handle> {
        self.handle_rects(size)
            .into_iter()
            .find(|(_, rect)| rect.contains(x, y))
            .map(|(handle, _)| handle)
    }

    /// Size produced by dragging `handle` by the cumulative delta from the
    /// drag-start viewport `start`.
    ///
    /// The delta is scaled by the policy sensitivity, applied to the axes
    /// the handle controls, then clamped to the policy bounds.
    #[must_use]
    pub fn resized_from_handle(
        start: Self,
        handle: Handle,
        dx: f64,
        dy: f64,
        policy: &CanvasPolicy,
    ) -> Self {
        let dx = dx * policy.resize_sensitivity;
        let dy = dy * policy.resize_sensitivity;
        let (mut width, mut height) = (start.width, start.height);

        match handle {
            Handle::Nw => {
                width -= dx;
                height -= dy;
            }
            Handle::Ne => {
                width += dx;
                height -= dy;
            }
            Handle::Sw => {
                width -= dx;
                height += dy;
            }
            Handle::Se => {
                width += dx;
                height += dy;
            }
            Handle::N => height -= dy,
            Handle::S => height += dy,
            Handle::W => width -= dx,
            Handle::E => width += dx,
        }

        Self::new(width, height, policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps() {
        let policy = CanvasPolicy::default();
        let vp = Viewport::new(10.0, 9000.0, &policy);
        assert_eq!(vp, Viewport { width: 50.0, height: 2000.0 });
    }

    #[test]
    fn test_handle_at_priority_order() {
        let policy = CanvasPolicy::default();
        let vp = Viewport::new(800.0, 600.0, &policy);
        assert_eq!(vp.handle_at(0.0, 0.0, 16.0), Some(Handle::Nw));
        assert_eq!(vp.handle_at(799.0, 599.0, 16.0), Some(Handle::Se));
        assert_eq!(vp.handle_at(400.0, 2.0, 16.0), Some(Handle::N));
        assert_eq!(vp.handle_at(795.0, 300.0, 16.0), Some(Handle::E));
        assert_eq!(vp.handle_at(400.0, 300.0, 16.0), None);
    }

    #[test]
    fn test_resize_applies_sensitivity() {
        let policy = CanvasPolicy::default();
        let start = Viewport::new(800.0, 600.0, &policy);
        let vp = Viewport::resized_from_handle(start, Handle::Se, 100.0, 50.0, &policy);
        assert!((vp.width - 830.0).abs() < 1e-9);
        assert!((vp.height - 615.0).abs() < 1e-9);
    }

    #[test]
    fn test_edge_handles_change_one_axis() {
        let policy = CanvasPolicy::default();
        let start = Viewport::new(800.0, 600.0, &policy);
        let vp = Viewport::resized_from_handle(start, Handle::W, 100.0, 100.0, &policy);
        assert!((vp.width - 770.0).abs() < 1e-9);
        assert!((vp.height - 600.0).abs() < f64::EPSILON);

        let vp = Viewport::resized_from_handle(start, Handle::N, 100.0, -100.0, &policy);
        assert!((vp.width - 800.0).abs() < f64::EPSILON);
        assert!((vp.height - 630.0).abs() < 1e-9);
    }

    #[test]
    fn test_resize_clamps_to_bounds() {
        let policy = CanvasPolicy::default();
        let start = Viewport::new(100.0, 100.0, &policy);
        let vp = Viewport::resized_from_handle(start, Handle::Nw, 1000.0, 1000.0, &policy);
        assert_eq!(vp, Viewport { width: 50.0, height: 50.0 });

        let vp = Viewport::resized_from_handle(start, Handle::Se, 100_000.0, 100_000.0, &policy);
        assert_eq!(vp, Viewport { width: 3000.0, height: 2000.0 });
    }
}
