//! The composition canvas: element registry, viewport and pointer state
//! machine.
//!
//! ```text
//!              pointer-down                     pointer-up
//!   Idle ───────────────────────┬──────────────────────────► Idle
//!     │ viewport handle hit     │ ViewportResizing
//!     │ element handle hit      │ ElementResizing
//!     │ element body hit        │ ElementMoving
//!     └ nothing hit: clear selection, stay Idle
//! ```
//!
//! Every move is computed from the snapshot taken at pointer-down plus the
//! cumulative pointer delta, never from the previous move.

use std::collections::HashMap;

use serde::Serialize;

use crate::config::CanvasPolicy;
use crate::display::{Color, DisplayList, DrawCommand, TextAlign};
use crate::element::{ElementId, ElementRole, PlacedElement};
use crate::event::{PointerEvent, PointerPhase};
use crate::frame::FrameScheduler;
use crate::geometry::{Cursor, Handle, Point, Rect};
use crate::image::RasterImage;
use crate::interaction::{BindTarget, Interaction};
use crate::viewport::Viewport;
use crate::{CanvasError, CanvasResult};

const GRID_COLOR: Color = Color {
    r: 0xf0,
    g: 0xf0,
    b: 0xf0,
    a: 0x80,
};
const DIVIDER_COLOR: Color = Color::rgb(0xe0, 0xe0, 0xe0);
const BORDER_COLOR: Color = Color::rgb(0xcc, 0xcc, 0xcc);
const DIAGRAM_BORDER_COLOR: Color = Color::rgb(0x4e, 0xcd, 0xc4);
const ADDITIONAL_BORDER_COLOR: Color = Color::rgb(0xff, 0x6b, 0x6b);
const IDLE_HANDLE_COLOR: Color = Color::rgb(0x99, 0x99, 0x99);
const PLACEHOLDER_FILL: Color = Color::rgb(0xf8, 0xf9, 0xfa);
const PLACEHOLDER_BORDER: Color = Color::rgb(0xde, 0xe2, 0xe6);
const PLACEHOLDER_TEXT: Color = Color::rgb(0x6c, 0x75, 0x7d);
const EXPORT_BORDER_RADIUS: f64 = 32.0;
const EXPORT_BORDER_WIDTH: f64 = 3.0;

/// Serializable view of the canvas state.
#[derive(Debug, Clone, Serialize)]
pub struct SceneSnapshot {
    /// Current viewport.
    pub viewport: Viewport,
    /// Elements in paint order.
    pub elements: Vec<PlacedElement>,
    /// Active gesture.
    pub interaction: Interaction,
}

/// A viewport plus an ordered set of placed elements, driven by pointer
/// events.
#[derive(Debug, Clone)]
pub struct CompositionCanvas {
    /// All elements, indexed by ID.
    elements: HashMap<ElementId, PlacedElement>,
    /// Paint order; the first element is painted first.
    order: Vec<ElementId>,
    viewport: Viewport,
    interaction: Interaction,
    frames: FrameScheduler,
    policy: CanvasPolicy,
}

impl CompositionCanvas {
    /// Create a canvas with the default two-slot layout: a screenshot slot
    /// on the left half and a diagram slot on the right half.
    #[must_use]
    pub fn new(policy: CanvasPolicy) -> Self {
        if let Err(e) = policy.validate() {
            tracing::warn!("Canvas policy is inconsistent: {e}");
        }
        let viewport = Viewport::new(
            policy.default_viewport.width,
            policy.default_viewport.height,
            &policy,
        );
        let mut canvas = Self {
            elements: HashMap::new(),
            order: Vec::new(),
            viewport,
            interaction: Interaction::Idle,
            frames: FrameScheduler::new(),
            policy,
        };

        let half = viewport.width / 2.0;
        canvas.add_element(
            ElementRole::Screenshot,
            Rect::new(0.0, 0.0, half, viewport.height),
        );
        canvas.add_element(
            ElementRole::Diagram,
            Rect::new(half, 0.0, half, viewport.height),
        );
        canvas
    }

    /// Create a canvas with the default policy.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(CanvasPolicy::default())
    }

    /// The policy in effect.
    #[must_use]
    pub fn policy(&self) -> &CanvasPolicy {
        &self.policy
    }

    /// Current viewport.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Current gesture.
    #[must_use]
    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    // ----------------------------------------------------------------------
    // Registry
    // ----------------------------------------------------------------------

    /// Add an unbound element on top of the paint order.
    pub fn add_element(&mut self, role: ElementRole, rect: Rect) -> ElementId {
        let element = PlacedElement::new(role, rect, self.policy.element_min_size);
        let id = element.id;
        self.order.push(id);
        self.elements.insert(id, element);
        tracing::debug!("Added {role:?} element {id} at {rect:?}");
        self.request_redraw();
        id
    }

    /// Remove an element.
    ///
    /// Returns `false` (and changes nothing) if the ID is unknown or the
    /// element is the last one.
    pub fn remove_element(&mut self, id: ElementId) -> bool {
        if !self.elements.contains_key(&id) {
            return false;
        }
        if self.elements.len() <= 1 {
            tracing::debug!("Refusing to remove the last element {id}");
            return false;
        }

        self.order.retain(|&eid| eid != id);
        self.elements.remove(&id);
        if self.interaction.active_element() == Some(id) {
            self.interaction = Interaction::Idle;
        }
        tracing::debug!("Removed element {id}");
        self.request_redraw();
        true
    }

    /// Get an element by ID.
    #[must_use]
    pub fn element(&self, id: ElementId) -> Option<&PlacedElement> {
        self.elements.get(&id)
    }

    /// First element with the given role, in paint order.
    #[must_use]
    pub fn element_by_role(&self, role: ElementRole) -> Option<&PlacedElement> {
        self.elements().find(|e| e.role == role)
    }

    /// All elements in paint order.
    pub fn elements(&self) -> impl Iterator<Item = &PlacedElement> {
        self.order.iter().filter_map(|id| self.elements.get(id))
    }

    /// Number of elements.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Select an element, deselecting all others.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not found.
    pub fn select(&mut self, id: ElementId) -> CanvasResult<()> {
        if !self.elements.contains_key(&id) {
            return Err(CanvasError::ElementNotFound(id.to_string()));
        }
        for element in self.elements.values_mut() {
            element.selected = element.id == id;
        }
        self.request_redraw();
        Ok(())
    }

    /// Deselect all elements.
    pub fn deselect_all(&mut self) {
        for element in self.elements.values_mut() {
            element.selected = false;
        }
        self.request_redraw();
    }

    /// The selected element, if any.
    #[must_use]
    pub fn selected(&self) -> Option<ElementId> {
        self.elements().find(|e| e.selected).map(|e| e.id)
    }

    /// Serializable view of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            viewport: self.viewport,
            elements: self.elements().cloned().collect(),
            interaction: self.interaction,
        }
    }

    // ----------------------------------------------------------------------
    // Images
    // ----------------------------------------------------------------------

    /// Bind a decoded image to a slot.
    ///
    /// Additional screenshot slots are first resized to the image's native
    /// size (growing the viewport height to fit) and marked pre-sized, so
    /// the bind keeps them at natural size. Other slots fit the image into
    /// their current bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if the target slot does not exist.
    pub fn bind_image(&mut self, target: BindTarget, image: RasterImage) -> CanvasResult<ElementId> {
        let id = self.resolve_target(target)?;
        let margin = self.policy.screenshot_margin;

        let element = self
            .elements
            .get_mut(&id)
            .ok_or_else(|| CanvasError::ElementNotFound(id.to_string()))?;

        let mut required_height = None;
        if element.role == ElementRole::AdditionalScreenshot {
            element.width = f64::from(image.width());
            element.height = f64::from(image.height());
            element.presized = true;
            required_height = Some(element.y + element.height + margin);
        }

        tracing::info!(
            "Binding {}x{} image to {:?} element {id}",
            image.width(),
            image.height(),
            element.role
        );
        element.bind_image(image);

        if let Some(required) = required_height {
            self.grow_viewport_height(required);
        }
        self.request_redraw();
        Ok(id)
    }

    fn resolve_target(&mut self, target: BindTarget) -> CanvasResult<ElementId> {
        match target {
            BindTarget::Screenshot => self
                .element_by_role(ElementRole::Screenshot)
                .map(|e| e.id)
                .ok_or_else(|| CanvasError::ElementNotFound("screenshot slot".to_string())),
            BindTarget::Diagram => self
                .element_by_role(ElementRole::Diagram)
                .map(|e| e.id)
                .ok_or_else(|| CanvasError::ElementNotFound("diagram slot".to_string())),
            BindTarget::Element(id) => {
                if self.elements.contains_key(&id) {
                    Ok(id)
                } else {
                    Err(CanvasError::ElementNotFound(id.to_string()))
                }
            }
            BindTarget::NextFreeScreenshot => {
                let free = self
                    .elements()
                    .find(|e| {
                        matches!(
                            e.role,
                            ElementRole::Screenshot | ElementRole::AdditionalScreenshot
                        ) && !e.is_bound()
                    })
                    .map(|e| e.id);
                Ok(free.unwrap_or_else(|| self.add_screenshot_area()))
            }
        }
    }

    /// Add an empty screenshot slot below the lowest element and grow the
    /// viewport height to fit it.
    pub fn add_screenshot_area(&mut self) -> ElementId {
        let margin = self.policy.screenshot_margin;
        let slot = self.policy.screenshot_slot;

        let y = self
            .elements()
            .map(|e| e.y + e.height)
            .reduce(f64::max)
            .map_or(margin, |bottom| bottom + margin);

        self.grow_viewport_height(y + slot.height + margin);
        self.add_element(
            ElementRole::AdditionalScreenshot,
            Rect::new(margin, y, slot.width, slot.height),
        )
    }

    /// Match the viewport height to the diagram image and widen it to at
    /// least the default width.
    ///
    /// Returns `false` if no diagram image is bound.
    pub fn fit_viewport_to_diagram(&mut self) -> bool {
        let Some(diagram) = self
            .element_by_role(ElementRole::Diagram)
            .filter(|e| e.is_bound())
        else {
            return false;
        };
        let height = diagram.natural_height;
        let width = self.viewport.width.max(self.policy.default_viewport.width);
        self.set_viewport_size(width, height);
        true
    }

    fn grow_viewport_height(&mut self, required: f64) {
        let max_height = self.policy.max_viewport.height;
        if required > max_height {
            tracing::warn!(
                "Content needs a viewport height of {required}, capped at {max_height}; \
                 the lowest element is partly outside the frame"
            );
        }
        if required > self.viewport.height {
            tracing::debug!(
                "Growing viewport height {} -> {required}",
                self.viewport.height
            );
            let width = self.viewport.width;
            self.set_viewport_size(width, required);
        }
    }

    // ----------------------------------------------------------------------
    // Viewport
    // ----------------------------------------------------------------------

    /// Set the viewport size directly (clamped to the policy bounds).
    ///
    /// Elements keep their exact rectangles.
    pub fn set_viewport_size(&mut self, width: f64, height: f64) -> Viewport {
        let viewport = Viewport::new(width, height, &self.policy);
        self.apply_viewport(viewport);
        self.viewport
    }

    /// Set the viewport from a `"WIDTHxHEIGHT"` string such as `"1430x680"`.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidOperation`] if the string is malformed.
    pub fn set_viewport_from_str(&mut self, size: &str) -> CanvasResult<Viewport> {
        let (width, height) = parse_viewport_size(size)?;
        Ok(self.set_viewport_size(width, height))
    }

    /// Resize the viewport as if `handle` had been dragged by the cumulative
    /// delta (`dx`, `dy`) from the viewport `start`.
    ///
    /// Pure crop/extend: element rectangles are unchanged.
    pub fn resize_viewport_from_handle(
        &mut self,
        handle: Handle,
        dx: f64,
        dy: f64,
        start: Viewport,
    ) -> Viewport {
        let viewport = Viewport::resized_from_handle(start, handle, dx, dy, &self.policy);
        self.apply_viewport(viewport);
        self.viewport
    }

    fn apply_viewport(&mut self, viewport: Viewport) {
        if viewport == self.viewport {
            return;
        }
        tracing::trace!(
            "Viewport {}x{} -> {}x{}",
            self.viewport.width,
            self.viewport.height,
            viewport.width,
            viewport.height
        );

        // Elements live in the shared coordinate space: restore every
        // rectangle verbatim around the frame change.
        let preserved: Vec<(ElementId, Rect)> =
            self.elements().map(|e| (e.id, e.rect())).collect();
        self.viewport = viewport;
        for (id, rect) in preserved {
            if let Some(element) = self.elements.get_mut(&id) {
                element.set_rect(rect);
            }
        }
        self.request_redraw();
    }

    fn constrain_to_viewport(&mut self, id: ElementId) {
        let viewport = self.viewport;
        let Some(element) = self.elements.get_mut(&id) else {
            return;
        };
        if element.x < 0.0 {
            element.x = 0.0;
        }
        if element.y < 0.0 {
            element.y = 0.0;
        }
        if element.x + element.width > viewport.width {
            element.x = viewport.width - element.width;
        }
        if element.y + element.height > viewport.height {
            element.y = viewport.height - element.height;
        }
        element.width = element.width.max(element.min_width);
        element.height = element.height.max(element.min_height);
    }

    // ----------------------------------------------------------------------
    // Pointer state machine
    // ----------------------------------------------------------------------

    /// Dispatch a pointer event. Returns the cursor to show.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> Cursor {
        match event.phase {
            PointerPhase::Down if event.is_primary() => self.on_pointer_down(event.position),
            PointerPhase::Down => {
                tracing::trace!("Ignoring pointer-down for button {}", event.button);
                self.hover_cursor(event.position)
            }
            PointerPhase::Move => self.on_pointer_move(event.position),
            PointerPhase::Up => self.on_pointer_up(),
        }
    }

    /// Start a gesture at `pos`.
    ///
    /// Hit priority: viewport handle, then element handles, then element
    /// bodies (both in paint order). A miss clears the selection.
    pub fn on_pointer_down(&mut self, pos: Point) -> Cursor {
        if let Some(handle) = self
            .viewport
            .handle_at(pos.x, pos.y, self.policy.viewport_handle_size)
        {
            self.interaction = Interaction::ViewportResizing {
                handle,
                anchor: pos,
                start: self.viewport,
            };
            tracing::debug!("Viewport resize started from {handle}");
            return Cursor::ViewportResize(handle);
        }

        let handle_size = self.policy.element_handle_size;
        let handle_hit = self.elements().find_map(|e| {
            e.handle_at(pos.x, pos.y, handle_size)
                .map(|h| (e.id, h, e.rect()))
        });
        if let Some((id, handle, snapshot)) = handle_hit {
            self.interaction = Interaction::ElementResizing {
                id,
                handle,
                anchor: pos,
                snapshot,
            };
            tracing::debug!("Element resize started on {id} from {handle}");
            return Cursor::ElementResize(handle);
        }

        let body_hit = self
            .elements()
            .find(|e| e.contains_point(pos.x, pos.y))
            .map(|e| (e.id, e.rect()));
        if let Some((id, snapshot)) = body_hit {
            for element in self.elements.values_mut() {
                element.selected = element.id == id;
            }
            self.interaction = Interaction::ElementMoving {
                id,
                anchor: pos,
                snapshot,
            };
            tracing::debug!("Element move started on {id}");
            self.request_redraw();
            return Cursor::Move;
        }

        self.interaction = Interaction::Idle;
        self.deselect_all();
        Cursor::Default
    }

    /// Continue the active gesture, or report the hover cursor when idle.
    pub fn on_pointer_move(&mut self, pos: Point) -> Cursor {
        let Some(anchor) = self.interaction.anchor() else {
            return self.hover_cursor(pos);
        };

        let dx = pos.x - anchor.x;
        let dy = pos.y - anchor.y;
        let epsilon = self.policy.move_epsilon;
        let cursor = self.active_cursor();
        if dx.abs() < epsilon && dy.abs() < epsilon {
            return cursor;
        }

        match self.interaction {
            Interaction::Idle => {}
            Interaction::ViewportResizing { handle, start, .. } => {
                self.resize_viewport_from_handle(handle, dx, dy, start);
            }
            Interaction::ElementResizing {
                id,
                handle,
                snapshot,
                ..
            } => {
                let Some(element) = self.elements.get_mut(&id) else {
                    self.interaction = Interaction::Idle;
                    return Cursor::Default;
                };
                if element.resize_from_handle(handle, dx, dy, snapshot) {
                    self.constrain_to_viewport(id);
                }
                self.request_redraw();
            }
            Interaction::ElementMoving { id, snapshot, .. } => {
                let Some(element) = self.elements.get_mut(&id) else {
                    self.interaction = Interaction::Idle;
                    return Cursor::Default;
                };
                element.move_by(dx, dy, snapshot);
                self.constrain_to_viewport(id);
                self.request_redraw();
            }
        }
        cursor
    }

    /// End the active gesture.
    pub fn on_pointer_up(&mut self) -> Cursor {
        if !self.interaction.is_idle() {
            tracing::debug!("Gesture ended: {:?}", self.interaction);
        }
        self.interaction = Interaction::Idle;
        Cursor::Default
    }

    /// Cursor for a pointer hovering at `pos` with no gesture active.
    #[must_use]
    pub fn hover_cursor(&self, pos: Point) -> Cursor {
        if let Some(handle) = self
            .viewport
            .handle_at(pos.x, pos.y, self.policy.viewport_handle_size)
        {
            return Cursor::ViewportResize(handle);
        }
        let handle_size = self.policy.element_handle_size;
        if let Some(handle) = self
            .elements()
            .find_map(|e| e.handle_at(pos.x, pos.y, handle_size))
        {
            return Cursor::ElementResize(handle);
        }
        if self.elements().any(|e| e.contains_point(pos.x, pos.y)) {
            return Cursor::Move;
        }
        Cursor::Default
    }

    fn active_cursor(&self) -> Cursor {
        match self.interaction {
            Interaction::Idle => Cursor::Default,
            Interaction::ViewportResizing { handle, .. } => Cursor::ViewportResize(handle),
            Interaction::ElementResizing { handle, .. } => Cursor::ElementResize(handle),
            Interaction::ElementMoving { .. } => Cursor::Move,
        }
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

    /// Called once per display refresh: the live frame if a redraw was
    /// requested since the last call.
    pub fn next_frame(&mut self) -> Option<DisplayList> {
        if self.frames.take() {
            Some(self.live_display_list())
        } else {
            None
        }
    }

    /// Redraw statistics.
    #[must_use]
    pub fn frame_scheduler(&self) -> &FrameScheduler {
        &self.frames
    }

    /// The editor view: grid, elements or placeholders, borders, handles
    /// and viewport handles.
    #[must_use]
    pub fn live_display_list(&self) -> DisplayList {
        let Viewport { width, height } = self.viewport;
        let mut list = DisplayList::new(width, height);
        list.fill_background(Color::WHITE);

        if self.policy.show_grid {
            list.push(DrawCommand::Grid {
                width,
                height,
                spacing: self.policy.grid_spacing,
                color: GRID_COLOR,
                line_width: 0.5,
            });
        }

        if self.order.len() == 2 {
            list.push(DrawCommand::Line {
                from: Point::new(width / 2.0, 0.0),
                to: Point::new(width / 2.0, height),
                color: DIVIDER_COLOR,
                width: 2.0,
            });
        }

        let any_selected = self.elements().any(|e| e.selected);
        for (index, element) in self.elements().enumerate() {
            let rect = element.rect();
            if let Some(image) = element.image() {
                list.push(DrawCommand::Image {
                    image: image.clone(),
                    rect,
                    element: Some(element.id),
                });
                list.push(DrawCommand::StrokeRect {
                    rect,
                    color: border_color(element),
                    width: if element.selected { 3.0 } else { 2.0 },
                    dash: None,
                });
            } else {
                push_placeholder(&mut list, element, index);
            }

            if element.selected || !any_selected {
                let fill = if element.selected {
                    Color::ACCENT
                } else {
                    IDLE_HANDLE_COLOR
                };
                for (_, rect) in element.handle_rects(self.policy.element_handle_size) {
                    list.push(DrawCommand::ElementHandle {
                        rect,
                        fill,
                        stroke: Color::WHITE,
                    });
                }
            }
        }

        for (_, rect) in self.viewport.handle_rects(self.policy.viewport_handle_size) {
            list.push(DrawCommand::ViewportHandle {
                rect,
                fill: Color::ACCENT,
                stroke: Color::WHITE,
            });
        }
        list
    }

    /// The flattened export: white background, every bound image at its
    /// exact rectangle, decorative border. No editor decoration.
    #[must_use]
    pub fn export_display_list(&self) -> DisplayList {
        let Viewport { width, height } = self.viewport;
        let mut list = DisplayList::new(width, height);
        list.fill_background(Color::WHITE);

        for element in self.elements() {
            if let Some(image) = element.image() {
                list.push(DrawCommand::Image {
                    image: image.clone(),
                    rect: element.rect(),
                    element: Some(element.id),
                });
            }
        }

        list.push(DrawCommand::RoundedBorder {
            width,
            height,
            radius: EXPORT_BORDER_RADIUS,
            stroke_width: EXPORT_BORDER_WIDTH,
            color: Color::ACCENT,
        });
        list
    }
}

impl Default for CompositionCanvas {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Parse `"WIDTHxHEIGHT"` (also accepts `×` and surrounding whitespace).
///
/// # Errors
///
/// Returns [`CanvasError::InvalidOperation`] if the string is malformed or a
/// dimension is not a positive number.
pub fn parse_viewport_size(size: &str) -> CanvasResult<(f64, f64)> {
    let invalid = || CanvasError::InvalidOperation(format!("invalid viewport size '{size}'"));
    let (w, h) = size
        .trim()
        .split_once(['x', 'X', '×'])
        .ok_or_else(invalid)?;
    let width: f64 = w.trim().parse().map_err(|_| invalid())?;
    let height: f64 = h.trim().parse().map_err(|_| invalid())?;
    if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
        return Err(invalid());
    }
    Ok((width, height))
}

fn border_color(element: &PlacedElement) -> Color {
    if element.selected {
        return Color::ACCENT;
    }
    match element.role {
        ElementRole::Screenshot => BORDER_COLOR,
        ElementRole::Diagram => DIAGRAM_BORDER_COLOR,
        ElementRole::AdditionalScreenshot => ADDITIONAL_BORDER_COLOR,
    }
}

fn push_placeholder(list: &mut DisplayList, element: &PlacedElement, index: usize) {
    let rect = element.rect();
    list.push(DrawCommand::FillRect {
        rect,
        color: PLACEHOLDER_FILL,
    });
    list.push(DrawCommand::StrokeRect {
        rect: rect.inset(5.0),
        color: PLACEHOLDER_BORDER,
        width: 3.0,
        dash: Some([15.0, 10.0]),
    });

    let caption = match element.role {
        ElementRole::Screenshot => "Paste screenshot".to_string(),
        ElementRole::Diagram => "Annotated diagram".to_string(),
        ElementRole::AdditionalScreenshot => format!("Screenshot {}", index + 1),
    };
    let center = rect.center();
    list.push(DrawCommand::Text {
        anchor: Point::new(center.x, center.y + 10.0),
        content: caption,
        size: 28.0,
        bold: true,
        color: PLACEHOLDER_TEXT,
        align: TextAlign::Center,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(w: u32, h: u32) -> RasterImage {
        RasterImage::solid(w, h, [200, 30, 30, 255]).expect("valid image")
    }

    #[test]
    fn test_default_layout() {
        let canvas = CompositionCanvas::with_defaults();
        assert_eq!(canvas.viewport(), Viewport { width: 1430.0, height: 680.0 });
        assert_eq!(canvas.element_count(), 2);

        let screenshot = canvas.element_by_role(ElementRole::Screenshot).expect("slot");
        assert_eq!(screenshot.rect(), Rect::new(0.0, 0.0, 715.0, 680.0));
        let diagram = canvas.element_by_role(ElementRole::Diagram).expect("slot");
        assert_eq!(diagram.rect(), Rect::new(715.0, 0.0, 715.0, 680.0));
    }

    #[test]
    fn test_inconsistent_policy_builds_a_canvas() {
        use crate::config::Size;

        let canvas = CompositionCanvas::new(CanvasPolicy {
            min_viewport: Size::new(500.0, 50.0),
            max_viewport: Size::new(100.0, 100.0),
            ..CanvasPolicy::default()
        });
        assert_eq!(canvas.viewport(), Viewport { width: 100.0, height: 100.0 });
        assert_eq!(canvas.element_count(), 2);
    }

    #[test]
    fn test_add_element_enforces_minimum_size() {
        let mut canvas = CompositionCanvas::with_defaults();
        let id = canvas.add_element(
            ElementRole::AdditionalScreenshot,
            Rect::new(0.0, 0.0, 10.0, 10.0),
        );
        let element = canvas.element(id).expect("exists");
        assert!(element.width >= element.min_width);
        assert!(element.height >= element.min_height);
        assert_eq!(element.rect(), Rect::new(0.0, 0.0, 50.0, 50.0));
    }

    #[test]
    fn test_screenshot_areas_past_max_height_stay_capped() {
        let mut canvas = CompositionCanvas::with_defaults();
        for _ in 0..4 {
            canvas.add_screenshot_area();
        }
        let lowest = canvas
            .elements()
            .map(|e| e.y)
            .reduce(f64::max)
            .expect("elements");
        assert!((lowest - 1960.0).abs() < f64::EPSILON);
        assert!((canvas.viewport().height - 2000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_remove_keeps_at_least_one() {
        let mut canvas = CompositionCanvas::with_defaults();
        let ids: Vec<_> = canvas.elements().map(|e| e.id).collect();
        assert!(canvas.remove_element(ids[0]));
        assert!(!canvas.remove_element(ids[1]));
        assert_eq!(canvas.element_count(), 1);
        assert!(!canvas.remove_element(ElementId::new()));
    }

    #[test]
    fn test_select_is_exclusive() {
        let mut canvas = CompositionCanvas::with_defaults();
        let ids: Vec<_> = canvas.elements().map(|e| e.id).collect();
        canvas.select(ids[0]).expect("select");
        canvas.select(ids[1]).expect("select");
        assert_eq!(canvas.selected(), Some(ids[1]));
        assert!(!canvas.element(ids[0]).expect("exists").selected);
        assert!(canvas.select(ElementId::new()).is_err());
    }

    #[test]
    fn test_parse_viewport_size() {
        assert_eq!(parse_viewport_size("1430x680").expect("ok"), (1430.0, 680.0));
        assert_eq!(parse_viewport_size(" 800 × 600 ").expect("ok"), (800.0, 600.0));
        assert!(parse_viewport_size("800").is_err());
        assert!(parse_viewport_size("axb").is_err());
        assert!(parse_viewport_size("-5x10").is_err());
    }

    #[test]
    fn test_set_viewport_from_str_clamps() {
        let mut canvas = CompositionCanvas::with_defaults();
        let vp = canvas.set_viewport_from_str("10x9000").expect("parsed");
        assert_eq!(vp, Viewport { width: 50.0, height: 2000.0 });
    }

    #[test]
    fn test_bind_to_roles() {
        let mut canvas = CompositionCanvas::with_defaults();
        let id = canvas.bind_image(BindTarget::Diagram, image(800, 680)).expect("bound");
        let diagram = canvas.element(id).expect("exists");
        assert!(diagram.is_bound());
        assert_eq!(diagram.role, ElementRole::Diagram);
        // 715x680 slot, 800x680 image: width-limited fit, centred vertically
        assert!((diagram.width - 715.0).abs() < 1e-9);
        assert!((diagram.height - 607.75).abs() < 1e-9);
    }

    #[test]
    fn test_bind_next_free_fills_primary_then_adds() {
        let mut canvas = CompositionCanvas::with_defaults();
        let first = canvas
            .bind_image(BindTarget::NextFreeScreenshot, image(100, 100))
            .expect("bound");
        assert_eq!(canvas.element(first).expect("exists").role, ElementRole::Screenshot);

        let second = canvas
            .bind_image(BindTarget::NextFreeScreenshot, image(300, 200))
            .expect("bound");
        let added = canvas.element(second).expect("exists");
        assert_eq!(added.role, ElementRole::AdditionalScreenshot);
        assert!(added.presized);
        assert!((added.width - 300.0).abs() < f64::EPSILON);
        assert!((added.height - 200.0).abs() < f64::EPSILON);
        assert_eq!(canvas.element_count(), 3);
    }

    #[test]
    fn test_add_screenshot_area_grows_viewport() {
        let mut canvas = CompositionCanvas::with_defaults();
        let id = canvas.add_screenshot_area();
        let slot = canvas.element(id).expect("exists");
        assert_eq!(slot.rect(), Rect::new(20.0, 700.0, 600.0, 400.0));
        assert!((canvas.viewport().height - 1120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bind_additional_grows_to_natural_size() {
        let mut canvas = CompositionCanvas::with_defaults();
        let id = canvas.add_screenshot_area();
        canvas
            .bind_image(BindTarget::Element(id), image(900, 700))
            .expect("bound");
        let slot = canvas.element(id).expect("exists");
        assert_eq!(slot.rect(), Rect::new(20.0, 700.0, 900.0, 700.0));
        assert!((canvas.viewport().height - 1420.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bind_unknown_element_fails() {
        let mut canvas = CompositionCanvas::with_defaults();
        let result = canvas.bind_image(BindTarget::Element(ElementId::new()), image(10, 10));
        assert!(matches!(result, Err(CanvasError::ElementNotFound(_))));
    }

    #[test]
    fn test_fit_viewport_to_diagram() {
        let mut canvas = CompositionCanvas::with_defaults();
        assert!(!canvas.fit_viewport_to_diagram());
        canvas.bind_image(BindTarget::Diagram, image(800, 760)).expect("bound");
        assert!(canvas.fit_viewport_to_diagram());
        assert_eq!(canvas.viewport(), Viewport { width: 1430.0, height: 760.0 });
    }

    #[test]
    fn test_redraw_requests_coalesce() {
        let mut canvas = CompositionCanvas::with_defaults();
        assert!(canvas.next_frame().is_some());
        assert!(canvas.next_frame().is_none());

        canvas.deselect_all();
        canvas.set_viewport_size(1000.0, 600.0);
        canvas.set_viewport_size(1100.0, 600.0);
        assert!(canvas.next_frame().is_some());
        assert!(canvas.next_frame().is_none());
    }

    #[test]
    fn test_live_list_shows_placeholders_and_handles() {
        let canvas = CompositionCanvas::with_defaults();
        let list = canvas.live_display_list();
        assert!(list.has_editor_decoration());
        let handles = list
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::ElementHandle { .. }))
            .count();
        // No selection: every element shows its handles
        assert_eq!(handles, 16);
        let texts: Vec<_> = list
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["Paste screenshot", "Annotated diagram"]);
    }

    #[test]
    fn test_live_list_handles_only_for_selection() {
        let mut canvas = CompositionCanvas::with_defaults();
        let id = canvas.elements().next().expect("element").id;
        canvas.select(id).expect("select");
        let handles = canvas
            .live_display_list()
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::ElementHandle { fill, .. } if *fill == Color::ACCENT))
            .count();
        assert_eq!(handles, 8);
    }

    #[test]
    fn test_export_list_has_no_decoration() {
        let mut canvas = CompositionCanvas::with_defaults();
        canvas.bind_image(BindTarget::Screenshot, image(400, 300)).expect("bound");
        let id = canvas.elements().next().expect("element").id;
        canvas.select(id).expect("select");

        let list = canvas.export_display_list();
        assert!(!list.has_editor_decoration());
        assert_eq!(list.image_count(), 1);
        assert!(!list
            .commands
            .iter()
            .any(|c| matches!(c, DrawCommand::Text { .. } | DrawCommand::StrokeRect { .. })));
    }
}
