//! Canvas Interaction Integration Tests
//!
//! Tests complete pointer flows through the composition canvas:
//! - Hit priority (viewport handle, element handle, element body)
//! - Move and resize gestures with clamping
//! - Viewport resize with crop/extend semantics
//! - Export frames free of editor decoration

use composer_core::{
    BindTarget, CanvasPolicy, CompositionCanvas, Cursor, DrawCommand, ElementRole, Handle,
    PointerEvent, RasterImage, Rect, Viewport,
};
use proptest::prelude::*;

/// Solid test image of the given size.
fn image(width: u32, height: u32) -> RasterImage {
    RasterImage::solid(width, height, [120, 40, 200, 255]).expect("valid image")
}

/// Run a full drag gesture from `from` to `to`.
fn drag(canvas: &mut CompositionCanvas, from: (f64, f64), to: (f64, f64)) -> Cursor {
    let cursor = canvas.handle_pointer(&PointerEvent::down(from.0, from.1));
    canvas.handle_pointer(&PointerEvent::moved(to.0, to.1));
    canvas.handle_pointer(&PointerEvent::up(to.0, to.1));
    cursor
}

fn screenshot_rect(canvas: &CompositionCanvas) -> Rect {
    canvas
        .element_by_role(ElementRole::Screenshot)
        .expect("screenshot slot")
        .rect()
}

// ============================================================================
// Hit Priority
// ============================================================================

#[test]
fn test_viewport_handle_wins_over_element_handle() {
    let mut canvas = CompositionCanvas::with_defaults();
    // The screenshot slot's nw handle and the viewport's nw handle overlap
    let cursor = canvas.handle_pointer(&PointerEvent::down(2.0, 2.0));
    assert_eq!(cursor, Cursor::ViewportResize(Handle::Nw));
    assert!(canvas.interaction().is_resizing_viewport());
}

#[test]
fn test_element_handle_wins_over_body() {
    let mut canvas = CompositionCanvas::with_defaults();
    canvas.set_viewport_size(2000.0, 1000.0);
    let cursor = canvas.handle_pointer(&PointerEvent::down(715.0, 340.0));
    // East handle of the screenshot slot, which is first in paint order
    assert_eq!(cursor, Cursor::ElementResize(Handle::E));
}

#[test]
fn test_body_hit_selects_and_miss_clears() {
    let mut canvas = CompositionCanvas::with_defaults();
    canvas.set_viewport_size(2000.0, 1000.0);

    let cursor = canvas.handle_pointer(&PointerEvent::down(300.0, 300.0));
    assert_eq!(cursor, Cursor::Move);
    let selected = canvas.selected().expect("selection");
    assert_eq!(
        canvas.element(selected).expect("exists").role,
        ElementRole::Screenshot
    );
    canvas.handle_pointer(&PointerEvent::up(300.0, 300.0));

    let cursor = canvas.handle_pointer(&PointerEvent::down(1700.0, 900.0));
    assert_eq!(cursor, Cursor::Default);
    assert_eq!(canvas.selected(), None);
}

#[test]
fn test_secondary_button_does_not_start_gesture() {
    let mut canvas = CompositionCanvas::with_defaults();
    canvas.handle_pointer(&PointerEvent::down(300.0, 300.0).with_button(2));
    assert!(canvas.interaction().is_idle());
}

// ============================================================================
// Move and Resize
// ============================================================================

#[test]
fn test_move_is_clamped_to_viewport() {
    let mut canvas = CompositionCanvas::with_defaults();
    drag(&mut canvas, (300.0, 300.0), (100.0, 250.0));
    // Dragged 200 left from x=0: clamped back to the left edge
    assert_eq!(screenshot_rect(&canvas), Rect::new(0.0, 0.0, 715.0, 680.0));
}

#[test]
fn test_move_within_viewport() {
    let mut canvas = CompositionCanvas::with_defaults();
    canvas.set_viewport_size(2000.0, 1000.0);
    drag(&mut canvas, (300.0, 300.0), (350.0, 420.0));
    assert_eq!(screenshot_rect(&canvas), Rect::new(50.0, 120.0, 715.0, 680.0));
}

#[test]
fn test_sub_epsilon_moves_are_ignored() {
    let mut canvas = CompositionCanvas::with_defaults();
    canvas.set_viewport_size(2000.0, 1000.0);
    canvas.handle_pointer(&PointerEvent::down(300.0, 300.0));
    canvas.handle_pointer(&PointerEvent::moved(300.5, 300.5));
    assert_eq!(screenshot_rect(&canvas), Rect::new(0.0, 0.0, 715.0, 680.0));
}

#[test]
fn test_resize_of_bound_element_keeps_aspect() {
    let mut canvas = CompositionCanvas::with_defaults();
    canvas.set_viewport_size(3000.0, 2000.0);
    let id = canvas
        .bind_image(BindTarget::Screenshot, image(400, 200))
        .expect("bound");
    let before = canvas.element(id).expect("exists").rect();
    assert!((before.width / before.height - 2.0).abs() < 1e-9);

    let se = (before.right(), before.bottom());
    let cursor = drag(&mut canvas, se, (se.0 + 100.0, se.1 + 3.0));
    assert_eq!(cursor, Cursor::ElementResize(Handle::Se));

    let after = canvas.element(id).expect("exists").rect();
    assert!((after.width - (before.width + 100.0)).abs() < 1e-9);
    assert!((after.width / after.height - 2.0).abs() < 1e-9);
}

#[test]
fn test_resize_below_minimum_is_ignored() {
    let mut canvas = CompositionCanvas::with_defaults();
    canvas.set_viewport_size(2000.0, 1000.0);
    drag(&mut canvas, (715.0, 340.0), (10.0, 340.0));
    assert_eq!(screenshot_rect(&canvas), Rect::new(0.0, 0.0, 715.0, 680.0));
}

#[test]
fn test_removed_element_ends_gesture() {
    let mut canvas = CompositionCanvas::with_defaults();
    canvas.set_viewport_size(2000.0, 1000.0);
    canvas.handle_pointer(&PointerEvent::down(300.0, 300.0));
    let id = canvas.selected().expect("selection");
    assert!(canvas.remove_element(id));
    assert!(canvas.interaction().is_idle());
    assert_eq!(
        canvas.handle_pointer(&PointerEvent::moved(400.0, 400.0)),
        Cursor::Default
    );
}

// ============================================================================
// Viewport
// ============================================================================

#[test]
fn test_viewport_drag_crops_without_moving_elements() {
    let mut canvas = CompositionCanvas::with_defaults();
    let before: Vec<Rect> = canvas.elements().map(|e| e.rect()).collect();

    // Drag the east edge handle 1000 px left: 0.3 sensitivity → -300
    let cursor = drag(&mut canvas, (1425.0, 340.0), (425.0, 340.0));
    assert_eq!(cursor, Cursor::ViewportResize(Handle::E));
    assert_eq!(
        canvas.viewport(),
        Viewport {
            width: 1130.0,
            height: 680.0
        }
    );

    let after: Vec<Rect> = canvas.elements().map(|e| e.rect()).collect();
    assert_eq!(before, after);
}

#[test]
fn test_viewport_shrink_does_not_clamp_elements() {
    let mut canvas = CompositionCanvas::with_defaults();
    canvas.set_viewport_size(400.0, 300.0);
    let diagram = canvas
        .element_by_role(ElementRole::Diagram)
        .expect("diagram")
        .rect();
    // Entirely outside the frame, still untouched
    assert_eq!(diagram, Rect::new(715.0, 0.0, 715.0, 680.0));
}

#[test]
fn test_hover_cursor_matches_hit_priority() {
    let canvas = CompositionCanvas::with_defaults();
    assert_eq!(
        canvas.hover_cursor(composer_core::Point::new(1425.0, 340.0)),
        Cursor::ViewportResize(Handle::E)
    );
    assert_eq!(
        canvas.hover_cursor(composer_core::Point::new(300.0, 300.0)),
        Cursor::Move
    );
}

// ============================================================================
// Export
// ============================================================================

#[test]
fn test_export_is_identical_with_and_without_selection() {
    let mut canvas = CompositionCanvas::with_defaults();
    canvas
        .bind_image(BindTarget::Screenshot, image(640, 480))
        .expect("bound");
    canvas
        .bind_image(BindTarget::Diagram, image(800, 680))
        .expect("bound");

    let unselected = canvas.export_display_list();
    let id = canvas.elements().next().expect("element").id;
    canvas.select(id).expect("select");
    let selected = canvas.export_display_list();

    assert_eq!(unselected, selected);
    assert!(!selected.has_editor_decoration());
    assert_eq!(selected.image_count(), 2);
}

#[test]
fn test_export_skips_unbound_slots() {
    let canvas = CompositionCanvas::with_defaults();
    let list = canvas.export_display_list();
    assert_eq!(list.image_count(), 0);
    assert!(matches!(
        list.commands.last(),
        Some(DrawCommand::RoundedBorder { .. })
    ));
}

// ============================================================================
// Properties
// ============================================================================

fn handle_strategy() -> impl Strategy<Value = Handle> {
    prop::sample::select(Handle::ELEMENT_ORDER.to_vec())
}

proptest! {
    #[test]
    fn prop_resize_never_violates_min_size(
        steps in prop::collection::vec((handle_strategy(), -800.0f64..800.0, -800.0f64..800.0), 1..20),
        bound in any::<bool>(),
    ) {
        let mut canvas = CompositionCanvas::new(CanvasPolicy::default());
        canvas.set_viewport_size(3000.0, 2000.0);
        if bound {
            canvas.bind_image(BindTarget::Screenshot, image(300, 200)).expect("bound");
        }
        let id = canvas.element_by_role(ElementRole::Screenshot).expect("slot").id;

        for (handle, dx, dy) in steps {
            let rect = canvas.element(id).expect("exists").rect();
            let start = handle.element_hotspot(&rect, 8.0).center();
            canvas.handle_pointer(&PointerEvent::down(start.x, start.y));
            canvas.handle_pointer(&PointerEvent::moved(start.x + dx, start.y + dy));
            canvas.handle_pointer(&PointerEvent::up(start.x + dx, start.y + dy));

            let element = canvas.element(id).expect("exists");
            prop_assert!(element.width >= element.min_width);
            prop_assert!(element.height >= element.min_height);
        }
    }

    #[test]
    fn prop_corner_resize_preserves_aspect(
        handle in prop::sample::select(vec![Handle::Nw, Handle::Ne, Handle::Se, Handle::Sw]),
        dx in -300.0f64..300.0,
        dy in -300.0f64..300.0,
    ) {
        let mut element = composer_core::PlacedElement::new(
            ElementRole::Screenshot,
            Rect::new(500.0, 500.0, 400.0, 300.0),
            50.0,
        );
        element.bind_image(image(400, 300));
        let snapshot = element.rect();
        if element.resize_from_handle(handle, dx, dy, snapshot) {
            prop_assert!((element.width / element.height - 4.0 / 3.0).abs() < 1e-6);
        } else {
            prop_assert_eq!(element.rect(), snapshot);
        }
    }

    #[test]
    fn prop_viewport_resize_is_content_invariant(
        handle in prop::sample::select(Handle::VIEWPORT_ORDER.to_vec()),
        dx in -5000.0f64..5000.0,
        dy in -5000.0f64..5000.0,
    ) {
        let mut canvas = CompositionCanvas::with_defaults();
        canvas.add_screenshot_area();
        let before: Vec<Rect> = canvas.elements().map(|e| e.rect()).collect();

        let start = canvas.viewport();
        let viewport = canvas.resize_viewport_from_handle(handle, dx, dy, start);

        let after: Vec<Rect> = canvas.elements().map(|e| e.rect()).collect();
        prop_assert_eq!(before, after);
        prop_assert!((50.0..=3000.0).contains(&viewport.width));
        prop_assert!((50.0..=2000.0).contains(&viewport.height));
    }

    #[test]
    fn prop_element_count_never_below_one(removals in prop::collection::vec(0usize..4, 1..10)) {
        let mut canvas = CompositionCanvas::with_defaults();
        canvas.add_screenshot_area();
        for pick in removals {
            let ids: Vec<_> = canvas.elements().map(|e| e.id).collect();
            canvas.remove_element(ids[pick % ids.len()]);
            prop_assert!(canvas.element_count() >= 1);
        }
    }
}
