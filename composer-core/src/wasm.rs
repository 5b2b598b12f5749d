//! WebAssembly bindings for composer-core.
//!
//! This module provides JavaScript-callable functions when compiled to WASM.
//! Pointer coordinates are canvas coordinates; map client positions with
//! [`to_canvas_coordinates`](crate::event::to_canvas_coordinates) first.

use wasm_bindgen::prelude::*;

use crate::{
    BindTarget, CanvasPolicy, CompositionCanvas, ComposerConfig, Point, RasterImage,
};

/// Initialize the composer WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages
    #[cfg(feature = "wasm")]
    console_error_panic_hook::set_once();
}

/// Composition canvas instance for WASM.
#[wasm_bindgen]
pub struct WasmComposer {
    canvas: CompositionCanvas,
}

#[wasm_bindgen]
impl WasmComposer {
    /// Create a canvas with the default layout and policy.
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new() -> Self {
        Self {
            canvas: CompositionCanvas::new(CanvasPolicy::default()),
        }
    }

    /// Create a canvas from a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns an error string if the configuration is invalid.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(json: &str) -> Result<WasmComposer, String> {
        let config = ComposerConfig::from_json_str(json).map_err(|e| e.to_string())?;
        Ok(Self {
            canvas: CompositionCanvas::new(config.canvas),
        })
    }

    /// Pointer pressed. Returns the CSS cursor name.
    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, x: f64, y: f64) -> String {
        self.canvas
            .on_pointer_down(Point::new(x, y))
            .css_name()
            .to_string()
    }

    /// Pointer moved. Returns the CSS cursor name.
    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, x: f64, y: f64) -> String {
        self.canvas
            .on_pointer_move(Point::new(x, y))
            .css_name()
            .to_string()
    }

    /// Pointer released. Returns the CSS cursor name.
    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self) -> String {
        self.canvas.on_pointer_up().css_name().to_string()
    }

    /// Set the viewport size; elements keep their positions.
    #[wasm_bindgen(js_name = resizeViewport)]
    pub fn resize_viewport(&mut self, width: f64, height: f64) {
        self.canvas.set_viewport_size(width, height);
    }

    /// Set the viewport from a `"WIDTHxHEIGHT"` string.
    ///
    /// # Errors
    ///
    /// Returns an error string if the size is malformed.
    #[wasm_bindgen(js_name = setViewportFromString)]
    pub fn set_viewport_from_string(&mut self, size: &str) -> Result<(), String> {
        self.canvas
            .set_viewport_from_str(size)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    /// Bind RGBA pixels to a slot: `"screenshot"`, `"diagram"` or
    /// `"next"` (first empty screenshot slot). Returns the element ID.
    ///
    /// # Errors
    ///
    /// Returns an error string if the target or the pixels are invalid.
    #[wasm_bindgen(js_name = bindImage)]
    pub fn bind_image(
        &mut self,
        target: &str,
        width: u32,
        height: u32,
        rgba: Vec<u8>,
    ) -> Result<String, String> {
        let target = match target {
            "screenshot" => BindTarget::Screenshot,
            "diagram" => BindTarget::Diagram,
            "next" => BindTarget::NextFreeScreenshot,
            other => return Err(format!("unknown bind target '{other}'")),
        };
        let image = RasterImage::new(width, height, rgba).map_err(|e| e.to_string())?;
        self.canvas
            .bind_image(target, image)
            .map(|id| id.to_string())
            .map_err(|e| e.to_string())
    }

    /// Add an empty screenshot slot below the existing elements.
    #[wasm_bindgen(js_name = addScreenshotArea)]
    pub fn add_screenshot_area(&mut self) -> String {
        self.canvas.add_screenshot_area().to_string()
    }

    /// Get the current scene as JSON.
    #[wasm_bindgen(js_name = getSceneJson)]
    #[must_use]
    pub fn get_scene_json(&self) -> String {
        serde_json::to_string(&self.canvas.snapshot()).unwrap_or_default()
    }

    /// Whether a redraw is pending.
    #[wasm_bindgen(js_name = hasPendingFrame)]
    #[must_use]
    pub fn has_pending_frame(&self) -> bool {
        self.canvas.needs_redraw()
    }

    /// Consume the pending redraw and return its display list as JSON, or
    /// `undefined` when nothing changed since the last frame.
    ///
    /// Image commands carry the element ID that `bindImage` returned; the
    /// host paints its own copy of those pixels.
    #[wasm_bindgen(js_name = takeFrame)]
    pub fn take_frame(&mut self) -> Option<String> {
        let list = self.canvas.next_frame()?;
        serde_json::to_string(&list)
            .inspect_err(|e| tracing::warn!("Could not serialize frame: {e}"))
            .ok()
    }
}

impl Default for WasmComposer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wasm_composer_new_has_pending_first_frame() {
        let mut composer = WasmComposer::new();
        assert!(composer.has_pending_frame());
        assert!(composer.take_frame().is_some());
        assert!(!composer.has_pending_frame());
        assert!(composer.take_frame().is_none());
    }

    #[test]
    fn take_frame_returns_paintable_commands() {
        let mut composer = WasmComposer::new();
        let id = composer
            .bind_image("screenshot", 2, 2, vec![255; 16])
            .expect("bound");

        let json = composer.take_frame().expect("frame pending");
        let frame: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
        assert_eq!(frame["width"], 1430.0);
        let commands = frame["commands"].as_array().expect("commands");
        assert_eq!(commands[0]["op"], "fill_rect");
        let image = commands
            .iter()
            .find(|c| c["op"] == "image")
            .expect("image command");
        assert_eq!(image["element"], id.as_str());
        assert_eq!(image["image"]["width"], 2);
        assert!(image["image"].get("pixels").is_none());
    }

    #[test]
    fn get_scene_json_returns_valid_json() {
        let composer = WasmComposer::new();
        let json = composer.get_scene_json();
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
        assert_eq!(parsed["elements"].as_array().map(Vec::len), Some(2));
        assert_eq!(parsed["interaction"]["state"], "idle");
    }

    #[test]
    fn pointer_down_reports_cursor() {
        let mut composer = WasmComposer::new();
        assert_eq!(composer.pointer_down(1420.0, 670.0), "nwse-resize");
        assert_eq!(composer.pointer_up(), "default");
        assert_eq!(composer.pointer_down(300.0, 300.0), "move");
    }

    #[test]
    fn resize_viewport_keeps_elements() {
        let mut composer = WasmComposer::new();
        composer.resize_viewport(800.0, 400.0);
        let json = composer.get_scene_json();
        assert!(json.contains("\"width\":800.0"));
        assert!(json.contains("\"x\":715.0"));
    }

    #[test]
    fn bind_image_rejects_unknown_target() {
        let mut composer = WasmComposer::new();
        assert!(composer.bind_image("nowhere", 1, 1, vec![0; 4]).is_err());
        assert!(composer.bind_image("diagram", 2, 2, vec![0; 3]).is_err());
        assert!(composer.bind_image("diagram", 1, 1, vec![0; 4]).is_ok());
    }

    #[test]
    fn with_config_rejects_invalid_json() {
        assert!(WasmComposer::with_config("{ nope").is_err());
        assert!(WasmComposer::with_config("{}").is_ok());
    }
}
