//! Display list export to image formats.
//!
//! Renders a [`DisplayList`] to PNG, JPEG or SVG using an SVG intermediate
//! representation and the resvg/tiny-skia rasterization pipeline. The same
//! rasterizer serves live previews and exports; only the display list
//! differs.

use std::fmt::Write;
use std::sync::Arc;

use composer_core::{
    AnnotationLayer, Color, CompositionCanvas, DisplayList, DrawCommand, Point, Rect, TextAlign,
};
use image::ImageEncoder;
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};
use crate::image::{encode_data_uri, ImageProvider};

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// PNG image.
    #[default]
    Png,
    /// JPEG image.
    Jpeg,
    /// SVG vector graphics (returns the SVG XML string as UTF-8 bytes).
    Svg,
}

impl ExportFormat {
    /// File extension without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Svg => "svg",
        }
    }

    /// MIME type of the encoded output.
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Svg => "image/svg+xml",
        }
    }
}

/// Configuration for display list export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Colour transparent pixels are flattened onto for JPEG, as RGBA bytes.
    pub background: [u8; 4],
    /// JPEG quality 1-100 (default: 85).
    pub jpeg_quality: u8,
    /// Scale factor (e.g. 2.0 for retina).
    pub scale: f32,
    /// Load system fonts for text rendering.
    pub system_fonts: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            background: [255, 255, 255, 255],
            jpeg_quality: 85,
            scale: 1.0,
            system_fonts: true,
        }
    }
}

/// Rasterizes and encodes display lists.
pub struct SceneExporter {
    config: ExportConfig,
    fontdb: Arc<usvg::fontdb::Database>,
}

impl SceneExporter {
    /// Create a new exporter with the given configuration.
    #[must_use]
    pub fn new(config: ExportConfig) -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        if config.system_fonts {
            fontdb.load_system_fonts();
            tracing::debug!("Loaded {} font faces", fontdb.len());
        }
        Self {
            config,
            fontdb: Arc::new(fontdb),
        }
    }

    /// Create an exporter with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ExportConfig::default())
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export the flattened composition: bound images at their exact
    /// rectangles plus the decorative border, no editor decoration.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or encoding fails.
    pub fn export_composition(
        &self,
        canvas: &CompositionCanvas,
        format: ExportFormat,
    ) -> RenderResult<Vec<u8>> {
        let list = canvas.export_display_list();
        tracing::info!(
            "Exporting composition {}x{} with {} image(s) as {format:?}",
            list.width,
            list.height,
            list.image_count()
        );
        self.export(&list, format)
    }

    /// Export the annotation layer on a white background.
    ///
    /// The background is reloaded from its source through `provider`; the
    /// live surface is never read back.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Decode`] if the background cannot be
    /// reloaded, or an export error if rendering fails.
    pub async fn export_annotation<P>(
        &self,
        layer: &AnnotationLayer,
        provider: &P,
        format: ExportFormat,
    ) -> RenderResult<Vec<u8>>
    where
        P: ImageProvider + ?Sized,
    {
        let background = match layer.background_source() {
            Some(source) => Some(provider.load(source).await.inspect_err(|e| {
                tracing::warn!("Could not reload background {}: {e}", source.describe());
            })?),
            None => None,
        };
        let list = layer.export_display_list(background.as_ref());
        tracing::info!(
            "Exporting annotation {}x{} with {} stroke(s) as {format:?}",
            list.width,
            list.height,
            layer.strokes().len()
        );
        self.export(&list, format)
    }

    /// Encode a display list in the given format.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or encoding fails.
    pub fn export(&self, list: &DisplayList, format: ExportFormat) -> RenderResult<Vec<u8>> {
        match format {
            ExportFormat::Png => self.render_to_png(list),
            ExportFormat::Jpeg => self.render_to_jpeg(list),
            ExportFormat::Svg => {
                let svg = self.render_to_svg(list)?;
                Ok(svg.into_bytes())
            }
        }
    }

    /// Render a display list to PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or encoding fails.
    pub fn render_to_png(&self, list: &DisplayList) -> RenderResult<Vec<u8>> {
        let pixmap = self.rasterize(list)?;

        pixmap
            .encode_png()
            .map_err(|e| RenderError::Export(format!("PNG encoding failed: {e}")))
    }

    /// Render a display list to JPEG bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or encoding fails.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn render_to_jpeg(&self, list: &DisplayList) -> RenderResult<Vec<u8>> {
        let pixmap = self.rasterize(list)?;

        let (width, height) = (pixmap.width(), pixmap.height());
        let bg = &self.config.background;
        let mut rgb_data = Vec::with_capacity((width * height * 3) as usize);
        // Pixmap data is premultiplied: source + background * (1 - alpha)
        for pixel in pixmap.data().chunks_exact(4) {
            let inv = 1.0 - f32::from(pixel[3]) / 255.0;
            for (&src, &matte) in pixel[..3].iter().zip(&bg[..3]) {
                let value = f32::from(matte).mul_add(inv, f32::from(src));
                rgb_data.push(value.min(255.0) as u8);
            }
        }

        let mut buf = std::io::Cursor::new(Vec::new());
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, self.config.jpeg_quality);
        encoder
            .write_image(&rgb_data, width, height, image::ColorType::Rgb8.into())
            .map_err(|e| RenderError::Export(format!("JPEG encoding failed: {e}")))?;

        Ok(buf.into_inner())
    }

    /// Render a display list to an SVG string.
    ///
    /// # Errors
    ///
    /// Returns an error if an embedded image cannot be encoded.
    pub fn render_to_svg(&self, list: &DisplayList) -> RenderResult<String> {
        let (out_w, out_h) = self.output_dimensions(list);
        let (view_w, view_h) = (list.width, list.height);

        let mut svg = String::with_capacity(4096);
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{out_w}\" height=\"{out_h}\" viewBox=\"0 0 {view_w} {view_h}\">",
        );

        for command in &list.commands {
            render_command_svg(&mut svg, command)?;
        }

        svg.push_str("</svg>");
        Ok(svg)
    }

    /// Rasterize a display list to a tiny-skia Pixmap.
    ///
    /// # Errors
    ///
    /// Returns an error if the intermediate SVG cannot be parsed or the
    /// pixmap cannot be allocated.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn rasterize(&self, list: &DisplayList) -> RenderResult<tiny_skia::Pixmap> {
        let svg_string = self.render_to_svg(list)?;

        let opt = usvg::Options {
            fontdb: Arc::clone(&self.fontdb),
            ..usvg::Options::default()
        };
        let tree = usvg::Tree::from_str(&svg_string, &opt)
            .map_err(|e| RenderError::Export(format!("SVG parsing failed: {e}")))?;

        let px_w = tree.size().width().round() as u32;
        let px_h = tree.size().height().round() as u32;

        let mut pixmap = tiny_skia::Pixmap::new(px_w.max(1), px_h.max(1))
            .ok_or_else(|| RenderError::Export("Failed to create pixmap".to_string()))?;

        resvg::render(
            &tree,
            tiny_skia::Transform::default(),
            &mut pixmap.as_mut(),
        );
        tracing::trace!("Rasterized {px_w}x{px_h} at scale {}", self.config.scale);

        Ok(pixmap)
    }

    /// Get output dimensions (width, height) in pixels.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn output_dimensions(&self, list: &DisplayList) -> (u32, u32) {
        let scale = f64::from(self.config.scale);
        let out_w = (list.width.max(1.0) * scale).round() as u32;
        let out_h = (list.height.max(1.0) * scale).round() as u32;
        (out_w.max(1), out_h.max(1))
    }
}

impl std::fmt::Debug for SceneExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneExporter")
            .field("config", &self.config)
            .field("font_faces", &self.fontdb.len())
            .finish()
    }
}

/// `fill="#rrggbb"` (or `stroke=...`) plus an opacity attribute when the
/// colour is not opaque.
fn paint(attr: &str, color: Color) -> String {
    let mut out = format!(
        "{attr}=\"#{:02x}{:02x}{:02x}\"",
        color.r, color.g, color.b
    );
    if color.a != 0xff {
        let _ = write!(out, " {attr}-opacity=\"{}\"", color.opacity());
    }
    out
}

/// Render a single drawing command to SVG.
#[allow(clippy::too_many_lines)]
fn render_command_svg(svg: &mut String, command: &DrawCommand) -> RenderResult<()> {
    match command {
        DrawCommand::FillRect { rect, color } => {
            let Rect {
                x,
                y,
                width,
                height,
            } = rect;
            let _ = write!(
                svg,
                "<rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" {}/>",
                paint("fill", *color),
            );
        }

        DrawCommand::StrokeRect {
            rect,
            color,
            width: stroke_width,
            dash,
        } => {
            let Rect {
                x,
                y,
                width,
                height,
            } = rect;
            let dash_attr = dash
                .map(|[on, off]| format!(" stroke-dasharray=\"{on} {off}\""))
                .unwrap_or_default();
            let _ = write!(
                svg,
                "<rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" fill=\"none\" {} stroke-width=\"{stroke_width}\"{dash_attr}/>",
                paint("stroke", *color),
            );
        }

        DrawCommand::Line {
            from,
            to,
            color,
            width,
        } => {
            let _ = write!(
                svg,
                "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" {} stroke-width=\"{width}\"/>",
                from.x,
                from.y,
                to.x,
                to.y,
                paint("stroke", *color),
            );
        }

        DrawCommand::Polyline {
            points,
            color,
            width,
        } => {
            let mut coords = String::with_capacity(points.len() * 12);
            for (i, Point { x, y }) in points.iter().enumerate() {
                if i > 0 {
                    coords.push(' ');
                }
                let _ = write!(coords, "{x},{y}");
            }
            let _ = write!(
                svg,
                "<polyline points=\"{coords}\" fill=\"none\" {} stroke-width=\"{width}\" stroke-linecap=\"round\" stroke-linejoin=\"round\"/>",
                paint("stroke", *color),
            );
        }

        DrawCommand::Ellipse {
            center,
            rx,
            ry,
            color,
            width,
        } => {
            let _ = write!(
                svg,
                "<ellipse cx=\"{}\" cy=\"{}\" rx=\"{rx}\" ry=\"{ry}\" fill=\"none\" {} stroke-width=\"{width}\"/>",
                center.x,
                center.y,
                paint("stroke", *color),
            );
        }

        DrawCommand::Image { image, rect, .. } => {
            let href = encode_data_uri(image)?;
            let _ = write!(
                svg,
                "<image x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" preserveAspectRatio=\"none\" href=\"{href}\"/>",
                rect.x, rect.y, rect.width, rect.height,
            );
        }

        DrawCommand::Text {
            anchor,
            content,
            size,
            bold,
            color,
            align,
        } => {
            let escaped = escape_xml(content);
            let weight = if *bold { " font-weight=\"bold\"" } else { "" };
            let text_anchor = match align {
                TextAlign::Left => "start",
                TextAlign::Center => "middle",
            };
            let _ = write!(
                svg,
                "<text x=\"{}\" y=\"{}\" font-size=\"{size}\"{weight} {} text-anchor=\"{text_anchor}\" font-family=\"Arial, sans-serif\">{escaped}</text>",
                anchor.x,
                anchor.y,
                paint("fill", *color),
            );
        }

        DrawCommand::RoundedBorder {
            width,
            height,
            radius,
            stroke_width,
            color,
        } => {
            let (w, h, r, half) = (*width, *height, *radius, stroke_width / 2.0);
            let _ = write!(
                svg,
                "<path d=\"M{r},{half} L{},{half} Q{},{half} {},{r} L{},{} Q{},{} {},{} L{r},{} Q{half},{} {half},{} L{half},{r} Q{half},{half} {r},{half} Z\" fill=\"none\" {} stroke-width=\"{stroke_width}\"/>",
                w - r,
                w - half,
                w - half,
                w - half,
                h - r,
                w - half,
                h - half,
                w - r,
                h - half,
                h - half,
                h - half,
                h - r,
                paint("stroke", *color),
            );
        }

        DrawCommand::Grid {
            width,
            height,
            spacing,
            color,
            line_width,
        } => {
            let mut d = String::new();
            for x in grid_positions(*width, *spacing) {
                let _ = write!(d, "M{x},0 V{height} ");
            }
            for y in grid_positions(*height, *spacing) {
                let _ = write!(d, "M0,{y} H{width} ");
            }
            let _ = write!(
                svg,
                "<path d=\"{}\" fill=\"none\" {} stroke-width=\"{line_width}\"/>",
                d.trim_end(),
                paint("stroke", *color),
            );
        }

        DrawCommand::ElementHandle { rect, fill, stroke } => {
            let _ = write!(
                svg,
                "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" {} {} stroke-width=\"2\"/>",
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                paint("fill", *fill),
                paint("stroke", *stroke),
            );
        }

        DrawCommand::ViewportHandle { rect, fill, stroke } => {
            let center = rect.center();
            let _ = write!(
                svg,
                "<circle cx=\"{}\" cy=\"{}\" r=\"{}\" {} {} stroke-width=\"2\"/>",
                center.x,
                center.y,
                rect.width / 2.0,
                paint("fill", *fill),
                paint("stroke", *stroke),
            );
        }
    }
    Ok(())
}

/// Grid line offsets `0, spacing, 2·spacing, ...` up to `extent`.
fn grid_positions(extent: f64, spacing: f64) -> impl Iterator<Item = f64> {
    (0u32..)
        .map(move |i| f64::from(i) * spacing)
        .take_while(move |p| spacing > 0.0 && *p <= extent)
}

/// Escape special XML characters.
fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use composer_core::RasterImage;

    fn exporter() -> SceneExporter {
        SceneExporter::new(ExportConfig {
            system_fonts: false,
            ..ExportConfig::default()
        })
    }

    fn text(content: &str) -> DrawCommand {
        DrawCommand::Text {
            anchor: Point::new(10.0, 20.0),
            content: content.to_string(),
            size: 16.0,
            bold: true,
            color: Color::BLACK,
            align: TextAlign::Center,
        }
    }

    #[test]
    fn test_svg_export_empty_list() {
        let list = DisplayList::new(800.0, 600.0);
        let svg = exporter().render_to_svg(&list).expect("svg export");
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("width=\"800\""));
        assert!(svg.contains("height=\"600\""));
    }

    #[test]
    fn test_svg_text_attributes() {
        let mut list = DisplayList::new(800.0, 600.0);
        list.push(text("Lesions:"));
        let svg = exporter().render_to_svg(&list).expect("svg export");
        assert!(svg.contains(">Lesions:</text>"));
        assert!(svg.contains("font-size=\"16\""));
        assert!(svg.contains("font-weight=\"bold\""));
        assert!(svg.contains("text-anchor=\"middle\""));
    }

    #[test]
    fn test_xml_escaping() {
        let mut list = DisplayList::new(200.0, 100.0);
        list.push(text("A < B & C > D"));
        let svg = exporter().render_to_svg(&list).expect("svg");
        assert!(svg.contains("A &lt; B &amp; C &gt; D"));
    }

    #[test]
    fn test_translucent_colour_gets_opacity() {
        let mut list = DisplayList::new(100.0, 100.0);
        list.push(DrawCommand::Grid {
            width: 100.0,
            height: 100.0,
            spacing: 20.0,
            color: Color {
                r: 0xf0,
                g: 0xf0,
                b: 0xf0,
                a: 0x80,
            },
            line_width: 0.5,
        });
        let svg = exporter().render_to_svg(&list).expect("svg");
        assert!(svg.contains("stroke=\"#f0f0f0\""));
        assert!(svg.contains("stroke-opacity="));
        // 0, 20, 40, 60, 80, 100 on each axis
        assert_eq!(svg.matches('M').count(), 12);
    }

    #[test]
    fn test_dashed_stroke() {
        let mut list = DisplayList::new(100.0, 100.0);
        list.push(DrawCommand::StrokeRect {
            rect: Rect::new(5.0, 5.0, 90.0, 90.0),
            color: Color::rgb(0xde, 0xe2, 0xe6),
            width: 3.0,
            dash: Some([15.0, 10.0]),
        });
        let svg = exporter().render_to_svg(&list).expect("svg");
        assert!(svg.contains("stroke-dasharray=\"15 10\""));
    }

    #[test]
    fn test_image_is_embedded_stretched() {
        let mut list = DisplayList::new(100.0, 100.0);
        list.push(DrawCommand::Image {
            image: RasterImage::solid(4, 4, [255, 0, 0, 255]).expect("image"),
            rect: Rect::new(10.0, 10.0, 50.0, 20.0),
            element: None,
        });
        let svg = exporter().render_to_svg(&list).expect("svg");
        assert!(svg.contains("href=\"data:image/png;base64,"));
        assert!(svg.contains("preserveAspectRatio=\"none\""));
    }

    #[test]
    fn test_png_export_produces_valid_bytes() {
        let mut list = DisplayList::new(100.0, 100.0);
        list.fill_background(Color::WHITE);
        let png = exporter().render_to_png(&list).expect("png export");

        // PNG magic bytes: \x89PNG
        assert!(png.len() > 8);
        assert_eq!(&png[0..4], &[137, 80, 78, 71]);
    }

    #[test]
    fn test_jpeg_export_produces_valid_bytes() {
        let mut list = DisplayList::new(100.0, 100.0);
        list.fill_background(Color::WHITE);
        let jpeg = exporter().render_to_jpeg(&list).expect("jpeg export");

        // JPEG magic bytes: FFD8
        assert!(jpeg.len() > 2);
        assert_eq!(jpeg[0], 0xFF);
        assert_eq!(jpeg[1], 0xD8);
    }

    #[test]
    fn test_export_dispatch() {
        let list = DisplayList::new(100.0, 100.0);
        let exporter = exporter();

        let png = exporter.export(&list, ExportFormat::Png).expect("png");
        assert_eq!(&png[0..4], &[137, 80, 78, 71]);

        let jpeg = exporter.export(&list, ExportFormat::Jpeg).expect("jpeg");
        assert_eq!(jpeg[0], 0xFF);

        let svg = exporter.export(&list, ExportFormat::Svg).expect("svg");
        let svg_str = String::from_utf8(svg).expect("utf8");
        assert!(svg_str.starts_with("<svg"));
    }

    #[test]
    fn test_rasterized_fill_colour() {
        let mut list = DisplayList::new(10.0, 10.0);
        list.fill_background(Color::rgb(0x51, 0xab, 0xe4));
        let pixmap = exporter().rasterize(&list).expect("pixmap");
        assert_eq!((pixmap.width(), pixmap.height()), (10, 10));
        let pixel = pixmap.pixel(5, 5).expect("in bounds");
        assert_eq!((pixel.red(), pixel.green(), pixel.blue()), (0x51, 0xab, 0xe4));
    }

    #[test]
    fn test_scale_factor() {
        let list = DisplayList::new(100.0, 100.0);
        let exporter = SceneExporter::new(ExportConfig {
            scale: 2.0,
            system_fonts: false,
            ..Default::default()
        });

        let svg = exporter.render_to_svg(&list).expect("svg");
        // At 2x scale, output should be 200x200
        assert!(svg.contains("width=\"200\""));
        assert!(svg.contains("height=\"200\""));
        // But viewBox should still map to 100x100
        assert!(svg.contains("viewBox=\"0 0 100 100\""));
    }

    #[test]
    fn test_format_metadata() {
        assert_eq!(ExportFormat::default(), ExportFormat::Png);
        assert_eq!(ExportFormat::Jpeg.extension(), "jpg");
        assert_eq!(ExportFormat::Svg.mime_type(), "image/svg+xml");
    }
}
