//! # Report Composer CLI
//!
//! Command-line driver for the composer: combine a screenshot and an
//! annotated diagram into one report image, or replay an annotation script
//! onto a diagram and export the annotated sheet.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use composer_core::{
    AnnotationLayer, BindTarget, Color, ComposerConfig, CompositionCanvas, ImageSource, Point,
    PointerEvent,
};
use composer_renderer::{
    Delivery, DecodingImageProvider, ExportConfig, ExportFormat, FallbackSink, FileSink,
    ImageProvider, MemorySink, SceneExporter,
};
use serde::{Deserialize, Serialize};

/// Command-line arguments for report-composer.
#[derive(Debug, Clone, Parser)]
#[command(name = "report-composer")]
#[command(about = "Compose prostate MRI report images")]
#[command(version)]
pub struct CliArgs {
    /// JSON configuration file (canvas, annotation and export sections)
    #[arg(long, global = true, env = "COMPOSER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory exported files are written to
    #[arg(long, short, global = true, default_value = ".")]
    pub output: PathBuf,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = FormatArg::Png)]
    pub format: FormatArg,

    /// Try the clipboard first and fall back to a file
    #[arg(long, global = true)]
    pub clipboard: bool,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Combine a screenshot and a diagram into one report image
    Combine {
        /// Screenshot for the primary slot
        #[arg(long)]
        screenshot: Option<PathBuf>,

        /// Annotated diagram for the diagram slot
        #[arg(long)]
        diagram: Option<PathBuf>,

        /// Further screenshots, each stacked below at natural size
        #[arg(long = "additional")]
        additional: Vec<PathBuf>,

        /// Crop or extend the canvas to WIDTHxHEIGHT (e.g. 1200x800)
        #[arg(long)]
        viewport: Option<String>,

        /// Match the canvas height to the diagram
        #[arg(long)]
        fit_diagram: bool,
    },

    /// Draw an annotation script onto a diagram and export it with its legend
    Annotate {
        /// Diagram background; the default outline is used when omitted
        #[arg(long)]
        background: Option<PathBuf>,

        /// JSON annotation script
        #[arg(long)]
        script: PathBuf,
    },
}

/// Output format choice on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// PNG image
    Png,
    /// JPEG image
    Jpeg,
    /// SVG document
    Svg,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Png => Self::Png,
            FormatArg::Jpeg => Self::Jpeg,
            FormatArg::Svg => Self::Svg,
        }
    }
}

/// Configuration file contents: the composer policies plus export settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Canvas and annotation policies.
    #[serde(flatten)]
    pub composer: ComposerConfig,
    /// Export settings.
    pub export: ExportConfig,
}

impl CliConfig {
    /// Load the configuration, or the defaults when no path is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.composer.validate()?;
        if !(1..=100).contains(&config.export.jpeg_quality) {
            anyhow::bail!("export.jpeg_quality must be between 1 and 100");
        }
        if config.export.scale <= 0.0 {
            anyhow::bail!("export.scale must be positive");
        }
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// A scripted annotation session.
///
/// ```json
/// { "lesions": [ { "color": "#e15759", "width": 4, "strokes": [[{"x": 10, "y": 10}, {"x": 40, "y": 30}]] } ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationScript {
    /// Lesions in legend order.
    pub lesions: Vec<LesionScript>,
    /// Eraser positions applied after all lesions are drawn.
    pub erase: Vec<Point>,
}

/// Strokes drawn for one lesion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LesionScript {
    /// Pen colour; the palette colour is kept when omitted.
    pub color: Option<Color>,
    /// Pen width; the current width is kept when omitted.
    pub width: Option<f64>,
    /// Each stroke as the points the pointer passes through.
    pub strokes: Vec<Vec<Point>>,
}

impl AnnotationScript {
    /// Parse a script from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a script.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Replay the script through the layer's pointer handling, registering
    /// each lesion in the legend once its strokes are drawn.
    pub fn apply(&self, layer: &mut AnnotationLayer) {
        for lesion in &self.lesions {
            if let Some(color) = lesion.color {
                layer.set_color(color);
            }
            if let Some(width) = lesion.width {
                layer.set_line_width(width);
            }
            for stroke in &lesion.strokes {
                let Some((first, rest)) = stroke.split_first() else {
                    continue;
                };
                layer.handle_pointer(&PointerEvent::down(first.x, first.y));
                for point in rest {
                    layer.handle_pointer(&PointerEvent::moved(point.x, point.y));
                }
                let last = rest.last().unwrap_or(first);
                layer.handle_pointer(&PointerEvent::up(last.x, last.y));
            }
            layer.register_lesion();
        }
        for at in &self.erase {
            layer.erase_at(*at);
        }
    }
}

/// Run the parsed command line.
///
/// # Errors
///
/// Returns an error if loading, rendering or delivery fails.
pub async fn run(args: CliArgs) -> anyhow::Result<Delivery> {
    let config = CliConfig::load(args.config.as_deref())?;
    let format = ExportFormat::from(args.format);
    let exporter = SceneExporter::new(config.export.clone());
    let provider = DecodingImageProvider::new();

    let bytes = match &args.command {
        Command::Combine {
            screenshot,
            diagram,
            additional,
            viewport,
            fit_diagram,
        } => {
            let mut canvas = CompositionCanvas::new(config.composer.canvas.clone());
            if let Some(path) = screenshot {
                bind_file(&mut canvas, &provider, BindTarget::Screenshot, path).await?;
            }
            if let Some(path) = diagram {
                bind_file(&mut canvas, &provider, BindTarget::Diagram, path).await?;
                if *fit_diagram {
                    canvas.fit_viewport_to_diagram();
                }
            }
            for path in additional {
                bind_file(&mut canvas, &provider, BindTarget::NextFreeScreenshot, path).await?;
            }
            if let Some(size) = viewport {
                canvas
                    .set_viewport_from_str(size)
                    .with_context(|| format!("invalid --viewport '{size}'"))?;
            }
            exporter.export_composition(&canvas, format)?
        }
        Command::Annotate { background, script } => {
            let mut layer = AnnotationLayer::new(config.composer.annotation.clone());
            if let Some(path) = background {
                let source = ImageSource::Path(path.clone());
                let image = provider
                    .load(&source)
                    .await
                    .with_context(|| format!("loading background {}", path.display()))?;
                layer.set_background(source, Some(image));
            }
            let text = tokio::fs::read_to_string(script)
                .await
                .with_context(|| format!("reading script {}", script.display()))?;
            AnnotationScript::from_json_str(&text)
                .with_context(|| format!("parsing script {}", script.display()))?
                .apply(&mut layer);
            exporter
                .export_annotation(&layer, &provider, format)
                .await?
        }
    };

    let sink = build_sink(&args, format);
    let delivery = sink.deliver(&bytes).await?;
    tracing::info!("Export delivered: {delivery:?}");
    Ok(delivery)
}

async fn bind_file(
    canvas: &mut CompositionCanvas,
    provider: &DecodingImageProvider,
    target: BindTarget,
    path: &Path,
) -> anyhow::Result<()> {
    let image = provider
        .load(&ImageSource::Path(path.to_path_buf()))
        .await
        .with_context(|| format!("loading {}", path.display()))?;
    canvas.bind_image(target, image)?;
    Ok(())
}

fn build_sink(args: &CliArgs, format: ExportFormat) -> FallbackSink {
    let prefix = match args.command {
        Command::Combine { .. } => "prostate-report",
        Command::Annotate { .. } => "prostate-annotation",
    };
    let file = FileSink::new(&args.output)
        .with_prefix(prefix)
        .with_extension(format.extension());
    if args.clipboard {
        // No clipboard access from a terminal.
        FallbackSink::new(Box::new(MemorySink::unsupported()), Some(Box::new(file)))
    } else {
        FallbackSink::new(Box::new(file), None)
    }
}
