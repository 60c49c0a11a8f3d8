//! relief: turn a logo or drawing into a printable relief.
//!
//! Vectorizes an image (in-process or through a remote backend), drops
//! the background, extrudes the foreground shapes on top of a base plate
//! and writes the result as STL. The traced paths can also be written
//! as SVG, and individual paths can be removed before export.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin relief -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use relief_export::{DEFAULT_HEADER, SvgMetadata, to_ascii_stl, to_stl, to_svg};
use relief_io::{Backend, LocalVectorizer, RemoteVectorizer, Revectorized, Session};
use relief_pipeline::{
    Editor, ModelDimensions, PipelineConfig, ThresholdAlgorithm, ThresholdConfig, TracerKind,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Turn a logo or drawing into a printable relief.
///
/// Dark shapes on a light background become raised extrusions on a
/// rectangular base plate. The model is written as binary STL unless
/// `--ascii` is given.
#[derive(Parser)]
#[command(name = "relief", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Thresholding algorithm.
    #[arg(long, value_enum, default_value_t = Algorithm::Otsu)]
    algorithm: Algorithm,

    /// Manual luminance cut (0-255). Overrides the algorithm.
    #[arg(long)]
    threshold: Option<f64>,

    /// Speckle filter: drop traced shapes enclosing fewer than this many pixels.
    #[arg(long, default_value_t = ThresholdConfig::DEFAULT_TURD_SIZE)]
    turd_size: u32,

    /// Corner threshold passed to the tracer.
    #[arg(long, default_value_t = ThresholdConfig::DEFAULT_ALPHA_MAX)]
    alpha_max: f64,

    /// Disable curve optimization.
    #[arg(long)]
    no_optimize: bool,

    /// Curve optimization tolerance.
    #[arg(long, default_value_t = ThresholdConfig::DEFAULT_OPTIMIZE_TOLERANCE)]
    tolerance: f64,

    /// Footprint width in inches.
    #[arg(long, default_value_t = ModelDimensions::DEFAULT_TARGET_WIDTH)]
    width: f64,

    /// Footprint length in inches.
    #[arg(long, default_value_t = ModelDimensions::DEFAULT_TARGET_LENGTH)]
    length: f64,

    /// Extrusion height in millimeters.
    #[arg(long, default_value_t = ModelDimensions::DEFAULT_EXTRUSION_DEPTH)]
    depth: f64,

    /// Base plate thickness in millimeters.
    #[arg(long, default_value_t = ModelDimensions::DEFAULT_BASE_THICKNESS)]
    base: f64,

    /// Line segments per curve when flattening.
    #[arg(long, default_value_t = ModelDimensions::DEFAULT_CURVE_SEGMENTS)]
    curve_segments: u32,

    /// Full pipeline configuration as JSON.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// Accepts the JSON embedded in the metadata of `--svg` output.
    #[arg(long)]
    config_json: Option<String>,

    /// Vectorize through the HTTP backend at this base URL instead of
    /// in-process.
    #[arg(long)]
    backend: Option<String>,

    /// Remove the path at this index before export. Repeatable; each
    /// index refers to the document left by the previous removal.
    #[arg(long = "remove", value_name = "INDEX")]
    remove: Vec<usize>,

    /// Output STL path. Defaults to the image path with an `.stl`
    /// extension.
    #[arg(long)]
    stl: Option<PathBuf>,

    /// Write ASCII STL instead of binary.
    #[arg(long)]
    ascii: bool,

    /// Also write the traced paths as SVG to this path.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Print per-stage diagnostics (in-process vectorization only).
    #[arg(long)]
    diagnostics: bool,

    /// Print the run summary as JSON instead of text.
    #[arg(long)]
    json: bool,
}

/// Thresholding algorithm (CLI mirror of [`ThresholdAlgorithm`]).
#[derive(Clone, Copy, ValueEnum)]
enum Algorithm {
    /// Global Otsu threshold.
    Otsu,
    /// 3x3 median filter, then Otsu.
    MedianOtsu,
    /// Local Gaussian-weighted mean.
    Adaptive,
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(PipelineConfig {
        threshold: ThresholdConfig {
            algorithm: match cli.algorithm {
                Algorithm::Otsu => ThresholdAlgorithm::Otsu,
                Algorithm::MedianOtsu => ThresholdAlgorithm::MedianOtsu,
                Algorithm::Adaptive => ThresholdAlgorithm::Adaptive,
            },
            manual_value: cli.threshold,
            turd_size: cli.turd_size,
            alpha_max: cli.alpha_max,
            optimize_curves: !cli.no_optimize,
            optimize_tolerance: cli.tolerance,
        },
        model: ModelDimensions {
            target_width: cli.width,
            target_length: cli.length,
            extrusion_depth: cli.depth,
            base_thickness: cli.base,
            curve_segments: cli.curve_segments,
        },
    })
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relief=info,relief_io=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        image = %cli.image_path.display(),
        bytes = image_bytes.len(),
        "loaded image"
    );

    if cli.diagnostics {
        if cli.backend.is_some() {
            eprintln!("--diagnostics is only available for in-process vectorization");
            return ExitCode::FAILURE;
        }
        if let Err(msg) = print_diagnostics(&image_bytes, &config, cli.json) {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    }

    let backend = match cli.backend {
        Some(ref url) => Backend::Remote(RemoteVectorizer::new(url)),
        None => Backend::Local(LocalVectorizer::default()),
    };
    let session = match Session::new(backend, config.model) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Invalid model dimensions: {e}");
            return ExitCode::FAILURE;
        }
    };

    let raster = match session.revectorize(image_bytes, &config).await {
        Ok(Revectorized::Applied { raster, .. }) => raster,
        Ok(Revectorized::Stale { generation, latest }) => {
            eprintln!("Vectorization {generation} superseded by {latest}");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("Vectorization failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut editor = session.editor().await;
    for &index in &cli.remove {
        match editor.remove_path(index) {
            Ok(path) => tracing::info!(index, subpaths = path.subpaths.len(), "removed path"),
            Err(e) => {
                eprintln!("Cannot remove path {index}: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    if let Err(msg) = write_outputs(&cli, &config, &editor) {
        eprintln!("{msg}");
        return ExitCode::FAILURE;
    }

    let summary = summarize(&editor, raster.map(|r| (r.threshold.value(), r.inverted)));
    if cli.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing summary: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_summary(&summary);
    }

    ExitCode::SUCCESS
}

/// Run the in-process pipeline with per-stage timing and print the report.
fn print_diagnostics(image_bytes: &[u8], config: &PipelineConfig, json: bool) -> Result<(), String> {
    let (_, diagnostics) =
        relief_pipeline::process_with_diagnostics(image_bytes, config, &TracerKind::default())
            .map_err(|e| format!("Pipeline error: {e}"))?;
    if json {
        let text = serde_json::to_string_pretty(&diagnostics)
            .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
        println!("{text}");
    } else {
        println!("{}", diagnostics.report());
    }
    Ok(())
}

fn write_outputs(cli: &Cli, config: &PipelineConfig, editor: &Editor) -> Result<(), String> {
    let title = cli
        .image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("relief");

    let solid = editor
        .solid()
        .ok_or_else(|| "Nothing to export".to_string())?;
    let stl_path = cli
        .stl
        .clone()
        .unwrap_or_else(|| cli.image_path.with_extension("stl"));
    let stl = if cli.ascii {
        to_ascii_stl(&solid.assembly, title).into_bytes()
    } else {
        to_stl(&solid.assembly, DEFAULT_HEADER).map_err(|e| format!("Error encoding STL: {e}"))?
    };
    write_file(&stl_path, &stl, "STL")?;

    if let (Some(svg_path), Some(document)) = (&cli.svg, editor.document()) {
        let config_json = serde_json::to_string(config)
            .map_err(|e| format!("Error serializing config: {e}"))?;
        let metadata = SvgMetadata {
            title: Some(title),
            description: Some("Traced by relief"),
            config_json: Some(&config_json),
        };
        let svg = to_svg(document, &metadata);
        write_file(svg_path, svg.as_bytes(), "SVG")?;
    }
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8], what: &str) -> Result<(), String> {
    std::fs::write(path, bytes)
        .map_err(|e| format!("Error writing {what} to {}: {e}", path.display()))?;
    eprintln!("{what} written to {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Machine-readable description of the exported model.
fn summarize(editor: &Editor, raster: Option<(f64, bool)>) -> serde_json::Value {
    let paths = editor.document().map_or(0, |d| d.len());
    let solid = editor.solid();
    let dims = editor.dimensions();
    serde_json::json!({
        "paths": paths,
        "extrusions": solid.map_or(0, |s| s.assembly.extrusions.len()),
        "triangles": solid.map_or(0, |s| s.assembly.triangle_count()),
        "threshold": raster.map(|(t, _)| t),
        "inverted": raster.map(|(_, i)| i),
        "warning": solid.and_then(|s| s.warning).map(|w| w.to_string()),
        "footprint_mm": [dims.target_width_mm(), dims.target_length_mm()],
        "height_mm": dims.base_thickness + dims.extrusion_depth,
    })
}

fn print_summary(summary: &serde_json::Value) {
    println!("Relief Summary\n{}", "=".repeat(40));
    if let Some(fields) = summary.as_object() {
        for (key, value) in fields {
            if !value.is_null() {
                println!("{key:<16} {value}");
            }
        }
    }
}
