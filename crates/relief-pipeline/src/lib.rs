//! relief-pipeline: Pure raster-to-solid pipeline (sans-IO).
//!
//! Converts a raster image into a print-ready relief through:
//! decode -> binarize -> foreground normalize -> trace -> filter ->
//! geometry -> scene assembly.
//!
//! Traced documents can also be edited with undo/redo through
//! [`Editor`], which rebuilds the solid after every change.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. Network and async
//! interaction lives in `relief-io`.

pub mod assemble;
pub mod binarize;
pub mod decode;
pub mod diagnostics;
pub mod editor;
pub mod filter;
pub mod foreground;
pub mod geometry;
pub mod history;
pub mod mesh;
pub mod pipeline;
pub mod simplify;
pub mod svg_import;
pub mod trace;
pub mod types;
pub mod vector;

use web_time::Instant;

pub use assemble::{SolidAssembly, SolidBuild, build_solid};
pub use binarize::ThresholdUsed;
pub use diagnostics::{PipelineDiagnostics, PipelineSummary, StageDiagnostics, StageMetrics};
pub use editor::Editor;
pub use geometry::{BoundingBox, GeometryWarning, Placement};
pub use history::{HISTORY_CAPACITY, HistoryStack};
pub use mesh::Mesh;
pub use pipeline::{MeasuredStage, Pipeline, PipelineStage, ProcessResult, RasterOutcome};
pub use svg_import::import_svg;
pub use trace::{PathTracer, TraceParams, TracerKind};
pub use types::{
    Dimensions, MM_PER_INCH, ModelDimensions, PipelineConfig, PipelineError, Point, RgbaImage,
    ThresholdAlgorithm, ThresholdConfig,
};
pub use vector::{Rgb, Segment, SubPath, VectorDocument, VectorPath};

/// Run the full pipeline.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP), a configuration,
/// and a tracing engine, then produces a [`ProcessResult`] holding the
/// traced document, its foreground, and the assembled solid.
///
/// # Pipeline steps
///
/// 1. Validate the configuration
/// 2. Decode the image, flattening transparency onto white
/// 3. Binarize (Otsu, median + Otsu, adaptive, or a manual cut)
/// 4. Invert if dark pixels dominate
/// 5. Trace closed paths (pluggable engine)
/// 6. Drop background paths
/// 7. Fit to the footprint, extrude, add the base plate, lay flat
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` is invalid.
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is unrecognized.
/// Propagates any error from `tracer`.
pub fn process(
    image_bytes: &[u8],
    config: &PipelineConfig,
    tracer: &dyn PathTracer,
) -> Result<ProcessResult, PipelineError> {
    Ok(Pipeline::new(image_bytes.to_vec(), config.clone())
        .decode()?
        .binarize()
        .normalize()
        .trace(tracer)?
        .filter()
        .assemble()
        .into_result())
}

/// Run the full pipeline and collect per-stage diagnostics.
///
/// Produces the same [`ProcessResult`] as [`process`] together with
/// wall-clock timings and metrics for every stage.
///
/// # Errors
///
/// Same as [`process`].
pub fn process_with_diagnostics(
    image_bytes: &[u8],
    config: &PipelineConfig,
    tracer: &dyn PathTracer,
) -> Result<(ProcessResult, PipelineDiagnostics), PipelineError> {
    let pipeline_start = Instant::now();

    let start = Instant::now();
    let decoded = Pipeline::new(image_bytes.to_vec(), config.clone()).decode()?;
    let decode = stage_diagnostics(&decoded, start);

    let start = Instant::now();
    let binarized = decoded.binarize();
    let binarize = stage_diagnostics(&binarized, start);

    let start = Instant::now();
    let normalized = binarized.normalize();
    let normalize = stage_diagnostics(&normalized, start);

    let start = Instant::now();
    let traced = normalized.trace(tracer)?;
    let trace = stage_diagnostics(&traced, start);

    let start = Instant::now();
    let filtered = traced.filter();
    let filter = stage_diagnostics(&filtered, start);

    let start = Instant::now();
    let assembled = filtered.assemble();
    let assemble = stage_diagnostics(&assembled, start);

    let total_duration = pipeline_start.elapsed();
    let result = assembled.into_result();
    let dimensions = result.document.dimensions;

    let diagnostics = PipelineDiagnostics {
        decode,
        binarize,
        normalize,
        trace,
        filter,
        assemble,
        total_duration,
        summary: PipelineSummary {
            image_width: dimensions.width,
            image_height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
            foreground_paths: result.foreground.len(),
            total_triangles: result.solid.assembly.triangle_count(),
            warning: result.solid.warning,
        },
    };

    Ok((result, diagnostics))
}

fn stage_diagnostics<S: MeasuredStage>(stage: &S, start: Instant) -> StageDiagnostics {
    StageDiagnostics {
        duration: start.elapsed(),
        metrics: stage.measure(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::decode::tests::encode_png;

    /// A dark disc centred in a light square image.
    fn disc_png(size: u32, radius: f64) -> Vec<u8> {
        let c = f64::from(size) / 2.0;
        let img = RgbaImage::from_fn(size, size, |x, y| {
            let dx = f64::from(x) + 0.5 - c;
            let dy = f64::from(y) + 0.5 - c;
            if dx.hypot(dy) <= radius {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        encode_png(&img)
    }

    #[test]
    fn process_empty_input() {
        let result = process(&[], &PipelineConfig::default(), &TracerKind::default());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn process_corrupt_input() {
        let result = process(
            &[0xFF, 0x00],
            &PipelineConfig::default(),
            &TracerKind::default(),
        );
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn process_invalid_config() {
        let config = PipelineConfig {
            model: ModelDimensions {
                target_width: -1.0,
                ..ModelDimensions::default()
            },
            ..PipelineConfig::default()
        };
        let result = process(&disc_png(20, 5.0), &config, &TracerKind::default());
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn process_uniform_image_returns_base_plate() {
        let img = RgbaImage::from_fn(20, 20, |_, _| image::Rgba([128, 128, 128, 255]));
        let result = process(
            &encode_png(&img),
            &PipelineConfig::default(),
            &TracerKind::default(),
        )
        .unwrap();
        assert!(result.foreground.is_empty());
        assert_eq!(result.solid.warning, Some(GeometryWarning::NoGeometry));
    }

    #[test]
    fn process_disc_produces_one_extrusion() {
        let result = process(
            &disc_png(64, 20.0),
            &PipelineConfig::default(),
            &TracerKind::default(),
        )
        .unwrap();
        assert_eq!(result.foreground.len(), 1);
        assert_eq!(result.solid.assembly.extrusions.len(), 1);
        assert_eq!(
            result.document.dimensions,
            Dimensions {
                width: 64,
                height: 64
            }
        );
    }

    /// A tracer that fails, standing in for an unavailable engine.
    struct Broken;

    impl PathTracer for Broken {
        fn trace(
            &self,
            _raster: &RgbaImage,
            _params: &TraceParams,
        ) -> Result<VectorDocument, PipelineError> {
            Err(PipelineError::InvalidConfig("engine offline".to_string()))
        }
    }

    #[test]
    fn tracer_errors_propagate() {
        let result = process(&disc_png(20, 5.0), &PipelineConfig::default(), &Broken);
        assert!(result.is_err());
    }

    #[test]
    fn diagnostics_match_result() {
        let (result, diag) = process_with_diagnostics(
            &disc_png(64, 20.0),
            &PipelineConfig::default(),
            &TracerKind::default(),
        )
        .unwrap();
        assert_eq!(diag.summary.image_width, 64);
        assert_eq!(diag.summary.pixel_count, 4096);
        assert_eq!(diag.summary.foreground_paths, result.foreground.len());
        assert_eq!(
            diag.summary.total_triangles,
            result.solid.assembly.triangle_count()
        );
        assert!(diag.summary.warning.is_none());
        assert!(matches!(
            diag.filter.metrics,
            StageMetrics::Filter {
                paths_before: 1,
                paths_after: 1
            }
        ));
        let stages = diag.decode.duration
            + diag.binarize.duration
            + diag.normalize.duration
            + diag.trace.duration
            + diag.filter.duration
            + diag.assemble.duration;
        assert!(stages <= diag.total_duration);
    }
}
