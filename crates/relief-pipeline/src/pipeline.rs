//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::process`] which runs the entire pipeline in one call,
//! [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use relief_pipeline::{Pipeline, PipelineConfig, PipelineError, TracerKind};
//! # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
//! let result = Pipeline::new(png, PipelineConfig::default())
//!     .decode()?
//!     .binarize()
//!     .normalize()
//!     .trace(&TracerKind::BorderFollowing)?
//!     .filter()
//!     .assemble()
//!     .into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state
//! (or `Result` for fallible stages). The caller can inspect the current
//! stage's output via accessor methods at any point.
//!
//! Documents vectorized elsewhere (for example by the remote backend)
//! enter at the [`Traced`] stage through [`Pipeline::from_document`].

use crate::assemble::{SolidBuild, solid_from_foreground};
use crate::binarize::{Binarized as BinaryRaster, ThresholdUsed};
use crate::diagnostics::StageMetrics;
use crate::filter::filter_document;
use crate::foreground::{PixelBalance, maybe_invert};
use crate::trace::{PathTracer, TraceParams};
use crate::types::{PipelineConfig, PipelineError, RgbaImage};
use crate::vector::VectorDocument;

/// Entry point for the typed pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Start a pipeline over raw image bytes.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(source: Vec<u8>, config: PipelineConfig) -> Pending {
        Pending { config, source }
    }

    /// Start a pipeline from an already traced document.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `config` is invalid.
    pub fn from_document(
        document: VectorDocument,
        config: PipelineConfig,
    ) -> Result<Traced, PipelineError> {
        config.validate()?;
        Ok(Traced {
            config,
            document,
            raster: None,
        })
    }
}

/// How the raster stages treated the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOutcome {
    /// The luminance cut that was applied.
    pub threshold: ThresholdUsed,
    /// Whether foreground normalization inverted the raster.
    pub inverted: bool,
}

/// Everything the pipeline produced.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    /// The traced document, background paths included.
    pub document: VectorDocument,
    /// Foreground paths only.
    pub foreground: VectorDocument,
    /// The assembled solid.
    pub solid: SolidBuild,
    /// Raster stage outcome, absent when the pipeline started from a
    /// document.
    pub raster: Option<RasterOutcome>,
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
#[must_use = "pipeline stages are consumed by advancing; call .decode() to continue"]
pub struct Pending {
    config: PipelineConfig,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Validate the config, decode the source, and advance to [`Decoded`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the config is invalid,
    /// [`PipelineError::EmptyInput`] if the source bytes are empty, and
    /// [`PipelineError::ImageDecode`] if the image cannot be decoded.
    pub fn decode(self) -> Result<Decoded, PipelineError> {
        self.config.validate()?;
        let raster = crate::decode::decode_to_raster(&self.source)?;
        tracing::debug!(
            width = raster.width(),
            height = raster.height(),
            "decoded source image"
        );
        Ok(Decoded {
            config: self.config,
            raster,
            source_len: self.source.len(),
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding the source image.
#[must_use = "pipeline stages are consumed by advancing; call .binarize() to continue"]
pub struct Decoded {
    config: PipelineConfig,
    raster: RgbaImage,
    source_len: usize,
}

impl Decoded {
    /// The decoded RGBA raster with transparency flattened.
    #[must_use]
    pub const fn raster(&self) -> &RgbaImage {
        &self.raster
    }

    /// Binarize and advance to [`Binarized`].
    pub fn binarize(self) -> Binarized {
        let binary = crate::binarize::binarize(&self.raster, &self.config.threshold);
        tracing::debug!(threshold = ?binary.threshold, "binarized raster");
        let balance = PixelBalance::of(&binary.raster);
        Binarized {
            config: self.config,
            binary,
            balance,
        }
    }
}

// ───────────────────────── Stage 2: Binarized ────────────────────────

/// Pipeline state after binarization.
#[must_use = "pipeline stages are consumed by advancing; call .normalize() to continue"]
pub struct Binarized {
    config: PipelineConfig,
    binary: BinaryRaster,
    balance: PixelBalance,
}

impl Binarized {
    /// The pure black/white raster.
    #[must_use]
    pub const fn raster(&self) -> &RgbaImage {
        &self.binary.raster
    }

    /// The luminance cut that was applied.
    #[must_use]
    pub const fn threshold(&self) -> ThresholdUsed {
        self.binary.threshold
    }

    /// Normalize foreground polarity and advance to [`Normalized`].
    pub fn normalize(self) -> Normalized {
        let (raster, inverted) = maybe_invert(self.binary.raster);
        if inverted {
            tracing::debug!(
                black = self.balance.black,
                white = self.balance.white,
                "inverted dark-dominant raster"
            );
        }
        Normalized {
            config: self.config,
            raster,
            outcome: RasterOutcome {
                threshold: self.binary.threshold,
                inverted,
            },
        }
    }
}

// ───────────────────────── Stage 3: Normalized ───────────────────────

/// Pipeline state after foreground normalization.
#[must_use = "pipeline stages are consumed by advancing; call .trace() to continue"]
pub struct Normalized {
    config: PipelineConfig,
    raster: RgbaImage,
    outcome: RasterOutcome,
}

impl Normalized {
    /// The raster handed to the tracer.
    #[must_use]
    pub const fn raster(&self) -> &RgbaImage {
        &self.raster
    }

    /// Whether the raster was inverted.
    #[must_use]
    pub const fn inverted(&self) -> bool {
        self.outcome.inverted
    }

    /// The luminance cut applied during binarization.
    #[must_use]
    pub const fn threshold(&self) -> ThresholdUsed {
        self.outcome.threshold
    }

    /// Consume the pipeline, keeping only the tracer input.
    ///
    /// For engines that run outside the pipeline, such as one awaited
    /// on an async runtime.
    #[must_use]
    pub fn into_raster(self) -> RgbaImage {
        self.raster
    }

    /// Trace with `tracer` and advance to [`Traced`].
    ///
    /// # Errors
    ///
    /// Propagates any error from the tracer.
    pub fn trace(self, tracer: &dyn PathTracer) -> Result<Traced, PipelineError> {
        let params = TraceParams::from(&self.config.threshold);
        let document = tracer.trace(&self.raster, &params)?;
        Ok(Traced {
            config: self.config,
            document,
            raster: Some(self.outcome),
        })
    }
}

// ───────────────────────── Stage 4: Traced ───────────────────────────

/// Pipeline state after tracing.
#[must_use = "pipeline stages are consumed by advancing; call .filter() to continue"]
pub struct Traced {
    config: PipelineConfig,
    document: VectorDocument,
    raster: Option<RasterOutcome>,
}

impl Traced {
    /// Every traced path.
    #[must_use]
    pub const fn document(&self) -> &VectorDocument {
        &self.document
    }

    /// Drop background paths and advance to [`Filtered`].
    pub fn filter(self) -> Filtered {
        let foreground = filter_document(&self.document);
        tracing::debug!(
            before = self.document.len(),
            after = foreground.len(),
            "filtered background paths"
        );
        Filtered {
            config: self.config,
            document: self.document,
            foreground,
            raster: self.raster,
        }
    }
}

// ───────────────────────── Stage 5: Filtered ─────────────────────────

/// Pipeline state after foreground filtering.
#[must_use = "pipeline stages are consumed by advancing; call .assemble() to continue"]
pub struct Filtered {
    config: PipelineConfig,
    document: VectorDocument,
    foreground: VectorDocument,
    raster: Option<RasterOutcome>,
}

impl Filtered {
    /// Foreground paths only.
    #[must_use]
    pub const fn foreground(&self) -> &VectorDocument {
        &self.foreground
    }

    /// Build geometry, assemble the solid, and advance to [`Assembled`].
    pub fn assemble(self) -> Assembled {
        let solid = solid_from_foreground(&self.foreground, &self.config.model);
        Assembled {
            config: self.config,
            document: self.document,
            foreground: self.foreground,
            solid,
            raster: self.raster,
        }
    }
}

// ───────────────────────── Stage 6: Assembled ────────────────────────

/// Pipeline state after assembly, the final stage.
#[must_use = "call .into_result() to extract the ProcessResult"]
pub struct Assembled {
    config: PipelineConfig,
    document: VectorDocument,
    foreground: VectorDocument,
    solid: SolidBuild,
    raster: Option<RasterOutcome>,
}

impl Assembled {
    /// The assembled solid.
    #[must_use]
    pub const fn solid(&self) -> &SolidBuild {
        &self.solid
    }

    /// The config this run used.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Consume the pipeline and return the [`ProcessResult`].
    #[must_use]
    pub fn into_result(self) -> ProcessResult {
        ProcessResult {
            document: self.document,
            foreground: self.foreground,
            solid: self.solid,
            raster: self.raster,
        }
    }
}

// ──────────────────────────── PipelineStage ──────────────────────────

/// Total number of stages in the pipeline.
pub const STAGE_COUNT: usize = 7;

/// Trait implemented by every pipeline stage.
pub trait PipelineStage {
    /// Human-readable name of this stage (e.g. `"source"`, `"trace"`).
    const NAME: &str;

    /// Zero-based index of this stage (`0` for Pending through `6` for
    /// Assembled).
    const INDEX: usize;

    /// Stage-specific metrics for diagnostics.
    ///
    /// Returns `None` for the initial [`Pending`] stage which has not
    /// yet performed any processing.
    fn metrics(&self) -> Option<StageMetrics>;
}

/// A stage that has done work and can always report metrics.
pub trait MeasuredStage: PipelineStage {
    /// Metrics for the work this stage performed.
    fn measure(&self) -> StageMetrics;
}

impl PipelineStage for Pending {
    const NAME: &str = "source";
    const INDEX: usize = 0;

    fn metrics(&self) -> Option<StageMetrics> {
        None
    }
}

impl PipelineStage for Decoded {
    const NAME: &str = "decode";
    const INDEX: usize = 1;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.measure())
    }
}

impl MeasuredStage for Decoded {
    fn measure(&self) -> StageMetrics {
        StageMetrics::Decode {
            input_bytes: self.source_len,
            width: self.raster.width(),
            height: self.raster.height(),
            pixel_count: u64::from(self.raster.width()) * u64::from(self.raster.height()),
        }
    }
}

impl PipelineStage for Binarized {
    const NAME: &str = "binarize";
    const INDEX: usize = 2;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.measure())
    }
}

impl MeasuredStage for Binarized {
    fn measure(&self) -> StageMetrics {
        let algorithm = match self.binary.threshold {
            ThresholdUsed::Manual(_) => "manual".to_string(),
            _ => self.config.threshold.algorithm.to_string(),
        };
        StageMetrics::Binarize {
            algorithm,
            threshold: self.binary.threshold.value(),
            black_pixels: self.balance.black,
            white_pixels: self.balance.white,
        }
    }
}

impl PipelineStage for Normalized {
    const NAME: &str = "normalize";
    const INDEX: usize = 3;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.measure())
    }
}

impl MeasuredStage for Normalized {
    fn measure(&self) -> StageMetrics {
        StageMetrics::Normalize {
            inverted: self.outcome.inverted,
            black_pixels: PixelBalance::of(&self.raster).black,
        }
    }
}

impl PipelineStage for Traced {
    const NAME: &str = "trace";
    const INDEX: usize = 4;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.measure())
    }
}

impl MeasuredStage for Traced {
    fn measure(&self) -> StageMetrics {
        let subpaths = self.document.paths.iter().flat_map(|p| &p.subpaths);
        StageMetrics::Trace {
            path_count: self.document.len(),
            subpath_count: subpaths.clone().count(),
            segment_count: subpaths.map(|s| s.segments.len()).sum(),
        }
    }
}

impl PipelineStage for Filtered {
    const NAME: &str = "filter";
    const INDEX: usize = 5;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.measure())
    }
}

impl MeasuredStage for Filtered {
    fn measure(&self) -> StageMetrics {
        StageMetrics::Filter {
            paths_before: self.document.len(),
            paths_after: self.foreground.len(),
        }
    }
}

impl PipelineStage for Assembled {
    const NAME: &str = "assemble";
    const INDEX: usize = 6;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.measure())
    }
}

impl MeasuredStage for Assembled {
    fn measure(&self) -> StageMetrics {
        let bbox = self.solid.bounding_box;
        StageMetrics::Assemble {
            bbox_width: bbox.map_or(0.0, |b| b.width()),
            bbox_height: bbox.map_or(0.0, |b| b.height()),
            scale_factor: self.solid.placement.map(|p| p.scale),
            extrusion_count: self.solid.assembly.extrusions.len(),
            triangle_count: self.solid.triangle_count,
        }
    }
}
