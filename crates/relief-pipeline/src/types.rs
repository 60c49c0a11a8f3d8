//! Shared types for the relief pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can reference raster data
/// without depending on `image` directly.
pub use image::RgbaImage;

/// Millimetres per inch. Target footprints are specified in inches,
/// every emitted coordinate is in millimetres.
pub const MM_PER_INCH: f64 = 25.4;

/// A 2D point in image coordinates (or model millimetres once scaled).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position (pixels from top edge in image space).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Midpoint between `self` and `other`.
    #[must_use]
    pub fn midpoint(self, other: Self) -> Self {
        Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count (`width * height`).
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Selects how the luminance cut is chosen during binarization.
///
/// Serialized as the strings the remote backend accepts:
/// `otsu`, `median-otsu`, `adaptive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThresholdAlgorithm {
    /// Global Otsu threshold over the luminance histogram.
    #[default]
    Otsu,
    /// 3x3 median filter, then global Otsu.
    MedianOtsu,
    /// Gaussian-weighted local mean threshold.
    Adaptive,
}

impl ThresholdAlgorithm {
    /// Wire name of the algorithm.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Otsu => "otsu",
            Self::MedianOtsu => "median-otsu",
            Self::Adaptive => "adaptive",
        }
    }
}

impl fmt::Display for ThresholdAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binarization and tracing parameters.
///
/// Defaults match the form defaults of the remote vectorization backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Which thresholding algorithm to run.
    pub algorithm: ThresholdAlgorithm,

    /// Fixed luminance cut in `[0, 255]`. When present it replaces the
    /// computed cut; median-otsu still filters first.
    pub manual_value: Option<f64>,

    /// Minimum feature area (pixels) kept by the tracer.
    pub turd_size: u32,

    /// Corner smoothing threshold. Vertices turning less than
    /// `alpha_max * 60` degrees are rounded into curves.
    pub alpha_max: f64,

    /// Whether traced outlines are simplified before curve fitting.
    pub optimize_curves: bool,

    /// Simplification tolerance in pixels (used when `optimize_curves`).
    pub optimize_tolerance: f64,
}

impl ThresholdConfig {
    /// Default [`turd_size`](Self::turd_size).
    pub const DEFAULT_TURD_SIZE: u32 = 2;
    /// Default [`alpha_max`](Self::alpha_max).
    pub const DEFAULT_ALPHA_MAX: f64 = 1.0;
    /// Default [`optimize_tolerance`](Self::optimize_tolerance).
    pub const DEFAULT_OPTIMIZE_TOLERANCE: f64 = 0.2;
    /// Luminance cut reported to the backend when no manual value is set.
    pub const DEFAULT_MANUAL_CUT: f64 = 128.0;

    /// Check every field, rejecting (never clamping) invalid values.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the first invalid
    /// field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if let Some(value) = self.manual_value
            && !(0.0..=255.0).contains(&value)
        {
            return Err(PipelineError::InvalidConfig(format!(
                "manual_value must be within [0, 255], got {value}"
            )));
        }
        if !self.alpha_max.is_finite() || self.alpha_max < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "alpha_max must be finite and non-negative, got {}",
                self.alpha_max
            )));
        }
        if !self.optimize_tolerance.is_finite() || self.optimize_tolerance < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "optimize_tolerance must be finite and non-negative, got {}",
                self.optimize_tolerance
            )));
        }
        Ok(())
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            algorithm: ThresholdAlgorithm::default(),
            manual_value: None,
            turd_size: Self::DEFAULT_TURD_SIZE,
            alpha_max: Self::DEFAULT_ALPHA_MAX,
            optimize_curves: true,
            optimize_tolerance: Self::DEFAULT_OPTIMIZE_TOLERANCE,
        }
    }
}

/// Physical size of the printed model.
///
/// `target_width` and `target_length` are inches; `extrusion_depth` and
/// `base_thickness` are millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelDimensions {
    /// Footprint width (X) in inches.
    pub target_width: f64,
    /// Footprint length (Y) in inches.
    pub target_length: f64,
    /// Height of the design above the base plate, in millimetres.
    pub extrusion_depth: f64,
    /// Height of the base plate, in millimetres.
    pub base_thickness: f64,
    /// Straight facets used to approximate each curve segment.
    pub curve_segments: u32,
}

impl ModelDimensions {
    /// Default [`target_width`](Self::target_width) in inches.
    pub const DEFAULT_TARGET_WIDTH: f64 = 4.0;
    /// Default [`target_length`](Self::target_length) in inches.
    pub const DEFAULT_TARGET_LENGTH: f64 = 4.0;
    /// Default [`extrusion_depth`](Self::extrusion_depth) in millimetres.
    pub const DEFAULT_EXTRUSION_DEPTH: f64 = 3.0;
    /// Default [`base_thickness`](Self::base_thickness) in millimetres.
    pub const DEFAULT_BASE_THICKNESS: f64 = 3.0;
    /// Default [`curve_segments`](Self::curve_segments).
    pub const DEFAULT_CURVE_SEGMENTS: u32 = 12;

    /// Footprint width in millimetres.
    #[must_use]
    pub fn target_width_mm(&self) -> f64 {
        self.target_width * MM_PER_INCH
    }

    /// Footprint length in millimetres.
    #[must_use]
    pub fn target_length_mm(&self) -> f64 {
        self.target_length * MM_PER_INCH
    }

    /// Check that every field is strictly positive and finite.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the first invalid
    /// field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let lengths = [
            ("target_width", self.target_width),
            ("target_length", self.target_length),
            ("extrusion_depth", self.extrusion_depth),
            ("base_thickness", self.base_thickness),
        ];
        for (name, value) in lengths {
            if !value.is_finite() || value <= 0.0 {
                return Err(PipelineError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.curve_segments == 0 {
            return Err(PipelineError::InvalidConfig(
                "curve_segments must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ModelDimensions {
    fn default() -> Self {
        Self {
            target_width: Self::DEFAULT_TARGET_WIDTH,
            target_length: Self::DEFAULT_TARGET_LENGTH,
            extrusion_depth: Self::DEFAULT_EXTRUSION_DEPTH,
            base_thickness: Self::DEFAULT_BASE_THICKNESS,
            curve_segments: Self::DEFAULT_CURVE_SEGMENTS,
        }
    }
}

/// Full configuration for one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Binarization and tracing parameters.
    pub threshold: ThresholdConfig,
    /// Physical model dimensions.
    pub model: ModelDimensions,
}

impl PipelineConfig {
    /// Validate both halves of the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for the first invalid
    /// field found.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.threshold.validate()?;
        self.model.validate()
    }
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// A path index did not address an existing path.
    #[error("path index {index} out of range for document with {len} paths")]
    PathIndex {
        /// The requested index.
        index: usize,
        /// Number of paths in the document.
        len: usize,
    },

    /// An SVG document could not be imported.
    #[error("failed to import SVG: {0}")]
    SvgImport(String),

    /// A history snapshot could not be written or read back.
    #[error("history snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn point_midpoint() {
        let m = Point::new(0.0, 2.0).midpoint(Point::new(4.0, 6.0));
        assert_eq!(m, Point::new(2.0, 4.0));
    }

    #[test]
    fn algorithm_wire_names() {
        assert_eq!(ThresholdAlgorithm::Otsu.to_string(), "otsu");
        assert_eq!(ThresholdAlgorithm::MedianOtsu.to_string(), "median-otsu");
        assert_eq!(ThresholdAlgorithm::Adaptive.to_string(), "adaptive");
        let json = serde_json::to_string(&ThresholdAlgorithm::MedianOtsu).unwrap();
        assert_eq!(json, "\"median-otsu\"");
        let parsed: ThresholdAlgorithm = serde_json::from_str("\"adaptive\"").unwrap();
        assert_eq!(parsed, ThresholdAlgorithm::Adaptive);
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let parsed = serde_json::from_str::<ThresholdAlgorithm>("\"sauvola\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn threshold_defaults_match_backend_form() {
        let config = ThresholdConfig::default();
        assert_eq!(config.algorithm, ThresholdAlgorithm::Otsu);
        assert!(config.manual_value.is_none());
        assert_eq!(config.turd_size, 2);
        assert!((config.alpha_max - 1.0).abs() < f64::EPSILON);
        assert!(config.optimize_curves);
        assert!((config.optimize_tolerance - 0.2).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn manual_value_out_of_range_rejected() {
        for bad in [-1.0, 255.5, f64::NAN] {
            let config = ThresholdConfig {
                manual_value: Some(bad),
                ..ThresholdConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(PipelineError::InvalidConfig(_))),
                "expected {bad} to be rejected",
            );
        }
    }

    #[test]
    fn manual_value_bounds_accepted() {
        for ok in [0.0, 255.0] {
            let config = ThresholdConfig {
                manual_value: Some(ok),
                ..ThresholdConfig::default()
            };
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn model_dimensions_reject_non_positive() {
        let cases = [
            ModelDimensions {
                target_width: 0.0,
                ..ModelDimensions::default()
            },
            ModelDimensions {
                target_length: -2.0,
                ..ModelDimensions::default()
            },
            ModelDimensions {
                extrusion_depth: f64::INFINITY,
                ..ModelDimensions::default()
            },
            ModelDimensions {
                base_thickness: 0.0,
                ..ModelDimensions::default()
            },
            ModelDimensions {
                curve_segments: 0,
                ..ModelDimensions::default()
            },
        ];
        for dims in cases {
            assert!(
                matches!(dims.validate(), Err(PipelineError::InvalidConfig(_))),
                "expected {dims:?} to be rejected",
            );
        }
    }

    #[test]
    fn model_dimensions_convert_inches() {
        let dims = ModelDimensions {
            target_width: 4.0,
            target_length: 5.0,
            ..ModelDimensions::default()
        };
        assert!((dims.target_width_mm() - 101.6).abs() < 1e-9);
        assert!((dims.target_length_mm() - 127.0).abs() < 1e-9);
    }

    #[test]
    fn pipeline_config_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"threshold":{"algorithm":"adaptive"},"model":{"target_width":6.0}}"#)
                .unwrap();
        assert_eq!(config.threshold.algorithm, ThresholdAlgorithm::Adaptive);
        assert_eq!(config.threshold.turd_size, 2);
        assert!((config.model.target_width - 6.0).abs() < f64::EPSILON);
        assert_eq!(config.model.curve_segments, 12);
    }

    #[test]
    fn error_display() {
        let err = PipelineError::PathIndex { index: 3, len: 2 };
        assert_eq!(
            err.to_string(),
            "path index 3 out of range for document with 2 paths",
        );
        assert_eq!(
            PipelineError::EmptyInput.to_string(),
            "input image data is empty"
        );
    }
}
