//! Per-stage timings and counts for one raster-to-solid run.
//!
//! Filled in by [`process_with_diagnostics`](crate::process_with_diagnostics).
//! Clock readings come from `web-time`. Durations serialize as
//! fractional seconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::geometry::GeometryWarning;

/// `Duration` <-> seconds as `f64`.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "stage duration must be a finite, non-negative number of seconds",
            )
        })
    }
}

/// Timings and metrics for every stage of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: image decoding.
    pub decode: StageDiagnostics,
    /// Stage 2: binarization.
    pub binarize: StageDiagnostics,
    /// Stage 3: foreground polarity normalization.
    pub normalize: StageDiagnostics,
    /// Stage 4: path tracing.
    pub trace: StageDiagnostics,
    /// Stage 5: foreground path filtering.
    pub filter: StageDiagnostics,
    /// Stage 6: geometry building and scene assembly.
    pub assemble: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Timing and metrics of one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// What the stage produced.
    pub metrics: StageMetrics,
}

/// Counts reported by each stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Decoded raster.
    Decode {
        /// Encoded input length.
        input_bytes: usize,
        /// Raster width in pixels.
        width: u32,
        /// Raster height in pixels.
        height: u32,
        /// `width * height`.
        pixel_count: u64,
    },
    /// Binarization metrics.
    Binarize {
        /// Algorithm wire name, or `"manual"`.
        algorithm: String,
        /// Representative luminance cut.
        threshold: f64,
        /// Black pixels in the output.
        black_pixels: u64,
        /// White pixels in the output.
        white_pixels: u64,
    },
    /// Foreground normalization metrics.
    Normalize {
        /// Whether the raster was inverted.
        inverted: bool,
        /// Black pixels after normalization.
        black_pixels: u64,
    },
    /// Path tracing metrics.
    Trace {
        /// Number of traced paths.
        path_count: usize,
        /// Number of sub-paths across all paths.
        subpath_count: usize,
        /// Number of segments across all sub-paths.
        segment_count: usize,
    },
    /// Foreground filter metrics.
    Filter {
        /// Paths before filtering.
        paths_before: usize,
        /// Paths kept as foreground.
        paths_after: usize,
    },
    /// Geometry and assembly metrics.
    Assemble {
        /// Bounding box width in source pixels (0 when absent).
        bbox_width: f64,
        /// Bounding box height in source pixels (0 when absent).
        bbox_height: f64,
        /// Uniform scale factor in mm per pixel, when geometry exists.
        scale_factor: Option<f64>,
        /// Number of extrusion meshes.
        extrusion_count: usize,
        /// Triangles across the extrusions.
        triangle_count: usize,
    },
}

/// Whole-run counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Raster width in pixels.
    pub image_width: u32,
    /// Raster height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Number of foreground paths extruded.
    pub foreground_paths: usize,
    /// Triangles in the whole assembly, base plate included.
    pub total_triangles: usize,
    /// Non-fatal geometry condition, if any.
    pub warning: Option<GeometryWarning>,
}

impl PipelineDiagnostics {
    /// Render a plain-text table of stage timings.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Relief Pipeline Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Decode", &self.decode),
            ("Binarize", &self.binarize),
            ("Normalize", &self.normalize),
            ("Trace", &self.trace),
            ("Filter", &self.filter),
            ("Assemble", &self.assemble),
        ];

        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Foreground paths: {}  |  Triangles: {}",
            self.summary.foreground_paths, self.summary.total_triangles,
        ));
        if let Some(warning) = self.summary.warning {
            lines.push(format!("Warning: {warning}"));
        }

        lines.join("\n")
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// One-line summary of a stage's metrics.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Binarize {
            algorithm,
            threshold,
            black_pixels,
            white_pixels,
        } => format!("{algorithm} t={threshold:.1} black={black_pixels} white={white_pixels}"),
        StageMetrics::Normalize {
            inverted,
            black_pixels,
        } => {
            let action = if *inverted { "inverted" } else { "kept" };
            format!("{action}, black={black_pixels}")
        }
        StageMetrics::Trace {
            path_count,
            subpath_count,
            segment_count,
        } => format!("{path_count} paths, {subpath_count} rings, {segment_count} segments"),
        StageMetrics::Filter {
            paths_before,
            paths_after,
        } => format!("{paths_before} -> {paths_after} paths"),
        StageMetrics::Assemble {
            bbox_width,
            bbox_height,
            scale_factor,
            extrusion_count,
            triangle_count,
        } => {
            let scale = scale_factor.map_or_else(|| "-".to_string(), |s| format!("{s:.4}"));
            format!(
                "bbox={bbox_width:.1}x{bbox_height:.1}px scale={scale}mm/px meshes={extrusion_count} tris={triangle_count}",
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(ms: u64, metrics: StageMetrics) -> StageDiagnostics {
        StageDiagnostics {
            duration: Duration::from_millis(ms),
            metrics,
        }
    }

    fn sample(warning: Option<GeometryWarning>) -> PipelineDiagnostics {
        PipelineDiagnostics {
            decode: stage(
                10,
                StageMetrics::Decode {
                    input_bytes: 1000,
                    width: 100,
                    height: 100,
                    pixel_count: 10000,
                },
            ),
            binarize: stage(
                5,
                StageMetrics::Binarize {
                    algorithm: "otsu".to_string(),
                    threshold: 127.0,
                    black_pixels: 2000,
                    white_pixels: 8000,
                },
            ),
            normalize: stage(
                1,
                StageMetrics::Normalize {
                    inverted: false,
                    black_pixels: 2000,
                },
            ),
            trace: stage(
                20,
                StageMetrics::Trace {
                    path_count: 3,
                    subpath_count: 4,
                    segment_count: 80,
                },
            ),
            filter: stage(
                0,
                StageMetrics::Filter {
                    paths_before: 3,
                    paths_after: 3,
                },
            ),
            assemble: stage(
                4,
                StageMetrics::Assemble {
                    bbox_width: 50.0,
                    bbox_height: 40.0,
                    scale_factor: Some(2.032),
                    extrusion_count: 3,
                    triangle_count: 600,
                },
            ),
            total_duration: Duration::from_millis(40),
            summary: PipelineSummary {
                image_width: 100,
                image_height: 100,
                pixel_count: 10000,
                foreground_paths: 3,
                total_triangles: 612,
                warning,
            },
        }
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        assert!((duration_ms(d) - 1234.0).abs() < 0.01);
    }

    #[test]
    fn report_lists_every_stage() {
        let report = sample(None).report();
        assert!(report.contains("Relief Pipeline Report"));
        for name in ["Decode", "Binarize", "Normalize", "Trace", "Filter", "Assemble"] {
            assert!(report.contains(name), "missing {name}");
        }
        assert!(report.contains("otsu t=127.0"));
        assert!(report.contains("Triangles: 612"));
        assert!(!report.contains("Warning"));
    }

    #[test]
    fn report_mentions_warning() {
        let report = sample(Some(GeometryWarning::NoGeometry)).report();
        assert!(report.contains("Warning: no geometry to extrude"));
    }

    #[test]
    fn missing_scale_renders_dash() {
        let details = format_metrics(&StageMetrics::Assemble {
            bbox_width: 0.0,
            bbox_height: 0.0,
            scale_factor: None,
            extrusion_count: 0,
            triangle_count: 0,
        });
        assert!(details.contains("scale=-mm/px"));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn json_round_trip_keeps_durations() {
        let diag = sample(None);
        let json = serde_json::to_string(&diag).unwrap();
        let back: PipelineDiagnostics = serde_json::from_str(&json).unwrap();
        let drift = back.total_duration.as_secs_f64() - diag.total_duration.as_secs_f64();
        assert!(drift.abs() < 1e-9);
        assert_eq!(back.trace.metrics, diag.trace.metrics);
    }
}
