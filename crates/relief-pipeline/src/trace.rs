//! Path tracing: turn a binary raster into closed, filled vector paths.
//!
//! This module defines the [`PathTracer`] trait for pluggable tracing
//! engines and the [`TracerKind`] enum for selecting the built-in one.
//!
//! # Strategy pattern
//!
//! The remote backend and the built-in engine produce different geometry
//! from the same raster. Both sit behind [`PathTracer`] so the rest of
//! the pipeline never cares which one ran.
//!
//! # Built-in engine
//!
//! [`TracerKind::BorderFollowing`] runs Suzuki-Abe border following
//! (`imageproc::contours::find_contours`) over the dark pixels, groups
//! every outer border with its direct holes, drops speckles, simplifies
//! each ring and rounds gentle corners into quadratic curves.
//!
//! Border pixels are found by their centres. Each ring is then moved
//! half a pixel away from the dark pixels so it runs along their outer
//! edges: outer borders grow and hole borders shrink. A one pixel
//! stroke therefore keeps a one pixel wall instead of collapsing onto
//! its own hole.

use imageproc::contours::{BorderType, Contour};
use serde::{Deserialize, Serialize};

use crate::decode::to_luma;
use crate::simplify::{remove_collinear, simplify_ring};
use crate::types::{Dimensions, PipelineError, Point, RgbaImage, ThresholdConfig};
use crate::vector::{Rgb, Segment, SubPath, VectorDocument, VectorPath};

/// Pixels darker than this are foreground.
const FOREGROUND_CUTOFF: u8 = 128;

/// Degrees of corner threshold per unit of `alpha_max`.
const DEGREES_PER_ALPHA: f64 = 60.0;

/// Distance from a border pixel's centre to its outer edge.
const HALF_PIXEL: f64 = 0.5;

/// Longest allowed miter, as a multiple of the offset distance.
const MITER_LIMIT: f64 = 2.0;

/// Tracer-facing subset of [`ThresholdConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceParams {
    /// Rings enclosing fewer pixels than this are dropped.
    pub turd_size: u32,
    /// Corner smoothing threshold (see [`corner_threshold_degrees`](Self::corner_threshold_degrees)).
    pub alpha_max: f64,
    /// Whether rings are simplified with RDP.
    pub optimize_curves: bool,
    /// RDP tolerance in pixels.
    pub optimize_tolerance: f64,
}

impl TraceParams {
    /// Vertices turning by less than this many degrees are smoothed.
    #[must_use]
    pub fn corner_threshold_degrees(&self) -> f64 {
        self.alpha_max * DEGREES_PER_ALPHA
    }
}

impl From<&ThresholdConfig> for TraceParams {
    fn from(config: &ThresholdConfig) -> Self {
        Self {
            turd_size: config.turd_size,
            alpha_max: config.alpha_max,
            optimize_curves: config.optimize_curves,
            optimize_tolerance: config.optimize_tolerance,
        }
    }
}

impl Default for TraceParams {
    fn default() -> Self {
        Self::from(&ThresholdConfig::default())
    }
}

/// Trait for path tracing engines.
///
/// Input: a binarized raster (black design on white).
/// Output: a document of closed, filled paths in pixel coordinates.
pub trait PathTracer {
    /// Trace `raster` into vector paths.
    ///
    /// # Errors
    ///
    /// Engine-specific; the built-in engine never fails.
    fn trace(&self, raster: &RgbaImage, params: &TraceParams)
    -> Result<VectorDocument, PipelineError>;
}

/// Selects which built-in tracing engine to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TracerKind {
    /// Suzuki-Abe border following via `imageproc::contours::find_contours`.
    #[default]
    BorderFollowing,
}

impl PathTracer for TracerKind {
    fn trace(
        &self,
        raster: &RgbaImage,
        params: &TraceParams,
    ) -> Result<VectorDocument, PipelineError> {
        match *self {
            Self::BorderFollowing => Ok(trace_border_following(raster, params)),
        }
    }
}

fn trace_border_following(raster: &RgbaImage, params: &TraceParams) -> VectorDocument {
    let mut mask = to_luma(raster);
    for pixel in mask.pixels_mut() {
        pixel.0[0] = if pixel.0[0] < FOREGROUND_CUTOFF { 255 } else { 0 };
    }

    let contours: Vec<Contour<u32>> = imageproc::contours::find_contours(&mask);
    let rings: Vec<Option<Vec<Point>>> = contours
        .iter()
        .map(|c| prepare_ring(c, params).and_then(|ring| to_pixel_edges(&ring, c.border_type)))
        .collect();

    let threshold = params.corner_threshold_degrees();
    let mut paths = Vec::new();
    for (i, contour) in contours.iter().enumerate() {
        if contour.border_type != BorderType::Outer {
            continue;
        }
        let Some(outer) = &rings[i] else {
            continue;
        };

        let mut subpaths = vec![smooth_ring(outer, threshold)];
        subpaths.extend(
            contours
                .iter()
                .zip(&rings)
                .filter(|(c, _)| c.border_type == BorderType::Hole && c.parent == Some(i))
                .filter_map(|(_, ring)| ring.as_deref())
                .map(|ring| smooth_ring(ring, threshold)),
        );
        paths.push(VectorPath {
            subpaths,
            fill: Rgb::BLACK,
        });
    }

    tracing::debug!(
        contours = contours.len(),
        paths = paths.len(),
        "border following complete"
    );

    VectorDocument {
        dimensions: Dimensions {
            width: raster.width(),
            height: raster.height(),
        },
        paths,
    }
}

/// Convert, filter and simplify one contour. `None` means dropped.
fn prepare_ring(contour: &Contour<u32>, params: &TraceParams) -> Option<Vec<Point>> {
    let points: Vec<Point> = contour
        .points
        .iter()
        .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
        .collect();
    if points.len() < 3 || ring_area(&points) < f64::from(params.turd_size) {
        return None;
    }

    let mut ring = remove_collinear(&points);
    if params.optimize_curves {
        ring = simplify_ring(&ring, params.optimize_tolerance);
    }
    (ring.len() >= 3).then_some(ring)
}

/// Absolute shoelace area of a closed ring.
pub(crate) fn ring_area(ring: &[Point]) -> f64 {
    signed_area(ring).abs()
}

/// Shoelace area, positive when the ring turns from +x towards +y.
fn signed_area(ring: &[Point]) -> f64 {
    let n = ring.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            a.x.mul_add(b.y, -(b.x * a.y))
        })
        .sum();
    twice / 2.0
}

/// Move a pixel-centre ring onto the edges of its border pixels.
///
/// `None` when a hole ring closes up entirely.
fn to_pixel_edges(ring: &[Point], border: BorderType) -> Option<Vec<Point>> {
    let distance = match border {
        BorderType::Outer => HALF_PIXEL,
        BorderType::Hole => -HALF_PIXEL,
    };
    let moved = offset_ring(ring, distance);
    let before = signed_area(ring);
    let after = signed_area(&moved);
    (after != 0.0 && after.signum() == before.signum()).then_some(moved)
}

/// Push every edge of `ring` away from its interior by `distance`
/// (towards it when negative), mitering the vertices.
fn offset_ring(ring: &[Point], distance: f64) -> Vec<Point> {
    let n = ring.len();
    let turn = signed_area(ring).signum();
    // Unit normal of the edge a -> b pointing out of the ring.
    let normal = |a: Point, b: Point| {
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let len = dx.hypot(dy);
        if len == 0.0 {
            (0.0, 0.0)
        } else {
            (turn * dy / len, -turn * dx / len)
        }
    };

    (0..n)
        .map(|i| {
            let prev = ring[(i + n - 1) % n];
            let vertex = ring[i];
            let next = ring[(i + 1) % n];
            let (ax, ay) = normal(prev, vertex);
            let (bx, by) = normal(vertex, next);

            let k = ax.mul_add(bx, ay * by) + 1.0;
            let (mut mx, mut my) = if k > f64::EPSILON {
                ((ax + bx) / k, (ay + by) / k)
            } else {
                (ax, ay)
            };
            let length = mx.hypot(my);
            if length > MITER_LIMIT {
                mx *= MITER_LIMIT / length;
                my *= MITER_LIMIT / length;
            }
            Point::new(mx.mul_add(distance, vertex.x), my.mul_add(distance, vertex.y))
        })
        .collect()
}

/// Turning angle at `p` in degrees, in `[0, 180]`.
fn turning_angle(prev: Point, p: Point, next: Point) -> f64 {
    let (ax, ay) = (p.x - prev.x, p.y - prev.y);
    let (bx, by) = (next.x - p.x, next.y - p.y);
    let cross = ax.mul_add(by, -(ay * bx));
    let dot = ax.mul_add(bx, ay * by);
    cross.abs().atan2(dot).to_degrees()
}

/// Build a sub-path through the edge midpoints of `ring`.
///
/// Smooth vertices become quadratic curves with the vertex as control
/// point; corners are kept as two straight lines meeting at the vertex.
fn smooth_ring(ring: &[Point], threshold_degrees: f64) -> SubPath {
    let n = ring.len();
    let start = ring[n - 1].midpoint(ring[0]);
    let mut segments = Vec::with_capacity(n * 2);

    for i in 0..n {
        let prev = ring[(i + n - 1) % n];
        let vertex = ring[i];
        let next = ring[(i + 1) % n];
        let to = vertex.midpoint(next);

        if turning_angle(prev, vertex, next) < threshold_degrees {
            segments.push(Segment::Quad { ctrl: vertex, to });
        } else {
            segments.push(Segment::Line { to: vertex });
            segments.push(Segment::Line { to });
        }
    }

    SubPath { start, segments }
}
