//! Vector representation of a traced design.
//!
//! A [`VectorDocument`] is an ordered list of [`VectorPath`]s. Each path
//! has one fill color and one or more implicitly closed [`SubPath`]s
//! (an outline plus its holes, in whatever order the tracer emitted
//! them). Sub-paths are built from line and Bézier [`Segment`]s and are
//! flattened into polygons on demand.

use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, PipelineError, Point};

/// An opaque RGB fill color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Pure black.
    pub const BLACK: Self = Self::new(0, 0, 0);
    /// Pure white.
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Create a color from channel values.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Mean of the three channels, normalized to `[0, 1]`.
    #[must_use]
    pub fn brightness(self) -> f64 {
        (f64::from(self.r) + f64::from(self.g) + f64::from(self.b)) / (3.0 * 255.0)
    }
}

/// One drawing command, continuing from the previous end point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Segment {
    /// Straight line to `to`.
    Line {
        /// End point.
        to: Point,
    },
    /// Quadratic Bézier curve.
    Quad {
        /// Control point.
        ctrl: Point,
        /// End point.
        to: Point,
    },
    /// Cubic Bézier curve.
    Cubic {
        /// First control point.
        ctrl1: Point,
        /// Second control point.
        ctrl2: Point,
        /// End point.
        to: Point,
    },
}

impl Segment {
    /// End point of the segment.
    #[must_use]
    pub const fn end(&self) -> Point {
        match *self {
            Self::Line { to } | Self::Quad { to, .. } | Self::Cubic { to, .. } => to,
        }
    }
}

/// A closed outline: a start point and the segments that follow it.
///
/// The outline is closed implicitly from the last end point back to
/// `start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubPath {
    /// First point of the outline.
    pub start: Point,
    /// Segments in drawing order.
    pub segments: Vec<Segment>,
}

impl SubPath {
    /// A closed polygon through `points` using straight lines only.
    ///
    /// Returns `None` if `points` is empty.
    #[must_use]
    pub fn polygon(points: &[Point]) -> Option<Self> {
        let (&start, rest) = points.split_first()?;
        Some(Self {
            start,
            segments: rest.iter().map(|&to| Segment::Line { to }).collect(),
        })
    }

    /// Flatten the outline into a polygon.
    ///
    /// Each curve is replaced by `curve_segments` straight facets
    /// (minimum 1). Consecutive duplicate points are dropped, as is a
    /// trailing point equal to `start`.
    #[must_use]
    pub fn flatten(&self, curve_segments: u32) -> Vec<Point> {
        let steps = curve_segments.max(1);
        let mut points = vec![self.start];
        let mut current = self.start;

        for segment in &self.segments {
            match *segment {
                Segment::Line { to } => push_distinct(&mut points, to),
                Segment::Quad { ctrl, to } => {
                    for i in 1..=steps {
                        let t = f64::from(i) / f64::from(steps);
                        push_distinct(&mut points, quad_at(current, ctrl, to, t));
                    }
                }
                Segment::Cubic { ctrl1, ctrl2, to } => {
                    for i in 1..=steps {
                        let t = f64::from(i) / f64::from(steps);
                        push_distinct(&mut points, cubic_at(current, ctrl1, ctrl2, to, t));
                    }
                }
            }
            current = segment.end();
        }

        if points.len() > 1 && points.last() == Some(&self.start) {
            points.pop();
        }
        points
    }

    /// Apply `f` to every point (start, controls and end points).
    pub fn map_points(&mut self, f: impl Fn(Point) -> Point) {
        self.start = f(self.start);
        for segment in &mut self.segments {
            *segment = match *segment {
                Segment::Line { to } => Segment::Line { to: f(to) },
                Segment::Quad { ctrl, to } => Segment::Quad {
                    ctrl: f(ctrl),
                    to: f(to),
                },
                Segment::Cubic { ctrl1, ctrl2, to } => Segment::Cubic {
                    ctrl1: f(ctrl1),
                    ctrl2: f(ctrl2),
                    to: f(to),
                },
            };
        }
    }
}

fn push_distinct(points: &mut Vec<Point>, p: Point) {
    if points.last() != Some(&p) {
        points.push(p);
    }
}

fn quad_at(p0: Point, p1: Point, p2: Point, t: f64) -> Point {
    let u = 1.0 - t;
    Point::new(
        u * u * p0.x + 2.0 * u * t * p1.x + t * t * p2.x,
        u * u * p0.y + 2.0 * u * t * p1.y + t * t * p2.y,
    )
}

fn cubic_at(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let u = 1.0 - t;
    let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
    Point::new(
        a * p0.x + b * p1.x + c * p2.x + d * p3.x,
        a * p0.y + b * p1.y + c * p2.y + d * p3.y,
    )
}

/// One traced shape: closed sub-paths sharing a fill color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPath {
    /// Outlines making up the shape.
    pub subpaths: Vec<SubPath>,
    /// Fill color reported by the tracer.
    pub fill: Rgb,
}

impl VectorPath {
    /// Flatten every sub-path, dropping any with fewer than 3 points.
    #[must_use]
    pub fn rings(&self, curve_segments: u32) -> Vec<Vec<Point>> {
        self.subpaths
            .iter()
            .map(|s| s.flatten(curve_segments))
            .filter(|ring| ring.len() >= 3)
            .collect()
    }
}

/// An ordered set of traced paths plus the size of the source raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorDocument {
    /// Size of the raster the paths were traced from, in pixels.
    pub dimensions: Dimensions,
    /// Paths in rendering order.
    pub paths: Vec<VectorPath>,
}

impl VectorDocument {
    /// An empty document for a raster of the given size.
    #[must_use]
    pub const fn empty(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            paths: Vec::new(),
        }
    }

    /// Number of paths.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns `true` if the document has no paths.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Remove and return the path at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::PathIndex`] if `index` is out of range.
    pub fn remove_path_at(&mut self, index: usize) -> Result<VectorPath, PipelineError> {
        if index >= self.paths.len() {
            return Err(PipelineError::PathIndex {
                index,
                len: self.paths.len(),
            });
        }
        Ok(self.paths.remove(index))
    }
}
