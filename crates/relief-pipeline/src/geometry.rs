//! Geometry builder: fit foreground paths to the target footprint and
//! extrude them.
//!
//! 1. Flatten every path and compute one bounding box across all of
//!    them.
//! 2. Derive a uniform scale so the box fits inside the target
//!    footprint.
//! 3. Move every ring into model space: centre on the origin, scale
//!    (mirroring Y, since images are y-down), and raise by the base
//!    thickness.
//! 4. Extrude each path into a closed prism: ear-clipped caps plus one
//!    wall quad per ring edge.
//!
//! The transform is applied to the 2D rings before extrusion. All three
//! steps are affine in XY plus a Z offset, so the resulting mesh is the
//! same as extruding first and transforming afterwards.

use std::fmt;

use geo::algorithm::orient::{Direction, Orient};
use geo::{Contains, Coord, Intersects, LineString, Polygon, TriangulateEarcut};
use serde::{Deserialize, Serialize};

use crate::mesh::Mesh;
use crate::types::{ModelDimensions, Point};
use crate::vector::VectorPath;

/// Axis-aligned bounding box in source (pixel) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum X.
    pub min_x: f64,
    /// Minimum Y.
    pub min_y: f64,
    /// Maximum X.
    pub max_x: f64,
    /// Maximum Y.
    pub max_y: f64,
}

impl BoundingBox {
    /// Horizontal extent.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Vertical extent.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// `(min_x + width / 2, min_y + height / 2)`.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(
            self.min_x + self.width() / 2.0,
            self.min_y + self.height() / 2.0,
        )
    }

    /// `true` if the box has zero (or non-finite) width or height.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        let (w, h) = (self.width(), self.height());
        !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0)
    }
}

/// Joint bounding box of every flattened point of every path.
///
/// Returns `None` if the paths contain no points.
#[must_use]
pub fn bounding_box(paths: &[VectorPath], curve_segments: u32) -> Option<BoundingBox> {
    paths
        .iter()
        .flat_map(|path| &path.subpaths)
        .flat_map(|subpath| subpath.flatten(curve_segments))
        .fold(None, |acc: Option<BoundingBox>, p| {
            Some(acc.map_or(
                BoundingBox {
                    min_x: p.x,
                    min_y: p.y,
                    max_x: p.x,
                    max_y: p.y,
                },
                |b| BoundingBox {
                    min_x: b.min_x.min(p.x),
                    min_y: b.min_y.min(p.y),
                    max_x: b.max_x.max(p.x),
                    max_y: b.max_y.max(p.y),
                },
            ))
        })
}

/// Largest uniform scale that fits `bbox` inside `target_width` by
/// `target_length` (same units as the result).
#[must_use]
pub fn scale_factor(bbox: &BoundingBox, target_width: f64, target_length: f64) -> f64 {
    (target_width / bbox.width()).min(target_length / bbox.height())
}

/// Source-to-model transform for one build.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Bounding box centre, in source coordinates.
    pub center: Point,
    /// Uniform scale factor (millimetres per source unit).
    pub scale: f64,
}

impl Placement {
    /// Translate by `-center`, then scale by `(s, -s)`.
    #[must_use]
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            (p.x - self.center.x) * self.scale,
            -(p.y - self.center.y) * self.scale,
        )
    }
}

/// Non-fatal geometry conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryWarning {
    /// No foreground points, or a bounding box with zero width or height.
    NoGeometry,
}

impl fmt::Display for GeometryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoGeometry => f.write_str("no geometry to extrude"),
        }
    }
}

/// Result of [`build_geometry`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryOutput {
    /// One mesh per path that produced any triangles.
    pub meshes: Vec<Mesh>,
    /// Joint bounding box, when one exists.
    pub bounding_box: Option<BoundingBox>,
    /// Transform applied to every ring, when geometry exists.
    pub placement: Option<Placement>,
    /// Total triangle count across `meshes`.
    pub triangle_count: usize,
    /// Set when nothing could be extruded.
    pub warning: Option<GeometryWarning>,
}

/// Fit `paths` to `dimensions` and extrude them.
///
/// Extrusions occupy `[base_thickness, base_thickness + extrusion_depth]`
/// along Z, centred on the origin in XY.
#[must_use = "returns the extruded meshes"]
pub fn build_geometry(paths: &[VectorPath], dimensions: &ModelDimensions) -> GeometryOutput {
    let bbox = bounding_box(paths, dimensions.curve_segments);
    let Some(bbox) = bbox.filter(|b| !b.is_degenerate()) else {
        tracing::warn!(paths = paths.len(), ?bbox, "no geometry to extrude");
        return GeometryOutput {
            bounding_box: bbox,
            warning: Some(GeometryWarning::NoGeometry),
            ..GeometryOutput::default()
        };
    };

    let placement = Placement {
        center: bbox.center(),
        scale: scale_factor(
            &bbox,
            dimensions.target_width_mm(),
            dimensions.target_length_mm(),
        ),
    };
    let z0 = dimensions.base_thickness;
    let z1 = z0 + dimensions.extrusion_depth;

    let meshes: Vec<Mesh> = paths
        .iter()
        .map(|path| {
            let rings: Vec<Vec<Point>> = path
                .rings(dimensions.curve_segments)
                .into_iter()
                .map(|ring| ring.into_iter().map(|p| placement.apply(p)).collect())
                .collect();
            let mut mesh = Mesh::new();
            for polygon in classify_rings(&rings) {
                extrude_polygon(&polygon, z0, z1, &mut mesh);
            }
            mesh
        })
        .filter(|mesh| !mesh.is_empty())
        .collect();

    let triangle_count = meshes.iter().map(Mesh::triangle_count).sum();
    tracing::debug!(
        meshes = meshes.len(),
        triangle_count,
        scale = placement.scale,
        "extruded foreground paths"
    );

    GeometryOutput {
        meshes,
        bounding_box: Some(bbox),
        placement: Some(placement),
        triangle_count,
        warning: None,
    }
}

fn to_line_string(ring: &[Point]) -> LineString<f64> {
    ring.iter().map(|p| Coord { x: p.x, y: p.y }).collect()
}

/// Group rings into polygons by containment depth.
///
/// A ring inside an even number of other rings is an outline; one inside
/// an odd number is a hole of its innermost enclosing outline.
fn classify_rings(rings: &[Vec<Point>]) -> Vec<Polygon<f64>> {
    let shapes: Vec<Polygon<f64>> = rings
        .iter()
        .map(|ring| Polygon::new(to_line_string(ring), vec![]))
        .collect();

    let containers: Vec<Vec<usize>> = rings
        .iter()
        .enumerate()
        .map(|(i, ring)| {
            (0..shapes.len())
                .filter(|&j| j != i && ring_inside(ring, &shapes[j]))
                .collect()
        })
        .collect();
    let depth = |i: usize| containers[i].len();

    let mut holes: Vec<Vec<LineString<f64>>> = vec![Vec::new(); rings.len()];
    for i in (0..rings.len()).filter(|&i| depth(i) % 2 == 1) {
        let parent = containers[i]
            .iter()
            .copied()
            .find(|&j| depth(j) + 1 == depth(i));
        if let Some(parent) = parent {
            holes[parent].push(to_line_string(&rings[i]));
        }
    }

    (0..rings.len())
        .filter(|&i| depth(i) % 2 == 0)
        .map(|i| {
            let interiors = std::mem::take(&mut holes[i]);
            Polygon::new(to_line_string(&rings[i]), interiors).orient(Direction::Default)
        })
        .collect()
}

/// Whether `ring` lies inside `shape`, judged at the first vertex of
/// `ring` that is not on the boundary of `shape`.
fn ring_inside(ring: &[Point], shape: &Polygon<f64>) -> bool {
    ring.iter()
        .map(|p| geo::Point::new(p.x, p.y))
        .find(|p| !shape.exterior().intersects(p))
        .is_some_and(|p| shape.contains(&p))
}

/// Append a prism over `polygon` spanning `z0..z1` to `mesh`.
fn extrude_polygon(polygon: &Polygon<f64>, z0: f64, z1: f64, mesh: &mut Mesh) {
    let raw = polygon.earcut_triangles_raw();
    let vertex = |i: usize| (raw.vertices[2 * i], raw.vertices[2 * i + 1]);

    let bottom = mesh.positions.len();
    let count = raw.vertices.len() / 2;
    for i in 0..count {
        let (x, y) = vertex(i);
        mesh.push_vertex([x, y, z0]);
    }
    let top = mesh.positions.len();
    for i in 0..count {
        let (x, y) = vertex(i);
        mesh.push_vertex([x, y, z1]);
    }

    for tri in raw.triangle_indices.chunks_exact(3) {
        let (a, mut b, mut c) = (tri[0], tri[1], tri[2]);
        let ((ax, ay), (bx, by), (cx, cy)) = (vertex(a), vertex(b), vertex(c));
        let signed = (bx - ax).mul_add(cy - ay, -((by - ay) * (cx - ax)));
        if signed == 0.0 {
            continue;
        }
        if signed < 0.0 {
            std::mem::swap(&mut b, &mut c);
        }
        mesh.push_triangle(top + a, top + b, top + c);
        mesh.push_triangle(bottom + a, bottom + c, bottom + b);
    }

    // Exterior is counter-clockwise and holes clockwise, so every wall
    // faces away from the material.
    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
        for line in ring.lines() {
            if line.start == line.end {
                continue;
            }
            let a0 = mesh.push_vertex([line.start.x, line.start.y, z0]);
            let b0 = mesh.push_vertex([line.end.x, line.end.y, z0]);
            let b1 = mesh.push_vertex([line.end.x, line.end.y, z1]);
            let a1 = mesh.push_vertex([line.start.x, line.start.y, z1]);
            mesh.push_triangle(a0, b0, b1);
            mesh.push_triangle(a0, b1, a1);
        }
    }
}
