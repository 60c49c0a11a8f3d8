//! Indexed triangle meshes.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounds of a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds3 {
    /// Minimum corner.
    pub min: [f64; 3],
    /// Maximum corner.
    pub max: [f64; 3],
}

impl Bounds3 {
    /// Extent along each axis.
    #[must_use]
    pub fn size(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Smallest bounds containing both `self` and `other`.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            min: [
                self.min[0].min(other.min[0]),
                self.min[1].min(other.min[1]),
                self.min[2].min(other.min[2]),
            ],
            max: [
                self.max[0].max(other.max[0]),
                self.max[1].max(other.max[1]),
                self.max[2].max(other.max[2]),
            ],
        }
    }
}

/// A triangle mesh with shared vertex positions.
///
/// Triangles are wound counter-clockwise when viewed from outside the
/// solid, so the right-hand normal points outward.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Vertex positions in millimetres.
    pub positions: Vec<[f64; 3]>,
    /// Vertex indices, three per triangle.
    pub triangles: Vec<[usize; 3]>,
}

impl Mesh {
    /// An empty mesh.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            positions: Vec::new(),
            triangles: Vec::new(),
        }
    }

    /// An axis-aligned box spanning `min` to `max` (8 vertices, 12 triangles).
    #[must_use]
    pub fn cuboid(min: [f64; 3], max: [f64; 3]) -> Self {
        // Vertex i takes max on axis k iff bit k of i is set.
        let positions = (0..8)
            .map(|i| {
                [
                    if i & 1 == 0 { min[0] } else { max[0] },
                    if i & 2 == 0 { min[1] } else { max[1] },
                    if i & 4 == 0 { min[2] } else { max[2] },
                ]
            })
            .collect();
        let triangles = vec![
            [0, 2, 1],
            [1, 2, 3],
            [4, 5, 6],
            [5, 7, 6],
            [0, 1, 5],
            [0, 5, 4],
            [2, 7, 3],
            [2, 6, 7],
            [0, 4, 6],
            [0, 6, 2],
            [1, 3, 7],
            [1, 7, 5],
        ];
        Self {
            positions,
            triangles,
        }
    }

    /// Number of triangles.
    #[must_use]
    pub const fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Returns `true` if the mesh has no triangles.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Append a vertex and return its index.
    pub fn push_vertex(&mut self, position: [f64; 3]) -> usize {
        self.positions.push(position);
        self.positions.len() - 1
    }

    /// Append a triangle by vertex indices.
    pub fn push_triangle(&mut self, a: usize, b: usize, c: usize) {
        self.triangles.push([a, b, c]);
    }

    /// Apply `f` to every vertex position.
    pub fn map_positions(&mut self, f: impl Fn([f64; 3]) -> [f64; 3]) {
        for p in &mut self.positions {
            *p = f(*p);
        }
    }

    /// Corner positions of every triangle.
    pub fn triangle_positions(&self) -> impl Iterator<Item = [[f64; 3]; 3]> + '_ {
        self.triangles
            .iter()
            .map(|t| [self.positions[t[0]], self.positions[t[1]], self.positions[t[2]]])
    }

    /// Axis-aligned bounds of all vertices, or `None` for an empty mesh.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds3> {
        let (first, rest) = self.positions.split_first()?;
        Some(rest.iter().fold(
            Bounds3 {
                min: *first,
                max: *first,
            },
            |b, p| b.union(Bounds3 { min: *p, max: *p }),
        ))
    }
}

/// Unit normal of a triangle by the right-hand rule, or zero if degenerate.
#[must_use]
pub fn triangle_normal([a, b, c]: [[f64; 3]; 3]) -> [f64; 3] {
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [
        u[1].mul_add(v[2], -(u[2] * v[1])),
        u[2].mul_add(v[0], -(u[0] * v[2])),
        u[0].mul_add(v[1], -(u[1] * v[0])),
    ];
    let len = n[0].mul_add(n[0], n[1].mul_add(n[1], n[2] * n[2])).sqrt();
    if len == 0.0 {
        [0.0; 3]
    } else {
        [n[0] / len, n[1] / len, n[2] / len]
    }
}
