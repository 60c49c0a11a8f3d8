//! Scene assembly: base plate, extrusions, and final orientation.
//!
//! The base plate spans exactly the target footprint, centred on the
//! origin, and occupies `[0, base_thickness]` along Z. Extrusions from
//! [`build_geometry`](crate::geometry::build_geometry) already sit on
//! top of it. The whole group is then rotated -90 degrees about X so the
//! extrusion axis points up (+Y) and the model lies flat:
//! `(x, y, z) -> (x, z, -y)`.

use serde::{Deserialize, Serialize};

use crate::filter::filter_document;
use crate::geometry::{BoundingBox, GeometryWarning, Placement, build_geometry};
use crate::mesh::{Bounds3, Mesh};
use crate::types::ModelDimensions;
use crate::vector::VectorDocument;

/// The finished, print-ready solid.
///
/// Every mesh carries its final transform; no further placement is
/// needed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolidAssembly {
    /// One mesh per extruded foreground path.
    pub extrusions: Vec<Mesh>,
    /// The base plate.
    pub base_plate: Mesh,
}

impl SolidAssembly {
    /// Every mesh, base plate first.
    pub fn meshes(&self) -> impl Iterator<Item = &Mesh> {
        std::iter::once(&self.base_plate).chain(&self.extrusions)
    }

    /// Total triangle count across every mesh.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.meshes().map(Mesh::triangle_count).sum()
    }

    /// Bounds of the whole assembly.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds3> {
        self.meshes()
            .filter_map(Mesh::bounds)
            .reduce(Bounds3::union)
    }
}

/// Rotate a point -90 degrees about the X axis.
#[must_use]
pub const fn lay_flat([x, y, z]: [f64; 3]) -> [f64; 3] {
    [x, z, -y]
}

/// Build the base plate for `dimensions`, before rotation.
#[must_use]
pub fn base_plate(dimensions: &ModelDimensions) -> Mesh {
    let half_w = dimensions.target_width_mm() / 2.0;
    let half_l = dimensions.target_length_mm() / 2.0;
    Mesh::cuboid(
        [-half_w, -half_l, 0.0],
        [half_w, half_l, dimensions.base_thickness],
    )
}

/// Add the base plate to `extrusions` and lay the group flat.
#[must_use = "returns the assembled solid"]
pub fn assemble(extrusions: Vec<Mesh>, dimensions: &ModelDimensions) -> SolidAssembly {
    let mut assembly = SolidAssembly {
        extrusions,
        base_plate: base_plate(dimensions),
    };
    assembly.base_plate.map_positions(lay_flat);
    for mesh in &mut assembly.extrusions {
        mesh.map_positions(lay_flat);
    }
    assembly
}

/// An assembled solid together with how it was fitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolidBuild {
    /// The print-ready meshes.
    pub assembly: SolidAssembly,
    /// Joint bounding box of the foreground, in source pixels.
    pub bounding_box: Option<BoundingBox>,
    /// Centre and scale used to fit the foreground to the footprint.
    pub placement: Option<Placement>,
    /// Triangles across the extrusions (base plate excluded).
    pub triangle_count: usize,
    /// Set when only the base plate could be built.
    pub warning: Option<GeometryWarning>,
}

/// Extrude already filtered paths and assemble the solid.
#[must_use = "returns the assembled solid"]
pub fn solid_from_foreground(
    foreground: &VectorDocument,
    dimensions: &ModelDimensions,
) -> SolidBuild {
    let geometry = build_geometry(&foreground.paths, dimensions);
    SolidBuild {
        assembly: assemble(geometry.meshes, dimensions),
        bounding_box: geometry.bounding_box,
        placement: geometry.placement,
        triangle_count: geometry.triangle_count,
        warning: geometry.warning,
    }
}

/// Filter `document` down to its foreground and build the solid.
///
/// Never fails: an empty or degenerate foreground yields the base plate
/// alone with [`GeometryWarning::NoGeometry`].
#[must_use = "returns the assembled solid"]
pub fn build_solid(document: &VectorDocument, dimensions: &ModelDimensions) -> SolidBuild {
    solid_from_foreground(&filter_document(document), dimensions)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Dimensions, Point};
    use crate::vector::{Rgb, SubPath, VectorPath};

    fn dims(width: f64, length: f64, depth: f64, base: f64) -> ModelDimensions {
        ModelDimensions {
            target_width: width,
            target_length: length,
            extrusion_depth: depth,
            base_thickness: base,
            curve_segments: 4,
        }
    }

    #[test]
    fn lay_flat_maps_z_to_up() {
        assert_eq!(lay_flat([1.0, 2.0, 3.0]), [1.0, 3.0, -2.0]);
    }

    #[test]
    fn base_plate_only_for_no_extrusions() {
        let assembly = assemble(Vec::new(), &dims(4.0, 5.0, 3.0, 3.0));
        assert!(assembly.extrusions.is_empty());
        assert_eq!(assembly.base_plate.triangle_count(), 12);

        let bounds = assembly.bounds().unwrap();
        let [x, y, z] = bounds.size();
        assert!((x - 101.6).abs() < 1e-9);
        assert!((y - 3.0).abs() < 1e-9);
        assert!((z - 127.0).abs() < 1e-9);
        // Lies on the print bed, centred in the bed plane.
        assert!(bounds.min[1].abs() < 1e-9);
        assert!((bounds.min[0] + 50.8).abs() < 1e-9);
        assert!((bounds.min[2] + 63.5).abs() < 1e-9);
    }

    #[test]
    fn extrusions_are_rotated_with_the_plate() {
        let d = dims(4.0, 4.0, 2.0, 3.0);
        let extrusion = Mesh::cuboid([-1.0, -1.0, 3.0], [1.0, 1.0, 5.0]);
        let assembly = assemble(vec![extrusion], &d);
        let bounds = assembly.extrusions[0].bounds().unwrap();
        assert!((bounds.min[1] - 3.0).abs() < 1e-9);
        assert!((bounds.max[1] - 5.0).abs() < 1e-9);
        assert_eq!(assembly.triangle_count(), 24);
    }

    fn square(fill: Rgb, origin: f64, size: f64) -> VectorPath {
        let corners = [
            Point::new(origin, origin),
            Point::new(origin + size, origin),
            Point::new(origin + size, origin + size),
            Point::new(origin, origin + size),
        ];
        VectorPath {
            subpaths: SubPath::polygon(&corners).into_iter().collect(),
            fill,
        }
    }

    #[test]
    fn build_solid_ignores_background_paths() {
        let document = VectorDocument {
            dimensions: Dimensions {
                width: 100,
                height: 100,
            },
            paths: vec![
                square(Rgb::WHITE, 0.0, 100.0),
                square(Rgb::BLACK, 20.0, 10.0),
            ],
        };
        let solid = build_solid(&document, &ModelDimensions::default());
        assert_eq!(solid.assembly.extrusions.len(), 1);
        let bbox = solid.bounding_box.unwrap();
        assert!((bbox.width() - 10.0).abs() < 1e-9);
        assert!((solid.placement.unwrap().scale - 10.16).abs() < 1e-9);
        assert!(solid.warning.is_none());
        assert_eq!(
            solid.assembly.triangle_count(),
            solid.triangle_count + 12
        );
    }

    #[test]
    fn build_solid_of_empty_document_is_base_plate() {
        let document = VectorDocument::empty(Dimensions {
            width: 10,
            height: 10,
        });
        let solid = build_solid(&document, &dims(4.0, 5.0, 3.0, 3.0));
        assert_eq!(solid.warning, Some(GeometryWarning::NoGeometry));
        assert!(solid.assembly.extrusions.is_empty());
        assert_eq!(solid.triangle_count, 0);
        assert_eq!(solid.assembly.triangle_count(), 12);
    }
}
