//! STL export serializer.
//!
//! Writes every mesh of a [`SolidAssembly`] into one STL solid, base
//! plate first.
//!
//! # Binary Format
//!
//! ```text
//! UINT8[80]    – Header (zero padded, never starts with "solid")
//! UINT32       – Number of triangles
//! foreach triangle
//!     REAL32[3] – Unit normal (right-hand rule)
//!     REAL32[3] – Vertex 1
//!     REAL32[3] – Vertex 2
//!     REAL32[3] – Vertex 3
//!     UINT16    – Attribute byte count (0)
//! end
//! ```
//!
//! All numbers are little-endian. Coordinates are millimetres.

use std::fmt::Write as _;
use std::io::Write;

use relief_pipeline::SolidAssembly;
use relief_pipeline::mesh::triangle_normal;

/// Binary STL header size in bytes.
pub const HEADER_SIZE: usize = 80;

/// Size of one triangle record in binary STL.
pub const TRIANGLE_SIZE: usize = 50;

/// Default header text.
pub const DEFAULT_HEADER: &str = "relief binary STL";

/// Errors from STL serialization.
#[derive(Debug, thiserror::Error)]
pub enum StlError {
    /// Binary STL counts triangles in a `u32`.
    #[error("too many triangles for binary STL: {0}")]
    TooManyTriangles(usize),

    /// The header must fit in 80 bytes and must not start with `solid`.
    #[error("invalid STL header: {0}")]
    InvalidHeader(String),

    /// The writer failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serialize `assembly` as binary STL into a byte vector.
///
/// # Errors
///
/// Returns [`StlError::InvalidHeader`] for a header longer than 80 bytes
/// or starting with `solid`, and [`StlError::TooManyTriangles`] if the
/// triangle count exceeds `u32::MAX`.
pub fn to_stl(assembly: &SolidAssembly, header: &str) -> Result<Vec<u8>, StlError> {
    let mut out = Vec::with_capacity(HEADER_SIZE + 4 + assembly.triangle_count() * TRIANGLE_SIZE);
    write_stl(assembly, header, &mut out)?;
    Ok(out)
}

/// Serialize `assembly` as binary STL into `writer`.
///
/// # Errors
///
/// Same as [`to_stl`], plus [`StlError::Io`] if `writer` fails.
pub fn write_stl<W: Write>(
    assembly: &SolidAssembly,
    header: &str,
    mut writer: W,
) -> Result<(), StlError> {
    let header = stl_header(header)?;
    let total = assembly.triangle_count();
    let count = u32::try_from(total).map_err(|_| StlError::TooManyTriangles(total))?;

    writer.write_all(&header)?;
    writer.write_all(&count.to_le_bytes())?;

    for triangle in assembly.meshes().flat_map(|mesh| mesh.triangle_positions()) {
        write_vector(&mut writer, triangle_normal(triangle))?;
        for vertex in triangle {
            write_vector(&mut writer, vertex)?;
        }
        writer.write_all(&0u16.to_le_bytes())?;
    }

    Ok(())
}

fn stl_header(text: &str) -> Result<[u8; HEADER_SIZE], StlError> {
    let bytes = text.as_bytes();
    if bytes.len() > HEADER_SIZE {
        return Err(StlError::InvalidHeader(format!(
            "{} bytes exceeds {HEADER_SIZE}",
            bytes.len()
        )));
    }
    if bytes.trim_ascii_start().starts_with(b"solid") {
        return Err(StlError::InvalidHeader(
            "binary header must not start with \"solid\"".to_string(),
        ));
    }
    let mut header = [0u8; HEADER_SIZE];
    header[..bytes.len()].copy_from_slice(bytes);
    Ok(header)
}

/// Write a vector as 3 little-endian `f32`s.
fn write_vector<W: Write>(writer: &mut W, v: [f64; 3]) -> std::io::Result<()> {
    for component in v {
        #[allow(clippy::cast_possible_truncation)]
        let component = component as f32;
        writer.write_all(&component.to_le_bytes())?;
    }
    Ok(())
}

/// Serialize `assembly` as ASCII STL.
#[must_use]
pub fn to_ascii_stl(assembly: &SolidAssembly, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "solid {name}");

    for triangle in assembly.meshes().flat_map(|mesh| mesh.triangle_positions()) {
        let [nx, ny, nz] = triangle_normal(triangle);
        let _ = writeln!(out, "  facet normal {nx:.6e} {ny:.6e} {nz:.6e}");
        let _ = writeln!(out, "    outer loop");
        for [x, y, z] in triangle {
            let _ = writeln!(out, "      vertex {x:.6e} {y:.6e} {z:.6e}");
        }
        let _ = writeln!(out, "    endloop");
        let _ = writeln!(out, "  endfacet");
    }

    let _ = writeln!(out, "endsolid {name}");
    out
}
