//! relief-export: Pure format serializers (sans-IO)
//!
//! Converts pipeline output into files. The assembled solid goes to STL
//! (binary or ASCII); the traced vector document goes to SVG.

pub mod stl;
pub mod svg;

pub use stl::{DEFAULT_HEADER, StlError, to_ascii_stl, to_stl, write_stl};
pub use svg::{SvgMetadata, build_path_data, to_svg};
