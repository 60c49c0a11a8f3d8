//! SVG export serializer.
//!
//! Converts a [`VectorDocument`] into an SVG string using the [`svg`]
//! crate for document construction, XML escaping, and path data
//! formatting.
//!
//! Each [`VectorPath`] becomes one filled `<path>` element. Sub-paths
//! are emitted as separate closed `M ... Z` runs inside the same `d`
//! attribute with `fill-rule="evenodd"`, so holes stay holes. The
//! `viewBox` matches the source raster's pixel grid.
//!
//! The output can be read back with
//! [`import_svg`](relief_pipeline::import_svg).
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Element, Path, Title};
use svg::node::{Node, Text, Value};

use relief_pipeline::{Rgb, Segment, SubPath, VectorDocument, VectorPath};

/// Metadata to embed in the SVG document.
///
/// All fields are optional. When present, a `<title>`, `<desc>` and/or
/// `<metadata>` element is emitted before the paths.
///
/// Text values are XML-escaped automatically by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title: emitted as `<title>`.
    ///
    /// Typically the source image filename (without extension).
    pub title: Option<&'a str>,

    /// Document description: emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Pipeline configuration JSON: emitted inside `<metadata>` wrapped
    /// in a namespaced `<relief:pipeline>` element.
    pub config_json: Option<&'a str>,
}

/// Format a fill color as `#rrggbb`.
#[must_use]
pub fn fill_hex(fill: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", fill.r, fill.g, fill.b)
}

fn append_subpath(mut data: Data, subpath: &SubPath) -> Data {
    data = data.move_to((subpath.start.x, subpath.start.y));
    for segment in &subpath.segments {
        data = match *segment {
            Segment::Line { to } => data.line_to((to.x, to.y)),
            Segment::Quad { ctrl, to } => data.quadratic_curve_to((ctrl.x, ctrl.y, to.x, to.y)),
            Segment::Cubic { ctrl1, ctrl2, to } => {
                data.cubic_curve_to((ctrl1.x, ctrl1.y, ctrl2.x, ctrl2.y, to.x, to.y))
            }
        };
    }
    data.close()
}

/// Build an SVG path `d` attribute string for every sub-path of `path`.
///
/// Returns an empty string for a path with no sub-paths.
///
/// # Examples
///
/// ```
/// use relief_pipeline::{Point, Rgb, SubPath, VectorPath};
/// use relief_export::build_path_data;
///
/// let triangle = SubPath::polygon(&[
///     Point::new(0.0, 0.0),
///     Point::new(4.0, 0.0),
///     Point::new(0.0, 3.0),
/// ])
/// .unwrap();
/// let path = VectorPath { subpaths: vec![triangle], fill: Rgb::BLACK };
/// assert_eq!(build_path_data(&path), "M0,0 L4,0 L0,3 z");
/// ```
#[must_use]
pub fn build_path_data(path: &VectorPath) -> String {
    if path.subpaths.is_empty() {
        return String::new();
    }
    let data = path.subpaths.iter().fold(Data::new(), append_subpath);
    String::from(Value::from(data))
}

/// Serialize a vector document into an SVG string.
///
/// Paths with no sub-paths are skipped.
///
/// # Examples
///
/// ```
/// use relief_pipeline::{Dimensions, VectorDocument};
/// use relief_export::{SvgMetadata, to_svg};
///
/// let doc = VectorDocument::empty(Dimensions { width: 800, height: 600 });
/// let metadata = SvgMetadata {
///     title: Some("logo"),
///     ..SvgMetadata::default()
/// };
/// let svg = to_svg(&doc, &metadata);
/// assert!(svg.contains("<title>logo</title>"));
/// assert!(svg.contains(r#"viewBox="0 0 800 600""#));
/// ```
#[must_use]
pub fn to_svg(document: &VectorDocument, metadata: &SvgMetadata<'_>) -> String {
    let w = document.dimensions.width;
    let h = document.dimensions.height;
    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0, 0, w, h));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if let Some(config_json) = metadata.config_json {
        let mut pipeline_el = Element::new("relief:pipeline");
        pipeline_el.assign("xmlns:relief", "urn:relief:pipeline");
        pipeline_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(pipeline_el);
        doc = doc.add(metadata_el);
    }

    for path in &document.paths {
        let d = build_path_data(path);
        if d.is_empty() {
            continue;
        }
        doc = doc.add(
            Path::new()
                .set("d", d)
                .set("fill", fill_hex(path.fill))
                .set("fill-rule", "evenodd"),
        );
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use relief_pipeline::{Dimensions, Point, import_svg};

    use super::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    fn square(origin: f64, size: f64) -> SubPath {
        SubPath::polygon(&[
            Point::new(origin, origin),
            Point::new(origin + size, origin),
            Point::new(origin + size, origin + size),
            Point::new(origin, origin + size),
        ])
        .unwrap()
    }

    fn document(paths: Vec<VectorPath>) -> VectorDocument {
        VectorDocument {
            dimensions: dims(100, 80),
            paths,
        }
    }

    #[test]
    fn empty_document_produces_valid_svg_with_no_paths() {
        let svg = to_svg(&document(vec![]), &SvgMetadata::default());
        assert!(svg.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(svg.contains(r#"viewBox="0 0 100 80""#));
        assert!(!svg.contains("<path"));
        assert!(!svg.contains("<title"));
    }

    #[test]
    fn holes_share_one_path_element() {
        let path = VectorPath {
            subpaths: vec![square(0.0, 10.0), square(3.0, 4.0)],
            fill: Rgb::BLACK,
        };
        let svg = to_svg(&document(vec![path]), &SvgMetadata::default());
        assert_eq!(svg.matches("<path").count(), 1);
        assert_eq!(svg.matches('z').count(), 2);
        assert!(svg.contains(r##"fill="#000000""##));
        assert!(svg.contains(r#"fill-rule="evenodd""#));
    }

    #[test]
    fn curves_use_curve_commands() {
        let subpath = SubPath {
            start: Point::new(0.0, 0.0),
            segments: vec![
                Segment::Quad {
                    ctrl: Point::new(5.0, 0.0),
                    to: Point::new(5.0, 5.0),
                },
                Segment::Cubic {
                    ctrl1: Point::new(5.0, 8.0),
                    ctrl2: Point::new(2.0, 8.0),
                    to: Point::new(0.0, 5.0),
                },
            ],
        };
        let d = build_path_data(&VectorPath {
            subpaths: vec![subpath],
            fill: Rgb::BLACK,
        });
        assert_eq!(d, "M0,0 Q5,0,5,5 C5,8,2,8,0,5 z");
    }

    #[test]
    fn fill_hex_formats_channels() {
        assert_eq!(fill_hex(Rgb::new(255, 16, 0)), "#ff1000");
    }

    #[test]
    fn metadata_is_escaped() {
        let metadata = SvgMetadata {
            title: Some("a & b"),
            description: Some("<tuned>"),
            config_json: Some(r#"{"k":"v"}"#),
        };
        let svg = to_svg(&document(vec![]), &metadata);
        assert!(svg.contains("<title>a &amp; b</title>"));
        assert!(svg.contains("&lt;tuned&gt;"));
        assert!(svg.contains("<relief:pipeline"));
    }

    #[test]
    fn export_reads_back() {
        let doc = document(vec![
            VectorPath {
                subpaths: vec![square(0.0, 10.0), square(3.0, 4.0)],
                fill: Rgb::BLACK,
            },
            VectorPath {
                subpaths: vec![square(20.0, 5.0)],
                fill: Rgb::WHITE,
            },
        ]);
        let svg = to_svg(&doc, &SvgMetadata::default());
        let back = import_svg(&svg, doc.dimensions).unwrap();
        assert_eq!(back, doc);
    }
}
