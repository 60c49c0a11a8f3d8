//! Import an SVG document into a [`VectorDocument`].
//!
//! The remote vectorization backend answers with an SVG string. Every
//! `<path>` element becomes one [`VectorPath`]; its `d` attribute is
//! parsed with the `svg` crate and converted into absolute
//! [`Segment`]s. Elliptical arcs are approximated by their chord.
//!
//! Supported attributes:
//!
//! - `fill`: `#rgb`, `#rrggbb`, `black`, `white` (default black).
//!   Paths with `fill="none"` are skipped.
//! - `transform`: `translate(x[,y])`. Other transforms are rejected.

use svg::node::element::path::{Command, Data, Position};
use svg::node::element::tag;
use svg::parser::Event;

use crate::types::{Dimensions, PipelineError, Point};
use crate::vector::{Rgb, Segment, SubPath, VectorDocument, VectorPath};

/// Parse `content` and collect its `<path>` elements.
///
/// `dimensions` is the size of the raster the SVG was traced from.
///
/// # Errors
///
/// Returns [`PipelineError::SvgImport`] if the document or any path
/// data is malformed, or a path uses an unsupported fill or transform.
pub fn import_svg(content: &str, dimensions: Dimensions) -> Result<VectorDocument, PipelineError> {
    let parser = svg::read(content).map_err(|e| PipelineError::SvgImport(e.to_string()))?;

    let mut paths = Vec::new();
    for event in parser {
        match event {
            Event::Error(e) => return Err(PipelineError::SvgImport(e.to_string())),
            Event::Tag(tag::Path, tag::Type::Start | tag::Type::Empty, attributes) => {
                let fill = match attributes.get("fill") {
                    Some(value) if value.trim() == "none" => continue,
                    Some(value) => parse_fill(value)?,
                    None => Rgb::BLACK,
                };
                let offset = attributes
                    .get("transform")
                    .map(|value| parse_translate(value))
                    .transpose()?
                    .unwrap_or(Point::new(0.0, 0.0));
                let Some(d) = attributes.get("d") else {
                    continue;
                };

                let data = Data::parse(d).map_err(|e| PipelineError::SvgImport(e.to_string()))?;
                let mut subpaths = convert_data(&data)?;
                if offset != Point::new(0.0, 0.0) {
                    for subpath in &mut subpaths {
                        subpath.map_points(|p| Point::new(p.x + offset.x, p.y + offset.y));
                    }
                }
                if !subpaths.is_empty() {
                    paths.push(VectorPath { subpaths, fill });
                }
            }
            _ => {}
        }
    }

    tracing::debug!(paths = paths.len(), "imported SVG");
    Ok(VectorDocument { dimensions, paths })
}

/// Parse a fill color.
fn parse_fill(value: &str) -> Result<Rgb, PipelineError> {
    let value = value.trim();
    match value.to_ascii_lowercase().as_str() {
        "black" => return Ok(Rgb::BLACK),
        "white" => return Ok(Rgb::WHITE),
        _ => {}
    }

    let unsupported = || PipelineError::SvgImport(format!("unsupported fill {value:?}"));
    let hex = value
        .strip_prefix('#')
        .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
        .ok_or_else(unsupported)?;
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .ok_or_else(unsupported)
    };

    match hex.len() {
        3 => {
            let expand = |i: usize| channel(i..i + 1).map(|c| c * 17);
            Ok(Rgb::new(expand(0)?, expand(1)?, expand(2)?))
        }
        6 => Ok(Rgb::new(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        _ => Err(unsupported()),
    }
}

/// Parse `translate(x)`, `translate(x,y)` or `translate(x y)`.
fn parse_translate(value: &str) -> Result<Point, PipelineError> {
    let unsupported = || PipelineError::SvgImport(format!("unsupported transform {value:?}"));
    let inner = value
        .trim()
        .strip_prefix("translate")
        .map(str::trim_start)
        .and_then(|s| s.strip_prefix('('))
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(unsupported)?;

    let numbers = inner
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| unsupported())?;

    match numbers.as_slice() {
        [x] => Ok(Point::new(*x, 0.0)),
        [x, y] => Ok(Point::new(*x, *y)),
        _ => Err(unsupported()),
    }
}

/// Tracks the pen while walking path commands.
#[derive(Default)]
struct Pen {
    current: Option<Point>,
    subpath: Option<SubPath>,
    /// Reflection source for `S`/`T`: last cubic or quadratic control.
    last_cubic_ctrl: Option<Point>,
    last_quad_ctrl: Option<Point>,
    done: Vec<SubPath>,
}

impl Pen {
    fn here(&self) -> Point {
        self.current.unwrap_or(Point::new(0.0, 0.0))
    }

    fn resolve(&self, position: Position, x: f64, y: f64) -> Point {
        match position {
            Position::Absolute => Point::new(x, y),
            Position::Relative => {
                let here = self.here();
                Point::new(here.x + x, here.y + y)
            }
        }
    }

    fn move_to(&mut self, p: Point) {
        self.finish();
        self.subpath = Some(SubPath {
            start: p,
            segments: Vec::new(),
        });
        self.current = Some(p);
    }

    fn push(&mut self, segment: Segment) {
        let here = self.here();
        let subpath = self.subpath.get_or_insert_with(|| SubPath {
            start: here,
            segments: Vec::new(),
        });
        subpath.segments.push(segment);
        self.current = Some(segment.end());
        self.last_cubic_ctrl = None;
        self.last_quad_ctrl = None;
    }

    fn close(&mut self) {
        if let Some(subpath) = &self.subpath {
            self.current = Some(subpath.start);
        }
        self.finish();
    }

    fn finish(&mut self) {
        if let Some(subpath) = self.subpath.take()
            && !subpath.segments.is_empty()
        {
            self.done.push(subpath);
        }
        self.last_cubic_ctrl = None;
        self.last_quad_ctrl = None;
    }

    fn reflect(&self, ctrl: Option<Point>) -> Point {
        let here = self.here();
        ctrl.map_or(here, |c| Point::new(2.0f64.mul_add(here.x, -c.x), 2.0f64.mul_add(here.y, -c.y)))
    }
}

fn arity_error(command: &str, expected: usize, got: usize) -> PipelineError {
    PipelineError::SvgImport(format!(
        "{command} expects a multiple of {expected} parameters, got {got}"
    ))
}

/// Split `params` into groups of `n`, rejecting leftovers.
fn groups<'a>(
    params: &'a [f32],
    n: usize,
    command: &str,
) -> Result<impl Iterator<Item = Vec<f64>> + 'a, PipelineError> {
    if params.is_empty() || params.len() % n != 0 {
        return Err(arity_error(command, n, params.len()));
    }
    Ok(params
        .chunks_exact(n)
        .map(|chunk| chunk.iter().copied().map(f64::from).collect()))
}

/// Convert parsed path data into absolute sub-paths.
fn convert_data(data: &Data) -> Result<Vec<SubPath>, PipelineError> {
    let mut pen = Pen::default();

    for command in data.iter() {
        match command {
            Command::Move(position, params) => {
                for (i, xy) in groups(params, 2, "M")?.enumerate() {
                    let p = pen.resolve(*position, xy[0], xy[1]);
                    if i == 0 {
                        pen.move_to(p);
                    } else {
                        pen.push(Segment::Line { to: p });
                    }
                }
            }
            Command::Line(position, params) => {
                for xy in groups(params, 2, "L")? {
                    let to = pen.resolve(*position, xy[0], xy[1]);
                    pen.push(Segment::Line { to });
                }
            }
            Command::HorizontalLine(position, params) => {
                for x in groups(params, 1, "H")? {
                    let here = pen.here();
                    let to = match position {
                        Position::Absolute => Point::new(x[0], here.y),
                        Position::Relative => Point::new(here.x + x[0], here.y),
                    };
                    pen.push(Segment::Line { to });
                }
            }
            Command::VerticalLine(position, params) => {
                for y in groups(params, 1, "V")? {
                    let here = pen.here();
                    let to = match position {
                        Position::Absolute => Point::new(here.x, y[0]),
                        Position::Relative => Point::new(here.x, here.y + y[0]),
                    };
                    pen.push(Segment::Line { to });
                }
            }
            Command::QuadraticCurve(position, params) => {
                for v in groups(params, 4, "Q")? {
                    let ctrl = pen.resolve(*position, v[0], v[1]);
                    let to = pen.resolve(*position, v[2], v[3]);
                    pen.push(Segment::Quad { ctrl, to });
                    pen.last_quad_ctrl = Some(ctrl);
                }
            }
            Command::SmoothQuadraticCurve(position, params) => {
                for v in groups(params, 2, "T")? {
                    let ctrl = pen.reflect(pen.last_quad_ctrl);
                    let to = pen.resolve(*position, v[0], v[1]);
                    pen.push(Segment::Quad { ctrl, to });
                    pen.last_quad_ctrl = Some(ctrl);
                }
            }
            Command::CubicCurve(position, params) => {
                for v in groups(params, 6, "C")? {
                    let ctrl1 = pen.resolve(*position, v[0], v[1]);
                    let ctrl2 = pen.resolve(*position, v[2], v[3]);
                    let to = pen.resolve(*position, v[4], v[5]);
                    pen.push(Segment::Cubic { ctrl1, ctrl2, to });
                    pen.last_cubic_ctrl = Some(ctrl2);
                }
            }
            Command::SmoothCubicCurve(position, params) => {
                for v in groups(params, 4, "S")? {
                    let ctrl1 = pen.reflect(pen.last_cubic_ctrl);
                    let ctrl2 = pen.resolve(*position, v[0], v[1]);
                    let to = pen.resolve(*position, v[2], v[3]);
                    pen.push(Segment::Cubic { ctrl1, ctrl2, to });
                    pen.last_cubic_ctrl = Some(ctrl2);
                }
            }
            Command::EllipticalArc(position, params) => {
                // rx ry rotation large-arc sweep x y
                for v in groups(params, 7, "A")? {
                    let to = pen.resolve(*position, v[5], v[6]);
                    pen.push(Segment::Line { to });
                }
            }
            Command::Close => pen.close(),
        }
    }

    pen.finish();
    Ok(pen.done)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const DIMS: Dimensions = Dimensions {
        width: 100,
        height: 80,
    };

    fn wrap(body: &str) -> String {
        format!(r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="80">{body}</svg>"#)
    }

    #[test]
    fn every_path_element_becomes_a_path() {
        let svg = wrap(
            r##"<path d="M0 0 L10 0 L10 10 Z" fill="#000000"/>
                <path d="M20 20 h5 v5 h-5 z" fill="#fff"/>"##,
        );
        let doc = import_svg(&svg, DIMS).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.dimensions, DIMS);
        assert_eq!(doc.paths[0].fill, Rgb::BLACK);
        assert_eq!(doc.paths[1].fill, Rgb::WHITE);

        let ring = doc.paths[1].subpaths[0].flatten(1);
        assert_eq!(
            ring,
            vec![
                Point::new(20.0, 20.0),
                Point::new(25.0, 20.0),
                Point::new(25.0, 25.0),
                Point::new(20.0, 25.0),
            ]
        );
    }

    #[test]
    fn multiple_subpaths_in_one_path() {
        let svg = wrap(r#"<path d="M0 0 L30 0 L30 30 L0 30 Z M10 10 L20 10 L20 20 Z"/>"#);
        let doc = import_svg(&svg, DIMS).unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.paths[0].subpaths.len(), 2);
        assert_eq!(doc.paths[0].subpaths[1].start, Point::new(10.0, 10.0));
    }

    #[test]
    fn fill_defaults_to_black_and_none_is_skipped() {
        let svg = wrap(
            r#"<path d="M0 0 L1 0 L1 1 Z"/>
               <path d="M0 0 L1 0 L1 1 Z" fill="none"/>"#,
        );
        let doc = import_svg(&svg, DIMS).unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.paths[0].fill, Rgb::BLACK);
    }

    #[test]
    fn translate_is_applied() {
        let svg = wrap(r#"<path d="M0 0 L4 0 L4 4 Z" transform="translate(10,20)"/>"#);
        let doc = import_svg(&svg, DIMS).unwrap();
        assert_eq!(doc.paths[0].subpaths[0].start, Point::new(10.0, 20.0));
        assert_eq!(
            doc.paths[0].subpaths[0].segments[0].end(),
            Point::new(14.0, 20.0)
        );
    }

    #[test]
    fn curves_are_absolute() {
        let svg = wrap(r#"<path d="M10 10 q5 -5 10 0 c0 5 -10 5 -10 0 Z"/>"#);
        let doc = import_svg(&svg, DIMS).unwrap();
        let segments = &doc.paths[0].subpaths[0].segments;
        assert_eq!(
            segments[0],
            Segment::Quad {
                ctrl: Point::new(15.0, 5.0),
                to: Point::new(20.0, 10.0),
            }
        );
        assert_eq!(
            segments[1],
            Segment::Cubic {
                ctrl1: Point::new(20.0, 15.0),
                ctrl2: Point::new(10.0, 15.0),
                to: Point::new(10.0, 10.0),
            }
        );
    }

    #[test]
    fn smooth_cubic_reflects_previous_control() {
        let svg = wrap(r#"<path d="M0 0 C0 10 10 10 10 0 S20 -10 20 0 Z"/>"#);
        let doc = import_svg(&svg, DIMS).unwrap();
        let segments = &doc.paths[0].subpaths[0].segments;
        assert!(matches!(
            segments[1],
            Segment::Cubic { ctrl1, .. } if ctrl1 == Point::new(10.0, -10.0)
        ));
    }

    #[test]
    fn arc_becomes_chord() {
        let svg = wrap(r#"<path d="M0 0 A5 5 0 0 1 10 0 L5 8 Z"/>"#);
        let doc = import_svg(&svg, DIMS).unwrap();
        assert_eq!(
            doc.paths[0].subpaths[0].segments[0],
            Segment::Line {
                to: Point::new(10.0, 0.0)
            }
        );
    }

    #[test]
    fn implicit_lineto_after_move() {
        let svg = wrap(r#"<path d="m1 1 2 0 0 2 z"/>"#);
        let doc = import_svg(&svg, DIMS).unwrap();
        let ring = doc.paths[0].subpaths[0].flatten(1);
        assert_eq!(
            ring,
            vec![
                Point::new(1.0, 1.0),
                Point::new(3.0, 1.0),
                Point::new(3.0, 3.0),
            ]
        );
    }

    #[test]
    fn unsupported_fill_is_rejected() {
        let svg = wrap(r#"<path d="M0 0 L1 0 L1 1 Z" fill="url(#g)"/>"#);
        assert!(matches!(
            import_svg(&svg, DIMS),
            Err(PipelineError::SvgImport(_))
        ));
    }

    #[test]
    fn unsupported_transform_is_rejected() {
        let svg = wrap(r#"<path d="M0 0 L1 0 L1 1 Z" transform="rotate(45)"/>"#);
        assert!(matches!(
            import_svg(&svg, DIMS),
            Err(PipelineError::SvgImport(_))
        ));
    }

    #[test]
    fn fill_parsing() {
        assert_eq!(parse_fill("#123").unwrap(), Rgb::new(0x11, 0x22, 0x33));
        assert_eq!(parse_fill("#0a0B0c").unwrap(), Rgb::new(10, 11, 12));
        assert_eq!(parse_fill("WHITE").unwrap(), Rgb::WHITE);
        assert!(parse_fill("#12").is_err());
        assert!(parse_fill("#+12").is_err());
    }

    #[test]
    fn non_ascii_fill_is_an_error() {
        assert!(parse_fill("#é1").is_err());
        assert!(parse_fill("#éé").is_err());
        let svg = wrap(r##"<path d="M0 0 L1 0 L1 1 Z" fill="#é1"/>"##);
        assert!(matches!(
            import_svg(&svg, DIMS),
            Err(PipelineError::SvgImport(_))
        ));
    }

    #[test]
    fn translate_parsing() {
        assert_eq!(parse_translate("translate(3)").unwrap(), Point::new(3.0, 0.0));
        assert_eq!(
            parse_translate("translate( 1.5 -2 )").unwrap(),
            Point::new(1.5, -2.0)
        );
        assert!(parse_translate("scale(2)").is_err());
    }
}
