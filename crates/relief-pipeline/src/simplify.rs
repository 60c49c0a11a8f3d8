//! Ring simplification: collinear-point removal and Ramer-Douglas-Peucker.
//!
//! Border following emits one point per boundary pixel, so a straight
//! edge of 200 pixels arrives as 200 points. [`remove_collinear`] drops
//! the redundant interior points of every straight run, and
//! [`simplify_ring`] optionally reduces the remainder with RDP.
//!
//! All functions treat their input as a closed ring: the last point
//! connects back to the first.

use crate::types::Point;

/// Cross products below this magnitude are treated as collinear.
const COLLINEAR_EPSILON: f64 = 1e-9;

/// Remove every point lying on the straight line through its neighbours.
///
/// Repeats until no more points can be removed, so back-and-forth spurs
/// (zero-width slivers) collapse as well. Rings that shrink below three
/// points are returned as whatever remains.
#[must_use = "returns the reduced ring"]
pub fn remove_collinear(ring: &[Point]) -> Vec<Point> {
    let mut points = ring.to_vec();
    loop {
        let n = points.len();
        if n < 3 {
            return points;
        }
        let kept: Vec<Point> = (0..n)
            .filter(|&i| {
                let prev = points[(i + n - 1) % n];
                let next = points[(i + 1) % n];
                cross(prev, points[i], next).abs() > COLLINEAR_EPSILON
            })
            .map(|i| points[i])
            .collect();
        if kept.len() == n {
            return points;
        }
        points = kept;
    }
}

/// Simplify a closed ring with the Ramer-Douglas-Peucker algorithm.
///
/// The ring is split at its first point and the point farthest from it,
/// and each half is simplified as an open polyline with both anchors
/// kept. Rings with fewer than four points are returned unchanged.
#[must_use = "returns the simplified ring"]
pub fn simplify_ring(ring: &[Point], tolerance: f64) -> Vec<Point> {
    if ring.len() < 4 {
        return ring.to_vec();
    }

    let anchor = ring[0];
    let far = (1..ring.len())
        .max_by(|&a, &b| {
            ring[a]
                .distance_squared(anchor)
                .total_cmp(&ring[b].distance_squared(anchor))
        })
        .unwrap_or(ring.len() / 2);

    let mut kept = vec![false; ring.len() + 1];
    kept[0] = true;
    kept[far] = true;
    kept[ring.len()] = true;

    // Walk the closed ring with the first point repeated at the end.
    let mut closed = ring.to_vec();
    closed.push(anchor);
    rdp_recurse(&closed, 0, far, tolerance, &mut kept);
    rdp_recurse(&closed, far, ring.len(), tolerance, &mut kept);

    ring.iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect()
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// line segment between them. If that distance exceeds `tolerance`, the
/// point is kept and both sub-segments are processed recursively.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Perpendicular distance from point `p` to the line defined by `a` and `b`.
///
/// When `a` and `b` coincide, returns the distance from `p` to `a`.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let length_sq = a.distance_squared(b);
    if length_sq == 0.0 {
        return p.distance(a);
    }
    cross(a, b, p).abs() / length_sq.sqrt()
}

/// Z component of `(b - a) x (c - b)`.
fn cross(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x).mul_add(c.y - b.y, -((b.y - a.y) * (c.x - b.x)))
}
