//! Tessellation helpers. All outputs are flat triangle lists (three vertices per
//! triangle) unless stated otherwise.

use core::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::coords::Vec2;

/// Tangent dot product below which two segments count as folding back on each other.
const ANTI_PARALLEL_DOT: f32 = -0.99;

/// Longest miter allowed by [`expand_stroke`], in multiples of the half width.
const MITER_LIMIT: f32 = 4.0;

/// Vertex order of emitted quads, measured in a +Y-up frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winding {
    Clockwise,
    #[default]
    CounterClockwise,
}

/// Four corners in the requested winding.
pub type Quad = [Vec2; 4];

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PolylinePoint {
    pub position: Vec2,
    /// Full width at this point.
    pub width: f32,
}

impl PolylinePoint {
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32) -> Self {
        Self { position: Vec2::new(x, y), width }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct QuadOptions {
    /// Tangential overdraw at both ends of every quad; hides AA seams between quads.
    pub cap_epsilon: f32,
    /// Segments shorter than this emit nothing.
    pub min_segment_length: f32,
    pub winding: Winding,
}

impl Default for QuadOptions {
    fn default() -> Self {
        Self { cap_epsilon: 0.2, min_segment_length: 1e-6, winding: Winding::CounterClockwise }
    }
}

/// Unit normal (left perpendicular) of the segment `a → b`.
#[inline]
fn segment_normal(a: Vec2, b: Vec2) -> Option<Vec2> {
    (b - a).try_normalize().map(Vec2::perp)
}

/// Mitered normal at `points[i]`.
///
/// Endpoints take their single adjacent segment's normal. Interior points
/// average both neighbours unless the path folds back (dot < -0.99), in which
/// case the incoming segment's normal is used as is.
fn point_normal(points: &[PolylinePoint], i: usize) -> Option<Vec2> {
    let here = points[i].position;
    let incoming = (i > 0).then(|| segment_normal(points[i - 1].position, here)).flatten();
    let outgoing = points.get(i + 1).and_then(|next| segment_normal(here, next.position));

    match (incoming, outgoing) {
        (Some(a), Some(b)) => {
            // Normals rotate with their tangents, so dot(na, nb) == dot(ta, tb).
            if a.dot(b) < ANTI_PARALLEL_DOT {
                return Some(a);
            }
            (a + b).try_normalize().or(Some(a))
        }
        (a, b) => a.or(b),
    }
}

/// Converts a variable-width polyline into one quad per segment.
///
/// Joins use averaged (mitered) normals so neighbouring quads share edges.
/// Returned quads are in `opts.winding` order.
pub fn polyline_to_quads(points: &[PolylinePoint], opts: QuadOptions) -> Vec<Quad> {
    if points.len() < 2 {
        return Vec::new();
    }

    let normals: Vec<Option<Vec2>> = (0..points.len()).map(|i| point_normal(points, i)).collect();
    let mut quads = Vec::with_capacity(points.len() - 1);

    for i in 0..points.len() - 1 {
        let (p0, p1) = (points[i], points[i + 1]);
        let delta = p1.position - p0.position;
        let len = delta.length();
        if !(len >= opts.min_segment_length) || !len.is_finite() {
            continue;
        }
        let tangent = delta / len;
        let fallback = tangent.perp();
        let n0 = normals[i].unwrap_or(fallback);
        let n1 = normals[i + 1].unwrap_or(fallback);

        let a = p0.position - tangent * opts.cap_epsilon;
        let b = p1.position + tangent * opts.cap_epsilon;
        let (h0, h1) = (p0.width.max(0.0) * 0.5, p1.width.max(0.0) * 0.5);

        let a_left = a + n0 * h0;
        let a_right = a - n0 * h0;
        let b_right = b - n1 * h1;
        let b_left = b + n1 * h1;

        quads.push(match opts.winding {
            Winding::CounterClockwise => [a_left, a_right, b_right, b_left],
            Winding::Clockwise => [a_left, b_left, b_right, a_right],
        });
    }

    quads
}

/// Splits quads into triangles, preserving their winding.
pub fn quads_to_triangles(quads: &[Quad]) -> Vec<Vec2> {
    let mut out = Vec::with_capacity(quads.len() * 6);
    for q in quads {
        out.extend_from_slice(&[q[0], q[1], q[2], q[0], q[2], q[3]]);
    }
    out
}

/// Evenly spaced points on a circle, starting at +X.
pub fn circle_outline(center: Vec2, radius: f32, segments: u32) -> Vec<Vec2> {
    let n = segments.max(3);
    (0..n)
        .map(|i| center + Vec2::from_angle(i as f32 / n as f32 * TAU) * radius)
        .collect()
}

/// Segment count that keeps a circle of `radius` visually round.
pub fn circle_segments(radius: f32) -> u32 {
    if !radius.is_finite() {
        return 12;
    }
    ((radius * 0.75).ceil() as u32).clamp(12, 96)
}

/// Fan triangulation around the first vertex. Correct for convex outlines.
pub fn triangulate_fan(points: &[Vec2]) -> Vec<Vec2> {
    if points.len() < 3 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity((points.len() - 2) * 3);
    for i in 1..points.len() - 1 {
        out.extend_from_slice(&[points[0], points[i], points[i + 1]]);
    }
    out
}

/// Outline of `points` as a band of `width`, centred on the path.
///
/// Joins are mitered and clamped to a miter limit. With `closed` the last point
/// connects back to the first.
pub fn expand_stroke(points: &[Vec2], width: f32, closed: bool) -> Vec<Vec2> {
    let n = points.len();
    if n < 2 || !(width > 0.0) {
        return Vec::new();
    }
    let half = width * 0.5;

    let offsets: Vec<Vec2> = (0..n)
        .map(|i| {
            let prev = if i > 0 {
                Some(points[i - 1])
            } else if closed {
                Some(points[n - 1])
            } else {
                None
            };
            let next = if i + 1 < n {
                Some(points[i + 1])
            } else if closed {
                Some(points[0])
            } else {
                None
            };

            let na = prev.and_then(|p| segment_normal(p, points[i]));
            let nb = next.and_then(|p| segment_normal(points[i], p));
            match (na, nb) {
                (Some(a), Some(b)) => {
                    let Some(miter) = (a + b).try_normalize() else {
                        return a * half;
                    };
                    let cos = miter.dot(a).max(1.0 / MITER_LIMIT);
                    miter * (half / cos)
                }
                (a, b) => a.or(b).map_or(Vec2::zero(), |n| n * half),
            }
        })
        .collect();

    let edges = if closed { n } else { n - 1 };
    let mut out = Vec::with_capacity(edges * 6);
    for i in 0..edges {
        let j = (i + 1) % n;
        if (points[j] - points[i]).try_normalize().is_none() {
            continue;
        }
        let (ol, or) = (points[i] + offsets[i], points[i] - offsets[i]);
        let (nl, nr) = (points[j] + offsets[j], points[j] - offsets[j]);
        out.extend_from_slice(&[ol, or, nr, ol, nr, nl]);
    }
    out
}
