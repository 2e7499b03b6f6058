//! Pure constructors for [`Primitive`]s.
//!
//! Builders sanitize their numeric input: non-finite sizes collapse to zero
//! so the primitive reports [`Primitive::is_empty`] instead of poisoning a batch.

use core::f32::consts::TAU;

use crate::coords::Vec2;
use crate::paint::{Color, Stroke};
use crate::texture::UvRect;

use super::geometry::{circle_segments, quads_to_triangles, Quad};
use super::{Fill, Primitive};

#[inline]
fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() { v } else { 0.0 }
}

fn visible_stroke(stroke: Option<Stroke>) -> Option<Stroke> {
    stroke.filter(|s| !s.is_invisible())
}

pub fn polygon(points: Vec<Vec2>, fill: Fill, stroke: Option<Stroke>) -> Primitive {
    let points = if points.iter().all(|p| p.is_finite()) { points } else { Vec::new() };
    Primitive::Polygon { points, fill, stroke: visible_stroke(stroke) }
}

/// `sides`-gon inscribed in a circle of `radius`, first vertex at `rotation`.
pub fn regular_polygon(
    center: Vec2,
    radius: f32,
    sides: u32,
    rotation: f32,
    fill: Fill,
    stroke: Option<Stroke>,
) -> Primitive {
    let radius = finite_or_zero(radius).max(0.0);
    let sides = sides.max(3);
    let points = (0..sides)
        .map(|i| center + Vec2::from_angle(rotation + i as f32 / sides as f32 * TAU) * radius)
        .collect();
    polygon(points, fill, stroke)
}

pub fn circle(center: Vec2, radius: f32, fill: Fill, stroke: Option<Stroke>) -> Primitive {
    let radius = finite_or_zero(radius).max(0.0);
    Primitive::Circle {
        center,
        radius,
        segments: circle_segments(radius),
        fill,
        stroke: visible_stroke(stroke),
    }
}

/// Unfilled circle outline of `width`.
pub fn ring(center: Vec2, radius: f32, width: f32, color: Color) -> Primitive {
    circle(center, radius, Fill::None, Some(Stroke::new(finite_or_zero(width), color)))
}

pub fn sprite(center: Vec2, size: Vec2, rotation: f32, layer: u32, uv: UvRect, tint: Color) -> Primitive {
    Primitive::Sprite {
        center,
        size: Vec2::new(finite_or_zero(size.x).max(0.0), finite_or_zero(size.y).max(0.0)),
        rotation: finite_or_zero(rotation),
        layer,
        uv,
        tint,
    }
}

/// Solid triangle list from tessellated quads.
pub fn from_quads(quads: &[Quad], color: Color) -> Primitive {
    Primitive::Triangles { vertices: quads_to_triangles(quads), color }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn regular_polygon_vertices_lie_on_circle() {
        let p = regular_polygon(Vec2::new(2.0, 3.0), 4.0, 6, 0.0, Fill::Solid(Color::WHITE), None);
        let Primitive::Polygon { points, .. } = p else { panic!("expected polygon") };
        assert_eq!(points.len(), 6);
        for v in points {
            assert_relative_eq!((v - Vec2::new(2.0, 3.0)).length(), 4.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn invisible_strokes_are_dropped() {
        let c = circle(Vec2::zero(), 5.0, Fill::None, Some(Stroke::new(0.0, Color::WHITE)));
        assert!(matches!(c, Primitive::Circle { stroke: None, .. }));
        assert!(c.is_empty());
    }

    #[test]
    fn nan_input_yields_empty_primitives() {
        assert!(circle(Vec2::zero(), f32::NAN, Fill::Solid(Color::WHITE), None).is_empty());
        assert!(polygon(
            vec![Vec2::new(f32::NAN, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)],
            Fill::Solid(Color::WHITE),
            None
        )
        .is_empty());
        assert!(sprite(Vec2::zero(), Vec2::new(f32::INFINITY, 4.0), 0.0, 0, UvRect::FULL, Color::WHITE)
            .is_empty());
    }

    #[test]
    fn ring_is_stroke_only() {
        let r = ring(Vec2::zero(), 10.0, 2.0, Color::WHITE);
        assert!(matches!(r, Primitive::Circle { fill: Fill::None, stroke: Some(_), .. }));
        assert!(!r.is_empty());
    }
}
