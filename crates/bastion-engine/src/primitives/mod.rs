//! Renderer-agnostic primitive descriptors.
//!
//! Responsibilities:
//! - describe what a scene object looks like for one frame (`Primitive`)
//! - provide pure builders for the common shapes (`builders`)
//! - provide the tessellation math shared by renderers and the batcher (`geometry`)
//!
//! Nothing here touches the GPU.

pub mod builders;
pub mod geometry;

pub use builders::{circle, from_quads, polygon, regular_polygon, ring, sprite};
pub use geometry::{
    circle_outline, circle_segments, expand_stroke, polyline_to_quads, quads_to_triangles,
    triangulate_fan, PolylinePoint, Quad, QuadOptions, Winding,
};

use crate::coords::Vec2;
use crate::paint::{Color, Stroke};
use crate::texture::UvRect;

/// Interior fill of a closed shape.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub enum Fill {
    #[default]
    None,
    Solid(Color),
}

impl Fill {
    #[inline]
    pub fn color(self) -> Option<Color> {
        match self {
            Fill::Solid(c) if c.a > 0.0 => Some(c),
            _ => None,
        }
    }
}

impl From<Option<Color>> for Fill {
    fn from(c: Option<Color>) -> Self {
        c.map_or(Fill::None, Fill::Solid)
    }
}

/// One drawable piece of a scene object, in world units.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Closed convex (or star-shaped around its first vertex) outline.
    Polygon {
        points: Vec<Vec2>,
        fill: Fill,
        stroke: Option<Stroke>,
    },
    Circle {
        center: Vec2,
        radius: f32,
        /// Outline resolution used when tessellating.
        segments: u32,
        fill: Fill,
        stroke: Option<Stroke>,
    },
    /// Textured quad sampling one layer of the sprite array.
    Sprite {
        center: Vec2,
        size: Vec2,
        rotation: f32,
        layer: u32,
        uv: UvRect,
        tint: Color,
    },
    /// Pre-tessellated triangle list (three vertices per triangle).
    Triangles { vertices: Vec<Vec2>, color: Color },
}

impl Primitive {
    /// True when tessellating this primitive would produce no visible geometry.
    pub fn is_empty(&self) -> bool {
        match self {
            Primitive::Polygon { points, fill, stroke } => {
                points.len() < 3
                    || (fill.color().is_none() && stroke.is_none_or(|s| s.is_invisible()))
            }
            Primitive::Circle { radius, fill, stroke, .. } => {
                !(*radius > 0.0)
                    || (fill.color().is_none() && stroke.is_none_or(|s| s.is_invisible()))
            }
            Primitive::Sprite { size, tint, .. } => {
                !(size.x > 0.0 && size.y > 0.0) || tint.a <= 0.0
            }
            Primitive::Triangles { vertices, color } => vertices.len() < 3 || color.a <= 0.0,
        }
    }

    /// Moves every vertex by `offset`.
    pub fn translate(&mut self, offset: Vec2) {
        match self {
            Primitive::Polygon { points, .. } => points.iter_mut().for_each(|p| *p += offset),
            Primitive::Circle { center, .. } | Primitive::Sprite { center, .. } => *center += offset,
            Primitive::Triangles { vertices, .. } => {
                vertices.iter_mut().for_each(|p| *p += offset)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polygon_without_paint_is_empty() {
        let p = polygon(
            vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)],
            Fill::None,
            None,
        );
        assert!(p.is_empty());
    }

    #[test]
    fn transparent_fill_counts_as_none() {
        assert_eq!(Fill::Solid(Color::transparent()).color(), None);
        assert_eq!(Fill::from(Some(Color::WHITE)).color(), Some(Color::WHITE));
    }

    #[test]
    fn translate_moves_all_vertices() {
        let mut p = Primitive::Triangles {
            vertices: vec![Vec2::zero(), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)],
            color: Color::WHITE,
        };
        p.translate(Vec2::new(10.0, 5.0));
        let Primitive::Triangles { vertices, .. } = p else { unreachable!() };
        assert_eq!(vertices[1], Vec2::new(11.0, 5.0));
    }
}
