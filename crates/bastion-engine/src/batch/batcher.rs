use crate::coords::Vec2;
use crate::paint::Color;
use crate::primitives::{self, Primitive};
use crate::scene::PrimitiveList;

use super::MeshVertex;

/// Tessellates primitives into a reusable triangle list.
#[derive(Debug, Default)]
pub struct PrimitiveBatcher {
    vertices: Vec<MeshVertex>,
    textured: bool,
    /// Layers in the bound sprite array; `None` accepts any layer.
    layer_capacity: Option<u32>,
}

impl PrimitiveBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sprites on layers at or past `layers` are skipped: the array has no
    /// image for them and sampling would clamp to another sprite's layer.
    pub fn with_layer_capacity(layers: u32) -> Self {
        Self { layer_capacity: Some(layers), ..Self::default() }
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.textured = false;
    }

    #[inline]
    pub fn vertices(&self) -> &[MeshVertex] {
        &self.vertices
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    /// True when at least one sprite vertex was emitted since the last clear.
    #[inline]
    pub fn has_textured(&self) -> bool {
        self.textured
    }

    /// Clears, then tessellates `list` back-to-front.
    pub fn batch(&mut self, list: &mut PrimitiveList) -> &[MeshVertex] {
        self.clear();
        for item in list.iter_in_paint_order() {
            self.push(&item.primitive);
        }
        &self.vertices
    }

    pub fn push(&mut self, primitive: &Primitive) {
        match primitive {
            Primitive::Polygon { points, fill, stroke } => {
                if let Some(color) = fill.color() {
                    self.solid(&primitives::triangulate_fan(points), color);
                }
                if let Some(s) = stroke.filter(|s| !s.is_invisible()) {
                    self.solid(&primitives::expand_stroke(points, s.width, true), s.color);
                }
            }
            Primitive::Circle { center, radius, segments, fill, stroke } => {
                let outline = primitives::circle_outline(*center, *radius, *segments);
                if let Some(color) = fill.color() {
                    self.solid(&primitives::triangulate_fan(&outline), color);
                }
                if let Some(s) = stroke.filter(|s| !s.is_invisible()) {
                    self.solid(&primitives::expand_stroke(&outline, s.width, true), s.color);
                }
            }
            Primitive::Sprite { layer, .. } if self.layer_capacity.is_some_and(|cap| *layer >= cap) => {}
            Primitive::Sprite { center, size, rotation, layer, uv, tint } => {
                let half = *size * 0.5;
                let corner = |sx: f32, sy: f32| *center + Vec2::new(half.x * sx, half.y * sy).rotated(*rotation);
                let quad = [
                    MeshVertex::textured(corner(-1.0, -1.0), *tint, uv.at(0.0, 0.0), *layer),
                    MeshVertex::textured(corner(1.0, -1.0), *tint, uv.at(1.0, 0.0), *layer),
                    MeshVertex::textured(corner(1.0, 1.0), *tint, uv.at(1.0, 1.0), *layer),
                    MeshVertex::textured(corner(-1.0, 1.0), *tint, uv.at(0.0, 1.0), *layer),
                ];
                if quad.iter().all(|v| v.position.iter().all(|c| c.is_finite())) {
                    self.vertices.extend_from_slice(&[quad[0], quad[1], quad[2], quad[0], quad[2], quad[3]]);
                    self.textured = true;
                }
            }
            Primitive::Triangles { vertices, color } => self.solid(vertices, *color),
        }
    }

    /// Appends whole triangles; a trailing partial triangle or one with a
    /// non-finite vertex is skipped.
    fn solid(&mut self, triangles: &[Vec2], color: Color) {
        for tri in triangles.chunks_exact(3) {
            if tri.iter().all(|p| p.is_finite()) {
                self.vertices.extend(tri.iter().map(|&p| MeshVertex::solid(p, color)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::Stroke;
    use crate::primitives::Fill;
    use crate::scene::ZIndex;
    use crate::texture::UvRect;
    use approx::assert_relative_eq;

    fn square() -> Vec<Vec2> {
        vec![Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0), Vec2::new(0.0, 10.0)]
    }

    #[test]
    fn filled_and_stroked_polygon() {
        let mut b = PrimitiveBatcher::new();
        b.push(&primitives::polygon(square(), Fill::Solid(Color::WHITE), None));
        assert_eq!(b.vertex_count(), 6);

        b.clear();
        b.push(&primitives::polygon(square(), Fill::None, Some(Stroke::new(2.0, Color::WHITE))));
        assert_eq!(b.vertex_count(), 4 * 6);
        assert!(b.vertices().iter().all(|v| !v.is_textured()));
    }

    #[test]
    fn circle_uses_its_segment_count() {
        let mut b = PrimitiveBatcher::new();
        b.push(&Primitive::Circle {
            center: Vec2::zero(),
            radius: 5.0,
            segments: 16,
            fill: Fill::Solid(Color::WHITE),
            stroke: None,
        });
        assert_eq!(b.vertex_count(), 14 * 3);
    }

    #[test]
    fn sprite_quad_is_rotated_and_textured() {
        let mut b = PrimitiveBatcher::new();
        b.push(&primitives::sprite(
            Vec2::new(100.0, 100.0),
            Vec2::new(20.0, 10.0),
            core::f32::consts::FRAC_PI_2,
            3,
            UvRect::FULL,
            Color::WHITE,
        ));
        assert!(b.has_textured());
        let v = b.vertices();
        assert_eq!(v.len(), 6);
        assert_eq!(v[0].layer, 3.0);
        assert_eq!(v[0].uv, [0.0, 0.0]);
        // Top-left (-10, -5) rotated a quarter turn lands at (5, -10).
        assert_relative_eq!(v[0].position[0], 105.0, epsilon = 1e-4);
        assert_relative_eq!(v[0].position[1], 90.0, epsilon = 1e-4);
    }

    #[test]
    fn sprites_past_the_array_are_skipped() {
        let sprite = |layer| primitives::sprite(Vec2::zero(), Vec2::new(8.0, 8.0), 0.0, layer, UvRect::FULL, Color::WHITE);
        let mut b = PrimitiveBatcher::with_layer_capacity(4);
        b.push(&sprite(99));
        b.push(&sprite(4));
        assert_eq!(b.vertex_count(), 0);
        assert!(!b.has_textured());

        b.push(&sprite(3));
        assert_eq!(b.vertex_count(), 6);

        let mut unbounded = PrimitiveBatcher::new();
        unbounded.push(&sprite(99));
        assert_eq!(unbounded.vertex_count(), 6);
    }

    #[test]
    fn partial_and_non_finite_triangles_are_dropped() {
        let mut b = PrimitiveBatcher::new();
        let mut tris = vec![Vec2::zero(), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)];
        tris.extend([Vec2::new(f32::NAN, 0.0), Vec2::zero(), Vec2::zero()]);
        tris.push(Vec2::zero());
        b.push(&Primitive::Triangles { vertices: tris, color: Color::WHITE });
        assert_eq!(b.vertex_count(), 3);
    }

    #[test]
    fn batch_follows_paint_order() {
        let mut list = PrimitiveList::new();
        let red = Color::from_straight(1.0, 0.0, 0.0, 1.0);
        list.push(ZIndex::EFFECTS, primitives::polygon(square(), Fill::Solid(red), None));
        list.push(ZIndex::GROUND, primitives::polygon(square(), Fill::Solid(Color::WHITE), None));

        let mut b = PrimitiveBatcher::new();
        let v = b.batch(&mut list);
        assert_eq!(v.len(), 12);
        assert_eq!(v[0].color, Color::WHITE.to_array());
        assert_eq!(v[6].color, red.to_array());
    }
}
