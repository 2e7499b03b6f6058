use bytemuck::{Pod, Zeroable};

use crate::coords::Vec2;
use crate::paint::Color;

/// Vertex layout (36 bytes):
///
///  offset  0  position [f32; 2]   loc 0
///  offset  8  color    [f32; 4]   loc 1  (premultiplied)
///  offset 24  uv       [f32; 2]   loc 2
///  offset 32  layer    f32        loc 3  (< 0 = untextured)
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
    pub uv: [f32; 2],
    pub layer: f32,
}

impl MeshVertex {
    pub const STRIDE: u64 = std::mem::size_of::<MeshVertex>() as u64;

    pub const ATTRIBS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x2,
        1 => Float32x4,
        2 => Float32x2,
        3 => Float32,
    ];

    #[inline]
    pub fn solid(position: Vec2, color: Color) -> Self {
        Self { position: position.to_array(), color: color.to_array(), uv: [0.0, 0.0], layer: -1.0 }
    }

    #[inline]
    pub fn textured(position: Vec2, color: Color, uv: [f32; 2], layer: u32) -> Self {
        Self { position: position.to_array(), color: color.to_array(), uv, layer: layer as f32 }
    }

    #[inline]
    pub fn is_textured(&self) -> bool {
        self.layer >= 0.0
    }
}
