//! Graphics context boundary.
//!
//! Resource managers and renderers never touch wgpu directly; they talk to a
//! [`GpuBackend`], which models a WebGL2-style immediate API: 2D textures,
//! 2D-array textures, vertex/instance buffers, one offscreen render target per
//! post-process, fullscreen programs with named uniforms, and draw calls.
//!
//! Every backend carries a [`ContextId`]. GPU handles are only meaningful for the
//! context that created them; a new device (context loss, canvas remount)
//! produces a new id and callers must rebuild everything.

mod wgpu_backend;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::atomic::{AtomicU64, Ordering};

use image::RgbaImage;

use crate::bullets::BatchKey;

pub use wgpu_backend::WgpuBackend;

/// Identity of a graphics context (device + queue pair).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocates a process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureId(pub u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BufferId(pub u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RenderTargetId(pub u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProgramId(pub u32);

/// Resolved uniform slot inside a program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct UniformLocation {
    pub program: ProgramId,
    pub slot: u32,
}

/// Texture allocation request.
///
/// All textures are RGBA8, sampled with linear filtering and clamp-to-edge.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TextureDesc {
    D2 { width: u32, height: u32 },
    Array { size: u32, layers: u32 },
}

impl TextureDesc {
    /// Size in bytes of the allocation (RGBA8, no mips).
    pub fn byte_size(&self) -> u64 {
        match *self {
            TextureDesc::D2 { width, height } => width as u64 * height as u64 * 4,
            TextureDesc::Array { size, layers } => size as u64 * size as u64 * layers as u64 * 4,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferUsage {
    /// Per-vertex data for the mesh pipeline.
    Vertex,
    /// Per-instance data for the bullet pipeline.
    Instance,
}

/// Fullscreen program source.
///
/// `uniforms` lists uniform names in declaration order; each occupies one
/// `vec4<f32>` slot of binding 2 in the WGSL module.
#[derive(Debug, Clone, Copy)]
pub struct ProgramDesc {
    pub label: &'static str,
    pub wgsl: &'static str,
    pub uniforms: &'static [&'static str],
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    F32(f32),
    Vec2([f32; 2]),
    Vec4([f32; 4]),
}

impl UniformValue {
    /// Expands to the `vec4` slot layout used by fullscreen programs.
    pub fn to_slot(self) -> [f32; 4] {
        match self {
            UniformValue::F32(v) => [v, 0.0, 0.0, 0.0],
            UniformValue::Vec2([x, y]) => [x, y, 0.0, 0.0],
            UniformValue::Vec4(v) => v,
        }
    }
}

/// One draw submission.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    /// Triangle list of [`crate::batch::MeshVertex`], optionally sampling a texture array.
    Mesh {
        vertices: BufferId,
        vertex_count: u32,
        textures: Option<TextureId>,
    },
    /// Instanced bullet quads read from a persistent slot buffer.
    Bullets {
        instances: BufferId,
        instance_count: u32,
        batch: BatchKey,
    },
    /// Two-triangle fullscreen quad sampling a captured render target.
    Fullscreen {
        program: ProgramId,
        source: RenderTargetId,
    },
}

/// WebGL2-equivalent graphics API used by the rendering core.
///
/// Creation methods return `None` on failure; callers log and disable the
/// dependent feature instead of propagating a crash.
pub trait GpuBackend {
    fn context_id(&self) -> ContextId;

    fn create_texture(&mut self, desc: TextureDesc) -> Option<TextureId>;
    /// Uploads `image` into `layer` (0 for 2D textures). The image must match the texture size.
    fn upload_texture(&mut self, texture: TextureId, layer: u32, image: &RgbaImage);
    fn delete_texture(&mut self, texture: TextureId);

    fn create_buffer(&mut self, usage: BufferUsage, size: u64) -> Option<BufferId>;
    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]);
    fn delete_buffer(&mut self, buffer: BufferId);

    fn create_render_target(&mut self, width: u32, height: u32) -> Option<RenderTargetId>;
    fn delete_render_target(&mut self, target: RenderTargetId);
    /// Redirects subsequent draws. `None` targets the presentable surface.
    fn bind_render_target(&mut self, target: Option<RenderTargetId>);
    fn bound_render_target(&self) -> Option<RenderTargetId>;

    fn create_program(&mut self, desc: &ProgramDesc) -> Option<ProgramId>;
    fn delete_program(&mut self, program: ProgramId);
    /// `None` when the program has no such uniform (e.g. optimized away).
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    fn draw(&mut self, call: &DrawCall);
}
