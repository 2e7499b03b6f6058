//! Test doubles for the graphics boundary.

use std::collections::{HashMap, HashSet};

use image::RgbaImage;

use super::{
    BufferId, BufferUsage, ContextId, DrawCall, GpuBackend, ProgramDesc, ProgramId,
    RenderTargetId, TextureDesc, TextureId, UniformLocation, UniformValue,
};

/// Recorded backend operation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Op {
    CreateTexture(TextureId, TextureDesc),
    UploadTexture(TextureId, u32),
    DeleteTexture(TextureId),
    CreateBuffer(BufferId, u64),
    WriteBuffer(BufferId, u64, usize),
    DeleteBuffer(BufferId),
    CreateRenderTarget(RenderTargetId, u32, u32),
    DeleteRenderTarget(RenderTargetId),
    BindRenderTarget(Option<RenderTargetId>),
    CreateProgram(ProgramId),
    DeleteProgram(ProgramId),
    SetUniform(UniformLocation, UniformValue),
    Draw(DrawCall),
}

/// Backend that records every call and owns no GPU.
#[derive(Debug)]
pub(crate) struct RecordingBackend {
    context: ContextId,
    next_id: u32,
    pub ops: Vec<Op>,
    pub live_textures: HashMap<TextureId, TextureDesc>,
    pub live_buffers: HashMap<BufferId, Vec<u8>>,
    pub live_targets: HashSet<RenderTargetId>,
    pub programs: HashMap<ProgramId, Vec<&'static str>>,
    bound: Option<RenderTargetId>,
    /// Uniform names reported as eliminated by the compiler.
    pub stripped_uniforms: HashSet<&'static str>,
    pub fail_textures: bool,
    pub fail_buffers: bool,
    pub fail_programs: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            context: ContextId::next(),
            next_id: 1,
            ops: Vec::new(),
            live_textures: HashMap::new(),
            live_buffers: HashMap::new(),
            live_targets: HashSet::new(),
            programs: HashMap::new(),
            bound: None,
            stripped_uniforms: HashSet::new(),
            fail_textures: false,
            fail_buffers: false,
            fail_programs: false,
        }
    }

    fn alloc(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn draw_count(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, Op::Draw(_))).count()
    }

    pub fn count(&self, pred: impl Fn(&Op) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    pub fn draws(&self) -> Vec<DrawCall> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Draw(d) => Some(d.clone()),
                _ => None,
            })
            .collect()
    }
}

impl GpuBackend for RecordingBackend {
    fn context_id(&self) -> ContextId {
        self.context
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Option<TextureId> {
        if self.fail_textures {
            return None;
        }
        let id = TextureId(self.alloc());
        self.live_textures.insert(id, desc);
        self.ops.push(Op::CreateTexture(id, desc));
        Some(id)
    }

    fn upload_texture(&mut self, texture: TextureId, layer: u32, _image: &RgbaImage) {
        self.ops.push(Op::UploadTexture(texture, layer));
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.live_textures.remove(&texture);
        self.ops.push(Op::DeleteTexture(texture));
    }

    fn create_buffer(&mut self, _usage: BufferUsage, size: u64) -> Option<BufferId> {
        if self.fail_buffers {
            return None;
        }
        let id = BufferId(self.alloc());
        self.live_buffers.insert(id, vec![0; size as usize]);
        self.ops.push(Op::CreateBuffer(id, size));
        Some(id)
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) {
        if let Some(bytes) = self.live_buffers.get_mut(&buffer) {
            let start = offset as usize;
            let end = (start + data.len()).min(bytes.len());
            bytes[start..end].copy_from_slice(&data[..end - start]);
        }
        self.ops.push(Op::WriteBuffer(buffer, offset, data.len()));
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.live_buffers.remove(&buffer);
        self.ops.push(Op::DeleteBuffer(buffer));
    }

    fn create_render_target(&mut self, width: u32, height: u32) -> Option<RenderTargetId> {
        if self.fail_textures {
            return None;
        }
        let id = RenderTargetId(self.alloc());
        self.live_targets.insert(id);
        self.ops.push(Op::CreateRenderTarget(id, width, height));
        Some(id)
    }

    fn delete_render_target(&mut self, target: RenderTargetId) {
        self.live_targets.remove(&target);
        if self.bound == Some(target) {
            self.bound = None;
        }
        self.ops.push(Op::DeleteRenderTarget(target));
    }

    fn bind_render_target(&mut self, target: Option<RenderTargetId>) {
        self.bound = target;
        self.ops.push(Op::BindRenderTarget(target));
    }

    fn bound_render_target(&self) -> Option<RenderTargetId> {
        self.bound
    }

    fn create_program(&mut self, desc: &ProgramDesc) -> Option<ProgramId> {
        if self.fail_programs {
            return None;
        }
        let id = ProgramId(self.alloc());
        self.programs.insert(id, desc.uniforms.to_vec());
        self.ops.push(Op::CreateProgram(id));
        Some(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        self.ops.push(Op::DeleteProgram(program));
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        if self.stripped_uniforms.contains(name) {
            return None;
        }
        let names = self.programs.get(&program)?;
        let slot = names.iter().position(|n| *n == name)?;
        Some(UniformLocation { program, slot: slot as u32 })
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        self.ops.push(Op::SetUniform(location, value));
    }

    fn draw(&mut self, call: &DrawCall) {
        self.ops.push(Op::Draw(call.clone()));
    }
}
