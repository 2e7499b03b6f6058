use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use image::RgbaImage;

use crate::batch::MeshVertex;
use crate::bullets::{BulletInstance, BulletShape};
use crate::coords::Viewport;
use crate::device::GpuFrame;

use super::{
    BufferId, BufferUsage, ContextId, DrawCall, GpuBackend, ProgramDesc, ProgramId, RenderTargetId,
    TextureDesc, TextureId, UniformLocation, UniformValue,
};

/// Sampled textures hold straight-alpha sRGB pixels.
const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct Globals {
    viewport: [f32; 2],
    _pad: [f32; 2], // 16-byte alignment
}

struct TextureSlot {
    view: wgpu::TextureView,
    texture: wgpu::Texture,
    desc: TextureDesc,
}

struct Target {
    view: wgpu::TextureView,
    texture: wgpu::Texture,
}

struct Program {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    uniforms: &'static [&'static str],
    values: Vec<[f32; 4]>,
    ubo: wgpu::Buffer,
}

/// [`GpuBackend`] on a wgpu device.
///
/// Draws are recorded into the frame attached with
/// [`begin_frame`](Self::begin_frame). Each draw opens its own render pass
/// that loads the current contents of the bound target, so draw order is
/// paint order. Binding an offscreen target clears it.
///
/// Buffer and uniform writes go through `Queue::write_buffer`, which lands
/// before the frame's command buffer executes: a buffer written twice in one
/// frame is seen with its last contents by every draw.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,
    context: ContextId,
    next_id: u32,

    textures: HashMap<TextureId, TextureSlot>,
    buffers: HashMap<BufferId, wgpu::Buffer>,
    targets: HashMap<RenderTargetId, Target>,
    programs: HashMap<ProgramId, Program>,
    bound: Option<RenderTargetId>,

    frame: Option<GpuFrame>,
    warned_no_frame: bool,

    globals: wgpu::Buffer,
    globals_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    sprite_layout: wgpu::BindGroupLayout,
    /// 1×1 white array bound when a mesh has no sprite texture.
    blank_sprites: wgpu::BindGroup,
    sprite_groups: HashMap<TextureId, wgpu::BindGroup>,

    mesh_pipeline: wgpu::RenderPipeline,
    bullet_shader: wgpu::ShaderModule,
    bullet_layout: wgpu::PipelineLayout,
    bullet_pipelines: HashMap<BulletShape, wgpu::RenderPipeline>,
}

impl WgpuBackend {
    /// Builds pipelines for `format`. A new backend is a new graphics context.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bastion globals bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<Globals>() as u64),
                },
                count: None,
            }],
        });
        let globals = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("bastion globals ubo"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bastion globals bind group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: globals.as_entire_binding() }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("bastion linear clamp sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let sprite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bastion sprite bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let blank = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("bastion blank sprite array"),
            size: wgpu::Extent3d { width: 1, height: 1, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &blank,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[255, 255, 255, 255],
            wgpu::TexelCopyBufferLayout { offset: 0, bytes_per_row: Some(4), rows_per_image: Some(1) },
            wgpu::Extent3d { width: 1, height: 1, depth_or_array_layers: 1 },
        );
        let blank_view = blank.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        let blank_sprites = sprite_group(device, &sprite_layout, &blank_view, &sampler);

        let mesh_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("bastion mesh shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/mesh.wgsl").into()),
        });
        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("bastion mesh pipeline layout"),
            bind_group_layouts: &[&globals_layout, &sprite_layout],
            immediate_size: 0,
        });
        let mesh_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("bastion mesh pipeline"),
            layout: Some(&mesh_layout),
            vertex: wgpu::VertexState {
                module: &mesh_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: MeshVertex::STRIDE,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &MeshVertex::ATTRIBS,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &mesh_shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(color_target(format))],
            }),
            primitive: triangle_list(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let bullet_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("bastion bullet shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/bullet.wgsl").into()),
        });
        let bullet_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("bastion bullet pipeline layout"),
            bind_group_layouts: &[&globals_layout],
            immediate_size: 0,
        });

        let context = ContextId::next();
        log::info!("wgpu backend ready (context {}, format {format:?})", context.raw());

        Self {
            device: device.clone(),
            queue: queue.clone(),
            format,
            context,
            next_id: 1,
            textures: HashMap::new(),
            buffers: HashMap::new(),
            targets: HashMap::new(),
            programs: HashMap::new(),
            bound: None,
            frame: None,
            warned_no_frame: false,
            globals,
            globals_group,
            sampler,
            sprite_layout,
            blank_sprites,
            sprite_groups: HashMap::new(),
            mesh_pipeline,
            bullet_shader,
            bullet_layout,
            bullet_pipelines: HashMap::new(),
        }
    }

    /// Logical size mesh and bullet positions are expressed in.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        let globals = Globals {
            viewport: viewport.logical_size(),
            _pad: [0.0; 2],
        };
        self.queue.write_buffer(&self.globals, 0, bytemuck::bytes_of(&globals));
    }

    /// Attaches the frame draws are recorded into and clears the surface.
    pub fn begin_frame(&mut self, mut frame: GpuFrame, clear: wgpu::Color) {
        drop(begin_pass(&mut frame.encoder, &frame.view, wgpu::LoadOp::Clear(clear), "bastion clear pass"));
        self.bound = None;
        self.frame = Some(frame);
    }

    /// Detaches the frame for submission.
    pub fn end_frame(&mut self) -> Option<GpuFrame> {
        if self.bound.is_some() {
            log::warn!("frame ended with an offscreen target still bound");
            self.bound = None;
        }
        self.frame.take()
    }

    fn alloc(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn sprite_group(&mut self, texture: Option<TextureId>) -> wgpu::BindGroup {
        let Some(id) = texture else {
            return self.blank_sprites.clone();
        };
        if let Some(group) = self.sprite_groups.get(&id) {
            return group.clone();
        }
        match self.textures.get(&id) {
            Some(slot) if matches!(slot.desc, TextureDesc::Array { .. }) => {
                let group = sprite_group(&self.device, &self.sprite_layout, &slot.view, &self.sampler);
                self.sprite_groups.insert(id, group.clone());
                group
            }
            _ => {
                log::warn!("mesh draw references texture {} which is not a live array", id.0);
                self.blank_sprites.clone()
            }
        }
    }

    fn bullet_pipeline(&mut self, shape: BulletShape) -> wgpu::RenderPipeline {
        if let Some(pipeline) = self.bullet_pipelines.get(&shape) {
            return pipeline.clone();
        }
        let constants = [("SHAPE", shape.shader_id() as f64)];
        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("bastion bullet pipeline"),
            layout: Some(&self.bullet_layout),
            vertex: wgpu::VertexState {
                module: &self.bullet_shader,
                entry_point: Some("vs_main"),
                compilation_options: wgpu::PipelineCompilationOptions {
                    constants: &constants,
                    ..Default::default()
                },
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: BulletInstance::STRIDE,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &BulletInstance::ATTRIBS,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.bullet_shader,
                entry_point: Some("fs_main"),
                compilation_options: wgpu::PipelineCompilationOptions {
                    constants: &constants,
                    ..Default::default()
                },
                targets: &[Some(color_target(self.format))],
            }),
            primitive: triangle_list(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });
        self.bullet_pipelines.insert(shape, pipeline.clone());
        pipeline
    }

    /// View draws currently land in, or `None` without an attached frame.
    fn draw_view(&self) -> Option<wgpu::TextureView> {
        let frame = self.frame.as_ref()?;
        match self.bound {
            None => Some(frame.view.clone()),
            Some(id) => self.targets.get(&id).map(|t| t.view.clone()),
        }
    }
}

impl GpuBackend for WgpuBackend {
    fn context_id(&self) -> ContextId {
        self.context
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Option<TextureId> {
        let limits = self.device.limits();
        let (width, height, layers, dimension) = match desc {
            TextureDesc::D2 { width, height } => (width, height, 1, wgpu::TextureViewDimension::D2),
            TextureDesc::Array { size, layers } => (size, size, layers, wgpu::TextureViewDimension::D2Array),
        };
        if width == 0
            || height == 0
            || layers == 0
            || width.max(height) > limits.max_texture_dimension_2d
            || layers > limits.max_texture_array_layers
        {
            log::warn!("texture {desc:?} exceeds device limits");
            return None;
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("bastion texture"),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: layers },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(dimension),
            ..Default::default()
        });
        let id = TextureId(self.alloc());
        self.textures.insert(id, TextureSlot { view, texture, desc });
        Some(id)
    }

    fn upload_texture(&mut self, texture: TextureId, layer: u32, image: &RgbaImage) {
        let Some(slot) = self.textures.get(&texture) else {
            log::warn!("upload to unknown texture {}", texture.0);
            return;
        };
        let (width, height) = image.dimensions();
        let fits = match slot.desc {
            TextureDesc::D2 { width: w, height: h } => layer == 0 && (w, h) == (width, height),
            TextureDesc::Array { size, layers } => layer < layers && (size, size) == (width, height),
        };
        if !fits {
            log::warn!("image {width}x{height} does not fit texture {:?} layer {layer}", slot.desc);
            return;
        }
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &slot.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x: 0, y: 0, z: layer },
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.sprite_groups.remove(&texture);
        if let Some(slot) = self.textures.remove(&texture) {
            slot.texture.destroy();
        }
    }

    fn create_buffer(&mut self, usage: BufferUsage, size: u64) -> Option<BufferId> {
        // write_buffer requires 4-byte aligned sizes.
        let size = size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        if size == 0 || size > self.device.limits().max_buffer_size {
            log::warn!("buffer of {size} bytes exceeds device limits");
            return None;
        }
        let label = match usage {
            BufferUsage::Vertex => "bastion vertex buffer",
            BufferUsage::Instance => "bastion instance buffer",
        };
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let id = BufferId(self.alloc());
        self.buffers.insert(id, buffer);
        Some(id)
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) {
        let Some(target) = self.buffers.get(&buffer) else {
            log::warn!("write to unknown buffer {}", buffer.0);
            return;
        };
        if offset + data.len() as u64 > target.size() {
            log::warn!("write of {} bytes at {offset} overruns buffer {}", data.len(), buffer.0);
            return;
        }
        self.queue.write_buffer(target, offset, data);
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(buffer) = self.buffers.remove(&buffer) {
            buffer.destroy();
        }
    }

    fn create_render_target(&mut self, width: u32, height: u32) -> Option<RenderTargetId> {
        let max = self.device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            log::warn!("render target {width}x{height} exceeds device limits");
            return None;
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("bastion render target"),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = RenderTargetId(self.alloc());
        self.targets.insert(id, Target { view, texture });
        Some(id)
    }

    fn delete_render_target(&mut self, target: RenderTargetId) {
        if self.bound == Some(target) {
            self.bound = None;
        }
        if let Some(target) = self.targets.remove(&target) {
            target.texture.destroy();
        }
    }

    fn bind_render_target(&mut self, target: Option<RenderTargetId>) {
        self.bound = target.filter(|id| self.targets.contains_key(id));
        let (Some(id), Some(frame)) = (self.bound, self.frame.as_mut()) else {
            return;
        };
        if let Some(t) = self.targets.get(&id) {
            let load = wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT);
            drop(begin_pass(&mut frame.encoder, &t.view, load, "bastion target clear pass"));
        }
    }

    fn bound_render_target(&self) -> Option<RenderTargetId> {
        self.bound
    }

    fn create_program(&mut self, desc: &ProgramDesc) -> Option<ProgramId> {
        let layout = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(desc.label),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.wgsl.into()),
        });
        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.label),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });
        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                // The captured scene is already premultiplied and covers the whole surface.
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: triangle_list(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let slots = desc.uniforms.len().max(1);
        let ubo = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size: (slots * std::mem::size_of::<[f32; 4]>()) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let id = ProgramId(self.alloc());
        self.programs.insert(
            id,
            Program { pipeline, layout, uniforms: desc.uniforms, values: vec![[0.0; 4]; slots], ubo },
        );
        log::debug!("program `{}` created with {} uniform slots", desc.label, desc.uniforms.len());
        Some(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        if let Some(program) = self.programs.remove(&program) {
            program.ubo.destroy();
        }
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let p = self.programs.get(&program)?;
        let slot = p.uniforms.iter().position(|u| *u == name)?;
        Some(UniformLocation { program, slot: slot as u32 })
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        if let Some(value_slot) = self
            .programs
            .get_mut(&location.program)
            .and_then(|p| p.values.get_mut(location.slot as usize))
        {
            *value_slot = value.to_slot();
        }
    }

    fn draw(&mut self, call: &DrawCall) {
        let Some(view) = self.draw_view() else {
            if !self.warned_no_frame {
                log::warn!("draw without an attached frame; dropped");
                self.warned_no_frame = true;
            }
            return;
        };

        match call {
            DrawCall::Mesh { vertices, vertex_count, textures } => {
                if *vertex_count == 0 {
                    return;
                }
                let group = self.sprite_group(*textures);
                let Some(vbo) = self.buffers.get(vertices) else { return };
                let bytes = (*vertex_count as u64 * MeshVertex::STRIDE).min(vbo.size());
                let Some(frame) = self.frame.as_mut() else { return };

                let mut rpass = begin_pass(&mut frame.encoder, &view, wgpu::LoadOp::Load, "bastion mesh pass");
                rpass.set_pipeline(&self.mesh_pipeline);
                rpass.set_bind_group(0, &self.globals_group, &[]);
                rpass.set_bind_group(1, &group, &[]);
                rpass.set_vertex_buffer(0, vbo.slice(..bytes));
                rpass.draw(0..(bytes / MeshVertex::STRIDE) as u32, 0..1);
            }

            DrawCall::Bullets { instances, instance_count, batch } => {
                if *instance_count == 0 {
                    return;
                }
                let pipeline = self.bullet_pipeline(batch.shape);
                let Some(ibo) = self.buffers.get(instances) else { return };
                let count = (*instance_count as u64).min(ibo.size() / BulletInstance::STRIDE) as u32;
                let Some(frame) = self.frame.as_mut() else { return };

                let mut rpass = begin_pass(&mut frame.encoder, &view, wgpu::LoadOp::Load, "bastion bullet pass");
                rpass.set_pipeline(&pipeline);
                rpass.set_bind_group(0, &self.globals_group, &[]);
                rpass.set_vertex_buffer(0, ibo.slice(..));
                rpass.draw(0..6, 0..count);
            }

            DrawCall::Fullscreen { program, source } => {
                if self.bound == Some(*source) {
                    log::warn!("fullscreen draw samples its own render target; skipped");
                    return;
                }
                let (Some(p), Some(src)) = (self.programs.get(program), self.targets.get(source)) else {
                    return;
                };
                self.queue.write_buffer(&p.ubo, 0, bytemuck::cast_slice(&p.values));
                let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("bastion fullscreen bind group"),
                    layout: &p.layout,
                    entries: &[
                        wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&src.view) },
                        wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&self.sampler) },
                        wgpu::BindGroupEntry { binding: 2, resource: p.ubo.as_entire_binding() },
                    ],
                });
                let Some(frame) = self.frame.as_mut() else { return };

                let mut rpass =
                    begin_pass(&mut frame.encoder, &view, wgpu::LoadOp::Load, "bastion fullscreen pass");
                rpass.set_pipeline(&p.pipeline);
                rpass.set_bind_group(0, &group, &[]);
                rpass.draw(0..6, 0..1);
            }
        }
    }
}

fn begin_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    view: &wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
    label: &'static str,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations { load, store: wgpu::StoreOp::Store },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    })
}

fn sprite_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("bastion sprite bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(view) },
            wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(sampler) },
        ],
    })
}

fn premul_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

fn color_target(format: wgpu::TextureFormat) -> wgpu::ColorTargetState {
    wgpu::ColorTargetState { format, blend: Some(premul_alpha_blend()), write_mask: wgpu::ColorWrites::ALL }
}

fn triangle_list() -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        strip_index_format: None,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode: None,
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}
