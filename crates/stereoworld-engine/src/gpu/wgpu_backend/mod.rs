//! [`GpuBackend`] on top of wgpu.
//!
//! State calls are recorded, not executed: every draw snapshots the current
//! uniforms and bindings into a pending pass for the bound target. Passes are
//! encoded in recording order and submitted as one command buffer on
//! [`GpuBackend::present`], after every uniform snapshot has been written to a
//! single dynamic-offset uniform buffer.

mod pipelines;
mod uniforms;

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use stereoworld_scene::{RawVertex, TextureRole};
use wgpu::util::DeviceExt;

use self::pipelines::{DEPTH_FORMAT, PipelineKey, Pipelines};
use self::uniforms::{UNIFORM_STRIDE, UniformBlock};
use super::{
    BufferHandle, ClearRequest, FramebufferDesc, FramebufferHandle, FramebufferKind,
    FramebufferTarget, GpuBackend, ProgramHandle, ProgramKind, TextureHandle, TextureUnit, Uniform,
    UniformValue, VertexArrayHandle, Viewport,
};
use crate::device::Gpu;
use crate::error::RenderError;
use crate::texture::ImageData;

/// Colour format of offscreen eye targets.
const EYE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum TextureKind {
    Color,
    Depth,
}

struct GpuTexture {
    view: wgpu::TextureView,
    kind: TextureKind,
}

struct GpuBuffer {
    buffer: wgpu::Buffer,
    len: u32,
}

struct Attachments {
    /// Render attachment; multisampled when `samples > 1`.
    color: Option<wgpu::TextureView>,
    /// Single-sample resolve view, present only when `color` is multisampled.
    resolve: Option<wgpu::TextureView>,
    depth: wgpu::TextureView,
}

struct GpuFramebuffer {
    desc: FramebufferDesc,
    attachments: Result<Attachments, String>,
    texture: Option<TextureHandle>,
}

struct WindowTarget {
    view: wgpu::TextureView,
    size: (u32, u32),
}

struct WindowDepth {
    view: wgpu::TextureView,
    size: (u32, u32),
}

struct PendingDraw {
    pipeline: PipelineKey,
    viewport: Viewport,
    uniform_slot: u32,
    textures: Option<TextureKey>,
    vertices: BufferHandle,
    indices: BufferHandle,
    index_count: u32,
}

struct PendingPass {
    target: FramebufferTarget,
    clear: ClearRequest,
    draws: Vec<PendingDraw>,
    resolve: bool,
}

type TextureKey = (ProgramKind, [TextureHandle; 3]);

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    msaa_counts: Vec<u32>,
    max_dimension: u32,

    errors: Arc<Mutex<VecDeque<String>>>,

    pipelines: Pipelines,
    repeat_sampler: wgpu::Sampler,
    clamp_sampler: wgpu::Sampler,
    texture_groups: HashMap<TextureKey, wgpu::BindGroup>,

    programs: Vec<ProgramKind>,
    textures: Vec<GpuTexture>,
    buffers: Vec<GpuBuffer>,
    vertex_arrays: Vec<(BufferHandle, BufferHandle)>,
    framebuffers: Vec<GpuFramebuffer>,

    white: TextureHandle,
    flat_normal: TextureHandle,
    far_depth: TextureHandle,

    window: Option<WindowTarget>,
    window_depth: Option<WindowDepth>,

    target: FramebufferTarget,
    viewport: Option<Viewport>,
    program: Option<ProgramHandle>,
    vertex_array: Option<VertexArrayHandle>,
    bound: [Option<TextureHandle>; 3],
    uniforms: UniformBlock,

    snapshots: Vec<UniformBlock>,
    pending: Vec<PendingPass>,
    uniform_buffer: Option<(wgpu::Buffer, u64, wgpu::BindGroup)>,
}

impl WgpuBackend {
    /// Creates a back end sharing `gpu`'s device and queue.
    pub fn new(gpu: &Gpu<'_>) -> Result<Self, RenderError> {
        let device = gpu.device().clone();
        let queue = gpu.queue().clone();

        let errors = Arc::new(Mutex::new(VecDeque::new()));
        let sink = Arc::clone(&errors);
        device.on_uncaptured_error(Arc::new(move |e: wgpu::Error| {
            log::error!("wgpu: {e}");
            if let Ok(mut queue) = sink.lock() {
                queue.push_back(e.to_string());
            }
        }));

        let eye_flags = gpu.adapter().get_texture_format_features(EYE_FORMAT).flags;
        let depth_flags = gpu.adapter().get_texture_format_features(DEPTH_FORMAT).flags;
        let msaa_counts = [1, 2, 4, 8, 16]
            .into_iter()
            .filter(|&n| eye_flags.sample_count_supported(n) && depth_flags.sample_count_supported(n))
            .collect();

        let sampler = |label, address_mode| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(label),
                address_mode_u: address_mode,
                address_mode_v: address_mode,
                address_mode_w: address_mode,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::MipmapFilterMode::Nearest,
                ..Default::default()
            })
        };
        let repeat_sampler = sampler("stereoworld repeat sampler", wgpu::AddressMode::Repeat);
        let clamp_sampler = sampler("stereoworld clamp sampler", wgpu::AddressMode::ClampToEdge);

        let pipelines = Pipelines::new(&device);

        let mut backend = Self {
            max_dimension: device.limits().max_texture_dimension_2d,
            device,
            queue,
            surface_format: gpu.surface_format(),
            msaa_counts,
            errors,
            pipelines,
            repeat_sampler,
            clamp_sampler,
            texture_groups: HashMap::new(),
            programs: Vec::new(),
            textures: Vec::new(),
            buffers: Vec::new(),
            vertex_arrays: Vec::new(),
            framebuffers: Vec::new(),
            white: TextureHandle(0),
            flat_normal: TextureHandle(0),
            far_depth: TextureHandle(0),
            window: None,
            window_depth: None,
            target: FramebufferTarget::Window,
            viewport: None,
            program: None,
            vertex_array: None,
            bound: [None; 3],
            uniforms: UniformBlock::default(),
            snapshots: Vec::new(),
            pending: Vec::new(),
            uniform_buffer: None,
        };

        backend.white = backend.create_texture(&ImageData::solid([255, 255, 255, 255]), TextureRole::Color)?;
        backend.flat_normal = backend.create_texture(&ImageData::solid([128, 128, 255, 255]), TextureRole::Normal)?;
        backend.far_depth = backend.create_far_depth()?;

        log::info!("wgpu back end ready (surface {:?}, msaa {:?})", backend.surface_format, backend.msaa_counts);
        Ok(backend)
    }

    /// Makes `view` the window target for the frame being recorded.
    pub fn attach_window(&mut self, view: wgpu::TextureView, size: (u32, u32)) {
        let size = (size.0.max(1), size.1.max(1));
        if self.window_depth.as_ref().map(|d| d.size) != Some(size) {
            let (_, view) = self.create_depth_texture("stereoworld window depth", size, 1, false);
            self.window_depth = Some(WindowDepth { view, size });
        }
        self.window = Some(WindowTarget { view, size });
    }

    /// Drops the window target; pending window work is discarded.
    pub fn detach_window(&mut self) {
        self.pending.retain(|pass| pass.target != FramebufferTarget::Window);
        self.window = None;
    }

    fn push_error(&self, message: String) {
        log::error!("{message}");
        if let Ok(mut queue) = self.errors.lock() {
            queue.push_back(message);
        }
    }

    fn take_error(&self) -> Option<String> {
        self.errors.lock().ok().and_then(|mut q| q.pop_front())
    }

    #[track_caller]
    fn fail_on_pending_error(&self) -> Result<(), RenderError> {
        match self.take_error() {
            Some(message) => Err(RenderError::resource(message)),
            None => Ok(()),
        }
    }

    fn push_texture(&mut self, view: wgpu::TextureView, kind: TextureKind) -> TextureHandle {
        self.textures.push(GpuTexture { view, kind });
        TextureHandle(self.textures.len() as u32 - 1)
    }

    fn create_depth_texture(
        &self,
        label: &str,
        (width, height): (u32, u32),
        samples: u32,
        sampled: bool,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
        if sampled {
            usage |= wgpu::TextureUsages::TEXTURE_BINDING;
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: samples,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    fn create_color_texture(
        &self,
        label: &str,
        (width, height): (u32, u32),
        samples: u32,
        usage: wgpu::TextureUsages,
    ) -> wgpu::TextureView {
        self.device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: samples,
                dimension: wgpu::TextureDimension::D2,
                format: EYE_FORMAT,
                usage,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// 1x1 depth texture cleared to the far plane, bound when no shadow map is.
    fn create_far_depth(&mut self) -> Result<TextureHandle, RenderError> {
        let (_, view) = self.create_depth_texture("stereoworld far depth", (1, 1), 1, true);
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("stereoworld far depth clear"),
        });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("stereoworld far depth clear"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        self.fail_on_pending_error()?;
        Ok(self.push_texture(view, TextureKind::Depth))
    }

    fn allocate_framebuffer(&self, desc: &FramebufferDesc) -> Result<Attachments, String> {
        if desc.width == 0 || desc.height == 0 {
            return Err("zero-sized framebuffer".into());
        }
        if desc.width > self.max_dimension || desc.height > self.max_dimension {
            return Err(format!(
                "framebuffer {}x{} exceeds the device limit of {}",
                desc.width, desc.height, self.max_dimension
            ));
        }
        if !self.msaa_counts.contains(&desc.samples) {
            return Err(format!("{} samples not supported (supported: {:?})", desc.samples, self.msaa_counts));
        }

        let size = (desc.width, desc.height);
        match desc.kind {
            FramebufferKind::Depth => {
                if desc.samples != 1 {
                    return Err("sampled depth target must be single-sample".into());
                }
                let (_, depth) = self.create_depth_texture("stereoworld shadow depth", size, 1, true);
                Ok(Attachments { color: None, resolve: None, depth })
            }
            FramebufferKind::ColorResolve => {
                let sampled = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
                let resolve = self.create_color_texture("stereoworld eye resolve", size, 1, sampled);
                let (_, depth) = self.create_depth_texture("stereoworld eye depth", size, desc.samples, false);
                if desc.samples == 1 {
                    return Ok(Attachments { color: Some(resolve), resolve: None, depth });
                }
                let color = self.create_color_texture(
                    "stereoworld eye color",
                    size,
                    desc.samples,
                    wgpu::TextureUsages::RENDER_ATTACHMENT,
                );
                Ok(Attachments { color: Some(color), resolve: Some(resolve), depth })
            }
        }
    }

    fn target_size(&self, target: FramebufferTarget) -> Option<(u32, u32)> {
        match target {
            FramebufferTarget::Window => self.window.as_ref().map(|w| w.size),
            FramebufferTarget::Offscreen(fb) => self.framebuffers.get(fb.index()).map(|f| (f.desc.width, f.desc.height)),
        }
    }

    fn target_format(&self, target: FramebufferTarget) -> Result<(Option<wgpu::TextureFormat>, u32), RenderError> {
        match target {
            FramebufferTarget::Window => Ok((Some(self.surface_format), 1)),
            FramebufferTarget::Offscreen(fb) => {
                let framebuffer = self
                    .framebuffers
                    .get(fb.index())
                    .ok_or_else(|| RenderError::resource(format!("unknown framebuffer {fb:?}")))?;
                if let Err(reason) = &framebuffer.attachments {
                    return Err(RenderError::resource(format!("framebuffer {fb:?} incomplete: {reason}")));
                }
                let color = match framebuffer.desc.kind {
                    FramebufferKind::ColorResolve => Some(EYE_FORMAT),
                    FramebufferKind::Depth => None,
                };
                Ok((color, framebuffer.desc.samples))
            }
        }
    }

    /// Pass that new commands for the bound target go into.
    fn current_pass(&mut self) -> &mut PendingPass {
        let reuse = self
            .pending
            .last()
            .is_some_and(|pass| pass.target == self.target && !pass.resolve);
        if !reuse {
            self.pending.push(PendingPass {
                target: self.target,
                clear: ClearRequest { color: None, depth: None },
                draws: Vec::new(),
                resolve: false,
            });
        }
        let last = self.pending.len() - 1;
        &mut self.pending[last]
    }

    fn texture_kind(&self, texture: TextureHandle) -> Option<TextureKind> {
        self.textures.get(texture.index()).map(|t| t.kind)
    }

    /// Resolves the bound textures for `kind`, substituting defaults.
    fn texture_set(&mut self, kind: ProgramKind) -> Result<Option<TextureKey>, RenderError> {
        let fallbacks = [self.white, self.flat_normal, self.far_depth];
        let expected = [TextureKind::Color, TextureKind::Color, TextureKind::Depth];

        let handles = match kind {
            ProgramKind::ShadowDepth => return Ok(None),
            ProgramKind::Mirror => [self.bound[0].unwrap_or(self.white), self.flat_normal, self.far_depth],
            ProgramKind::Lit => {
                let mut handles = fallbacks;
                for unit in TextureUnit::ALL {
                    if let Some(handle) = self.bound[unit.slot()] {
                        handles[unit.slot()] = handle;
                    }
                }
                handles
            }
        };

        for (slot, handle) in handles.iter().enumerate() {
            if self.texture_kind(*handle) != Some(expected[slot]) {
                return Err(RenderError::resource(format!(
                    "texture {handle:?} cannot be sampled from unit {:?}",
                    TextureUnit::ALL[slot]
                )));
            }
        }

        let key = (kind, handles);
        if !self.texture_groups.contains_key(&key) {
            let sampler = match kind {
                ProgramKind::Mirror => &self.clamp_sampler,
                _ => &self.repeat_sampler,
            };
            let view = |h: TextureHandle| &self.textures[h.index()].view;
            let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("stereoworld textures bind group"),
                layout: &self.pipelines.texture_layout,
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(view(handles[0])) },
                    wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(sampler) },
                    wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::TextureView(view(handles[1])) },
                    wgpu::BindGroupEntry { binding: 3, resource: wgpu::BindingResource::TextureView(view(handles[2])) },
                ],
            });
            self.texture_groups.insert(key, group);
        }
        Ok(Some(key))
    }

    fn ensure_uniform_capacity(&mut self) {
        let needed = (self.snapshots.len().max(1) as u64) * UNIFORM_STRIDE;
        if self.uniform_buffer.as_ref().is_some_and(|(_, cap, _)| *cap >= needed) {
            return;
        }
        let capacity = needed.next_power_of_two().max(64 * UNIFORM_STRIDE);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("stereoworld uniforms"),
            size: capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("stereoworld uniforms bind group"),
            layout: &self.pipelines.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<UniformBlock>() as u64),
                }),
            }],
        });
        self.uniform_buffer = Some((buffer, capacity, group));
    }

    /// Encodes and submits every pending pass in recording order.
    fn flush(&mut self) -> Result<(), RenderError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.ensure_uniform_capacity();
        let Some((uniform_buffer, _, uniform_group)) = self.uniform_buffer.as_ref() else {
            return Err(RenderError::resource("uniform buffer unavailable"));
        };

        let mut staged = vec![0u8; self.snapshots.len() * UNIFORM_STRIDE as usize];
        for (i, block) in self.snapshots.iter().enumerate() {
            let start = i * UNIFORM_STRIDE as usize;
            staged[start..start + std::mem::size_of::<UniformBlock>()].copy_from_slice(bytemuck::bytes_of(block));
        }
        if !staged.is_empty() {
            self.queue.write_buffer(uniform_buffer, 0, &staged);
        }

        let passes = std::mem::take(&mut self.pending);
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("stereoworld frame encoder"),
        });

        for pass in &passes {
            let (color_view, resolve_view, depth_view) = match pass.target {
                FramebufferTarget::Window => {
                    let (Some(window), Some(depth)) = (self.window.as_ref(), self.window_depth.as_ref()) else {
                        return Err(RenderError::resource("window target used without an attached surface"));
                    };
                    (Some(&window.view), None, &depth.view)
                }
                FramebufferTarget::Offscreen(fb) => {
                    let Some(Ok(attachments)) = self.framebuffers.get(fb.index()).map(|f| f.attachments.as_ref()) else {
                        return Err(RenderError::resource(format!("framebuffer {fb:?} is not renderable")));
                    };
                    let resolve = attachments.resolve.as_ref().filter(|_| pass.resolve);
                    (attachments.color.as_ref(), resolve, &attachments.depth)
                }
            };

            let color_load = match pass.clear.color {
                Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                    r: r as f64,
                    g: g as f64,
                    b: b as f64,
                    a: a as f64,
                }),
                None => wgpu::LoadOp::Load,
            };
            let depth_load = match pass.clear.depth {
                Some(d) => wgpu::LoadOp::Clear(d),
                None => wgpu::LoadOp::Load,
            };

            let color_attachment = color_view.map(|view| wgpu::RenderPassColorAttachment {
                view,
                resolve_target: resolve_view,
                ops: wgpu::Operations { load: color_load, store: wgpu::StoreOp::Store },
                depth_slice: None,
            });
            let color_attachments = [color_attachment];
            let color_attachments: &[Option<wgpu::RenderPassColorAttachment<'_>>] =
                if color_view.is_some() { &color_attachments } else { &[] };

            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("stereoworld pass"),
                color_attachments,
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations { load: depth_load, store: wgpu::StoreOp::Store }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for draw in &pass.draws {
                let Some(pipeline) = self.pipelines.get(&draw.pipeline) else { continue };
                let vp = draw.viewport;
                rpass.set_pipeline(pipeline);
                rpass.set_viewport(vp.x as f32, vp.y as f32, vp.width as f32, vp.height as f32, 0.0, 1.0);
                let offset = draw.uniform_slot * UNIFORM_STRIDE as u32;
                rpass.set_bind_group(0, uniform_group, &[offset]);
                if let Some(group) = draw.textures.as_ref().and_then(|key| self.texture_groups.get(key)) {
                    rpass.set_bind_group(1, group, &[]);
                }
                rpass.set_vertex_buffer(0, self.buffers[draw.vertices.index()].buffer.slice(..));
                rpass.set_index_buffer(self.buffers[draw.indices.index()].buffer.slice(..), wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(0..draw.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        self.snapshots.clear();
        self.fail_on_pending_error()
    }
}

impl GpuBackend for WgpuBackend {
    fn create_program(&mut self, kind: ProgramKind) -> Result<ProgramHandle, RenderError> {
        self.pipelines.ensure_module(&self.device, kind);
        self.fail_on_pending_error()?;
        self.programs.push(kind);
        Ok(ProgramHandle(self.programs.len() as u32 - 1))
    }

    fn create_texture(&mut self, image: &ImageData, role: TextureRole) -> Result<TextureHandle, RenderError> {
        let expected = image.width as usize * image.height as usize * 4;
        if image.width == 0 || image.height == 0 || image.pixels.len() != expected {
            return Err(RenderError::resource(format!(
                "texture {}x{} with {} bytes of pixel data",
                image.width,
                image.height,
                image.pixels.len()
            )));
        }
        let format = match role {
            TextureRole::Color => wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureRole::Normal => wgpu::TextureFormat::Rgba8Unorm,
        };
        let size = wgpu::Extent3d { width: image.width, height: image.height, depth_or_array_layers: 1 };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("stereoworld material texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );
        self.fail_on_pending_error()?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(self.push_texture(view, TextureKind::Color))
    }

    fn create_vertex_buffer(&mut self, vertices: &[RawVertex]) -> Result<BufferHandle, RenderError> {
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("stereoworld material vbo"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        self.fail_on_pending_error()?;
        self.buffers.push(GpuBuffer { buffer, len: vertices.len() as u32 });
        Ok(BufferHandle(self.buffers.len() as u32 - 1))
    }

    fn create_index_buffer(&mut self, indices: &[u32]) -> Result<BufferHandle, RenderError> {
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("stereoworld material ibo"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.fail_on_pending_error()?;
        self.buffers.push(GpuBuffer { buffer, len: indices.len() as u32 });
        Ok(BufferHandle(self.buffers.len() as u32 - 1))
    }

    fn create_vertex_array(
        &mut self,
        vertices: BufferHandle,
        indices: BufferHandle,
    ) -> Result<VertexArrayHandle, RenderError> {
        if vertices.index() >= self.buffers.len() || indices.index() >= self.buffers.len() {
            return Err(RenderError::resource("vertex array references an unknown buffer"));
        }
        self.vertex_arrays.push((vertices, indices));
        Ok(VertexArrayHandle(self.vertex_arrays.len() as u32 - 1))
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> Result<FramebufferHandle, RenderError> {
        let attachments = self.allocate_framebuffer(desc);
        let texture = match &attachments {
            Ok(Attachments { resolve: Some(view), .. }) => Some(self.push_texture(view.clone(), TextureKind::Color)),
            Ok(Attachments { color: Some(view), resolve: None, .. }) => {
                Some(self.push_texture(view.clone(), TextureKind::Color))
            }
            Ok(Attachments { color: None, depth, .. }) => Some(self.push_texture(depth.clone(), TextureKind::Depth)),
            Err(_) => None,
        };
        self.framebuffers.push(GpuFramebuffer { desc: *desc, attachments, texture });
        Ok(FramebufferHandle(self.framebuffers.len() as u32 - 1))
    }

    fn check_framebuffer_complete(&mut self, framebuffer: FramebufferHandle) -> Result<(), RenderError> {
        let fb = self
            .framebuffers
            .get(framebuffer.index())
            .ok_or_else(|| RenderError::resource(format!("unknown framebuffer {framebuffer:?}")))?;
        if let Err(reason) = &fb.attachments {
            return Err(RenderError::resource(format!("framebuffer {framebuffer:?} incomplete: {reason}")));
        }
        self.fail_on_pending_error()
    }

    fn framebuffer_texture(&self, framebuffer: FramebufferHandle) -> Option<TextureHandle> {
        self.framebuffers.get(framebuffer.index()).and_then(|fb| fb.texture)
    }

    fn surface_size(&self) -> (u32, u32) {
        self.window.as_ref().map_or((1, 1), |w| w.size)
    }

    fn bind_framebuffer(&mut self, target: FramebufferTarget) {
        self.target = target;
        self.viewport = None;
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    fn clear(&mut self, request: ClearRequest) {
        let pass = self.current_pass();
        if !pass.draws.is_empty() {
            // Clearing after draws needs a fresh load op.
            let target = pass.target;
            self.pending.push(PendingPass {
                target,
                clear: request,
                draws: Vec::new(),
                resolve: false,
            });
            return;
        }
        if request.color.is_some() {
            pass.clear.color = request.color;
        }
        if request.depth.is_some() {
            pass.clear.depth = request.depth;
        }
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.program = Some(program);
    }

    fn set_uniform(&mut self, uniform: Uniform, value: UniformValue) {
        if let Err(message) = self.uniforms.set(uniform, value) {
            self.push_error(message);
        }
    }

    fn bind_texture(&mut self, unit: TextureUnit, texture: TextureHandle) {
        self.bound[unit.slot()] = Some(texture);
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.vertex_array = Some(vertex_array);
    }

    fn draw_indexed(&mut self, index_count: u32) -> Result<(), RenderError> {
        self.fail_on_pending_error()?;

        let kind = self
            .program
            .and_then(|p| self.programs.get(p.index()).copied())
            .ok_or_else(|| RenderError::resource("draw without a program"))?;
        let (vertices, indices) = self
            .vertex_array
            .and_then(|v| self.vertex_arrays.get(v.index()).copied())
            .ok_or_else(|| RenderError::resource("draw without a vertex array"))?;
        let available = self.buffers[indices.index()].len;
        if index_count > available {
            return Err(RenderError::resource(format!(
                "draw of {index_count} indices from a buffer of {available}"
            )));
        }

        let (color, samples) = self.target_format(self.target)?;
        if color.is_some() == (kind == ProgramKind::ShadowDepth) {
            return Err(RenderError::resource(format!("{kind:?} program cannot draw into {:?}", self.target)));
        }
        let pipeline = PipelineKey { kind, color, samples };
        self.pipelines.ensure_pipeline(&self.device, pipeline);
        self.fail_on_pending_error()?;

        let textures = self.texture_set(kind)?;

        let (width, height) = self.target_size(self.target).unwrap_or((1, 1));
        let viewport = self.viewport.unwrap_or(Viewport::sized(width, height));
        let viewport = Viewport {
            x: viewport.x.min(width - 1),
            y: viewport.y.min(height - 1),
            width: viewport.width.clamp(1, width - viewport.x.min(width - 1)),
            height: viewport.height.clamp(1, height - viewport.y.min(height - 1)),
        };

        self.snapshots.push(self.uniforms);
        let uniform_slot = self.snapshots.len() as u32 - 1;
        self.current_pass().draws.push(PendingDraw {
            pipeline,
            viewport,
            uniform_slot,
            textures,
            vertices,
            indices,
            index_count,
        });
        Ok(())
    }

    fn resolve_framebuffer(&mut self, framebuffer: FramebufferHandle) -> Result<(), RenderError> {
        let fb = self
            .framebuffers
            .get(framebuffer.index())
            .ok_or_else(|| RenderError::resource(format!("unknown framebuffer {framebuffer:?}")))?;
        if fb.desc.kind != FramebufferKind::ColorResolve {
            return Err(RenderError::resource("only color targets can be resolved"));
        }
        let target = FramebufferTarget::Offscreen(framebuffer);
        match self.pending.last_mut() {
            Some(pass) if pass.target == target && !pass.resolve => pass.resolve = true,
            _ => self.pending.push(PendingPass {
                target,
                clear: ClearRequest { color: None, depth: None },
                draws: Vec::new(),
                resolve: true,
            }),
        }
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        if self.window.is_none() {
            return Err(RenderError::resource("present without an attached surface"));
        }
        if !self.pending.iter().any(|p| p.target == FramebufferTarget::Window) {
            self.pending.push(PendingPass {
                target: FramebufferTarget::Window,
                clear: ClearRequest { color: None, depth: None },
                draws: Vec::new(),
                resolve: false,
            });
        }
        self.flush()
    }

    fn poll_error(&mut self) -> Option<String> {
        self.take_error()
    }
}
