use std::collections::{HashSet, VecDeque};

use stereoworld_scene::{RawVertex, TextureRole};

use super::{
    BufferHandle, ClearRequest, FramebufferDesc, FramebufferHandle, FramebufferKind,
    FramebufferTarget, GpuBackend, ProgramHandle, ProgramKind, TextureHandle, TextureUnit, Uniform,
    UniformValue, VertexArrayHandle, Viewport,
};
use crate::error::RenderError;
use crate::texture::ImageData;

/// One call made against a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum GpuOp {
    CreateProgram(ProgramKind),
    CreateTexture { width: u32, height: u32, role: TextureRole },
    CreateVertexBuffer { vertices: usize },
    CreateIndexBuffer { indices: usize },
    CreateVertexArray(VertexArrayHandle),
    CreateFramebuffer(FramebufferDesc),
    CheckFramebuffer(FramebufferHandle),
    BindFramebuffer(FramebufferTarget),
    SetViewport(Viewport),
    Clear(ClearRequest),
    UseProgram(ProgramHandle),
    SetUniform(Uniform, UniformValue),
    BindTexture(TextureUnit, TextureHandle),
    BindVertexArray(VertexArrayHandle),
    DrawIndexed { target: FramebufferTarget, index_count: u32 },
    Resolve(FramebufferHandle),
    Present,
}

struct RecordedFramebuffer {
    desc: FramebufferDesc,
    texture: TextureHandle,
}

/// Headless back end that records every call.
///
/// Validates handles the way a real driver would (unknown handles, missing
/// bindings, out-of-range draws) and supports fault injection for tests.
pub struct RecordingBackend {
    ops: Vec<GpuOp>,
    errors: VecDeque<String>,
    surface: (u32, u32),

    programs: Vec<ProgramKind>,
    textures: u32,
    buffers: Vec<usize>,
    vertex_arrays: Vec<(BufferHandle, BufferHandle)>,
    framebuffers: Vec<RecordedFramebuffer>,

    target: FramebufferTarget,
    program: Option<ProgramHandle>,
    vertex_array: Option<VertexArrayHandle>,

    failing_targets: HashSet<FramebufferTarget>,
    incomplete_framebuffers: bool,
    failing_vertex_buffers: bool,
}

impl RecordingBackend {
    pub fn new(surface_width: u32, surface_height: u32) -> Self {
        Self {
            ops: Vec::new(),
            errors: VecDeque::new(),
            surface: (surface_width, surface_height),
            programs: Vec::new(),
            textures: 0,
            buffers: Vec::new(),
            vertex_arrays: Vec::new(),
            framebuffers: Vec::new(),
            target: FramebufferTarget::Window,
            program: None,
            vertex_array: None,
            failing_targets: HashSet::new(),
            incomplete_framebuffers: false,
            failing_vertex_buffers: false,
        }
    }

    // ── inspection ────────────────────────────────────────────────────────

    pub fn ops(&self) -> &[GpuOp] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// `(target, index_count)` of every successful draw, in order.
    pub fn draws(&self) -> Vec<(FramebufferTarget, u32)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                GpuOp::DrawIndexed { target, index_count } => Some((*target, *index_count)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&GpuOp) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    pub fn position(&self, pred: impl Fn(&GpuOp) -> bool) -> Option<usize> {
        self.ops.iter().position(pred)
    }

    // ── fault injection ───────────────────────────────────────────────────

    /// Every draw on `target` fails from now on.
    pub fn fail_draws_on(&mut self, target: FramebufferTarget) {
        self.failing_targets.insert(target);
    }

    /// Every completeness check fails from now on.
    pub fn fail_framebuffer_completeness(&mut self) {
        self.incomplete_framebuffers = true;
    }

    pub fn fail_vertex_buffers(&mut self) {
        self.failing_vertex_buffers = true;
    }

    /// Queues an error for [`GpuBackend::poll_error`].
    pub fn inject_error(&mut self, message: impl Into<String>) {
        self.errors.push_back(message.into());
    }

    fn framebuffer(&self, fb: FramebufferHandle) -> Result<&RecordedFramebuffer, RenderError> {
        self.framebuffers
            .get(fb.index())
            .ok_or_else(|| RenderError::resource(format!("unknown framebuffer {fb:?}")))
    }

    fn next_texture(&mut self) -> TextureHandle {
        let handle = TextureHandle(self.textures);
        self.textures += 1;
        handle
    }

    fn next_buffer(&mut self, len: usize) -> BufferHandle {
        self.buffers.push(len);
        BufferHandle(self.buffers.len() as u32 - 1)
    }
}

impl GpuBackend for RecordingBackend {
    fn create_program(&mut self, kind: ProgramKind) -> Result<ProgramHandle, RenderError> {
        self.ops.push(GpuOp::CreateProgram(kind));
        self.programs.push(kind);
        Ok(ProgramHandle(self.programs.len() as u32 - 1))
    }

    fn create_texture(&mut self, image: &ImageData, role: TextureRole) -> Result<TextureHandle, RenderError> {
        if image.width == 0 || image.height == 0 {
            return Err(RenderError::resource("zero-sized texture"));
        }
        self.ops.push(GpuOp::CreateTexture { width: image.width, height: image.height, role });
        Ok(self.next_texture())
    }

    fn create_vertex_buffer(&mut self, vertices: &[RawVertex]) -> Result<BufferHandle, RenderError> {
        if self.failing_vertex_buffers {
            return Err(RenderError::resource("vertex buffer allocation failed"));
        }
        self.ops.push(GpuOp::CreateVertexBuffer { vertices: vertices.len() });
        Ok(self.next_buffer(vertices.len()))
    }

    fn create_index_buffer(&mut self, indices: &[u32]) -> Result<BufferHandle, RenderError> {
        self.ops.push(GpuOp::CreateIndexBuffer { indices: indices.len() });
        Ok(self.next_buffer(indices.len()))
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
        let handle = VertexArrayHandle(self.vertex_arrays.len() as u32 - 1);
        self.ops.push(GpuOp::CreateVertexArray(handle));
        Ok(handle)
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> Result<FramebufferHandle, RenderError> {
        self.ops.push(GpuOp::CreateFramebuffer(*desc));
        let texture = self.next_texture();
        self.framebuffers.push(RecordedFramebuffer { desc: *desc, texture });
        Ok(FramebufferHandle(self.framebuffers.len() as u32 - 1))
    }

    fn check_framebuffer_complete(&mut self, framebuffer: FramebufferHandle) -> Result<(), RenderError> {
        self.ops.push(GpuOp::CheckFramebuffer(framebuffer));
        let desc = self.framebuffer(framebuffer)?.desc;
        if self.incomplete_framebuffers {
            return Err(RenderError::resource(format!("framebuffer {framebuffer:?} incomplete")));
        }
        if desc.kind == FramebufferKind::Depth && desc.samples != 1 {
            return Err(RenderError::resource("sampled depth target must be single-sample"));
        }
        Ok(())
    }

    fn framebuffer_texture(&self, framebuffer: FramebufferHandle) -> Option<TextureHandle> {
        self.framebuffers.get(framebuffer.index()).map(|fb| fb.texture)
    }

    fn surface_size(&self) -> (u32, u32) {
        self.surface
    }

    fn bind_framebuffer(&mut self, target: FramebufferTarget) {
        self.ops.push(GpuOp::BindFramebuffer(target));
        self.target = target;
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.ops.push(GpuOp::SetViewport(viewport));
    }

    fn clear(&mut self, request: ClearRequest) {
        self.ops.push(GpuOp::Clear(request));
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.ops.push(GpuOp::UseProgram(program));
        self.program = Some(program);
    }

    fn set_uniform(&mut self, uniform: Uniform, value: UniformValue) {
        self.ops.push(GpuOp::SetUniform(uniform, value));
    }

    fn bind_texture(&mut self, unit: TextureUnit, texture: TextureHandle) {
        self.ops.push(GpuOp::BindTexture(unit, texture));
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.ops.push(GpuOp::BindVertexArray(vertex_array));
        self.vertex_array = Some(vertex_array);
    }

    fn draw_indexed(&mut self, index_count: u32) -> Result<(), RenderError> {
        if self.failing_targets.contains(&self.target) {
            return Err(RenderError::resource(format!("draw on {:?} failed", self.target)));
        }
        if self.program.is_none() {
            return Err(RenderError::resource("draw without a program"));
        }
        let vao = self
            .vertex_array
            .ok_or_else(|| RenderError::resource("draw without a vertex array"))?;
        let (_, ibo) = self
            .vertex_arrays
            .get(vao.index())
            .copied()
            .ok_or_else(|| RenderError::resource(format!("unknown vertex array {vao:?}")))?;
        let available = self.buffers[ibo.index()];
        if index_count as usize > available {
            return Err(RenderError::resource(format!(
                "draw of {index_count} indices from a buffer of {available}"
            )));
        }

        self.ops.push(GpuOp::DrawIndexed { target: self.target, index_count });
        Ok(())
    }

    fn resolve_framebuffer(&mut self, framebuffer: FramebufferHandle) -> Result<(), RenderError> {
        if self.framebuffer(framebuffer)?.desc.kind != FramebufferKind::ColorResolve {
            return Err(RenderError::resource("only color targets can be resolved"));
        }
        self.ops.push(GpuOp::Resolve(framebuffer));
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        self.ops.push(GpuOp::Present);
        Ok(())
    }

    fn poll_error(&mut self) -> Option<String> {
        self.errors.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(backend: &mut RecordingBackend) -> VertexArrayHandle {
        let vbo = backend.create_vertex_buffer(&[<RawVertex as bytemuck::Zeroable>::zeroed(); 4]).unwrap();
        let ibo = backend.create_index_buffer(&[0, 1, 2, 1, 2, 3]).unwrap();
        backend.create_vertex_array(vbo, ibo).unwrap()
    }

    #[test]
    fn draws_record_their_target() {
        let mut b = RecordingBackend::new(100, 100);
        let program = b.create_program(ProgramKind::Lit).unwrap();
        let vao = quad(&mut b);
        b.use_program(program);
        b.bind_vertex_array(vao);
        b.draw_indexed(6).unwrap();
        assert_eq!(b.draws(), vec![(FramebufferTarget::Window, 6)]);
    }

    #[test]
    fn draw_past_index_buffer_is_rejected() {
        let mut b = RecordingBackend::new(100, 100);
        let program = b.create_program(ProgramKind::Lit).unwrap();
        let vao = quad(&mut b);
        b.use_program(program);
        b.bind_vertex_array(vao);
        assert!(b.draw_indexed(7).is_err());
    }

    #[test]
    fn draw_without_vertex_array_is_rejected() {
        let mut b = RecordingBackend::new(100, 100);
        let program = b.create_program(ProgramKind::Lit).unwrap();
        b.use_program(program);
        assert!(b.draw_indexed(3).is_err());
    }

    #[test]
    fn injected_draw_fault_is_target_specific() {
        let mut b = RecordingBackend::new(100, 100);
        let fb = b
            .create_framebuffer(&FramebufferDesc {
                width: 8,
                height: 8,
                samples: 4,
                kind: FramebufferKind::ColorResolve,
            })
            .unwrap();
        b.fail_draws_on(FramebufferTarget::Offscreen(fb));

        let program = b.create_program(ProgramKind::Lit).unwrap();
        let vao = quad(&mut b);
        b.use_program(program);
        b.bind_vertex_array(vao);

        b.bind_framebuffer(FramebufferTarget::Offscreen(fb));
        assert!(b.draw_indexed(6).is_err());
        b.bind_framebuffer(FramebufferTarget::Window);
        assert!(b.draw_indexed(6).is_ok());
    }

    #[test]
    fn depth_targets_cannot_be_resolved() {
        let mut b = RecordingBackend::new(100, 100);
        let fb = b
            .create_framebuffer(&FramebufferDesc { width: 8, height: 8, samples: 1, kind: FramebufferKind::Depth })
            .unwrap();
        assert!(b.check_framebuffer_complete(fb).is_ok());
        assert!(b.resolve_framebuffer(fb).is_err());
    }
}
