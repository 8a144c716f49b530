use glam::Mat4;

use super::GpuScene;
use crate::error::RenderError;
use crate::gpu::{
    ClearRequest, FramebufferDesc, FramebufferHandle, FramebufferKind, FramebufferTarget, GpuBackend,
    ProgramHandle, ProgramKind, TextureHandle, Uniform, UniformValue, Viewport,
};

/// Depth map seen from the fixed shadow light.
///
/// Rendered once after upload; the light never moves, so neither does the map.
#[derive(Debug, Clone, Copy)]
pub struct ShadowMap {
    framebuffer: FramebufferHandle,
    texture: TextureHandle,
    program: ProgramHandle,
    size: u32,
    light_space: Mat4,
}

impl ShadowMap {
    pub fn new(backend: &mut dyn GpuBackend, size: u32, light_space: Mat4) -> Result<Self, RenderError> {
        let program = backend.create_program(ProgramKind::ShadowDepth)?;
        let framebuffer = backend.create_framebuffer(&FramebufferDesc {
            width: size,
            height: size,
            samples: 1,
            kind: FramebufferKind::Depth,
        })?;
        backend.check_framebuffer_complete(framebuffer)?;
        let texture = backend
            .framebuffer_texture(framebuffer)
            .ok_or_else(|| RenderError::resource("shadow framebuffer has no depth texture"))?;

        Ok(Self { framebuffer, texture, program, size, light_space })
    }

    /// Sampled by the lit program on [`crate::gpu::TextureUnit::ShadowMap`].
    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    pub fn light_space(&self) -> Mat4 {
        self.light_space
    }

    /// Draws every material's geometry into the depth map.
    pub fn render(&self, backend: &mut dyn GpuBackend, scene: &GpuScene) -> Result<(), RenderError> {
        backend.bind_framebuffer(FramebufferTarget::Offscreen(self.framebuffer));
        backend.set_viewport(Viewport::sized(self.size, self.size));
        backend.clear(ClearRequest::depth_only());
        backend.use_program(self.program);
        backend.set_uniform(Uniform::LightSpace, UniformValue::Mat4(self.light_space));

        for (vao, index_count) in scene.vertex_arrays() {
            backend.bind_vertex_array(vao);
            backend.draw_indexed(index_count)?;
        }
        log::debug!("shadow map rendered ({0}x{0}, {1} materials)", self.size, scene.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{GpuOp, RecordingBackend};
    use crate::renderer::upload_scene;
    use crate::testing::{SolidImages, table_scene};

    #[test]
    fn depth_target_is_single_sample_and_square() {
        let mut backend = RecordingBackend::new(10, 10);
        ShadowMap::new(&mut backend, 1024, Mat4::IDENTITY).unwrap();
        assert!(backend.ops().contains(&GpuOp::CreateFramebuffer(FramebufferDesc {
            width: 1024,
            height: 1024,
            samples: 1,
            kind: FramebufferKind::Depth,
        })));
    }

    #[test]
    fn every_material_lands_in_the_depth_map() {
        let (registry, scene) = table_scene();
        let mut backend = RecordingBackend::new(10, 10);
        let gpu = upload_scene(&mut backend, &scene, &registry, &mut SolidImages).unwrap();
        let shadow = ShadowMap::new(&mut backend, 256, Mat4::IDENTITY).unwrap();
        backend.clear_ops();

        shadow.render(&mut backend, &gpu).unwrap();

        let target = FramebufferTarget::Offscreen(shadow.framebuffer);
        let draws = backend.draws();
        assert_eq!(draws.len(), gpu.len());
        assert!(draws.iter().all(|(t, _)| *t == target));
        assert!(backend.ops().contains(&GpuOp::Clear(ClearRequest::depth_only())));
    }
}
