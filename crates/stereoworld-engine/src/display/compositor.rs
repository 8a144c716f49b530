use stereoworld_scene::RawVertex;

use super::{Eye, EyePair};
use crate::error::RenderError;
use crate::gpu::{
    ClearRequest, FramebufferTarget, GpuBackend, ProgramHandle, ProgramKind, TextureHandle, TextureUnit,
    VertexArrayHandle, Viewport,
};

/// Consumer of finished stereo frames.
pub trait Compositor {
    /// Per-eye render target size the compositor wants.
    fn recommended_size(&self) -> (u32, u32);

    /// Hands over both resolved eye images. Called once per frame with a
    /// complete pair.
    fn submit(&mut self, backend: &mut dyn GpuBackend, eyes: EyePair<TextureHandle>) -> Result<(), RenderError>;
}

/// Draws both eyes side by side into the companion window.
pub struct MirrorCompositor {
    eye_size: (u32, u32),
    program: ProgramHandle,
    quad: VertexArrayHandle,
    clear_color: [f32; 4],
}

const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 1, 3];

fn quad_vertex(x: f32, y: f32, u: f32, v: f32) -> RawVertex {
    RawVertex {
        position: [x, y, 0.0, 1.0],
        normal: [0.0, 0.0, 1.0],
        uv: [u, v],
        tangent: [1.0, 0.0, 0.0],
        bitangent: [0.0, 1.0, 0.0],
    }
}

impl MirrorCompositor {
    pub fn new(backend: &mut dyn GpuBackend, eye_size: (u32, u32), clear_color: [f32; 4]) -> Result<Self, RenderError> {
        let program = backend.create_program(ProgramKind::Mirror)?;

        // Texture rows run top to bottom, clip space y runs up.
        let vertices = [
            quad_vertex(-1.0, -1.0, 0.0, 1.0),
            quad_vertex(1.0, -1.0, 1.0, 1.0),
            quad_vertex(-1.0, 1.0, 0.0, 0.0),
            quad_vertex(1.0, 1.0, 1.0, 0.0),
        ];
        let vbo = backend.create_vertex_buffer(&vertices)?;
        let ibo = backend.create_index_buffer(&QUAD_INDICES)?;
        let quad = backend.create_vertex_array(vbo, ibo)?;

        Ok(Self { eye_size, program, quad, clear_color })
    }

    /// Left half for the left eye, right half for the right eye.
    fn half(eye: Eye, (width, height): (u32, u32)) -> Viewport {
        let half = width / 2;
        match eye {
            Eye::Left => Viewport { x: 0, y: 0, width: half, height },
            Eye::Right => Viewport { x: half, y: 0, width: width - half, height },
        }
    }
}

impl Compositor for MirrorCompositor {
    fn recommended_size(&self) -> (u32, u32) {
        self.eye_size
    }

    fn submit(&mut self, backend: &mut dyn GpuBackend, eyes: EyePair<TextureHandle>) -> Result<(), RenderError> {
        let window = backend.surface_size();
        backend.bind_framebuffer(FramebufferTarget::Window);
        backend.set_viewport(Viewport::sized(window.0, window.1));
        backend.clear(ClearRequest::color_and_depth(self.clear_color));

        for eye in [Eye::Left, Eye::Right] {
            backend.set_viewport(Self::half(eye, window));
            backend.use_program(self.program);
            backend.bind_texture(TextureUnit::Diffuse, *eyes.get(eye));
            backend.bind_vertex_array(self.quad);
            backend.draw_indexed(QUAD_INDICES.len() as u32)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{GpuOp, RecordingBackend};

    #[test]
    fn halves_cover_odd_widths() {
        let left = MirrorCompositor::half(Eye::Left, (501, 500));
        let right = MirrorCompositor::half(Eye::Right, (501, 500));
        assert_eq!(left.width + right.width, 501);
        assert_eq!(right.x, left.width);
    }

    #[test]
    fn submit_draws_each_eye_into_the_window() {
        let mut backend = RecordingBackend::new(1000, 500);
        let mut compositor = MirrorCompositor::new(&mut backend, (1080, 1200), [0.0; 4]).unwrap();
        let eyes = EyePair::new(TextureHandle(7), TextureHandle(8));

        compositor.submit(&mut backend, eyes).unwrap();

        assert_eq!(backend.draws(), vec![(FramebufferTarget::Window, 6), (FramebufferTarget::Window, 6)]);
        let left = backend.position(|op| *op == GpuOp::BindTexture(TextureUnit::Diffuse, TextureHandle(7)));
        let right = backend.position(|op| *op == GpuOp::BindTexture(TextureUnit::Diffuse, TextureHandle(8)));
        assert!(left.unwrap() < right.unwrap());
    }
}
