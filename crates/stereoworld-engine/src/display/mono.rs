use glam::Mat4;

use super::{Display, EyeTarget, PoseTracker};
use crate::config::MonoConfig;
use crate::error::RenderError;
use crate::gpu::{ClearRequest, FramebufferTarget, GpuBackend, Viewport};
use crate::pose::PoseProvider;
use crate::shader::ShaderBinding;

/// Single view straight into the window.
pub struct MonoDisplay {
    eye: EyeTarget,
    /// Fixed camera placed behind the origin.
    camera: Mat4,
    clear_color: [f32; 4],
    pose: PoseTracker,
}

impl MonoDisplay {
    pub fn new(config: &MonoConfig, clear_color: [f32; 4]) -> Self {
        Self {
            eye: EyeTarget {
                target: FramebufferTarget::Window,
                resolve: None,
                texture: None,
                viewport: Viewport::sized(config.width, config.height),
                projection: config.projection(),
            },
            camera: config.view(),
            clear_color,
            pose: PoseTracker::new(),
        }
    }
}

impl Display for MonoDisplay {
    fn prepare(
        &mut self,
        backend: &mut dyn GpuBackend,
        pose: &mut dyn PoseProvider,
        shader: &ShaderBinding,
    ) -> Result<(), RenderError> {
        let (width, height) = backend.surface_size();
        self.eye.viewport = Viewport::sized(width, height);

        backend.bind_framebuffer(self.eye.target);
        backend.set_viewport(self.eye.viewport);
        backend.clear(ClearRequest::color_and_depth(self.clear_color));

        let xfm = self.pose.acquire(pose);
        let abs_pos = xfm.w_axis.truncate();
        shader.run(backend, self.eye.projection * self.camera * xfm, abs_pos);
        Ok(())
    }

    fn redraw(
        &mut self,
        backend: &mut dyn GpuBackend,
        _shader: &ShaderBinding,
        index_count: u32,
    ) -> Result<(), RenderError> {
        backend.draw_indexed(index_count)
    }

    fn swap(&mut self, backend: &mut dyn GpuBackend) -> Result<(), RenderError> {
        backend.present()
    }
}
