//! Display targets.
//!
//! A [`Display`] turns the bound material into pixels for one output. The
//! orchestrator drives every display through the same three steps per frame:
//!
//! ```text
//! prepare(pose)            once, before any material
//! redraw(shader, count)    once per material
//! swap()                   once, after the last material
//! ```
//!
//! [`MonoDisplay`] draws straight into the window. [`StereoDisplay`] draws
//! each material into two multisampled eye targets, resolves them, and hands
//! both resolved images to a [`Compositor`] as one pair.

mod compositor;
mod eye;
mod mono;
mod stereo;

use glam::Mat4;

use crate::error::RenderError;
use crate::gpu::GpuBackend;
use crate::pose::PoseProvider;
use crate::shader::ShaderBinding;

pub use self::compositor::{Compositor, MirrorCompositor};
pub use self::eye::{Eye, EyePair, EyeTarget};
pub use self::mono::MonoDisplay;
pub use self::stereo::StereoDisplay;

/// Consecutive pose failures between repeated warnings.
const POSE_WARN_INTERVAL: u32 = 120;

pub trait Display {
    /// Reads the pose, clears the targets and loads the per-view uniforms.
    fn prepare(
        &mut self,
        backend: &mut dyn GpuBackend,
        pose: &mut dyn PoseProvider,
        shader: &ShaderBinding,
    ) -> Result<(), RenderError>;

    /// Draws `index_count` indices of the currently bound vertex array.
    fn redraw(
        &mut self,
        backend: &mut dyn GpuBackend,
        shader: &ShaderBinding,
        index_count: u32,
    ) -> Result<(), RenderError>;

    /// Presents the finished frame.
    fn swap(&mut self, backend: &mut dyn GpuBackend) -> Result<(), RenderError>;
}

/// Last good view transform, reused while the pose source has nothing new.
#[derive(Debug, Clone)]
pub(crate) struct PoseTracker {
    last: Mat4,
    failures: u32,
}

impl PoseTracker {
    pub fn new() -> Self {
        Self { last: Mat4::IDENTITY, failures: 0 }
    }

    /// Current transform, or the previous one when the provider has none.
    pub fn acquire(&mut self, pose: &mut dyn PoseProvider) -> Mat4 {
        match pose.view_transform() {
            Ok(xfm) => {
                if self.failures > 0 {
                    log::info!("pose recovered after {} frame(s)", self.failures);
                }
                self.failures = 0;
                self.last = xfm;
            }
            Err(err) => {
                if self.record_failure() {
                    log::warn!("{err}; reusing the previous transform");
                }
            }
        }
        self.last
    }

    /// Counts one failed read; true on the first failure of each interval.
    fn record_failure(&mut self) -> bool {
        let warn = self.failures % POSE_WARN_INTERVAL == 0;
        self.failures = self.failures.saturating_add(1);
        warn
    }

    #[cfg(test)]
    pub fn failures(&self) -> u32 {
        self.failures
    }
}
