use glam::Mat4;

use crate::gpu::{FramebufferHandle, FramebufferTarget, TextureHandle, Viewport};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    /// Render order within a stereo frame.
    pub const ORDER: [Eye; 2] = [Eye::Right, Eye::Left];
}

/// One value per eye.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct EyePair<T> {
    pub left: T,
    pub right: T,
}

impl<T> EyePair<T> {
    pub fn new(left: T, right: T) -> Self {
        Self { left, right }
    }

    pub fn get(&self, eye: Eye) -> &T {
        match eye {
            Eye::Left => &self.left,
            Eye::Right => &self.right,
        }
    }

    pub fn get_mut(&mut self, eye: Eye) -> &mut T {
        match eye {
            Eye::Left => &mut self.left,
            Eye::Right => &mut self.right,
        }
    }
}

/// Where one view renders: target, viewport and fixed projection.
///
/// Mono uses one over the window; stereo uses two over offscreen targets.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EyeTarget {
    pub target: FramebufferTarget,
    /// Framebuffer to resolve after drawing, if multisampled.
    pub resolve: Option<FramebufferHandle>,
    /// Texture holding the finished image, for offscreen targets.
    pub texture: Option<TextureHandle>,
    pub viewport: Viewport,
    pub projection: Mat4,
}
