//! GPU back-end abstraction.
//!
//! Display targets and the renderer talk to the GPU only through
//! [`GpuBackend`]: opaque handles, bind-then-draw state calls and a poll-style
//! error channel. Two implementations exist:
//! - [`WgpuBackend`] records state calls into per-target draw queues and
//!   encodes them as wgpu render passes on resolve/present
//! - [`RecordingBackend`] logs every call as a [`GpuOp`] and can inject faults
//!
//! Convention: bind right before use, every time. No implementation may
//! assume state survives between draws issued by different callers.

mod recording;
mod wgpu_backend;

use std::panic::Location;

use glam::{Mat3, Mat4, Vec3, Vec4};
use stereoworld_scene::{RawVertex, TextureRole};

use crate::error::RenderError;
use crate::texture::ImageData;

pub use self::recording::{GpuOp, RecordingBackend};
pub use self::wgpu_backend::WgpuBackend;

macro_rules! handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) u32);

        impl $name {
            #[inline]
            pub(crate) fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

handle!(
    /// Linked shader program.
    ProgramHandle
);
handle!(
    /// Sampled 2D texture.
    TextureHandle
);
handle!(
    /// Vertex or index buffer.
    BufferHandle
);
handle!(
    /// Vertex buffer + index buffer pairing used by one material.
    VertexArrayHandle
);
handle!(
    /// Offscreen render target.
    FramebufferHandle
);

/// The programs the renderer knows how to build.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Phong lighting, normal mapping and PCF shadow lookups.
    Lit,
    /// Depth-only pass into the shadow map.
    ShadowDepth,
    /// Textured screen-space quad used to mirror eye images to the window.
    Mirror,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureUnit {
    Diffuse,
    NormalMap,
    ShadowMap,
}

impl TextureUnit {
    pub const ALL: [TextureUnit; 3] = [TextureUnit::Diffuse, TextureUnit::NormalMap, TextureUnit::ShadowMap];

    /// Slot number the lit program samples this unit from.
    pub fn slot(self) -> usize {
        match self {
            TextureUnit::Diffuse => 0,
            TextureUnit::NormalMap => 1,
            TextureUnit::ShadowMap => 2,
        }
    }
}

/// Named uniforms of the built-in programs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Uniform {
    Mvp,
    /// Inverse transpose of the upper 3x3 of the MVP.
    NormalMatrix,
    LightSpace,
    /// Viewer position used for specular highlights.
    EyePosition,
    LightCount,
    LightPosition(usize),
    LightColor(usize),
    UseNormalMap,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Mat4(Mat4),
    Mat3(Mat3),
    Vec3(Vec3),
    Vec4(Vec4),
    Int(i32),
    Bool(bool),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FramebufferTarget {
    /// The window surface of the current frame.
    Window,
    Offscreen(FramebufferHandle),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FramebufferKind {
    /// Multisampled color + depth with a single-sample resolve texture.
    ColorResolve,
    /// Single-sample depth texture that can later be sampled.
    Depth,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FramebufferDesc {
    pub width: u32,
    pub height: u32,
    pub samples: u32,
    pub kind: FramebufferKind,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn sized(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

/// What to clear on the bound target.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClearRequest {
    pub color: Option<[f32; 4]>,
    pub depth: Option<f32>,
}

impl ClearRequest {
    pub fn color_and_depth(color: [f32; 4]) -> Self {
        Self { color: Some(color), depth: Some(1.0) }
    }

    pub fn depth_only() -> Self {
        Self { color: None, depth: Some(1.0) }
    }
}

/// GL-style GPU back end.
///
/// Creation calls return errors directly. State calls are infallible; misuse
/// surfaces at the next `draw_indexed`, `resolve_framebuffer` or `present`, or
/// through [`GpuBackend::poll_error`].
pub trait GpuBackend {
    fn create_program(&mut self, kind: ProgramKind) -> Result<ProgramHandle, RenderError>;
    fn create_texture(&mut self, image: &ImageData, role: TextureRole) -> Result<TextureHandle, RenderError>;
    fn create_vertex_buffer(&mut self, vertices: &[RawVertex]) -> Result<BufferHandle, RenderError>;
    fn create_index_buffer(&mut self, indices: &[u32]) -> Result<BufferHandle, RenderError>;
    fn create_vertex_array(
        &mut self,
        vertices: BufferHandle,
        indices: BufferHandle,
    ) -> Result<VertexArrayHandle, RenderError>;
    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> Result<FramebufferHandle, RenderError>;
    fn check_framebuffer_complete(&mut self, framebuffer: FramebufferHandle) -> Result<(), RenderError>;

    /// Texture a framebuffer presents: the resolve texture for
    /// [`FramebufferKind::ColorResolve`], the depth texture for
    /// [`FramebufferKind::Depth`].
    fn framebuffer_texture(&self, framebuffer: FramebufferHandle) -> Option<TextureHandle>;

    /// Current window surface size in physical pixels.
    fn surface_size(&self) -> (u32, u32);

    fn bind_framebuffer(&mut self, target: FramebufferTarget);
    fn set_viewport(&mut self, viewport: Viewport);
    fn clear(&mut self, request: ClearRequest);
    fn use_program(&mut self, program: ProgramHandle);
    fn set_uniform(&mut self, uniform: Uniform, value: UniformValue);
    fn bind_texture(&mut self, unit: TextureUnit, texture: TextureHandle);
    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    /// Draws `index_count` indices of the bound vertex array as a triangle list.
    fn draw_indexed(&mut self, index_count: u32) -> Result<(), RenderError>;

    /// Blits the multisampled color of `framebuffer` into its resolve texture.
    fn resolve_framebuffer(&mut self, framebuffer: FramebufferHandle) -> Result<(), RenderError>;

    /// Finishes everything recorded for the window target.
    fn present(&mut self) -> Result<(), RenderError>;

    /// Takes the oldest pending back-end error, if any.
    fn poll_error(&mut self) -> Option<String>;
}

/// Turns a pending back-end error into a [`RenderError::Resource`] naming the
/// caller.
#[track_caller]
pub fn check_errors(backend: &mut dyn GpuBackend) -> Result<(), RenderError> {
    let call_site = Location::caller();
    match backend.poll_error() {
        Some(message) => Err(RenderError::Resource { call_site, message }),
        None => Ok(()),
    }
}
