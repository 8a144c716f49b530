//! Test doubles shared by the display and renderer tests.

use glam::Mat4;
use stereoworld_scene::builder::{SceneKind, build_scene};
use stereoworld_scene::texture::TextureEntry;
use stereoworld_scene::{AssembledScene, RawVertex, TextureRegistry, TextureRole, assemble};

use crate::config::StereoConfig;
use crate::display::{Compositor, Eye, EyePair};
use crate::error::{PoseUnavailable, RenderError};
use crate::gpu::{GpuBackend, RecordingBackend, TextureHandle};
use crate::input::{InputFrame, InputState};
use crate::pose::{HmdEyeModel, PoseProvider};
use crate::texture::{ImageData, ImageSource};

/// Pose provider with a fixed transform and scripted failures.
#[derive(Debug, Clone)]
pub struct ScriptedPose {
    view: Mat4,
    eyes: HmdEyeModel,
    /// Successful `view_transform` calls before it starts failing.
    good_poses: Option<u32>,
    /// Poll number (1-based) that requests quit.
    quit_on: Option<u32>,
    served: u32,
    polls: u32,
}

impl ScriptedPose {
    pub fn fixed(view: Mat4) -> Self {
        Self {
            view,
            eyes: HmdEyeModel::from_config(&StereoConfig::default()),
            good_poses: None,
            quit_on: None,
            served: 0,
            polls: 0,
        }
    }

    pub fn failing_after(mut self, good_poses: u32) -> Self {
        self.good_poses = Some(good_poses);
        self
    }

    pub fn quitting_on_poll(mut self, poll: u32) -> Self {
        self.quit_on = Some(poll);
        self
    }
}

impl PoseProvider for ScriptedPose {
    fn view_transform(&mut self) -> Result<Mat4, PoseUnavailable> {
        if self.good_poses.is_some_and(|n| self.served >= n) {
            return Err(PoseUnavailable::new("tracking lost"));
        }
        self.served += 1;
        Ok(self.view)
    }

    fn eye_perspective(&self, eye: Eye) -> Mat4 {
        self.eyes.eye_perspective(eye)
    }

    fn poll_input(&mut self, _input: &InputState, _frame: &InputFrame) -> bool {
        self.polls += 1;
        self.quit_on == Some(self.polls)
    }
}

/// Every image decodes to one mid-grey texel.
pub struct SolidImages;

impl ImageSource for SolidImages {
    fn load(&mut self, entry: &TextureEntry) -> Result<ImageData, RenderError> {
        Ok(match entry.role {
            TextureRole::Color => ImageData::solid([128, 128, 128, 255]),
            TextureRole::Normal => ImageData::solid([128, 128, 255, 255]),
        })
    }
}

/// Compositor that accepts every pair and draws nothing.
pub struct NullCompositor;

impl Compositor for NullCompositor {
    fn recommended_size(&self) -> (u32, u32) {
        (64, 64)
    }

    fn submit(&mut self, _backend: &mut dyn GpuBackend, _eyes: EyePair<TextureHandle>) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Uploads a two-triangle quad and binds it.
pub fn bound_quad(backend: &mut RecordingBackend) {
    let vbo = backend.create_vertex_buffer(&[<RawVertex as bytemuck::Zeroable>::zeroed(); 4]).unwrap();
    let ibo = backend.create_index_buffer(&[0, 1, 2, 2, 1, 3]).unwrap();
    let vao = backend.create_vertex_array(vbo, ibo).unwrap();
    backend.bind_vertex_array(vao);
}

fn scene(kind: SceneKind) -> (TextureRegistry, AssembledScene) {
    let mut registry = TextureRegistry::new("Resource");
    let root = build_scene(kind, &mut registry).unwrap();
    let scene = assemble(&root, Mat4::IDENTITY, Mat4::IDENTITY).unwrap();
    (registry, scene)
}

pub fn table_scene() -> (TextureRegistry, AssembledScene) {
    scene(SceneKind::Table { width: 0.5, length: 0.5, height: 0.4 })
}

pub fn room_scene() -> (TextureRegistry, AssembledScene) {
    scene(SceneKind::Room { size: 4.0 })
}
