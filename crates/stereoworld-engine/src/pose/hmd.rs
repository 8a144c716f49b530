use glam::{Mat4, Vec3};

use super::{KeyboardPose, PoseProvider};
use crate::config::StereoConfig;
use crate::display::Eye;
use crate::error::PoseUnavailable;
use crate::input::{InputFrame, InputState};

/// Fixed optics of a simulated headset.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HmdEyeModel {
    pub ipd: f32,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl HmdEyeModel {
    pub fn from_config(config: &StereoConfig) -> Self {
        Self {
            ipd: config.ipd,
            fov_y: config.fov_y,
            aspect: config.eye_width.max(1) as f32 / config.eye_height.max(1) as f32,
            near: config.near,
            far: config.far,
        }
    }

    /// Eye position relative to the head centre.
    pub fn eye_to_head(&self, eye: Eye) -> Mat4 {
        let half = self.ipd * 0.5;
        let x = match eye {
            Eye::Left => -half,
            Eye::Right => half,
        };
        Mat4::from_translation(Vec3::new(x, 0.0, 0.0))
    }

    /// `projection · inverse(eye_to_head)`.
    pub fn eye_perspective(&self, eye: Eye) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far) * self.eye_to_head(eye).inverse()
    }
}

/// Headset stand-in: the keyboard camera supplies the head pose.
#[derive(Debug, Clone)]
pub struct SimulatedHmdPose {
    keyboard: KeyboardPose,
    eyes: HmdEyeModel,
}

impl SimulatedHmdPose {
    pub fn new(keyboard: KeyboardPose, eyes: HmdEyeModel) -> Self {
        Self { keyboard, eyes }
    }
}

impl PoseProvider for SimulatedHmdPose {
    /// Head-to-world, so that the display's inversion yields the keyboard view.
    fn view_transform(&mut self) -> Result<Mat4, PoseUnavailable> {
        Ok(self.keyboard.view().inverse())
    }

    fn eye_perspective(&self, eye: Eye) -> Mat4 {
        self.eyes.eye_perspective(eye)
    }

    fn poll_input(&mut self, input: &InputState, frame: &InputFrame) -> bool {
        self.keyboard.poll_input(input, frame)
    }
}
