//! Pose and input providers.
//!
//! A [`PoseProvider`] supplies the view transform a display renders from and
//! decides, from the frame's input, whether the session should end.

mod hmd;
mod keyboard;

use glam::Mat4;

use crate::display::Eye;
use crate::error::PoseUnavailable;
use crate::input::{InputFrame, InputState};

pub use self::hmd::{HmdEyeModel, SimulatedHmdPose};
pub use self::keyboard::KeyboardPose;

pub trait PoseProvider {
    /// Current view transform.
    ///
    /// Mono displays use it as is. Stereo displays treat it as head-to-world
    /// and invert it.
    fn view_transform(&mut self) -> Result<Mat4, PoseUnavailable>;

    /// Projection times head-to-eye for `eye`. Queried once per display.
    fn eye_perspective(&self, eye: Eye) -> Mat4;

    /// Consumes the frame's input. Returns `true` when quit was requested.
    fn poll_input(&mut self, input: &InputState, frame: &InputFrame) -> bool;
}
