use glam::{Mat4, Vec3};

use super::PoseProvider;
use crate::display::Eye;
use crate::error::PoseUnavailable;
use crate::input::{InputFrame, InputState, Key};

/// Per-frame translation (and key-driven rotation) step.
pub const DEFAULT_TRANSLATION_STEP: f32 = 0.005;
/// Radians per pixel of pointer motion.
pub const DEFAULT_ROTATION_STEP: f32 = 0.01;

/// Keys held down and the `(location, rotation)` component each one nudges.
const HELD_KEYS: [(Key, Axis, f32); 12] = [
    (Key::W, Axis::Loc(1), -1.0),
    (Key::S, Axis::Loc(1), 1.0),
    (Key::A, Axis::Loc(0), -1.0),
    (Key::D, Axis::Loc(0), 1.0),
    (Key::Q, Axis::Loc(2), -1.0),
    (Key::E, Axis::Loc(2), 1.0),
    (Key::F, Axis::Rot(0), -1.0),
    (Key::G, Axis::Rot(0), 1.0),
    (Key::R, Axis::Rot(1), -1.0),
    (Key::T, Axis::Rot(1), 1.0),
    (Key::V, Axis::Rot(2), -1.0),
    (Key::B, Axis::Rot(2), 1.0),
];

#[derive(Debug, Copy, Clone)]
enum Axis {
    Loc(usize),
    Rot(usize),
}

/// Free-flying camera driven by keyboard and pointer motion.
///
/// `rot.x` is roll, `rot.y` pitch and `rot.z` yaw; the view is
/// `yaw · pitch · roll · translate(loc)`.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyboardPose {
    loc: Vec3,
    rot: Vec3,
    translation_step: f32,
    rotation_step: f32,
    projection: Mat4,
}

impl KeyboardPose {
    pub fn new(translation_step: f32, rotation_step: f32) -> Self {
        Self {
            loc: Vec3::ZERO,
            rot: Vec3::ZERO,
            translation_step,
            rotation_step,
            projection: Mat4::IDENTITY,
        }
    }

    /// Projection reported by [`PoseProvider::eye_perspective`] for both eyes.
    pub fn with_projection(mut self, projection: Mat4) -> Self {
        self.projection = projection;
        self
    }

    pub fn location(&self) -> Vec3 {
        self.loc
    }

    pub fn rotation(&self) -> Vec3 {
        self.rot
    }

    pub fn reset(&mut self) {
        self.loc = Vec3::ZERO;
        self.rot = Vec3::ZERO;
    }

    pub fn view(&self) -> Mat4 {
        let yaw = Mat4::from_rotation_x(self.rot.z);
        let pitch = Mat4::from_rotation_y(self.rot.y);
        let roll = Mat4::from_rotation_z(-self.rot.x);
        yaw * pitch * roll * Mat4::from_translation(self.loc)
    }
}

impl Default for KeyboardPose {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSLATION_STEP, DEFAULT_ROTATION_STEP)
    }
}

impl PoseProvider for KeyboardPose {
    fn view_transform(&mut self) -> Result<Mat4, PoseUnavailable> {
        Ok(self.view())
    }

    fn eye_perspective(&self, _eye: Eye) -> Mat4 {
        self.projection
    }

    fn poll_input(&mut self, input: &InputState, frame: &InputFrame) -> bool {
        let (dx, dy) = frame.pointer_delta;
        self.rot.y += self.rotation_step * dx;
        self.rot.z -= self.rotation_step * dy;

        for (key, axis, sign) in HELD_KEYS {
            if !input.key_down(key) {
                continue;
            }
            let step = sign * self.translation_step;
            match axis {
                Axis::Loc(i) => self.loc[i] += step,
                Axis::Rot(i) => self.rot[i] += step,
            }
        }

        if frame.keys_pressed.contains(&Key::P) {
            self.reset();
        }

        frame.keys_pressed.contains(&Key::Escape)
    }
}
