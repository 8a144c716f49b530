use glam::{Vec3, Vec4};

/// Most lights the lit program accepts.
pub const MAX_LIGHTS: usize = 5;

/// Point light in world space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LightSource {
    /// Homogeneous position; `w` is 1 for point lights.
    pub position: Vec4,
    pub color: Vec3,
}

impl LightSource {
    pub fn new(position: Vec4, color: Vec3) -> Self {
        Self { position, color }
    }
}
