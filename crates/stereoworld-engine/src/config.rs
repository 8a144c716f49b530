//! Plain configuration structs with their defaults.

use glam::{Mat4, Vec3, Vec4};

use crate::renderer::LightSource;

/// Frame orchestrator configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Clear color for every target, linear RGBA.
    pub clear_color: [f32; 4],

    /// Side length of the square shadow depth map.
    pub shadow_map_size: u32,

    /// Sample count for multisampled offscreen targets.
    pub msaa_samples: u32,

    /// Active light sources; at most [`crate::renderer::MAX_LIGHTS`].
    pub lights: Vec<LightSource>,

    pub light_space: LightSpace,

    /// Root texture transform used when assembling the scene.
    pub texture_transform: Mat4,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.1, 0.1, 0.0, 1.0],
            shadow_map_size: 1024,
            msaa_samples: 4,
            lights: vec![LightSource::new(Vec4::new(0.0, 1.0, 0.0, 1.0), Vec3::splat(0.8))],
            light_space: LightSpace::default(),
            texture_transform: Mat4::from_translation(Vec3::ONE),
        }
    }
}

/// Orthographic light frustum used for the shadow pass.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LightSpace {
    pub half_extent: f32,
    pub near: f32,
    pub far: f32,
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl LightSpace {
    /// `projection · view` for the light.
    pub fn matrix(&self) -> Mat4 {
        let e = self.half_extent;
        Mat4::orthographic_rh(-e, e, -e, e, self.near, self.far)
            * Mat4::look_at_rh(self.eye, self.target, self.up)
    }
}

impl Default for LightSpace {
    fn default() -> Self {
        Self {
            half_extent: 10.0,
            near: 1.0,
            far: 10.0,
            eye: Vec3::new(0.0, 5.0, 2.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
        }
    }
}

/// Window camera for the mono display.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MonoConfig {
    pub width: u32,
    pub height: u32,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    /// Fixed camera placed just behind the origin, looking at it.
    pub camera_eye: Vec3,
}

impl MonoConfig {
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.camera_eye, Vec3::ZERO, Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        let aspect = self.width.max(1) as f32 / self.height.max(1) as f32;
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
    }
}

impl Default for MonoConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 1000,
            fov_y: 0.4,
            near: 0.5,
            far: 100.0,
            camera_eye: Vec3::new(0.0, 0.0, -0.05),
        }
    }
}

/// Eye geometry of the simulated head-mounted display.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StereoConfig {
    /// Recommended per-eye render target size.
    pub eye_width: u32,
    pub eye_height: u32,
    /// Interpupillary distance in meters.
    pub ipd: f32,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for StereoConfig {
    fn default() -> Self {
        Self {
            eye_width: 1080,
            eye_height: 1200,
            ipd: 0.064,
            fov_y: 1.7,
            near: 0.005,
            far: 30.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_render_config_has_one_overhead_light() {
        let cfg = RenderConfig::default();
        assert_eq!(cfg.lights.len(), 1);
        assert_eq!(cfg.lights[0].position, Vec4::new(0.0, 1.0, 0.0, 1.0));
        assert_eq!(cfg.msaa_samples, 4);
    }

    #[test]
    fn light_space_maps_origin_inside_clip_volume() {
        let clip = LightSpace::default().matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0 && ndc.z.abs() <= 1.0);
    }

    #[test]
    fn square_window_projection_is_symmetric() {
        let p = MonoConfig::default().projection();
        assert!((p.x_axis.x - p.y_axis.y).abs() < 1e-6);
    }
}
