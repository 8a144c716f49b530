use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use glam::{Mat4, Vec3};

use super::{require_positive, SceneBuilder};
use crate::error::SceneError;
use crate::node::{Composite, Node};
use crate::primitive::{CylinderSpec, Primitive};
use crate::texture::{TextureId, TextureRegistry};

const CUBE_TEXTURE: &str = "cube_texture.png";
const WHITE_TEXTURE: &str = "white_texture.png";

/// Offsets of the boxes placed in front of the camera.
const PLACEMENTS: [Vec3; 5] = [
    Vec3::new(-1.0, -1.0, 5.0),
    Vec3::new(1.0, 1.0, 5.0),
    Vec3::new(-1.0, 1.0, 5.0),
    Vec3::new(1.0, -1.0, 5.0),
    Vec3::new(0.0, 0.0, 5.0),
];

fn quarter_turns() -> Vec<f32> {
    (0..4).map(|i| i as f32 * FRAC_PI_2).collect()
}

/// A four-sample cylinder: a square prism with a 4x texture wrap.
fn box_cylinder(material: TextureId) -> Result<Arc<Node>, SceneError> {
    let spec = CylinderSpec::circle("cyl", material, quarter_turns()).with_reps(4, 1.0);
    Ok(Primitive::cylinder(&spec)?.into_node())
}

fn squash() -> Mat4 {
    Mat4::from_scale(Vec3::new(1.0, 1.0, 0.707))
}

/// One box five units in front of the viewer.
#[derive(Debug, Copy, Clone)]
pub struct CubeBuilder {
    size: f32,
}

impl CubeBuilder {
    pub fn new(size: f32) -> Self {
        Self { size }
    }
}

impl SceneBuilder for CubeBuilder {
    fn build(&self, textures: &mut TextureRegistry) -> Result<Arc<Node>, SceneError> {
        require_positive("cube", "size", self.size)?;
        let tex = textures.color(CUBE_TEXTURE);

        let place = squash() * Mat4::from_translation(PLACEMENTS[0]) * Mat4::from_scale(Vec3::splat(self.size));
        Ok(Composite::new("cube")
            .with_child(place, Mat4::IDENTITY, box_cylinder(tex)?)
            .into_node())
    }
}

/// Five boxes in a quincunx, split over two materials.
#[derive(Debug, Copy, Clone)]
pub struct MultiCubeBuilder {
    size: f32,
}

impl MultiCubeBuilder {
    pub fn new(size: f32) -> Self {
        Self { size }
    }
}

impl SceneBuilder for MultiCubeBuilder {
    fn build(&self, textures: &mut TextureRegistry) -> Result<Arc<Node>, SceneError> {
        require_positive("multicube", "size", self.size)?;
        let first = box_cylinder(textures.color(CUBE_TEXTURE))?;
        let rest = box_cylinder(textures.color(WHITE_TEXTURE))?;
        let scale = Mat4::from_scale(Vec3::splat(self.size));

        let mut root = Composite::new("multicube");
        for (i, offset) in PLACEMENTS.iter().enumerate() {
            let node = if i < 2 { first.clone() } else { rest.clone() };
            root.push(Mat4::from_translation(*offset) * squash() * scale, Mat4::IDENTITY, node);
        }
        Ok(root.into_node())
    }
}
