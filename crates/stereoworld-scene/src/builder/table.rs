use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use glam::{Mat4, Vec3};

use super::{require_positive, SceneBuilder};
use crate::error::SceneError;
use crate::node::{Composite, Node};
use crate::primitive::Primitive;
use crate::texture::TextureRegistry;

const TOP_TEXTURE: &str = "top2_texture.png";
const TOP_NORMAL: &str = "top2_texture_N.png";
const LEG_TEXTURE: &str = "leg_texture.png";
const LEG_NORMAL: &str = "leg_texture_N.png";

/// Inset of the legs from the table edge.
const LEG_INSET: f32 = 0.1;
const LEG_THICKNESS: f32 = 0.05;
const TOP_THICKNESS: f32 = 0.02;

/// Four cube legs and a cube top, standing on y = 0.
///
/// Cubes span [-1, 1], so `width` and `length` are half extents and the
/// table top sits at `2 * height`.
#[derive(Debug, Copy, Clone)]
pub struct TableBuilder {
    width: f32,
    length: f32,
    height: f32,
}

impl TableBuilder {
    pub fn new(width: f32, length: f32, height: f32) -> Self {
        Self { width, length, height }
    }
}

impl SceneBuilder for TableBuilder {
    fn build(&self, textures: &mut TextureRegistry) -> Result<Arc<Node>, SceneError> {
        require_positive("table", "width", self.width)?;
        require_positive("table", "length", self.length)?;
        require_positive("table", "height", self.height)?;

        let (top_tex, top_n) = (textures.color(TOP_TEXTURE), textures.normal(TOP_NORMAL));
        let (leg_tex, leg_n) = (textures.color(LEG_TEXTURE), textures.normal(LEG_NORMAL));

        let leg_x = self.width - LEG_INSET;
        let leg_z = self.length - LEG_INSET;
        let leg_shape = Mat4::from_rotation_x(-FRAC_PI_2)
            * Mat4::from_scale(Vec3::new(LEG_THICKNESS, LEG_THICKNESS, self.height));
        let top_shape = Mat4::from_translation(Vec3::new(0.0, self.height * 2.0, 0.0))
            * Mat4::from_rotation_x(FRAC_PI_2)
            * Mat4::from_scale(Vec3::new(self.width, self.length, TOP_THICKNESS));

        let mut table = Composite::new("table");
        let corners = [(leg_x, leg_z), (leg_x, -leg_z), (-leg_x, leg_z), (-leg_x, -leg_z)];
        for (i, (x, z)) in corners.into_iter().enumerate() {
            let leg = Primitive::cube(format!("leg{}", i + 1), leg_tex, Some(leg_n))?;
            let place = Mat4::from_translation(Vec3::new(x, self.height, z)) * leg_shape;
            table.push(place, Mat4::IDENTITY, leg.into_node());
        }
        table.push(
            top_shape,
            Mat4::IDENTITY,
            Primitive::cube("top", top_tex, Some(top_n))?.into_node(),
        );

        Ok(table.into_node())
    }
}
