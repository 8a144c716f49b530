use std::f32::consts::{FRAC_PI_2, PI};
use std::sync::Arc;

use glam::{Mat4, Vec3};

use super::{require_positive, SceneBuilder, TableBuilder};
use crate::error::SceneError;
use crate::node::{Composite, Node};
use crate::primitive::Primitive;
use crate::texture::TextureRegistry;

const FLOOR: (&str, &str) = ("Blue_texture.png", "Blue_texture_N.png");
const WALL: (&str, &str) = ("DirtyBrick_S.png", "DirtyBrick_N.png");
const CEILING: (&str, &str) = ("ceiling_texture.png", "ceiling_texture_N.png");

const WALL_HEIGHT: f32 = 2.5;
const CEILING_Y: f32 = 2.25;

/// A square room of side `size` with a small table off-center.
#[derive(Debug, Copy, Clone)]
pub struct RoomBuilder {
    size: f32,
}

impl RoomBuilder {
    pub fn new(size: f32) -> Self {
        Self { size }
    }
}

impl SceneBuilder for RoomBuilder {
    fn build(&self, textures: &mut TextureRegistry) -> Result<Arc<Node>, SceneError> {
        require_positive("room", "size", self.size)?;

        let mut panel = |name: &str, (tex, normal): (&str, &str)| -> Result<Arc<Node>, SceneError> {
            let (tex, normal) = (textures.color(tex), textures.normal(normal));
            Ok(Primitive::plane(name, tex, Some(normal))?.into_node())
        };
        let floor = panel("floor", FLOOR)?;
        let wall = panel("wall", WALL)?;
        let ceiling = panel("ceiling", CEILING)?;
        let table = TableBuilder::new(0.5, 0.5, 0.4).build(textures)?;

        let half = self.size / 2.0;
        let floor_scale = Mat4::from_scale(Vec3::new(self.size, self.size, 1.0));
        let wall_scale = Mat4::from_scale(Vec3::new(self.size, WALL_HEIGHT, 1.0));

        let floor_rot = Mat4::from_rotation_x(-FRAC_PI_2);
        let ceiling_rot = Mat4::from_rotation_x(FRAC_PI_2) * Mat4::from_rotation_z(PI);
        let north_rot = Mat4::from_rotation_y(-FRAC_PI_2);
        let south_rot = Mat4::from_rotation_y(FRAC_PI_2);
        let east_rot = Mat4::from_rotation_y(PI);

        let at = |x: f32, y: f32, z: f32| Mat4::from_translation(Vec3::new(x, y, z));

        Ok(Composite::new("room")
            .with_child(floor_rot * floor_scale, floor_scale, floor)
            .with_child(at(half, 1.0, 0.0) * north_rot * wall_scale, wall_scale, wall.clone())
            .with_child(at(-half, 1.0, 0.0) * south_rot * wall_scale, wall_scale, wall.clone())
            .with_child(at(0.0, 1.0, half) * east_rot * wall_scale, wall_scale, wall.clone())
            .with_child(at(0.0, 1.0, -half) * wall_scale, wall_scale, wall)
            .with_child(at(0.0, CEILING_Y, 0.0) * ceiling_rot * floor_scale, floor_scale, ceiling)
            .with_child(at(1.3, 0.0, 1.3), Mat4::IDENTITY, table)
            .into_node())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::assemble;

    #[test]
    fn room_groups_walls_under_one_material() {
        let mut reg = TextureRegistry::new("Resource");
        let root = RoomBuilder::new(6.0).build(&mut reg).unwrap();
        let counts = root.vertex_counts();

        assert_eq!(counts.get(reg.color(WALL.0)), Some(&16));
        assert_eq!(counts.get(reg.color(FLOOR.0)), Some(&4));
        assert_eq!(counts.get(reg.color(CEILING.0)), Some(&4));
        assert_eq!(counts.get(reg.color("leg_texture.png")), Some(&96));
    }

    #[test]
    fn room_assembles_with_normal_maps() {
        let mut reg = TextureRegistry::new("Resource");
        let root = RoomBuilder::new(6.0).build(&mut reg).unwrap();
        let scene = assemble(&root, Mat4::IDENTITY, Mat4::IDENTITY).unwrap();

        assert_eq!(scene.meshes().len(), 5);
        assert!(scene.meshes().iter().all(|m| m.normal_map.is_some()));
    }

    #[test]
    fn floor_texture_repeats_with_room_size() {
        let mut reg = TextureRegistry::new("Resource");
        let root = RoomBuilder::new(4.0).build(&mut reg).unwrap();
        let batches = root.vertex_batches(&Mat4::IDENTITY, &Mat4::IDENTITY);
        let floor = &batches.get(reg.color(FLOOR.0)).unwrap()[0];
        let max_u = floor.iter().map(|v| v.uv.x).fold(f32::MIN, f32::max);
        assert!((max_u - 4.0).abs() < 1e-5);
    }
}
