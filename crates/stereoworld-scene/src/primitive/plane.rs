use glam::{Vec2, Vec3, Vec4};

use super::Primitive;
use crate::error::SceneError;
use crate::texture::TextureId;
use crate::vertex::Vertex;

const CORNERS: [(f32, f32, f32, f32); 4] = [
    (0.5, 0.5, 1.0, 0.0),
    (0.5, -0.5, 1.0, 1.0),
    (-0.5, 0.5, 0.0, 0.0),
    (-0.5, -0.5, 0.0, 1.0),
];

impl Primitive {
    /// Unit square centered on the origin in the z=0 plane, facing +Z.
    pub fn plane(
        name: impl Into<String>,
        material: TextureId,
        normal_map: Option<TextureId>,
    ) -> Result<Self, SceneError> {
        let vertices = CORNERS
            .iter()
            .map(|&(x, y, u, v)| Vertex::new(Vec4::new(x, y, 0.0, 1.0), Vec3::Z, Vec2::new(u, v)))
            .collect();

        Primitive::new(name, material, normal_map, vertices, vec![0, 1, 2, 1, 2, 3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::TextureRegistry;

    #[test]
    fn plane_is_two_triangles() {
        let mat = TextureRegistry::new("").color("p.png");
        let p = Primitive::plane("p", mat, None).unwrap();
        assert_eq!(p.vertex_count(), 4);
        assert_eq!(p.triangles().len(), 6);
        assert!(p.vertices().iter().all(|v| v.normal == Vec3::Z && v.position.z == 0.0));
    }
}
