use glam::{Vec2, Vec3, Vec4};

use super::Primitive;
use crate::error::SceneError;
use crate::texture::TextureId;
use crate::vertex::Vertex;

/// Per face: outward normal and four corners, in the order the shared
/// face UVs and `FACE_INDICES` expect.
const FACES: [(Vec3, [[f32; 3]; 4]); 6] = [
    (Vec3::Z, [[-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [-1.0, 1.0, 1.0], [1.0, 1.0, 1.0]]),
    (Vec3::NEG_X, [[-1.0, -1.0, 1.0], [-1.0, -1.0, -1.0], [-1.0, 1.0, 1.0], [-1.0, 1.0, -1.0]]),
    (Vec3::Y, [[-1.0, 1.0, 1.0], [-1.0, 1.0, -1.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0]]),
    (Vec3::X, [[1.0, 1.0, 1.0], [1.0, 1.0, -1.0], [1.0, -1.0, 1.0], [1.0, -1.0, -1.0]]),
    (Vec3::NEG_Y, [[1.0, -1.0, 1.0], [1.0, -1.0, -1.0], [-1.0, -1.0, 1.0], [-1.0, -1.0, -1.0]]),
    (Vec3::NEG_Z, [[-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [1.0, 1.0, -1.0]]),
];

const FACE_UVS: [[f32; 2]; 4] = [[1.0, 0.0], [1.0, 1.0], [0.0, 0.0], [0.0, 1.0]];
const FACE_INDICES: [u32; 6] = [0, 1, 2, 1, 2, 3];

impl Primitive {
    /// Cube spanning [-1, 1] on every axis: 24 vertices, 12 triangles.
    pub fn cube(
        name: impl Into<String>,
        material: TextureId,
        normal_map: Option<TextureId>,
    ) -> Result<Self, SceneError> {
        let mut vertices = Vec::with_capacity(24);
        let mut triangles = Vec::with_capacity(36);

        for (face, (normal, corners)) in FACES.iter().enumerate() {
            let base = (face * 4) as u32;
            for (corner, uv) in corners.iter().zip(FACE_UVS) {
                vertices.push(Vertex::new(Vec3::from(*corner).extend(1.0), *normal, Vec2::from(uv)));
            }
            triangles.extend(FACE_INDICES.iter().map(|i| base + i));
        }

        Primitive::new(name, material, normal_map, vertices, triangles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::TextureRegistry;

    #[test]
    fn cube_has_24_vertices_and_36_indices() {
        let mat = TextureRegistry::new("").color("c.png");
        let c = Primitive::cube("c", mat, None).unwrap();
        assert_eq!(c.vertex_count(), 24);
        assert_eq!(c.triangles().len(), 36);
    }

    #[test]
    fn face_vertices_lie_on_their_face() {
        let mat = TextureRegistry::new("").color("c.png");
        let c = Primitive::cube("c", mat, None).unwrap();
        for v in c.vertices() {
            let p: Vec4 = v.position;
            assert!((p.truncate().dot(v.normal) - 1.0).abs() < 1e-6);
        }
    }
}
