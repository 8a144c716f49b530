use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

/// One scene vertex.
///
/// `normal` is unit length when authored. Transforms that scale a node leave
/// it unnormalized; shaders renormalize per fragment.
///
/// `tangent` and `bitangent` start at zero and are written by the tangent
/// pass during assembly.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Vertex {
    pub position: Vec4,
    pub normal: Vec3,
    pub uv: Vec2,
    pub tangent: Vec3,
    pub bitangent: Vec3,
}

impl Vertex {
    #[inline]
    pub fn new(position: Vec4, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            uv,
            tangent: Vec3::ZERO,
            bitangent: Vec3::ZERO,
        }
    }

    /// Returns a copy placed by `xform`.
    ///
    /// `normal_xform` must be [`normal_matrix`]`(xform)`; it is passed in so
    /// callers compute it once per batch. `tex_xform` maps `(u, v, 0, 1)`.
    #[inline]
    pub fn transformed(&self, xform: &Mat4, normal_xform: &Mat3, tex_xform: &Mat4) -> Self {
        let uv = *tex_xform * Vec4::new(self.uv.x, self.uv.y, 0.0, 1.0);
        Self {
            position: *xform * self.position,
            normal: *normal_xform * self.normal,
            uv: Vec2::new(uv.x, uv.y),
            tangent: self.tangent,
            bitangent: self.bitangent,
        }
    }

    #[inline]
    pub fn to_raw(&self) -> RawVertex {
        RawVertex {
            position: self.position.to_array(),
            normal: self.normal.to_array(),
            uv: self.uv.to_array(),
            tangent: self.tangent.to_array(),
            bitangent: self.bitangent.to_array(),
        }
    }
}

/// Inverse-transpose of the upper 3x3 of `xform`.
#[inline]
pub fn normal_matrix(xform: &Mat4) -> Mat3 {
    Mat3::from_mat4(*xform).inverse().transpose()
}

/// Tightly packed upload layout: 15 floats, 60-byte stride.
///
/// Attribute locations: 0 position (vec4), 1 normal (vec3), 2 uv (vec2),
/// 3 tangent (vec3), 4 bitangent (vec3).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct RawVertex {
    pub position: [f32; 4],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v() -> Vertex {
        Vertex::new(Vec4::new(1.0, 0.0, 0.0, 1.0), Vec3::Z, Vec2::new(0.25, 0.5))
    }

    // ── transformed ───────────────────────────────────────────────────────

    #[test]
    fn identity_is_a_copy() {
        let m = Mat4::IDENTITY;
        assert_eq!(v().transformed(&m, &normal_matrix(&m), &m), v());
    }

    #[test]
    fn translation_moves_position_not_normal() {
        let m = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0));
        let out = v().transformed(&m, &normal_matrix(&m), &Mat4::IDENTITY);
        assert_eq!(out.position, Vec4::new(1.0, 2.0, 0.0, 1.0));
        assert_eq!(out.normal, Vec3::Z);
    }

    #[test]
    fn non_uniform_scale_uses_inverse_transpose() {
        let m = Mat4::from_scale(Vec3::new(1.0, 1.0, 4.0));
        let out = v().transformed(&m, &normal_matrix(&m), &Mat4::IDENTITY);
        assert!((out.normal - Vec3::new(0.0, 0.0, 0.25)).length() < 1e-6);
    }

    #[test]
    fn texture_transform_applies_to_uv() {
        let t = Mat4::from_translation(Vec3::new(1.0, 1.0, 1.0));
        let out = v().transformed(&Mat4::IDENTITY, &Mat3::IDENTITY, &t);
        assert_eq!(out.uv, Vec2::new(1.25, 1.5));
    }

    // ── raw layout ────────────────────────────────────────────────────────

    #[test]
    fn raw_vertex_is_fifteen_floats() {
        assert_eq!(std::mem::size_of::<RawVertex>(), 15 * 4);
    }
}
