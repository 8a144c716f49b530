//! Tangent-space pass.
//!
//! For each triangle, tangent and bitangent come from solving
//! `[ΔP1 ΔP2] = [T B] · [ΔUV1 ΔUV2]`. Every vertex a triangle references is
//! overwritten with that triangle's basis, so a vertex shared by several
//! triangles keeps the basis of the last one visited.

use glam::Vec3;

use crate::vertex::Vertex;

/// `|det(ΔUV1, ΔUV2)|` at or below this is treated as a non-invertible mapping.
pub const DEGENERATE_UV_EPSILON: f32 = 1e-10;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TangentBasis {
    pub tangent: Vec3,
    pub bitangent: Vec3,
}

/// Solves the basis of one triangle; `None` when the UV mapping is degenerate.
pub fn triangle_basis(v1: &Vertex, v2: &Vertex, v3: &Vertex) -> Option<TangentBasis> {
    let dp1 = (v2.position - v1.position).truncate();
    let dp2 = (v3.position - v1.position).truncate();
    let dt1 = v2.uv - v1.uv;
    let dt2 = v3.uv - v1.uv;

    let det = dt1.x * dt2.y - dt1.y * dt2.x;
    if !det.is_finite() || det.abs() <= DEGENERATE_UV_EPSILON {
        return None;
    }

    let r = 1.0 / det;
    let basis = TangentBasis {
        tangent: (dp1 * dt2.y - dp2 * dt1.y) * r,
        bitangent: (dp2 * dt1.x - dp1 * dt2.x) * r,
    };

    (basis.tangent.is_finite() && basis.bitangent.is_finite()).then_some(basis)
}

/// Unit basis orthogonal to the triangle's normal.
///
/// Uses the first vertex normal, then the face normal, then +Z, taking the
/// first that normalizes.
pub fn fallback_basis(v1: &Vertex, v2: &Vertex, v3: &Vertex) -> TangentBasis {
    let face = (v2.position - v1.position)
        .truncate()
        .cross((v3.position - v1.position).truncate());

    let normal = v1
        .normal
        .try_normalize()
        .or_else(|| face.try_normalize())
        .unwrap_or(Vec3::Z);

    let (tangent, bitangent) = normal.any_orthonormal_pair();
    TangentBasis { tangent, bitangent }
}

/// Writes tangents and bitangents for every triangle in `indices`.
///
/// Returns how many triangles fell back to [`fallback_basis`]. Indices must be
/// in range for `vertices`; a trailing partial triangle is ignored.
pub fn compute_tangents(vertices: &mut [Vertex], indices: &[u32]) -> usize {
    let mut fallbacks = 0;

    for tri in indices.chunks_exact(3) {
        let (i1, i2, i3) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let (v1, v2, v3) = (&vertices[i1], &vertices[i2], &vertices[i3]);

        let basis = match triangle_basis(v1, v2, v3) {
            Some(b) => b,
            None => {
                fallbacks += 1;
                fallback_basis(v1, v2, v3)
            }
        };

        for i in [i1, i2, i3] {
            vertices[i].tangent = basis.tangent;
            vertices[i].bitangent = basis.bitangent;
        }
    }

    fallbacks
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec4};

    use super::*;

    fn vert(x: f32, y: f32, u: f32, v: f32) -> Vertex {
        Vertex::new(Vec4::new(x, y, 0.0, 1.0), Vec3::Z, Vec2::new(u, v))
    }

    // ── regular mapping ───────────────────────────────────────────────────

    #[test]
    fn axis_aligned_uvs_give_axis_tangents() {
        let mut vs = vec![vert(0.0, 0.0, 0.0, 0.0), vert(1.0, 0.0, 1.0, 0.0), vert(0.0, 1.0, 0.0, 1.0)];
        assert_eq!(compute_tangents(&mut vs, &[0, 1, 2]), 0);
        for v in &vs {
            assert!((v.tangent - Vec3::X).length() < 1e-6);
            assert!((v.bitangent - Vec3::Y).length() < 1e-6);
        }
    }

    #[test]
    fn shared_vertex_keeps_last_triangle_basis() {
        let mut vs = vec![
            vert(0.0, 0.0, 0.0, 0.0),
            vert(1.0, 0.0, 1.0, 0.0),
            vert(0.0, 1.0, 0.0, 1.0),
            vert(0.0, -1.0, 0.0, 2.0),
        ];
        // Second triangle maps +v downwards, flipping its bitangent.
        compute_tangents(&mut vs, &[0, 1, 2, 0, 1, 3]);
        assert!((vs[0].bitangent - Vec3::new(0.0, -0.5, 0.0)).length() < 1e-6);
        assert!((vs[2].bitangent - Vec3::Y).length() < 1e-6);
    }

    // ── degenerate mapping ────────────────────────────────────────────────

    #[test]
    fn zero_uv_determinant_yields_finite_unit_basis() {
        // All three UVs collinear: det is exactly zero.
        let mut vs = vec![vert(0.0, 0.0, 0.0, 0.0), vert(1.0, 0.0, 0.5, 0.5), vert(0.0, 1.0, 1.0, 1.0)];
        assert_eq!(compute_tangents(&mut vs, &[0, 1, 2]), 1);
        for v in &vs {
            assert!(v.tangent.is_finite() && v.bitangent.is_finite());
            assert!((v.tangent.length() - 1.0).abs() < 1e-5);
            assert!((v.bitangent.length() - 1.0).abs() < 1e-5);
            assert!(v.tangent.dot(Vec3::Z).abs() < 1e-5);
        }
    }

    #[test]
    fn degenerate_fallback_is_deterministic() {
        let make = || vec![vert(0.0, 0.0, 0.3, 0.3), vert(1.0, 0.0, 0.3, 0.3), vert(0.0, 1.0, 0.3, 0.3)];
        let (mut a, mut b) = (make(), make());
        compute_tangents(&mut a, &[0, 1, 2]);
        compute_tangents(&mut b, &[0, 1, 2]);
        assert_eq!(a, b);
    }

    #[test]
    fn zero_normal_falls_back_to_face_normal() {
        let mut v1 = vert(0.0, 0.0, 0.0, 0.0);
        v1.normal = Vec3::ZERO;
        let basis = fallback_basis(&v1, &vert(1.0, 0.0, 0.0, 0.0), &vert(0.0, 1.0, 0.0, 0.0));
        assert!(basis.tangent.dot(Vec3::Z).abs() < 1e-5);
        assert!(basis.bitangent.dot(Vec3::Z).abs() < 1e-5);
    }
}
