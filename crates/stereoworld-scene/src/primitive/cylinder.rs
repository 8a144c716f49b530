use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3, Vec4};

use super::Primitive;
use crate::error::SceneError;
use crate::texture::TextureId;
use crate::vertex::Vertex;

/// Polar distance of a circle of radius one.
pub fn unit_circle(_angle: f32) -> f32 {
    1.0
}

/// Parameters of a parametric cylinder spanning z ∈ [-1, 1].
///
/// `angles` are sample angles in `[0, 2π)`, strictly increasing. Each sample
/// sits at `polar_distance(angle)` from the z axis. Four samples at the
/// quarter turns give a box; many samples give a round cylinder.
#[derive(Debug, Clone)]
pub struct CylinderSpec {
    pub name: String,
    pub material: TextureId,
    pub normal_map: Option<TextureId>,
    /// Texture repeats around the side.
    pub u_reps: u32,
    /// Texture repeats along the side.
    pub v_reps: f32,
    pub angles: Vec<f32>,
    pub polar_distance: fn(f32) -> f32,
}

impl CylinderSpec {
    /// Circular cylinder with one texture repeat each way and no normal map.
    pub fn circle(name: impl Into<String>, material: TextureId, angles: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            material,
            normal_map: None,
            u_reps: 1,
            v_reps: 1.0,
            angles,
            polar_distance: unit_circle,
        }
    }

    pub fn with_reps(mut self, u_reps: u32, v_reps: f32) -> Self {
        self.u_reps = u_reps;
        self.v_reps = v_reps;
        self
    }

    pub fn with_normal_map(mut self, normal_map: TextureId) -> Self {
        self.normal_map = Some(normal_map);
        self
    }

    fn validate(&self) -> Result<(), SceneError> {
        let n = self.angles.len();
        if n < 3 {
            return Err(SceneError::geometry(
                "cylinder",
                format!("needs at least 3 angle samples, got {n}"),
            ));
        }
        if let Some(a) = self.angles.iter().find(|a| !(0.0..TAU).contains(*a)) {
            return Err(SceneError::geometry(
                "cylinder",
                format!("angle {a} outside [0, 2π)"),
            ));
        }
        if self.angles.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SceneError::geometry(
                "cylinder",
                "angle samples must be strictly increasing",
            ));
        }
        for &a in &self.angles {
            let d = (self.polar_distance)(a);
            if !d.is_finite() || d <= 0.0 {
                return Err(SceneError::geometry(
                    "cylinder",
                    format!("polar distance {d} at angle {a} is not positive"),
                ));
            }
        }
        if !self.v_reps.is_finite() {
            return Err(SceneError::geometry("cylinder", "v_reps is not finite"));
        }
        Ok(())
    }
}

impl Primitive {
    /// Builds a closed cylinder: top cap, side ring, bottom cap.
    ///
    /// Vertex layout for `N` samples (`4N` vertices):
    /// - `[0, N)` top cap, normal +Z
    /// - `[N, 3N)` side, interleaved top/bottom pairs, radial normals
    /// - `[3N, 4N)` bottom cap, normal -Z
    ///
    /// Each cap is a zig-zag strip of `N - 2` triangles. The side is a ring
    /// of `N` quads (`2N` triangles) whose last quad joins sample `N - 1`
    /// back to sample 0, for any parity of `N`.
    pub fn cylinder(spec: &CylinderSpec) -> Result<Self, SceneError> {
        spec.validate()?;

        let n = spec.angles.len();
        let mut vertices = vec![Vertex::new(Vec4::ZERO, Vec3::ZERO, Vec2::ZERO); 4 * n];

        for (i, &angle) in spec.angles.iter().enumerate() {
            let dist = (spec.polar_distance)(angle);
            let (sin, cos) = angle.sin_cos();
            let (x, y) = (dist * cos, dist * sin);
            let cap_uv = Vec2::new((x + 1.0) / 2.0, (y + 1.0) / 2.0);
            let side_u = spec.u_reps as f32 * angle.min(PI - angle) / TAU;
            let radial = Vec3::new(cos, sin, 0.0);

            let top = Vec4::new(x, y, 1.0, 1.0);
            let bottom = Vec4::new(x, y, -1.0, 1.0);

            vertices[i] = Vertex::new(top, Vec3::Z, cap_uv);
            vertices[n + 2 * i] = Vertex::new(top, radial, Vec2::new(side_u, 0.0));
            vertices[n + 2 * i + 1] = Vertex::new(bottom, radial, Vec2::new(side_u, spec.v_reps));
            vertices[3 * n + i] = Vertex::new(bottom, Vec3::NEG_Z, cap_uv);
        }

        let mut triangles = Vec::with_capacity(3 * (2 * (n - 2) + 2 * n));
        let strip = cap_strip(n);
        push_strip(&mut triangles, &strip, 0);
        push_side_ring(&mut triangles, n);
        push_strip(&mut triangles, &strip, 3 * n as u32);

        Primitive::new(spec.name.clone(), spec.material, spec.normal_map, vertices, triangles)
    }
}

/// Sample order 0, 1, N-1, 2, N-2, ... visiting every sample once.
fn cap_strip(n: usize) -> Vec<u32> {
    let mut order = Vec::with_capacity(n);
    order.push(0);
    let (mut lo, mut hi) = (1u32, n as u32 - 1);
    while lo <= hi {
        order.push(lo);
        if hi != lo {
            order.push(hi);
        }
        lo += 1;
        hi -= 1;
    }
    order
}

/// Expands a strip into triangles with consistent winding.
fn push_strip(out: &mut Vec<u32>, strip: &[u32], base: u32) {
    for (k, w) in strip.windows(3).enumerate() {
        if k % 2 == 0 {
            out.extend([base + w[0], base + w[1], base + w[2]]);
        } else {
            out.extend([base + w[1], base + w[0], base + w[2]]);
        }
    }
}

fn push_side_ring(out: &mut Vec<u32>, n: usize) {
    let n = n as u32;
    for i in 0..n {
        let j = (i + 1) % n;
        let (top_i, bottom_i) = (n + 2 * i, n + 2 * i + 1);
        let (top_j, bottom_j) = (n + 2 * j, n + 2 * j + 1);
        out.extend([top_i, bottom_i, top_j]);
        out.extend([bottom_i, bottom_j, top_j]);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::texture::TextureRegistry;

    fn samples(n: usize) -> Vec<f32> {
        (0..n).map(|i| i as f32 * TAU / n as f32).collect()
    }

    fn cylinder(n: usize) -> Primitive {
        let mat = TextureRegistry::new("").color("cyl.png");
        Primitive::cylinder(&CylinderSpec::circle("cyl", mat, samples(n))).unwrap()
    }

    fn side_triangles(p: &Primitive, n: usize) -> Vec<[u32; 3]> {
        let side = (n as u32)..(3 * n as u32);
        p.triangles()
            .chunks(3)
            .filter(|t| t.iter().all(|i| side.contains(i)))
            .map(|t| [t[0], t[1], t[2]])
            .collect()
    }

    fn area(p: &Primitive, t: [u32; 3]) -> f32 {
        let pos = |i: u32| p.vertices()[i as usize].position.truncate();
        (pos(t[1]) - pos(t[0])).cross(pos(t[2]) - pos(t[0])).length() / 2.0
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn fewer_than_three_samples_is_rejected() {
        let mat = TextureRegistry::new("").color("cyl.png");
        let err = Primitive::cylinder(&CylinderSpec::circle("c", mat, vec![0.0, 1.0])).unwrap_err();
        assert!(matches!(err, SceneError::InvalidGeometryParameters { shape: "cylinder", .. }));
    }

    #[test]
    fn unsorted_samples_are_rejected() {
        let mat = TextureRegistry::new("").color("cyl.png");
        let spec = CylinderSpec::circle("c", mat, vec![0.0, 2.0, 1.0]);
        assert!(Primitive::cylinder(&spec).is_err());
    }

    fn rejects(spec: CylinderSpec) -> bool {
        matches!(
            Primitive::cylinder(&spec),
            Err(SceneError::InvalidGeometryParameters { shape: "cylinder", .. })
        )
    }

    #[test]
    fn angles_outside_one_turn_are_rejected() {
        let mat = TextureRegistry::new("").color("cyl.png");
        assert!(rejects(CylinderSpec::circle("c", mat, vec![0.0, 1.0, TAU])));
        assert!(rejects(CylinderSpec::circle("c", mat, vec![-0.1, 1.0, 2.0])));
        assert!(rejects(CylinderSpec::circle("c", mat, vec![0.0, f32::NAN, 2.0])));
        assert!(!rejects(CylinderSpec::circle("c", mat, vec![0.0, 1.0, TAU - 0.01])));
    }

    #[test]
    fn polar_distance_must_be_positive_and_finite() {
        let mat = TextureRegistry::new("").color("cyl.png");
        let with = |polar_distance: fn(f32) -> f32| CylinderSpec {
            polar_distance,
            ..CylinderSpec::circle("c", mat, samples(4))
        };
        assert!(rejects(with(|_| 0.0)));
        assert!(rejects(with(|_| -1.0)));
        assert!(rejects(with(|_| f32::INFINITY)));
        assert!(rejects(with(|_| f32::NAN)));
        // A single bad sample is enough.
        assert!(rejects(with(|a| if a > 3.0 { 0.0 } else { 1.0 })));
        assert!(!rejects(with(|_| 0.25)));
    }

    #[test]
    fn non_finite_v_reps_is_rejected() {
        let mat = TextureRegistry::new("").color("cyl.png");
        let spec = |v: f32| CylinderSpec::circle("c", mat, samples(4)).with_reps(1, v);
        assert!(rejects(spec(f32::NAN)));
        assert!(rejects(spec(f32::INFINITY)));
        assert!(rejects(spec(f32::NEG_INFINITY)));
        assert!(!rejects(spec(2.5)));
    }

    #[test]
    fn vertex_count_is_four_per_sample() {
        assert_eq!(cylinder(4).vertex_count(), 16);
        assert_eq!(cylinder(7).vertex_count(), 28);
    }

    #[test]
    fn cap_strip_visits_every_sample_once() {
        for n in 3..9 {
            let mut s = cap_strip(n);
            s.sort_unstable();
            assert_eq!(s, (0..n as u32).collect::<Vec<_>>());
        }
    }

    // ── side ring closure ─────────────────────────────────────────────────

    #[test]
    fn side_ring_is_closed_for_even_and_odd_counts() {
        for n in [3usize, 4, 5, 8, 9] {
            let p = cylinder(n);
            let side = side_triangles(&p, n);
            assert_eq!(side.len(), 2 * n, "n = {n}");

            // Every vertical edge (top_i, bottom_i) borders exactly two triangles.
            let mut edge_uses: HashMap<u32, usize> = HashMap::new();
            for t in &side {
                for i in 0..n as u32 {
                    let (top, bottom) = (n as u32 + 2 * i, n as u32 + 2 * i + 1);
                    if t.contains(&top) && t.contains(&bottom) {
                        *edge_uses.entry(i).or_default() += 1;
                    }
                }
            }
            assert_eq!(edge_uses.len(), n, "n = {n}");
            assert!(edge_uses.values().all(|&c| c == 2), "n = {n}");
        }
    }

    #[test]
    fn seam_quad_joins_last_sample_to_first() {
        let n = 5;
        let p = cylinder(n);
        let last_top = n as u32 + 2 * (n as u32 - 1);
        let first_top = n as u32;
        assert!(side_triangles(&p, n)
            .iter()
            .any(|t| t.contains(&last_top) && t.contains(&first_top)));
    }

    #[test]
    fn no_duplicate_or_zero_area_triangles() {
        for n in [4usize, 5] {
            let p = cylinder(n);
            let mut seen = std::collections::HashSet::new();
            for t in p.triangles().chunks(3) {
                let t = [t[0], t[1], t[2]];
                assert!(t[0] != t[1] && t[1] != t[2] && t[0] != t[2]);
                assert!(area(&p, t) > 1e-4, "n = {n}, {t:?}");
                let mut key = t;
                key.sort_unstable();
                assert!(seen.insert(key), "duplicate {t:?}");
            }
            assert_eq!(p.triangles().len() / 3, 2 * (n - 2) + 2 * n);
        }
    }
}
