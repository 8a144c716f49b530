use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4};

use crate::gpu::{Uniform, UniformValue};
use crate::renderer::MAX_LIGHTS;

/// Dynamic-offset stride between per-draw uniform snapshots.
pub(super) const UNIFORM_STRIDE: u64 = 512;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(super) struct LightBlock {
    position: [f32; 4],
    color: [f32; 4],
}

/// CPU mirror of the `Uniforms` struct in `lit.wgsl` (368 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(super) struct UniformBlock {
    mvp: [[f32; 4]; 4],
    light_space: [[f32; 4]; 4],
    /// mat3x3 columns padded to vec4.
    normal_matrix: [[f32; 4]; 3],
    eye_position: [f32; 4],
    lights: [LightBlock; MAX_LIGHTS],
    light_count: u32,
    use_normal_map: u32,
    _pad: [u32; 2],
}

impl Default for UniformBlock {
    fn default() -> Self {
        let mut block = Self::zeroed();
        block.mvp = Mat4::IDENTITY.to_cols_array_2d();
        block.light_space = Mat4::IDENTITY.to_cols_array_2d();
        block.normal_matrix = pad_mat3(Mat3::IDENTITY);
        block
    }
}

impl UniformBlock {
    /// Applies one uniform write, rejecting value types the slot cannot hold.
    pub(super) fn set(&mut self, uniform: Uniform, value: UniformValue) -> Result<(), String> {
        match (uniform, value) {
            (Uniform::Mvp, UniformValue::Mat4(m)) => self.mvp = m.to_cols_array_2d(),
            (Uniform::LightSpace, UniformValue::Mat4(m)) => self.light_space = m.to_cols_array_2d(),
            (Uniform::NormalMatrix, UniformValue::Mat3(m)) => self.normal_matrix = pad_mat3(m),
            (Uniform::EyePosition, UniformValue::Vec3(v)) => self.eye_position = v.extend(1.0).to_array(),
            (Uniform::LightCount, UniformValue::Int(n)) => {
                if n < 0 || n as usize > MAX_LIGHTS {
                    return Err(format!("light count {n} outside 0..={MAX_LIGHTS}"));
                }
                self.light_count = n as u32;
            }
            (Uniform::LightPosition(i), UniformValue::Vec4(v)) => self.light_mut(i)?.position = v.to_array(),
            (Uniform::LightColor(i), UniformValue::Vec3(c)) => self.light_mut(i)?.color = c.extend(1.0).to_array(),
            (Uniform::UseNormalMap, UniformValue::Bool(b)) => self.use_normal_map = u32::from(b),
            (uniform, value) => return Err(format!("uniform {uniform:?} cannot hold {value:?}")),
        }
        Ok(())
    }

    fn light_mut(&mut self, index: usize) -> Result<&mut LightBlock, String> {
        self.lights
            .get_mut(index)
            .ok_or_else(|| format!("light index {index} outside 0..{MAX_LIGHTS}"))
    }
}

fn pad_mat3(m: Mat3) -> [[f32; 4]; 3] {
    [
        m.x_axis.extend(0.0).to_array(),
        m.y_axis.extend(0.0).to_array(),
        m.z_axis.extend(0.0).to_array(),
    ]
}

#[cfg(test)]
mod tests {
    use glam::{Vec3, Vec4};

    use super::*;

    #[test]
    fn block_matches_shader_layout() {
        assert_eq!(std::mem::size_of::<UniformBlock>(), 368);
        assert!(std::mem::size_of::<UniformBlock>() as u64 <= UNIFORM_STRIDE);
    }

    #[test]
    fn vertex_stage_applies_the_uploaded_normal_matrix() {
        let source = include_str!("shaders/lit.wgsl");
        let vs_start = source.find("fn vs_main").unwrap();
        let vs_end = vs_start + source[vs_start..].find("\n}\n").unwrap();
        let vs = &source[vs_start..vs_end];
        assert!(vs.contains("u.normal_matrix * in.normal"), "{vs}");

        let fs = &source[source.find("fn fs_main").unwrap()..];
        assert!(fs.contains("normalize(in.view_normal)"));
        assert!(!fs.contains("u.normal_matrix"));
    }

    #[test]
    fn normal_matrix_write_lands_in_its_padded_columns() {
        let mut block = UniformBlock::default();
        let m = Mat3::from_cols(Vec3::X * 2.0, Vec3::Y, Vec3::Z * 0.5);
        block.set(Uniform::NormalMatrix, UniformValue::Mat3(m)).unwrap();
        assert_eq!(block.normal_matrix[0], [2.0, 0.0, 0.0, 0.0]);
        assert_eq!(block.normal_matrix[2], [0.0, 0.0, 0.5, 0.0]);
    }

    #[test]
    fn typed_writes_land_in_their_slots() {
        let mut block = UniformBlock::default();
        block.set(Uniform::LightCount, UniformValue::Int(2)).unwrap();
        block.set(Uniform::LightPosition(1), UniformValue::Vec4(Vec4::new(1.0, 2.0, 3.0, 1.0))).unwrap();
        block.set(Uniform::UseNormalMap, UniformValue::Bool(true)).unwrap();
        assert_eq!(block.light_count, 2);
        assert_eq!(block.lights[1].position, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(block.use_normal_map, 1);
    }

    #[test]
    fn mismatched_value_type_is_rejected() {
        let mut block = UniformBlock::default();
        assert!(block.set(Uniform::Mvp, UniformValue::Vec3(Vec3::ONE)).is_err());
        assert!(block.set(Uniform::LightColor(5), UniformValue::Vec3(Vec3::ONE)).is_err());
        assert!(block.set(Uniform::LightCount, UniformValue::Int(6)).is_err());
    }
}
