//! Typed uniform setters for the lit program.

use glam::{Mat4, Vec3};
use stereoworld_scene::vertex::normal_matrix;

use crate::error::RenderError;
use crate::gpu::{GpuBackend, ProgramHandle, ProgramKind, Uniform, UniformValue};
use crate::renderer::{LightSource, MAX_LIGHTS};

/// Handle to the lit program plus the calls that feed it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ShaderBinding {
    program: ProgramHandle,
}

impl ShaderBinding {
    pub fn new(backend: &mut dyn GpuBackend) -> Result<Self, RenderError> {
        let program = backend.create_program(ProgramKind::Lit)?;
        Ok(Self { program })
    }

    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    pub fn bind(&self, backend: &mut dyn GpuBackend) {
        backend.use_program(self.program);
    }

    /// Uploads the light list and the shadow light-space matrix.
    ///
    /// Fails without touching the backend when more than [`MAX_LIGHTS`] are given.
    pub fn set_lights(
        &self,
        backend: &mut dyn GpuBackend,
        lights: &[LightSource],
        light_space: Mat4,
    ) -> Result<(), RenderError> {
        if lights.len() > MAX_LIGHTS {
            return Err(RenderError::resource(format!(
                "{} lights configured, the lit program takes at most {MAX_LIGHTS}",
                lights.len()
            )));
        }

        self.bind(backend);
        backend.set_uniform(Uniform::LightSpace, UniformValue::Mat4(light_space));
        backend.set_uniform(Uniform::LightCount, UniformValue::Int(lights.len() as i32));
        for (i, light) in lights.iter().enumerate() {
            backend.set_uniform(Uniform::LightPosition(i), UniformValue::Vec4(light.position));
            backend.set_uniform(Uniform::LightColor(i), UniformValue::Vec3(light.color));
        }
        Ok(())
    }

    /// Sets the per-view transforms: MVP, its normal matrix and the viewer
    /// position used for specular highlights.
    pub fn run(&self, backend: &mut dyn GpuBackend, mvp: Mat4, eye_position: Vec3) {
        self.bind(backend);
        backend.set_uniform(Uniform::Mvp, UniformValue::Mat4(mvp));
        backend.set_uniform(Uniform::NormalMatrix, UniformValue::Mat3(normal_matrix(&mvp)));
        backend.set_uniform(Uniform::EyePosition, UniformValue::Vec3(eye_position));
    }

    pub fn set_normal_map(&self, backend: &mut dyn GpuBackend, enabled: bool) {
        backend.set_uniform(Uniform::UseNormalMap, UniformValue::Bool(enabled));
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;
    use crate::gpu::{GpuOp, RecordingBackend};

    fn light() -> LightSource {
        LightSource::new(Vec4::new(0.0, 1.0, 0.0, 1.0), Vec3::ONE)
    }

    #[test]
    fn lights_are_uploaded_in_order() {
        let mut backend = RecordingBackend::new(10, 10);
        let shader = ShaderBinding::new(&mut backend).unwrap();
        shader.set_lights(&mut backend, &[light(), light()], Mat4::IDENTITY).unwrap();

        assert!(backend.ops().contains(&GpuOp::SetUniform(Uniform::LightCount, UniformValue::Int(2))));
        assert_eq!(
            backend.count(|op| matches!(op, GpuOp::SetUniform(Uniform::LightPosition(_), _))),
            2
        );
    }

    #[test]
    fn six_lights_are_rejected() {
        let mut backend = RecordingBackend::new(10, 10);
        let shader = ShaderBinding::new(&mut backend).unwrap();
        backend.clear_ops();

        let err = shader.set_lights(&mut backend, &[light(); 6], Mat4::IDENTITY).unwrap_err();
        assert!(matches!(err, RenderError::Resource { .. }));
        assert!(backend.ops().is_empty());
    }

    #[test]
    fn run_derives_the_normal_matrix() {
        let mut backend = RecordingBackend::new(10, 10);
        let shader = ShaderBinding::new(&mut backend).unwrap();
        let mvp = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        shader.run(&mut backend, mvp, Vec3::ZERO);

        let expected = normal_matrix(&mvp);
        assert!(backend.ops().contains(&GpuOp::SetUniform(Uniform::NormalMatrix, UniformValue::Mat3(expected))));
    }
}
