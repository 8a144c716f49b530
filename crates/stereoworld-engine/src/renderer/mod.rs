//! Frame orchestrator.
//!
//! One-time setup uploads the assembled scene, configures the lights and
//! renders the shadow map. Each frame then walks every output:
//!
//! ```text
//! poll input → prepare → per material { bind textures, bind vao, redraw } → swap
//! ```
//!
//! Every output's pose provider is polled once per frame. A quit from any of
//! them ends the loop once the current frame has been presented on all
//! outputs.

mod light;
mod shadow;
mod upload;

use stereoworld_scene::{AssembledScene, TextureRegistry};

use crate::config::RenderConfig;
use crate::display::Display;
use crate::error::RenderError;
use crate::gpu::{GpuBackend, TextureUnit, check_errors};
use crate::input::{InputFrame, InputState};
use crate::pose::PoseProvider;
use crate::shader::ShaderBinding;
use crate::texture::ImageSource;

pub use self::light::{LightSource, MAX_LIGHTS};
pub use self::shadow::ShadowMap;
pub use self::upload::{GpuScene, MaterialTextures, upload_scene};

/// A display paired with the provider that steers it.
pub struct Output {
    pub display: Box<dyn Display>,
    pub pose: Box<dyn PoseProvider>,
}

impl Output {
    pub fn new(display: impl Display + 'static, pose: impl PoseProvider + 'static) -> Self {
        Self { display: Box::new(display), pose: Box::new(pose) }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameStatus {
    Continue,
    Quit,
}

pub struct Renderer {
    shader: ShaderBinding,
    scene: GpuScene,
    shadow: ShadowMap,
    outputs: Vec<Output>,
    frames: u64,
}

impl Renderer {
    pub fn new(
        backend: &mut dyn GpuBackend,
        scene: &AssembledScene,
        textures: &TextureRegistry,
        images: &mut dyn ImageSource,
        config: &RenderConfig,
        outputs: Vec<Output>,
    ) -> Result<Self, RenderError> {
        let light_space = config.light_space.matrix();

        let shader = ShaderBinding::new(backend)?;
        shader.set_lights(backend, &config.lights, light_space)?;

        let gpu_scene = upload_scene(backend, scene, textures, images)?;

        let shadow = ShadowMap::new(backend, config.shadow_map_size, light_space)?;
        shadow.render(backend, &gpu_scene)?;
        check_errors(backend)?;

        log::info!(
            "renderer ready: {} material(s), {} light(s), {} output(s)",
            gpu_scene.len(),
            config.lights.len(),
            outputs.len()
        );

        Ok(Self { shader, scene: gpu_scene, shadow, outputs, frames: 0 })
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn shadow(&self) -> &ShadowMap {
        &self.shadow
    }

    /// Renders one frame on every output.
    pub fn frame(
        &mut self,
        backend: &mut dyn GpuBackend,
        input: &InputState,
        input_frame: &InputFrame,
    ) -> Result<FrameStatus, RenderError> {
        self.scene.check()?;

        let mut quit = false;
        for output in &mut self.outputs {
            quit |= output.pose.poll_input(input, input_frame);

            output.display.prepare(backend, output.pose.as_mut(), &self.shader)?;
            for (textures, vao, index_count) in self.scene.iter() {
                self.shader.bind(backend);
                backend.bind_texture(TextureUnit::Diffuse, textures.diffuse);
                match textures.normal_map {
                    Some(normal) => {
                        backend.bind_texture(TextureUnit::NormalMap, normal);
                        self.shader.set_normal_map(backend, true);
                    }
                    None => self.shader.set_normal_map(backend, false),
                }
                backend.bind_texture(TextureUnit::ShadowMap, self.shadow.texture());
                backend.bind_vertex_array(vao);
                output.display.redraw(backend, &self.shader, index_count)?;
            }
            output.display.swap(backend)?;
        }
        check_errors(backend)?;

        self.frames += 1;
        if quit {
            log::info!("quit requested after {} frame(s)", self.frames);
            return Ok(FrameStatus::Quit);
        }
        Ok(FrameStatus::Continue)
    }
}
