use anyhow::{Context, Result, bail};
use stereoworld_engine::config::{MonoConfig, RenderConfig, StereoConfig};
use stereoworld_engine::core::{App, AppControl, FrameCtx, StartCtx};
use stereoworld_engine::display::{MirrorCompositor, MonoDisplay, StereoDisplay};
use stereoworld_engine::gpu::{GpuBackend, WgpuBackend};
use stereoworld_engine::pose::{HmdEyeModel, KeyboardPose, SimulatedHmdPose};
use stereoworld_engine::renderer::{FrameStatus, Output, Renderer};
use stereoworld_engine::texture::DiskImages;
use stereoworld_scene::{AssembledScene, TextureRegistry};

use crate::cli::DisplayKind;

/// Everything the viewer needs to open its outputs once a GPU exists.
pub struct ViewerSettings {
    pub display: DisplayKind,
    pub render: RenderConfig,
    pub mono: MonoConfig,
    pub stereo: StereoConfig,
}

/// Pairs each display with its pose provider.
pub fn build_outputs(backend: &mut dyn GpuBackend, settings: &ViewerSettings) -> Result<Vec<Output>> {
    let clear = settings.render.clear_color;
    match settings.display {
        DisplayKind::Mono => Ok(vec![Output::new(
            MonoDisplay::new(&settings.mono, clear),
            KeyboardPose::default(),
        )]),
        DisplayKind::Stereo => {
            let stereo = &settings.stereo;
            let pose = SimulatedHmdPose::new(KeyboardPose::default(), HmdEyeModel::from_config(stereo));
            let compositor = MirrorCompositor::new(backend, (stereo.eye_width, stereo.eye_height), clear)
                .context("failed to create the mirror compositor")?;
            let display = StereoDisplay::new(
                backend,
                &pose,
                Box::new(compositor),
                settings.render.msaa_samples,
                clear,
            )
            .context("failed to create the stereo display")?;
            Ok(vec![Output::new(display, pose)])
        }
        DisplayKind::Hmd => bail!("display 'hmd' needs a VR runtime, which this build does not include"),
    }
}

struct Session {
    backend: WgpuBackend,
    renderer: Renderer,
}

/// The viewer application driven by the engine runtime.
pub struct ViewerApp {
    settings: ViewerSettings,
    scene: AssembledScene,
    textures: TextureRegistry,
    session: Option<Session>,
    failure: Option<anyhow::Error>,
}

impl ViewerApp {
    pub fn new(settings: ViewerSettings, scene: AssembledScene, textures: TextureRegistry) -> Self {
        Self { settings, scene, textures, session: None, failure: None }
    }

    /// Frames rendered so far.
    pub fn frames(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.renderer.frames())
    }

    /// The error that ended the session, if any.
    pub fn finish(self) -> Result<()> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl App for ViewerApp {
    fn on_start(&mut self, ctx: &mut StartCtx<'_, '_>) -> Result<()> {
        let mut backend = WgpuBackend::new(ctx.gpu).context("failed to create the GPU back end")?;
        let outputs = build_outputs(&mut backend, &self.settings)?;

        let renderer = Renderer::new(
            &mut backend,
            &self.scene,
            &self.textures,
            &mut DiskImages,
            &self.settings.render,
            outputs,
        )
        .context("renderer setup failed")?;

        self.session = Some(Session { backend, renderer });
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let Some(session) = self.session.as_mut() else {
            return AppControl::Exit;
        };
        let renderer = &mut session.renderer;

        match ctx.render(&mut session.backend, |backend, input, frame| renderer.frame(backend, input, frame)) {
            Ok(Some(FrameStatus::Quit)) => AppControl::Exit,
            Ok(Some(FrameStatus::Continue) | None) => AppControl::Continue,
            Err(err) => {
                self.failure = Some(anyhow::Error::new(err).context(format!("frame {} failed", renderer.frames())));
                AppControl::Exit
            }
        }
    }
}
