//! `stereoworld` command-line viewer.
//!
//! ```text
//! stereoworld -D mono   -S table 0.5:0.5:0.4
//! stereoworld -D stereo -S room 4
//! ```

mod app;
mod cli;

use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use glam::Mat4;
use stereoworld_engine::config::{MonoConfig, RenderConfig, StereoConfig};
use stereoworld_engine::device::GpuInit;
use stereoworld_engine::logging::{LoggingConfig, init_logging};
use stereoworld_engine::window::{Runtime, RuntimeConfig};
use stereoworld_scene::builder::build_scene;
use stereoworld_scene::{TextureRegistry, assemble};
use winit::dpi::LogicalSize;

use crate::app::{ViewerApp, ViewerSettings};
use crate::cli::{Cli, DisplayKind};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(LoggingConfig { env_filter: cli.log.clone(), ..Default::default() });

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.display == DisplayKind::Hmd {
        bail!("display 'hmd' needs a VR runtime, which this build does not include (try -D stereo)");
    }
    let kind = cli.scene()?;

    let render = RenderConfig::default();
    let mono = MonoConfig { width: cli.width, height: cli.height, ..MonoConfig::default() };
    let stereo = StereoConfig::default();

    let mut textures = TextureRegistry::new(&cli.assets);
    let root = build_scene(kind, &mut textures).context("failed to build the scene")?;
    let scene = assemble(&root, Mat4::IDENTITY, render.texture_transform).context("failed to assemble the scene")?;

    let runtime = RuntimeConfig {
        initial_size: window_size(cli.display, &mono, &stereo),
        ..RuntimeConfig::default()
    };
    let settings = ViewerSettings { display: cli.display, render, mono, stereo };

    let app = Runtime::run(runtime, GpuInit::default(), ViewerApp::new(settings, scene, textures))?;
    log::info!("exiting after {} frame(s)", app.frames());
    app.finish()
}

/// Mono uses the requested size; stereo mirrors two half-size eyes side by side.
fn window_size(display: DisplayKind, mono: &MonoConfig, stereo: &StereoConfig) -> LogicalSize<f64> {
    match display {
        DisplayKind::Stereo => LogicalSize::new(f64::from(stereo.eye_width), f64::from(stereo.eye_height) / 2.0),
        _ => LogicalSize::new(f64::from(mono.width), f64::from(mono.height)),
    }
}
