use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use stereoworld_scene::builder::SceneKind;

/// Renders a procedurally built scene on a window or a stereo headset.
#[derive(Parser, Debug)]
#[command(name = "stereoworld", version, about, long_about = None)]
pub struct Cli {
    /// Display target.
    #[arg(short = 'D', long = "display", value_enum, default_value_t = DisplayKind::Mono)]
    pub display: DisplayKind,

    /// Mono window width in pixels.
    #[arg(long, default_value_t = 1000)]
    pub width: u32,

    /// Mono window height in pixels.
    #[arg(long, default_value_t = 1000)]
    pub height: u32,

    /// Scene builder and its colon-separated parameters, e.g. `-S table 0.5:0.5:0.4`.
    ///
    /// Builders: cube SIZE, multicube SIZE, room SIZE, table WIDTH:LENGTH:HEIGHT.
    #[arg(short = 'S', long = "scene", num_args = 2, value_names = ["KIND", "PARAMS"])]
    pub scene: Option<Vec<String>>,

    /// Directory texture file names are resolved against.
    #[arg(long, default_value = "Resource")]
    pub assets: PathBuf,

    /// Log filter in `env_logger` syntax; overrides RUST_LOG.
    #[arg(long = "log")]
    pub log: Option<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum DisplayKind {
    /// Single window with a fixed camera.
    #[value(alias = "simple")]
    Mono,
    /// Simulated headset mirrored side by side into the window.
    Stereo,
    /// Real VR runtime.
    Hmd,
}

impl Cli {
    /// The selected scene builder.
    pub fn scene(&self) -> Result<SceneKind> {
        let Some(args) = self.scene.as_deref() else {
            bail!("no scene specified (use -S <kind> <params>)");
        };
        let [kind, params] = args else {
            bail!("-S expects a scene kind and its parameters");
        };
        SceneKind::parse(kind, params).with_context(|| format!("invalid scene '{kind} {params}'"))
    }
}
