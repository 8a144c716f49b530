//! Stereoworld engine crate.
//!
//! Owns the platform + GPU runtime pieces and the rendering pipeline that
//! turns an assembled scene into frames on one or more display targets.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`device`] | wgpu instance/adapter/device/surface (`Gpu`) |
//! | [`window`] | winit event loop and window lifecycle (`Runtime`) |
//! | [`core`] | `App` contract and per-frame context |
//! | [`input`] | platform-agnostic input state |
//! | [`time`] | frame clock |
//! | [`logging`] | `env_logger` setup |
//! | [`gpu`] | `GpuBackend` trait, wgpu and recording back ends |
//! | [`shader`] | typed uniform setters for the lit program |
//! | [`display`] | `Display` trait, mono and stereo targets, compositors |
//! | [`pose`] | `PoseProvider` trait, keyboard and simulated HMD providers |
//! | [`renderer`] | frame orchestrator, upload, lights, shadow map |
//! | [`texture`] | image decoding |
//! | [`config`] | render, mono and stereo configuration |

pub mod config;
pub mod core;
pub mod device;
pub mod display;
pub mod gpu;
pub mod input;
pub mod logging;
pub mod pose;
pub mod renderer;
pub mod shader;
pub mod texture;
pub mod time;
pub mod window;

mod error;
#[cfg(test)]
mod testing;

pub use error::{PoseUnavailable, RenderError};
