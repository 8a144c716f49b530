//! GPU device + surface management.
//!
//! Creates the wgpu instance, adapter, device and queue, configures the
//! window surface and hands out one surface texture per frame. Rendering
//! itself goes through [`crate::gpu::WgpuBackend`], which shares the device
//! and queue.

mod frame;
mod gpu;
mod surface;

pub use frame::GpuFrame;
pub use gpu::{Gpu, GpuInit};
pub use surface::SurfaceErrorAction;
