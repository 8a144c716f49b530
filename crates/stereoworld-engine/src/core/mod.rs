//! Core engine-facing contracts.
//!
//! The stable interface between the runtime (platform loop) and the
//! application: startup with a ready GPU, window events, and one call per
//! frame with a context that knows how to acquire and present the surface.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, StartCtx, WindowCtx};
