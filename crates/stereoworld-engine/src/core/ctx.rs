use winit::window::{CursorGrabMode, Window};

use crate::device::{Gpu, SurfaceErrorAction};
use crate::error::RenderError;
use crate::gpu::WgpuBackend;
use crate::input::{InputFrame, InputState};
use crate::time::FrameTime;

/// Window handle plus the few window operations the app may need.
pub struct WindowCtx<'a> {
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Physical window size as `(width, height)`.
    pub fn physical_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    /// Hides the cursor and locks it to the window so mouse motion only
    /// arrives as relative deltas. Falls back to confining it.
    pub fn grab_cursor(&self) {
        let grabbed = self
            .window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined));
        match grabbed {
            Ok(()) => self.window.set_cursor_visible(false),
            Err(err) => log::warn!("cursor grab unavailable: {err}"),
        }
    }
}

/// Context passed to `core::App::on_start`.
pub struct StartCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a Gpu<'w>,
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub input: &'a InputState,
    pub input_frame: &'a InputFrame,
    pub time: FrameTime,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Acquires the surface, lends it to `backend` for the duration of `draw`,
    /// then presents it.
    ///
    /// Returns `Ok(None)` when the surface is unavailable this frame (minimised,
    /// lost, timed out); the frame is skipped and `draw` is not called.
    pub fn render<T, F>(&mut self, backend: &mut WgpuBackend, draw: F) -> Result<Option<T>, RenderError>
    where
        F: FnOnce(&mut WgpuBackend, &InputState, &InputFrame) -> Result<T, RenderError>,
    {
        let size = self.gpu.size();
        if size.width == 0 || size.height == 0 {
            return Ok(None);
        }

        let frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                return match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => Err(RenderError::resource("surface lost: out of memory")),
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => Ok(None),
                };
            }
        };

        backend.attach_window(frame.view.clone(), (size.width, size.height));
        let result = draw(backend, self.input, self.input_frame);
        backend.detach_window();

        let value = result?;
        self.window.window.pre_present_notify();
        self.gpu.present(frame);
        Ok(Some(value))
    }
}
