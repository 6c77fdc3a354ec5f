use anyhow::{bail, Result};
use winit::window::{Window, WindowId};

use crate::device::{Gpu, GpuFrame, SurfaceErrorAction};
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

/// Window handle and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Drawable size in physical pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Acquires the next surface frame.
    ///
    /// Returns `Ok(None)` when the frame should be skipped (surface lost,
    /// outdated or timed out; the surface is reconfigured where possible).
    /// Fails only when the surface cannot recover.
    pub fn acquire_frame(&mut self) -> Result<Option<GpuFrame>> {
        match self.gpu.begin_frame() {
            Ok(frame) => {
                self.window.window.pre_present_notify();
                Ok(Some(frame))
            }
            Err(err) => {
                log::debug!("surface acquisition failed: {err}");
                match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => bail!("surface is out of memory"),
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => Ok(None),
                }
            }
        }
    }
}
