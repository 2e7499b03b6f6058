use winit::window::{Window, WindowId};

use crate::coords::Viewport;
use crate::device::{Gpu, SurfaceErrorAction};
use crate::gpu::{GpuBackend, WgpuBackend};
use crate::paint::Color;
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

use super::app::AppControl;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Current drawable area; logical size follows the window's DPI scale.
    pub fn viewport(&self) -> Viewport {
        let phys = self.window.inner_size();
        Viewport::from_physical(phys.width, phys.height, self.window.scale_factor())
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
    /// Graphics context for this window. Its id is stable for the window's lifetime.
    pub backend: &'a mut WgpuBackend,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Acquires the surface, clears it with `clear`, calls `draw` with the
    /// backend, then presents.
    ///
    /// Draw coordinates are logical pixels. A lost or outdated surface skips the
    /// frame; an out-of-memory surface asks the runtime to exit.
    pub fn render<F>(&mut self, clear: Color, draw: F) -> AppControl
    where
        F: FnOnce(&mut dyn GpuBackend),
    {
        let viewport = self.window.viewport();

        let frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                log::debug!("surface unavailable: {err}");
                let action = self.gpu.handle_surface_error(err);
                if action == SurfaceErrorAction::Fatal {
                    return AppControl::Exit;
                }
                return AppControl::Continue;
            }
        };

        let [r, g, b, a] = clear.to_array();
        self.backend.set_viewport(viewport);
        self.backend.begin_frame(
            frame,
            wgpu::Color { r: r as f64, g: g as f64, b: b as f64, a: a as f64 },
        );

        draw(&mut *self.backend);

        let Some(frame) = self.backend.end_frame() else {
            log::error!("frame detached before submission");
            return AppControl::Continue;
        };
        self.window.window.pre_present_notify();
        self.gpu.submit(frame);

        AppControl::Continue
    }
}
