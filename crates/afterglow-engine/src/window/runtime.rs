use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App as CoreApp, AppControl, CancelToken, FrameCtx, FrameLoop, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::input::platform::winit::translate_window_event;
use crate::input::HostEvent;
use crate::time::FrameClock;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Stop after this many frames. `None` runs until closed.
    pub max_frames: Option<u64>,
    /// Cancelling this token ends the frame loop at the next redraw.
    pub cancel: CancelToken,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "afterglow".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            max_frames: None,
            cancel: CancelToken::new(),
        }
    }
}

/// Runtime context passed to the application.
///
/// Requests are applied after the current callback returns.
#[derive(Debug, Default)]
pub struct RuntimeCtx {
    exit: bool,
    failure: Option<anyhow::Error>,
}

impl RuntimeCtx {
    pub fn exit(&mut self) {
        self.exit = true;
    }

    /// Stops the runtime; [`Runtime::run`] returns `err`.
    ///
    /// Only the first failure is kept.
    pub fn fail(&mut self, err: anyhow::Error) {
        self.exit = true;
        match &self.failure {
            Some(first) => log::warn!("ignoring failure after '{first}': {err:#}"),
            None => self.failure = Some(err),
        }
    }

    pub fn is_exiting(&self) -> bool {
        self.exit
    }

    /// Folds the callback's directive into the requests made through `self`.
    fn finish(self, control: AppControl) -> (bool, Option<anyhow::Error>) {
        (self.exit || control == AppControl::Exit, self.failure)
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window and redraws it continuously until the app exits,
    /// the window closes or the frame loop stops.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,
    frame_loop: FrameLoop,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState<A>
where
    A: CoreApp + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    window: Option<WindowEntry>,
    exit_requested: bool,
    failure: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: CoreApp + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            config,
            gpu_init,
            app,
            window: None,
            exit_requested: false,
            failure: None,
        }
    }

    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.exit_requested = true;
        event_loop.exit();
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let entry = WindowEntryTryBuilder {
            clock: FrameClock::new(),
            frame_loop: FrameLoop::new(self.config.cancel.clone(), self.config.max_frames),
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed for window")?;

        log::info!("window '{}' opened", self.config.title);
        entry.with_window(|w| w.request_redraw());
        self.window = Some(entry);
        Ok(())
    }

    /// Applies the outcome of one app callback.
    fn settle(&mut self, event_loop: &ActiveEventLoop, control: AppControl, ctx: RuntimeCtx) {
        let (exit, failure) = ctx.finish(control);
        if let Some(err) = failure {
            log::error!("{err:#}");
            if self.failure.is_none() {
                self.failure = Some(err);
            }
        }
        if exit {
            self.request_exit(event_loop);
        }
    }

    fn forward(&mut self, event_loop: &ActiveEventLoop, event: &HostEvent) {
        let mut runtime_ctx = RuntimeCtx::default();
        let control = self.app.on_event(event, &mut runtime_ctx);
        self.settle(event_loop, control, runtime_ctx);
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId) {
        let mut runtime_ctx = RuntimeCtx::default();
        let mut control = AppControl::Continue;

        // Split borrows to avoid `self` capture inside `ouroboros` closures.
        let (app, entry) = (&mut self.app, &mut self.window);
        let Some(entry) = entry else { return };

        entry.with_mut(|fields| {
            let clock = fields.clock;
            let window = fields.window;
            let gpu = fields.gpu;

            control = fields.frame_loop.step(|_| {
                let mut ctx = FrameCtx {
                    window: WindowCtx {
                        id: window_id,
                        window,
                    },
                    gpu,
                    time: clock.tick(),
                    runtime: &mut runtime_ctx,
                };
                app.on_frame(&mut ctx)
            });
        });

        self.settle(event_loop, control, runtime_ctx);
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: CoreApp + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(e) = self.create_window_entry(event_loop) {
            log::error!("failed to create window: {e:#}");
            self.failure = Some(e);
            self.request_exit(event_loop);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw: every frame animates.
        if let Some(entry) = &self.window {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        let Some(entry) = self.window.as_mut() else {
            return;
        };

        // Runtime-managed surface handling first, so the app sees a configured surface.
        match &event {
            WindowEvent::Resized(new_size) => {
                entry.with_gpu_mut(|gpu| gpu.resize(*new_size));
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                let new_size = entry.with_window(|w| w.inner_size());
                entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                self.forward(
                    event_loop,
                    &HostEvent::Resized {
                        width: new_size.width,
                        height: new_size.height,
                    },
                );
                return;
            }
            _ => {}
        }

        let surface = entry.with_gpu(|gpu| gpu.size());
        if let Some(host_event) = translate_window_event(surface, &event) {
            self.forward(event_loop, &host_event);
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("window closed");
                self.window = None;
                self.request_exit(event_loop);
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop, window_id),
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(entry) = &self.window {
            let frames = entry.with_frame_loop(|l| l.frames());
            log::info!("runtime exiting after {frames} frames");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn continue_without_requests_keeps_running() {
        let (exit, failure) = RuntimeCtx::default().finish(AppControl::Continue);
        assert!(!exit);
        assert!(failure.is_none());
    }

    #[test]
    fn exit_from_either_side_stops() {
        let (exit, _) = RuntimeCtx::default().finish(AppControl::Exit);
        assert!(exit);

        let mut ctx = RuntimeCtx::default();
        ctx.exit();
        let (exit, failure) = ctx.finish(AppControl::Continue);
        assert!(exit);
        assert!(failure.is_none());
    }

    #[test]
    fn failure_stops_and_is_handed_back() {
        let mut ctx = RuntimeCtx::default();
        ctx.fail(anyhow!("program 'composite' failed to link"));
        assert!(ctx.is_exiting());

        let (exit, failure) = ctx.finish(AppControl::Continue);
        assert!(exit);
        let err = failure.expect("failure is kept");
        assert!(err.to_string().contains("failed to link"));
    }

    #[test]
    fn first_failure_wins() {
        let mut ctx = RuntimeCtx::default();
        ctx.fail(anyhow!("first"));
        ctx.fail(anyhow!("second"));

        let (_, failure) = ctx.finish(AppControl::Exit);
        assert_eq!(failure.map(|e| e.to_string()).as_deref(), Some("first"));
    }
}
