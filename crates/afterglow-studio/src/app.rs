use anyhow::{anyhow, Context};

use afterglow_engine::backend::WgpuBackend;
use afterglow_engine::core::{App, AppControl, FrameCtx};
use afterglow_engine::input::{HostEvent, Key};
use afterglow_engine::pipeline::{Orchestrator, PipelineConfig, PipelineError};
use afterglow_engine::window::RuntimeCtx;

use crate::shaders::StudioShaders;

/// Interactive studio: feeds host events into the pipeline and renders one
/// frame per redraw.
///
/// The orchestrator is built on the first frame, once the GPU exists. Any
/// pipeline error ends the run and is returned from the runtime.
pub struct StudioApp {
    config: PipelineConfig,
    shaders: StudioShaders,
    orchestrator: Option<Orchestrator<WgpuBackend>>,
    /// Last pointer position; applied before every frame.
    pointer: Option<(f32, f32)>,
}

impl StudioApp {
    pub fn new(config: PipelineConfig, shaders: StudioShaders) -> Self {
        Self {
            config,
            shaders,
            orchestrator: None,
            pointer: None,
        }
    }

    fn orchestrator(
        &mut self,
        ctx: &FrameCtx<'_, '_>,
    ) -> Result<&mut Orchestrator<WgpuBackend>, PipelineError> {
        let orchestrator = match self.orchestrator.take() {
            Some(orchestrator) => orchestrator,
            None => {
                let backend = WgpuBackend::new(&*ctx.gpu);
                Orchestrator::new(backend, self.config.clone(), &self.shaders.pass_shaders())?
            }
        };
        Ok(self.orchestrator.insert(orchestrator))
    }
}

/// Hands `err` to the runtime, which stops and returns it.
fn fail(runtime: &mut RuntimeCtx, err: anyhow::Error) -> AppControl {
    runtime.fail(err);
    AppControl::Exit
}

impl App for StudioApp {
    fn on_event(&mut self, event: &HostEvent, runtime: &mut RuntimeCtx) -> AppControl {
        match *event {
            HostEvent::Resized { width, height } => {
                let Some(orchestrator) = self.orchestrator.as_mut() else {
                    return AppControl::Continue;
                };
                orchestrator.backend_mut().set_surface_size(width, height);
                if let Err(err) = orchestrator.resize_all(width, height) {
                    let err = anyhow!(err).context(format!("resize to {width}x{height} failed"));
                    return fail(runtime, err);
                }
            }
            HostEvent::PointerMoved { x, y } => self.pointer = Some((x, y)),
            HostEvent::Key {
                key: Key::Escape,
                pressed: true,
                ..
            } => return AppControl::Exit,
            _ => {}
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let elapsed = ctx.time.elapsed;
        let pointer = self.pointer;
        let orchestrator = match self.orchestrator(ctx) {
            Ok(orchestrator) => orchestrator,
            Err(err) => {
                let err = anyhow!(err).context("pipeline initialization failed");
                return fail(ctx.runtime, err);
            }
        };

        if let Some((x, y)) = pointer {
            orchestrator.set_pointer(x, y);
        }
        orchestrator.set_elapsed(elapsed);

        let frame = match ctx.acquire_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return AppControl::Continue,
            Err(err) => return fail(ctx.runtime, err),
        };
        orchestrator.backend_mut().begin_frame(frame);

        match orchestrator.render_frame().context("frame failed") {
            Ok(stats) => {
                log::trace!("frame {}: {} draws", stats.frame_index, stats.draws);
                AppControl::Continue
            }
            Err(err) => fail(ctx.runtime, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn studio() -> StudioApp {
        let config = PipelineConfig::default();
        let shaders = StudioShaders::for_config(&config);
        StudioApp::new(config, shaders)
    }

    #[test]
    fn escape_exits_without_failure() {
        let mut app = studio();
        let mut runtime = RuntimeCtx::default();
        let escape = HostEvent::Key {
            key: Key::Escape,
            pressed: true,
            repeat: false,
        };

        assert_eq!(app.on_event(&escape, &mut runtime), AppControl::Exit);
        assert!(!runtime.is_exiting());
    }

    #[test]
    fn events_before_the_first_frame_are_kept() {
        let mut app = studio();
        let mut runtime = RuntimeCtx::default();

        let resized = HostEvent::Resized {
            width: 640,
            height: 480,
        };
        let moved = HostEvent::PointerMoved { x: 0.25, y: 0.75 };
        assert_eq!(app.on_event(&resized, &mut runtime), AppControl::Continue);
        assert_eq!(app.on_event(&moved, &mut runtime), AppControl::Continue);

        assert_eq!(app.pointer, Some((0.25, 0.75)));
        assert!(!runtime.is_exiting());
    }

    #[test]
    fn failures_reach_the_runtime() {
        let mut runtime = RuntimeCtx::default();
        let err = anyhow!(PipelineError::InvalidConfig("bloom_taps must be in 1..=64".into()))
            .context("pipeline initialization failed");

        assert_eq!(fail(&mut runtime, err), AppControl::Exit);
        assert!(runtime.is_exiting());
    }
}
