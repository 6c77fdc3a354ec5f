use crate::backend::{DepthId, FramebufferId, GraphicsBackend, TextureId};

use super::config::PipelineConfig;
use super::error::PipelineError;

/// Logical pipeline stages that own render targets.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PassId {
    Scene,
    DepthOfField,
    BrightPass,
    BloomBlur,
    Bloom,
}

impl PassId {
    pub const ALL: [PassId; 5] = [
        PassId::Scene,
        PassId::DepthOfField,
        PassId::BrightPass,
        PassId::BloomBlur,
        PassId::Bloom,
    ];
}

/// Static description of a pass's targets.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LogicalPass {
    pub id: PassId,
    pub buffer_count: usize,
    pub reduction_rate: u32,
}

impl LogicalPass {
    /// The pass set used by the orchestrator.
    pub fn layout(config: &PipelineConfig) -> Vec<LogicalPass> {
        vec![
            LogicalPass {
                id: PassId::Scene,
                buffer_count: 1,
                reduction_rate: 1,
            },
            LogicalPass {
                id: PassId::DepthOfField,
                buffer_count: config.dof_samples,
                reduction_rate: 1,
            },
            LogicalPass {
                id: PassId::BrightPass,
                buffer_count: 1,
                reduction_rate: 1,
            },
            LogicalPass {
                id: PassId::BloomBlur,
                buffer_count: 2,
                reduction_rate: config.bloom_reduction,
            },
            LogicalPass {
                id: PassId::Bloom,
                buffer_count: 2,
                reduction_rate: 1,
            },
        ]
    }

    /// Target size for a surface of `width x height`, rounded up.
    pub fn scaled_size(&self, width: u32, height: u32) -> (u32, u32) {
        let rate = self.reduction_rate.max(1);
        (width.div_ceil(rate), height.div_ceil(rate))
    }
}

/// Offscreen color + depth surface.
///
/// Handles are issued by the backend; the pool owns the target and releases
/// it when superseded.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RenderTarget {
    pub width: u32,
    pub height: u32,
    pub color: TextureId,
    pub depth: DepthId,
    pub framebuffer: FramebufferId,
}

#[derive(Debug)]
struct PassTargets {
    pass: LogicalPass,
    buffers: Vec<RenderTarget>,
    /// Ping-pong parity; buffer roles 0 and 1 are exchanged while set.
    swapped: bool,
}

impl PassTargets {
    fn physical(&self, index: usize) -> usize {
        if self.swapped && self.buffers.len() == 2 {
            index ^ 1
        } else {
            index
        }
    }
}

/// Owns every render target, keyed by [`PassId`].
///
/// For two-buffer passes, buffer index 0 is the current (write) role and
/// index 1 the previous (read) role; [`swap`](Self::swap) exchanges them.
#[derive(Debug)]
pub struct TargetPool {
    layout: Vec<LogicalPass>,
    passes: Vec<PassTargets>,
    size: Option<(u32, u32)>,
}

impl TargetPool {
    /// Creates an empty pool for `layout`; nothing is allocated until
    /// [`resize_all`](Self::resize_all).
    pub fn new(layout: Vec<LogicalPass>) -> Self {
        Self {
            layout,
            passes: Vec::new(),
            size: None,
        }
    }

    /// Surface size the targets were last allocated for.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    pub fn layout(&self) -> &[LogicalPass] {
        &self.layout
    }

    /// Allocates `buffer_count` targets of `width x height` for `pass`,
    /// releasing whatever the pass held before.
    pub fn allocate<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        pass: PassId,
        width: u32,
        height: u32,
        buffer_count: usize,
    ) -> Result<&[RenderTarget], PipelineError> {
        let buffers = create_buffers(backend, width, height, buffer_count)?;
        let reduction_rate = self
            .layout
            .iter()
            .find(|p| p.id == pass)
            .map_or(1, |p| p.reduction_rate);
        let logical = LogicalPass {
            id: pass,
            buffer_count,
            reduction_rate,
        };

        let idx = match self.passes.iter().position(|p| p.pass.id == pass) {
            Some(idx) => {
                let old = std::mem::replace(
                    &mut self.passes[idx],
                    PassTargets {
                        pass: logical,
                        buffers,
                        swapped: false,
                    },
                );
                release(backend, &old.buffers);
                idx
            }
            None => {
                self.passes.push(PassTargets {
                    pass: logical,
                    buffers,
                    swapped: false,
                });
                self.passes.len() - 1
            }
        };

        Ok(&self.passes[idx].buffers)
    }

    /// Returns the target currently playing role `index` for `pass`.
    pub fn get(&self, pass: PassId, index: usize) -> Result<RenderTarget, PipelineError> {
        let targets = self.entry(pass)?;
        let count = targets.buffers.len();
        if index >= count {
            return Err(PipelineError::BufferOutOfRange { pass, index, count });
        }
        Ok(targets.buffers[targets.physical(index)])
    }

    /// Number of buffers held by `pass`.
    pub fn buffer_count(&self, pass: PassId) -> Result<usize, PipelineError> {
        Ok(self.entry(pass)?.buffers.len())
    }

    /// Pass description the current buffers were allocated with.
    pub fn logical_pass(&self, pass: PassId) -> Result<LogicalPass, PipelineError> {
        Ok(self.entry(pass)?.pass)
    }

    /// Exchanges roles 0 and 1 of a ping-pong pass. Swapping twice is a no-op.
    pub fn swap(&mut self, pass: PassId) -> Result<(), PipelineError> {
        let targets = self
            .passes
            .iter_mut()
            .find(|p| p.pass.id == pass)
            .ok_or(PipelineError::UnknownPass(pass))?;
        if targets.buffers.len() != 2 {
            return Err(PipelineError::NotPingPong(pass));
        }
        targets.swapped = !targets.swapped;
        Ok(())
    }

    /// Reallocates every pass for a `width x height` surface.
    ///
    /// Prior contents are discarded. All new targets are created before any
    /// old one is released, so a failed resize leaves the previous set
    /// intact. A zero dimension defers the resize and returns `Ok(false)`.
    pub fn resize_all<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        width: u32,
        height: u32,
    ) -> Result<bool, PipelineError> {
        if width == 0 || height == 0 {
            log::debug!("deferring target resize to {width}x{height}");
            return Ok(false);
        }

        let mut fresh: Vec<PassTargets> = Vec::with_capacity(self.layout.len());
        for pass in &self.layout {
            let (w, h) = pass.scaled_size(width, height);
            match create_buffers(backend, w, h, pass.buffer_count) {
                Ok(buffers) => fresh.push(PassTargets {
                    pass: *pass,
                    buffers,
                    swapped: false,
                }),
                Err(err) => {
                    for done in &fresh {
                        release(backend, &done.buffers);
                    }
                    return Err(err);
                }
            }
            log::debug!("pass {:?}: {} x {w}x{h}", pass.id, pass.buffer_count);
        }

        let old = std::mem::replace(&mut self.passes, fresh);
        for targets in &old {
            release(backend, &targets.buffers);
        }
        self.size = Some((width, height));

        log::info!("render targets resized to {width}x{height}");
        Ok(true)
    }

    /// Releases every target.
    pub fn release_all<B: GraphicsBackend>(&mut self, backend: &mut B) {
        for targets in self.passes.drain(..) {
            release(backend, &targets.buffers);
        }
        self.size = None;
    }

    fn entry(&self, pass: PassId) -> Result<&PassTargets, PipelineError> {
        self.passes
            .iter()
            .find(|p| p.pass.id == pass)
            .ok_or(PipelineError::UnknownPass(pass))
    }
}

fn create_buffers<B: GraphicsBackend>(
    backend: &mut B,
    width: u32,
    height: u32,
    count: usize,
) -> Result<Vec<RenderTarget>, PipelineError> {
    let mut buffers = Vec::with_capacity(count);
    for _ in 0..count {
        match backend.create_render_target(width, height) {
            Ok(target) => buffers.push(target),
            Err(err) => {
                release(backend, &buffers);
                return Err(err.into());
            }
        }
    }
    Ok(buffers)
}

fn release<B: GraphicsBackend>(backend: &mut B, buffers: &[RenderTarget]) {
    for target in buffers {
        backend.destroy_render_target(target);
    }
}
