//! Post-processing pipeline core.
//!
//! Per frame the [`Orchestrator`] runs, in this fixed order:
//! 1. scene pass into the `Scene` target
//! 2. bright-pass extraction sampling the scene
//! 3. separable blur chain at reduced resolution (`BloomBlur` ping-pong pair)
//! 4. the same blur chain again at full resolution (`Bloom` pair)
//! 5. one depth-of-field draw per sample target
//! 6. composite of scene, bloom and depth-of-field into the visible surface
//! 7. flush
//!
//! Targets live in the [`TargetPool`], keyed by [`PassId`]. Programs, pass
//! ids, uniform names and samplers are closed enums; every lookup the
//! orchestrator performs is checked once at construction.

mod config;
mod error;
mod frame_state;
mod kernel;
mod orchestrator;
mod program;
mod target;

pub use config::PipelineConfig;
pub use error::{ErrorKind, PipelineError};
pub use frame_state::FrameState;
pub use kernel::GaussianKernel;
pub use orchestrator::{FrameStats, Orchestrator, PassShaders};
pub use program::{
    PassProgram, ProgramId, ProgramLayout, ProgramLayouts, QuadGeometry, SamplerName, UniformName,
    UniformValue, UNIT_QUAD,
};
pub use target::{LogicalPass, PassId, RenderTarget, TargetPool};
