use std::fmt;

use crate::backend::BackendError;

use super::program::{ProgramId, SamplerName, UniformName};
use super::target::PassId;

/// Error class of a [`PipelineError`].
///
/// Neither class is retryable: the pipeline either initializes fully and
/// renders every frame, or it does not start.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    /// Configuration, compilation, allocation or surface failure.
    FatalInit,
    /// A lookup that static configuration should have made impossible.
    Programming,
}

/// Errors raised by the pipeline core.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Startup constants are out of range.
    InvalidConfig(String),
    /// The graphics backend refused an operation. Compile, link, allocation
    /// and surface failures are fatal; rejected handles and draws are bugs.
    Backend(BackendError),
    /// A uniform name was not registered when the program was built.
    UnknownUniform { program: ProgramId, uniform: UniformName },
    /// A sampler name was not registered when the program was built.
    UnknownSampler { program: ProgramId, sampler: SamplerName },
    /// The pool holds no targets for this pass.
    UnknownPass(PassId),
    /// Buffer index outside the pass's buffer count.
    BufferOutOfRange { pass: PassId, index: usize, count: usize },
    /// `swap` on a pass that is not a two-buffer ping-pong pair.
    NotPingPong(PassId),
    /// A program was drawn before geometry was bound to it.
    GeometryUnbound(ProgramId),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig(_) => ErrorKind::FatalInit,
            Self::Backend(err) => match err {
                BackendError::Compile { .. }
                | BackendError::Link { .. }
                | BackendError::Allocation { .. }
                | BackendError::Surface(_) => ErrorKind::FatalInit,
                BackendError::InvalidHandle(_) | BackendError::InvalidDraw { .. } => {
                    ErrorKind::Programming
                }
            },
            Self::UnknownUniform { .. }
            | Self::UnknownSampler { .. }
            | Self::UnknownPass(_)
            | Self::BufferOutOfRange { .. }
            | Self::NotPingPong(_)
            | Self::GeometryUnbound(_) => ErrorKind::Programming,
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid pipeline configuration: {msg}"),
            Self::Backend(err) => write!(f, "graphics backend failure: {err}"),
            Self::UnknownUniform { program, uniform } => {
                write!(f, "uniform {uniform} is not registered on program {program:?}")
            }
            Self::UnknownSampler { program, sampler } => {
                write!(f, "sampler {sampler} is not registered on program {program:?}")
            }
            Self::UnknownPass(pass) => write!(f, "no render targets allocated for pass {pass:?}"),
            Self::BufferOutOfRange { pass, index, count } => {
                write!(f, "buffer {index} out of range for pass {pass:?} ({count} buffers)")
            }
            Self::NotPingPong(pass) => write!(f, "pass {pass:?} is not a ping-pong pair"),
            Self::GeometryUnbound(program) => {
                write!(f, "program {program:?} has no geometry bound")
            }
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BackendError> for PipelineError {
    fn from(err: BackendError) -> Self {
        Self::Backend(err)
    }
}
