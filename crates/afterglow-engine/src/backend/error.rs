use std::fmt;

/// Shader stage a compile diagnostic belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

/// Failure reported by a [`GraphicsBackend`](super::GraphicsBackend).
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// A shader stage failed to parse or validate; `log` is the compiler output.
    Compile {
        label: String,
        stage: ShaderStage,
        log: String,
    },
    /// Stages compiled but do not form a usable program.
    Link { label: String, log: String },
    /// A render target could not be created.
    Allocation {
        width: u32,
        height: u32,
        reason: String,
    },
    /// A handle that this backend never issued (or already released).
    InvalidHandle(String),
    /// A draw whose bindings do not match its program or destination.
    InvalidDraw { label: String, reason: String },
    /// The visible surface is unavailable for this frame.
    Surface(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compile { label, stage, log } => {
                write!(f, "{stage} shader of '{label}' failed to compile:\n{log}")
            }
            Self::Link { label, log } => write!(f, "program '{label}' failed to link: {log}"),
            Self::Allocation {
                width,
                height,
                reason,
            } => write!(f, "cannot allocate {width}x{height} render target: {reason}"),
            Self::InvalidHandle(msg) => write!(f, "invalid handle: {msg}"),
            Self::InvalidDraw { label, reason } => write!(f, "invalid '{label}' draw: {reason}"),
            Self::Surface(msg) => write!(f, "surface unavailable: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}
