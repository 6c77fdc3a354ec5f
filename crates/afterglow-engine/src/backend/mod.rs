//! Graphics backends.
//!
//! The pipeline core talks to the GPU only through [`GraphicsBackend`]:
//! - [`WgpuBackend`] draws through wgpu into offscreen textures and the window surface
//! - [`RecordingBackend`] keeps an in-memory command log (tests, headless traces)
//!
//! Every draw is fully described by a [`DrawCall`]: destination, viewport,
//! program, geometry, texture units and uniform values. Backends hold no
//! binding state between draws.

mod error;
mod recording;
mod wgpu_backend;

pub use error::{BackendError, ShaderStage};
pub use recording::{RecordedProgram, RecordingBackend};
pub use wgpu_backend::{validate_program_source, WgpuBackend};

use crate::pipeline::{QuadGeometry, RenderTarget};

/// Color texture of a render target.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TextureId(pub u32);

/// Depth buffer of a render target.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct DepthId(pub u32);

/// Framebuffer (draw destination) of a render target.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FramebufferId(pub u32);

/// Compiled program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ProgramHandle(pub u32);

/// Uploaded vertex/index geometry.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct GeometryHandle(pub u32);

/// Where a program's fragments land.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PassOutput {
    /// An offscreen render target.
    Offscreen,
    /// The visible window surface.
    Surface,
}

/// Source text and interface of a program to compile.
///
/// Uniform slots are 16-byte `vec4` entries of the group 0 uniform block, in
/// declaration order. Texture unit `u` is bound at group 1, binding `u + 1`;
/// binding 0 of group 1 is the shared linear sampler.
#[derive(Debug, Clone)]
pub struct ProgramSource<'a> {
    pub label: &'a str,
    pub vertex: &'a str,
    pub fragment: &'a str,
    pub uniform_slots: usize,
    pub texture_units: u32,
    pub output: PassOutput,
}

/// Draw destination.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Destination {
    Offscreen {
        framebuffer: FramebufferId,
        color: TextureId,
    },
    Surface,
}

impl Destination {
    pub fn offscreen(target: &RenderTarget) -> Self {
        Self::Offscreen {
            framebuffer: target.framebuffer,
            color: target.color,
        }
    }

    pub fn output(&self) -> PassOutput {
        match self {
            Self::Offscreen { .. } => PassOutput::Offscreen,
            Self::Surface => PassOutput::Surface,
        }
    }
}

/// A texture bound to a unit for one draw.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TextureBinding {
    pub unit: u32,
    pub texture: TextureId,
}

/// One full-screen draw with its complete binding set.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub label: &'static str,
    pub destination: Destination,
    pub viewport: (u32, u32),
    pub program: ProgramHandle,
    pub geometry: GeometryHandle,
    pub textures: Vec<TextureBinding>,
    /// Snapshot of every uniform slot of `program`.
    pub uniforms: Vec<[f32; 4]>,
}

impl DrawCall {
    /// Returns the texture bound at `unit`, if any.
    pub fn texture_at(&self, unit: u32) -> Option<TextureId> {
        self.textures
            .iter()
            .find(|b| b.unit == unit)
            .map(|b| b.texture)
    }

    /// Returns true if this draw samples the texture it renders into.
    pub fn reads_destination(&self) -> bool {
        match self.destination {
            Destination::Offscreen { color, .. } => {
                self.textures.iter().any(|b| b.texture == color)
            }
            Destination::Surface => false,
        }
    }
}

/// Checks a draw against the interface its program was compiled with.
///
/// Every unit below `texture_units` must be bound exactly once, the uniform
/// snapshot must cover every slot and the destination kind must match the
/// program's output.
pub(crate) fn check_interface(
    call: &DrawCall,
    label: &str,
    uniform_slots: usize,
    texture_units: u32,
    output: PassOutput,
) -> Result<(), String> {
    if call.uniforms.len() != uniform_slots {
        return Err(format!(
            "{} uniform values for {uniform_slots} slots of '{label}'",
            call.uniforms.len()
        ));
    }

    let mut bound = vec![false; texture_units as usize];
    for binding in &call.textures {
        let Some(seen) = bound.get_mut(binding.unit as usize) else {
            return Err(format!(
                "unit {} outside the {texture_units} units of '{label}'",
                binding.unit
            ));
        };
        if *seen {
            return Err(format!("unit {} bound twice", binding.unit));
        }
        *seen = true;
    }
    let count = bound.iter().filter(|b| **b).count();
    if count != texture_units as usize {
        return Err(format!("{count} of {texture_units} texture units bound"));
    }

    if call.destination.output() != output {
        return Err(format!(
            "'{label}' renders to {output:?}, not {:?}",
            call.destination.output()
        ));
    }
    if call.reads_destination() {
        return Err("samples the texture it renders into".to_owned());
    }

    let (w, h) = call.viewport;
    if w == 0 || h == 0 {
        return Err(format!("empty viewport {w}x{h}"));
    }
    Ok(())
}

/// Surface/context collaborator used by the pipeline core.
///
/// All calls are synchronous and issued from the thread that owns the
/// orchestrator.
pub trait GraphicsBackend {
    /// Current drawable size of the visible surface, in physical pixels.
    fn surface_size(&self) -> (u32, u32);

    /// Creates a color texture + depth buffer + framebuffer of the given size.
    fn create_render_target(&mut self, width: u32, height: u32)
        -> Result<RenderTarget, BackendError>;

    /// Releases a target created by [`create_render_target`](Self::create_render_target).
    fn destroy_render_target(&mut self, target: &RenderTarget);

    /// Compiles and links a program.
    fn compile_program(&mut self, source: &ProgramSource<'_>)
    -> Result<ProgramHandle, BackendError>;

    /// Uploads immutable quad geometry shared by all programs.
    fn create_geometry(&mut self, quad: &QuadGeometry) -> Result<GeometryHandle, BackendError>;

    /// Records one draw.
    fn draw(&mut self, call: &DrawCall) -> Result<(), BackendError>;

    /// Submits every draw recorded since the previous flush.
    fn flush(&mut self) -> Result<(), BackendError>;
}
