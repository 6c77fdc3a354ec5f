use std::collections::HashMap;
use std::fmt;

use crate::backend::{GeometryHandle, GraphicsBackend, PassOutput, ProgramHandle, ProgramSource};

use super::config::PipelineConfig;
use super::error::PipelineError;

/// Programs used by the pipeline.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ProgramId {
    Scene,
    BrightPass,
    Blur,
    DepthOfField,
    Composite,
}

impl ProgramId {
    pub const ALL: [ProgramId; 5] = [
        ProgramId::Scene,
        ProgramId::BrightPass,
        ProgramId::Blur,
        ProgramId::DepthOfField,
        ProgramId::Composite,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Scene => "scene",
            Self::BrightPass => "bright-pass",
            Self::Blur => "blur",
            Self::DepthOfField => "depth-of-field",
            Self::Composite => "composite",
        }
    }
}

/// Scalar/vector uniform inputs.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UniformName {
    Resolution,
    Pointer,
    Time,
    /// Per-sample depth-of-field offset.
    SampleOffset,
    BlurOffset(usize),
    BlurWeight(usize),
}

impl fmt::Display for UniformName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolution => f.write_str("resolution"),
            Self::Pointer => f.write_str("pointer"),
            Self::Time => f.write_str("time"),
            Self::SampleOffset => f.write_str("sample_offset"),
            Self::BlurOffset(i) => write!(f, "offset[{i}]"),
            Self::BlurWeight(i) => write!(f, "weight[{i}]"),
        }
    }
}

/// Texture inputs. Declaration order in a [`ProgramLayout`] assigns units.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SamplerName {
    SceneTexture,
    BloomTexture,
    DofTexture(usize),
}

impl fmt::Display for SamplerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SceneTexture => f.write_str("scene_texture"),
            Self::BloomTexture => f.write_str("bloom_texture"),
            Self::DofTexture(i) => write!(f, "dof_texture[{i}]"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
}

impl UniformValue {
    fn to_slot(self) -> [f32; 4] {
        match self {
            Self::Float(v) => [v, 0.0, 0.0, 0.0],
            Self::Vec2([x, y]) => [x, y, 0.0, 0.0],
        }
    }
}

/// Uniform and sampler names of one program, in slot/unit order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramLayout {
    pub uniforms: Vec<UniformName>,
    pub samplers: Vec<SamplerName>,
    pub output: PassOutput,
}

impl ProgramLayout {
    fn base(samplers: Vec<SamplerName>, output: PassOutput) -> Self {
        Self {
            uniforms: vec![UniformName::Resolution, UniformName::Pointer, UniformName::Time],
            samplers,
            output,
        }
    }
}

/// Layouts of every program for a given configuration.
///
/// Shader generators use these to emit matching uniform blocks and texture
/// bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramLayouts {
    pub scene: ProgramLayout,
    pub bright_pass: ProgramLayout,
    pub blur: ProgramLayout,
    pub depth_of_field: ProgramLayout,
    pub composite: ProgramLayout,
}

impl ProgramLayouts {
    pub fn for_config(config: &PipelineConfig) -> Self {
        let mut blur = ProgramLayout::base(vec![SamplerName::BloomTexture], PassOutput::Offscreen);
        blur.uniforms
            .extend((0..config.bloom_taps).map(UniformName::BlurOffset));
        blur.uniforms
            .extend((0..config.bloom_taps).map(UniformName::BlurWeight));

        let mut depth_of_field =
            ProgramLayout::base(vec![SamplerName::SceneTexture], PassOutput::Offscreen);
        depth_of_field.uniforms.push(UniformName::SampleOffset);

        let mut composite_samplers = vec![SamplerName::SceneTexture, SamplerName::BloomTexture];
        composite_samplers.extend((0..config.dof_samples).map(SamplerName::DofTexture));

        Self {
            scene: ProgramLayout::base(Vec::new(), PassOutput::Offscreen),
            bright_pass: ProgramLayout::base(
                vec![SamplerName::SceneTexture],
                PassOutput::Offscreen,
            ),
            blur,
            depth_of_field,
            composite: ProgramLayout::base(composite_samplers, PassOutput::Surface),
        }
    }

    pub fn get(&self, id: ProgramId) -> &ProgramLayout {
        match id {
            ProgramId::Scene => &self.scene,
            ProgramId::BrightPass => &self.bright_pass,
            ProgramId::Blur => &self.blur,
            ProgramId::DepthOfField => &self.depth_of_field,
            ProgramId::Composite => &self.composite,
        }
    }
}

/// Vertex and index data of the full-screen quad.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct QuadGeometry {
    /// `xyz` per vertex.
    pub positions: &'static [f32],
    /// `uv` per vertex, origin bottom-left.
    pub texcoords: &'static [f32],
    pub indices: &'static [u16],
}

/// Unit quad covering clip space, two triangles.
pub const UNIT_QUAD: QuadGeometry = QuadGeometry {
    positions: &[-1.0, 1.0, 0.0, 1.0, 1.0, 0.0, -1.0, -1.0, 0.0, 1.0, -1.0, 0.0],
    texcoords: &[0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
    indices: &[0, 2, 1, 1, 2, 3],
};

/// A compiled program, its slot tables and its current uniform values.
///
/// The slot and unit tables are fixed when the program is built. Uniform
/// values persist between draws until overwritten.
#[derive(Debug)]
pub struct PassProgram {
    id: ProgramId,
    handle: ProgramHandle,
    output: PassOutput,
    slots: HashMap<UniformName, usize>,
    units: HashMap<SamplerName, u32>,
    values: Vec<[f32; 4]>,
    geometry: Option<GeometryHandle>,
}

impl PassProgram {
    /// Compiles `vertex` + `fragment` and registers the names in `layout`.
    ///
    /// Compile and link failures carry the backend's diagnostic text.
    pub fn build<B: GraphicsBackend>(
        backend: &mut B,
        id: ProgramId,
        vertex: &str,
        fragment: &str,
        layout: &ProgramLayout,
    ) -> Result<Self, PipelineError> {
        let mut slots = HashMap::with_capacity(layout.uniforms.len());
        for (slot, name) in layout.uniforms.iter().enumerate() {
            if slots.insert(*name, slot).is_some() {
                return Err(PipelineError::InvalidConfig(format!(
                    "uniform {name} declared twice on {}",
                    id.label()
                )));
            }
        }

        let mut units = HashMap::with_capacity(layout.samplers.len());
        for (unit, name) in layout.samplers.iter().enumerate() {
            if units.insert(*name, unit as u32).is_some() {
                return Err(PipelineError::InvalidConfig(format!(
                    "sampler {name} declared twice on {}",
                    id.label()
                )));
            }
        }

        let handle = backend.compile_program(&ProgramSource {
            label: id.label(),
            vertex,
            fragment,
            uniform_slots: layout.uniforms.len(),
            texture_units: layout.samplers.len() as u32,
            output: layout.output,
        })?;

        log::debug!(
            "compiled program {}: {} uniforms, {} texture units",
            id.label(),
            layout.uniforms.len(),
            layout.samplers.len()
        );

        Ok(Self {
            id,
            handle,
            output: layout.output,
            slots,
            units,
            values: vec![[0.0; 4]; layout.uniforms.len()],
            geometry: None,
        })
    }

    /// Attaches the shared quad geometry.
    pub fn bind_geometry(&mut self, geometry: GeometryHandle) {
        self.geometry = Some(geometry);
    }

    /// Writes uniform values by name.
    ///
    /// Every name is resolved before any value is written, so an unknown name
    /// leaves the program untouched.
    pub fn set_uniforms(
        &mut self,
        values: &[(UniformName, UniformValue)],
    ) -> Result<(), PipelineError> {
        let mut resolved = Vec::with_capacity(values.len());
        for (name, value) in values {
            resolved.push((self.slot(*name)?, *value));
        }
        for (slot, value) in resolved {
            self.values[slot] = value.to_slot();
        }
        Ok(())
    }

    /// Zeroes every uniform slot.
    pub fn reset_values(&mut self) {
        self.values.fill([0.0; 4]);
    }

    pub fn slot(&self, name: UniformName) -> Result<usize, PipelineError> {
        self.slots
            .get(&name)
            .copied()
            .ok_or(PipelineError::UnknownUniform {
                program: self.id,
                uniform: name,
            })
    }

    pub fn texture_unit(&self, name: SamplerName) -> Result<u32, PipelineError> {
        self.units
            .get(&name)
            .copied()
            .ok_or(PipelineError::UnknownSampler {
                program: self.id,
                sampler: name,
            })
    }

    /// Current value of a uniform slot.
    pub fn value(&self, name: UniformName) -> Result<[f32; 4], PipelineError> {
        Ok(self.values[self.slot(name)?])
    }

    pub fn values(&self) -> &[[f32; 4]] {
        &self.values
    }

    pub fn geometry(&self) -> Result<GeometryHandle, PipelineError> {
        self.geometry.ok_or(PipelineError::GeometryUnbound(self.id))
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    pub fn output(&self) -> PassOutput {
        self.output
    }

    pub fn texture_units(&self) -> usize {
        self.units.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, RecordingBackend};
    use crate::pipeline::ErrorKind;

    fn blur_program(backend: &mut RecordingBackend) -> PassProgram {
        let layouts = ProgramLayouts::for_config(&PipelineConfig::default());
        PassProgram::build(backend, ProgramId::Blur, "vs", "fs", &layouts.blur).unwrap()
    }

    #[test]
    fn layouts_follow_config() {
        let cfg = PipelineConfig {
            bloom_taps: 3,
            dof_samples: 2,
            ..Default::default()
        };
        let layouts = ProgramLayouts::for_config(&cfg);

        assert_eq!(layouts.blur.uniforms.len(), 3 + 2 * 3);
        assert_eq!(layouts.blur.uniforms[3], UniformName::BlurOffset(0));
        assert_eq!(layouts.blur.uniforms[6], UniformName::BlurWeight(0));
        assert_eq!(
            layouts.composite.samplers,
            vec![
                SamplerName::SceneTexture,
                SamplerName::BloomTexture,
                SamplerName::DofTexture(0),
                SamplerName::DofTexture(1),
            ]
        );
        assert_eq!(layouts.composite.output, PassOutput::Surface);
        assert!(layouts.scene.samplers.is_empty());
    }

    #[test]
    fn build_registers_slots_in_order() {
        let mut backend = RecordingBackend::new(64, 64);
        let program = blur_program(&mut backend);

        assert_eq!(program.slot(UniformName::Resolution).unwrap(), 0);
        assert_eq!(program.slot(UniformName::BlurOffset(0)).unwrap(), 3);
        assert_eq!(program.slot(UniformName::BlurWeight(15)).unwrap(), 34);
        assert_eq!(program.texture_unit(SamplerName::BloomTexture).unwrap(), 0);
        assert_eq!(program.values().len(), 35);

        let recorded = backend.program(program.handle()).unwrap();
        assert_eq!(recorded.label, "blur");
        assert_eq!(recorded.uniform_slots, 35);
        assert_eq!(recorded.texture_units, 1);
    }

    #[test]
    fn set_uniforms_writes_slots() {
        let mut backend = RecordingBackend::new(64, 64);
        let mut program = blur_program(&mut backend);

        program
            .set_uniforms(&[
                (UniformName::Pointer, UniformValue::Vec2([0.25, 0.75])),
                (UniformName::BlurWeight(2), UniformValue::Float(0.5)),
            ])
            .unwrap();

        assert_eq!(program.value(UniformName::Pointer).unwrap(), [0.25, 0.75, 0.0, 0.0]);
        assert_eq!(program.value(UniformName::BlurWeight(2)).unwrap(), [0.5, 0.0, 0.0, 0.0]);
        assert_eq!(program.value(UniformName::Time).unwrap(), [0.0; 4]);
    }

    #[test]
    fn reset_values_zeroes_every_slot() {
        let mut backend = RecordingBackend::new(64, 64);
        let mut program = blur_program(&mut backend);
        program
            .set_uniforms(&[
                (UniformName::Resolution, UniformValue::Vec2([800.0, 600.0])),
                (UniformName::BlurOffset(7), UniformValue::Vec2([0.0, 0.002])),
            ])
            .unwrap();

        program.reset_values();

        assert_eq!(program.values().len(), 35);
        assert!(program.values().iter().all(|slot| *slot == [0.0; 4]));
    }

    #[test]
    fn unknown_uniform_is_a_programming_error() {
        let mut backend = RecordingBackend::new(64, 64);
        let mut program = blur_program(&mut backend);

        let err = program
            .set_uniforms(&[
                (UniformName::Time, UniformValue::Float(9.0)),
                (UniformName::SampleOffset, UniformValue::Float(1.0)),
            ])
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Programming);
        // Nothing written when any name is unknown.
        assert_eq!(program.value(UniformName::Time).unwrap(), [0.0; 4]);
        assert!(program.texture_unit(SamplerName::SceneTexture).is_err());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut backend = RecordingBackend::new(64, 64);
        let layout = ProgramLayout {
            uniforms: vec![UniformName::Time, UniformName::Time],
            samplers: Vec::new(),
            output: PassOutput::Offscreen,
        };
        let err =
            PassProgram::build(&mut backend, ProgramId::Scene, "vs", "fs", &layout).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FatalInit);
    }

    #[test]
    fn compile_failure_carries_diagnostics() {
        let mut backend = RecordingBackend::new(64, 64);
        backend.fail_compilation("scene", "expected ';' at 3:14");
        let layouts = ProgramLayouts::for_config(&PipelineConfig::default());

        let err = PassProgram::build(&mut backend, ProgramId::Scene, "vs", "fs", &layouts.scene)
            .unwrap_err();

        match err {
            PipelineError::Backend(BackendError::Compile { log, .. }) => {
                assert!(log.contains("expected ';'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn geometry_must_be_bound() {
        let mut backend = RecordingBackend::new(64, 64);
        let mut program = blur_program(&mut backend);
        assert!(matches!(program.geometry(), Err(PipelineError::GeometryUnbound(ProgramId::Blur))));

        let quad = backend.create_geometry(&UNIT_QUAD).unwrap();
        program.bind_geometry(quad);
        assert_eq!(program.geometry().unwrap(), quad);
    }

    #[test]
    fn unit_quad_is_two_triangles() {
        assert_eq!(UNIT_QUAD.positions.len(), 4 * 3);
        assert_eq!(UNIT_QUAD.texcoords.len(), 4 * 2);
        assert_eq!(UNIT_QUAD.indices, &[0, 2, 1, 1, 2, 3]);
    }
}
