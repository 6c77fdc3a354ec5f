//! WGSL sources for the five pipeline programs.
//!
//! The fragment templates under `shaders/` carry an `{{INTERFACE}}` marker.
//! It is replaced with declarations generated from the program's
//! [`ProgramLayout`], so uniform slots and texture units always line up with
//! what the orchestrator binds.

use std::fmt::Write as _;

use afterglow_engine::backend::{validate_program_source, BackendError, ProgramSource};
use afterglow_engine::pipeline::{
    PassShaders, PipelineConfig, ProgramId, ProgramLayout, ProgramLayouts, SamplerName,
    UniformName,
};

const VERTEX: &str = include_str!("../shaders/fullscreen.wgsl");
const SCENE: &str = include_str!("../shaders/scene.wgsl");
const BRIGHT_PASS: &str = include_str!("../shaders/bright_pass.wgsl");
const BLUR: &str = include_str!("../shaders/blur.wgsl");
const DEPTH_OF_FIELD: &str = include_str!("../shaders/depth_of_field.wgsl");
const COMPOSITE: &str = include_str!("../shaders/composite.wgsl");

const INTERFACE_MARKER: &str = "{{INTERFACE}}";

/// Generated shader sources for one pipeline configuration.
#[derive(Debug, Clone)]
pub struct StudioShaders {
    layouts: ProgramLayouts,
    scene: String,
    bright_pass: String,
    blur: String,
    depth_of_field: String,
    composite: String,
}

impl StudioShaders {
    pub fn for_config(config: &PipelineConfig) -> Self {
        let layouts = ProgramLayouts::for_config(config);
        let expand = |template: &str, id: ProgramId| {
            template.replace(INTERFACE_MARKER, &interface(layouts.get(id)))
        };

        Self {
            scene: expand(SCENE, ProgramId::Scene),
            bright_pass: expand(BRIGHT_PASS, ProgramId::BrightPass),
            blur: expand(BLUR, ProgramId::Blur),
            depth_of_field: expand(DEPTH_OF_FIELD, ProgramId::DepthOfField),
            composite: expand(COMPOSITE, ProgramId::Composite),
            layouts,
        }
    }

    pub fn pass_shaders(&self) -> PassShaders<'_> {
        PassShaders {
            vertex: VERTEX,
            scene: &self.scene,
            bright_pass: &self.bright_pass,
            blur: &self.blur,
            depth_of_field: &self.depth_of_field,
            composite: &self.composite,
        }
    }

    pub fn layouts(&self) -> &ProgramLayouts {
        &self.layouts
    }

    /// Parses and validates every program without a device.
    pub fn validate(&self) -> Result<(), BackendError> {
        let shaders = self.pass_shaders();
        for id in ProgramId::ALL {
            let layout = self.layouts.get(id);
            validate_program_source(&ProgramSource {
                label: id.label(),
                vertex: shaders.vertex,
                fragment: shaders.fragment(id),
                uniform_slots: layout.uniforms.len(),
                texture_units: layout.samplers.len() as u32,
                output: layout.output,
            })?;
        }
        Ok(())
    }
}

/// Uniform block, sampler and texture declarations for `layout`.
///
/// Each uniform slot is one `vec4<f32>`. Runs of blur offsets and weights
/// become `offsets`/`weights` arrays with a `TAPS` constant; depth-of-field
/// textures get a `sample_dof` helper averaging all of them.
pub fn interface(layout: &ProgramLayout) -> String {
    let mut out = String::from("struct Params {\n");
    let mut taps = 0;
    let mut i = 0;
    while i < layout.uniforms.len() {
        let run = |pred: fn(&UniformName) -> bool| {
            layout.uniforms[i..].iter().take_while(|u| pred(u)).count()
        };
        match layout.uniforms[i] {
            UniformName::BlurOffset(_) => {
                taps = run(|u| matches!(u, UniformName::BlurOffset(_)));
                let _ = writeln!(out, "    offsets: array<vec4<f32>, {taps}>,");
                i += taps;
            }
            UniformName::BlurWeight(_) => {
                let n = run(|u| matches!(u, UniformName::BlurWeight(_)));
                let _ = writeln!(out, "    weights: array<vec4<f32>, {n}>,");
                i += n;
            }
            name => {
                let _ = writeln!(out, "    {name}: vec4<f32>,");
                i += 1;
            }
        }
    }
    if layout.uniforms.is_empty() {
        out.push_str("    unused: vec4<f32>,\n");
    }
    out.push_str("};\n\n@group(0) @binding(0) var<uniform> params: Params;\n");
    out.push_str("@group(1) @binding(0) var linear_sampler: sampler;\n");

    let mut dof = Vec::new();
    for (unit, sampler) in layout.samplers.iter().enumerate() {
        let name = texture_ident(*sampler);
        let _ = writeln!(
            out,
            "@group(1) @binding({}) var {name}: texture_2d<f32>;",
            unit + 1
        );
        if matches!(sampler, SamplerName::DofTexture(_)) {
            dof.push(name);
        }
    }

    if taps > 0 {
        let _ = writeln!(out, "\nconst TAPS: u32 = {taps}u;");
    }

    if !dof.is_empty() {
        out.push_str("\nfn sample_dof(uv: vec2<f32>) -> vec3<f32> {\n");
        out.push_str("    var sum = vec3<f32>(0.0);\n");
        for name in &dof {
            let _ = writeln!(
                out,
                "    sum += textureSampleLevel({name}, linear_sampler, uv, 0.0).rgb;"
            );
        }
        let _ = writeln!(out, "    return sum / {}.0;", dof.len());
        out.push_str("}\n");
    }

    out
}

fn texture_ident(sampler: SamplerName) -> String {
    match sampler {
        SamplerName::DofTexture(i) => format!("dof_texture_{i}"),
        other => other.to_string(),
    }
}
