use crate::backend::{Destination, DrawCall, GraphicsBackend, PassOutput, TextureBinding, TextureId};

use super::config::PipelineConfig;
use super::error::PipelineError;
use super::frame_state::FrameState;
use super::kernel::GaussianKernel;
use super::program::{
    PassProgram, ProgramId, ProgramLayouts, SamplerName, UniformName, UniformValue, UNIT_QUAD,
};
use super::target::{LogicalPass, PassId, RenderTarget, TargetPool};

/// Shader sources of every program. All programs share the vertex stage.
#[derive(Debug, Clone, Copy)]
pub struct PassShaders<'a> {
    pub vertex: &'a str,
    pub scene: &'a str,
    pub bright_pass: &'a str,
    pub blur: &'a str,
    pub depth_of_field: &'a str,
    pub composite: &'a str,
}

impl<'a> PassShaders<'a> {
    pub fn fragment(&self, id: ProgramId) -> &'a str {
        match id {
            ProgramId::Scene => self.scene,
            ProgramId::BrightPass => self.bright_pass,
            ProgramId::Blur => self.blur,
            ProgramId::DepthOfField => self.depth_of_field,
            ProgramId::Composite => self.composite,
        }
    }
}

/// Summary of one rendered frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FrameStats {
    pub frame_index: u64,
    pub draws: usize,
}

#[derive(Debug)]
struct Programs {
    scene: PassProgram,
    bright_pass: PassProgram,
    blur: PassProgram,
    depth_of_field: PassProgram,
    composite: PassProgram,
}

impl Programs {
    fn all(&self) -> [&PassProgram; 5] {
        [
            &self.scene,
            &self.bright_pass,
            &self.blur,
            &self.depth_of_field,
            &self.composite,
        ]
    }

    /// Resolves every lookup `render_frame` performs, so that a frame can
    /// only fail on backend errors.
    fn validate(&self, config: &PipelineConfig) -> Result<(), PipelineError> {
        for program in self.all() {
            for name in [UniformName::Resolution, UniformName::Pointer, UniformName::Time] {
                program.slot(name)?;
            }
            program.geometry()?;

            let expected = match program.id() {
                ProgramId::Composite => PassOutput::Surface,
                _ => PassOutput::Offscreen,
            };
            if program.output() != expected {
                return Err(PipelineError::InvalidConfig(format!(
                    "program {} must render to {expected:?}",
                    program.id().label()
                )));
            }
        }

        self.bright_pass.texture_unit(SamplerName::SceneTexture)?;

        for tap in 0..config.bloom_taps {
            self.blur.slot(UniformName::BlurOffset(tap))?;
            self.blur.slot(UniformName::BlurWeight(tap))?;
        }
        self.blur.texture_unit(SamplerName::BloomTexture)?;

        self.depth_of_field.slot(UniformName::SampleOffset)?;
        self.depth_of_field.texture_unit(SamplerName::SceneTexture)?;

        self.composite.texture_unit(SamplerName::SceneTexture)?;
        self.composite.texture_unit(SamplerName::BloomTexture)?;
        for i in 0..config.dof_samples {
            self.composite.texture_unit(SamplerName::DofTexture(i))?;
        }
        Ok(())
    }
}

/// Sequences every pass of a frame through a [`GraphicsBackend`].
///
/// Construction compiles all programs, allocates all targets for the
/// backend's current surface size and validates every lookup. After that,
/// [`render_frame`](Self::render_frame) is a function of the current
/// [`FrameState`] into backend commands.
pub struct Orchestrator<B: GraphicsBackend> {
    backend: B,
    config: PipelineConfig,
    kernel: GaussianKernel,
    pool: TargetPool,
    programs: Programs,
    state: FrameState,
    frame_index: u64,
}

impl<B: GraphicsBackend> Orchestrator<B> {
    /// Builds the pipeline with the default program layouts for `config`.
    pub fn new(
        backend: B,
        config: PipelineConfig,
        shaders: &PassShaders<'_>,
    ) -> Result<Self, PipelineError> {
        let layouts = ProgramLayouts::for_config(&config);
        Self::with_layouts(backend, config, shaders, &layouts)
    }

    /// Builds the pipeline with caller-supplied program layouts.
    ///
    /// Layouts may add uniforms or reorder slots; they must still declare
    /// everything the frame sets, or construction fails.
    pub fn with_layouts(
        mut backend: B,
        config: PipelineConfig,
        shaders: &PassShaders<'_>,
        layouts: &ProgramLayouts,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        let kernel = GaussianKernel::compute(config.bloom_taps, config.blur_spacing);
        let quad = backend.create_geometry(&UNIT_QUAD)?;

        let mut build = |id: ProgramId| -> Result<PassProgram, PipelineError> {
            let mut program = PassProgram::build(
                &mut backend,
                id,
                shaders.vertex,
                shaders.fragment(id),
                layouts.get(id),
            )?;
            program.bind_geometry(quad);
            Ok(program)
        };

        let programs = Programs {
            scene: build(ProgramId::Scene)?,
            bright_pass: build(ProgramId::BrightPass)?,
            blur: build(ProgramId::Blur)?,
            depth_of_field: build(ProgramId::DepthOfField)?,
            composite: build(ProgramId::Composite)?,
        };
        programs.validate(&config)?;

        let (width, height) = backend.surface_size();
        let mut pool = TargetPool::new(LogicalPass::layout(&config));
        if !pool.resize_all(&mut backend, width, height)? {
            return Err(PipelineError::InvalidConfig(format!(
                "surface has no area ({width}x{height})"
            )));
        }

        log::info!(
            "pipeline ready: {width}x{height}, {} blur taps, {} dof samples, {} draws per frame",
            config.bloom_taps,
            config.dof_samples,
            config.draws_per_frame()
        );

        Ok(Self {
            backend,
            config,
            kernel,
            pool,
            programs,
            state: FrameState::new(width, height),
            frame_index: 0,
        })
    }

    /// Reallocates every target for a new surface size.
    ///
    /// A zero dimension keeps the previous targets and surface size.
    pub fn resize_all(&mut self, width: u32, height: u32) -> Result<(), PipelineError> {
        if self.pool.resize_all(&mut self.backend, width, height)? {
            self.state.surface_width = width;
            self.state.surface_height = height;
        }
        Ok(())
    }

    /// Stores the normalized pointer position read by the next frame.
    pub fn set_pointer(&mut self, x: f32, y: f32) {
        self.state.pointer_x = x;
        self.state.pointer_y = y;
    }

    /// Stores the elapsed time read by the next frame.
    pub fn set_elapsed(&mut self, seconds: f32) {
        self.state.elapsed_seconds = seconds;
    }

    pub fn frame_state(&self) -> FrameState {
        self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn kernel(&self) -> &GaussianKernel {
        &self.kernel
    }

    pub fn pool(&self) -> &TargetPool {
        &self.pool
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Releases all targets and hands the backend back.
    pub fn into_backend(mut self) -> B {
        self.pool.release_all(&mut self.backend);
        self.backend
    }

    /// Draws one frame and flushes the backend.
    pub fn render_frame(&mut self) -> Result<FrameStats, PipelineError> {
        let state = self.state;
        let mut draws = 0;

        let scene = self.pool.get(PassId::Scene, 0)?;
        {
            let program = &mut self.programs.scene;
            set_base_uniforms(program, &state)?;
            draw_quad(
                &mut self.backend,
                "scene",
                program,
                Destination::offscreen(&scene),
                extent(&scene),
                &[],
            )?;
            draws += 1;
        }

        let bright = self.pool.get(PassId::BrightPass, 0)?;
        {
            let program = &mut self.programs.bright_pass;
            set_base_uniforms(program, &state)?;
            draw_quad(
                &mut self.backend,
                "bright-pass",
                program,
                Destination::offscreen(&bright),
                extent(&bright),
                &[(SamplerName::SceneTexture, scene.color)],
            )?;
            draws += 1;
        }

        // The blur program is shared by both chains; start every frame from
        // zeroed slots so chain 1 never sees values left by chain 2.
        self.programs.blur.reset_values();
        let blurred = self.blur_chain(PassId::BloomBlur, bright.color, None)?;
        draws += 2 * self.kernel.len();
        let bloom = self.blur_chain(PassId::Bloom, blurred, Some(&state))?;
        draws += 2 * self.kernel.len();

        let mut dof_textures = Vec::with_capacity(self.config.dof_samples);
        for i in 0..self.config.dof_samples {
            let target = self.pool.get(PassId::DepthOfField, i)?;
            let program = &mut self.programs.depth_of_field;
            set_base_uniforms(program, &state)?;
            program.set_uniforms(&[(
                UniformName::SampleOffset,
                UniformValue::Float(self.config.dof_offset_step * (i + 1) as f32),
            )])?;
            draw_quad(
                &mut self.backend,
                "depth-of-field",
                program,
                Destination::offscreen(&target),
                extent(&target),
                &[(SamplerName::SceneTexture, scene.color)],
            )?;
            dof_textures.push(target.color);
            draws += 1;
        }

        {
            let mut inputs = vec![
                (SamplerName::SceneTexture, scene.color),
                (SamplerName::BloomTexture, bloom),
            ];
            inputs.extend(
                dof_textures
                    .iter()
                    .enumerate()
                    .map(|(i, texture)| (SamplerName::DofTexture(i), *texture)),
            );

            let program = &mut self.programs.composite;
            set_base_uniforms(program, &state)?;
            draw_quad(
                &mut self.backend,
                "composite",
                program,
                Destination::Surface,
                (state.surface_width, state.surface_height),
                &inputs,
            )?;
            draws += 1;
        }

        self.backend.flush()?;

        let stats = FrameStats {
            frame_index: self.frame_index,
            draws,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        log::trace!("frame {} submitted with {} draws", stats.frame_index, stats.draws);
        Ok(stats)
    }

    /// Runs `2 * taps` separable blur draws over the ping-pong pair of `pass`.
    ///
    /// Draw `k` uses tap `k / 2`, offset along y for even `k` and along x for
    /// odd `k`. It writes role 0 and reads role 1, except the first draw which
    /// reads `seed`; roles swap after every draw. Returns the texture written
    /// last.
    fn blur_chain(
        &mut self,
        pass: PassId,
        seed: TextureId,
        base: Option<&FrameState>,
    ) -> Result<TextureId, PipelineError> {
        let program = &mut self.programs.blur;

        for k in 0..2 * self.kernel.len() {
            let tap = k / 2;
            let offset = self.kernel.offsets()[tap];
            let weight = self.kernel.weights()[tap];
            let axis = if k % 2 == 0 { [0.0, offset] } else { [offset, 0.0] };

            let write = self.pool.get(pass, 0)?;
            let read = if k == 0 { seed } else { self.pool.get(pass, 1)?.color };

            if let Some(state) = base {
                set_base_uniforms(program, state)?;
            }
            program.set_uniforms(&[
                (UniformName::BlurOffset(tap), UniformValue::Vec2(axis)),
                (UniformName::BlurWeight(tap), UniformValue::Float(weight)),
            ])?;

            draw_quad(
                &mut self.backend,
                "blur",
                program,
                Destination::offscreen(&write),
                extent(&write),
                &[(SamplerName::BloomTexture, read)],
            )?;

            self.pool.swap(pass)?;
        }

        Ok(self.pool.get(pass, 1)?.color)
    }
}

fn extent(target: &RenderTarget) -> (u32, u32) {
    (target.width, target.height)
}

fn set_base_uniforms(program: &mut PassProgram, state: &FrameState) -> Result<(), PipelineError> {
    program.set_uniforms(&[
        (UniformName::Resolution, UniformValue::Vec2(state.resolution())),
        (UniformName::Pointer, UniformValue::Vec2(state.pointer())),
        (UniformName::Time, UniformValue::Float(state.elapsed_seconds)),
    ])
}

fn draw_quad<B: GraphicsBackend>(
    backend: &mut B,
    label: &'static str,
    program: &PassProgram,
    destination: Destination,
    viewport: (u32, u32),
    inputs: &[(SamplerName, TextureId)],
) -> Result<(), PipelineError> {
    let mut textures = Vec::with_capacity(inputs.len());
    for (sampler, texture) in inputs {
        textures.push(TextureBinding {
            unit: program.texture_unit(*sampler)?,
            texture: *texture,
        });
    }

    backend.draw(&DrawCall {
        label,
        destination,
        viewport,
        program: program.handle(),
        geometry: program.geometry()?,
        textures,
        uniforms: program.values().to_vec(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use crate::pipeline::{ErrorKind, ProgramLayouts};

    const SHADERS: PassShaders<'static> = PassShaders {
        vertex: "vertex",
        scene: "scene",
        bright_pass: "bright",
        blur: "blur",
        depth_of_field: "dof",
        composite: "composite",
    };

    // Slot indices of the default layouts.
    const RESOLUTION: usize = 0;
    const POINTER: usize = 1;
    const TIME: usize = 2;
    const SAMPLE_OFFSET: usize = 3;

    fn blur_offset(tap: usize) -> usize {
        3 + tap
    }

    fn orchestrator(config: PipelineConfig) -> Orchestrator<RecordingBackend> {
        Orchestrator::new(RecordingBackend::new(1280, 720), config, &SHADERS).unwrap()
    }

    fn single_frame(config: PipelineConfig) -> (Orchestrator<RecordingBackend>, Vec<DrawCall>) {
        let mut orch = orchestrator(config);
        orch.render_frame().unwrap();
        let frame = orch.backend().frames()[0].clone();
        (orch, frame)
    }

    fn color_of(destination: Destination) -> TextureId {
        match destination {
            Destination::Offscreen { color, .. } => color,
            Destination::Surface => panic!("surface has no texture"),
        }
    }

    #[test]
    fn default_frame_issues_72_draws() {
        let mut orch = orchestrator(PipelineConfig::default());
        let stats = orch.render_frame().unwrap();

        assert_eq!(stats.draws, 72);
        assert_eq!(orch.backend().frames().len(), 1);
        assert_eq!(orch.backend().frames()[0].len(), 72);
        assert!(orch.backend().pending().is_empty());
    }

    #[test]
    fn draw_count_follows_config() {
        let config = PipelineConfig {
            dof_samples: 3,
            bloom_taps: 4,
            ..Default::default()
        };
        let (_, frame) = single_frame(config.clone());
        assert_eq!(frame.len(), 1 + 1 + 8 + 8 + 3 + 1);
        assert_eq!(frame.len(), config.draws_per_frame());
    }

    #[test]
    fn pass_order_is_fixed() {
        let config = PipelineConfig {
            dof_samples: 2,
            bloom_taps: 2,
            ..Default::default()
        };
        let (_, frame) = single_frame(config);
        let labels: Vec<&str> = frame.iter().map(|d| d.label).collect();
        assert_eq!(
            labels,
            [
                "scene",
                "bright-pass",
                "blur",
                "blur",
                "blur",
                "blur",
                "blur",
                "blur",
                "blur",
                "blur",
                "depth-of-field",
                "depth-of-field",
                "composite",
            ]
        );
    }

    #[test]
    fn pointer_reaches_the_scene_pass() {
        let mut orch = orchestrator(PipelineConfig::default());
        orch.set_pointer(0.25, 0.75);
        orch.set_elapsed(3.5);
        orch.render_frame().unwrap();

        let scene = &orch.backend().frames()[0][0];
        assert_eq!(scene.label, "scene");
        assert_eq!(scene.uniforms[POINTER], [0.25, 0.75, 0.0, 0.0]);
        assert_eq!(scene.uniforms[TIME], [3.5, 0.0, 0.0, 0.0]);
        assert_eq!(scene.uniforms[RESOLUTION], [1280.0, 720.0, 0.0, 0.0]);
    }

    #[test]
    fn unchanged_state_repeats_the_same_commands() {
        let mut orch = orchestrator(PipelineConfig::default());
        orch.set_pointer(0.1, 0.9);
        for _ in 0..3 {
            orch.render_frame().unwrap();
        }

        let frames = orch.backend().frames();
        assert_eq!(frames[0], frames[1]);
        assert_eq!(frames[1], frames[2]);
    }

    #[test]
    fn no_draw_reads_its_own_target() {
        let (_, frame) = single_frame(PipelineConfig::default());
        for (i, draw) in frame.iter().enumerate() {
            assert!(!draw.reads_destination(), "draw {i} ({}) reads its target", draw.label);
        }
    }

    #[test]
    fn blur_axes_alternate_vertical_then_horizontal() {
        let (orch, frame) = single_frame(PipelineConfig::default());
        let offsets = orch.kernel().offsets().to_vec();

        for chain in [&frame[2..34], &frame[34..66]] {
            for (k, draw) in chain.iter().enumerate() {
                let tap = k / 2;
                let expected = if k % 2 == 0 {
                    [0.0, offsets[tap], 0.0, 0.0]
                } else {
                    [offsets[tap], 0.0, 0.0, 0.0]
                };
                assert_eq!(draw.uniforms[blur_offset(tap)], expected, "draw {k}");
            }
        }
    }

    #[test]
    fn blur_chains_ping_pong() {
        let (orch, frame) = single_frame(PipelineConfig::default());
        let bright = color_of(frame[1].destination);
        let first_chain = &frame[2..34];
        let second_chain = &frame[34..66];

        // Seeded with the extraction output, then each draw reads the previous one.
        assert_eq!(first_chain[0].texture_at(0), Some(bright));
        for k in 1..first_chain.len() {
            assert_eq!(
                first_chain[k].texture_at(0),
                Some(color_of(first_chain[k - 1].destination)),
                "first chain draw {k}"
            );
            assert_ne!(first_chain[k].destination, first_chain[k - 1].destination);
        }

        let first_result = color_of(first_chain[31].destination);
        assert_eq!(second_chain[0].texture_at(0), Some(first_result));
        for k in 1..second_chain.len() {
            assert_eq!(
                second_chain[k].texture_at(0),
                Some(color_of(second_chain[k - 1].destination))
            );
        }

        let bloom_a = orch.pool().get(PassId::Bloom, 0).unwrap();
        let bloom_b = orch.pool().get(PassId::Bloom, 1).unwrap();
        let used: Vec<_> = second_chain.iter().map(|d| d.destination).collect();
        assert!(used.iter().all(|d| *d == Destination::offscreen(&bloom_a)
            || *d == Destination::offscreen(&bloom_b)));
    }

    #[test]
    fn blur_chains_run_at_their_own_resolution() {
        let (_, frame) = single_frame(PipelineConfig::default());
        assert!(frame[2..34].iter().all(|d| d.viewport == (320, 180)));
        assert!(frame[34..66].iter().all(|d| d.viewport == (1280, 720)));
        assert_eq!(frame[0].viewport, (1280, 720));
    }

    #[test]
    fn only_the_second_chain_updates_base_uniforms() {
        let mut orch = orchestrator(PipelineConfig::default());
        orch.set_elapsed(2.0);
        orch.render_frame().unwrap();
        let frame = &orch.backend().frames()[0];

        assert_eq!(frame[2].uniforms[TIME], [0.0; 4]);
        assert_eq!(frame[2].uniforms[RESOLUTION], [0.0; 4]);
        assert_eq!(frame[34].uniforms[TIME], [2.0, 0.0, 0.0, 0.0]);
        assert_eq!(frame[34].uniforms[RESOLUTION], [1280.0, 720.0, 0.0, 0.0]);
    }

    #[test]
    fn first_chain_starts_clean_every_frame() {
        let mut orch = orchestrator(PipelineConfig::default());
        orch.set_elapsed(2.0);
        orch.render_frame().unwrap();
        orch.resize_all(640, 360).unwrap();
        orch.render_frame().unwrap();
        let frame = &orch.backend().frames()[1];

        // Nothing from the previous frame's second chain leaks in.
        assert_eq!(frame[2].uniforms[TIME], [0.0; 4]);
        assert_eq!(frame[2].uniforms[RESOLUTION], [0.0; 4]);
        assert_eq!(frame[2].uniforms[blur_offset(15)], [0.0; 4]);
        assert_eq!(frame[34].uniforms[RESOLUTION], [640.0, 360.0, 0.0, 0.0]);
    }

    #[test]
    fn depth_of_field_offsets_grow_per_sample() {
        let (orch, frame) = single_frame(PipelineConfig::default());
        let scene = color_of(frame[0].destination);
        let dof = &frame[66..71];

        for (i, draw) in dof.iter().enumerate() {
            let expected = 0.001 * (i + 1) as f32;
            assert_eq!(draw.uniforms[SAMPLE_OFFSET], [expected, 0.0, 0.0, 0.0]);
            assert_eq!(draw.texture_at(0), Some(scene));
            let target = orch.pool().get(PassId::DepthOfField, i).unwrap();
            assert_eq!(draw.destination, Destination::offscreen(&target));
        }
    }

    #[test]
    fn composite_binds_every_texture_to_its_unit() {
        let (orch, frame) = single_frame(PipelineConfig::default());
        let composite = frame.last().unwrap();
        let scene = orch.pool().get(PassId::Scene, 0).unwrap();
        let last_bloom = color_of(frame[65].destination);

        assert_eq!(composite.destination, Destination::Surface);
        assert_eq!(composite.viewport, (1280, 720));
        assert_eq!(composite.textures.len(), 7);
        assert_eq!(composite.texture_at(0), Some(scene.color));
        assert_eq!(composite.texture_at(1), Some(last_bloom));
        for i in 0..5 {
            let dof = orch.pool().get(PassId::DepthOfField, i).unwrap();
            assert_eq!(composite.texture_at(2 + i as u32), Some(dof.color));
        }
    }

    #[test]
    fn resize_reallocates_before_the_next_frame() {
        let mut orch = orchestrator(PipelineConfig::default());
        orch.resize_all(1001, 333).unwrap();
        orch.render_frame().unwrap();

        let frame = &orch.backend().frames()[0];
        assert_eq!(frame[0].viewport, (1001, 333));
        assert_eq!(frame[2].viewport, (251, 84));
        assert_eq!(frame.last().unwrap().viewport, (1001, 333));
        assert_eq!(orch.frame_state().resolution(), [1001.0, 333.0]);
    }

    #[test]
    fn zero_resize_keeps_previous_size() {
        let mut orch = orchestrator(PipelineConfig::default());
        orch.resize_all(0, 0).unwrap();
        let state = orch.frame_state();
        assert_eq!((state.surface_width, state.surface_height), (1280, 720));
        orch.render_frame().unwrap();
        assert_eq!(orch.backend().frames()[0][0].viewport, (1280, 720));
    }

    #[test]
    fn missing_uniform_fails_construction() {
        let config = PipelineConfig::default();
        let mut layouts = ProgramLayouts::for_config(&config);
        layouts.depth_of_field.uniforms.retain(|u| *u != UniformName::SampleOffset);

        let backend = RecordingBackend::new(64, 64);
        let err = Orchestrator::with_layouts(backend, config, &SHADERS, &layouts)
            .err()
            .unwrap();
        assert_eq!(
            err,
            PipelineError::UnknownUniform {
                program: ProgramId::DepthOfField,
                uniform: UniformName::SampleOffset,
            }
        );
        assert_eq!(err.kind(), ErrorKind::Programming);
    }

    #[test]
    fn misplaced_output_fails_construction() {
        let config = PipelineConfig::default();
        let mut layouts = ProgramLayouts::for_config(&config);
        layouts.composite.output = PassOutput::Offscreen;

        let backend = RecordingBackend::new(64, 64);
        let err = Orchestrator::with_layouts(backend, config, &SHADERS, &layouts)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::FatalInit);
    }

    #[test]
    fn compile_failure_aborts_startup() {
        let mut backend = RecordingBackend::new(64, 64);
        backend.fail_compilation("composite", "unknown identifier `bloom`");

        let err = Orchestrator::new(backend, PipelineConfig::default(), &SHADERS)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::FatalInit);
        assert!(err.to_string().contains("unknown identifier"));
    }

    #[test]
    fn invalid_config_aborts_startup() {
        let config = PipelineConfig {
            bloom_taps: 0,
            ..Default::default()
        };
        let err = Orchestrator::new(RecordingBackend::new(64, 64), config, &SHADERS)
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn frame_index_advances() {
        let mut orch = orchestrator(PipelineConfig::default());
        assert_eq!(orch.render_frame().unwrap().frame_index, 0);
        assert_eq!(orch.render_frame().unwrap().frame_index, 1);
    }

    #[test]
    fn into_backend_releases_targets() {
        let orch = orchestrator(PipelineConfig::default());
        assert_eq!(orch.backend().live_target_count(), 11);
        let backend = orch.into_backend();
        assert_eq!(backend.live_target_count(), 0);
    }
}
