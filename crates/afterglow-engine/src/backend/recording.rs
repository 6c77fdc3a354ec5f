use std::collections::{HashMap, HashSet};

use crate::pipeline::{QuadGeometry, RenderTarget};

use super::{
    check_interface, BackendError, DepthId, Destination, DrawCall, FramebufferId, GeometryHandle,
    GraphicsBackend, PassOutput, ProgramHandle, ProgramSource, ShaderStage, TextureId,
};

/// Largest target edge the recording backend accepts.
pub const MAX_TARGET_DIMENSION: u32 = 8192;

/// Interface of a program compiled by [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedProgram {
    pub label: String,
    pub uniform_slots: usize,
    pub texture_units: u32,
    pub output: PassOutput,
}

/// In-memory backend that validates and records every draw.
///
/// Draws accumulate until [`flush`](GraphicsBackend::flush), which closes
/// them into a frame. Validation mirrors what a GPU driver would reject:
/// stale handles, unbound texture units, uniform count mismatches, sampling
/// the destination, drawing a surface program offscreen.
#[derive(Debug)]
pub struct RecordingBackend {
    surface: (u32, u32),
    next_id: u32,
    targets: HashMap<FramebufferId, RenderTarget>,
    textures: HashSet<TextureId>,
    destroyed: usize,
    programs: HashMap<ProgramHandle, RecordedProgram>,
    geometries: HashSet<GeometryHandle>,
    compile_failures: HashMap<String, String>,
    pending: Vec<DrawCall>,
    frames: Vec<Vec<DrawCall>>,
}

impl RecordingBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface: (width, height),
            next_id: 1,
            targets: HashMap::new(),
            textures: HashSet::new(),
            destroyed: 0,
            programs: HashMap::new(),
            geometries: HashSet::new(),
            compile_failures: HashMap::new(),
            pending: Vec::new(),
            frames: Vec::new(),
        }
    }

    pub fn set_surface_size(&mut self, width: u32, height: u32) {
        self.surface = (width, height);
    }

    /// Makes every later compilation of `label` fail with `log`.
    pub fn fail_compilation(&mut self, label: &str, log: &str) {
        self.compile_failures.insert(label.to_owned(), log.to_owned());
    }

    pub fn program(&self, handle: ProgramHandle) -> Option<&RecordedProgram> {
        self.programs.get(&handle)
    }

    pub fn live_target_count(&self) -> usize {
        self.targets.len()
    }

    /// Number of targets destroyed so far.
    pub fn destroyed_count(&self) -> usize {
        self.destroyed
    }

    pub fn is_live(&self, framebuffer: FramebufferId) -> bool {
        self.targets.contains_key(&framebuffer)
    }

    /// Draws recorded since the last flush.
    pub fn pending(&self) -> &[DrawCall] {
        &self.pending
    }

    /// Flushed frames, oldest first.
    pub fn frames(&self) -> &[Vec<DrawCall>] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&[DrawCall]> {
        self.frames.last().map(Vec::as_slice)
    }

    /// Hands out the recorded frames and starts a fresh log.
    pub fn take_frames(&mut self) -> Vec<Vec<DrawCall>> {
        std::mem::take(&mut self.frames)
    }

    fn issue(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn check(&self, call: &DrawCall) -> Result<(), String> {
        let program = self
            .programs
            .get(&call.program)
            .ok_or_else(|| format!("program {:?} was never compiled", call.program))?;

        if !self.geometries.contains(&call.geometry) {
            return Err(format!("geometry {:?} was never uploaded", call.geometry));
        }

        for binding in &call.textures {
            if !self.textures.contains(&binding.texture) {
                return Err(format!("texture {:?} is not live", binding.texture));
            }
        }
        if let Destination::Offscreen { framebuffer, color } = call.destination {
            match self.targets.get(&framebuffer) {
                Some(target) if target.color == color => {}
                Some(_) => return Err(format!("{framebuffer:?} does not own {color:?}")),
                None => return Err(format!("{framebuffer:?} is not live")),
            }
        }

        check_interface(
            call,
            &program.label,
            program.uniform_slots,
            program.texture_units,
            program.output,
        )
    }
}

impl GraphicsBackend for RecordingBackend {
    fn surface_size(&self) -> (u32, u32) {
        self.surface
    }

    fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<RenderTarget, BackendError> {
        let fits = |edge: u32| (1..=MAX_TARGET_DIMENSION).contains(&edge);
        if !fits(width) || !fits(height) {
            return Err(BackendError::Allocation {
                width,
                height,
                reason: format!("edges must be within 1..={MAX_TARGET_DIMENSION}"),
            });
        }

        let color = TextureId(self.issue());
        let depth = DepthId(self.issue());
        let framebuffer = FramebufferId(self.issue());
        let target = RenderTarget {
            width,
            height,
            color,
            depth,
            framebuffer,
        };

        self.textures.insert(color);
        self.targets.insert(framebuffer, target);
        Ok(target)
    }

    fn destroy_render_target(&mut self, target: &RenderTarget) {
        if self.targets.remove(&target.framebuffer).is_some() {
            self.textures.remove(&target.color);
            self.destroyed += 1;
        } else {
            log::warn!("destroying unknown target {:?}", target.framebuffer);
        }
    }

    fn compile_program(
        &mut self,
        source: &ProgramSource<'_>,
    ) -> Result<ProgramHandle, BackendError> {
        if let Some(log) = self.compile_failures.get(source.label) {
            return Err(BackendError::Compile {
                label: source.label.to_owned(),
                stage: ShaderStage::Fragment,
                log: log.clone(),
            });
        }

        let handle = ProgramHandle(self.issue());
        self.programs.insert(
            handle,
            RecordedProgram {
                label: source.label.to_owned(),
                uniform_slots: source.uniform_slots,
                texture_units: source.texture_units,
                output: source.output,
            },
        );
        Ok(handle)
    }

    fn create_geometry(&mut self, quad: &QuadGeometry) -> Result<GeometryHandle, BackendError> {
        let vertices = quad.positions.len() / 3;
        if vertices * 2 != quad.texcoords.len()
            || quad.indices.iter().any(|&i| i as usize >= vertices)
        {
            return Err(BackendError::InvalidHandle(
                "quad attributes do not match its vertex count".to_owned(),
            ));
        }

        let handle = GeometryHandle(self.issue());
        self.geometries.insert(handle);
        Ok(handle)
    }

    fn draw(&mut self, call: &DrawCall) -> Result<(), BackendError> {
        self.check(call).map_err(|reason| BackendError::InvalidDraw {
            label: call.label.to_owned(),
            reason,
        })?;
        self.pending.push(call.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BackendError> {
        let frame = std::mem::take(&mut self.pending);
        log::trace!("recorded frame {} with {} draws", self.frames.len(), frame.len());
        self.frames.push(frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TextureBinding;
    use crate::pipeline::UNIT_QUAD;

    struct Fixture {
        backend: RecordingBackend,
        program: ProgramHandle,
        geometry: GeometryHandle,
        a: RenderTarget,
        b: RenderTarget,
    }

    fn fixture() -> Fixture {
        let mut backend = RecordingBackend::new(64, 64);
        let program = backend
            .compile_program(&ProgramSource {
                label: "blur",
                vertex: "",
                fragment: "",
                uniform_slots: 2,
                texture_units: 1,
                output: PassOutput::Offscreen,
            })
            .unwrap();
        let geometry = backend.create_geometry(&UNIT_QUAD).unwrap();
        let a = backend.create_render_target(32, 32).unwrap();
        let b = backend.create_render_target(32, 32).unwrap();
        Fixture {
            backend,
            program,
            geometry,
            a,
            b,
        }
    }

    fn call(f: &Fixture, write: &RenderTarget, read: TextureId) -> DrawCall {
        DrawCall {
            label: "blur",
            destination: Destination::offscreen(write),
            viewport: (write.width, write.height),
            program: f.program,
            geometry: f.geometry,
            textures: vec![TextureBinding {
                unit: 0,
                texture: read,
            }],
            uniforms: vec![[0.0; 4]; 2],
        }
    }

    fn rejection(backend: &mut RecordingBackend, call: &DrawCall) -> String {
        match backend.draw(call) {
            Err(BackendError::InvalidDraw { reason, .. }) => reason,
            other => panic!("expected a rejected draw, got {other:?}"),
        }
    }

    #[test]
    fn flush_closes_a_frame() {
        let mut f = fixture();
        let draw = call(&f, &f.a, f.b.color);
        f.backend.draw(&draw).unwrap();
        assert_eq!(f.backend.pending().len(), 1);

        f.backend.flush().unwrap();
        assert!(f.backend.pending().is_empty());
        assert_eq!(f.backend.last_frame(), Some(&[draw][..]));

        assert_eq!(f.backend.take_frames().len(), 1);
        assert!(f.backend.frames().is_empty());
    }

    #[test]
    fn sampling_the_destination_is_rejected() {
        let mut f = fixture();
        let draw = call(&f, &f.a, f.a.color);
        assert!(rejection(&mut f.backend, &draw).contains("renders into"));
    }

    #[test]
    fn every_unit_must_be_bound() {
        let mut f = fixture();
        let mut draw = call(&f, &f.a, f.b.color);
        draw.textures.clear();
        assert!(rejection(&mut f.backend, &draw).contains("0 of 1"));

        draw.textures = vec![TextureBinding {
            unit: 3,
            texture: f.b.color,
        }];
        assert!(rejection(&mut f.backend, &draw).contains("outside"));
    }

    #[test]
    fn uniform_count_must_match() {
        let mut f = fixture();
        let mut draw = call(&f, &f.a, f.b.color);
        draw.uniforms.pop();
        assert!(rejection(&mut f.backend, &draw).contains("1 uniform values for 2 slots"));
    }

    #[test]
    fn destroyed_targets_are_stale() {
        let mut f = fixture();
        let b = f.b;
        f.backend.destroy_render_target(&b);
        assert_eq!(f.backend.destroyed_count(), 1);
        assert!(!f.backend.is_live(b.framebuffer));

        let read_stale = call(&f, &f.a, b.color);
        assert!(rejection(&mut f.backend, &read_stale).contains("not live"));

        let write_stale = call(&f, &b, f.a.color);
        assert!(rejection(&mut f.backend, &write_stale).contains("not live"));
    }

    #[test]
    fn offscreen_programs_cannot_draw_to_the_surface() {
        let mut f = fixture();
        let mut draw = call(&f, &f.a, f.b.color);
        draw.destination = Destination::Surface;
        assert!(rejection(&mut f.backend, &draw).contains("renders to Offscreen"));
    }

    #[test]
    fn oversized_targets_fail_allocation() {
        let mut backend = RecordingBackend::new(64, 64);
        let err = backend.create_render_target(MAX_TARGET_DIMENSION + 1, 4).unwrap_err();
        assert!(matches!(err, BackendError::Allocation { height: 4, .. }));
        assert_eq!(backend.live_target_count(), 0);
    }

    #[test]
    fn forced_compile_failure_keeps_log() {
        let mut backend = RecordingBackend::new(64, 64);
        backend.fail_compilation("scene", "bad token");
        let err = backend
            .compile_program(&ProgramSource {
                label: "scene",
                vertex: "",
                fragment: "",
                uniform_slots: 0,
                texture_units: 0,
                output: PassOutput::Offscreen,
            })
            .unwrap_err();
        assert_eq!(
            err,
            BackendError::Compile {
                label: "scene".into(),
                stage: ShaderStage::Fragment,
                log: "bad token".into(),
            }
        );
    }
}
