use super::error::PipelineError;

/// Texture units available to a single program.
///
/// Matches wgpu's default `max_sampled_textures_per_shader_stage`. The
/// composite program binds the scene, the bloom result and every
/// depth-of-field sample, so `dof_samples` is capped at this minus two.
pub const MAX_TEXTURE_UNITS: usize = 16;

/// Upper bound on blur taps; each tap takes two uniform slots.
pub const MAX_BLOOM_TAPS: usize = 64;

/// Startup constants of the pipeline.
///
/// Fixed for the lifetime of an [`Orchestrator`](super::Orchestrator).
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Number of depth-of-field sample targets.
    pub dof_samples: usize,

    /// Gaussian taps per blur iteration; each chain issues `2 * bloom_taps` draws.
    pub bloom_taps: usize,

    /// Downsample divisor of the first blur chain.
    pub bloom_reduction: u32,

    /// Distance between adjacent taps, in texture coordinates.
    pub blur_spacing: f32,

    /// Offset increment between depth-of-field samples.
    pub dof_offset_step: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dof_samples: 5,
            bloom_taps: 16,
            bloom_reduction: 4,
            blur_spacing: 0.001,
            dof_offset_step: 0.001,
        }
    }
}

impl PipelineConfig {
    /// Checks the constants once at startup.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.dof_samples == 0 || self.dof_samples > MAX_TEXTURE_UNITS - 2 {
            return Err(PipelineError::InvalidConfig(format!(
                "dof_samples must be in 1..={}, got {}",
                MAX_TEXTURE_UNITS - 2,
                self.dof_samples
            )));
        }
        if self.bloom_taps == 0 || self.bloom_taps > MAX_BLOOM_TAPS {
            return Err(PipelineError::InvalidConfig(format!(
                "bloom_taps must be in 1..={MAX_BLOOM_TAPS}, got {}",
                self.bloom_taps
            )));
        }
        if self.bloom_reduction == 0 {
            return Err(PipelineError::InvalidConfig(
                "bloom_reduction must be at least 1".into(),
            ));
        }
        if !self.blur_spacing.is_finite() || self.blur_spacing <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "blur_spacing must be a positive finite number, got {}",
                self.blur_spacing
            )));
        }
        if !self.dof_offset_step.is_finite() {
            return Err(PipelineError::InvalidConfig(format!(
                "dof_offset_step must be finite, got {}",
                self.dof_offset_step
            )));
        }
        Ok(())
    }

    /// Draw calls issued by one frame.
    ///
    /// scene + extraction + two blur chains + depth-of-field samples + composite.
    pub fn draws_per_frame(&self) -> usize {
        1 + 1 + 2 * self.bloom_taps + 2 * self.bloom_taps + self.dof_samples + 1
    }
}
