use afterglow_engine::device::{GpuInit, SwapMode};
use afterglow_engine::logging::LoggingConfig;
use afterglow_engine::pipeline::PipelineConfig;
use afterglow_engine::window::RuntimeConfig;
use clap::Parser;

/// Command-line arguments of the studio.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "afterglow-studio",
    about = "Bloom and depth-of-field post-processing over an animated scene",
    long_about = "Renders an animated scene through a bright pass, two separable Gaussian \
                  blur chains and depth-of-field sampling, then composites the result. \
                  The pointer sets the focus point; Escape quits.",
    version
)]
pub struct Args {
    /// Initial window width in logical pixels
    #[arg(long, default_value = "1280")]
    pub width: u32,

    /// Initial window height in logical pixels
    #[arg(long, default_value = "720")]
    pub height: u32,

    /// Number of depth-of-field sample targets
    #[arg(long, default_value_t = 5)]
    pub dof_samples: usize,

    /// Gaussian taps per blur iteration
    #[arg(long, default_value_t = 16)]
    pub bloom_taps: usize,

    /// Downsample divisor of the first blur chain
    #[arg(long, default_value_t = 4)]
    pub bloom_reduction: u32,

    /// Distance between blur taps, in texture coordinates
    #[arg(long, default_value_t = 0.001)]
    pub blur_spacing: f32,

    /// Offset increment between depth-of-field samples
    #[arg(long, default_value_t = 0.001)]
    pub dof_offset_step: f32,

    /// Presentation mode: vsync, mailbox or immediate
    #[arg(long, default_value_t = SwapMode::Vsync)]
    pub swap_mode: SwapMode,

    /// Frames the display may queue ahead of the one on screen
    #[arg(long, default_value_t = 2)]
    pub frame_latency: u32,

    /// Exit after rendering this many frames
    #[arg(long)]
    pub max_frames: Option<u64>,

    /// Run N frames headless against the recording backend and log each draw sequence
    #[arg(long, value_name = "FRAMES")]
    pub trace: Option<u64>,

    /// Log filter in env_logger syntax; overrides RUST_LOG
    #[arg(long)]
    pub log_filter: Option<String>,
}

impl Args {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            dof_samples: self.dof_samples,
            bloom_taps: self.bloom_taps,
            bloom_reduction: self.bloom_reduction,
            blur_spacing: self.blur_spacing,
            dof_offset_step: self.dof_offset_step,
        }
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            initial_size: (self.width as f64, self.height as f64).into(),
            max_frames: self.max_frames,
            ..RuntimeConfig::default()
        }
    }

    pub fn gpu_init(&self) -> GpuInit {
        GpuInit {
            swap_mode: self.swap_mode,
            frame_latency: self.frame_latency,
            ..GpuInit::default()
        }
    }

    pub fn logging_config(&self) -> LoggingConfig {
        match &self.log_filter {
            Some(filter) => LoggingConfig::with_filter(filter.clone()),
            None => LoggingConfig::default(),
        }
    }
}
