//! Headless mode: drives the pipeline against the recording backend and logs
//! the draw sequence of each frame.

use std::fmt;

use anyhow::{anyhow, Context, Result};

use afterglow_engine::backend::{DrawCall, RecordingBackend};
use afterglow_engine::core::{AppControl, CancelToken, FrameLoop};
use afterglow_engine::pipeline::{Orchestrator, PipelineConfig};

use crate::shaders::StudioShaders;

/// Simulated frame interval for the scene clock.
const TRACE_DT: f32 = 1.0 / 60.0;

/// Consecutive draws of one program.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PassRun {
    pub label: &'static str,
    pub draws: usize,
}

impl fmt::Display for PassRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.draws {
            1 => f.write_str(self.label),
            n => write!(f, "{} x{n}", self.label),
        }
    }
}

/// Outcome of a headless run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceSummary {
    pub frames: u64,
    /// Pass sequence of every frame.
    pub passes: Vec<Vec<PassRun>>,
}

impl TraceSummary {
    pub fn draws_in(&self, frame: usize) -> usize {
        self.passes
            .get(frame)
            .map(|runs| runs.iter().map(|r| r.draws).sum())
            .unwrap_or(0)
    }

    /// Pass sequence of `frame` rendered as `scene -> bright-pass -> blur x32 ...`.
    pub fn describe(&self, frame: usize) -> String {
        self.passes
            .get(frame)
            .map(|runs| {
                runs.iter()
                    .map(PassRun::to_string)
                    .collect::<Vec<_>>()
                    .join(" -> ")
            })
            .unwrap_or_default()
    }
}

/// Renders `frames` frames on a `width x height` surface without a GPU.
///
/// Shader sources are validated with naga first, so this also checks that the
/// generated WGSL matches the configuration.
pub fn run_trace(
    config: PipelineConfig,
    shaders: &StudioShaders,
    (width, height): (u32, u32),
    frames: u64,
) -> Result<TraceSummary> {
    shaders.validate().context("shader validation failed")?;

    let backend = RecordingBackend::new(width, height);
    let mut orchestrator = Orchestrator::new(backend, config, &shaders.pass_shaders())
        .context("pipeline initialization failed")?;

    let mut failure = None;
    let mut frame_loop = FrameLoop::new(CancelToken::new(), Some(frames));
    let rendered = frame_loop.run(|index| {
        orchestrator.set_elapsed(index as f32 * TRACE_DT);
        match orchestrator.render_frame() {
            Ok(stats) => {
                log::debug!("frame {}: {} draws", stats.frame_index, stats.draws);
                AppControl::Continue
            }
            Err(err) => {
                failure = Some(anyhow!(err).context(format!("frame {index} failed")));
                AppControl::Exit
            }
        }
    });
    if let Some(err) = failure {
        return Err(err);
    }

    let summary = TraceSummary {
        frames: rendered,
        passes: orchestrator
            .backend_mut()
            .take_frames()
            .iter()
            .map(|frame| summarize(frame))
            .collect(),
    };
    for index in 0..summary.passes.len() {
        log::info!("frame {index}: {}", summary.describe(index));
    }
    Ok(summary)
}

fn summarize(frame: &[DrawCall]) -> Vec<PassRun> {
    let mut runs: Vec<PassRun> = Vec::new();
    for call in frame {
        match runs.last_mut() {
            Some(run) if run.label == call.label => run.draws += 1,
            _ => runs.push(PassRun {
                label: call.label,
                draws: 1,
            }),
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_trace_records_the_full_sequence() {
        let config = PipelineConfig::default();
        let shaders = StudioShaders::for_config(&config);
        let summary = run_trace(config.clone(), &shaders, (1280, 720), 2).unwrap();

        assert_eq!(summary.frames, 2);
        assert_eq!(summary.passes.len(), 2);
        assert_eq!(
            summary.describe(0),
            "scene -> bright-pass -> blur x64 -> depth-of-field x5 -> composite"
        );
        assert_eq!(summary.passes[0], summary.passes[1]);
        assert_eq!(summary.draws_in(0), config.draws_per_frame());
        assert_eq!(summary.draws_in(1), 72);
        assert_eq!(summary.draws_in(7), 0);
        assert_eq!(summary.describe(7), "");
    }

    #[test]
    fn small_config_traces() {
        let config = PipelineConfig {
            dof_samples: 1,
            bloom_taps: 1,
            ..PipelineConfig::default()
        };
        let shaders = StudioShaders::for_config(&config);
        let summary = run_trace(config, &shaders, (64, 64), 1).unwrap();
        assert_eq!(
            summary.describe(0),
            "scene -> bright-pass -> blur x4 -> depth-of-field -> composite"
        );
    }

    #[test]
    fn zero_frames_records_nothing() {
        let config = PipelineConfig::default();
        let shaders = StudioShaders::for_config(&config);
        let summary = run_trace(config, &shaders, (64, 64), 0).unwrap();
        assert_eq!(summary.frames, 0);
        assert!(summary.passes.is_empty());
    }

    #[test]
    fn oversized_surface_fails_initialization() {
        let config = PipelineConfig::default();
        let shaders = StudioShaders::for_config(&config);
        let err = run_trace(config, &shaders, (100_000, 64), 1).unwrap_err();
        assert!(format!("{err:#}").contains("pipeline initialization failed"));
    }
}
