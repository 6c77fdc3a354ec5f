mod app;
mod args;
mod shaders;
mod trace;

use anyhow::Context;
use clap::Parser;

use afterglow_engine::logging::init_logging;
use afterglow_engine::window::Runtime;

use crate::app::StudioApp;
use crate::args::Args;
use crate::shaders::StudioShaders;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.logging_config());

    let config = args.pipeline_config();
    config.validate().context("invalid pipeline configuration")?;
    let shaders = StudioShaders::for_config(&config);

    if let Some(frames) = args.trace {
        let summary = trace::run_trace(config, &shaders, (args.width, args.height), frames)?;
        log::info!("trace finished: {} frames", summary.frames);
        return Ok(());
    }

    log::info!(
        "starting studio: {} dof samples, {} bloom taps, reduction {}",
        config.dof_samples,
        config.bloom_taps,
        config.bloom_reduction
    );
    Runtime::run(
        args.runtime_config(),
        args.gpu_init(),
        StudioApp::new(config, shaders),
    )
}
