mod capture;
mod cli;
mod diff;
mod display;
mod input;
mod logging;
mod mode;
mod persist;
mod pipeline;
mod shutdown;

use clap::{CommandFactory, Parser};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use videodiff_common::config::{Config, RunMode};

use crate::capture::Source;
use crate::cli::Args;
use crate::display::FfplayDisplay;
use crate::input::{KeySource, ScriptedKeys, TerminalKeys};
use crate::persist::{prepare_output_dir, ImageWriter, PersistenceSink};
use crate::pipeline::Pipeline;
use crate::shutdown::Interrupt;

#[tokio::main]
async fn main() {
    if std::env::args_os().len() <= 1 {
        if let Err(e) = Args::command().print_help() {
            eprintln!("{e}");
        }
        std::process::exit(1);
    }
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config from {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };
    args.apply(&mut config);
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    logging::init(&config.logging.level);

    info!(
        mode = ?config.source.mode,
        method = %config.diff.method,
        display = config.playback.display,
        output = ?config.output.dir,
        "starting videodiff"
    );

    let mut sink = match &config.output.dir {
        Some(dir) => {
            if let Err(e) = prepare_output_dir(dir) {
                error!(error = %e, "output directory unusable");
                std::process::exit(1);
            }
            Some(PersistenceSink::new(
                Arc::new(ImageWriter),
                dir.clone(),
                config.persist.workers,
            ))
        }
        None => None,
    };

    let source = match Source::open(&config.source).await {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to open input");
            std::process::exit(1);
        }
    };

    let interrupt = Interrupt::new();
    shutdown::watch_ctrl_c(interrupt.clone());

    let keys: Box<dyn KeySource> = match TerminalKeys::enter(interrupt.clone()) {
        Ok(keys) => Box::new(keys),
        Err(e) => {
            warn!(error = %e, "no interactive terminal, key controls disabled");
            Box::new(ScriptedKeys::silent())
        }
    };

    let mut display = config
        .playback
        .display
        .then(|| FfplayDisplay::new(format!("videodiff ({})", config.diff.method)));

    let pipeline = Pipeline::new(source, keys, config.diff.method, config.fill_value())
        .start_paused(config.playback.start_paused)
        .interrupt(interrupt)
        .idle_poll(Duration::from_millis(config.playback.idle_poll_ms))
        .hold_on_end(config.source.mode == RunMode::Pair);

    match pipeline.run(display.as_mut(), sink.as_mut()).await {
        Ok(summary) if summary.drain_interrupted() => std::process::exit(130),
        Ok(_) => {}
        Err(e) => {
            error!(error = %e, "capture failed");
            std::process::exit(1);
        }
    }
}
