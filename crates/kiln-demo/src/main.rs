//! Arena walkthrough on top of `kiln-engine`.
//!
//! ```text
//! kiln-demo [--config <path>] [--headless <frames>]
//! ```

mod app;
mod camera;
mod config;
mod geometry;
mod phase;
mod scene;
mod walker;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use winit::dpi::PhysicalSize;

use kiln_engine::device::GpuInit;
use kiln_engine::logging::{LoggingConfig, init_logging};
use kiln_engine::window::{Runtime, RuntimeConfig};

use crate::app::Arena;
use crate::config::DemoConfig;

#[derive(Debug, Parser)]
#[command(version, about = "Walk around the kiln arena")]
struct Args {
    /// Demo configuration file.
    #[arg(long, default_value = "kiln.toml")]
    config: PathBuf,
    /// Render this many frames without a window and print call counts.
    #[arg(long, value_name = "FRAMES")]
    headless: Option<u32>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = DemoConfig::load(&args.config)?;

    init_logging(LoggingConfig {
        env_filter: config.logging.filter.clone(),
        log_file: config.logging.file.clone(),
        ..LoggingConfig::default()
    })?;

    if let Some(frames) = args.headless {
        let report = app::run_headless(&config, frames)?;
        for (i, stats) in report.frames.iter().enumerate() {
            println!(
                "frame {i}: {} draws, {} uploads, {} state changes, {} program switches",
                stats.draws, stats.uploads, stats.state_changes, stats.program_switches
            );
        }
        println!("released {} objects", report.released);
        return Ok(());
    }

    let runtime = RuntimeConfig {
        title: config.window.title.clone(),
        initial_size: PhysicalSize::new(config.window.width, config.window.height),
    };
    Runtime::run(runtime, GpuInit::default(), Arena::new(config))
}
