use std::fs::File;
use std::path::PathBuf;
use std::sync::Once;

use anyhow::{Context, Result};

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info", "warn",
/// "kiln_engine=debug,wgpu=warn").
///
/// `write_style` controls ANSI coloring behavior.
///
/// `log_file` redirects all output into a file instead of stderr.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            log_file: None,
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// Subsequent calls are ignored and return `Ok`. Intended usage is early in `main`.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = builder(&config).and_then(|mut b| {
            b.try_init().context("a global logger is already installed")
        });
        if result.is_ok() {
            log::debug!("logging initialized");
        }
    });
    result
}

fn builder(config: &LoggingConfig) -> Result<env_logger::Builder> {
    let mut builder = env_logger::Builder::new();

    if let Some(filter) = &config.env_filter {
        builder.parse_filters(filter);
    } else if let Ok(filter) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filter);
    } else {
        builder.filter_level(log::LevelFilter::Info);
    }

    builder.write_style(config.write_style);

    if let Some(path) = &config.log_file {
        let file = File::create(path)
            .with_context(|| format!("failed to create log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
        // no escape codes in files
        builder.write_style(env_logger::WriteStyle::Never);
    }

    Ok(builder)
}
