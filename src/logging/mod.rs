use crate::cli::TracingFormat;
use crate::config::Config;
use anyhow::Context;
use std::fs::{File, OpenOptions};
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Filter used when `RUST_LOG` is unset: quiet dependencies, `log_level` for this crate.
pub fn default_directives(log_level: &str) -> String {
    format!("warn,seatwatch={log_level}")
}

/// Configure and initialize logging for the application.
///
/// With `LOG_FILE` set, every event is also appended to that file without ANSI colours.
pub fn setup_logging(config: &Config, tracing_format: TracingFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    let file_layer = match &config.log_file {
        Some(path) => {
            let file = open_log_file(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    match tracing_format {
        TracingFormat::Pretty => registry
            .with(fmt::layer().compact().with_target(true))
            .try_init(),
        TracingFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init(),
    }
    .context("Failed to install tracing subscriber")
}

fn open_log_file(path: &std::path::Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
