//! Structured logging setup.
//!
//! Installs a global `tracing` subscriber writing either to stderr or to a
//! daily rolling file. `MAMATRAK_LOG` overrides the configured level.
//! Access tokens and passwords are never passed to the logger.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::{LogOutput, LoggingConfig};

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "MAMATRAK_LOG";

const LOG_FILE_PREFIX: &str = "mamatrak.log";

/// Keeps the non-blocking file writer alive; drop it last.
pub struct LoggingGuard {
    _guard: Option<WorkerGuard>,
}

/// Installs the global subscriber.
///
/// # Errors
/// Returns an error if the level directive is invalid, the log directory
/// cannot be created, or a global subscriber is already installed.
pub fn init(config: &LoggingConfig, logs_dir: &Path) -> Result<LoggingGuard> {
    let env_filter = build_filter(std::env::var(LOG_ENV).ok().as_deref(), &config.level)?;

    let (fmt_layer, guard) = match config.output {
        LogOutput::Stderr => {
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .boxed();
            (layer, None)
        }
        LogOutput::File => {
            std::fs::create_dir_all(logs_dir).with_context(|| {
                format!("Failed to create log directory {}", logs_dir.display())
            })?;
            let appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (layer, Some(guard))
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::debug!(level = %config.level, output = ?config.output, "logging initialized");

    Ok(LoggingGuard { _guard: guard })
}

/// Env directive wins over the configured one when present and non-blank.
fn build_filter(env_value: Option<&str>, configured: &str) -> Result<EnvFilter> {
    let directive = env_value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(configured);

    EnvFilter::try_new(directive).with_context(|| format!("Invalid log level: {directive}"))
}
