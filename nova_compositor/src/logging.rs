//! Logging setup, built on the `tracing` ecosystem.
//!
//! Logs always go to stderr, in text or JSON. A file path in the
//! configuration adds a daily-rotated file layer; the returned
//! [`WorkerGuard`] must be kept alive for as long as the process logs.

use std::path::Path;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::LoggingError;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Minimal stderr logging for the time before the configuration is loaded.
///
/// Honors `RUST_LOG`, defaults to `info`. Does nothing if a subscriber is
/// already installed.
pub fn init_minimal_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    let _ = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .try_init();
}

fn env_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    let level: Level = level
        .parse()
        .map_err(|_| LoggingError::InvalidLevel(level.to_string()))?;
    Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string())))
}

fn create_file_layer(log_path: &Path, format: LogFormat) -> Result<(BoxedLayer, WorkerGuard), LoggingError> {
    let dir = match log_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|source| LoggingError::Directory {
        path: dir.to_path_buf(),
        source,
    })?;
    let file_name = log_path
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("nova-compositor.log"));

    let appender = tracing_appender::rolling::daily(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = match format {
        LogFormat::Json => fmt::layer().json().with_writer(writer).with_ansi(false).boxed(),
        LogFormat::Text => fmt::layer().with_writer(writer).with_ansi(false).boxed(),
    };
    Ok((layer, guard))
}

/// Installs the global subscriber described by `config`.
///
/// Fails if the level is invalid, the log directory cannot be created, or a
/// global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let stderr_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_filter(env_filter(&config.level)?)
            .boxed(),
        LogFormat::Text => fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
            .with_filter(env_filter(&config.level)?)
            .boxed(),
    };

    let mut layers: Vec<BoxedLayer> = vec![stderr_layer];
    let mut guard = None;
    if let Some(path) = &config.file_path {
        let (file_layer, file_guard) = create_file_layer(path, config.format)?;
        layers.push(file_layer.with_filter(env_filter(&config.level)?).boxed());
        guard = Some(file_guard);
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| LoggingError::InitializationFailure(e.to_string()))?;
    Ok(guard)
}
