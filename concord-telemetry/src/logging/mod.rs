//! Structured logging for Concord.
//!
//! Provides configurable logging with support for:
//! - JSON and pretty-print formats
//! - Stdout, stderr and rolling file targets
//! - `RUST_LOG` overriding the configured level

mod config;

pub use config::{LOG_FILE_NAME, LogConfig, LogFormat, LogOutput, RotationConfig};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize the logging system with the given configuration.
///
/// Returns guards that must be kept alive for the duration of the program
/// so buffered file output is flushed.
///
/// # Example
///
/// ```no_run
/// use concord_telemetry::logging::{init_logging, LogConfig};
///
/// let config = LogConfig::default();
/// let _guards = init_logging(&config).expect("Failed to initialize logging");
/// ```
pub fn init_logging(config: &LogConfig) -> Result<Vec<WorkerGuard>, LoggingError> {
    let mut guards = Vec::new();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| LoggingError::InvalidConfig(format!("level '{}': {e}", config.level)))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    for output in &config.outputs {
        match output {
            LogOutput::Stdout => layers.push(console_layer(config, std::io::stdout)),
            LogOutput::Stderr => layers.push(console_layer(config, std::io::stderr)),
            LogOutput::File { path, rotation } => {
                std::fs::create_dir_all(path)?;
                let (layer, guard) = file_layer(config, path, rotation.as_ref());
                layers.push(layer);
                guards.push(guard);
            }
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(guards)
}

fn span_events(config: &LogConfig) -> FmtSpan {
    if config.include_span_events {
        FmtSpan::ENTER | FmtSpan::EXIT
    } else {
        FmtSpan::NONE
    }
}

fn console_layer<W>(config: &LogConfig, writer: W) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    let base = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(config.include_thread_id)
        .with_file(config.include_file_info)
        .with_line_number(config.include_file_info)
        .with_span_events(span_events(config));

    match config.format {
        LogFormat::Json => base.json().flatten_event(true).boxed(),
        LogFormat::Pretty => base.pretty().boxed(),
    }
}

fn file_layer(
    config: &LogConfig,
    path: &str,
    rotation: Option<&RotationConfig>,
) -> (BoxedLayer, WorkerGuard) {
    let appender = match rotation.copied().unwrap_or(RotationConfig::Daily) {
        RotationConfig::Hourly => tracing_appender::rolling::hourly(path, LOG_FILE_NAME),
        RotationConfig::Daily => tracing_appender::rolling::daily(path, LOG_FILE_NAME),
        RotationConfig::Never => tracing_appender::rolling::never(path, LOG_FILE_NAME),
    };
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(config.include_thread_id)
        .with_file(config.include_file_info)
        .with_line_number(config.include_file_info)
        .with_span_events(span_events(config))
        .json()
        .flatten_event(true)
        .boxed();

    (layer, guard)
}

/// Errors that can occur during logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Failed to create log directory
    #[error("Failed to create log directory: {0}")]
    DirectoryCreation(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid logging configuration: {0}")]
    InvalidConfig(String),

    /// A global subscriber is already installed
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_rejected() {
        // RUST_LOG takes precedence over the configured level.
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LogConfig {
            level: "concord=loudest".to_string(),
            ..LogConfig::default()
        };
        assert!(matches!(
            init_logging(&config),
            Err(LoggingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_file_output_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs");
        let config = LogConfig {
            outputs: vec![LogOutput::File {
                path: path.to_string_lossy().into_owned(),
                rotation: Some(RotationConfig::Never),
            }],
            ..LogConfig::default()
        };
        // Another test may already own the global subscriber; the directory
        // is created either way.
        let _ = init_logging(&config);
        assert!(path.is_dir());
    }
}
