//! Logging configuration types.

use concord_core::config::LoggingConfig;
use serde::{Deserialize, Serialize};

/// File name used for rolling log files.
pub const LOG_FILE_NAME: &str = "concord.log";

/// Subscriber setup derived from the `logging` configuration section.
///
/// `RUST_LOG`, when set, takes precedence over `level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `concord_governance=debug`
    #[serde(default = "default_level")]
    pub level: String,

    /// Console format; file output is always JSON
    #[serde(default)]
    pub format: LogFormat,

    /// Where events are written
    #[serde(default = "default_outputs")]
    pub outputs: Vec<LogOutput>,

    /// Tag each event with its thread id
    #[serde(default)]
    pub include_thread_id: bool,

    /// Tag each event with source file and line
    #[serde(default)]
    pub include_file_info: bool,

    /// Emit span enter/exit events (cycle, ledger fetch, portfolio, governance)
    #[serde(default)]
    pub include_span_events: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            outputs: default_outputs(),
            include_thread_id: false,
            include_file_info: false,
            include_span_events: false,
        }
    }
}

impl LogConfig {
    /// Builds a logging setup from the application's `logging` section.
    ///
    /// Unknown format names fall back to pretty output. A configured
    /// directory adds a daily-rotated file target.
    #[must_use]
    pub fn from_settings(settings: &LoggingConfig) -> Self {
        let format = match settings.format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
        let mut outputs = Vec::new();
        if settings.stdout_enabled {
            outputs.push(LogOutput::Stdout);
        }
        if let Some(dir) = &settings.directory {
            outputs.push(LogOutput::File {
                path: dir.clone(),
                rotation: Some(RotationConfig::Daily),
            });
        }
        Self {
            level: settings.level.clone(),
            format,
            outputs,
            ..Self::default()
        }
    }

    /// Moves console output from stdout to stderr, leaving stdout free for
    /// command results.
    #[must_use]
    pub fn console_to_stderr(mut self) -> Self {
        for output in &mut self.outputs {
            if *output == LogOutput::Stdout {
                *output = LogOutput::Stderr;
            }
        }
        self
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_outputs() -> Vec<LogOutput> {
    vec![LogOutput::Stdout]
}

/// Console log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One flattened JSON object per event
    Json,
    /// Multi-line human-readable events
    #[default]
    Pretty,
}

/// Log target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
    /// Rolling `concord.log` files in a directory
    File {
        /// Directory, created if missing
        path: String,
        /// Rotation period; daily when unset
        rotation: Option<RotationConfig>,
    },
}

/// Rolling file period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationConfig {
    /// New file every hour
    Hourly,
    /// New file every day
    Daily,
    /// A single file
    Never,
}
