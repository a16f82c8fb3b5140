//! Configuration loader supporting YAML, TOML and JSON.

use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    /// YAML format (.yaml, .yml)
    #[default]
    Yaml,
    /// TOML format (.toml)
    Toml,
    /// JSON format (.json)
    Json,
}

impl ConfigFormat {
    /// Short upper-case name used in parse errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Yaml => "YAML",
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }

    /// Detects the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "yaml" | "yml" => Some(Self::Yaml),
                "toml" => Some(Self::Toml),
                "json" => Some(Self::Json),
                _ => None,
            })
    }
}

/// Reads configuration files by extension.
///
/// # Example
///
/// ```rust,ignore
/// use concord_core::config::ConfigLoader;
///
/// let config: ConcordConfig = ConfigLoader::new().load_file("concord.yaml")?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Creates a new configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Loads a file, picking the parser from its extension.
    ///
    /// # Errors
    ///
    /// `InvalidFormat` for an unknown extension or unparseable content
    /// (carrying the file path), `FileReadError` if the file cannot be read.
    pub fn load_file<T, P>(&self, path: P) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::InvalidFormat {
            path: path.display().to_string(),
            reason: "Unrecognized file extension. Supported: .yaml, .yml, .toml, .json".to_string(),
        })?;

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        self.load_str(&content, format).map_err(|e| match e {
            ConfigError::InvalidFormat { reason, .. } => ConfigError::InvalidFormat {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    /// Loads configuration from a string with the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be parsed.
    pub fn load_str<T>(&self, content: &str, format: ConfigFormat) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
    {
        let parsed = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|e| ConfigError::InvalidFormat {
            path: "<string>".to_string(),
            reason: format!("{} parse error: {e}", format.name()),
        })
    }

    /// Serializes a configuration to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize<T>(config: &T, format: ConfigFormat) -> Result<String, ConfigError>
    where
        T: serde::Serialize,
    {
        let rendered = match format {
            ConfigFormat::Yaml => serde_yaml::to_string(config).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::to_string_pretty(config).map_err(|e| e.to_string()),
        };
        rendered.map_err(|reason| ConfigError::InvalidFormat {
            path: "<serialize>".to_string(),
            reason,
        })
    }
}
