//! `config`: show or check the effective configuration.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use concord_core::config::{ConfigFormat, ConfigLoader};
use concord_engine::ConcordConfig;

/// Serialization format for `config --show`
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigOutput {
    /// YAML
    #[default]
    Yaml,
    /// TOML
    Toml,
    /// JSON
    Json,
}

impl From<ConfigOutput> for ConfigFormat {
    fn from(output: ConfigOutput) -> Self {
        match output {
            ConfigOutput::Yaml => Self::Yaml,
            ConfigOutput::Toml => Self::Toml,
            ConfigOutput::Json => Self::Json,
        }
    }
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Print the effective configuration, after file and environment overrides
    #[arg(long)]
    pub show: bool,

    /// Format used by --show
    #[arg(short, long, value_enum, default_value_t)]
    pub format: ConfigOutput,
}

/// Renders the configuration, or a confirmation that it is valid.
pub fn render(config: &ConcordConfig, args: &ConfigArgs) -> Result<String> {
    if args.show {
        ConfigLoader::serialize(config, args.format.into())
            .context("Failed to serialize configuration")
    } else {
        Ok("Configuration OK".to_string())
    }
}

/// Prints the rendered configuration.
///
/// The configuration was validated when it was loaded, so reaching this
/// point means it is valid.
pub fn run(config: &ConcordConfig, args: &ConfigArgs) -> Result<()> {
    println!("{}", render(config, args)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_yaml_reloads() {
        let config = ConcordConfig::default();
        let yaml = render(
            &config,
            &ConfigArgs {
                show: true,
                format: ConfigOutput::Yaml,
            },
        )
        .unwrap();
        let parsed: ConcordConfig = ConfigLoader::new()
            .load_str(&yaml, ConfigFormat::Yaml)
            .unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_show_json_has_sections() {
        let json = render(
            &ConcordConfig::default(),
            &ConfigArgs {
                show: true,
                format: ConfigOutput::Json,
            },
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for section in ["portfolio", "authority", "voter", "fallback", "deployment", "ledger", "logging"] {
            assert!(value.get(section).is_some(), "missing {section}");
        }
    }

    #[test]
    fn test_without_show_confirms() {
        let out = render(
            &ConcordConfig::default(),
            &ConfigArgs {
                show: false,
                format: ConfigOutput::Yaml,
            },
        )
        .unwrap();
        assert_eq!(out, "Configuration OK");
    }
}
