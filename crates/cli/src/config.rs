use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use weft_core::composer::DEFAULT_COMPOSER;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Composer used when `--composer` is not given
    #[serde(default = "default_composer")]
    pub composer: String,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

fn default_composer() -> String {
    DEFAULT_COMPOSER.to_string()
}

fn default_pretty() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            pretty: default_pretty(),
        }
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            composer: default_composer(),
            output: OutputConfig::default(),
        }
    }
}

impl CliConfig {
    pub fn load(config_path: &Path) -> Result<Self> {
        // Load config file if it exists, otherwise use defaults
        if !config_path.exists() {
            tracing::debug!(
                "Configuration file {} not found, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .context("Failed to read configuration file")?;
        let config = toml::from_str(&content).context("Failed to parse configuration file")?;

        Ok(config)
    }
}
