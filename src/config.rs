use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub tool: ToolConfig,
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusConfig {
    /// Maximum number of undelivered outbound messages
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ToolConfig {
    /// Size in bytes of the buffer each tool call writes its reply into
    #[serde(default = "default_output_capacity")]
    pub output_capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
}

fn default_outbound_capacity() -> usize {
    16
}

fn default_output_capacity() -> usize {
    512
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: default_outbound_capacity(),
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            output_capacity: default_output_capacity(),
        }
    }
}

impl Config {
    /// Telegram bot token, if a [telegram] section is configured.
    pub fn telegram_token(&self) -> Option<&str> {
        self.telegram
            .as_ref()
            .map(|t| t.bot_token.as_str())
            .filter(|t| !t.is_empty())
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config")?;

        if config.bus.outbound_capacity == 0 {
            anyhow::bail!("bus.outbound_capacity must be greater than zero");
        }
        if config.tool.output_capacity == 0 {
            anyhow::bail!("tool.output_capacity must be greater than zero");
        }

        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Load `explicit` if given, otherwise `fallback` when it exists, otherwise defaults.
    pub fn resolve(explicit: Option<&Path>, fallback: &Path) -> Result<Self> {
        let path = match explicit {
            Some(path) => path,
            None if fallback.exists() => fallback,
            None => {
                info!("No {} found, using defaults", fallback.display());
                return Ok(Self::default());
            }
        };

        info!("Loading configuration from: {}", path.display());
        Self::load(path).with_context(|| format!("Failed to load config from {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.bus.outbound_capacity, 16);
        assert_eq!(config.tool.output_capacity, 512);
        assert!(config.telegram_token().is_none());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml_str(
            r#"
            [bus]
            outbound_capacity = 4

            [tool]
            output_capacity = 128

            [telegram]
            bot_token = "123:abc"
            "#,
        )
        .unwrap();
        assert_eq!(config.bus.outbound_capacity, 4);
        assert_eq!(config.tool.output_capacity, 128);
        assert_eq!(config.telegram_token(), Some("123:abc"));
    }

    #[test]
    fn test_empty_token_treated_as_unset() {
        let config = Config::from_toml_str("[telegram]\nbot_token = \"\"\n").unwrap();
        assert!(config.telegram_token().is_none());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = Config::from_toml_str("[bus]\noutbound_capacity = 0\n").unwrap_err();
        assert!(err.to_string().contains("outbound_capacity"));

        let err = Config::from_toml_str("[tool]\noutput_capacity = 0\n").unwrap_err();
        assert!(err.to_string().contains("output_capacity"));
    }

    #[test]
    fn test_resolve_without_any_file_uses_defaults() {
        let config = Config::resolve(None, Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.bus.outbound_capacity, 16);
    }

    #[test]
    fn test_resolve_adds_same_context_for_both_sources() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[bus]\noutbound_capacity = 0").unwrap();
        let expected = format!("Failed to load config from {}", file.path().display());

        let explicit = Config::resolve(Some(file.path()), Path::new("/nonexistent")).unwrap_err();
        assert!(format!("{:#}", explicit).contains(&expected));

        let fallback = Config::resolve(None, file.path()).unwrap_err();
        assert!(format!("{:#}", fallback).contains(&expected));
    }

    #[test]
    fn test_resolve_reads_fallback_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tool]\noutput_capacity = 64").unwrap();

        let config = Config::resolve(None, file.path()).unwrap();
        assert_eq!(config.tool.output_capacity, 64);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = Config::load(Path::new("/nonexistent/mimibot.toml")).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/mimibot.toml"));
    }
}
