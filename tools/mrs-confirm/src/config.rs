//! TOML configuration file of the CLI.
//!
//! ```toml
//! [confirmation]
//! validators_count = 5
//! reply_timeout_secs = 10
//!
//! [confirmation.palette]
//! danger = "#ff0000"
//!
//! [http]
//! use_https = true
//! proxy = "socks5h://127.0.0.1:9050"
//! ```

use anyhow::{Context, Result};
use mrs_remote_nodes::{ConfirmationConfig, HttpConfig};
use serde::Deserialize;
use std::path::Path;

/// Whole configuration file. Every section and key is optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CliConfig {
    pub confirmation: ConfirmationConfig,
    pub http: HttpConfig,
}

impl CliConfig {
    /// Load from a TOML file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.confirmation.validate()?;
        Ok(config)
    }
}
