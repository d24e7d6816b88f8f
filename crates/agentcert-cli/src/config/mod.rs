//! Configuration management.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Optional on-disk defaults for recurring invocations.
///
/// Command-line arguments always win; these only fill gaps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default private key output path.
    pub key_path: Option<PathBuf>,

    /// Default certificate output path.
    pub cert_path: Option<PathBuf>,

    /// Default RSA key strength in bits.
    pub bits: Option<u32>,

    /// Default entropy seed file location.
    pub seed_file: Option<PathBuf>,
}

impl Config {
    /// Get the config file path.
    pub fn path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;
        Ok(dir.join("agentcert").join("agentcert.toml"))
    }

    /// Load configuration from file, defaulting when absent.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;

        Ok(config)
    }
}
