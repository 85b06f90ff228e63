/*
[INPUT]:  YAML configuration file
[OUTPUT]: Parsed service configuration
[POS]:    Configuration layer - binary startup
[UPDATE]: When adding new configuration options
*/

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use w3social_auth::AuthConfig;

/// Top-level configuration for the auth service binary
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Where identity and nonce records live
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("w3social-auth")
}

impl ServiceConfig {
    /// Fresh configuration with a random token secret
    pub fn generate(data_dir: Option<PathBuf>) -> Self {
        Self {
            auth: AuthConfig::generate(),
            storage: data_dir
                .map(|data_dir| StorageConfig { data_dir })
                .unwrap_or_default(),
        }
    }

    /// Load configuration from YAML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.auth.validate().map_err(|err| anyhow!(err))?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        serde_yaml::to_string(self).context("failed to serialize config to YAML")
    }
}
