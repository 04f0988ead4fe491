use crate::core::AzureError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

include!(concat!(env!("OUT_DIR"), "/config_embedded.rs"));

const ENDPOINT_ENV: &str = "AZURE_OPENAI_ENDPOINT";

/// Deployment names per capability
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Deployments {
    pub chat: String,
    pub embeddings: String,
    pub audio: String,
    pub images: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    pub endpoint: String,
    pub api_version: String,
    pub timeout_secs: u64,
    pub deployments: Deployments,
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("Invalid default config")
    }
}

impl Config {
    /// Loads `./config.toml` when present, otherwise the embedded default.
    pub fn load() -> Result<Self, AzureError> {
        let config_path = Path::new("config.toml");
        let mut config = if config_path.exists() {
            Self::load_from(config_path)?
        } else {
            Self::default()
        };
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            config.endpoint = endpoint;
        }
        Ok(config)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, AzureError> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| AzureError::ConfigError(format!("Failed to read config file: {e}")))?;

        toml::from_str(&contents)
            .map_err(|e| AzureError::ConfigError(format!("Failed to parse config file: {e}")))
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
