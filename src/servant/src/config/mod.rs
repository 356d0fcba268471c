//! Configuration Management
//!
//! Handles loading and validation of the Servant configuration file.

mod parser;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use parser::ConfigParser;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub api: ApiConfig,
    pub sites: SitesConfig,
    pub deploy: DeployConfig,
    pub compat: CompatConfig,
    pub logging: LoggingConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    pub host: String,
    /// Listen port
    pub port: u16,
    /// Path prefix shared by every API route
    pub prefix: String,
}

/// Access configuration
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    /// Open the API to every caller regardless of key
    pub enable_api: bool,
    /// Secret expected in the `key` query parameter
    pub key: String,
}

/// Site registry location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitesConfig {
    pub registry: PathBuf,
}

/// Deploy upload limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Maximum upload size in MB
    pub max_upload_mb: u64,
}

/// Legacy response compatibility switches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatConfig {
    /// `POST /sites/create/` answers with the bare site id as text
    pub legacy_create_response: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("enable_api", &self.enable_api)
            .field("key", &if self.key.is_empty() { "" } else { "***" })
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 54444,
            prefix: "/api".to_string(),
        }
    }
}

impl Default for SitesConfig {
    fn default() -> Self {
        Self {
            registry: PathBuf::from("/var/lib/servant/sites.json"),
        }
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self { max_upload_mb: 512 }
    }
}

impl Default for CompatConfig {
    fn default() -> Self {
        Self {
            legacy_create_response: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ApiConfig {
    /// Whether a request carrying `supplied` as its `key` may pass.
    ///
    /// An absent key never matches, and an empty configured secret matches nothing.
    pub fn permits(&self, supplied: Option<&str>) -> bool {
        if self.enable_api {
            return true;
        }

        !self.key.is_empty() && matches!(supplied, Some(key) if key == self.key)
    }
}

impl DeployConfig {
    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_mb as usize).saturating_mul(1024 * 1024)
    }
}

impl Config {
    /// Load configuration from file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let parser = ConfigParser::new();
        parser
            .parse(path)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("server port must be non-zero");
        }

        let prefix = &self.server.prefix;
        if !prefix.is_empty() && (!prefix.starts_with('/') || prefix.ends_with('/')) {
            anyhow::bail!("prefix must start with '/' and must not end with '/': {}", prefix);
        }

        if self.deploy.max_upload_mb == 0 {
            anyhow::bail!("max_upload_mb must be greater than 0");
        }

        Ok(())
    }

    /// Socket address string for the listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
