//! INI Configuration Parser

use anyhow::Result;
use configparser::ini::Ini;
use std::path::{Path, PathBuf};

use super::{
    ApiConfig, CompatConfig, Config, DeployConfig, LoggingConfig, ServerConfig, SitesConfig,
};

/// Configuration file parser
pub struct ConfigParser;

impl ConfigParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse main configuration file
    pub fn parse(&self, path: &Path) -> Result<Config> {
        let mut ini = Ini::new();
        ini.load(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        self.from_ini(&ini)
    }

    /// Parse configuration from an in-memory INI document
    pub fn parse_str(&self, content: &str) -> Result<Config> {
        let mut ini = Ini::new();
        ini.read(content.to_string())
            .map_err(|e| anyhow::anyhow!("Failed to read config: {}", e))?;

        self.from_ini(&ini)
    }

    fn from_ini(&self, ini: &Ini) -> Result<Config> {
        let config = Config {
            server: self.parse_server_section(ini)?,
            api: self.parse_api_section(ini)?,
            sites: self.parse_sites_section(ini),
            deploy: self.parse_deploy_section(ini)?,
            compat: self.parse_compat_section(ini)?,
            logging: self.parse_logging_section(ini),
        };

        config.validate()?;
        Ok(config)
    }

    fn parse_server_section(&self, ini: &Ini) -> Result<ServerConfig> {
        let mut config = ServerConfig::default();

        if let Some(val) = ini.get("server", "host") {
            config.host = val;
        }
        if let Some(val) = ini.getuint("server", "port").map_err(anyhow::Error::msg)? {
            config.port = u16::try_from(val)
                .map_err(|_| anyhow::anyhow!("server port out of range: {}", val))?;
        }
        if let Some(val) = ini.get("server", "prefix") {
            config.prefix = val;
        }

        Ok(config)
    }

    fn parse_api_section(&self, ini: &Ini) -> Result<ApiConfig> {
        let mut config = ApiConfig::default();

        if let Some(val) = ini.getbool("api", "enable_api").map_err(anyhow::Error::msg)? {
            config.enable_api = val;
        }
        if let Some(val) = ini.get("api", "key") {
            config.key = val;
        }

        Ok(config)
    }

    fn parse_sites_section(&self, ini: &Ini) -> SitesConfig {
        let mut config = SitesConfig::default();

        if let Some(val) = ini.get("sites", "registry") {
            config.registry = PathBuf::from(val);
        }

        config
    }

    fn parse_deploy_section(&self, ini: &Ini) -> Result<DeployConfig> {
        let mut config = DeployConfig::default();

        if let Some(val) = ini.getuint("deploy", "max_upload_mb").map_err(anyhow::Error::msg)? {
            config.max_upload_mb = val;
        }

        Ok(config)
    }

    fn parse_compat_section(&self, ini: &Ini) -> Result<CompatConfig> {
        let mut config = CompatConfig::default();

        if let Some(val) = ini
            .getbool("compat", "legacy_create_response")
            .map_err(anyhow::Error::msg)?
        {
            config.legacy_create_response = val;
        }

        Ok(config)
    }

    fn parse_logging_section(&self, ini: &Ini) -> LoggingConfig {
        let mut config = LoggingConfig::default();

        if let Some(val) = ini.get("logging", "level") {
            config.level = val;
        }

        config
    }
}

impl Default for ConfigParser {
    fn default() -> Self {
        Self::new()
    }
}
