//! Site Model
//!
//! IIS site records, management results and the server info snapshot,
//! plus the `SiteManager` seam the API delegates to.

mod manager;
mod registry;

use serde::{Deserialize, Serialize};

pub use manager::{SiteError, SiteManager};
pub use registry::SiteRegistry;

/// An IIS site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Site {
    /// IIS identifier, assigned by the manager on creation
    #[serde(default)]
    pub iis_id: i64,
    pub name: String,
    #[serde(default)]
    pub application_pool: String,
    #[serde(default)]
    pub site_state: SiteState,
    #[serde(default)]
    pub bindings: Vec<Binding>,
    #[serde(default)]
    pub site_path: String,
    #[serde(default)]
    pub log_file_directory: String,
}

/// Site lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SiteState {
    Started,
    Stopped,
    Starting,
    Stopping,
    #[default]
    Unknown,
}

/// A protocol/host/port/ip tuple a site listens on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Binding {
    pub protocol: String,
    #[serde(default)]
    pub hostname: String,
    pub port: u16,
    #[serde(default = "Binding::any_address")]
    pub ip_address: String,
}

impl Binding {
    fn any_address() -> String {
        "*".to_string()
    }
}

impl std::fmt::Display for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}://{}:{}:{}",
            self.protocol, self.ip_address, self.port, self.hostname
        )
    }
}

/// Outcome code of a site-affecting operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiteResult {
    Success,
    NameAlreadyInUse,
    BindingAlreadyInUse,
    ValidationError,
    UnknownError,
}

/// Result of a site-affecting operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ManageSiteResult {
    pub iis_site_id: i64,
    pub result: SiteResult,
    pub errors: Vec<String>,
}

impl ManageSiteResult {
    pub fn new() -> Self {
        Self {
            iis_site_id: 0,
            result: SiteResult::Success,
            errors: Vec::new(),
        }
    }

    /// Record a failed step; the first failure decides the result code
    pub fn fail(&mut self, result: SiteResult, message: impl Into<String>) {
        if self.result == SiteResult::Success {
            self.result = result;
        }
        self.errors.push(message.into());
    }

    pub fn is_success(&self) -> bool {
        self.result == SiteResult::Success
    }
}

impl Default for ManageSiteResult {
    fn default() -> Self {
        Self::new()
    }
}

/// An installed server certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Certificate {
    pub name: String,
    pub hash: String,
}

/// Pools and certificates at request time
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServantServerInfo {
    pub application_pools: Vec<String>,
    pub certificates: Vec<Certificate>,
}

impl ServantServerInfo {
    /// Rebuild the snapshot from the manager
    pub fn collect(manager: &dyn SiteManager) -> Result<Self, SiteError> {
        Ok(Self {
            application_pools: manager.get_application_pools()?,
            certificates: manager.get_certificates()?,
        })
    }
}
