//! Site manager interface

use thiserror::Error;

use super::{Certificate, ManageSiteResult, Site};

/// Errors raised by a site manager
#[derive(Debug, Error)]
pub enum SiteError {
    #[error("site {0} not found")]
    NotFound(i64),

    #[error("application pool {0} not found")]
    PoolNotFound(String),

    #[error("registry I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("registry is malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("registry lock poisoned")]
    Poisoned,
}

/// Owner of all site state.
///
/// Implementations are responsible for serializing concurrent mutations.
pub trait SiteManager: Send + Sync {
    /// All sites; stopped ones only when `include_stopped` is set
    fn get_sites(&self, include_stopped: bool) -> Result<Vec<Site>, SiteError>;

    fn get_site_by_id(&self, iis_id: i64) -> Result<Option<Site>, SiteError>;

    fn get_site_by_name(&self, name: &str) -> Result<Option<Site>, SiteError>;

    fn create_site(&self, site: Site) -> Result<ManageSiteResult, SiteError>;

    /// Persist every field of `site`, keyed by its IIS id
    fn update_site(&self, site: &Site) -> Result<(), SiteError>;

    fn start_site(&self, site: &Site) -> Result<(), SiteError>;

    fn stop_site(&self, site: &Site) -> Result<(), SiteError>;

    fn restart_site(&self, iis_id: i64) -> Result<(), SiteError>;

    fn recycle_application_pool(&self, pool: &str) -> Result<(), SiteError>;

    fn delete_site(&self, iis_id: i64) -> Result<(), SiteError>;

    fn get_application_pools(&self) -> Result<Vec<String>, SiteError>;

    fn get_certificates(&self) -> Result<Vec<Certificate>, SiteError>;
}
