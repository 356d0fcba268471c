//! Site Registry - JSON-file backed site manager

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::{
    Certificate, ManageSiteResult, Site, SiteError, SiteManager, SiteResult, SiteState,
};

/// Persistent site registry
pub struct SiteRegistry {
    /// Path to the registry file
    path: PathBuf,
    data: RwLock<RegistryData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RegistryData {
    #[serde(default)]
    sites: Vec<Site>,
    /// Pools that exist even without a site assigned to them
    #[serde(default)]
    application_pools: Vec<String>,
    #[serde(default)]
    certificates: Vec<Certificate>,
}

impl SiteRegistry {
    /// Load registry from file or create an empty one
    pub fn load(path: &Path) -> Result<Self, SiteError> {
        let data = if path.exists() {
            let content = fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            RegistryData::default()
        };

        tracing::debug!(
            sites = data.sites.len(),
            "Loaded site registry from {}",
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            data: RwLock::new(data),
        })
    }

    /// Register a certificate so it shows up in the server info
    pub fn add_certificate(&self, certificate: Certificate) -> Result<(), SiteError> {
        self.mutate(|data| {
            data.certificates.retain(|c| c.hash != certificate.hash);
            data.certificates.push(certificate);
            Ok(())
        })
    }

    /// Register an application pool without a site
    pub fn add_application_pool(&self, pool: &str) -> Result<(), SiteError> {
        self.mutate(|data| {
            if !data.application_pools.iter().any(|p| p == pool) {
                data.application_pools.push(pool.to_string());
            }
            Ok(())
        })
    }

    fn save(&self, data: &RegistryData) -> Result<(), SiteError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, content)?;

        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&RegistryData) -> T) -> Result<T, SiteError> {
        let data = self.data.read().map_err(|_| SiteError::Poisoned)?;
        Ok(f(&data))
    }

    /// Apply a mutation to a copy and keep it only once it is persisted.
    ///
    /// Neither the file nor the in-memory registry changes on error.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut RegistryData) -> Result<T, SiteError>,
    ) -> Result<T, SiteError> {
        let mut data = self.data.write().map_err(|_| SiteError::Poisoned)?;
        let mut next = data.clone();
        let value = f(&mut next)?;
        self.save(&next)?;
        *data = next;
        Ok(value)
    }

    fn set_state(&self, iis_id: i64, state: SiteState) -> Result<(), SiteError> {
        self.mutate(|data| {
            let site = data
                .sites
                .iter_mut()
                .find(|s| s.iis_id == iis_id)
                .ok_or(SiteError::NotFound(iis_id))?;
            site.site_state = state;
            Ok(())
        })
    }
}

impl SiteManager for SiteRegistry {
    fn get_sites(&self, include_stopped: bool) -> Result<Vec<Site>, SiteError> {
        self.read(|data| {
            data.sites
                .iter()
                .filter(|s| include_stopped || s.site_state == SiteState::Started)
                .cloned()
                .collect()
        })
    }

    fn get_site_by_id(&self, iis_id: i64) -> Result<Option<Site>, SiteError> {
        self.read(|data| data.sites.iter().find(|s| s.iis_id == iis_id).cloned())
    }

    fn get_site_by_name(&self, name: &str) -> Result<Option<Site>, SiteError> {
        self.read(|data| {
            data.sites
                .iter()
                .find(|s| s.name.eq_ignore_ascii_case(name))
                .cloned()
        })
    }

    fn create_site(&self, mut site: Site) -> Result<ManageSiteResult, SiteError> {
        let mut data = self.data.write().map_err(|_| SiteError::Poisoned)?;
        let mut result = ManageSiteResult::new();

        if site.name.trim().is_empty() {
            result.fail(SiteResult::ValidationError, "Site name is required.");
        }

        if data
            .sites
            .iter()
            .any(|s| s.name.eq_ignore_ascii_case(&site.name))
        {
            result.fail(
                SiteResult::NameAlreadyInUse,
                format!("The site name '{}' is already in use.", site.name),
            );
        }

        for binding in &site.bindings {
            let taken = data.sites.iter().flat_map(|s| &s.bindings).any(|b| {
                b.protocol.eq_ignore_ascii_case(&binding.protocol)
                    && b.ip_address == binding.ip_address
                    && b.port == binding.port
                    && b.hostname.eq_ignore_ascii_case(&binding.hostname)
            });
            if taken {
                result.fail(
                    SiteResult::BindingAlreadyInUse,
                    format!("The binding {} is already in use.", binding),
                );
            }
        }

        if !result.is_success() {
            return Ok(result);
        }

        site.iis_id = data.sites.iter().map(|s| s.iis_id).max().unwrap_or(0) + 1;
        if site.application_pool.is_empty() {
            site.application_pool = site.name.clone();
        }
        if site.site_state == SiteState::Unknown {
            site.site_state = SiteState::Started;
        }

        let mut next = data.clone();
        if !next.application_pools.contains(&site.application_pool) {
            next.application_pools.push(site.application_pool.clone());
        }
        let (iis_id, name) = (site.iis_id, site.name.clone());
        next.sites.push(site);
        self.save(&next)?;
        *data = next;

        result.iis_site_id = iis_id;
        tracing::info!(iis_id, "Created site {}", name);

        Ok(result)
    }

    fn update_site(&self, site: &Site) -> Result<(), SiteError> {
        self.mutate(|data| {
            let existing = data
                .sites
                .iter_mut()
                .find(|s| s.iis_id == site.iis_id)
                .ok_or(SiteError::NotFound(site.iis_id))?;
            *existing = site.clone();
            Ok(())
        })?;

        tracing::info!(iis_id = site.iis_id, "Updated site {}", site.name);
        Ok(())
    }

    fn start_site(&self, site: &Site) -> Result<(), SiteError> {
        self.set_state(site.iis_id, SiteState::Started)?;
        tracing::info!(iis_id = site.iis_id, "Started site {}", site.name);
        Ok(())
    }

    fn stop_site(&self, site: &Site) -> Result<(), SiteError> {
        self.set_state(site.iis_id, SiteState::Stopped)?;
        tracing::info!(iis_id = site.iis_id, "Stopped site {}", site.name);
        Ok(())
    }

    fn restart_site(&self, iis_id: i64) -> Result<(), SiteError> {
        self.set_state(iis_id, SiteState::Started)?;
        tracing::info!(iis_id, "Restarted site");
        Ok(())
    }

    fn recycle_application_pool(&self, pool: &str) -> Result<(), SiteError> {
        if !self.get_application_pools()?.iter().any(|p| p == pool) {
            return Err(SiteError::PoolNotFound(pool.to_string()));
        }

        tracing::info!(pool, "Recycled application pool");
        Ok(())
    }

    fn delete_site(&self, iis_id: i64) -> Result<(), SiteError> {
        self.mutate(|data| {
            let before = data.sites.len();
            data.sites.retain(|s| s.iis_id != iis_id);
            if data.sites.len() == before {
                return Err(SiteError::NotFound(iis_id));
            }
            Ok(())
        })?;

        tracing::info!(iis_id, "Deleted site");
        Ok(())
    }

    fn get_application_pools(&self) -> Result<Vec<String>, SiteError> {
        self.read(|data| {
            let pools: BTreeSet<&String> = data
                .application_pools
                .iter()
                .chain(data.sites.iter().map(|s| &s.application_pool))
                .filter(|p| !p.is_empty())
                .collect();
            pools.into_iter().cloned().collect()
        })
    }

    fn get_certificates(&self) -> Result<Vec<Certificate>, SiteError> {
        self.read(|data| data.certificates.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::Binding;
    use tempfile::tempdir;

    fn site(name: &str, port: u16) -> Site {
        Site {
            iis_id: 0,
            name: name.to_string(),
            application_pool: String::new(),
            site_state: SiteState::Unknown,
            bindings: vec![Binding {
                protocol: "http".to_string(),
                hostname: format!("{}.local", name),
                port,
                ip_address: "*".to_string(),
            }],
            site_path: format!("/www/{}", name),
            log_file_directory: "/var/log/iis".to_string(),
        }
    }

    #[test]
    fn test_registry_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sites.json");

        {
            let registry = SiteRegistry::load(&path).unwrap();
            let first = registry.create_site(site("alpha", 80)).unwrap();
            let second = registry.create_site(site("beta", 81)).unwrap();
            assert_eq!(first.iis_site_id, 1);
            assert_eq!(second.iis_site_id, 2);
        }

        let registry = SiteRegistry::load(&path).unwrap();
        let sites = registry.get_sites(true).unwrap();
        assert_eq!(sites.len(), 2);
        assert_eq!(registry.get_site_by_name("BETA").unwrap().unwrap().iis_id, 2);
    }

    #[test]
    fn test_create_collects_every_failure() {
        let dir = tempdir().unwrap();
        let registry = SiteRegistry::load(&dir.path().join("sites.json")).unwrap();
        registry.create_site(site("alpha", 80)).unwrap();

        let mut clash = site("alpha", 80);
        clash.bindings[0].hostname = "alpha.local".to_string();
        let result = registry.create_site(clash).unwrap();

        assert_eq!(result.result, SiteResult::NameAlreadyInUse);
        assert_eq!(result.iis_site_id, 0);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(registry.get_sites(true).unwrap().len(), 1);
    }

    #[test]
    fn test_lifecycle_changes_state() {
        let dir = tempdir().unwrap();
        let registry = SiteRegistry::load(&dir.path().join("sites.json")).unwrap();
        registry.create_site(site("alpha", 80)).unwrap();

        let alpha = registry.get_site_by_id(1).unwrap().unwrap();
        assert_eq!(alpha.site_state, SiteState::Started);

        registry.stop_site(&alpha).unwrap();
        assert_eq!(
            registry.get_site_by_id(1).unwrap().unwrap().site_state,
            SiteState::Stopped
        );
        assert!(registry.get_sites(false).unwrap().is_empty());
        assert_eq!(registry.get_sites(true).unwrap().len(), 1);

        registry.restart_site(1).unwrap();
        assert_eq!(registry.get_sites(false).unwrap().len(), 1);
    }

    #[test]
    fn test_pools_and_recycle() {
        let dir = tempdir().unwrap();
        let registry = SiteRegistry::load(&dir.path().join("sites.json")).unwrap();
        registry.add_application_pool("DefaultAppPool").unwrap();
        registry.create_site(site("alpha", 80)).unwrap();

        assert_eq!(
            registry.get_application_pools().unwrap(),
            vec!["DefaultAppPool".to_string(), "alpha".to_string()]
        );
        assert!(registry.recycle_application_pool("alpha").is_ok());
        assert!(matches!(
            registry.recycle_application_pool("missing"),
            Err(SiteError::PoolNotFound(_))
        ));
    }

    #[test]
    fn test_failed_save_leaves_registry_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sites.json");
        let registry = SiteRegistry::load(&path).unwrap();
        registry.create_site(site("alpha", 80)).unwrap();

        // A directory in place of the file makes every write fail
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(matches!(
            registry.create_site(site("beta", 81)),
            Err(SiteError::Io(_))
        ));
        assert_eq!(registry.get_sites(true).unwrap().len(), 1);
        assert!(registry.get_site_by_name("beta").unwrap().is_none());

        let alpha = registry.get_site_by_id(1).unwrap().unwrap();
        assert!(registry.stop_site(&alpha).is_err());
        assert_eq!(
            registry.get_site_by_id(1).unwrap().unwrap().site_state,
            SiteState::Started
        );

        assert!(registry.delete_site(1).is_err());
        assert_eq!(registry.get_sites(true).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_unknown_site() {
        let dir = tempdir().unwrap();
        let registry = SiteRegistry::load(&dir.path().join("sites.json")).unwrap();
        assert!(matches!(registry.delete_site(7), Err(SiteError::NotFound(7))));
    }
}
