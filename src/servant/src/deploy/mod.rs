//! Deploy Module
//!
//! Computes where an uploaded bundle goes and unpacks it there.
//!
//! Every deploy lands in a fresh `servant-<bundle>` directory next to the
//! previous one, so a site already served from a `servant-*` directory is
//! re-rooted at that directory's parent first.

mod extract;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

pub use extract::{extract_archive, extract_archive_blocking};

/// Directory name prefix marking a deploy target
pub const DEPLOY_DIR_PREFIX: &str = "servant-";

/// Errors raised while unpacking a bundle
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Target directory for deploying `archive_name` to a site at `site_path`
pub fn deploy_target(site_path: &Path, archive_name: &str) -> PathBuf {
    let root = match (site_path.file_name(), site_path.parent()) {
        (Some(name), Some(parent)) if name.to_string_lossy().starts_with(DEPLOY_DIR_PREFIX) => {
            parent
        }
        _ => site_path,
    };

    root.join(format!("{}{}", DEPLOY_DIR_PREFIX, bundle_name(archive_name)))
}

/// Final path component of an uploaded file name, without its extension.
///
/// Both separators are honoured since clients may send Windows paths.
fn bundle_name(archive_name: &str) -> String {
    let file_name = archive_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(archive_name);

    Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// One async lock per site id so deploys to the same site run in turn
#[derive(Default)]
pub struct DeployLocks {
    locks: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

impl DeployLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive deploy rights on `iis_id`
    pub async fn acquire(&self, iis_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = match self.locks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            Arc::clone(locks.entry(iis_id).or_default())
        };

        lock.lock_owned().await
    }
}
