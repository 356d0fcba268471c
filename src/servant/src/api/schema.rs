//! Response bodies, version 1.
//!
//! Field names are part of the wire contract and are spelled out here rather
//! than derived from internal types. `Site`, `ManageSiteResult` and
//! `ServantServerInfo` carry their own explicit PascalCase schemas.

use serde::Serialize;

use crate::host::{DriveInfo, HostSnapshot};
use crate::site::{Site, SiteState};

/// Body of `GET /stats/`
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(rename = "MachineName")]
    pub machine_name: String,
    #[serde(rename = "SystemUpTime")]
    pub system_up_time: u64,
    #[serde(rename = "TotalMemory")]
    pub total_memory: u64,
    #[serde(rename = "PhysicalAvailableMemory")]
    pub physical_available_memory: u64,
    #[serde(rename = "AverageCpuUsage")]
    pub average_cpu_usage: f32,
    #[serde(rename = "AverageGetRequestPerSecond")]
    pub average_get_request_per_second: f64,
    #[serde(rename = "CurrentConnections")]
    pub current_connections: u64,
    #[serde(rename = "Drives")]
    pub drives: Vec<DriveResponse>,
    #[serde(rename = "Sites")]
    pub sites: usize,
    #[serde(rename = "SitesStopped")]
    pub sites_stopped: usize,
}

#[derive(Debug, Serialize)]
pub struct DriveResponse {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "TotalSize")]
    pub total_size: u64,
    #[serde(rename = "AvailableFreeSpace")]
    pub available_free_space: u64,
}

/// Body of `POST /sites/{id}/delete/`
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    #[serde(rename = "Success")]
    pub success: bool,
}

impl From<DriveInfo> for DriveResponse {
    fn from(drive: DriveInfo) -> Self {
        Self {
            name: drive.name,
            total_size: drive.total_size,
            available_free_space: drive.available_free_space,
        }
    }
}

impl StatsResponse {
    /// Combine host figures with request counters and the site list
    pub fn new(
        host: HostSnapshot,
        average_get_request_per_second: f64,
        current_connections: u64,
        sites: &[Site],
    ) -> Self {
        Self {
            machine_name: host.machine_name,
            system_up_time: host.uptime_secs,
            total_memory: host.total_memory,
            physical_available_memory: host.available_memory,
            average_cpu_usage: host.cpu_usage,
            average_get_request_per_second,
            current_connections,
            drives: host.drives.into_iter().map(DriveResponse::from).collect(),
            sites: sites.len(),
            sites_stopped: sites
                .iter()
                .filter(|s| s.site_state != SiteState::Started)
                .count(),
        }
    }
}
