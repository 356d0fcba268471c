//! Host Telemetry Module
//!
//! Machine-level figures reported by `/stats/`.

mod requests;

use serde::Serialize;
use std::sync::Mutex;
use sysinfo::{Disks, System};

pub use requests::{track_requests, RequestMetrics};

/// Samples memory, CPU and drives of the local machine
pub struct HostMonitor {
    /// Kept across calls so CPU usage is measured between two refreshes
    system: Mutex<System>,
}

/// Point-in-time host figures
#[derive(Debug, Clone, Serialize)]
pub struct HostSnapshot {
    pub machine_name: String,
    pub uptime_secs: u64,
    pub total_memory: u64,
    pub available_memory: u64,
    pub cpu_usage: f32,
    pub drives: Vec<DriveInfo>,
}

/// A fixed disk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriveInfo {
    pub name: String,
    pub total_size: u64,
    pub available_free_space: u64,
}

impl HostMonitor {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();

        Self {
            system: Mutex::new(system),
        }
    }

    /// Refresh and read the current host figures
    pub fn snapshot(&self) -> HostSnapshot {
        let (total_memory, available_memory, cpu_usage) = {
            let mut system = match self.system.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            system.refresh_cpu_usage();
            system.refresh_memory();
            (
                system.total_memory(),
                system.available_memory(),
                system.global_cpu_usage(),
            )
        };

        HostSnapshot {
            machine_name: machine_name(),
            uptime_secs: System::uptime(),
            total_memory,
            available_memory,
            cpu_usage,
            drives: fixed_drives(),
        }
    }
}

impl Default for HostMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn machine_name() -> String {
    System::host_name()
        .or_else(|| std::env::var("COMPUTERNAME").ok())
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Non-removable disks, named by mount point
fn fixed_drives() -> Vec<DriveInfo> {
    let disks = Disks::new_with_refreshed_list();

    disks
        .list()
        .iter()
        .filter(|disk| !disk.is_removable())
        .map(|disk| DriveInfo {
            name: disk.mount_point().to_string_lossy().to_string(),
            total_size: disk.total_space(),
            available_free_space: disk.available_space(),
        })
        .collect()
}
