use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use probe_platform::host_info::{HostInfo, PlatformError};

use crate::disk::{DiskError, DiskSourceResolver};
use crate::document::{
    CpuEntry, Document, MemoryEntry, OsEntry, PartitionEntry, SwapMemoryEntry, VirtualMemoryEntry,
};
use crate::size::format_size;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to read OS identification")]
    Os(#[source] PlatformError),
    #[error("failed to read CPU core counts")]
    Cpu(#[source] PlatformError),
    #[error("failed to read memory statistics")]
    Memory(#[source] PlatformError),
    #[error("failed to collect disk partitions")]
    Disk(#[from] DiskError),
}

/// Collects OS, CPU, memory and disk attributes into a [`Document`]
pub struct AttributeCollector {
    host: Box<dyn HostInfo>,
    disk_override: Option<PathBuf>,
}

impl AttributeCollector {
    pub fn new(host: Box<dyn HostInfo>) -> Self {
        Self {
            host,
            disk_override: None,
        }
    }

    /// Read partitions from this table instead of the OS when it has content.
    pub fn with_disk_override(mut self, path: impl Into<PathBuf>) -> Self {
        self.disk_override = Some(path.into());
        self
    }

    /// Run every collection step in order. The first failure aborts the run.
    pub fn collect(&self) -> Result<Document, CollectError> {
        let os = self.collect_os()?;
        let cpu = self.collect_cpu()?;
        let memory = self.collect_memory()?;
        let disks = self.collect_disks()?;
        Ok(Document::new(os, cpu, memory, disks))
    }

    fn collect_os(&self) -> Result<OsEntry, CollectError> {
        let release = self.host.os_release().map_err(CollectError::Os)?;
        info!("Operating System: {}", release.system);
        info!("Release: {}", release.release);
        info!("Version: {}", release.version);
        Ok(OsEntry {
            operating_system: release.system,
            release: release.release,
            version: release.version,
        })
    }

    fn collect_cpu(&self) -> Result<CpuEntry, CollectError> {
        let counts = self.host.cpu_counts().map_err(CollectError::Cpu)?;
        let physical = match counts.physical {
            Some(p) if p > counts.logical => {
                warn!(
                    "platform reported {} physical cores but only {} logical, clamping",
                    p, counts.logical
                );
                Some(counts.logical)
            }
            other => other,
        };
        match physical {
            Some(p) => info!("Physical cores: {}", p),
            None => info!("Physical cores: unavailable"),
        }
        info!("Total cores: {}", counts.logical);
        Ok(CpuEntry {
            physical_cores: physical,
            total_cores: counts.logical,
        })
    }

    fn collect_memory(&self) -> Result<MemoryEntry, CollectError> {
        let vm = self.host.virtual_memory().map_err(CollectError::Memory)?;
        let virtual_memory = VirtualMemoryEntry {
            total: format_size(vm.total_bytes),
            available: format_size(vm.available_bytes),
            used: format_size(vm.used_bytes),
            percentage: vm.percent,
        };
        info!("Total: {}", virtual_memory.total);
        info!("Available: {}", virtual_memory.available);
        info!("Used: {}", virtual_memory.used);
        info!("Percentage: {}", virtual_memory.percentage);

        let swap = self.host.swap_memory().map_err(CollectError::Memory)?;
        let swap_memory = SwapMemoryEntry {
            total: format_size(swap.total_bytes),
            free: format_size(swap.free_bytes),
            used: format_size(swap.used_bytes),
            percentage: swap.percent,
        };
        info!("Total: {}", swap_memory.total);
        info!("Free: {}", swap_memory.free);
        info!("Used: {}", swap_memory.used);
        info!("Percentage: {}", swap_memory.percentage);

        Ok(MemoryEntry {
            virtual_memory,
            swap_memory,
        })
    }

    fn collect_disks(&self) -> Result<Vec<PartitionEntry>, CollectError> {
        let resolver = DiskSourceResolver::new(self.host.as_ref(), self.disk_override.as_deref());
        Ok(resolver.collect()?)
    }
}
