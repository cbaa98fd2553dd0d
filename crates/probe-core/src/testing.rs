use std::collections::HashSet;
use std::io;

use probe_platform::host_info::{
    CpuCounts, HostInfo, OsRelease, Partition, PartitionError, PartitionUsage, PlatformError,
    SwapMemory, VirtualMemory,
};

pub const GIB: u64 = 1024 * 1024 * 1024;

/// In-memory host with canned answers.
pub struct FakeHost {
    pub cpu: CpuCounts,
    pub memory: VirtualMemory,
    pub swap: SwapMemory,
    pub partitions: Vec<(Partition, PartitionUsage)>,
    pub denied: HashSet<String>,
    pub broken: HashSet<String>,
}

impl FakeHost {
    /// 3 logical / 2 physical cores, 8 GiB memory half used, no swap, no disks.
    pub fn new() -> Self {
        Self {
            cpu: CpuCounts {
                physical: Some(2),
                logical: 3,
            },
            memory: VirtualMemory {
                total_bytes: 8 * GIB,
                available_bytes: 4 * GIB,
                used_bytes: 4 * GIB,
                percent: 50.0,
            },
            swap: SwapMemory {
                total_bytes: 2 * GIB,
                free_bytes: 2 * GIB,
                used_bytes: 0,
                percent: 0.0,
            },
            partitions: Vec::new(),
            denied: HashSet::new(),
            broken: HashSet::new(),
        }
    }

    pub fn with_partition(mut self, device: &str, mount_point: &str, total: u64, used: u64) -> Self {
        let free = total - used;
        self.partitions.push((
            Partition {
                device: device.to_string(),
                mount_point: mount_point.to_string(),
            },
            PartitionUsage {
                total_bytes: total,
                used_bytes: used,
                free_bytes: free,
                percent: probe_platform::host_info::usage_percent(used, total),
            },
        ));
        self
    }

    pub fn deny(mut self, mount_point: &str) -> Self {
        self.denied.insert(mount_point.to_string());
        self
    }

    pub fn break_mount(mut self, mount_point: &str) -> Self {
        self.broken.insert(mount_point.to_string());
        self
    }
}

impl HostInfo for FakeHost {
    fn os_release(&self) -> Result<OsRelease, PlatformError> {
        Ok(OsRelease {
            system: "Linux".to_string(),
            release: "6.1.0-test".to_string(),
            version: "#1 SMP PREEMPT_DYNAMIC".to_string(),
        })
    }

    fn cpu_counts(&self) -> Result<CpuCounts, PlatformError> {
        Ok(self.cpu)
    }

    fn virtual_memory(&self) -> Result<VirtualMemory, PlatformError> {
        Ok(self.memory.clone())
    }

    fn swap_memory(&self) -> Result<SwapMemory, PlatformError> {
        Ok(self.swap.clone())
    }

    fn partitions(&self) -> Result<Vec<Partition>, PlatformError> {
        Ok(self.partitions.iter().map(|(p, _)| p.clone()).collect())
    }

    fn partition_usage(&self, partition: &Partition) -> Result<PartitionUsage, PartitionError> {
        if self.denied.contains(&partition.mount_point) {
            return Err(PartitionError::from_os(
                "statvfs",
                &partition.mount_point,
                io::Error::from(io::ErrorKind::PermissionDenied),
            ));
        }
        if self.broken.contains(&partition.mount_point) {
            return Err(PartitionError::from_os(
                "statvfs",
                &partition.mount_point,
                io::Error::new(io::ErrorKind::Other, "input/output error"),
            ));
        }
        self.partitions
            .iter()
            .find(|(p, _)| p == partition)
            .map(|(_, usage)| usage.clone())
            .ok_or_else(|| {
                PartitionError::from_os(
                    "statvfs",
                    &partition.mount_point,
                    io::Error::from(io::ErrorKind::NotFound),
                )
            })
    }
}
