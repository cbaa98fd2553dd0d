use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kernel/platform identification, as reported by `uname(2)` or its equivalent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsRelease {
    pub system: String,
    pub release: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuCounts {
    /// `None` when the platform cannot tell physical cores apart
    pub physical: Option<u32>,
    pub logical: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualMemory {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub used_bytes: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapMemory {
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub used_bytes: u64,
    pub percent: f64,
}

/// A mounted volume from the OS partition table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub device: String,
    pub mount_point: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub percent: f64,
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },
    #[error("{call} failed: {source}")]
    Os {
        call: &'static str,
        #[source]
        source: io::Error,
    },
}

/// Failure to query the usage of a single partition.
///
/// `AccessDenied` covers mount points the probe may not look at (permission
/// errors, removable media that is not ready). Callers drop those partitions
/// and keep going; everything else ends up in `Platform`.
#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("access denied to {mount_point}: {source}")]
    AccessDenied {
        mount_point: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl PartitionError {
    /// Classify an OS error returned by a usage query on `mount_point`.
    pub fn from_os(call: &'static str, mount_point: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            Self::AccessDenied {
                mount_point: mount_point.to_string(),
                source,
            }
        } else {
            Self::Platform(PlatformError::Os { call, source })
        }
    }

    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }
}

pub trait HostInfo: Send + Sync {
    fn os_release(&self) -> Result<OsRelease, PlatformError>;
    fn cpu_counts(&self) -> Result<CpuCounts, PlatformError>;
    fn virtual_memory(&self) -> Result<VirtualMemory, PlatformError>;
    fn swap_memory(&self) -> Result<SwapMemory, PlatformError>;

    /// Partitions in the order the OS reports them.
    fn partitions(&self) -> Result<Vec<Partition>, PlatformError>;

    fn partition_usage(&self, partition: &Partition) -> Result<PartitionUsage, PartitionError>;
}

/// `used / total` as a percentage rounded to one decimal, 0.0 for an empty total.
pub fn usage_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let percent = used as f64 / total as f64 * 100.0;
    (percent * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_percent_rounds_to_one_decimal() {
        assert_eq!(usage_percent(1, 3), 33.3);
        assert_eq!(usage_percent(2, 3), 66.7);
        assert_eq!(usage_percent(50, 100), 50.0);
    }

    #[test]
    fn test_usage_percent_empty_total() {
        assert_eq!(usage_percent(0, 0), 0.0);
        assert_eq!(usage_percent(10, 0), 0.0);
    }

    #[test]
    fn test_permission_denied_is_access_denied() {
        let err = PartitionError::from_os(
            "statvfs",
            "/media/cdrom",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(err.is_access_denied());
        assert!(err.to_string().contains("/media/cdrom"));
    }

    #[test]
    fn test_other_errors_are_platform_errors() {
        let err = PartitionError::from_os("statvfs", "/mnt", io::Error::from(io::ErrorKind::NotFound));
        assert!(!err.is_access_denied());
        assert!(matches!(err, PartitionError::Platform(PlatformError::Os { call: "statvfs", .. })));
    }
}
