//! Disk partition reporting from either an override table or the live OS.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use probe_platform::host_info::{HostInfo, Partition, PartitionError, PartitionUsage, PlatformError};

use crate::document::{PartitionDetails, PartitionEntry};
use crate::override_table::{self, OverrideError, OverrideRow};
use crate::size::format_size;

#[derive(Debug, Error)]
pub enum DiskError {
    #[error("failed to read disk override table {}", .path.display())]
    ReadOverride {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed disk override table {}", .path.display())]
    MalformedOverride {
        path: PathBuf,
        #[source]
        source: OverrideError,
    },
    #[error("failed to enumerate partitions")]
    Enumerate(#[source] PlatformError),
    #[error("failed to query usage of {mount_point}")]
    Usage {
        mount_point: String,
        #[source]
        source: PartitionError,
    },
}

/// Where partition data comes from for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskSource {
    Override(PathBuf),
    Live,
}

pub struct DiskSourceResolver<'a> {
    host: &'a dyn HostInfo,
    override_path: Option<&'a Path>,
}

impl<'a> DiskSourceResolver<'a> {
    pub fn new(host: &'a dyn HostInfo, override_path: Option<&'a Path>) -> Self {
        Self {
            host,
            override_path,
        }
    }

    /// The override table wins when it is a regular file with content.
    /// Anything that cannot be inspected counts as no table.
    pub fn source(&self) -> DiskSource {
        let Some(path) = self.override_path else {
            return DiskSource::Live;
        };
        match fs::metadata(path) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {
                DiskSource::Override(path.to_path_buf())
            }
            Ok(_) => DiskSource::Live,
            Err(e) if e.kind() == io::ErrorKind::NotFound => DiskSource::Live,
            Err(e) => {
                warn!("cannot inspect disk override table {}: {}", path.display(), e);
                DiskSource::Live
            }
        }
    }

    pub fn collect(&self) -> Result<Vec<PartitionEntry>, DiskError> {
        info!("Partitions and Usage:");
        match self.source() {
            DiskSource::Override(path) => read_override(&path),
            DiskSource::Live => self.read_live(),
        }
    }

    fn read_live(&self) -> Result<Vec<PartitionEntry>, DiskError> {
        let partitions = self.host.partitions().map_err(DiskError::Enumerate)?;

        let mut entries = Vec::with_capacity(partitions.len());
        for partition in partitions {
            info!("Device: {}", partition.device);
            let usage = match self.host.partition_usage(&partition) {
                Ok(usage) => usage,
                Err(e) if e.is_access_denied() => {
                    debug!("skipping {}: {}", partition.device, e);
                    continue;
                }
                Err(e) => {
                    return Err(DiskError::Usage {
                        mount_point: partition.mount_point,
                        source: e,
                    })
                }
            };
            entries.push(live_entry(partition, &usage));
        }
        Ok(entries)
    }
}

fn read_override(path: &Path) -> Result<Vec<PartitionEntry>, DiskError> {
    info!("reading disk partitions from {}", path.display());
    let content = fs::read_to_string(path).map_err(|e| DiskError::ReadOverride {
        path: path.to_path_buf(),
        source: e,
    })?;
    let rows = override_table::parse_table(&content).map_err(|e| DiskError::MalformedOverride {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(rows.into_iter().map(override_entry).collect())
}

fn override_entry(row: OverrideRow) -> PartitionEntry {
    let entry = PartitionEntry {
        device: row.device,
        details: PartitionDetails {
            mount_point: row.mount_point,
            total_size: row.total,
            used: row.used,
            free: row.free,
            percentage: row.percent,
        },
    };
    log_entry(&entry, true);
    entry
}

fn live_entry(partition: Partition, usage: &PartitionUsage) -> PartitionEntry {
    let entry = PartitionEntry {
        device: partition.device,
        details: PartitionDetails {
            mount_point: partition.mount_point,
            total_size: format_size(usage.total_bytes),
            used: format_size(usage.used_bytes),
            free: format_size(usage.free_bytes),
            percentage: usage.percent,
        },
    };
    log_entry(&entry, false);
    entry
}

fn log_entry(entry: &PartitionEntry, with_device: bool) {
    if with_device {
        info!("Device: {}", entry.device);
    }
    info!("  Total Size: {}", entry.details.total_size);
    info!("  Used: {}", entry.details.used);
    info!("  Free: {}", entry.details.free);
    info!("  Percentage: {}", entry.details.percentage);
    info!("  Mount Point: {}", entry.details.mount_point);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeHost, GIB};

    fn host() -> FakeHost {
        FakeHost::new()
            .with_partition("/dev/sda1", "/", 100 * GIB, 40 * GIB)
            .with_partition("/dev/sr0", "/media/cdrom", GIB, GIB)
            .with_partition("/dev/sdb1", "/data", 2048 * GIB, 512 * GIB)
    }

    fn devices(entries: &[PartitionEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.device.as_str()).collect()
    }

    #[test]
    fn test_live_partitions_are_scaled() {
        let host = host();
        let entries = DiskSourceResolver::new(&host, None).collect().unwrap();
        assert_eq!(devices(&entries), ["/dev/sda1", "/dev/sr0", "/dev/sdb1"]);
        assert_eq!(
            entries[0].details,
            PartitionDetails {
                mount_point: "/".to_string(),
                total_size: "100.00GB".to_string(),
                used: "40.00GB".to_string(),
                free: "60.00GB".to_string(),
                percentage: 40.0,
            }
        );
        assert_eq!(entries[2].details.total_size, "2.00TB");
    }

    #[test]
    fn test_access_denied_partition_is_skipped() {
        let host = host().deny("/media/cdrom");
        let entries = DiskSourceResolver::new(&host, None).collect().unwrap();
        assert_eq!(devices(&entries), ["/dev/sda1", "/dev/sdb1"]);
    }

    #[test]
    fn test_other_usage_failures_are_fatal() {
        let host = host().break_mount("/data");
        let err = DiskSourceResolver::new(&host, None).collect().unwrap_err();
        match err {
            DiskError::Usage { mount_point, .. } => assert_eq!(mount_point, "/data"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_override_table_wins_over_live_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host_disk_info.txt");
        fs::write(
            &path,
            "/dev/vda1 19.20GB 7.10GB 12.10GB 37.0 /\n/dev/vdb 98.30GB 1.20GB 97.10GB 1.2% /var/lib/data\n",
        )
        .unwrap();

        let host = host();
        let resolver = DiskSourceResolver::new(&host, Some(path.as_path()));
        assert_eq!(resolver.source(), DiskSource::Override(path.clone()));

        let entries = resolver.collect().unwrap();
        assert_eq!(devices(&entries), ["/dev/vda1", "/dev/vdb"]);
        assert_eq!(
            entries[1].details,
            PartitionDetails {
                mount_point: "/var/lib/data".to_string(),
                total_size: "98.30GB".to_string(),
                used: "1.20GB".to_string(),
                free: "97.10GB".to_string(),
                percentage: 1.2,
            }
        );
    }

    #[test]
    fn test_missing_or_empty_override_falls_back_to_live() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.txt");
        let empty = dir.path().join("empty.txt");
        fs::write(&empty, "").unwrap();

        let host = host();
        assert_eq!(
            DiskSourceResolver::new(&host, Some(missing.as_path())).source(),
            DiskSource::Live
        );
        assert_eq!(
            DiskSourceResolver::new(&host, Some(empty.as_path())).source(),
            DiskSource::Live
        );
        // a directory is not a table either
        assert_eq!(
            DiskSourceResolver::new(&host, Some(dir.path())).source(),
            DiskSource::Live
        );
    }

    #[test]
    fn test_uninspectable_override_falls_back_to_live() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("plain.txt");
        fs::write(&not_a_dir, "x").unwrap();
        // ENOTDIR, not NotFound
        let path = not_a_dir.join("host_disk_info.txt");

        let host = host();
        let resolver = DiskSourceResolver::new(&host, Some(path.as_path()));
        assert_eq!(resolver.source(), DiskSource::Live);
        assert_eq!(devices(&resolver.collect().unwrap()), ["/dev/sda1", "/dev/sr0", "/dev/sdb1"]);
    }

    #[test]
    fn test_whitespace_only_override_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host_disk_info.txt");
        fs::write(&path, "\n").unwrap();

        let host = host();
        let resolver = DiskSourceResolver::new(&host, Some(path.as_path()));
        assert_eq!(resolver.source(), DiskSource::Override(path.clone()));
        match resolver.collect().unwrap_err() {
            DiskError::MalformedOverride { source, .. } => {
                assert_eq!(source, OverrideError::MissingFields { line: 1, found: 0 });
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_override_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host_disk_info.txt");
        fs::write(&path, "/dev/vda1 19.20GB 7.10GB 12.10GB 37.0 /\n/dev/vdb 98.30GB\n").unwrap();

        let host = host();
        let err = DiskSourceResolver::new(&host, Some(path.as_path())).collect().unwrap_err();
        match err {
            DiskError::MalformedOverride { source, .. } => {
                assert_eq!(source, OverrideError::MissingFields { line: 2, found: 2 });
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_override_and_live_have_the_same_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host_disk_info.txt");
        fs::write(&path, "/dev/sda1 100.00GB 40.00GB 60.00GB 40.0 /\n").unwrap();

        let host = FakeHost::new().with_partition("/dev/sda1", "/", 100 * GIB, 40 * GIB);
        let live = DiskSourceResolver::new(&host, None).collect().unwrap();
        let from_table = DiskSourceResolver::new(&host, Some(path.as_path())).collect().unwrap();

        assert_eq!(live, from_table);
        assert_eq!(
            serde_json::to_value(&live).unwrap(),
            serde_json::to_value(&from_table).unwrap()
        );
    }
}
