use std::collections::HashSet;
use std::ffi::{CStr, CString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use probe_platform::host_info::{
    usage_percent, CpuCounts, HostInfo, OsRelease, Partition, PartitionError, PartitionUsage,
    PlatformError, SwapMemory, VirtualMemory,
};
use tracing::debug;

use crate::procfs;

pub struct LinuxHostInfo {
    proc_root: PathBuf,
    sys_root: PathBuf,
}

impl LinuxHostInfo {
    pub fn new() -> Self {
        Self::with_roots("/proc", "/sys")
    }

    /// Read procfs and sysfs from somewhere other than `/proc` and `/sys`
    /// (a container bind mount, or test fixtures).
    pub fn with_roots(proc_root: impl Into<PathBuf>, sys_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            sys_root: sys_root.into(),
        }
    }

    fn read_proc(&self, name: &str) -> Result<String, PlatformError> {
        read_file(&self.proc_root.join(name))
    }

    fn read_meminfo(&self) -> Result<procfs::MemInfo, PlatformError> {
        procfs::parse_meminfo(&self.read_proc("meminfo")?)
    }

    /// Distinct core sibling sets under sysfs, the same topology `lscpu` uses.
    fn sysfs_physical_cores(&self) -> Option<u32> {
        let cpu_dir = self.sys_root.join("devices/system/cpu");
        let entries = fs::read_dir(&cpu_dir).ok()?;

        let cpus: Vec<PathBuf> = entries
            .flatten()
            .filter(|e| {
                let name = e.file_name();
                let name = name.to_string_lossy();
                name.strip_prefix("cpu")
                    .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
            })
            .map(|e| e.path())
            .collect();

        for list in ["core_cpus_list", "thread_siblings_list"] {
            let siblings: HashSet<String> = cpus
                .iter()
                .filter_map(|cpu| fs::read_to_string(cpu.join("topology").join(list)).ok())
                .map(|s| s.trim().to_string())
                .collect();
            if !siblings.is_empty() {
                return Some(siblings.len() as u32);
            }
        }
        None
    }
}

impl Default for LinuxHostInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl HostInfo for LinuxHostInfo {
    fn os_release(&self) -> Result<OsRelease, PlatformError> {
        let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
        let ret = unsafe { libc::uname(&mut uts) };
        if ret != 0 {
            return Err(PlatformError::Os {
                call: "uname",
                source: io::Error::last_os_error(),
            });
        }

        Ok(OsRelease {
            system: c_field(&uts.sysname),
            release: c_field(&uts.release),
            version: c_field(&uts.version),
        })
    }

    fn cpu_counts(&self) -> Result<CpuCounts, PlatformError> {
        let online = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
        if online < 1 {
            return Err(PlatformError::Os {
                call: "sysconf(_SC_NPROCESSORS_ONLN)",
                source: io::Error::last_os_error(),
            });
        }

        let physical = self.sysfs_physical_cores().or_else(|| {
            debug!("no sysfs CPU topology, falling back to cpuinfo");
            self.read_proc("cpuinfo")
                .ok()
                .and_then(|content| procfs::parse_cpuinfo_cores(&content))
        });

        Ok(CpuCounts {
            physical,
            logical: online as u32,
        })
    }

    fn virtual_memory(&self) -> Result<VirtualMemory, PlatformError> {
        Ok(self.read_meminfo()?.virtual_memory())
    }

    fn swap_memory(&self) -> Result<SwapMemory, PlatformError> {
        Ok(self.read_meminfo()?.swap_memory())
    }

    fn partitions(&self) -> Result<Vec<Partition>, PlatformError> {
        let physical = procfs::parse_filesystems(&self.read_proc("filesystems")?);
        let mounts = self.read_proc("self/mounts")?;
        Ok(procfs::parse_mounts(&mounts, &physical))
    }

    fn partition_usage(&self, partition: &Partition) -> Result<PartitionUsage, PartitionError> {
        statvfs_usage(&partition.mount_point)
    }
}

fn statvfs_usage(mount_point: &str) -> Result<PartitionUsage, PartitionError> {
    let path = CString::new(mount_point).map_err(|_| PlatformError::Parse {
        what: "mount point",
        detail: format!("{:?} contains a NUL byte", mount_point),
    })?;

    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let ret = unsafe { libc::statvfs(path.as_ptr(), &mut stat) };
    if ret != 0 {
        return Err(PartitionError::from_os(
            "statvfs",
            mount_point,
            io::Error::last_os_error(),
        ));
    }

    let block_size = stat.f_frsize as u64;
    let total = stat.f_blocks as u64 * block_size;
    let free_to_root = stat.f_bfree as u64 * block_size;
    let free = stat.f_bavail as u64 * block_size;
    let used = total.saturating_sub(free_to_root);

    // Percent is relative to what an unprivileged user can see (used + free),
    // so it matches df(1) rather than used / total.
    Ok(PartitionUsage {
        total_bytes: total,
        used_bytes: used,
        free_bytes: free,
        percent: usage_percent(used, used + free),
    })
}

fn read_file(path: &Path) -> Result<String, PlatformError> {
    fs::read_to_string(path).map_err(|e| PlatformError::Read {
        path: path.display().to_string(),
        source: e,
    })
}

fn c_field(field: &[libc::c_char]) -> String {
    unsafe { CStr::from_ptr(field.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}
