use std::ffi::OsString;
use std::io;
use std::os::windows::ffi::OsStringExt;

use probe_platform::host_info::{
    usage_percent, CpuCounts, HostInfo, OsRelease, Partition, PartitionError, PartitionUsage,
    PlatformError, SwapMemory, VirtualMemory,
};
use tracing::debug;
use windows::core::PCWSTR;
use windows::Win32::Storage::FileSystem::{GetDiskFreeSpaceExW, GetDriveTypeW, GetLogicalDriveStringsW};
use windows::Win32::System::Registry::{
    RegCloseKey, RegOpenKeyExW, RegQueryValueExW, HKEY, HKEY_LOCAL_MACHINE, KEY_READ,
    REG_VALUE_TYPE,
};
use windows::Win32::System::SystemInformation::{
    GetLogicalProcessorInformation, GetSystemInfo, GlobalMemoryStatusEx, RelationProcessorCore,
    MEMORYSTATUSEX, SYSTEM_INFO, SYSTEM_LOGICAL_PROCESSOR_INFORMATION,
};

const CURRENT_VERSION_KEY: &str = "SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion";

// GetDriveTypeW results that mean "nothing mounted here"
const DRIVE_UNKNOWN: u32 = 0;
const DRIVE_NO_ROOT_DIR: u32 = 1;

const ERROR_NOT_READY: i32 = 21;

pub struct WindowsHostInfo;

impl WindowsHostInfo {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsHostInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl HostInfo for WindowsHostInfo {
    fn os_release(&self) -> Result<OsRelease, PlatformError> {
        let key = RegKey::open(CURRENT_VERSION_KEY)?;
        let major = key.read_dword("CurrentMajorVersionNumber")?;
        let minor = key.read_dword("CurrentMinorVersionNumber")?;
        let build = key.read_string("CurrentBuildNumber")?;

        Ok(OsRelease {
            system: "Windows".to_string(),
            release: major.to_string(),
            version: format!("{}.{}.{}", major, minor, build),
        })
    }

    fn cpu_counts(&self) -> Result<CpuCounts, PlatformError> {
        let logical = unsafe {
            let mut info = SYSTEM_INFO::default();
            GetSystemInfo(&mut info);
            info.dwNumberOfProcessors
        };
        if logical == 0 {
            return Err(PlatformError::Os {
                call: "GetSystemInfo",
                source: io::Error::new(io::ErrorKind::Other, "no processors reported"),
            });
        }

        Ok(CpuCounts {
            physical: read_physical_cores(),
            logical,
        })
    }

    fn virtual_memory(&self) -> Result<VirtualMemory, PlatformError> {
        let status = read_memory_status()?;
        let total = status.ullTotalPhys;
        let available = status.ullAvailPhys.min(total);
        let used = total - available;

        Ok(VirtualMemory {
            total_bytes: total,
            available_bytes: available,
            used_bytes: used,
            percent: usage_percent(used, total),
        })
    }

    fn swap_memory(&self) -> Result<SwapMemory, PlatformError> {
        // The page file figures include physical memory; subtract it back out
        let status = read_memory_status()?;
        let total = status.ullTotalPageFile.saturating_sub(status.ullTotalPhys);
        let free = status
            .ullAvailPageFile
            .saturating_sub(status.ullAvailPhys)
            .min(total);
        let used = total - free;

        Ok(SwapMemory {
            total_bytes: total,
            free_bytes: free,
            used_bytes: used,
            percent: usage_percent(used, total),
        })
    }

    fn partitions(&self) -> Result<Vec<Partition>, PlatformError> {
        let mut buf = [0u16; 512];
        let len = unsafe { GetLogicalDriveStringsW(Some(&mut buf)) } as usize;
        if len == 0 || len > buf.len() {
            return Err(PlatformError::Os {
                call: "GetLogicalDriveStringsW",
                source: io::Error::last_os_error(),
            });
        }

        let mut partitions = Vec::new();

        // Drive strings are null-separated, double-null terminated
        for drive in buf[..len].split(|&c| c == 0) {
            if drive.is_empty() {
                continue;
            }

            let root = OsString::from_wide(drive).to_string_lossy().to_string();
            let wide_root = to_wide(&root);

            let drive_type = unsafe { GetDriveTypeW(PCWSTR(wide_root.as_ptr())) };
            if drive_type == DRIVE_UNKNOWN || drive_type == DRIVE_NO_ROOT_DIR {
                debug!("skipping {}: no volume mounted", root);
                continue;
            }

            partitions.push(Partition {
                device: root.clone(),
                mount_point: root,
            });
        }

        Ok(partitions)
    }

    fn partition_usage(&self, partition: &Partition) -> Result<PartitionUsage, PartitionError> {
        let wide_root = to_wide(&partition.mount_point);

        let mut free_available: u64 = 0;
        let mut total: u64 = 0;
        let mut total_free: u64 = 0;

        let result = unsafe {
            GetDiskFreeSpaceExW(
                PCWSTR(wide_root.as_ptr()),
                Some(&mut free_available),
                Some(&mut total),
                Some(&mut total_free),
            )
        };

        if let Err(e) = result {
            let source = win32_io_error(&e);
            // An empty card reader or DVD drive is "not ready", not broken
            if source.raw_os_error() == Some(ERROR_NOT_READY) {
                return Err(PartitionError::AccessDenied {
                    mount_point: partition.mount_point.clone(),
                    source,
                });
            }
            return Err(PartitionError::from_os(
                "GetDiskFreeSpaceExW",
                &partition.mount_point,
                source,
            ));
        }

        let used = total.saturating_sub(total_free);
        Ok(PartitionUsage {
            total_bytes: total,
            used_bytes: used,
            free_bytes: total_free,
            percent: usage_percent(used, total),
        })
    }
}

fn read_memory_status() -> Result<MEMORYSTATUSEX, PlatformError> {
    let mut status = MEMORYSTATUSEX {
        dwLength: std::mem::size_of::<MEMORYSTATUSEX>() as u32,
        ..Default::default()
    };
    unsafe { GlobalMemoryStatusEx(&mut status) }.map_err(|e| PlatformError::Os {
        call: "GlobalMemoryStatusEx",
        source: win32_io_error(&e),
    })?;
    Ok(status)
}

fn read_physical_cores() -> Option<u32> {
    let entry_size = std::mem::size_of::<SYSTEM_LOGICAL_PROCESSOR_INFORMATION>();
    let mut len: u32 = 0;

    // First call reports the buffer size it needs
    unsafe {
        let _ = GetLogicalProcessorInformation(None, &mut len);
    }
    if len == 0 {
        return None;
    }

    let count = len as usize / entry_size;
    let mut buf = vec![SYSTEM_LOGICAL_PROCESSOR_INFORMATION::default(); count];
    if unsafe { GetLogicalProcessorInformation(Some(buf.as_mut_ptr()), &mut len) }.is_err() {
        return None;
    }
    buf.truncate(len as usize / entry_size);

    let cores = buf
        .iter()
        .filter(|info| info.Relationship == RelationProcessorCore)
        .count() as u32;
    (cores > 0).then_some(cores)
}

struct RegKey(HKEY);

impl RegKey {
    fn open(subkey: &str) -> Result<Self, PlatformError> {
        let subkey = to_wide(subkey);
        let mut hkey = HKEY::default();
        let status = unsafe {
            RegOpenKeyExW(
                HKEY_LOCAL_MACHINE,
                PCWSTR(subkey.as_ptr()),
                0,
                KEY_READ,
                &mut hkey,
            )
        };
        if status.is_err() {
            return Err(PlatformError::Os {
                call: "RegOpenKeyExW",
                source: io::Error::from_raw_os_error(status.0 as i32),
            });
        }
        Ok(Self(hkey))
    }

    fn query(&self, name: &str) -> Result<Vec<u8>, PlatformError> {
        let value_name = to_wide(name);
        let mut data_type = REG_VALUE_TYPE::default();
        let mut size: u32 = 0;

        // Query size
        let _ = unsafe {
            RegQueryValueExW(
                self.0,
                PCWSTR(value_name.as_ptr()),
                None,
                Some(&mut data_type),
                None,
                Some(&mut size),
            )
        };

        let mut buf = vec![0u8; size as usize];
        let status = unsafe {
            RegQueryValueExW(
                self.0,
                PCWSTR(value_name.as_ptr()),
                None,
                Some(&mut data_type),
                Some(buf.as_mut_ptr()),
                Some(&mut size),
            )
        };
        if status.is_err() {
            return Err(PlatformError::Os {
                call: "RegQueryValueExW",
                source: io::Error::from_raw_os_error(status.0 as i32),
            });
        }
        buf.truncate(size as usize);
        Ok(buf)
    }

    fn read_dword(&self, name: &str) -> Result<u32, PlatformError> {
        let data = self.query(name)?;
        let bytes: [u8; 4] = data.get(..4).and_then(|b| b.try_into().ok()).ok_or_else(|| {
            PlatformError::Parse {
                what: "registry DWORD",
                detail: format!("{} has {} bytes", name, data.len()),
            }
        })?;
        Ok(u32::from_le_bytes(bytes))
    }

    fn read_string(&self, name: &str) -> Result<String, PlatformError> {
        let data = self.query(name)?;
        // REG_SZ is null-terminated UTF-16
        let wide: Vec<u16> = data
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
        Ok(OsString::from_wide(&wide[..len]).to_string_lossy().to_string())
    }
}

impl Drop for RegKey {
    fn drop(&mut self) {
        let _ = unsafe { RegCloseKey(self.0) };
    }
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Unwrap the Win32 code from an HRESULT_FROM_WIN32 value.
fn win32_io_error(err: &windows::core::Error) -> io::Error {
    let code = err.code().0 as u32;
    let raw = if code & 0xFFFF_0000 == 0x8007_0000 {
        code & 0xFFFF
    } else {
        code
    };
    io::Error::from_raw_os_error(raw as i32)
}
