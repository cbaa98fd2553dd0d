use std::collections::{HashMap, HashSet};

use probe_platform::host_info::{usage_percent, Partition, PlatformError, SwapMemory, VirtualMemory};

/// Values from `/proc/meminfo`, in bytes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemInfo {
    pub total: u64,
    pub free: u64,
    pub available: Option<u64>,
    pub buffers: u64,
    pub cached: u64,
    pub sreclaimable: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

pub fn parse_meminfo(content: &str) -> Result<MemInfo, PlatformError> {
    let mut info = MemInfo::default();
    let mut saw_total = false;

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }
        let kb: u64 = match parts[1].parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        let bytes = kb * 1024;

        match parts[0] {
            "MemTotal:" => {
                info.total = bytes;
                saw_total = true;
            }
            "MemFree:" => info.free = bytes,
            "MemAvailable:" => info.available = Some(bytes),
            "Buffers:" => info.buffers = bytes,
            "Cached:" => info.cached = bytes,
            "SReclaimable:" => info.sreclaimable = bytes,
            "SwapTotal:" => info.swap_total = bytes,
            "SwapFree:" => info.swap_free = bytes,
            _ => {}
        }
    }

    if !saw_total {
        return Err(PlatformError::Parse {
            what: "/proc/meminfo",
            detail: "no MemTotal line".to_string(),
        });
    }
    Ok(info)
}

impl MemInfo {
    pub fn virtual_memory(&self) -> VirtualMemory {
        // reclaimable slab counts as cache, as in free(1)
        let cached = self.cached + self.sreclaimable;
        let available = self
            .available
            .unwrap_or(self.free + self.buffers + cached)
            .min(self.total);

        let used = self
            .total
            .checked_sub(self.free + self.buffers + cached)
            .unwrap_or_else(|| self.total.saturating_sub(self.free));

        VirtualMemory {
            total_bytes: self.total,
            available_bytes: available,
            used_bytes: used,
            percent: usage_percent(self.total - available, self.total),
        }
    }

    pub fn swap_memory(&self) -> SwapMemory {
        let free = self.swap_free.min(self.swap_total);
        let used = self.swap_total - free;
        SwapMemory {
            total_bytes: self.swap_total,
            free_bytes: free,
            used_bytes: used,
            percent: usage_percent(used, self.swap_total),
        }
    }
}

/// Filesystem types backed by a block device, from `/proc/filesystems`.
pub fn parse_filesystems(content: &str) -> HashSet<String> {
    let mut fstypes: HashSet<String> = content
        .lines()
        .filter(|line| !line.starts_with("nodev"))
        .map(|line| line.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    // zfs registers itself as nodev but is a real disk filesystem
    fstypes.insert("zfs".to_string());
    fstypes
}

/// Physical partitions from a `/proc/self/mounts` listing, in mount order.
pub fn parse_mounts(content: &str, physical: &HashSet<String>) -> Vec<Partition> {
    content
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let device = parts.next()?;
            let mount_point = parts.next()?;
            let fstype = parts.next()?;
            if device == "none" || !physical.contains(fstype) {
                return None;
            }
            Some(Partition {
                device: unescape_mount_field(device),
                mount_point: unescape_mount_field(mount_point),
            })
        })
        .collect()
}

/// Undo the kernel's octal escaping of whitespace and backslashes (`\040` etc.).
pub fn unescape_mount_field(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && is_octal_escape(&bytes[i + 1..i + 4]) {
            let code = (bytes[i + 1] - b'0') * 64 + (bytes[i + 2] - b'0') * 8 + (bytes[i + 3] - b'0');
            out.push(code);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn is_octal_escape(digits: &[u8]) -> bool {
    digits.len() == 3
        && matches!(digits[0], b'0'..=b'3')
        && digits[1..].iter().all(|d| matches!(d, b'0'..=b'7'))
}

/// Physical core count from `/proc/cpuinfo`: the sum of `cpu cores` over
/// distinct `physical id`s. `None` when the file carries neither field.
pub fn parse_cpuinfo_cores(content: &str) -> Option<u32> {
    let mut sockets: HashMap<u32, u32> = HashMap::new();
    let mut physical_id: Option<u32> = None;
    let mut cpu_cores: Option<u32> = None;

    let mut flush = |physical_id: &mut Option<u32>, cpu_cores: &mut Option<u32>| {
        if let (Some(id), Some(cores)) = (physical_id.take(), cpu_cores.take()) {
            sockets.insert(id, cores);
        }
    };

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            flush(&mut physical_id, &mut cpu_cores);
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim() {
            "physical id" => physical_id = value.trim().parse().ok(),
            "cpu cores" => cpu_cores = value.trim().parse().ok(),
            _ => {}
        }
    }
    flush(&mut physical_id, &mut cpu_cores);

    let total: u32 = sockets.values().sum();
    (total > 0).then_some(total)
}
