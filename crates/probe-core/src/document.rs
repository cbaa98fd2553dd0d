//! The node attribute document and its JSON shape.
//!
//! ```json
//! {
//!   "OS": [{"OperatingSystem": "...", "Release": "...", "Version": "..."}],
//!   "CPU": [{"PhysicalCores": 2, "TotalCores": 4}],
//!   "MEMORY": [{"VIRTUAL_MEMORY": {...}}, {"SWAP_MEMORY": {...}}],
//!   "DISK_PARTITIONS": [{"/dev/sda1": {"MountPoint": "/", ...}}]
//! }
//! ```

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OsEntry {
    pub operating_system: String,
    pub release: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CpuEntry {
    /// Serialized as `null` when the platform cannot report it
    pub physical_cores: Option<u32>,
    pub total_cores: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VirtualMemoryEntry {
    pub total: String,
    pub available: String,
    pub used: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SwapMemoryEntry {
    pub total: String,
    pub free: String,
    pub used: String,
    pub percentage: f64,
}

/// Virtual memory followed by swap. Serializes as a two-element list.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryEntry {
    pub virtual_memory: VirtualMemoryEntry,
    pub swap_memory: SwapMemoryEntry,
}

impl Serialize for MemoryEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(&Keyed("VIRTUAL_MEMORY", &self.virtual_memory))?;
        seq.serialize_element(&Keyed("SWAP_MEMORY", &self.swap_memory))?;
        seq.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PartitionDetails {
    pub mount_point: String,
    pub total_size: String,
    pub used: String,
    pub free: String,
    pub percentage: f64,
}

/// One partition, keyed by its device identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionEntry {
    pub device: String,
    pub details: PartitionDetails,
}

impl Serialize for PartitionEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Keyed(&self.device, &self.details).serialize(serializer)
    }
}

/// A complete snapshot of one node. Fields are only readable once assembled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    #[serde(rename = "OS", serialize_with = "single_entry")]
    os: OsEntry,
    #[serde(rename = "CPU", serialize_with = "single_entry")]
    cpu: CpuEntry,
    #[serde(rename = "MEMORY")]
    memory: MemoryEntry,
    #[serde(rename = "DISK_PARTITIONS")]
    disk_partitions: Vec<PartitionEntry>,
}

impl Document {
    pub fn new(
        os: OsEntry,
        cpu: CpuEntry,
        memory: MemoryEntry,
        disk_partitions: Vec<PartitionEntry>,
    ) -> Self {
        Self {
            os,
            cpu,
            memory,
            disk_partitions,
        }
    }

    pub fn os(&self) -> &OsEntry {
        &self.os
    }

    pub fn cpu(&self) -> &CpuEntry {
        &self.cpu
    }

    pub fn memory(&self) -> &MemoryEntry {
        &self.memory
    }

    pub fn disk_partitions(&self) -> &[PartitionEntry] {
        &self.disk_partitions
    }
}

struct Keyed<'a, T>(&'a str, &'a T);

impl<T: Serialize> Serialize for Keyed<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.0, self.1)?;
        map.end()
    }
}

fn single_entry<T: Serialize, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    std::slice::from_ref(value).serialize(serializer)
}
