// Linux platform implementations

#[cfg(target_os = "linux")]
pub mod host_info;

#[cfg(target_os = "linux")]
mod procfs;
