// Windows platform implementations

#[cfg(target_os = "windows")]
pub mod host_info;
