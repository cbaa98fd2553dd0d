pub mod host_info;
