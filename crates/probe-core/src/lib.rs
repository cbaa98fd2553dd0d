pub mod collector;
pub mod config;
pub mod disk;
pub mod document;
pub mod override_table;
pub mod report;
pub mod size;

#[cfg(test)]
mod testing;
