pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use anyhow::Result;
use disk::DiskStore;
use std::path::PathBuf;

pub use memory::MemoryStore;

/// Directory holding the fjall keyspace below the configured data path.
pub fn catalog_path(config: &AppConfig) -> Result<PathBuf> {
    Ok(config.default_data_path()?.join("catalog"))
}

/// Opens the durable store configured by `config`.
pub fn open_disk_store(config: &AppConfig) -> Result<DiskStore> {
    DiskStore::open(&catalog_path(config)?)
}
