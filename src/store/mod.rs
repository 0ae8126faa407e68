pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use crate::core::storage::KeyValueStorage;
use anyhow::Result;
use disk::DiskStorage;
use memory::MemoryStorage;
use std::sync::Arc;
use tracing::debug;

/// Opens the storage for local state: a disk store under the configured data
/// path, or an in-memory store that is discarded on exit when `ephemeral`.
pub fn open_storage(config: &AppConfig, ephemeral: bool) -> Result<Arc<dyn KeyValueStorage>> {
    if ephemeral {
        debug!("Using in-memory storage");
        return Ok(Arc::new(MemoryStorage::new()));
    }

    let path = config.default_data_path()?;
    Ok(Arc::new(DiskStorage::open(&path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_storage_uses_configured_data_path() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config = AppConfig {
            data_path: Some(temp_dir.path().to_string_lossy().into_owned()),
            ..AppConfig::default()
        };

        let storage = open_storage(&config, false)?;
        storage.set("key", "value")?;
        assert!(temp_dir.path().join("fjall_db").exists());

        Ok(())
    }

    #[test]
    fn test_open_ephemeral_storage() -> Result<()> {
        let storage = open_storage(&AppConfig::default(), true)?;
        assert!(storage.get("key")?.is_none());
        Ok(())
    }
}
