use crate::core::storage::KeyValueStorage;
use anyhow::{Context, Result};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use std::path::Path;
use tracing::debug;

const PARTITION: &str = "local_state";

/// Persistent storage backed by a fjall keyspace partition.
pub struct DiskStorage {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskStorage {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;

        let keyspace = Config::new(path.join("fjall_db"))
            .open()
            .with_context(|| format!("Failed to open keyspace at {}", path.display()))?;
        let partition = keyspace
            .open_partition(PARTITION, PartitionCreateOptions::default())
            .context("Failed to open storage partition")?;
        debug!(path = %path.display(), "Opened disk storage");

        Ok(Self {
            keyspace,
            partition,
        })
    }

    fn flush(&self) -> Result<()> {
        self.keyspace
            .persist(fjall::PersistMode::SyncAll)
            .context("Failed to flush storage to disk")
    }
}

impl KeyValueStorage for DiskStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .partition
            .get(key.as_bytes())
            .with_context(|| format!("Failed to read key '{key}'"))?;
        debug!(key, found = value.is_some(), "Storage GET");
        value
            .map(|bytes| String::from_utf8(bytes.to_vec()).context("Stored value is not UTF-8"))
            .transpose()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.partition
            .insert(key.as_bytes(), value.as_bytes())
            .with_context(|| format!("Failed to write key '{key}'"))?;
        debug!(key, bytes = value.len(), "Storage SET");
        self.flush()
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.partition
            .remove(key.as_bytes())
            .with_context(|| format!("Failed to remove key '{key}'"))?;
        debug!(key, "Storage REMOVE");
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_disk_storage_get_set_remove() {
        let dir = tempdir().unwrap();
        let storage = DiskStorage::open(dir.path()).unwrap();

        assert!(storage.get("key1").unwrap().is_none());

        storage.set("key1", "[1,2,3]").unwrap();
        assert_eq!(storage.get("key1").unwrap().as_deref(), Some("[1,2,3]"));

        storage.remove("key1").unwrap();
        assert!(storage.get("key1").unwrap().is_none());
    }

    #[test]
    fn test_disk_storage_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let storage = DiskStorage::open(dir.path()).unwrap();
            storage.set("key1", "persisted").unwrap();
        }

        let storage = DiskStorage::open(dir.path()).unwrap();
        assert_eq!(storage.get("key1").unwrap().as_deref(), Some("persisted"));
    }
}
