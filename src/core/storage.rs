//! Key-value persistence abstraction for local state

use anyhow::Result;

/// String key-value storage. Writes complete before the call returns.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}
