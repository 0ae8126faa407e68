//! Persisted log of completed conversions, newest first.

use crate::core::storage::KeyValueStorage;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, error};

pub const HISTORY_KEY: &str = "conversion_history";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRecord {
    pub id: String,
    pub from_currency: String,
    pub to_currency: String,
    pub from_amount: f64,
    pub to_amount: f64,
    pub rate: f64,
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
}

/// A conversion that has not been recorded yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewConversion {
    pub from_currency: String,
    pub to_currency: String,
    pub from_amount: f64,
    pub to_amount: f64,
    pub rate: f64,
    pub date: NaiveDate,
}

impl NewConversion {
    fn into_record(self, id: String, timestamp: DateTime<Utc>) -> ConversionRecord {
        ConversionRecord {
            id,
            from_currency: self.from_currency,
            to_currency: self.to_currency,
            from_amount: self.from_amount,
            to_amount: self.to_amount,
            rate: self.rate,
            date: self.date,
            timestamp,
        }
    }
}

/// Write-through history store.
///
/// Every mutation persists the full list before subscribers are notified; if
/// the write fails the in-memory list is left as it was. Mutations are
/// serialized so concurrent appends never persist a stale list.
pub struct HistoryStore {
    storage: Arc<dyn KeyValueStorage>,
    tx: watch::Sender<Vec<ConversionRecord>>,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn open(storage: Arc<dyn KeyValueStorage>) -> Self {
        let records = load(storage.as_ref());
        debug!(count = records.len(), "Loaded conversion history");
        let (tx, _) = watch::channel(records);
        Self {
            storage,
            tx,
            write_lock: Mutex::new(()),
        }
    }

    /// Live view of the full record list. The current list is visible
    /// immediately through `borrow()`.
    pub fn subscribe(&self) -> watch::Receiver<Vec<ConversionRecord>> {
        self.tx.subscribe()
    }

    pub fn records(&self) -> Vec<ConversionRecord> {
        self.tx.borrow().clone()
    }

    pub fn append(&self, conversion: NewConversion) -> Result<ConversionRecord> {
        let now = Utc::now();
        let record = conversion.into_record(generate_id(now), now);

        let _write = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut updated = Vec::with_capacity(self.tx.borrow().len() + 1);
        updated.push(record.clone());
        updated.extend(self.tx.borrow().iter().cloned());

        let serialized =
            serde_json::to_string(&updated).context("Failed to serialize conversion history")?;
        self.storage
            .set(HISTORY_KEY, &serialized)
            .context("Failed to persist conversion history")?;

        debug!(id = %record.id, count = updated.len(), "Appended conversion");
        self.tx.send_replace(updated);
        Ok(record)
    }

    pub fn clear(&self) -> Result<()> {
        let _write = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.storage
            .remove(HISTORY_KEY)
            .context("Failed to remove conversion history")?;
        debug!("Cleared conversion history");
        self.tx.send_replace(Vec::new());
        Ok(())
    }
}

fn load(storage: &dyn KeyValueStorage) -> Vec<ConversionRecord> {
    let stored = match storage.get(HISTORY_KEY) {
        Ok(Some(stored)) => stored,
        Ok(None) => return Vec::new(),
        Err(e) => {
            error!(error = ?e, "Failed to read conversion history");
            return Vec::new();
        }
    };

    match serde_json::from_str(&stored) {
        Ok(records) => records,
        Err(e) => {
            error!(error = ?e, "Failed to parse conversion history");
            Vec::new()
        }
    }
}

/// Millisecond clock in base 36 followed by random base-36 characters, the
/// same shape as ids already written by earlier clients of this history key.
/// Collisions are unlikely but possible.
fn generate_id(now: DateTime<Utc>) -> String {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or_default();
    let random = uuid::Uuid::new_v4().as_u128() as u64;
    let mut id = to_base36(millis);
    id.push_str(&to_base36(random));
    id
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
