//! Currency reference data and exchange rate abstractions

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub symbol_native: Option<String>,
    pub decimal_digits: u32,
    pub rounding: f64,
    #[serde(default)]
    pub name_plural: Option<String>,
}

/// Currencies keyed by their code.
pub type CurrencyMap = HashMap<String, Currency>;

#[async_trait]
pub trait RateSource: Send + Sync {
    async fn list_currencies(&self) -> Result<CurrencyMap>;

    async fn latest_rate(&self, base: &str, target: &str) -> Result<f64>;

    async fn historical_rate(&self, date: NaiveDate, base: &str, target: &str) -> Result<f64>;

    /// Live busy/idle signal; `true` while a request is in flight.
    fn loading(&self) -> watch::Receiver<bool>;
}

/// Shared busy flag for a rate source.
///
/// `start` returns a guard that keeps the flag raised until it is dropped, so
/// both the success and the error path of a request clear it. Guards are
/// counted: the flag only drops once every overlapping request has finished.
#[derive(Debug)]
pub struct LoadingFlag {
    tx: watch::Sender<bool>,
    in_flight: Mutex<usize>,
}

impl LoadingFlag {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            tx,
            in_flight: Mutex::new(0),
        }
    }

    pub fn start(&self) -> LoadingGuard<'_> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        *in_flight += 1;
        if *in_flight == 1 {
            self.tx.send_replace(true);
        }
        LoadingGuard { flag: self }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        *self.tx.borrow()
    }

    fn finish(&self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        *in_flight = in_flight.saturating_sub(1);
        if *in_flight == 0 {
            self.tx.send_replace(false);
        }
    }
}

impl Default for LoadingFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[must_use = "the loading flag is cleared as soon as the guard is dropped"]
pub struct LoadingGuard<'a> {
    flag: &'a LoadingFlag,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.flag.finish();
    }
}

/// Currencies ordered by code.
pub fn sorted_currencies(currencies: &CurrencyMap) -> Vec<Currency> {
    let mut list: Vec<Currency> = currencies.values().cloned().collect();
    list.sort_by(|a, b| a.code.cmp(&b.code));
    list
}

/// Case-insensitive match on code or name.
pub fn filter_currencies<'a>(currencies: &'a [Currency], query: &str) -> Vec<&'a Currency> {
    let query = query.to_lowercase();
    currencies
        .iter()
        .filter(|c| c.code.to_lowercase().contains(&query) || c.name.to_lowercase().contains(&query))
        .collect()
}

/// Renders `"CODE - Name"`, or the bare code if it is not a known currency.
pub fn display_currency(currencies: &[Currency], code: &str) -> String {
    currencies
        .iter()
        .find(|c| c.code == code)
        .map_or_else(|| code.to_string(), |c| format!("{} - {}", c.code, c.name))
}
