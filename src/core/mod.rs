//! Core business logic abstractions

pub mod amount;
pub mod config;
pub mod currency;
pub mod form;
pub mod history;
pub mod log;
pub mod storage;

// Re-export main types for cleaner imports
pub use currency::{Currency, CurrencyMap, RateSource};
pub use form::{Conversion, ConversionForm, FormState};
pub use history::{ConversionRecord, HistoryStore, NewConversion};
pub use storage::KeyValueStorage;
