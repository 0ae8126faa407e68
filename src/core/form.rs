//! Conversion form controller
//!
//! Holds the user's selections, runs conversions through a [`RateSource`]
//! and records every successful conversion in the [`HistoryStore`].

use crate::core::config::FormDefaults;
use crate::core::currency::RateSource;
use crate::core::history::{ConversionRecord, HistoryStore, NewConversion};
use anyhow::{Result, bail};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, error, warn};

pub const MIN_AMOUNT: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Idle,
    Converting,
}

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub converted_amount: f64,
    pub exchange_rate: f64,
    /// `None` when the history write failed; the result is still valid.
    pub record: Option<ConversionRecord>,
}

pub struct ConversionForm {
    rates: Arc<dyn RateSource>,
    history: Arc<HistoryStore>,
    from_currency: String,
    to_currency: String,
    amount: f64,
    date: Option<NaiveDate>,
    converted_amount: Option<f64>,
    exchange_rate: Option<f64>,
}

impl ConversionForm {
    pub fn new(
        rates: Arc<dyn RateSource>,
        history: Arc<HistoryStore>,
        defaults: &FormDefaults,
    ) -> Self {
        Self {
            rates,
            history,
            from_currency: defaults.from.clone(),
            to_currency: defaults.to.clone(),
            amount: defaults.amount,
            date: None,
            converted_amount: None,
            exchange_rate: None,
        }
    }

    pub fn state(&self) -> FormState {
        if *self.rates.loading().borrow() {
            FormState::Converting
        } else {
            FormState::Idle
        }
    }

    pub fn from_currency(&self) -> &str {
        &self.from_currency
    }

    pub fn to_currency(&self) -> &str {
        &self.to_currency
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn converted_amount(&self) -> Option<f64> {
        self.converted_amount
    }

    pub fn exchange_rate(&self) -> Option<f64> {
        self.exchange_rate
    }

    pub fn select_from(&mut self, code: &str) {
        self.from_currency = code.trim().to_uppercase();
    }

    pub fn select_to(&mut self, code: &str) {
        self.to_currency = code.trim().to_uppercase();
    }

    pub fn set_amount(&mut self, amount: f64) {
        self.amount = amount;
    }

    pub fn set_date(&mut self, date: Option<NaiveDate>) {
        self.date = date;
    }

    /// Checks the fields that must hold before a conversion is submitted.
    pub fn validate(&self) -> Result<()> {
        if self.from_currency.is_empty() {
            bail!("Source currency is required");
        }
        if self.to_currency.is_empty() {
            bail!("Target currency is required");
        }
        if !self.amount.is_finite() || self.amount < MIN_AMOUNT {
            bail!("Amount must be at least {MIN_AMOUNT}");
        }
        if let Some(date) = self.date {
            let today = Utc::now().date_naive();
            if date > today {
                bail!("Date {date} is in the future");
            }
        }
        Ok(())
    }

    /// Submits the form.
    ///
    /// Uses the historical rate for the selected date, or the latest rate
    /// when no date is set. On failure the displayed result is cleared and
    /// the rest of the form is left unchanged.
    pub async fn convert(&mut self) -> Result<Conversion> {
        self.validate()?;

        let from = self.from_currency.clone();
        let to = self.to_currency.clone();
        let amount = self.amount;

        let rate = match self.date {
            Some(date) => self.rates.historical_rate(date, &from, &to).await,
            None => self.rates.latest_rate(&from, &to).await,
        };

        let rate = match rate {
            Ok(rate) => rate,
            Err(e) => {
                error!(error = ?e, %from, %to, "Conversion failed");
                self.converted_amount = None;
                self.exchange_rate = None;
                return Err(e);
            }
        };

        let converted_amount = amount * rate;
        self.exchange_rate = Some(rate);
        self.converted_amount = Some(converted_amount);
        debug!(%from, %to, amount, rate, converted_amount, "Converted");

        let date = self.date.unwrap_or_else(|| Utc::now().date_naive());
        let record = match self.history.append(NewConversion {
            from_currency: from,
            to_currency: to,
            from_amount: amount,
            to_amount: converted_amount,
            rate,
            date,
        }) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = ?e, "Failed to save conversion to history");
                None
            }
        };

        Ok(Conversion {
            converted_amount,
            exchange_rate: rate,
            record,
        })
    }

    /// Exchanges source and target. If a result is displayed, the conversion
    /// is run again for the swapped pair and its outcome returned.
    pub async fn swap(&mut self) -> Option<Result<Conversion>> {
        std::mem::swap(&mut self.from_currency, &mut self.to_currency);
        debug!(from = %self.from_currency, to = %self.to_currency, "Swapped currencies");

        if self.converted_amount.is_some() {
            Some(self.convert().await)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::{CurrencyMap, LoadingFlag};
    use crate::store::memory::MemoryStorage;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::watch;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Latest(String, String),
        Historical(NaiveDate, String, String),
    }

    struct MockRateSource {
        rate: Option<f64>,
        calls: Mutex<Vec<Call>>,
        loading: LoadingFlag,
    }

    impl MockRateSource {
        fn new(rate: Option<f64>) -> Arc<Self> {
            Arc::new(Self {
                rate,
                calls: Mutex::new(Vec::new()),
                loading: LoadingFlag::new(),
            })
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn respond(&self, call: Call) -> Result<f64> {
            self.calls.lock().unwrap().push(call);
            self.rate.ok_or_else(|| anyhow!("Request error: connection refused"))
        }
    }

    #[async_trait]
    impl RateSource for MockRateSource {
        async fn list_currencies(&self) -> Result<CurrencyMap> {
            Ok(CurrencyMap::new())
        }

        async fn latest_rate(&self, base: &str, target: &str) -> Result<f64> {
            self.respond(Call::Latest(base.to_string(), target.to_string()))
        }

        async fn historical_rate(&self, date: NaiveDate, base: &str, target: &str) -> Result<f64> {
            self.respond(Call::Historical(date, base.to_string(), target.to_string()))
        }

        fn loading(&self) -> watch::Receiver<bool> {
            self.loading.subscribe()
        }
    }

    fn form(rates: Arc<MockRateSource>) -> (ConversionForm, Arc<HistoryStore>) {
        let history = Arc::new(HistoryStore::open(Arc::new(MemoryStorage::new())));
        let form = ConversionForm::new(rates, history.clone(), &FormDefaults::default());
        (form, history)
    }

    #[tokio::test]
    async fn test_convert_latest() {
        let rates = MockRateSource::new(Some(1.1));
        let (mut form, history) = form(rates.clone());

        let result = form.convert().await.unwrap();

        assert_eq!(result.converted_amount, 100.0 * 1.1);
        assert_eq!(result.exchange_rate, 1.1);
        assert_eq!(form.converted_amount(), Some(100.0 * 1.1));
        assert_eq!(form.exchange_rate(), Some(1.1));
        assert_eq!(
            rates.calls(),
            vec![Call::Latest("USD".to_string(), "EUR".to_string())]
        );

        let records = history.records();
        assert_eq!(records.len(), 1);
        assert_eq!(Some(&records[0]), result.record.as_ref());
        assert_eq!(records[0].date, Utc::now().date_naive());
        assert_eq!(records[0].from_amount, 100.0);
    }

    #[tokio::test]
    async fn test_convert_historical_uses_request_date() {
        let rates = MockRateSource::new(Some(0.5));
        let (mut form, history) = form(rates.clone());
        let date = NaiveDate::from_ymd_opt(2020, 6, 1).unwrap();
        form.set_date(Some(date));
        form.set_amount(40.0);

        let result = form.convert().await.unwrap();

        assert_eq!(result.converted_amount, 20.0);
        assert_eq!(
            rates.calls(),
            vec![Call::Historical(date, "USD".to_string(), "EUR".to_string())]
        );
        assert_eq!(history.records()[0].date, date);
    }

    #[tokio::test]
    async fn test_failed_conversion_clears_result() {
        let rates = MockRateSource::new(Some(2.0));
        let (mut form, history) = form(rates);
        form.convert().await.unwrap();

        // Swap in a failing source while keeping the displayed result
        let failing: Arc<dyn RateSource> = MockRateSource::new(None);
        form.rates = failing;
        form.select_to("GBP");

        assert!(form.convert().await.is_err());
        assert_eq!(form.converted_amount(), None);
        assert_eq!(form.exchange_rate(), None);
        assert_eq!(form.from_currency(), "USD");
        assert_eq!(form.to_currency(), "GBP");
        assert_eq!(form.amount(), 100.0);
        assert_eq!(history.records().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_form_blocks_submission() {
        let rates = MockRateSource::new(Some(1.0));
        let (mut form, history) = form(rates.clone());

        form.set_amount(0.0);
        assert!(form.convert().await.is_err());

        form.set_amount(10.0);
        form.set_date(Some(Utc::now().date_naive() + chrono::Duration::days(2)));
        assert!(form.convert().await.is_err());

        form.set_date(None);
        form.select_from("");
        assert!(form.convert().await.is_err());

        assert!(rates.calls().is_empty());
        assert!(history.records().is_empty());
    }

    #[tokio::test]
    async fn test_swap_with_result_reconverts() {
        let rates = MockRateSource::new(Some(1.25));
        let (mut form, history) = form(rates.clone());
        form.convert().await.unwrap();

        let swapped = form.swap().await.expect("swap should re-convert");
        assert!(swapped.is_ok());

        assert_eq!(form.from_currency(), "EUR");
        assert_eq!(form.to_currency(), "USD");
        assert_eq!(
            rates.calls(),
            vec![
                Call::Latest("USD".to_string(), "EUR".to_string()),
                Call::Latest("EUR".to_string(), "USD".to_string()),
            ]
        );
        assert_eq!(history.records().len(), 2);
        assert_eq!(history.records()[0].from_currency, "EUR");
    }

    #[tokio::test]
    async fn test_swap_without_result_only_swaps() {
        let rates = MockRateSource::new(Some(1.25));
        let (mut form, _) = form(rates.clone());

        assert!(form.swap().await.is_none());
        assert_eq!(form.from_currency(), "EUR");
        assert_eq!(form.to_currency(), "USD");
        assert!(rates.calls().is_empty());
    }

    #[tokio::test]
    async fn test_state_follows_loading_flag() {
        let rates = MockRateSource::new(Some(1.0));
        let (form, _) = form(rates.clone());

        assert_eq!(form.state(), FormState::Idle);
        let guard = rates.loading.start();
        assert_eq!(form.state(), FormState::Converting);
        drop(guard);
        assert_eq!(form.state(), FormState::Idle);
    }

    #[test]
    fn test_select_normalizes_codes() {
        let (mut form, _) = form(MockRateSource::new(None));
        form.select_from(" gbp ");
        assert_eq!(form.from_currency(), "GBP");
    }
}
