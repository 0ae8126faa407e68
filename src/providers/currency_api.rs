use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tokio::sync::{OnceCell, watch};
use tracing::{debug, instrument};

use crate::core::currency::{CurrencyMap, LoadingFlag, RateSource};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    data: T,
}

type LatestRates = HashMap<String, f64>;
type HistoricalRates = HashMap<String, HashMap<String, f64>>;

/// HTTP client for the currency API.
///
/// The currency list is fetched once and kept for the lifetime of the client;
/// a failed fetch is retried on the next call. Rates are always fetched.
pub struct CurrencyApiClient {
    base_url: String,
    client: reqwest::Client,
    currencies: OnceCell<CurrencyMap>,
    loading: LoadingFlag,
}

impl CurrencyApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fxconv/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(CurrencyApiClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            currencies: OnceCell::new(),
            loading: LoadingFlag::new(),
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(%url, ?query, "Requesting currency API");

        let _busy = self.loading.start();
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} URL: {}", e, url))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} URL: {}", response.status(), url));
        }

        let text = response
            .text()
            .await
            .context("Failed to get response text")?;
        let body: ApiResponse<T> = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response from {}: {}", url, e))?;
        Ok(body.data)
    }
}

#[async_trait]
impl RateSource for CurrencyApiClient {
    #[instrument(name = "CurrencyListFetch", skip(self))]
    async fn list_currencies(&self) -> Result<CurrencyMap> {
        if let Some(cached) = self.currencies.get() {
            debug!(count = cached.len(), "Currency list cache HIT");
            return Ok(cached.clone());
        }

        let currencies = self
            .currencies
            .get_or_try_init(|| async {
                let currencies: CurrencyMap = self.fetch("/currencies", &[]).await?;
                debug!(count = currencies.len(), "Fetched currency list");
                Ok::<_, anyhow::Error>(currencies)
            })
            .await?;
        Ok(currencies.clone())
    }

    #[instrument(name = "LatestRateFetch", skip(self))]
    async fn latest_rate(&self, base: &str, target: &str) -> Result<f64> {
        let rates: LatestRates = self
            .fetch(
                "/latest",
                &[("base_currency", base), ("currencies", target)],
            )
            .await?;

        rates
            .get(target)
            .copied()
            .ok_or_else(|| anyhow!("No rate found for currency pair: {}{}", base, target))
    }

    #[instrument(name = "HistoricalRateFetch", skip(self))]
    async fn historical_rate(&self, date: NaiveDate, base: &str, target: &str) -> Result<f64> {
        let date = date.format(DATE_FORMAT).to_string();
        let rates: HistoricalRates = self
            .fetch(
                "/historical",
                &[
                    ("date", date.as_str()),
                    ("base_currency", base),
                    ("currencies", target),
                ],
            )
            .await?;

        rates
            .get(&date)
            .and_then(|day| day.get(target))
            .copied()
            .ok_or_else(|| {
                anyhow!(
                    "No rate found for currency pair: {}{} on {}",
                    base,
                    target,
                    date
                )
            })
    }

    fn loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }
}
