use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::error::CoreError;

use super::types::{parse_endpoints, EndpointRecord};
use super::EndpointSource;

/// Electrum server lists for UTXO coins.
pub const DEFAULT_UTXO_BASE_URL: &str =
    "https://raw.githubusercontent.com/KomodoPlatform/coins/master/electrums/";

/// Node lists for ETH-family coins.
pub const DEFAULT_ETH_BASE_URL: &str =
    "https://raw.githubusercontent.com/KomodoPlatform/coins/master/ethereum/";

/// Tickers containing this marker are fetched from the ETH base URL.
pub const ACCOUNT_CHAIN_MARKER: &str = "ETH";

pub const DEFAULT_TICKERS: &[&str] = &[
    "KMD", "BTC", "LTC", "DOGE", "DASH", "DGB", "RICK", "MORTY", "ETH",
];

pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;

// ==============================================================================
// Sources
// ==============================================================================

/// Static inputs of a registry build.
#[derive(Debug, Clone)]
pub struct RegistrySources {
    pub tickers: Vec<String>,
    pub utxo_base_url: String,
    pub eth_base_url: String,
}

impl Default for RegistrySources {
    fn default() -> Self {
        Self {
            tickers: DEFAULT_TICKERS.iter().map(|t| (*t).to_owned()).collect(),
            utxo_base_url: DEFAULT_UTXO_BASE_URL.to_owned(),
            eth_base_url: DEFAULT_ETH_BASE_URL.to_owned(),
        }
    }
}

/// `{base}{ticker}`, choosing the base by chain family.
pub fn fetch_url(ticker: &str, utxo_base_url: &str, eth_base_url: &str) -> String {
    if ticker.contains(ACCOUNT_CHAIN_MARKER) {
        format!("{eth_base_url}{ticker}")
    } else {
        format!("{utxo_base_url}{ticker}")
    }
}

// ==============================================================================
// Registry
// ==============================================================================

/// A coin whose endpoint list could not be fetched or parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub ticker: String,
    pub url: String,
    pub error: String,
}

/// Read-only ticker → endpoints map, built once at startup.
///
/// Every requested ticker has an entry; tickers whose fetch failed map to
/// an empty list and are also reported in [`Registry::failures`].
#[derive(Debug, Clone, Default)]
pub struct Registry {
    electrums: BTreeMap<String, Vec<EndpointRecord>>,
    failures: Vec<FetchFailure>,
}

impl Registry {
    /// Wrap an already-known ticker → endpoints map.
    pub fn from_electrums(electrums: BTreeMap<String, Vec<EndpointRecord>>) -> Self {
        Self {
            electrums,
            failures: Vec::new(),
        }
    }

    /// Endpoints known for `ticker`, or `None` if it was never requested.
    pub fn endpoints(&self, ticker: &str) -> Option<&[EndpointRecord]> {
        self.electrums.get(ticker).map(Vec::as_slice)
    }

    pub fn electrums(&self) -> &BTreeMap<String, Vec<EndpointRecord>> {
        &self.electrums
    }

    /// Tickers with at least one endpoint, in ticker order.
    pub fn available_coins(&self) -> Vec<&str> {
        self.electrums
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(ticker, _)| ticker.as_str())
            .collect()
    }

    pub fn failures(&self) -> &[FetchFailure] {
        &self.failures
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.electrums.contains_key(ticker)
    }

    pub fn len(&self) -> usize {
        self.electrums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.electrums.is_empty()
    }
}

// ==============================================================================
// Builder
// ==============================================================================

/// Fetches every ticker's endpoint document and assembles a [`Registry`].
///
/// Fetches are independent and run concurrently, at most `concurrency` at a
/// time via a `tokio::sync::Semaphore`. A failed fetch never aborts the
/// build.
pub struct RegistryBuilder {
    source: Arc<dyn EndpointSource>,
    concurrency: usize,
}

impl RegistryBuilder {
    pub fn new(source: Arc<dyn EndpointSource>) -> Self {
        Self {
            source,
            concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }

    /// Cap on in-flight fetches; values below 1 are raised to 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn build_from(&self, sources: &RegistrySources) -> Registry {
        self.build(
            &sources.tickers,
            &sources.utxo_base_url,
            &sources.eth_base_url,
        )
        .await
    }

    pub async fn build(
        &self,
        tickers: &[String],
        utxo_base_url: &str,
        eth_base_url: &str,
    ) -> Registry {
        info!(
            coins = tickers.len(),
            utxo_base_url, eth_base_url, "fetching coin endpoints"
        );
        let semaphore = Semaphore::new(self.concurrency);

        let mut seen = HashSet::with_capacity(tickers.len());
        let unique = tickers.iter().filter(|&ticker| seen.insert(ticker.as_str()));
        let fetches = unique.map(|ticker| {
            let url = fetch_url(ticker, utxo_base_url, eth_base_url);
            let semaphore = &semaphore;
            async move {
                let outcome = self.fetch_one(semaphore, ticker, &url).await;
                (ticker, url, outcome)
            }
        });
        let outcomes = join_all(fetches).await;

        let mut registry = Registry::default();
        for (ticker, url, outcome) in outcomes {
            match outcome {
                Ok(records) => {
                    debug!(
                        ticker = %ticker,
                        url = %url,
                        endpoints = records.len(),
                        "coin endpoints loaded"
                    );
                    registry.electrums.insert(ticker.clone(), records);
                }
                Err(e) => {
                    warn!(ticker = %ticker, url = %url, error = %e, "coin endpoints unavailable");
                    registry.electrums.insert(ticker.clone(), Vec::new());
                    registry.failures.push(FetchFailure {
                        ticker: ticker.clone(),
                        url,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            coins = registry.len(),
            available = registry.available_coins().len(),
            failed = registry.failures.len(),
            "endpoint registry built"
        );
        registry
    }

    async fn fetch_one(
        &self,
        semaphore: &Semaphore,
        ticker: &str,
        url: &str,
    ) -> Result<Vec<EndpointRecord>, CoreError> {
        let _permit = semaphore
            .acquire()
            .await
            .expect("semaphore is never closed");
        debug!(ticker, url, "fetching coin endpoints");

        let body = self.source.fetch(url).await?;
        Ok(parse_endpoints(ticker, body)?)
    }
}
