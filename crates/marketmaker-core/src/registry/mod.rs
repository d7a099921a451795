//! Electrum/RPC endpoint registry.
//!
//! Builds a read-only ticker → endpoint-list map from the coins metadata
//! repository. UTXO coins and account-based (ETH-family) coins live under
//! different base URLs and use two response shapes, both normalized into
//! [`EndpointRecord`]s.

mod builder;
#[cfg(test)]
pub mod mock;
mod source;
pub mod types;

pub use builder::{
    fetch_url, FetchFailure, Registry, RegistryBuilder, RegistrySources, ACCOUNT_CHAIN_MARKER,
    DEFAULT_ETH_BASE_URL, DEFAULT_FETCH_CONCURRENCY, DEFAULT_TICKERS, DEFAULT_UTXO_BASE_URL,
};
pub use source::{HttpEndpointSource, DEFAULT_FETCH_TIMEOUT};
pub use types::EndpointRecord;

use async_trait::async_trait;

use crate::error::CoreError;

/// Fetches and JSON-decodes one upstream endpoint document.
#[async_trait]
pub trait EndpointSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<serde_json::Value, CoreError>;
}
