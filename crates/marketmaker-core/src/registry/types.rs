//! Endpoint records and the upstream document shapes they are parsed from.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::RegistryError;

/// Protocol assigned to endpoints that do not declare one.
pub const DEFAULT_PROTOCOL: &str = "TCP";

/// Personal contact details published alongside some servers. Never kept.
const CONTACT_FIELD: &str = "contact";

// ==============================================================================
// Endpoint Record
// ==============================================================================

/// One server usable to reach a coin's network.
///
/// `protocol` is always present after normalization. An upstream value is
/// kept exactly as published, whatever its type. Any other upstream fields
/// (e.g. `ws_url`, `disable_cert_verification`) are carried in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub url: String,
    pub protocol: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EndpointRecord {
    /// The protocol as a string, when upstream published one.
    pub fn protocol_str(&self) -> Option<&str> {
        self.protocol.as_str()
    }
}

// ==============================================================================
// Upstream Shapes
// ==============================================================================

/// UTXO documents wrap their servers in `rpc_nodes`; ETH-family documents
/// are a bare array. The wrapped form is tried first.
#[derive(Deserialize)]
#[serde(untagged)]
enum UpstreamEndpoints {
    Wrapped { rpc_nodes: Vec<Value> },
    Bare(Vec<Value>),
}

/// Parse and normalize one upstream document for `ticker`.
///
/// Entries that are not objects or lack a string `url` are skipped with a
/// warning rather than failing the whole coin.
pub fn parse_endpoints(ticker: &str, body: Value) -> Result<Vec<EndpointRecord>, RegistryError> {
    let entries = match serde_json::from_value::<UpstreamEndpoints>(body) {
        Ok(UpstreamEndpoints::Wrapped { rpc_nodes }) => rpc_nodes,
        Ok(UpstreamEndpoints::Bare(entries)) => entries,
        Err(_) => return Err(RegistryError::UnexpectedShape),
    };

    let mut records = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let Value::Object(entry) = entry else {
            warn!(ticker, index, "skipping endpoint entry that is not an object");
            continue;
        };
        match normalize_endpoint(entry) {
            Some(record) => records.push(record),
            None => warn!(ticker, index, "skipping endpoint entry without a string `url`"),
        }
    }
    Ok(records)
}

/// Default a missing `protocol` to TCP and drop `contact`.
fn normalize_endpoint(mut entry: Map<String, Value>) -> Option<EndpointRecord> {
    entry
        .entry("protocol")
        .or_insert_with(|| Value::from(DEFAULT_PROTOCOL));
    entry.remove(CONTACT_FIELD);

    let url = match entry.remove("url") {
        Some(Value::String(url)) => url,
        _ => return None,
    };
    let protocol = entry.remove("protocol").unwrap_or(Value::Null);

    Some(EndpointRecord {
        url,
        protocol,
        extra: entry,
    })
}
