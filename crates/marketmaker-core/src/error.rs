#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("RPC communication failure: {0}")]
    Rpc(#[from] RpcError),

    #[error("endpoint registry failure: {0}")]
    Registry(#[from] RegistryError),

    #[error("coin `{0}` has no entry in the endpoint registry")]
    UnknownCoin(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Failures raised while framing, sending, or interpreting a node call.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("method name must not be empty")]
    EmptyMethod,

    #[error("batch descriptor `{label}` is malformed: {reason}")]
    MalformedDescriptor { label: String, reason: String },

    #[error("encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("`{method}` response has no `result` field: {detail}")]
    MissingResult { method: String, detail: String },
}

/// Failures raised while fetching one coin's endpoint list.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("fetch failed: {0}")]
    Fetch(#[source] reqwest::Error),

    #[error("upstream returned HTTP {status}")]
    Status { status: u16 },

    #[error("upstream body is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("upstream JSON is neither an `rpc_nodes` object nor an endpoint array")]
    UnexpectedShape,
}
