//! Marketmaker node RPC access layer.
//!
//! Defines the [`RpcTransport`] seam, the generic [`MmProxy`] that turns any
//! method name plus keyword parameters into a framed request, and an HTTP
//! transport ([`HttpTransport`]) plus a test mock (`mock::MockTransport`).

mod http_adapter;
mod ids;
#[cfg(test)]
pub mod mock;
pub mod protocol;
mod proxy;

pub use http_adapter::HttpTransport;
pub use ids::RequestIdAllocator;
pub use protocol::{Params, RpcResponse};
pub use proxy::{
    MmProxy, ProxyConfig, DEFAULT_RPC_HOST, DEFAULT_RPC_PORT, DEFAULT_RPC_TIMEOUT, DEFAULT_USERPASS,
};

use async_trait::async_trait;

use crate::error::CoreError;

/// Delivers a serialized request body to the node and returns the raw
/// response body.
///
/// Implementations make a single attempt and surface network failures as
/// [`RpcError::Transport`](crate::error::RpcError::Transport); retry policy
/// belongs to callers.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn post(&self, body: String) -> Result<String, CoreError>;
}
