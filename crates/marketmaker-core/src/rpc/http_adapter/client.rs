use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use tracing::{debug, trace};

use crate::error::{CoreError, RpcError};

use super::super::proxy::ProxyConfig;
use super::super::RpcTransport;
use super::connection::rpc_url;

/// Upper bound on TCP connect time, applied below the request timeout.
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// `reqwest`-backed transport posting request bodies to the node.
///
/// Exactly one HTTP attempt is made per call. HTTP error statuses are not
/// treated as failures: the node reports errors in the body, which is
/// returned to the caller untouched.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(host: &str, port: u16, timeout: Duration) -> Result<Self, CoreError> {
        if timeout.is_zero() {
            return Err(CoreError::Config(
                "rpc request timeout must be greater than zero".to_owned(),
            ));
        }
        let url = rpc_url(host, port)?;

        let client = reqwest::Client::builder()
            .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
            .timeout(timeout)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| CoreError::Config(format!("build HTTP client: {e}")))?;

        Ok(Self { client, url })
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self, CoreError> {
        Self::new(&config.host, config.port, config.timeout)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn post(&self, body: String) -> Result<String, CoreError> {
        let response = self
            .client
            .post(&self.url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(RpcError::Transport)?;
        let status = response.status();

        let body = response.text().await.map_err(RpcError::Transport)?;
        debug!(url = %self.url, %status, body_len = body.len(), "rpc http response");
        trace!(url = %self.url, body = %body, "rpc http response body");

        Ok(body)
    }
}
