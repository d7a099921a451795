use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde_json::Value;
use tracing::trace;

use crate::error::{CoreError, RegistryError};

use super::EndpointSource;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Fetches endpoint documents over HTTP(S) GET.
///
/// If `requests_per_second` is set, fetches are rate-limited to stay under
/// the upstream host's limits.
pub struct HttpEndpointSource {
    client: reqwest::Client,
    limiter: Option<DirectRateLimiter>,
}

impl HttpEndpointSource {
    pub fn new(timeout: Duration, requests_per_second: Option<u32>) -> Result<Self, CoreError> {
        if timeout.is_zero() {
            return Err(CoreError::Config(
                "endpoint fetch timeout must be greater than zero".to_owned(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Config(format!("build HTTP client: {e}")))?;

        let limiter = match requests_per_second {
            None => None,
            Some(limit) => {
                let limit = NonZeroU32::new(limit).ok_or_else(|| {
                    CoreError::Config("requests_per_second must be at least 1".to_owned())
                })?;
                Some(RateLimiter::direct(Quota::per_second(limit)))
            }
        };

        Ok(Self { client, limiter })
    }
}

#[async_trait]
impl EndpointSource for HttpEndpointSource {
    async fn fetch(&self, url: &str) -> Result<Value, CoreError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(RegistryError::Fetch)?;
        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status {
                status: status.as_u16(),
            }
            .into());
        }

        let body = response.text().await.map_err(RegistryError::Fetch)?;
        trace!(url, body_len = body.len(), "endpoint document received");
        let document = serde_json::from_str(&body).map_err(RegistryError::Decode)?;
        Ok(document)
    }
}
