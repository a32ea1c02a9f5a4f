//! Shared HTTP plumbing for the provider adapters
//!
//! Every adapter talks to its upstream through an [`HttpEndpoint`]: a
//! `reqwest` client with the configured timeout, an optional bearer token and
//! a per-endpoint rate limiter. Transport problems come back as
//! [`SourceError::Unavailable`], undecodable bodies as
//! [`SourceError::DataInvalid`].

use crate::config::{MonitorConfig, SourceEndpoint};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use monitor_core::{MonitorError, SourceError};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// A rate-limited JSON endpoint
pub struct HttpEndpoint {
    client: Client,
    endpoint: SourceEndpoint,
    rate_limiter: SharedRateLimiter,
    timeout: Duration,
    name: &'static str,
}

impl HttpEndpoint {
    /// Create a client for `endpoint` using the timeout and rate limit from `config`
    pub fn new(
        name: &'static str,
        endpoint: SourceEndpoint,
        config: &MonitorConfig,
    ) -> monitor_core::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.app.user_agent())
            .build()
            .map_err(|e| MonitorError::ConfigError(format!("failed to build HTTP client: {e}")))?;

        let per_minute = NonZeroU32::new(config.rate_limit_per_minute).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));

        Ok(Self {
            client,
            endpoint,
            rate_limiter,
            timeout: config.request_timeout,
            name,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// GET the endpoint with `query` and decode the JSON body
    ///
    /// The timeout covers waiting on the rate limiter as well as the request.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        match tokio::time::timeout(self.timeout, self.request(query)).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::unavailable(format!(
                "{} timed out after {:?}",
                self.name, self.timeout
            ))),
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        self.rate_limiter.until_ready().await;

        debug!(source = self.name, url = %self.endpoint.url, "requesting upstream");

        let mut request = self.client.get(self.endpoint.url.clone()).query(query);
        if let Some(key) = &self.endpoint.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::unavailable(format!("{} timed out: {e}", self.name))
            } else {
                SourceError::unavailable(format!("{} request failed: {e}", self.name))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::unavailable(format!(
                "{} API error {status}: {}",
                self.name,
                truncate(&body, 200)
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::unavailable(format!("{} body read failed: {e}", self.name)))?;

        serde_json::from_slice(&bytes).map_err(|e| {
            SourceError::invalid(format!("failed to parse {} response: {e}", self.name))
        })
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
