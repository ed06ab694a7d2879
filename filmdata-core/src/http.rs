//! Retrying HTTP client for the upstream data APIs
//!
//! Every upstream (GeoNames, TMDB, World Bank) is a plain JSON-over-GET API.
//! The client is split in two:
//! - a `Transport` that performs exactly one GET attempt
//! - an `HttpClient` that wraps a transport with a fixed-delay `RetryPolicy`
//!
//! Fetchers only ever see `HttpClient`; tests swap the transport.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;

use crate::config::HttpConfig;

// ============================================================================
// Error types
// ============================================================================

/// Transport-level failures. All of them are soft for the pipeline: the
/// calling fetcher logs and returns an empty or partial result.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned status {code} for {url}")]
    Status { code: u16, url: String },

    #[error("Invalid JSON from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("All {attempts} attempts failed for {url}: {last_error}")]
    RetryExhausted {
        attempts: usize,
        url: String,
        last_error: String,
    },

    #[error("Missing API key")]
    MissingApiKey,
}

// ============================================================================
// Transport
// ============================================================================

/// A single GET attempt returning a parsed JSON body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<Value, FetchError>;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(config.relaxed_tls)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<Value, FetchError> {
        let response = self.client.get(url).timeout(timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                code: status.as_u16(),
                url: redact(url),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
            url: redact(url),
            message: e.to_string(),
        })
    }
}

// ============================================================================
// Retry policy + client
// ============================================================================

/// Fixed-delay retry: `max_attempts` tries in total, `delay` between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl From<&HttpConfig> for RetryPolicy {
    fn from(config: &HttpConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.retry_delay_ms),
        )
    }
}

#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    timeout: Duration,
}

impl HttpClient {
    /// Build the production client from config.
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::with_transport(
            Arc::new(transport),
            RetryPolicy::from(config),
            Duration::from_secs(config.timeout_secs),
        ))
    }

    pub fn with_transport(
        transport: Arc<dyn Transport>,
        policy: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            policy,
            timeout,
        }
    }

    /// GET with the configured timeout and attempt count.
    pub async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        self.get(url, self.timeout, self.policy.max_attempts).await
    }

    /// GET `url`, trying up to `max_attempts` times with the policy's fixed
    /// delay in between. Only fails once every attempt has failed.
    pub async fn get(
        &self,
        url: &str,
        timeout: Duration,
        max_attempts: usize,
    ) -> Result<Value, FetchError> {
        let max_attempts = max_attempts.max(1);
        let strategy = FixedInterval::new(self.policy.delay).take(max_attempts - 1);
        let display_url = redact(url);

        let mut attempt = 0usize;
        let result = Retry::spawn(strategy, || {
            attempt += 1;
            let current = attempt;
            let display_url = &display_url;
            async move {
                match self.transport.get(url, timeout).await {
                    Ok(value) => {
                        tracing::debug!(attempt = current, url = %display_url, "Request succeeded");
                        Ok(value)
                    }
                    Err(e) => {
                        tracing::warn!(
                            attempt = current,
                            max_attempts,
                            url = %display_url,
                            error = %e,
                            "Request failed"
                        );
                        Err(e)
                    }
                }
            }
        })
        .await;

        result.map_err(|e| {
            tracing::error!(
                attempts = max_attempts,
                url = %display_url,
                error = %e,
                "All request attempts failed"
            );
            FetchError::RetryExhausted {
                attempts: max_attempts,
                url: display_url.clone(),
                last_error: e.to_string(),
            }
        })
    }
}

/// Masks the value of an `api_key` query parameter so URLs can be logged.
pub fn redact(url: &str) -> String {
    const KEY: &str = "api_key=";
    match url.find(KEY) {
        Some(start) => {
            let value_start = start + KEY.len();
            let value_end = url[value_start..]
                .find('&')
                .map(|i| value_start + i)
                .unwrap_or(url.len());
            format!("{}***{}", &url[..value_start], &url[value_end..])
        }
        None => url.to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
