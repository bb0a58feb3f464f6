//! Shared HTTP client utilities

use crate::{EgressError, Result};
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Maximum number of idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Maximum number of retries for idempotent requests
    pub max_retries: u32,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            // Page renders wait on these calls, keep it short
            timeout_secs: 10,
            connect_timeout_secs: 3,
            pool_max_idle_per_host: 32,
            max_retries: 3,
            user_agent: format!("Storefront/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Create a configured HTTP client with connection pooling
pub fn create_client(config: &HttpClientConfig) -> Result<Client> {
    ClientBuilder::new()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        // Expire idle connections before the backend's load balancer closes them
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(&config.user_agent)
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .map_err(|e| EgressError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Longest `Retry-After` worth waiting for, page renders block on these calls
pub const MAX_RETRY_AFTER_SECS: u64 = 2;

/// Whether a failed call may succeed if repeated
pub fn is_retryable(error: &EgressError) -> bool {
    match error {
        EgressError::Http(req_err) => req_err.is_connect() || req_err.is_timeout(),
        EgressError::Upstream { status, .. } => matches!(status, 500 | 502 | 503 | 504),
        EgressError::RateLimited { .. } | EgressError::Timeout(_) => true,
        _ => false,
    }
}

/// Delay before retrying after `error` on the given (zero-based) attempt.
///
/// Exponential backoff of 100ms, 200ms, 400ms. A rate limit waits for the
/// backend's `Retry-After` instead when that is longer, and is not retried at
/// all when it exceeds [`MAX_RETRY_AFTER_SECS`].
pub fn retry_delay(error: &EgressError, attempt: u32) -> Option<Duration> {
    if !is_retryable(error) {
        return None;
    }
    let backoff = Duration::from_millis(100 * 2u64.saturating_pow(attempt));
    match error {
        EgressError::RateLimited {
            retry_after_secs: Some(secs),
        } => (*secs <= MAX_RETRY_AFTER_SECS).then(|| backoff.max(Duration::from_secs(*secs))),
        _ => Some(backoff),
    }
}

/// Retry policy for transient errors
pub async fn with_retry<F, Fut, T>(max_retries: u32, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        let error = match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        let delay = if attempt < max_retries {
            retry_delay(&error, attempt)
        } else {
            None
        };
        let Some(delay) = delay else {
            return Err(error);
        };

        warn!(
            "Request failed (attempt {}/{}): {}",
            attempt + 1,
            max_retries + 1,
            error
        );
        debug!("Retrying request after {}ms", delay.as_millis());
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
