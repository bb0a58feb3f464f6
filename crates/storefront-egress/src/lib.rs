//! Storefront Egress
//!
//! Everything the storefront fetches from elsewhere:
//! - `gateway`: tenant-scoped JSON calls to the commerce backend
//! - `api`: typed catalog, account, checkout, returns and content endpoints
//! - `translations`: per-tenant, per-locale UI string bundles from the static host

use std::time::Duration;
use thiserror::Error;

pub mod api;
pub mod client;
pub mod gateway;
pub mod models;
pub mod retry_after;
pub mod translations;

pub use client::HttpClientConfig;
pub use gateway::{ApiGateway, GatewayConfig, RequestScope};
pub use retry_after::parse_retry_after;
pub use translations::{CacheOutcome, TranslationBundle, TranslationConfig, TranslationLoader};

#[derive(Debug, Error)]
pub enum EgressError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Rate limit exceeded{}", .retry_after_secs.map(|s| format!(", retry after {}s", s)).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Request timeout after {0}s")]
    Timeout(u64),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl EgressError {
    /// Short label used for metrics
    pub fn outcome(&self) -> &'static str {
        match self {
            EgressError::Http(_) | EgressError::Timeout(_) => "network_error",
            EgressError::Unauthorized => "unauthorized",
            EgressError::NotFound(_) => "not_found",
            EgressError::Validation(_) => "validation_error",
            EgressError::RateLimited { .. } => "rate_limited",
            EgressError::Upstream { .. } => "upstream_error",
            EgressError::Decode(_) => "decode_error",
            EgressError::Config(_) => "config_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, EgressError>;

/// Hook for recording outbound call outcomes
///
/// The ingress layer implements this on top of its Prometheus metrics; the
/// default methods do nothing.
pub trait EgressObserver: Send + Sync {
    fn backend_call(&self, _tenant: &str, _endpoint: &str, _outcome: &str, _duration: Duration) {}

    fn translation_lookup(&self, _tenant: &str, _outcome: CacheOutcome) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_formatting() {
        let err = EgressError::Config("bad base url".to_string());
        assert!(err.to_string().contains("Invalid configuration"));

        let err = EgressError::Timeout(30);
        assert_eq!(err.to_string(), "Request timeout after 30s");

        let err = EgressError::Upstream {
            status: 500,
            message: "Internal error".to_string(),
        };
        assert!(err.to_string().contains("500"));

        let err = EgressError::RateLimited {
            retry_after_secs: Some(60),
        };
        assert!(err.to_string().contains("60s"));

        let err = EgressError::RateLimited {
            retry_after_secs: None,
        };
        assert_eq!(err.to_string(), "Rate limit exceeded");
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(EgressError::Unauthorized.outcome(), "unauthorized");
        assert_eq!(EgressError::NotFound("x".into()).outcome(), "not_found");
        assert_eq!(EgressError::Decode("x".into()).outcome(), "decode_error");
    }
}
