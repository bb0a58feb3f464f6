//! Error types for Storefront Core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    // Multi-tenancy errors
    #[error("Invalid tenant: {0}")]
    InvalidTenant(String),

    #[error("Invalid host: {0}")]
    InvalidHost(String),

    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    // Locale errors
    #[error("Invalid locale: {0}")]
    InvalidLocale(String),

    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration not found")]
    ConfigNotFound,

    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
