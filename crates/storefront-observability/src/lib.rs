//! Storefront Observability
//!
//! This crate provides observability features:
//! - Metrics collection (Prometheus)
//! - Distributed tracing (OpenTelemetry)
//! - Structured logging setup
//! - Health endpoints

pub mod health;
pub mod logging;
pub mod metrics;
pub mod tracing;

pub use health::{ComponentStatus, HealthState, ReadinessChecker, health_router};
pub use logging::{LogFormat, init_logging};
pub use metrics::Metrics;
pub use tracing::{
    PageSpanAttributes, TracerConfig, init_tracer_provider, record_error, record_status_code,
    record_success,
};
