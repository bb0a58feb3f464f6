//! Metrics collection with Prometheus
//!
//! This module provides Prometheus metrics for the storefront:
//! - Page requests by tenant, route and status, with latency
//! - Backend API calls by tenant, endpoint and outcome, with latency
//! - Translation cache outcomes
//! - Tenant resolution failures
//! - Cart mutations
//! - Tenant registry size and reloads

use prometheus::{CounterVec, HistogramOpts, HistogramVec, IntGauge, Opts, Registry};
use std::sync::Arc;

/// Metrics collector for the storefront
#[derive(Clone)]
pub struct Metrics {
    /// Prometheus registry
    registry: Arc<Registry>,

    // Page traffic
    pub page_requests_total: CounterVec,
    pub page_request_duration_seconds: HistogramVec,

    // Backend
    pub backend_calls_total: CounterVec,
    pub backend_call_duration_seconds: HistogramVec,

    // Translations
    pub translation_cache_total: CounterVec,

    // Tenancy
    pub tenant_resolution_failures_total: CounterVec,
    /// Tenants in the current registry snapshot
    pub tenants_loaded: IntGauge,
    pub registry_reloads_total: CounterVec,

    // Cart
    pub cart_mutations_total: CounterVec,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let page_requests_total = CounterVec::new(
            Opts::new("storefront_page_requests_total", "Total number of page requests"),
            &["tenant", "route", "status"],
        )?;

        let page_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "storefront_page_request_duration_seconds",
                "Page request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["tenant", "route"],
        )?;

        let backend_calls_total = CounterVec::new(
            Opts::new("storefront_backend_calls_total", "Total number of backend API calls"),
            &["tenant", "endpoint", "outcome"],
        )?;

        let backend_call_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "storefront_backend_call_duration_seconds",
                "Backend API call duration in seconds",
            )
            .buckets(vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["endpoint"],
        )?;

        let translation_cache_total = CounterVec::new(
            Opts::new(
                "storefront_translation_cache_total",
                "Translation bundle lookups by cache outcome",
            ),
            &["tenant", "outcome"],
        )?;

        let tenant_resolution_failures_total = CounterVec::new(
            Opts::new(
                "storefront_tenant_resolution_failures_total",
                "Requests whose host did not resolve to a tenant",
            ),
            &["reason"],
        )?;

        let tenants_loaded = IntGauge::new(
            "storefront_tenants_loaded",
            "Number of tenants in the active registry",
        )?;

        let registry_reloads_total = CounterVec::new(
            Opts::new(
                "storefront_registry_reloads_total",
                "Tenant registry reload attempts",
            ),
            &["result"],
        )?;

        let cart_mutations_total = CounterVec::new(
            Opts::new("storefront_cart_mutations_total", "Cart reducer actions applied"),
            &["tenant", "action", "result"],
        )?;

        registry.register(Box::new(page_requests_total.clone()))?;
        registry.register(Box::new(page_request_duration_seconds.clone()))?;
        registry.register(Box::new(backend_calls_total.clone()))?;
        registry.register(Box::new(backend_call_duration_seconds.clone()))?;
        registry.register(Box::new(translation_cache_total.clone()))?;
        registry.register(Box::new(tenant_resolution_failures_total.clone()))?;
        registry.register(Box::new(tenants_loaded.clone()))?;
        registry.register(Box::new(registry_reloads_total.clone()))?;
        registry.register(Box::new(cart_mutations_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            page_requests_total,
            page_request_duration_seconds,
            backend_calls_total,
            backend_call_duration_seconds,
            translation_cache_total,
            tenant_resolution_failures_total,
            tenants_loaded,
            registry_reloads_total,
            cart_mutations_total,
        })
    }

    /// Get the Prometheus registry for exporting metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a served page. `route` is the matched route template, not the raw path.
    pub fn record_page_request(&self, tenant: &str, route: &str, status: u16, duration_secs: f64) {
        let status = status.to_string();
        self.page_requests_total
            .with_label_values(&[tenant, route, status.as_str()])
            .inc();
        self.page_request_duration_seconds
            .with_label_values(&[tenant, route])
            .observe(duration_secs);
    }

    pub fn record_backend_call(&self, tenant: &str, endpoint: &str, outcome: &str, duration_secs: f64) {
        self.backend_calls_total
            .with_label_values(&[tenant, endpoint, outcome])
            .inc();
        self.backend_call_duration_seconds
            .with_label_values(&[endpoint])
            .observe(duration_secs);
    }

    pub fn record_translation_lookup(&self, tenant: &str, outcome: &str) {
        self.translation_cache_total
            .with_label_values(&[tenant, outcome])
            .inc();
    }

    pub fn record_tenant_resolution_failure(&self, reason: &str) {
        self.tenant_resolution_failures_total
            .with_label_values(&[reason])
            .inc();
    }

    pub fn record_cart_mutation(&self, tenant: &str, action: &str, accepted: bool) {
        let result = if accepted { "ok" } else { "rejected" };
        self.cart_mutations_total
            .with_label_values(&[tenant, action, result])
            .inc();
    }

    pub fn set_tenants_loaded(&self, count: usize) {
        self.tenants_loaded.set(count as i64);
    }

    pub fn record_registry_reload(&self, success: bool) {
        let result = if success { "ok" } else { "error" };
        self.registry_reloads_total.with_label_values(&[result]).inc();
    }
}
