//! Shared handler state

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use storefront_core::TenantResolver;
use storefront_egress::{ApiGateway, CacheOutcome, EgressObserver, TranslationLoader};
use storefront_observability::Metrics;

use crate::cookies::CookieConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngressConfig {
    #[serde(default)]
    pub cookies: CookieConfig,

    /// Scheme used for canonical URLs, hreflang links and the sitemap
    #[serde(default = "default_public_scheme")]
    pub public_scheme: String,

    /// Prefer `X-Forwarded-Host` over `Host` (behind a trusted proxy only)
    #[serde(default)]
    pub trust_forwarded_host: bool,

    /// Products shown on the home page
    #[serde(default = "default_featured_limit")]
    pub featured_limit: u32,
}

fn default_public_scheme() -> String {
    "https".to_string()
}

fn default_featured_limit() -> u32 {
    8
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            cookies: CookieConfig::default(),
            public_scheme: default_public_scheme(),
            trust_forwarded_host: false,
            featured_limit: default_featured_limit(),
        }
    }
}

/// Everything a page handler needs, shared across requests
pub struct StorefrontState {
    pub resolver: TenantResolver,
    pub gateway: ApiGateway,
    pub translations: Arc<TranslationLoader>,
    pub metrics: Option<Arc<Metrics>>,
    pub config: IngressConfig,
}

impl StorefrontState {
    pub fn new(
        resolver: TenantResolver,
        gateway: ApiGateway,
        translations: Arc<TranslationLoader>,
        config: IngressConfig,
    ) -> Self {
        Self {
            resolver,
            gateway,
            translations,
            metrics: None,
            config,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn cookies(&self) -> &CookieConfig {
        &self.config.cookies
    }
}

/// Feeds gateway and translation loader events into the Prometheus registry
pub struct MetricsObserver {
    metrics: Arc<Metrics>,
}

impl MetricsObserver {
    pub fn new(metrics: Arc<Metrics>) -> Arc<Self> {
        Arc::new(Self { metrics })
    }
}

impl EgressObserver for MetricsObserver {
    fn backend_call(&self, tenant: &str, endpoint: &str, outcome: &str, duration: Duration) {
        self.metrics
            .record_backend_call(tenant, endpoint, outcome, duration.as_secs_f64());
    }

    fn translation_lookup(&self, tenant: &str, outcome: CacheOutcome) {
        self.metrics.record_translation_lookup(tenant, outcome.as_str());
    }
}
