//! OpenTelemetry distributed tracing
//!
//! Builds the tracer provider and the attribute set attached to page spans.
//! Spans are not exported anywhere; the provider exists so trace ids can be
//! correlated with request ids in the logs.

use opentelemetry::{
    KeyValue,
    trace::{Span, Status},
};
use opentelemetry_sdk::{
    Resource,
    trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
};

/// Tracer configuration
#[derive(Debug, Clone)]
pub struct TracerConfig {
    pub service_name: String,
    pub service_version: String,
    /// Sampling rate (0.0-1.0)
    pub sampling_rate: f64,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            service_name: "storefront".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            sampling_rate: 1.0,
        }
    }
}

/// Initialize a tracer provider
pub fn init_tracer_provider(config: TracerConfig) -> SdkTracerProvider {
    let resource = Resource::builder()
        .with_service_name(config.service_name)
        .with_attribute(KeyValue::new("service.version", config.service_version))
        .build();

    let sampler = if config.sampling_rate >= 1.0 {
        Sampler::AlwaysOn
    } else if config.sampling_rate <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(config.sampling_rate)
    };

    SdkTracerProvider::builder()
        .with_resource(resource)
        .with_id_generator(RandomIdGenerator::default())
        .with_sampler(sampler)
        .build()
}

/// Span attributes for a rendered page
#[derive(Debug, Clone, Default)]
pub struct PageSpanAttributes {
    pub tenant: Option<String>,
    pub locale: Option<String>,
    /// Matched route template
    pub route: Option<String>,
    pub request_id: Option<String>,
}

impl PageSpanAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Convert to OpenTelemetry KeyValue pairs
    pub fn to_key_values(&self) -> Vec<KeyValue> {
        let mut kvs = Vec::new();

        if let Some(ref tenant) = self.tenant {
            kvs.push(KeyValue::new("storefront.tenant", tenant.clone()));
        }
        if let Some(ref locale) = self.locale {
            kvs.push(KeyValue::new("storefront.locale", locale.clone()));
        }
        if let Some(ref route) = self.route {
            kvs.push(KeyValue::new("storefront.route", route.clone()));
        }
        if let Some(ref request_id) = self.request_id {
            kvs.push(KeyValue::new("storefront.request_id", request_id.clone()));
        }

        kvs
    }
}

/// Attach the response status to a page span
pub fn record_status_code(span: &mut impl Span, status: u16) {
    span.set_attribute(KeyValue::new("http.response.status_code", status as i64));
}

/// Mark a span as failed with an error
pub fn record_error(span: &mut impl Span, error: &str) {
    span.set_status(Status::error(error.to_string()));
    span.set_attribute(KeyValue::new("error", true));
    span.set_attribute(KeyValue::new("error.message", error.to_string()));
}

pub fn record_success(span: &mut impl Span) {
    span.set_status(Status::Ok);
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{Tracer, TracerProvider};

    fn config(sampling_rate: f64) -> TracerConfig {
        TracerConfig {
            service_name: "test".to_string(),
            service_version: "1.0.0".to_string(),
            sampling_rate,
        }
    }

    #[test]
    fn test_tracer_config_default() {
        let config = TracerConfig::default();
        assert_eq!(config.service_name, "storefront");
        assert_eq!(config.sampling_rate, 1.0);
    }

    #[test]
    fn test_init_tracer_provider() {
        let provider = init_tracer_provider(TracerConfig::default());
        let tracer = provider.tracer("test");
        let span = tracer.start("page");
        assert!(span.span_context().is_valid());
        assert!(span.span_context().is_sampled());
    }

    #[test]
    fn test_sampling_always_off() {
        let provider = init_tracer_provider(config(0.0));
        let tracer = provider.tracer("test");
        let span = tracer.start("page");
        // Span still gets ids, it just is not sampled
        assert!(!span.span_context().is_sampled());
    }

    #[test]
    fn test_sampling_ratio_accepts_fraction() {
        let provider = init_tracer_provider(config(0.5));
        let tracer = provider.tracer("test");
        let span = tracer.start("page");
        assert!(span.span_context().is_valid());
    }

    #[test]
    fn test_page_span_attributes() {
        let attrs = PageSpanAttributes::new()
            .with_tenant("acme")
            .with_locale("de-DE")
            .with_route("/products/{slug}")
            .with_request_id("req_1");

        let kvs = attrs.to_key_values();
        assert_eq!(kvs.len(), 4);
        assert!(
            kvs.iter()
                .any(|kv| kv.key.as_str() == "storefront.tenant" && kv.value.as_str() == "acme")
        );
        assert!(kvs.iter().any(|kv| kv.key.as_str() == "storefront.route"
            && kv.value.as_str() == "/products/{slug}"));
    }

    #[test]
    fn test_page_span_attributes_partial() {
        let kvs = PageSpanAttributes::new().with_tenant("acme").to_key_values();
        assert_eq!(kvs.len(), 1);
        assert_eq!(kvs[0].key.as_str(), "storefront.tenant");
    }

    #[test]
    fn test_record_helpers_do_not_panic() {
        let provider = init_tracer_provider(TracerConfig::default());
        let tracer = provider.tracer("test");

        let mut span = tracer.start("page");
        record_status_code(&mut span, 502);
        record_error(&mut span, "backend unavailable");
        span.end();

        let mut span = tracer.start("page");
        record_success(&mut span);
        span.end();
    }
}
