//! End-to-end test harness for the storefront
//!
//! Wires the file-backed tenant registry, the ingress router, metrics and the
//! health endpoints the same way the server binary does, with the commerce
//! backend and the static translation host replaced by wiremock servers.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use axum::response::Response;
use http_body_util::BodyExt;
use std::sync::Arc;
use storefront_config_file::FileTenantRegistry;
use storefront_core::{HostRules, TenantKey, TenantResolver};
use storefront_egress::{ApiGateway, GatewayConfig, HttpClientConfig, TranslationConfig, TranslationLoader};
use storefront_ingress::{CookieConfig, IngressConfig, MetricsObserver, StorefrontState};
use storefront_observability::{ComponentStatus, HealthState, Metrics, ReadinessChecker, health_router};
use tempfile::NamedTempFile;
use tower::ServiceExt;
use wiremock::MockServer;

/// Two tenants: `acme` (en/de, EUR) and `globex` (tr/en, TRY)
pub const TENANTS_YAML: &str = r##"
tenants:
  - key: acme
    display_name: Acme Outdoor
    default_locale: en
    supported_locales: [en, de]
    currency: EUR
    hosts: [shop.acme-outdoor.example]
    seo:
      canonical_host: www.acme.com
    theme:
      primary: "#14532d"
  - key: globex
    display_name: Globex Market
    default_locale: tr
    supported_locales: [tr, en]
    currency: TRY
"##;

pub const ACME_ONLY_YAML: &str = r##"
tenants:
  - key: acme
    display_name: Acme Outdoor
    default_locale: en
    supported_locales: [en, de]
    currency: EUR
"##;

pub struct TestStorefront {
    pub backend: MockServer,
    pub statics: MockServer,
    pub registry: FileTenantRegistry,
    pub registry_file: NamedTempFile,
    pub translations: Arc<TranslationLoader>,
    pub metrics: Arc<Metrics>,
    pub app: Router,
}

struct RegistryReady(FileTenantRegistry);

impl ReadinessChecker for RegistryReady {
    fn is_ready(&self) -> bool {
        self.0.tenant_count() > 0
    }

    fn components(&self) -> Vec<ComponentStatus> {
        if self.is_ready() {
            vec![ComponentStatus::ok("tenant_registry")]
        } else {
            vec![ComponentStatus::unavailable("tenant_registry", "no tenants")]
        }
    }
}

impl TestStorefront {
    pub async fn start() -> Self {
        Self::with_registry(TENANTS_YAML).await
    }

    pub async fn with_registry(contents: &str) -> Self {
        let backend = MockServer::start().await;
        let statics = MockServer::start().await;

        let registry_file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        std::fs::write(registry_file.path(), contents).unwrap();
        let registry = FileTenantRegistry::new(registry_file.path()).await.unwrap();

        let metrics = Arc::new(Metrics::new().unwrap());
        let observer = MetricsObserver::new(metrics.clone());

        let resolver = TenantResolver::new(
            HostRules::new(TenantKey::parse("acme").unwrap()),
            Arc::new(registry.clone()),
        );

        let mut gateway_config = GatewayConfig::new(backend.uri());
        gateway_config.http.max_retries = 0;
        let gateway = ApiGateway::new(&gateway_config)
            .unwrap()
            .with_observer(observer.clone());

        let translations = Arc::new(
            TranslationLoader::from_config(
                TranslationConfig::new(statics.uri()),
                &HttpClientConfig::default(),
            )
            .unwrap()
            .with_observer(observer),
        );

        let config = IngressConfig {
            cookies: CookieConfig {
                secret: "integration-secret-0123456789abcdef".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        let state = StorefrontState::new(resolver, gateway, translations.clone(), config)
            .with_metrics(metrics.clone());
        let health = HealthState::with_readiness_checker(
            metrics.clone(),
            Arc::new(RegistryReady(registry.clone())),
        );
        let app = storefront_ingress::router(Arc::new(state)).merge(health_router(health));

        Self {
            backend,
            statics,
            registry,
            registry_file,
            translations,
            metrics,
            app,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Overwrite the registry file and reload it the way the watcher does
    pub fn rewrite_registry(&self, contents: &str) -> storefront_core::Result<()> {
        std::fs::write(self.registry_file.path(), contents).unwrap();
        self.registry.reload().map(|_| {
            self.translations.invalidate_all();
        })
    }
}

pub fn get(uri: &str, host: &str) -> Request<Body> {
    request("GET", uri, host, None, Body::empty())
}

pub fn get_with_cookies(uri: &str, host: &str, cookies: &str) -> Request<Body> {
    request("GET", uri, host, Some(cookies), Body::empty())
}

pub fn post_form(uri: &str, host: &str, cookies: Option<&str>, body: &str) -> Request<Body> {
    let mut request = request("POST", uri, host, cookies, Body::from(body.to_string()));
    request.headers_mut().insert(
        header::CONTENT_TYPE,
        "application/x-www-form-urlencoded".parse().unwrap(),
    );
    request
}

fn request(method: &str, uri: &str, host: &str, cookies: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, host);
    if let Some(cookies) = cookies {
        builder = builder.header(header::COOKIE, cookies);
    }
    builder.body(body).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

/// `Set-Cookie` headers folded into a `Cookie` header, expired cookies dropped
pub fn cookies_from(response: &Response) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter(|value| !value.contains("Max-Age=0"))
        .filter_map(|value| value.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

/// The named cookie from the response's `Set-Cookie` headers
pub fn set_cookie(response: &Response, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&prefix))
        .map(str::to_string)
}
