//! Tenant-scoped commerce backend client
//!
//! Every call is made on behalf of a [`RequestScope`]: the tenant key goes out
//! in the tenant header, the resolved locale in `Accept-Language`, and the
//! customer token (when signed in) as a bearer token. Backend status codes are
//! folded into [`EgressError`] variants the page layer can act on.

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use storefront_core::{Locale, TenantKey};
use tracing::{debug, warn};

use crate::client::{HttpClientConfig, create_client, with_retry};
use crate::retry_after::retry_after_from_headers;
use crate::{EgressError, EgressObserver, Result};

pub const DEFAULT_TENANT_HEADER: &str = "Tenant-Id";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the commerce API, e.g. `https://api.example.com/v1`
    pub base_url: String,

    /// Header carrying the tenant key
    #[serde(default = "default_tenant_header")]
    pub tenant_header: String,

    #[serde(default)]
    pub http: HttpClientConfig,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            tenant_header: default_tenant_header(),
            http: HttpClientConfig::default(),
        }
    }
}

fn default_tenant_header() -> String {
    DEFAULT_TENANT_HEADER.to_string()
}

/// Who a backend call is made for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestScope {
    pub tenant: TenantKey,
    pub locale: Locale,
    pub token: Option<String>,
    pub request_id: Option<String>,
}

impl RequestScope {
    pub fn new(tenant: TenantKey, locale: Locale) -> Self {
        Self {
            tenant,
            locale,
            token: None,
            request_id: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// JSON client for the commerce backend
#[derive(Clone)]
pub struct ApiGateway {
    client: Client,
    base_url: String,
    tenant_header: HeaderName,
    max_retries: u32,
    timeout_secs: u64,
    observer: Option<Arc<dyn EgressObserver>>,
}

impl std::fmt::Debug for ApiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiGateway")
            .field("base_url", &self.base_url)
            .field("tenant_header", &self.tenant_header)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl ApiGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = create_client(&config.http)?;
        Self::with_client(client, config)
    }

    /// Build on an existing client (shared connection pool)
    pub fn with_client(client: Client, config: &GatewayConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(EgressError::Config(format!(
                "backend base_url must be an http(s) URL, got {:?}",
                config.base_url
            )));
        }

        let tenant_header = HeaderName::from_bytes(config.tenant_header.as_bytes()).map_err(|e| {
            EgressError::Config(format!("invalid tenant header {:?}: {}", config.tenant_header, e))
        })?;

        Ok(Self {
            client,
            base_url,
            tenant_header,
            max_retries: config.http.max_retries,
            timeout_secs: config.http.timeout_secs,
            observer: None,
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn EgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Headers attached to every backend call
    pub fn scope_headers(&self, scope: &RequestScope) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(self.tenant_header.clone(), header_value(scope.tenant.as_str())?);
        headers.insert(ACCEPT_LANGUAGE, header_value(scope.locale.as_str())?);

        if let Some(token) = &scope.token {
            let mut value = header_value(&format!("Bearer {}", token))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        if let Some(request_id) = &scope.request_id {
            headers.insert(
                HeaderName::from_static(REQUEST_ID_HEADER),
                header_value(request_id)?,
            );
        }

        Ok(headers)
    }

    /// GET and decode, retrying transient failures
    pub async fn get_json<T: DeserializeOwned>(&self, scope: &RequestScope, path: &str) -> Result<T> {
        with_retry(self.max_retries, || {
            self.execute::<T, ()>(scope, Method::GET, path, None)
        })
        .await
    }

    pub async fn post_json<B, T>(&self, scope: &RequestScope, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(scope, Method::POST, path, Some(body)).await
    }

    pub async fn put_json<B, T>(&self, scope: &RequestScope, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(scope, Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, scope: &RequestScope, path: &str) -> Result<()> {
        self.execute::<serde_json::Value, ()>(scope, Method::DELETE, path, None)
            .await
            .map(|_| ())
    }

    /// Client-side timeouts, while sending or reading the body, become `Timeout`
    fn timed_out(&self, error: EgressError) -> EgressError {
        match error {
            EgressError::Http(e) if e.is_timeout() => EgressError::Timeout(self.timeout_secs),
            other => other,
        }
    }

    async fn execute<T, B>(
        &self,
        scope: &RequestScope,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let started = Instant::now();
        let url = self.url(path);
        debug!(tenant = %scope.tenant, method = %method, url = %url, "Backend request");

        let mut request = self
            .client
            .request(method, &url)
            .headers(self.scope_headers(scope)?);
        if let Some(body) = body {
            request = request.json(body);
        }

        let result = match request.send().await {
            Ok(response) => decode_response(response, path).await,
            Err(e) => Err(EgressError::Http(e)),
        }
        .map_err(|e| self.timed_out(e));

        if let Some(observer) = &self.observer {
            let outcome = match &result {
                Ok(_) => "success",
                Err(e) => e.outcome(),
            };
            observer.backend_call(
                scope.tenant.as_str(),
                endpoint_label(path),
                outcome,
                started.elapsed(),
            );
        }

        if let Err(e) = &result {
            match e {
                EgressError::NotFound(_) | EgressError::Validation(_) | EgressError::Unauthorized => {
                    debug!(tenant = %scope.tenant, path = %path, "Backend rejected request: {}", e)
                }
                _ => warn!(tenant = %scope.tenant, path = %path, "Backend call failed: {}", e),
            }
        }

        result
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| EgressError::Config(format!("value not allowed in header: {:?}", value)))
}

/// Metric label for a backend path: its first segment (`/products/x?y` -> `products`)
pub fn endpoint_label(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.trim_start_matches('/')
        .split('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("root")
}

async fn decode_response<T: DeserializeOwned>(response: Response, path: &str) -> Result<T> {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?;

    if !status.is_success() {
        return Err(error_for_status(status.as_u16(), &headers, &body, path));
    }

    // 204 and empty bodies decode as JSON null so `()` and `Option<_>` work
    let json: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        &body
    };
    serde_json::from_slice(json).map_err(|e| EgressError::Decode(format!("{}: {}", path, e)))
}

/// Map a non-2xx backend response to an error
pub fn error_for_status(status: u16, headers: &HeaderMap, body: &[u8], path: &str) -> EgressError {
    match status {
        401 | 403 => EgressError::Unauthorized,
        404 => EgressError::NotFound(path.to_string()),
        400 | 422 => EgressError::Validation(backend_message(body, status)),
        429 => EgressError::RateLimited {
            retry_after_secs: retry_after_from_headers(headers),
        },
        _ => EgressError::Upstream {
            status,
            message: backend_message(body, status),
        },
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Message { message: String },
    Detail { detail: String },
    Nested { error: NestedError },
    Plain { error: String },
}

#[derive(Deserialize)]
struct NestedError {
    message: String,
}

/// Human-readable message from an error body
fn backend_message(body: &[u8], status: u16) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) {
        return match parsed {
            ErrorBody::Message { message } => message,
            ErrorBody::Detail { detail } => detail,
            ErrorBody::Nested { error } => error.message,
            ErrorBody::Plain { error } => error,
        };
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        format!("HTTP {}", status)
    } else {
        text.chars().take(200).collect()
    }
}
