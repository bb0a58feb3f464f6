//! Shared ingress middleware

use crate::context::PageContext;
use crate::pages;
use crate::state::StorefrontState;
use crate::types::{ErrorKind, ErrorPage, RequestId, RequestMetadata, json_error};
use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use opentelemetry::KeyValue;
use opentelemetry::trace::{SpanKind, Tracer};
use std::sync::Arc;
use std::time::Instant;
use storefront_core::locale::{LocaleInputs, needs_persist, resolve_locale};
use storefront_core::{Error as CoreError, TenantContext};
use storefront_observability::{PageSpanAttributes, record_error, record_status_code, record_success};
use tracing::{Instrument, debug, info_span, warn};

/// Extension key for request metadata
#[derive(Clone)]
pub struct RequestMetadataExt(pub RequestMetadata);

/// Middleware to add a request ID and client metadata to all requests
pub async fn request_context_middleware(mut req: Request, next: Next) -> Response {
    let headers = req.headers();

    // Honor an upstream request id when it is header-safe
    let mut metadata = match headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .and_then(RequestId::from_header)
    {
        Some(id) => RequestMetadata::new().with_request_id(id),
        None => RequestMetadata::new(),
    };

    // Extract client IP from X-Forwarded-For or X-Real-IP
    if let Some(forwarded_for) = headers.get("x-forwarded-for") {
        if let Ok(ip) = forwarded_for.to_str() {
            // Take the first IP in the list
            let client_ip = ip.split(',').next().unwrap_or(ip).trim().to_string();
            metadata = metadata.with_client_ip(client_ip);
        }
    } else if let Some(real_ip) = headers.get("x-real-ip")
        && let Ok(ip) = real_ip.to_str()
    {
        metadata = metadata.with_client_ip(ip.to_string());
    }

    if let Some(user_agent) = headers.get(header::USER_AGENT)
        && let Ok(ua) = user_agent.to_str()
    {
        metadata = metadata.with_user_agent(ua.to_string());
    }

    let request_id = metadata.request_id.clone();
    req.extensions_mut().insert(RequestMetadataExt(metadata));

    let mut response = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert("x-request-id", value);
    }

    response
}

/// Middleware to add security headers
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;

    let headers = response.headers_mut();
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "strict-transport-security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );

    response
}

/// Host the request was addressed to, without port
pub fn request_host(headers: &HeaderMap, uri_host: Option<&str>, trust_forwarded: bool) -> String {
    let forwarded = trust_forwarded
        .then(|| headers.get("x-forwarded-host"))
        .flatten()
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let host = forwarded
        .or_else(|| headers.get(header::HOST).and_then(|v| v.to_str().ok()))
        .or(uri_host)
        .unwrap_or_default();

    strip_port(host).to_ascii_lowercase()
}

fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        // IPv6 literal
        return match rest.find(']') {
            Some(end) => &host[..end + 2],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(query?)
        .ok()?
        .into_iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
}

fn resolution_failure(state: &StorefrontState, host: &str, err: CoreError) -> Response {
    let (status, reason) = match &err {
        CoreError::InvalidHost(_) | CoreError::InvalidTenant(_) => {
            (StatusCode::BAD_REQUEST, "invalid_host")
        }
        CoreError::TenantNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "registry_error"),
    };

    if status == StatusCode::SERVICE_UNAVAILABLE {
        warn!(host = %host, error = %err, "Tenant resolution failed");
    } else {
        debug!(host = %host, error = %err, "No tenant for host");
    }
    if let Some(metrics) = &state.metrics {
        metrics.record_tenant_resolution_failure(reason);
    }

    // No tenant means no theme or translations
    let body = format!(
        "<!doctype html><html><head><title>{0}</title></head><body><h1>{0}</h1></body></html>",
        status.canonical_reason().unwrap_or("Error")
    );
    (status, Html(body)).into_response()
}

fn has_cookie(headers: &HeaderMap, name: &str) -> bool {
    let prefix = format!("{}=", name);
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&prefix))
}

fn append_cookie(headers: &mut HeaderMap, cookie: Cookie<'static>) {
    if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
        headers.append(header::SET_COOKIE, value);
    }
}

/// Resolve the tenant and locale for every storefront request.
///
/// Inserts a [`TenantContext`] for handlers, persists the resolved locale,
/// renders handler errors as localized pages and records page metrics.
pub async fn tenant_middleware(
    State(state): State<Arc<StorefrontState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let host = request_host(
        req.headers(),
        req.uri().host(),
        state.config.trust_forwarded_host,
    );

    let profile = match state.resolver.resolve(&host).await {
        Ok(profile) => profile,
        Err(err) => return resolution_failure(&state, &host, err),
    };

    let jar = CookieJar::from_headers(req.headers());
    let cookie_locale = state.cookies().read_locale(&jar).map(str::to_string);
    let query_locale = query_param(req.uri().query(), "lang");
    let accept_language = req
        .headers()
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let (locale, locale_source) = resolve_locale(
        &LocaleInputs {
            query: query_locale.as_deref(),
            cookie: cookie_locale.as_deref(),
            accept_language: accept_language.as_deref(),
        },
        &profile,
    );

    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let request_id = req
        .extensions()
        .get::<RequestMetadataExt>()
        .map(|m| m.0.request_id.to_string())
        .unwrap_or_else(|| RequestId::generate().to_string());
    let path = req.uri().path().to_string();

    let tenant = TenantContext {
        profile,
        locale: locale.clone(),
        locale_source,
        host,
    };
    req.extensions_mut().insert(tenant.clone());

    let tracer = opentelemetry::global::tracer("storefront");
    let attributes = PageSpanAttributes::new()
        .with_tenant(tenant.key().as_str())
        .with_locale(locale.as_str())
        .with_route(route.as_str())
        .with_request_id(request_id.as_str());
    let mut otel_span = tracer
        .span_builder("page")
        .with_kind(SpanKind::Server)
        .with_attributes(
            attributes
                .to_key_values()
                .into_iter()
                .chain([KeyValue::new("storefront.locale_source", locale_source.as_str())]),
        )
        .start(&tracer);

    let span = info_span!(
        "page",
        tenant = %tenant.key(),
        locale = %locale,
        route = %route,
        request_id = %request_id,
    );
    let mut response = next.run(req).instrument(span).await;

    if let Some(ErrorPage(kind)) = response.extensions().get::<ErrorPage>().copied() {
        if kind == ErrorKind::Unauthorized {
            // Script clients get the status, pages get the login redirect
            if path.starts_with("/api/") {
                response = json_error(kind, "Sign-in required");
            }
            append_cookie(
                response.headers_mut(),
                state.cookies().expired(&state.cookies().auth_name),
            );
        } else if !path.starts_with("/api/") {
            let ctx = PageContext::new(state.clone(), tenant.clone(), request_id.clone(), jar, path)
                .await;
            let cookies: Vec<HeaderValue> = response
                .headers()
                .get_all(header::SET_COOKIE)
                .iter()
                .cloned()
                .collect();
            response = pages::error::render(&ctx, kind);
            for cookie in cookies {
                response.headers_mut().append(header::SET_COOKIE, cookie);
            }
        }
    }

    if needs_persist(cookie_locale.as_deref(), &locale)
        && !has_cookie(response.headers(), &state.cookies().locale_name)
    {
        append_cookie(
            response.headers_mut(),
            state.cookies().locale_cookie(locale.as_str()),
        );
    }

    let status = response.status().as_u16();
    record_status_code(&mut otel_span, status);
    if response.status().is_server_error() {
        record_error(&mut otel_span, response.status().canonical_reason().unwrap_or("error"));
    } else {
        record_success(&mut otel_span);
    }

    if let Some(metrics) = &state.metrics {
        metrics.record_page_request(
            tenant.key().as_str(),
            &route,
            status,
            started.elapsed().as_secs_f64(),
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request, middleware, routing::get};
    use tower::ServiceExt;

    async fn test_handler() -> &'static str {
        "OK"
    }

    #[tokio::test]
    async fn test_request_context_middleware() {
        let app = Router::new()
            .route("/test", get(test_handler))
            .layer(middleware::from_fn(request_context_middleware));

        let response = app
            .oneshot(Request::builder().uri("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let id = response.headers().get("x-request-id").unwrap().to_str().unwrap();
        assert!(id.starts_with("req_"));
    }

    #[tokio::test]
    async fn test_request_context_keeps_inbound_id() {
        let app = Router::new()
            .route("/test", get(test_handler))
            .layer(middleware::from_fn(request_context_middleware));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/test")
                    .header("x-request-id", "edge-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers().get("x-request-id").unwrap(), "edge-42");
    }

    #[tokio::test]
    async fn test_request_context_replaces_unsafe_id() {
        let app = Router::new()
            .route("/test", get(test_handler))
            .layer(middleware::from_fn(request_context_middleware));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/test")
                    .header("x-request-id", "not safe!")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let id = response.headers().get("x-request-id").unwrap().to_str().unwrap();
        assert!(id.starts_with("req_"));
    }

    #[tokio::test]
    async fn test_security_headers_middleware() {
        let app = Router::new()
            .route("/test", get(test_handler))
            .layer(middleware::from_fn(security_headers_middleware));

        let response = app
            .oneshot(Request::builder().uri("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.headers().get("x-content-type-options").unwrap(), "nosniff");
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert!(response.headers().get("strict-transport-security").is_some());
    }

    #[test]
    fn test_request_host_strips_port() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("Acme.Storefront.app:8080"));
        assert_eq!(request_host(&headers, None, false), "acme.storefront.app");

        headers.insert(header::HOST, HeaderValue::from_static("[::1]:3000"));
        assert_eq!(request_host(&headers, None, false), "[::1]");
    }

    #[test]
    fn test_forwarded_host_only_when_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("internal:8080"));
        headers.insert("x-forwarded-host", HeaderValue::from_static("shop.acme.com, proxy"));

        assert_eq!(request_host(&headers, None, false), "internal");
        assert_eq!(request_host(&headers, None, true), "shop.acme.com");
    }

    #[test]
    fn test_request_host_falls_back_to_uri() {
        let headers = HeaderMap::new();
        assert_eq!(request_host(&headers, Some("acme.example"), false), "acme.example");
        assert_eq!(request_host(&headers, None, false), "");
    }

    #[test]
    fn test_query_param() {
        assert_eq!(query_param(Some("a=1&lang=de-DE"), "lang"), Some("de-DE".to_string()));
        assert_eq!(query_param(Some("a=1"), "lang"), None);
        assert_eq!(query_param(None, "lang"), None);
    }

    #[test]
    fn test_has_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(header::SET_COOKIE, HeaderValue::from_static("sf_locale=de; Path=/"));
        assert!(has_cookie(&headers, "sf_locale"));
        assert!(!has_cookie(&headers, "sf_cart"));
    }
}
