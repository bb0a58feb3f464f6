//! Router-level tests against a mocked commerce API and translation host

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use std::sync::Arc;
use storefront_core::{HostRules, InMemoryRegistry, TenantKey, TenantProfile, TenantResolver};
use storefront_egress::{ApiGateway, GatewayConfig, HttpClientConfig, TranslationConfig, TranslationLoader};
use storefront_ingress::{CookieConfig, IngressConfig, StorefrontState, router};
use tower::ServiceExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header as header_eq, method, path},
};

fn profile() -> TenantProfile {
    serde_json::from_value::<TenantProfile>(serde_json::json!({
        "key": "acme",
        "display_name": "Acme Outdoor",
        "default_locale": "en",
        "supported_locales": ["en", "de"],
        "currency": "EUR",
        "seo": { "canonical_host": "www.acme.com" }
    }))
    .unwrap()
    .validate()
    .unwrap()
}

struct Harness {
    backend: MockServer,
    statics: MockServer,
    app: Router,
}

async fn harness() -> Harness {
    let backend = MockServer::start().await;
    let statics = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/acme/en.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "home": {"featured": "Hand-picked gear"}
        })))
        .mount(&statics)
        .await;
    Mock::given(method("GET"))
        .and(path("/acme/de.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "home": {"featured": "Empfohlene Produkte"},
            "error": {"not_found": {"title": "Seite nicht gefunden"}}
        })))
        .mount(&statics)
        .await;

    let registry = InMemoryRegistry::new(vec![profile()]).unwrap();
    let resolver = TenantResolver::new(
        HostRules::new(TenantKey::parse("acme").unwrap()),
        Arc::new(registry),
    );

    let mut gateway_config = GatewayConfig::new(backend.uri());
    gateway_config.http.max_retries = 0;
    let gateway = ApiGateway::new(&gateway_config).unwrap();

    let translations = TranslationLoader::from_config(
        TranslationConfig::new(statics.uri()),
        &HttpClientConfig::default(),
    )
    .unwrap();

    let config = IngressConfig {
        cookies: CookieConfig {
            secret: "test-secret".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };

    let state = StorefrontState::new(resolver, gateway, Arc::new(translations), config);
    Harness {
        backend,
        statics,
        app: router(Arc::new(state)),
    }
}

fn get(uri: &str, host: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::HOST, host)
        .body(Body::empty())
        .unwrap()
}

fn form(uri: &str, host: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::HOST, host)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn set_cookies(response: &axum::response::Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

fn location(response: &axum::response::Response) -> &str {
    response.headers().get(header::LOCATION).unwrap().to_str().unwrap()
}

async fn mount_home(backend: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/products/featured"))
        .and(header_eq("tenant-id", "acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "id": "p1",
            "slug": "trail-boot",
            "name": "Trail Boot",
            "price_minor": 12900,
            "currency": "EUR"
        }])))
        .mount(backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/content/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [{"slug": "packing-list", "title": "The packing list"}],
            "page": 1,
            "page_size": 10,
            "total": 1
        })))
        .mount(backend)
        .await;
}

#[tokio::test]
async fn test_home_renders_for_tenant_host() {
    let h = harness().await;
    mount_home(&h.backend).await;

    let response = h.app.oneshot(get("/", "www.acme.com")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    let html = body_text(response).await;
    assert!(html.contains("<html lang=\"en\""));
    assert!(html.contains("Acme Outdoor"));
    assert!(html.contains("Trail Boot"));
    assert!(html.contains("Hand-picked gear"));
    assert!(html.contains("The packing list"));
    assert!(html.contains("https://www.acme.com/"));
}

#[tokio::test]
async fn test_home_survives_blog_outage() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path("/products/featured"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&h.backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/content/posts"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&h.backend)
        .await;

    let response = h.app.oneshot(get("/", "acme.com")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_host_is_not_found() {
    let h = harness().await;

    let response = h.app.oneshot(get("/", "globex.com")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(h.backend.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unusable_host_is_bad_request() {
    let h = harness().await;

    let without_host = Request::builder()
        .uri("/api/context")
        .body(Body::empty())
        .unwrap();
    let response = h.app.clone().oneshot(without_host).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    for host in ["a:b:c", "[garbage]"] {
        let response = h.app.clone().oneshot(get("/api/context", host)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{host}");
    }
    assert!(h.statics.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_locale_switch_ignores_header_unsafe_next() {
    let h = harness().await;

    let response = h
        .app
        .oneshot(get("/locale/de?next=/%0Aevil", "www.acme.com"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert!(set_cookies(&response).iter().any(|c| c.starts_with("sf_locale=de")));
}

#[tokio::test]
async fn test_newsletter_ignores_header_unsafe_next() {
    let h = harness().await;

    let response = h
        .app
        .oneshot(form("/newsletter", "www.acme.com", "email=nope&next=%2Fcart%0D%0Aevil"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?notice=newsletter.invalid");
    assert!(h.backend.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cart_error_redirect_encodes_slug() {
    let h = harness().await;

    let response = h
        .app
        .oneshot(form("/cart/add", "www.acme.com", "slug=trail%0Aboot+2&quantity=0"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "/products/trail%0Aboot%202?notice=cart.error.invalid_quantity"
    );
}

#[tokio::test]
async fn test_static_assets_skip_tenant_resolution() {
    let h = harness().await;

    let response = h
        .app
        .oneshot(get("/static/storefront.css", "globex.com"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/css; charset=utf-8"
    );
}

#[tokio::test]
async fn test_accept_language_is_persisted() {
    let h = harness().await;
    mount_home(&h.backend).await;

    let request = Request::builder()
        .uri("/")
        .header(header::HOST, "www.acme.com")
        .header(header::ACCEPT_LANGUAGE, "de-CH, de;q=0.9, en;q=0.5")
        .body(Body::empty())
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).iter().any(|c| c.starts_with("sf_locale=de")));
    let html = body_text(response).await;
    assert!(html.contains("<html lang=\"de\""));
    assert!(html.contains("Empfohlene Produkte"));
}

#[tokio::test]
async fn test_matching_locale_cookie_is_not_rewritten() {
    let h = harness().await;
    mount_home(&h.backend).await;

    let request = Request::builder()
        .uri("/")
        .header(header::HOST, "www.acme.com")
        .header(header::COOKIE, "sf_locale=de")
        .body(Body::empty())
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!set_cookies(&response).iter().any(|c| c.starts_with("sf_locale=")));
}

#[tokio::test]
async fn test_add_to_cart_sets_signed_cookie() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path("/products/trail-boot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "p1",
            "slug": "trail-boot",
            "name": "Trail Boot",
            "price_minor": 12900,
            "currency": "EUR"
        })))
        .expect(1)
        .mount(&h.backend)
        .await;

    let response = h
        .app
        .oneshot(form("/cart/add", "www.acme.com", "slug=trail-boot&quantity=2"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/cart");
    let cart = set_cookies(&response)
        .into_iter()
        .find(|c| c.starts_with("sf_cart="))
        .expect("cart cookie");
    assert!(cart.contains("HttpOnly"));
    assert!(!cart.starts_with("sf_cart=;"));
}

#[tokio::test]
async fn test_account_requires_sign_in() {
    let h = harness().await;

    let response = h.app.oneshot(get("/account", "www.acme.com")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?next=%2Faccount");
    assert!(h.backend.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_expired_token_clears_auth_cookie() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path("/account/profile"))
        .and(header_eq("authorization", "Bearer stale-token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.backend)
        .await;

    let request = Request::builder()
        .uri("/account")
        .header(header::HOST, "www.acme.com")
        .header(header::COOKIE, "sf_auth=stale-token")
        .body(Body::empty())
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    let cleared = set_cookies(&response)
        .into_iter()
        .find(|c| c.starts_with("sf_auth="))
        .expect("auth cookie");
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_api_unauthorized_is_json_not_redirect() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path("/products/trail-boot"))
        .and(header_eq("authorization", "Bearer stale-token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.backend)
        .await;

    let body = serde_json::json!({
        "type": "add_item",
        "line": {
            "product_id": "p1",
            "name": "Trail Boot",
            "slug": "trail-boot",
            "unit_price": {"amount_minor": 1, "currency": "EUR"},
            "quantity": 1
        }
    });
    let request = Request::builder()
        .method("POST")
        .uri("/api/cart")
        .header(header::HOST, "www.acme.com")
        .header(header::COOKIE, "sf_auth=stale-token")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::LOCATION).is_none());
    assert!(
        set_cookies(&response)
            .iter()
            .any(|c| c.starts_with("sf_auth=") && c.contains("Max-Age=0"))
    );
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["error"]["type"], "unauthorized");
    assert_eq!(json["error"]["code"], 401);
}

#[tokio::test]
async fn test_missing_product_renders_localized_not_found() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path("/products/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&h.backend)
        .await;

    let request = Request::builder()
        .uri("/products/ghost")
        .header(header::HOST, "www.acme.com")
        .header(header::COOKIE, "sf_locale=de")
        .body(Body::empty())
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let html = body_text(response).await;
    assert!(html.contains("Seite nicht gefunden"));
    assert!(html.contains("noindex"));
}

#[tokio::test]
async fn test_unrouted_path_renders_not_found_page() {
    let h = harness().await;

    let response = h.app.oneshot(get("/no/such/page", "www.acme.com")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let html = body_text(response).await;
    assert!(html.contains("Page not found"));
}

#[tokio::test]
async fn test_backend_failure_is_bad_gateway() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path("/products/featured"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/content/posts"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.backend)
        .await;

    let response = h.app.oneshot(get("/", "www.acme.com")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let html = body_text(response).await;
    assert!(html.contains("We are having trouble"));
    assert!(!html.contains("HTTP 500"));
}

#[tokio::test]
async fn test_robots_points_at_canonical_sitemap() {
    let h = harness().await;

    let response = h.app.oneshot(get("/robots.txt", "acme.com")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Disallow: /checkout"));
    assert!(body.contains("Sitemap: https://www.acme.com/sitemap.xml"));
}

#[tokio::test]
async fn test_sitemap_lists_catalog_and_posts() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path("/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": "c1", "slug": "boots", "name": "Boots"}
        ])))
        .mount(&h.backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [{
                "id": "p1",
                "slug": "trail-boot",
                "name": "Trail Boot",
                "price_minor": 12900,
                "currency": "EUR"
            }],
            "page": 1,
            "page_size": 48,
            "total": 1
        })))
        .mount(&h.backend)
        .await;
    // Blog down: the sitemap still renders
    Mock::given(method("GET"))
        .and(path("/content/posts"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&h.backend)
        .await;

    let response = h.app.oneshot(get("/sitemap.xml", "www.acme.com")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let xml = body_text(response).await;
    assert!(xml.contains("<loc>https://www.acme.com/products/trail-boot</loc>"));
    assert!(xml.contains("<loc>https://www.acme.com/products?category=boots</loc>"));
    assert!(xml.contains("<loc>https://www.acme.com/blog</loc>"));
}

#[tokio::test]
async fn test_api_context_describes_tenant() {
    let h = harness().await;

    let response = h
        .app
        .oneshot(get("/api/context?lang=de", "www.acme.com"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["tenant"], "acme");
    assert_eq!(body["locale"], "de");
    assert_eq!(body["currency"], "EUR");
    assert_eq!(body["signed_in"], false);
    assert_eq!(body["supported_locales"], serde_json::json!(["en", "de"]));
    let fetched = h.statics.received_requests().await.unwrap();
    assert!(fetched.iter().any(|r| r.url.path() == "/acme/de.json"));
}
