//! Shopping flows across tenants: catalog, cart cookie, checkout

use axum::http::StatusCode;
use serde_json::json;
use storefront_integration_tests::{
    TestStorefront, body_text, cookies_from, get, get_with_cookies, location, post_form, set_cookie,
};
use wiremock::{
    Mock, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

fn trail_boot() -> serde_json::Value {
    json!({
        "id": "p1",
        "slug": "trail-boot",
        "name": "Trail Boot",
        "description": "Waterproof leather boot",
        "price_minor": 12900,
        "currency": "EUR",
        "images": ["https://cdn.example.com/boot.jpg"],
        "variants": [
            {"id": "v42", "name": "EU 42", "sku": "TB-42", "price_minor": 13900}
        ]
    })
}

async fn mount_trail_boot(store: &TestStorefront) {
    Mock::given(method("GET"))
        .and(path("/products/trail-boot"))
        .and(header("tenant-id", "acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(trail_boot()))
        .mount(&store.backend)
        .await;
}

async fn mount_empty_home(store: &TestStorefront, tenant: &str) {
    Mock::given(method("GET"))
        .and(path("/products/featured"))
        .and(header("tenant-id", tenant))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&store.backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/content/posts"))
        .and(header("tenant-id", tenant))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [], "page": 1, "page_size": 10, "total": 0
        })))
        .mount(&store.backend)
        .await;
}

#[tokio::test]
async fn test_each_host_gets_its_own_tenant() {
    let store = TestStorefront::start().await;
    mount_empty_home(&store, "acme").await;
    mount_empty_home(&store, "globex").await;

    let acme = store.send(get("/", "www.acme.com")).await;
    assert_eq!(acme.status(), StatusCode::OK);
    let acme_html = body_text(acme).await;
    assert!(acme_html.contains("Acme Outdoor"));
    assert!(acme_html.contains("lang=\"en\""));

    let globex = store.send(get("/", "globex.com.tr")).await;
    assert_eq!(globex.status(), StatusCode::OK);
    let globex_html = body_text(globex).await;
    assert!(globex_html.contains("Globex Market"));
    assert!(globex_html.contains("lang=\"tr\""));
    assert!(!globex_html.contains("Acme Outdoor"));
}

#[tokio::test]
async fn test_host_alias_and_reseller_domain() {
    let store = TestStorefront::start().await;
    mount_empty_home(&store, "acme").await;

    for host in ["shop.acme-outdoor.example", "acme.storefront.app", "ACME.com:443"] {
        let response = store.send(get("/", host)).await;
        assert_eq!(response.status(), StatusCode::OK, "host {}", host);
        assert!(body_text(response).await.contains("Acme Outdoor"));
    }
}

#[tokio::test]
async fn test_localhost_serves_default_tenant() {
    let store = TestStorefront::start().await;
    mount_empty_home(&store, "acme").await;

    let response = store.send(get("/", "localhost:3000")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Acme Outdoor"));
}

#[tokio::test]
async fn test_theme_stylesheet_is_per_tenant() {
    let store = TestStorefront::start().await;

    let response = store.send(get("/theme.css", "www.acme.com")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("#14532d"));
}

#[tokio::test]
async fn test_cart_then_checkout() {
    let store = TestStorefront::start().await;
    mount_trail_boot(&store).await;

    let added = store
        .send(post_form(
            "/cart/add",
            "www.acme.com",
            None,
            "slug=trail-boot&variant_id=v42&quantity=2",
        ))
        .await;
    assert_eq!(added.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&added), "/cart");
    let cookies = cookies_from(&added);
    assert!(cookies.contains("sf_cart="));

    let cart = store.send(get_with_cookies("/cart", "www.acme.com", &cookies)).await;
    assert_eq!(cart.status(), StatusCode::OK);
    let cart_html = body_text(cart).await;
    assert!(cart_html.contains("Trail Boot - EU 42"));

    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(header("tenant-id", "acme"))
        .and(body_partial_json(json!({
            "email": "ann@example.com",
            "currency": "EUR",
            "lines": [{"product_id": "p1", "variant_id": "v42", "quantity": 2, "unit_price_minor": 13900}],
            "shipping_method": "express",
            "payment_method": "card"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "ord_1",
            "number": "A-1001",
            "status": "pending",
            "placed_at": "2026-03-01T10:00:00Z",
            "email": "ann@example.com",
            "lines": [{
                "product_id": "p1",
                "variant_id": "v42",
                "name": "Trail Boot - EU 42",
                "quantity": 2,
                "unit_price_minor": 13900,
                "total_minor": 27800
            }],
            "subtotal_minor": 27800,
            "total_minor": 27800,
            "currency": "EUR"
        })))
        .expect(1)
        .mount(&store.backend)
        .await;

    let form = "email=ann%40example.com\
        &ship_first_name=Ann&ship_last_name=Lee&ship_line1=Hauptstr.+1\
        &ship_city=Berlin&ship_postal_code=10115&ship_country=de\
        &billing_same=on&shipping_method=express&payment_method=card";
    let placed = store
        .send(post_form("/checkout", "www.acme.com", Some(&cookies), form))
        .await;

    assert_eq!(placed.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&placed), "/checkout/confirmation/ord_1?number=A-1001");
    let cleared = set_cookie(&placed, "sf_cart").expect("cart cookie cleared");
    assert!(cleared.contains("Max-Age=0"));

    let confirmation = store
        .send(get("/checkout/confirmation/ord_1?number=A-1001", "www.acme.com"))
        .await;
    assert_eq!(confirmation.status(), StatusCode::OK);
    assert!(body_text(confirmation).await.contains("A-1001"));
}

#[tokio::test]
async fn test_incomplete_checkout_keeps_entered_fields() {
    let store = TestStorefront::start().await;
    mount_trail_boot(&store).await;

    let added = store
        .send(post_form("/cart/add", "www.acme.com", None, "slug=trail-boot"))
        .await;
    let cookies = cookies_from(&added);

    let response = store
        .send(post_form(
            "/checkout",
            "www.acme.com",
            Some(&cookies),
            "email=ann%40example.com&ship_first_name=Ann&shipping_method=standard&payment_method=card",
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(set_cookie(&response, "sf_cart").is_some());
    let html = body_text(response).await;
    assert!(html.contains("ann@example.com"));
    assert!(store.backend.received_requests().await.unwrap().iter().all(|r| r.url.path() != "/orders"));
}

#[tokio::test]
async fn test_checkout_with_empty_cart_goes_back_to_cart() {
    let store = TestStorefront::start().await;

    let response = store.send(get("/checkout", "www.acme.com")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/cart");
}

#[tokio::test]
async fn test_cart_cookie_is_bound_to_tenant() {
    let store = TestStorefront::start().await;
    mount_trail_boot(&store).await;

    let added = store
        .send(post_form("/cart/add", "www.acme.com", None, "slug=trail-boot"))
        .await;
    let cookies = cookies_from(&added);

    let acme = store.send(get_with_cookies("/api/cart", "www.acme.com", &cookies)).await;
    let acme: serde_json::Value = serde_json::from_str(&body_text(acme).await).unwrap();
    assert_eq!(acme["item_count"], 1);

    let globex = store.send(get_with_cookies("/api/cart", "globex.com.tr", &cookies)).await;
    let globex: serde_json::Value = serde_json::from_str(&body_text(globex).await).unwrap();
    assert_eq!(globex["item_count"], 0);
    assert_eq!(globex["cart"]["currency"], "TRY");
}

#[tokio::test]
async fn test_api_cart_reprices_client_lines() {
    let store = TestStorefront::start().await;
    mount_trail_boot(&store).await;

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/cart")
        .header("host", "www.acme.com")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(
            json!({
                "type": "add_item",
                "line": {
                    "product_id": "p1",
                    "slug": "trail-boot",
                    "name": "Free boot",
                    "unit_price": {"amount_minor": 1, "currency": "EUR"},
                    "quantity": 1
                }
            })
            .to_string(),
        ))
        .unwrap();
    let response = store.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response, "sf_cart").is_some());
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["subtotal_minor"], 12900);
    assert_eq!(body["cart"]["lines"][0]["name"], "Trail Boot");
}
