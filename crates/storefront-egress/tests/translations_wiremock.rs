//! Integration tests for the translation loader using wiremock

use std::sync::{Arc, Mutex};
use storefront_core::{Locale, TenantKey, TenantProfile};
use storefront_egress::{CacheOutcome, EgressObserver, TranslationConfig, TranslationLoader};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn profile() -> TenantProfile {
    serde_json::from_value::<TenantProfile>(serde_json::json!({
        "key": "acme",
        "display_name": "Acme",
        "default_locale": "en",
        "supported_locales": ["en", "de"],
        "currency": "EUR"
    }))
    .unwrap()
    .validate()
    .unwrap()
}

fn loader(server: &MockServer, ttl: u64) -> TranslationLoader {
    let mut config = TranslationConfig::new(server.uri());
    config.cache_ttl_secs = ttl;
    TranslationLoader::new(config, reqwest::Client::new())
}

fn de() -> Locale {
    Locale::parse("de").unwrap()
}

#[derive(Default)]
struct OutcomeLog(Mutex<Vec<CacheOutcome>>);

impl EgressObserver for OutcomeLog {
    fn translation_lookup(&self, _tenant: &str, outcome: CacheOutcome) {
        self.0.lock().unwrap().push(outcome);
    }
}

#[tokio::test]
async fn test_load_caches_bundle() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/acme/de.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "cart": {"title": "Warenkorb"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let log = Arc::new(OutcomeLog::default());
    let loader = loader(&server, 300).with_observer(log.clone());

    let first = loader.load(&profile(), &de()).await;
    let second = loader.load(&profile(), &de()).await;

    assert_eq!(first.text("cart.title"), "Warenkorb");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(*log.0.lock().unwrap(), vec![CacheOutcome::Miss, CacheOutcome::Hit]);
}

#[tokio::test]
async fn test_missing_locale_falls_back_to_default() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/acme/de.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/acme/en.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "cart": {"title": "Cart"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let log = Arc::new(OutcomeLog::default());
    let loader = loader(&server, 300).with_observer(log.clone());

    let bundle = loader.load(&profile(), &de()).await;
    assert_eq!(bundle.text("cart.title"), "Cart");
    assert_eq!(*log.0.lock().unwrap(), vec![CacheOutcome::Fallback]);

    // Default bundle is now cached under its own key too
    let en = loader.load(&profile(), &Locale::parse("en").unwrap()).await;
    assert_eq!(en.text("cart.title"), "Cart");
}

#[tokio::test]
async fn test_everything_down_gives_empty_bundle() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let bundle = loader(&server, 300).load(&profile(), &de()).await;
    assert!(bundle.is_empty());
    assert_eq!(bundle.text("cart.title"), "cart.title");
}

#[tokio::test]
async fn test_stale_bundle_served_on_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/acme/de.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "home": "Startseite"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/acme/de.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let log = Arc::new(OutcomeLog::default());
    // TTL 0: every lookup after the first is expired
    let loader = loader(&server, 0).with_observer(log.clone());

    loader.load(&profile(), &de()).await;
    let bundle = loader.load(&profile(), &de()).await;

    assert_eq!(bundle.text("home"), "Startseite");
    assert_eq!(*log.0.lock().unwrap(), vec![CacheOutcome::Miss, CacheOutcome::Stale]);
}

#[tokio::test]
async fn test_invalidate_forces_refetch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/acme/de.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"a": "b"})))
        .expect(2)
        .mount(&server)
        .await;

    let loader = loader(&server, 300);
    loader.load(&profile(), &de()).await;
    assert_eq!(loader.cached_len(), 1);

    assert_eq!(loader.invalidate(&TenantKey::parse("globex").unwrap()), 0);
    assert_eq!(loader.invalidate(&TenantKey::parse("acme").unwrap()), 1);
    assert_eq!(loader.cached_len(), 0);

    loader.load(&profile(), &de()).await;
}

#[tokio::test]
async fn test_non_object_bundle_is_a_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(["nope"])))
        .mount(&server)
        .await;

    let loader = loader(&server, 300);
    assert!(
        loader
            .fetch(&TenantKey::parse("acme").unwrap(), &de())
            .await
            .is_err()
    );
}
