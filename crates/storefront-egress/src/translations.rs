//! Translation bundles from the static content host
//!
//! Bundles are plain JSON dictionaries, one per tenant and locale. They are
//! cached in memory with a TTL. A page render never fails because of
//! translations: on fetch errors the loader serves a stale copy, then the
//! tenant's default-locale bundle, then an empty bundle (which renders keys).

use dashmap::DashMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use storefront_core::{Locale, TenantKey, TenantProfile};
use tracing::{debug, warn};

use crate::client::{HttpClientConfig, create_client};
use crate::gateway::error_for_status;
use crate::{EgressError, EgressObserver, Result};

pub const DEFAULT_PATH_TEMPLATE: &str = "{base}/{tenant}/{locale}.json";

/// Upper bound on how long a stale or fallback bundle is served before retrying
const RETRY_AFTER_FAILURE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Base URL of the static content host
    pub base_url: String,

    /// Bundle URL with `{base}`, `{tenant}` and `{locale}` placeholders
    #[serde(default = "default_path_template")]
    pub path_template: String,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl TranslationConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path_template: default_path_template(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_path_template() -> String {
    DEFAULT_PATH_TEMPLATE.to_string()
}

fn default_cache_ttl_secs() -> u64 {
    300
}

/// How a bundle lookup was served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
    Stale,
    Fallback,
}

impl CacheOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Miss => "miss",
            CacheOutcome::Stale => "stale",
            CacheOutcome::Fallback => "fallback",
        }
    }
}

/// Flattened UI strings for one tenant and locale
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TranslationBundle {
    entries: HashMap<String, String>,
}

impl TranslationBundle {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Flatten a JSON document into dotted keys.
    ///
    /// `{"cart": {"title": "Cart"}}` becomes `cart.title = "Cart"`. Numbers and
    /// booleans are stringified, nulls are skipped.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        if !value.is_object() {
            return Err(EgressError::Decode(
                "translation bundle must be a JSON object".to_string(),
            ));
        }
        let mut entries = HashMap::new();
        flatten("", value, &mut entries);
        Ok(Self { entries })
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Translated text, or the key itself when missing
    pub fn text<'a>(&'a self, key: &'a str) -> &'a str {
        self.get(key).unwrap_or(key)
    }

    /// Translated text with `{name}` placeholders substituted
    pub fn format(&self, key: &str, args: &[(&str, &str)]) -> String {
        interpolate(self.text(key), args)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Replace `{name}` placeholders; unknown ones are left alone
pub fn interpolate(template: &str, args: &[(&str, &str)]) -> String {
    let mut text = template.to_string();
    for (name, value) in args {
        text = text.replace(&format!("{{{}}}", name), value);
    }
    text
}

fn flatten(prefix: &str, value: &serde_json::Value, out: &mut HashMap<String, String>) {
    use serde_json::Value;

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&path, child, out);
            }
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Value::Null => {}
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}

struct CachedBundle {
    bundle: Arc<TranslationBundle>,
    expires_at: Instant,
}

/// Fetches and caches translation bundles
pub struct TranslationLoader {
    client: Client,
    config: TranslationConfig,
    cache: DashMap<(TenantKey, Locale), CachedBundle>,
    observer: Option<Arc<dyn EgressObserver>>,
}

impl TranslationLoader {
    pub fn new(config: TranslationConfig, client: Client) -> Self {
        Self {
            client,
            config,
            cache: DashMap::new(),
            observer: None,
        }
    }

    pub fn from_config(config: TranslationConfig, http: &HttpClientConfig) -> Result<Self> {
        Ok(Self::new(config, create_client(http)?))
    }

    pub fn with_observer(mut self, observer: Arc<dyn EgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.cache_ttl_secs)
    }

    fn failure_ttl(&self) -> Duration {
        self.ttl().min(RETRY_AFTER_FAILURE)
    }

    pub fn bundle_url(&self, tenant: &TenantKey, locale: &Locale) -> String {
        self.config
            .path_template
            .replace("{base}", self.config.base_url.trim_end_matches('/'))
            .replace("{tenant}", tenant.as_str())
            .replace("{locale}", locale.as_str())
    }

    /// Fetch a bundle, bypassing the cache
    pub async fn fetch(&self, tenant: &TenantKey, locale: &Locale) -> Result<TranslationBundle> {
        let url = self.bundle_url(tenant, locale);
        debug!(tenant = %tenant, locale = %locale, url = %url, "Fetching translation bundle");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(error_for_status(status.as_u16(), &headers, &body, &url));
        }

        let value: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| EgressError::Decode(format!("{}: {}", url, e)))?;
        TranslationBundle::from_json(&value)
    }

    /// Bundle for a tenant and locale. Never fails.
    pub async fn load(&self, profile: &TenantProfile, locale: &Locale) -> Arc<TranslationBundle> {
        let key = (profile.key.clone(), locale.clone());
        let now = Instant::now();

        let stale = match self.cache.get(&key) {
            Some(entry) if entry.expires_at > now => {
                self.record(&profile.key, CacheOutcome::Hit);
                return entry.bundle.clone();
            }
            Some(entry) => Some(entry.bundle.clone()),
            None => None,
        };

        let error = match self.fetch(&profile.key, locale).await {
            Ok(bundle) => {
                let bundle = Arc::new(bundle);
                self.store(key, bundle.clone(), self.ttl());
                self.record(&profile.key, CacheOutcome::Miss);
                return bundle;
            }
            Err(e) => e,
        };

        if let Some(stale) = stale {
            warn!(
                tenant = %profile.key,
                locale = %locale,
                "Serving stale translations after fetch failure: {}",
                error
            );
            self.store(key, stale.clone(), self.failure_ttl());
            self.record(&profile.key, CacheOutcome::Stale);
            return stale;
        }

        warn!(
            tenant = %profile.key,
            locale = %locale,
            "Translation bundle unavailable, falling back: {}",
            error
        );
        let fallback = match self.default_bundle(profile, locale).await {
            Some(bundle) => bundle,
            None => Arc::new(TranslationBundle::empty()),
        };
        self.store(key, fallback.clone(), self.failure_ttl());
        self.record(&profile.key, CacheOutcome::Fallback);
        fallback
    }

    /// Default-locale bundle, from cache (any age) or a fresh fetch
    async fn default_bundle(
        &self,
        profile: &TenantProfile,
        requested: &Locale,
    ) -> Option<Arc<TranslationBundle>> {
        if requested == &profile.default_locale {
            return None;
        }

        let key = (profile.key.clone(), profile.default_locale.clone());
        if let Some(entry) = self.cache.get(&key) {
            return Some(entry.bundle.clone());
        }

        match self.fetch(&profile.key, &profile.default_locale).await {
            Ok(bundle) => {
                let bundle = Arc::new(bundle);
                self.store(key, bundle.clone(), self.ttl());
                Some(bundle)
            }
            Err(e) => {
                debug!(tenant = %profile.key, "Default-locale bundle unavailable too: {}", e);
                None
            }
        }
    }

    fn store(&self, key: (TenantKey, Locale), bundle: Arc<TranslationBundle>, ttl: Duration) {
        self.cache.insert(
            key,
            CachedBundle {
                bundle,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn record(&self, tenant: &TenantKey, outcome: CacheOutcome) {
        if let Some(observer) = &self.observer {
            observer.translation_lookup(tenant.as_str(), outcome);
        }
    }

    /// Drop every cached bundle of a tenant; returns how many were removed
    pub fn invalidate(&self, tenant: &TenantKey) -> usize {
        let before = self.cache.len();
        self.cache.retain(|(key, _), _| key != tenant);
        before.saturating_sub(self.cache.len())
    }

    pub fn invalidate_all(&self) {
        self.cache.clear();
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}
