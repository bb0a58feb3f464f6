//! Tenant types and hostname resolution for multi-tenancy support
//!
//! Every storefront request is served on behalf of exactly one tenant. The
//! tenant is derived from the `Host` header: the hostname is canonicalized into
//! a [`TenantKey`] which is then looked up in a [`TenantRegistry`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::{Currency, Error, Locale, LocaleSource, Result, TenantRegistry};

static COLOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid regex"));

/// Canonical tenant identifier.
///
/// Always non-empty lowercase ASCII alphanumerics. This is also the value sent
/// to the backend in the tenant header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantKey(String);

impl TenantKey {
    /// Parse an already-canonical key
    pub fn parse(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase();
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidTenant(format!(
                "Tenant key must be non-empty alphanumeric: {:?}",
                s
            )));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TenantKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<TenantKey> for String {
    fn from(value: TenantKey) -> Self {
        value.0
    }
}

/// Brand colors rendered into the tenant stylesheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_primary")]
    pub primary: String,
    #[serde(default = "default_secondary")]
    pub secondary: String,
    #[serde(default = "default_accent")]
    pub accent: String,
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default = "default_text")]
    pub text: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            secondary: default_secondary(),
            accent: default_accent(),
            background: default_background(),
            text: default_text(),
        }
    }
}

impl Theme {
    fn colors(&self) -> [(&'static str, &str); 5] {
        [
            ("primary", &self.primary),
            ("secondary", &self.secondary),
            ("accent", &self.accent),
            ("background", &self.background),
            ("text", &self.text),
        ]
    }

    /// Render the theme as CSS custom properties
    pub fn to_css(&self) -> String {
        let mut css = String::from(":root {\n");
        for (name, value) in self.colors() {
            css.push_str(&format!("  --color-{}: {};\n", name, value));
        }
        css.push_str("}\n");
        css
    }
}

/// Per-tenant SEO settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoSettings {
    #[serde(default)]
    pub title_suffix: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Host used for canonical URLs and the sitemap (e.g. `www.acme.com`)
    #[serde(default)]
    pub canonical_host: Option<String>,
}

/// A branded storefront instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantProfile {
    pub key: TenantKey,
    pub display_name: String,
    pub default_locale: Locale,
    #[serde(default)]
    pub supported_locales: Vec<Locale>,
    pub currency: Currency,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub seo: SeoSettings,
    /// Explicit hostnames that map to this tenant regardless of canonicalization
    #[serde(default)]
    pub hosts: Vec<String>,
}

impl TenantProfile {
    /// Check internal consistency. The default locale is added to the
    /// supported set when missing.
    pub fn validate(mut self) -> Result<Self> {
        if self.display_name.trim().is_empty() {
            return Err(Error::ConfigValidation(format!(
                "tenant '{}' has an empty display_name",
                self.key
            )));
        }

        if !self.supported_locales.contains(&self.default_locale) {
            self.supported_locales.insert(0, self.default_locale.clone());
        }

        for (name, value) in self.theme.colors() {
            if !COLOR_RE.is_match(value) {
                return Err(Error::ConfigValidation(format!(
                    "tenant '{}' theme color '{}' must be #rrggbb, got {:?}",
                    self.key, name, value
                )));
            }
        }

        self.hosts = self
            .hosts
            .iter()
            .map(|h| h.trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();

        Ok(self)
    }

    pub fn supports(&self, locale: &Locale) -> bool {
        self.supported_locales.contains(locale)
    }

    /// Page title with the tenant suffix, e.g. `Shoes | Acme`
    pub fn page_title(&self, title: &str) -> String {
        let suffix = self
            .seo
            .title_suffix
            .as_deref()
            .unwrap_or(&self.display_name);
        if title.is_empty() {
            suffix.to_string()
        } else {
            format!("{} | {}", title, suffix)
        }
    }
}

/// Rules for turning a hostname into a tenant key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostRules {
    /// Suffixes removed from the hostname before key derivation. The longest
    /// matching suffix wins.
    #[serde(default = "default_reseller_suffixes")]
    pub reseller_suffixes: Vec<String>,

    /// Additional development hostnames (beyond localhost and IP literals)
    #[serde(default)]
    pub local_hosts: Vec<String>,

    /// Tenant served on development hosts
    pub default_tenant: TenantKey,

    /// Serve the default tenant for unknown hosts instead of rejecting them
    #[serde(default)]
    pub fallback_to_default: bool,
}

impl HostRules {
    pub fn new(default_tenant: TenantKey) -> Self {
        Self {
            reseller_suffixes: default_reseller_suffixes(),
            local_hosts: Vec::new(),
            default_tenant,
            fallback_to_default: false,
        }
    }
}

/// Outcome of hostname canonicalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostResolution {
    Tenant(TenantKey),
    Development,
    Invalid,
}

/// Strip protocol, credentials, path, port and trailing dot.
///
/// IPv6 literals come back without brackets. `None` when what is left is
/// neither a hostname nor an IP literal.
fn bare_hostname(raw: &str) -> Option<String> {
    let mut host = raw.trim().to_ascii_lowercase();

    if let Some((_, rest)) = host.split_once("://") {
        host = rest.to_string();
    }
    if let Some(end) = host.find(['/', '?', '#']) {
        host.truncate(end);
    }
    if let Some((_, rest)) = host.rsplit_once('@') {
        host = rest.to_string();
    }

    if let Some(rest) = host.strip_prefix('[') {
        let (inner, _port) = rest.split_once(']')?;
        return inner.parse::<Ipv6Addr>().is_ok().then(|| inner.to_string());
    }
    match host.matches(':').count() {
        0 => {}
        1 => {
            if let Some((name, _port)) = host.split_once(':') {
                host = name.to_string();
            }
        }
        // Only a bare IPv6 address may carry several colons
        _ => return host.parse::<IpAddr>().is_ok().then_some(host),
    }

    let host = host.trim_end_matches('.');
    (!host.is_empty()).then(|| host.to_string())
}

fn is_local(host: &str, rules: &HostRules) -> bool {
    host == "localhost"
        || host.ends_with(".localhost")
        || host.ends_with(".local")
        || host.parse::<IpAddr>().is_ok()
        || rules.local_hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
}

/// Derive a canonical tenant key from a raw `Host` header value.
pub fn canonicalize_host(raw: &str, rules: &HostRules) -> HostResolution {
    let Some(host) = bare_hostname(raw) else {
        return HostResolution::Invalid;
    };
    let host = host.strip_prefix("www.").unwrap_or(&host);

    if is_local(host, rules) {
        return HostResolution::Development;
    }

    let mut stripped = host;
    let mut best = 0;
    for suffix in &rules.reseller_suffixes {
        let suffix = suffix.trim().to_ascii_lowercase();
        let suffix = if suffix.starts_with('.') {
            suffix
        } else {
            format!(".{}", suffix)
        };
        if suffix.len() > best && host.len() > suffix.len() && host.ends_with(&suffix) {
            best = suffix.len();
            stripped = &host[..host.len() - suffix.len()];
        }
    }

    let key: String = stripped
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    match TenantKey::parse(&key) {
        Ok(key) => HostResolution::Tenant(key),
        Err(_) => HostResolution::Invalid,
    }
}

/// Maps inbound hostnames to tenant profiles
#[derive(Clone)]
pub struct TenantResolver {
    rules: HostRules,
    registry: Arc<dyn TenantRegistry>,
}

impl TenantResolver {
    pub fn new(rules: HostRules, registry: Arc<dyn TenantRegistry>) -> Self {
        Self { rules, registry }
    }

    pub fn rules(&self) -> &HostRules {
        &self.rules
    }

    pub fn registry(&self) -> &Arc<dyn TenantRegistry> {
        &self.registry
    }

    /// Resolve a `Host` header value to a tenant profile.
    ///
    /// # Errors
    /// - `Error::InvalidHost` if no key can be derived from the host
    /// - `Error::TenantNotFound` if the key is unknown and fallback is disabled
    pub async fn resolve(&self, host: &str) -> Result<Arc<TenantProfile>> {
        if let Some(bare) = bare_hostname(host) {
            let bare = bare.strip_prefix("www.").unwrap_or(&bare);
            if let Some(profile) = self.registry.find_by_host(bare).await? {
                debug!(host = %host, tenant = %profile.key, "Tenant resolved by host alias");
                return Ok(profile);
            }
        }

        let key = match canonicalize_host(host, &self.rules) {
            HostResolution::Tenant(key) => key,
            HostResolution::Development => self.rules.default_tenant.clone(),
            HostResolution::Invalid => return Err(Error::InvalidHost(host.to_string())),
        };

        if let Some(profile) = self.registry.get_tenant(&key).await? {
            return Ok(profile);
        }

        if self.rules.fallback_to_default
            && let Some(profile) = self.registry.get_tenant(&self.rules.default_tenant).await?
        {
            debug!(host = %host, requested = %key, "Unknown tenant, serving default");
            return Ok(profile);
        }

        Err(Error::TenantNotFound(key.to_string()))
    }
}

/// Request-scoped tenant identity
///
/// Produced once per request by the tenant middleware and carried through
/// page handlers and every outbound backend call.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub profile: Arc<TenantProfile>,
    pub locale: Locale,
    pub locale_source: LocaleSource,
    /// Host the request arrived on, without port
    pub host: String,
}

impl TenantContext {
    pub fn key(&self) -> &TenantKey {
        &self.profile.key
    }

    pub fn currency(&self) -> &Currency {
        &self.profile.currency
    }

    /// Host used for absolute URLs
    pub fn canonical_host(&self) -> &str {
        self.profile
            .seo
            .canonical_host
            .as_deref()
            .unwrap_or(&self.host)
    }
}

fn default_reseller_suffixes() -> Vec<String> {
    [
        ".storefront.app",
        ".shopfront.dev",
        ".com.tr",
        ".co.uk",
        ".com",
        ".net",
        ".shop",
        ".store",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_primary() -> String {
    "#1f2937".to_string()
}

fn default_secondary() -> String {
    "#4b5563".to_string()
}

fn default_accent() -> String {
    "#2563eb".to_string()
}

fn default_background() -> String {
    "#ffffff".to_string()
}

fn default_text() -> String {
    "#111827".to_string()
}
