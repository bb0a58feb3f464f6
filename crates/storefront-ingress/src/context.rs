//! Per-request page context
//!
//! `PageContext` is the extractor every storefront handler starts from: the
//! resolved tenant and locale, the cookie jar, the translation bundle and a
//! backend scope carrying the tenant header, locale, token and request id.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use storefront_core::{CartState, Currency, Money, TenantContext};
use storefront_egress::translations::interpolate;
use storefront_egress::{RequestScope, TranslationBundle};

use crate::cookies::CookieConfig;
use crate::i18n;
use crate::middleware::RequestMetadataExt;
use crate::seo::SeoMeta;
use crate::state::StorefrontState;
use crate::types::{IngressError, RequestId};

pub struct PageContext {
    pub state: Arc<StorefrontState>,
    pub tenant: TenantContext,
    pub request_id: String,
    pub jar: CookieJar,
    pub bundle: Arc<TranslationBundle>,
    /// Request path without query
    pub path: String,
    /// Allow-listed `?notice=` key
    pub notice: Option<String>,
}

impl PageContext {
    pub async fn new(
        state: Arc<StorefrontState>,
        tenant: TenantContext,
        request_id: String,
        jar: CookieJar,
        path: String,
    ) -> Self {
        let bundle = state
            .translations
            .load(&tenant.profile, &tenant.locale)
            .await;
        Self {
            state,
            tenant,
            request_id,
            jar,
            bundle,
            path,
            notice: None,
        }
    }

    pub fn cookies(&self) -> &CookieConfig {
        self.state.cookies()
    }

    pub fn token(&self) -> Option<&str> {
        self.cookies().read_auth(&self.jar)
    }

    pub fn signed_in(&self) -> bool {
        self.token().is_some()
    }

    /// Backend scope for this request
    pub fn scope(&self) -> RequestScope {
        let scope = RequestScope::new(self.tenant.key().clone(), self.tenant.locale.clone())
            .with_request_id(self.request_id.clone());
        match self.token() {
            Some(token) => scope.with_token(token),
            None => scope,
        }
    }

    pub fn cart(&self) -> CartState {
        self.cookies()
            .read_cart(&self.jar, self.tenant.key(), self.tenant.currency())
    }

    pub fn t<'a>(&'a self, key: &'a str) -> &'a str {
        i18n::lookup(&self.bundle, key)
    }

    /// Looked-up text with `{name}` placeholders substituted
    pub fn format(&self, key: &str, args: &[(&str, &str)]) -> String {
        interpolate(self.t(key), args)
    }

    pub fn money(&self, minor: i64, currency: &Currency) -> String {
        Money::new(minor, currency.clone()).format(&self.tenant.locale)
    }

    pub fn date(&self, at: &DateTime<Utc>) -> String {
        at.format("%Y-%m-%d").to_string()
    }

    /// Redirect to the sign-in page, returning here afterwards
    pub fn login_redirect(&self) -> Response {
        Redirect::to(&format!("/login?{}", next_query(&self.path))).into_response()
    }

    pub fn seo(&self, title: &str, description: Option<&str>) -> SeoMeta {
        SeoMeta::new(
            &self.tenant,
            &self.state.config.public_scheme,
            &self.path,
            title,
            description,
        )
    }

    /// Layout data with default SEO metadata
    pub fn chrome(&self, title: &str) -> Chrome {
        self.chrome_with(self.seo(title, None))
    }

    pub fn chrome_with(&self, seo: SeoMeta) -> Chrome {
        let profile = &self.tenant.profile;
        let next = next_query(&self.path);

        let locales = profile
            .supported_locales
            .iter()
            .map(|locale| LocaleLink {
                label: locale.as_str().to_ascii_uppercase(),
                href: format!("/locale/{}?{}", locale, next),
                active: *locale == self.tenant.locale,
            })
            .collect();

        Chrome {
            lang: self.tenant.locale.to_string(),
            dir: self.tenant.locale.direction(),
            store_name: profile.display_name.clone(),
            seo,
            cart_count: self.cart().cart.item_count(),
            signed_in: self.signed_in(),
            locales,
            notice: self.notice.as_deref().map(|key| self.t(key).to_string()),
            path: self.path.clone(),
            bundle: self.bundle.clone(),
        }
    }
}

impl FromRequestParts<Arc<StorefrontState>> for PageContext {
    type Rejection = IngressError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<StorefrontState>,
    ) -> Result<Self, Self::Rejection> {
        let tenant = parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or_else(|| IngressError::Internal("tenant context missing".to_string()))?;
        let request_id = parts
            .extensions
            .get::<RequestMetadataExt>()
            .map(|m| m.0.request_id.to_string())
            .unwrap_or_else(|| RequestId::generate().to_string());
        let jar = CookieJar::from_headers(&parts.headers);
        let notice = parts.uri.query().and_then(notice_from_query);

        let mut ctx = PageContext::new(
            state.clone(),
            tenant,
            request_id,
            jar,
            parts.uri.path().to_string(),
        )
        .await;
        ctx.notice = notice;
        Ok(ctx)
    }
}

fn notice_from_query(query: &str) -> Option<String> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(query)
        .ok()?
        .into_iter()
        .find(|(name, _)| name == "notice")
        .map(|(_, value)| value)
        .filter(|key| i18n::is_notice(key))
}

/// `next=<path>` query fragment
pub fn next_query(path: &str) -> String {
    serde_urlencoded::to_string([("next", path)]).unwrap_or_default()
}

/// Only same-site absolute paths are followed after sign-in or a language switch.
///
/// The result goes into a `Location` header, so anything outside visible
/// ASCII falls back to `/` as well.
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(next)
            if next.starts_with('/')
                && !next.starts_with("//")
                && !next.contains('\\')
                && next.chars().all(|c| c.is_ascii_graphic()) =>
        {
            next.to_string()
        }
        _ => "/".to_string(),
    }
}

/// Append `notice=<key>` to a local path
pub fn with_notice(path: &str, key: &str) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{}{}notice={}", path, separator, key)
}

#[derive(Debug, Clone)]
pub struct LocaleLink {
    pub label: String,
    pub href: String,
    pub active: bool,
}

/// Layout data shared by every page template
#[derive(Debug, Clone)]
pub struct Chrome {
    pub lang: String,
    pub dir: &'static str,
    pub store_name: String,
    pub seo: SeoMeta,
    pub cart_count: u32,
    pub signed_in: bool,
    pub locales: Vec<LocaleLink>,
    /// Already translated
    pub notice: Option<String>,
    pub path: String,
    bundle: Arc<TranslationBundle>,
}

impl Chrome {
    pub fn t<'a>(&'a self, key: &'a str) -> &'a str {
        i18n::lookup(&self.bundle, key)
    }
}
