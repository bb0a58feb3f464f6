//! Storefront cookies
//!
//! - cart: the cart/order-draft state, JSON, base64url, HMAC-SHA256 signed
//!   and bound to the tenant key
//! - locale: the resolved display locale
//! - auth: the backend session token

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use storefront_core::{CartError, CartState, Currency, TenantKey};
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Browsers drop cookies above ~4 KiB including name and attributes
pub const MAX_CART_COOKIE_BYTES: usize = 4000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieConfig {
    #[serde(default = "default_cart_name")]
    pub cart_name: String,

    #[serde(default = "default_locale_name")]
    pub locale_name: String,

    #[serde(default = "default_auth_name")]
    pub auth_name: String,

    /// HMAC key for the cart cookie
    #[serde(default)]
    pub secret: String,

    /// Set the `Secure` attribute
    #[serde(default = "default_secure")]
    pub secure: bool,

    #[serde(default = "default_max_age_days")]
    pub max_age_days: i64,
}

fn default_cart_name() -> String {
    "sf_cart".to_string()
}

fn default_locale_name() -> String {
    "sf_locale".to_string()
}

fn default_auth_name() -> String {
    "sf_auth".to_string()
}

fn default_secure() -> bool {
    true
}

fn default_max_age_days() -> i64 {
    30
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            cart_name: default_cart_name(),
            locale_name: default_locale_name(),
            auth_name: default_auth_name(),
            secret: String::new(),
            secure: default_secure(),
            max_age_days: default_max_age_days(),
        }
    }
}

impl CookieConfig {
    fn build(&self, name: &str, value: String, http_only: bool) -> Cookie<'static> {
        Cookie::build((name.to_string(), value))
            .path("/")
            .http_only(http_only)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::days(self.max_age_days))
            .build()
    }

    /// A cookie that deletes `name` when sent to the browser
    pub fn expired(&self, name: &str) -> Cookie<'static> {
        Cookie::build((name.to_string(), String::new()))
            .path("/")
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::ZERO)
            .build()
    }

    pub fn locale_cookie(&self, locale: &str) -> Cookie<'static> {
        // Readable by client scripts
        self.build(&self.locale_name, locale.to_string(), false)
    }

    pub fn auth_cookie(&self, token: &str) -> Cookie<'static> {
        self.build(&self.auth_name, token.to_string(), true)
    }

    pub fn read_locale<'a>(&self, jar: &'a CookieJar) -> Option<&'a str> {
        jar.get(&self.locale_name).map(|c| c.value())
    }

    pub fn read_auth<'a>(&self, jar: &'a CookieJar) -> Option<&'a str> {
        jar.get(&self.auth_name)
            .map(|c| c.value())
            .filter(|v| !v.is_empty())
    }

    fn mac(&self, tenant: &TenantKey, payload: &str) -> HmacSha256 {
        let mut mac = match HmacSha256::new_from_slice(self.secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC-SHA256 takes keys of any length"),
        };
        mac.update(tenant.as_str().as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        mac
    }

    /// Encode and sign the cart state
    pub fn encode_cart(&self, tenant: &TenantKey, state: &CartState) -> Result<String, CartError> {
        let json = serde_json::to_vec(state).unwrap_or_default();
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = URL_SAFE_NO_PAD.encode(self.mac(tenant, &payload).finalize().into_bytes());
        let value = format!("{}.{}", payload, signature);

        let size = self.cart_name.len() + 1 + value.len();
        if size > MAX_CART_COOKIE_BYTES {
            return Err(CartError::TooLarge {
                size,
                max: MAX_CART_COOKIE_BYTES,
            });
        }
        Ok(value)
    }

    /// Verify and decode a cart cookie value.
    ///
    /// Returns `None` for a bad signature, a cookie signed for another tenant,
    /// malformed JSON, or a cart in another currency.
    pub fn decode_cart(&self, tenant: &TenantKey, currency: &Currency, value: &str) -> Option<CartState> {
        let (payload, signature) = value.split_once('.')?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
        if self.mac(tenant, payload).verify_slice(&signature).is_err() {
            debug!(tenant = %tenant, "Discarding cart cookie with bad signature");
            return None;
        }

        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let state: CartState = serde_json::from_slice(&json).ok()?;
        if state.cart.currency != *currency {
            debug!(tenant = %tenant, "Discarding cart cookie in another currency");
            return None;
        }
        Some(state)
    }

    /// Read the cart from the jar, or start an empty one in the tenant currency
    pub fn read_cart(&self, jar: &CookieJar, tenant: &TenantKey, currency: &Currency) -> CartState {
        jar.get(&self.cart_name)
            .and_then(|c| self.decode_cart(tenant, currency, c.value()))
            .unwrap_or_else(|| CartState::new(currency.clone()))
    }

    /// Store the cart in the jar. An empty cart with an empty draft removes the cookie.
    pub fn write_cart(
        &self,
        jar: CookieJar,
        tenant: &TenantKey,
        state: &CartState,
    ) -> Result<CookieJar, CartError> {
        if state.cart.is_empty() && *state == CartState::new(state.cart.currency.clone()) {
            return Ok(jar.add(self.expired(&self.cart_name)));
        }
        let value = self.encode_cart(tenant, state)?;
        Ok(jar.add(self.build(&self.cart_name, value, true)))
    }
}
