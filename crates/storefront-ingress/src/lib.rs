//! Storefront Ingress
//!
//! The inbound HTTP side of the storefront:
//! - Request context, security header and tenant middleware
//! - Signed cookies for cart, locale and auth token
//! - Server-rendered pages and the JSON endpoints used by client scripts
//! - SEO metadata, robots.txt and sitemap.xml

pub mod context;
pub mod cookies;
pub mod i18n;
pub mod middleware;
pub mod pages;
pub mod seo;
pub mod state;
pub mod types;

pub use context::{Chrome, PageContext};
pub use cookies::CookieConfig;
pub use state::{IngressConfig, MetricsObserver, StorefrontState};
pub use types::{ErrorKind, IngressError, IngressResult, RequestId, RequestMetadata};

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use pages::{account, api, auth, cart, catalog, checkout, content, home, locale, newsletter, returns, theme};

/// Build the storefront router.
///
/// Every route except the embedded assets runs behind the tenant middleware.
pub fn router(state: Arc<StorefrontState>) -> Router {
    let storefront = Router::new()
        .route("/", get(home::home))
        .route("/products", get(catalog::list))
        .route("/products/{slug}", get(catalog::detail))
        .route("/cart", get(cart::show))
        .route("/cart/add", post(cart::add))
        .route("/cart/update", post(cart::update))
        .route("/cart/remove", post(cart::remove))
        .route("/cart/clear", post(cart::clear))
        .route("/checkout", get(checkout::show).post(checkout::submit))
        .route("/checkout/confirmation/{id}", get(checkout::confirmation))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/register", get(auth::register_form).post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/account", get(account::profile).post(account::update_profile))
        .route("/account/orders", get(account::orders))
        .route("/account/orders/{id}", get(account::order_detail))
        .route("/account/returns", get(returns::list))
        .route("/returns/new", get(returns::new_form))
        .route("/returns", post(returns::create))
        .route("/blog", get(content::blog))
        .route("/blog/{slug}", get(content::post))
        .route("/pages/{slug}", get(content::page))
        .route("/newsletter", post(newsletter::subscribe))
        .route("/locale/{code}", get(locale::switch))
        .route("/theme.css", get(theme::theme_css))
        .route("/robots.txt", get(seo::robots))
        .route("/sitemap.xml", get(seo::sitemap))
        .route("/api/context", get(api::context))
        .route("/api/cart", get(api::cart).post(api::cart_action))
        .fallback(pages::not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::tenant_middleware,
        ))
        .with_state(state);

    let assets = Router::new()
        .route("/static/storefront.css", get(theme::serve_css))
        .route("/static/storefront.js", get(theme::serve_js));

    storefront
        .merge(assets)
        .layer(axum_middleware::from_fn(middleware::security_headers_middleware))
        .layer(axum_middleware::from_fn(middleware::request_context_middleware))
        .layer(TraceLayer::new_for_http())
}
