//! Embedded assets and the tenant theme stylesheet

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::context::PageContext;

/// Tenant theme colors as CSS custom properties
pub async fn theme_css(ctx: PageContext) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/css; charset=utf-8"),
            (header::CACHE_CONTROL, "public, max-age=300"),
        ],
        ctx.tenant.profile.theme.to_css(),
    )
        .into_response()
}

/// Serve embedded CSS
pub async fn serve_css() -> Response {
    let css = include_str!("../../static/storefront.css");
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        css,
    )
        .into_response()
}

/// Serve embedded storefront.js
pub async fn serve_js() -> Response {
    let js = include_str!("../../static/storefront.js");
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        js,
    )
        .into_response()
}
