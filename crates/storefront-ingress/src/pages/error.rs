//! Localized error pages

use askama::Template;
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use tracing::error;

use crate::context::{Chrome, PageContext};
use crate::types::ErrorKind;

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    chrome: Chrome,
    heading: String,
    message: String,
    status: u16,
}

/// Render the error page for `kind` in the request locale
pub fn render(ctx: &PageContext, kind: ErrorKind) -> Response {
    let title_key = format!("error.{}.title", kind.code());
    let body_key = format!("error.{}.body", kind.code());
    let heading = ctx.t(&title_key).to_string();

    let template = ErrorTemplate {
        chrome: ctx.chrome_with(ctx.seo(&heading, None).noindex()),
        message: ctx.t(&body_key).to_string(),
        heading,
        status: kind.status().as_u16(),
    };

    match template.render() {
        Ok(html) => (kind.status(), Html(html)).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render error page");
            (
                kind.status(),
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                kind.status().canonical_reason().unwrap_or("Error"),
            )
                .into_response()
        }
    }
}
