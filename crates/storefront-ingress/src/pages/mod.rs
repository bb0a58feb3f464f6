//! Server-rendered storefront pages
//!
//! Handlers take a [`PageContext`](crate::context::PageContext), call the
//! backend through the tenant-scoped gateway and render askama templates
//! compiled into the binary.

pub mod account;
pub mod api;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod content;
pub mod error;
pub mod home;
pub mod locale;
pub mod newsletter;
pub mod returns;
pub mod theme;

use askama::Template;
use axum::response::{Html, IntoResponse, Response};
use storefront_egress::models::{Page, PostSummary, ProductSummary};

use crate::context::PageContext;
use crate::types::IngressResult;

pub fn render<T: Template>(template: &T) -> IngressResult<Response> {
    Ok(Html(template.render()?).into_response())
}

/// Product tile used on the home page and in listings
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub slug: String,
    pub name: String,
    pub price: String,
    pub compare_at: Option<String>,
    pub image: Option<String>,
    pub in_stock: bool,
}

impl ProductCard {
    pub fn new(ctx: &PageContext, product: &ProductSummary) -> Self {
        let locale = &ctx.tenant.locale;
        Self {
            slug: product.slug.clone(),
            name: product.name.clone(),
            price: product.price().format(locale),
            compare_at: product.compare_at().map(|m| m.format(locale)),
            image: product.image.clone(),
            in_stock: product.in_stock,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostCard {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub image: Option<String>,
    pub date: Option<String>,
}

impl PostCard {
    pub fn new(ctx: &PageContext, post: &PostSummary) -> Self {
        Self {
            slug: post.slug.clone(),
            title: post.title.clone(),
            excerpt: post.excerpt.clone(),
            image: post.image.clone(),
            date: post.published_at.as_ref().map(|at| ctx.date(at)),
        }
    }
}

/// Previous/next links for a paginated listing
#[derive(Debug, Clone)]
pub struct Pager {
    pub label: String,
    pub previous: Option<String>,
    pub next: Option<String>,
}

impl Pager {
    /// `None` when everything fits on one page
    pub fn new<T>(ctx: &PageContext, page: &Page<T>, href: impl Fn(u32) -> String) -> Option<Self> {
        let pages = page.total_pages();
        if pages <= 1 {
            return None;
        }
        let current = page.page.clamp(1, pages);
        Some(Self {
            label: ctx.format(
                "products.page",
                &[("page", &current.to_string()), ("pages", &pages.to_string())],
            ),
            previous: page.has_previous().then(|| href(current - 1)),
            next: page.has_next().then(|| href(current + 1)),
        })
    }
}

/// A select option with its translated label
#[derive(Debug, Clone)]
pub struct Choice {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl Choice {
    pub fn new(value: impl Into<String>, label: impl Into<String>, selected: bool) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            selected,
        }
    }
}

/// Fallback for unknown paths, rendered as the localized 404 page
pub async fn not_found(uri: axum::http::Uri) -> crate::types::IngressError {
    crate::types::IngressError::NotFound(uri.path().to_string())
}
