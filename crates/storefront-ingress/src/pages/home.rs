//! Home page

use askama::Template;
use axum::response::Response;
use tracing::warn;

use super::{PostCard, ProductCard, render};
use crate::context::{Chrome, PageContext};
use crate::types::IngressResult;

/// Posts teased on the home page
const LATEST_POSTS: usize = 3;

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    chrome: Chrome,
    products: Vec<ProductCard>,
    posts: Vec<PostCard>,
}

pub async fn home(ctx: PageContext) -> IngressResult<Response> {
    let scope = ctx.scope();
    let gateway = &ctx.state.gateway;

    let (featured, posts) = tokio::join!(
        gateway.featured_products(&scope, ctx.state.config.featured_limit),
        gateway.list_posts(&scope, 1),
    );

    let products = featured?
        .iter()
        .map(|p| ProductCard::new(&ctx, p))
        .collect();

    // The blog teaser is optional
    let posts = match posts {
        Ok(page) => page
            .items
            .iter()
            .take(LATEST_POSTS)
            .map(|p| PostCard::new(&ctx, p))
            .collect(),
        Err(e) => {
            warn!(tenant = %ctx.tenant.key(), error = %e, "Latest posts unavailable");
            Vec::new()
        }
    };

    render(&HomeTemplate {
        chrome: ctx.chrome(""),
        products,
        posts,
    })
}
