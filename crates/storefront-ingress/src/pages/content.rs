//! Blog and CMS pages
//!
//! Post and page bodies are HTML authored in the backend CMS and rendered
//! unescaped.

use askama::Template;
use axum::extract::{Path, Query};
use axum::response::Response;

use super::account::PageQuery;
use super::{Pager, PostCard, render};
use crate::context::{Chrome, PageContext};
use crate::types::IngressResult;

#[derive(Template)]
#[template(path = "blog_list.html")]
struct BlogListTemplate {
    chrome: Chrome,
    posts: Vec<PostCard>,
    pager: Option<Pager>,
}

pub async fn blog(ctx: PageContext, Query(query): Query<PageQuery>) -> IngressResult<Response> {
    let page = ctx.state.gateway.list_posts(&ctx.scope(), query.number()).await?;
    let posts = page.items.iter().map(|p| PostCard::new(&ctx, p)).collect();
    let title = ctx.t("blog.title").to_string();

    let mut seo = ctx.seo(&title, None);
    if query.number() > 1 {
        seo = seo.noindex();
    }

    render(&BlogListTemplate {
        chrome: ctx.chrome_with(seo),
        posts,
        pager: Pager::new(&ctx, &page, |n| format!("/blog?page={}", n)),
    })
}

#[derive(Template)]
#[template(path = "blog_post.html")]
struct BlogPostTemplate {
    chrome: Chrome,
    title: String,
    author: Option<String>,
    date: Option<String>,
    image: Option<String>,
    body_html: String,
}

pub async fn post(ctx: PageContext, Path(slug): Path<String>) -> IngressResult<Response> {
    let post = ctx.state.gateway.get_post(&ctx.scope(), &slug).await?;

    let seo = ctx
        .seo(&post.title, Some(&post.excerpt))
        .with_og_type("article")
        .with_image(post.image.clone());

    render(&BlogPostTemplate {
        chrome: ctx.chrome_with(seo),
        date: post.published_at.as_ref().map(|at| ctx.date(at)),
        title: post.title,
        author: post.author,
        image: post.image,
        body_html: post.body_html,
    })
}

#[derive(Template)]
#[template(path = "content_page.html")]
struct ContentPageTemplate {
    chrome: Chrome,
    title: String,
    body_html: String,
}

pub async fn page(ctx: PageContext, Path(slug): Path<String>) -> IngressResult<Response> {
    let page = ctx.state.gateway.get_page(&ctx.scope(), &slug).await?;
    let seo = ctx.seo(&page.title, page.meta_description.as_deref());

    render(&ContentPageTemplate {
        chrome: ctx.chrome_with(seo),
        title: page.title,
        body_html: page.body_html,
    })
}
