//! Cart page and cart mutations
//!
//! The cart lives in the signed cart cookie. Every mutation runs through the
//! core reducer; prices always come from the backend, never from the form.

use askama::Template;
use axum::Form;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use storefront_core::{CartAction, CartError, CartState, NewLine, reduce};
use storefront_egress::api::path_segment;
use tracing::debug;

use super::render;
use crate::context::{Chrome, PageContext, with_notice};
use crate::types::{IngressError, IngressResult};

/// Run actions through the reducer, counting each in the cart mutation metric.
///
/// The first rejected action stops the sequence.
pub fn reduce_all(
    ctx: &PageContext,
    mut state: CartState,
    actions: impl IntoIterator<Item = CartAction>,
) -> Result<CartState, CartError> {
    for action in actions {
        let name = action.name();
        let result = reduce(state.clone(), action);
        record(ctx, name, result.is_ok());
        state = result.inspect_err(|e| {
            debug!(tenant = %ctx.tenant.key(), action = name, error = %e, "Cart action rejected");
        })?;
    }
    Ok(state)
}

/// Apply actions to the request's cart and store the result in the jar
pub fn apply(
    ctx: &PageContext,
    actions: impl IntoIterator<Item = CartAction>,
) -> Result<(CookieJar, CartState), CartError> {
    let state = reduce_all(ctx, ctx.cart(), actions)?;
    let jar = ctx
        .cookies()
        .write_cart(ctx.jar.clone(), ctx.tenant.key(), &state)?;
    Ok((jar, state))
}

fn record(ctx: &PageContext, action: &str, accepted: bool) {
    if let Some(metrics) = &ctx.state.metrics {
        metrics.record_cart_mutation(ctx.tenant.key().as_str(), action, accepted);
    }
}

/// Apply one action and redirect, to `/cart` on success or with an error notice
fn mutate(ctx: &PageContext, action: CartAction) -> Response {
    match apply(ctx, [action]) {
        Ok((jar, _)) => (jar, Redirect::to("/cart")).into_response(),
        Err(e) => Redirect::to(&error_redirect("/cart", &e)).into_response(),
    }
}

pub fn error_redirect(path: &str, err: &CartError) -> String {
    with_notice(path, &format!("cart.error.{}", err.code()))
}

/// Build a cart line from backend data
pub async fn priced_line(
    ctx: &PageContext,
    slug: &str,
    variant_id: Option<&str>,
    quantity: u32,
) -> IngressResult<NewLine> {
    let product = ctx.state.gateway.get_product(&ctx.scope(), slug).await?;

    let variant = match variant_id.filter(|v| !v.is_empty()) {
        Some(id) => Some(product.variant(id).ok_or_else(|| {
            IngressError::InvalidRequest(format!("unknown variant {} for {}", id, slug))
        })?),
        None => None,
    };

    let name = match variant {
        Some(v) => format!("{} - {}", product.name, v.name),
        None => product.name.clone(),
    };

    Ok(NewLine {
        product_id: product.id.clone(),
        variant_id: variant.map(|v| v.id.clone()),
        sku: variant.and_then(|v| v.sku.clone()).or_else(|| product.sku.clone()),
        name,
        slug: Some(product.slug.clone()),
        unit_price: product.price_for(variant),
        quantity,
        image: product.images.first().cloned(),
    })
}

#[derive(Debug, Clone)]
pub struct LineView {
    pub key: String,
    pub name: String,
    pub slug: Option<String>,
    pub image: Option<String>,
    pub quantity: u32,
    pub unit_price: String,
    pub total: String,
}

pub fn line_views(ctx: &PageContext, state: &CartState) -> Vec<LineView> {
    let currency = &state.cart.currency;
    state
        .cart
        .lines
        .iter()
        .map(|line| LineView {
            key: line.key(),
            name: line.name.clone(),
            slug: line.slug.clone(),
            image: line.image.clone(),
            quantity: line.quantity,
            unit_price: ctx.money(line.unit_price_minor, currency),
            total: ctx.money(line.total_minor(), currency),
        })
        .collect()
}

#[derive(Template)]
#[template(path = "cart.html")]
struct CartTemplate {
    chrome: Chrome,
    lines: Vec<LineView>,
    subtotal: String,
}

pub async fn show(ctx: PageContext) -> IngressResult<Response> {
    let state = ctx.cart();
    let title = ctx.t("cart.title").to_string();

    render(&CartTemplate {
        chrome: ctx.chrome_with(ctx.seo(&title, None).noindex()),
        lines: line_views(&ctx, &state),
        subtotal: state.cart.subtotal().format(&ctx.tenant.locale),
    })
}

#[derive(Debug, Deserialize)]
pub struct AddForm {
    pub slug: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub quantity: Option<String>,
}

pub async fn add(ctx: PageContext, Form(form): Form<AddForm>) -> IngressResult<Response> {
    let quantity = form
        .quantity
        .as_deref()
        .map(|q| q.trim().parse::<u32>().unwrap_or(0))
        .unwrap_or(1);
    if quantity == 0 {
        return Ok(Redirect::to(&error_redirect(
            &format!("/products/{}", path_segment(&form.slug)),
            &CartError::InvalidQuantity(0),
        ))
        .into_response());
    }

    let line = priced_line(&ctx, &form.slug, form.variant_id.as_deref(), quantity).await?;
    Ok(mutate(&ctx, CartAction::AddItem { line }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateForm {
    pub key: String,
    pub quantity: String,
}

pub async fn update(ctx: PageContext, Form(form): Form<UpdateForm>) -> Response {
    match form.quantity.trim().parse::<u32>() {
        Ok(quantity) => mutate(
            &ctx,
            CartAction::SetQuantity {
                key: form.key,
                quantity,
            },
        ),
        Err(_) => {
            record(&ctx, "set_quantity", false);
            Redirect::to(&error_redirect("/cart", &CartError::InvalidQuantity(0))).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RemoveForm {
    pub key: String,
}

pub async fn remove(ctx: PageContext, Form(form): Form<RemoveForm>) -> Response {
    mutate(&ctx, CartAction::RemoveItem { key: form.key })
}

pub async fn clear(ctx: PageContext) -> Response {
    mutate(&ctx, CartAction::Clear)
}
