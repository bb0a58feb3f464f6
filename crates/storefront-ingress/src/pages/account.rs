//! Customer account: profile and order history
//!
//! Every handler needs the auth cookie. Without it the customer is sent to
//! the sign-in page; a token the backend rejects clears the cookie there too.

use askama::Template;
use axum::Form;
use axum::extract::{Path, Query};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use storefront_core::Address;
use storefront_egress::models::UpdateProfile;

use super::checkout::{OrderLineView, order_lines};
use super::{Pager, render};
use crate::context::{Chrome, PageContext, with_notice};
use crate::types::IngressResult;

#[derive(Template)]
#[template(path = "account.html")]
struct AccountTemplate {
    chrome: Chrome,
    email: String,
    first_name: String,
    last_name: String,
    phone: String,
    newsletter: bool,
}

pub async fn profile(ctx: PageContext) -> IngressResult<Response> {
    if !ctx.signed_in() {
        return Ok(ctx.login_redirect());
    }
    let customer = ctx.state.gateway.get_profile(&ctx.scope()).await?;
    let title = ctx.t("account.title").to_string();

    render(&AccountTemplate {
        chrome: ctx.chrome_with(ctx.seo(&title, None).noindex()),
        email: customer.email,
        first_name: customer.first_name,
        last_name: customer.last_name,
        phone: customer.phone.unwrap_or_default(),
        newsletter: customer.newsletter,
    })
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub newsletter: Option<String>,
}

pub async fn update_profile(ctx: PageContext, Form(form): Form<ProfileForm>) -> IngressResult<Response> {
    if !ctx.signed_in() {
        return Ok(ctx.login_redirect());
    }
    let phone = form.phone.trim();
    let update = UpdateProfile {
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        phone: (!phone.is_empty()).then(|| phone.to_string()),
        newsletter: form.newsletter.is_some(),
    };
    ctx.state.gateway.update_profile(&ctx.scope(), &update).await?;
    Ok(Redirect::to(&with_notice("/account", "account.saved")).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<String>,
}

impl PageQuery {
    pub fn number(&self) -> u32 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(1)
            .max(1)
    }
}

#[derive(Debug, Clone)]
pub struct OrderRow {
    pub id: String,
    pub number: String,
    pub date: String,
    pub status: String,
    pub items: u32,
    pub total: String,
}

#[derive(Template)]
#[template(path = "orders.html")]
struct OrdersTemplate {
    chrome: Chrome,
    orders: Vec<OrderRow>,
    pager: Option<Pager>,
}

pub async fn orders(ctx: PageContext, Query(query): Query<PageQuery>) -> IngressResult<Response> {
    if !ctx.signed_in() {
        return Ok(ctx.login_redirect());
    }
    let page = ctx.state.gateway.list_orders(&ctx.scope(), query.number()).await?;
    let locale = &ctx.tenant.locale;

    let orders = page
        .items
        .iter()
        .map(|o| OrderRow {
            id: o.id.clone(),
            number: o.number.clone(),
            date: ctx.date(&o.placed_at),
            status: o.status.clone(),
            items: o.item_count,
            total: o.total().format(locale),
        })
        .collect();
    let title = ctx.t("orders.title").to_string();

    render(&OrdersTemplate {
        chrome: ctx.chrome_with(ctx.seo(&title, None).noindex()),
        orders,
        pager: Pager::new(&ctx, &page, |n| format!("/account/orders?page={}", n)),
    })
}

#[derive(Template)]
#[template(path = "order_detail.html")]
struct OrderDetailTemplate {
    chrome: Chrome,
    id: String,
    number: String,
    date: String,
    status: String,
    lines: Vec<OrderLineView>,
    subtotal: String,
    shipping: String,
    discount: Option<String>,
    total: String,
    shipping_address: Vec<String>,
    billing_address: Vec<String>,
}

/// Address as display lines
pub fn address_lines(address: Option<&Address>) -> Vec<String> {
    let Some(a) = address else {
        return Vec::new();
    };
    let mut lines = vec![format!("{} {}", a.first_name, a.last_name), a.line1.clone()];
    lines.extend(a.line2.clone());
    let city = match &a.region {
        Some(region) => format!("{} {}, {}", a.postal_code, a.city, region),
        None => format!("{} {}", a.postal_code, a.city),
    };
    lines.push(city);
    lines.push(a.country.clone());
    lines
}

pub async fn order_detail(ctx: PageContext, Path(id): Path<String>) -> IngressResult<Response> {
    if !ctx.signed_in() {
        return Ok(ctx.login_redirect());
    }
    let order = ctx.state.gateway.get_order(&ctx.scope(), &id).await?;
    let locale = &ctx.tenant.locale;
    let title = format!("{} {}", ctx.t("orders.number"), order.number);

    render(&OrderDetailTemplate {
        chrome: ctx.chrome_with(ctx.seo(&title, None).noindex()),
        lines: order_lines(&ctx, &order),
        date: ctx.date(&order.placed_at),
        subtotal: order.money(order.subtotal_minor).format(locale),
        shipping: order.money(order.shipping_minor).format(locale),
        discount: (order.discount_minor > 0).then(|| order.money(order.discount_minor).format(locale)),
        total: order.money(order.total_minor).format(locale),
        shipping_address: address_lines(order.shipping_address.as_ref()),
        billing_address: address_lines(order.billing_address.as_ref()),
        id: order.id,
        number: order.number,
        status: order.status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_number() {
        assert_eq!(PageQuery::default().number(), 1);
        assert_eq!(PageQuery { page: Some("3".into()) }.number(), 3);
        assert_eq!(PageQuery { page: Some("0".into()) }.number(), 1);
        assert_eq!(PageQuery { page: Some("x".into()) }.number(), 1);
    }

    #[test]
    fn test_address_lines() {
        let address = Address {
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            line1: "Main St 1".into(),
            line2: Some("Apt 4".into()),
            city: "Berlin".into(),
            postal_code: "10115".into(),
            region: None,
            country: "DE".into(),
            phone: None,
        };
        assert_eq!(
            address_lines(Some(&address)),
            vec!["Ann Lee", "Main St 1", "Apt 4", "10115 Berlin", "DE"]
        );
        assert!(address_lines(None).is_empty());
    }
}
