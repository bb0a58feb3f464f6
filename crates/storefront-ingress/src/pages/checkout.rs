//! Checkout, order placement and order confirmation

use askama::Template;
use axum::Form;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use storefront_core::{Address, CartAction, CartError, CartState, OrderDraft};
use storefront_egress::EgressError;
use storefront_egress::models::{Order, OrderRequest};
use tracing::{info, warn};

use super::cart::{LineView, line_views, reduce_all};
use super::{Choice, render};
use crate::context::{Chrome, PageContext};
use crate::i18n;
use crate::types::IngressResult;

pub const SHIPPING_METHODS: &[&str] = &["standard", "express"];
pub const PAYMENT_METHODS: &[&str] = &["card", "paypal", "invoice"];

/// Checkout form fields, also used to refill the form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutForm {
    pub email: String,
    pub ship_first_name: String,
    pub ship_last_name: String,
    pub ship_line1: String,
    pub ship_line2: String,
    pub ship_city: String,
    pub ship_postal_code: String,
    pub ship_region: String,
    pub ship_country: String,
    pub ship_phone: String,
    /// Checkbox: present when billing equals shipping
    pub billing_same: Option<String>,
    pub bill_first_name: String,
    pub bill_last_name: String,
    pub bill_line1: String,
    pub bill_line2: String,
    pub bill_city: String,
    pub bill_postal_code: String,
    pub bill_region: String,
    pub bill_country: String,
    pub shipping_method: String,
    pub payment_method: String,
    pub notes: String,
    pub coupon: String,
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl CheckoutForm {
    pub fn from_draft(draft: &OrderDraft) -> Self {
        let ship = draft.shipping_address.clone().unwrap_or_default();
        let bill = draft.billing_address.clone().unwrap_or_default();
        Self {
            email: draft.email.clone().unwrap_or_default(),
            ship_first_name: ship.first_name,
            ship_last_name: ship.last_name,
            ship_line1: ship.line1,
            ship_line2: ship.line2.unwrap_or_default(),
            ship_city: ship.city,
            ship_postal_code: ship.postal_code,
            ship_region: ship.region.unwrap_or_default(),
            ship_country: ship.country,
            ship_phone: ship.phone.unwrap_or_default(),
            billing_same: draft.billing_same_as_shipping.then(|| "on".to_string()),
            bill_first_name: bill.first_name,
            bill_last_name: bill.last_name,
            bill_line1: bill.line1,
            bill_line2: bill.line2.unwrap_or_default(),
            bill_city: bill.city,
            bill_postal_code: bill.postal_code,
            bill_region: bill.region.unwrap_or_default(),
            bill_country: bill.country,
            shipping_method: draft.shipping_method.clone().unwrap_or_default(),
            payment_method: draft.payment_method.clone().unwrap_or_default(),
            notes: draft.notes.clone().unwrap_or_default(),
            coupon: draft.coupon.clone().unwrap_or_default(),
        }
    }

    pub fn billing_same(&self) -> bool {
        self.billing_same.is_some()
    }

    fn shipping_address(&self) -> Address {
        Address {
            first_name: self.ship_first_name.trim().to_string(),
            last_name: self.ship_last_name.trim().to_string(),
            line1: self.ship_line1.trim().to_string(),
            line2: optional(&self.ship_line2),
            city: self.ship_city.trim().to_string(),
            postal_code: self.ship_postal_code.trim().to_string(),
            region: optional(&self.ship_region),
            country: self.ship_country.trim().to_ascii_uppercase(),
            phone: optional(&self.ship_phone),
        }
    }

    fn billing_address(&self) -> Address {
        Address {
            first_name: self.bill_first_name.trim().to_string(),
            last_name: self.bill_last_name.trim().to_string(),
            line1: self.bill_line1.trim().to_string(),
            line2: optional(&self.bill_line2),
            city: self.bill_city.trim().to_string(),
            postal_code: self.bill_postal_code.trim().to_string(),
            region: optional(&self.bill_region),
            country: self.bill_country.trim().to_ascii_uppercase(),
            phone: None,
        }
    }

    /// Reducer actions that store this form in the order draft
    pub fn actions(&self) -> Vec<CartAction> {
        let mut actions = Vec::new();
        if optional(&self.email).is_some() {
            actions.push(CartAction::SetEmail {
                email: self.email.clone(),
            });
        }
        actions.push(CartAction::SetShippingAddress {
            address: self.shipping_address(),
        });
        actions.push(CartAction::SetBillingAddress {
            same_as_shipping: self.billing_same(),
            address: (!self.billing_same()).then(|| self.billing_address()),
        });
        if SHIPPING_METHODS.contains(&self.shipping_method.as_str()) {
            actions.push(CartAction::SetShippingMethod {
                method: self.shipping_method.clone(),
            });
        }
        if PAYMENT_METHODS.contains(&self.payment_method.as_str()) {
            actions.push(CartAction::SetPaymentMethod {
                method: self.payment_method.clone(),
            });
        }
        actions.push(CartAction::SetNotes {
            notes: optional(&self.notes),
        });
        actions.push(match optional(&self.coupon) {
            Some(code) => CartAction::ApplyCoupon { code },
            None => CartAction::RemoveCoupon,
        });
        actions
    }
}

#[derive(Template)]
#[template(path = "checkout.html")]
struct CheckoutTemplate {
    chrome: Chrome,
    form: CheckoutForm,
    lines: Vec<LineView>,
    subtotal: String,
    shipping_methods: Vec<Choice>,
    payment_methods: Vec<Choice>,
    errors: Vec<String>,
}

fn checkout_page(
    ctx: &PageContext,
    state: &CartState,
    form: CheckoutForm,
    errors: Vec<String>,
) -> IngressResult<Response> {
    let title = ctx.t("checkout.title").to_string();
    let choices = |methods: &[&str], prefix: &str, selected: &str| -> Vec<Choice> {
        methods
            .iter()
            .map(|m| {
                let key = format!("{}.{}", prefix, m);
                Choice::new(*m, ctx.t(&key), *m == selected)
            })
            .collect()
    };

    render(&CheckoutTemplate {
        chrome: ctx.chrome_with(ctx.seo(&title, None).noindex()),
        shipping_methods: choices(SHIPPING_METHODS, "shipping", &form.shipping_method),
        payment_methods: choices(PAYMENT_METHODS, "payment", &form.payment_method),
        lines: line_views(ctx, state),
        subtotal: state.cart.subtotal().format(&ctx.tenant.locale),
        form,
        errors,
    })
}

fn cart_error_text(ctx: &PageContext, err: &CartError) -> String {
    let key = format!("cart.error.{}", err.code());
    ctx.t(&key).to_string()
}

fn missing_message(ctx: &PageContext, missing: &[&str]) -> String {
    let fields: Vec<&str> = missing
        .iter()
        .map(|name| {
            let key = format!("field.{}", name);
            match ctx.bundle.get(&key) {
                Some(text) => text,
                None => i18n::default_text(&key).unwrap_or(*name),
            }
        })
        .collect();
    ctx.format("checkout.missing", &[("fields", &fields.join(", "))])
}

pub async fn show(ctx: PageContext) -> IngressResult<Response> {
    let state = ctx.cart();
    if state.cart.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }
    let form = CheckoutForm::from_draft(&state.draft);
    checkout_page(&ctx, &state, form, Vec::new())
}

/// Store the form in the draft, then place the order once nothing is missing
pub async fn submit(ctx: PageContext, Form(form): Form<CheckoutForm>) -> IngressResult<Response> {
    if ctx.cart().cart.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    // Keep valid fields even when one is rejected
    let mut errors = Vec::new();
    let mut state = ctx.cart();
    for action in form.actions() {
        match reduce_all(&ctx, state.clone(), [action]) {
            Ok(next) => state = next,
            Err(e) => errors.push(cart_error_text(&ctx, &e)),
        }
    }
    let jar = match ctx.cookies().write_cart(ctx.jar.clone(), ctx.tenant.key(), &state) {
        Ok(jar) => jar,
        Err(e) => {
            errors.push(cart_error_text(&ctx, &e));
            ctx.jar.clone()
        }
    };

    let missing = match OrderRequest::from_state(&state) {
        Ok(order) if errors.is_empty() => return place(&ctx, jar, &state, form, order).await,
        Ok(_) => Vec::new(),
        Err(missing) => missing,
    };
    if !missing.is_empty() {
        errors.push(missing_message(&ctx, &missing));
    }

    let page = checkout_page(&ctx, &state, form, errors)?;
    Ok((StatusCode::UNPROCESSABLE_ENTITY, jar, page).into_response())
}

async fn place(
    ctx: &PageContext,
    jar: CookieJar,
    state: &CartState,
    form: CheckoutForm,
    order: OrderRequest,
) -> IngressResult<Response> {
    let placed = match ctx.state.gateway.place_order(&ctx.scope(), &order).await {
        Ok(placed) => placed,
        Err(EgressError::Validation(message)) => {
            warn!(tenant = %ctx.tenant.key(), error = %message, "Order rejected by backend");
            let errors = vec![ctx.t("checkout.rejected").to_string()];
            let page = checkout_page(ctx, state, form, errors)?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, jar, page).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    info!(
        tenant = %ctx.tenant.key(),
        order = %placed.number,
        lines = order.lines.len(),
        "Order placed"
    );

    let jar = ctx
        .cookies()
        .write_cart(jar, ctx.tenant.key(), &CartState::new(ctx.tenant.currency().clone()))
        .unwrap_or_else(|_| ctx.jar.clone());
    if let Some(metrics) = &ctx.state.metrics {
        metrics.record_cart_mutation(ctx.tenant.key().as_str(), "place_order", true);
    }

    let target = format!(
        "/checkout/confirmation/{}?{}",
        storefront_egress::api::path_segment(&placed.id),
        serde_urlencoded::to_string([("number", placed.number.as_str())]).unwrap_or_default()
    );
    Ok((jar, Redirect::to(&target)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ConfirmationQuery {
    #[serde(default)]
    pub number: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub name: String,
    pub quantity: u32,
    pub total: String,
}

#[derive(Template)]
#[template(path = "confirmation.html")]
struct ConfirmationTemplate {
    chrome: Chrome,
    number: String,
    lines: Vec<OrderLineView>,
    total: Option<String>,
}

pub fn order_lines(ctx: &PageContext, order: &Order) -> Vec<OrderLineView> {
    order
        .lines
        .iter()
        .map(|l| OrderLineView {
            name: l.name.clone(),
            quantity: l.quantity,
            total: order.money(l.total_minor).format(&ctx.tenant.locale),
        })
        .collect()
}

fn display_number(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()
        && value.len() <= 64
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'))
    .then(|| value.to_string())
}

/// Signed-in customers see the order; guests see the order number
pub async fn confirmation(
    ctx: PageContext,
    Path(id): Path<String>,
    Query(query): Query<ConfirmationQuery>,
) -> IngressResult<Response> {
    let title = ctx.t("confirmation.title").to_string();
    let chrome = ctx.chrome_with(ctx.seo(&title, None).noindex());

    if ctx.signed_in() {
        let order = ctx.state.gateway.get_order(&ctx.scope(), &id).await?;
        return render(&ConfirmationTemplate {
            chrome,
            lines: order_lines(&ctx, &order),
            total: Some(order.money(order.total_minor).format(&ctx.tenant.locale)),
            number: order.number,
        });
    }

    render(&ConfirmationTemplate {
        chrome,
        number: query
            .number
            .as_deref()
            .and_then(display_number)
            .or_else(|| display_number(&id))
            .unwrap_or_default(),
        lines: Vec::new(),
        total: None,
    })
}
