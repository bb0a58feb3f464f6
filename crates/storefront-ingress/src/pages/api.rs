//! JSON endpoints for client scripts

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use storefront_core::{CartAction, CartState, Theme};

use super::cart::{apply, priced_line};
use crate::context::PageContext;
use crate::types::{IngressError, IngressResult};

#[derive(Debug, Serialize)]
pub struct ContextResponse {
    pub tenant: String,
    pub name: String,
    pub locale: String,
    pub locale_source: &'static str,
    pub direction: &'static str,
    pub supported_locales: Vec<String>,
    pub currency: String,
    pub theme: Theme,
    pub signed_in: bool,
}

pub async fn context(ctx: PageContext) -> Json<ContextResponse> {
    let profile = &ctx.tenant.profile;
    Json(ContextResponse {
        tenant: profile.key.to_string(),
        name: profile.display_name.clone(),
        locale: ctx.tenant.locale.to_string(),
        locale_source: ctx.tenant.locale_source.as_str(),
        direction: ctx.tenant.locale.direction(),
        supported_locales: profile.supported_locales.iter().map(|l| l.to_string()).collect(),
        currency: profile.currency.code().to_string(),
        theme: profile.theme.clone(),
        signed_in: ctx.signed_in(),
    })
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    #[serde(flatten)]
    pub state: CartState,
    pub item_count: u32,
    pub subtotal_minor: i64,
    /// Subtotal formatted for the request locale
    pub subtotal: String,
    pub missing: Vec<&'static str>,
}

impl CartResponse {
    fn new(ctx: &PageContext, state: CartState) -> Self {
        let subtotal = state.cart.subtotal();
        Self {
            item_count: state.cart.item_count(),
            subtotal_minor: subtotal.amount_minor,
            subtotal: subtotal.format(&ctx.tenant.locale),
            missing: state.draft.missing_fields(),
            state,
        }
    }
}

pub async fn cart(ctx: PageContext) -> Json<CartResponse> {
    let state = ctx.cart();
    Json(CartResponse::new(&ctx, state))
}

/// Run a reducer action against the cart cookie.
///
/// Item data sent by the client is replaced with backend data before the
/// action is applied, so the client cannot set prices.
pub async fn cart_action(ctx: PageContext, Json(action): Json<CartAction>) -> IngressResult<Response> {
    let action = match action {
        CartAction::AddItem { line } => {
            let slug = line
                .slug
                .clone()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| IngressError::InvalidRequest("add_item needs a product slug".to_string()))?;
            CartAction::AddItem {
                line: priced_line(&ctx, &slug, line.variant_id.as_deref(), line.quantity).await?,
            }
        }
        other => other,
    };

    let (jar, state) = apply(&ctx, [action])?;
    Ok((jar, Json(CartResponse::new(&ctx, state))).into_response())
}
