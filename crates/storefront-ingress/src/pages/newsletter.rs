//! Newsletter sign-up from the page footer

use axum::Form;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use storefront_core::cart::looks_like_email;
use storefront_egress::EgressError;
use tracing::{debug, info};

use crate::context::{PageContext, safe_next, with_notice};
use crate::types::IngressResult;

#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub next: Option<String>,
}

pub async fn subscribe(ctx: PageContext, Form(form): Form<SubscribeForm>) -> IngressResult<Response> {
    let back = safe_next(form.next.as_deref());
    if !looks_like_email(&form.email) {
        return Ok(Redirect::to(&with_notice(&back, "newsletter.invalid")).into_response());
    }

    match ctx.state.gateway.subscribe(&ctx.scope(), &form.email).await {
        Ok(()) => {
            info!(tenant = %ctx.tenant.key(), "Newsletter subscription");
            Ok(Redirect::to(&with_notice(&back, "newsletter.subscribed")).into_response())
        }
        Err(EgressError::Validation(message)) => {
            debug!(tenant = %ctx.tenant.key(), error = %message, "Subscription rejected");
            Ok(Redirect::to(&with_notice(&back, "newsletter.invalid")).into_response())
        }
        Err(e) => Err(e.into()),
    }
}
