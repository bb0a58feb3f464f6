//! Explicit language switch

use axum::extract::{Path, Query};
use axum::response::{IntoResponse, Redirect, Response};
use storefront_core::Locale;
use storefront_core::locale::negotiate;
use tracing::debug;

use super::auth::NextQuery;
use crate::context::{PageContext, safe_next};
use crate::types::{IngressError, IngressResult};

/// Store the chosen locale in the locale cookie and go back
pub async fn switch(
    ctx: PageContext,
    Path(code): Path<String>,
    Query(query): Query<NextQuery>,
) -> IngressResult<Response> {
    let requested =
        Locale::parse(&code).map_err(|_| IngressError::InvalidRequest(format!("invalid locale {}", code)))?;
    let locale = negotiate(&requested, &ctx.tenant.profile.supported_locales).ok_or_else(|| {
        IngressError::NotFound(format!("locale {} is not offered by {}", code, ctx.tenant.key()))
    })?;

    debug!(tenant = %ctx.tenant.key(), locale = %locale, "Locale switched");
    let jar = ctx.jar.clone().add(ctx.cookies().locale_cookie(locale.as_str()));
    Ok((jar, Redirect::to(&safe_next(query.next.as_deref()))).into_response())
}
