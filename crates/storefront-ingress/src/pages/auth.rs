//! Sign in, registration and sign out

use askama::Template;
use axum::Form;
use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use storefront_egress::EgressError;
use storefront_egress::models::{AuthSession, LoginRequest, RegisterRequest};
use tracing::{debug, info};

use super::render;
use crate::context::{Chrome, PageContext, safe_next, with_notice};
use crate::types::IngressResult;

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    chrome: Chrome,
    email: String,
    next: String,
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "register.html")]
struct RegisterTemplate {
    chrome: Chrome,
    email: String,
    first_name: String,
    last_name: String,
    newsletter: bool,
    error: Option<String>,
}

fn login_page(ctx: &PageContext, email: String, next: String, error: Option<String>) -> IngressResult<Response> {
    let title = ctx.t("auth.login_title").to_string();
    render(&LoginTemplate {
        chrome: ctx.chrome_with(ctx.seo(&title, None).noindex()),
        email,
        next,
        error,
    })
}

/// Store the backend session token and continue
fn signed_in(ctx: &PageContext, session: &AuthSession, next: &str) -> Response {
    info!(tenant = %ctx.tenant.key(), customer = %session.customer.id, "Customer signed in");
    let jar = ctx.jar.clone().add(ctx.cookies().auth_cookie(&session.token));
    (jar, Redirect::to(next)).into_response()
}

pub async fn login_form(ctx: PageContext, Query(query): Query<NextQuery>) -> IngressResult<Response> {
    if ctx.signed_in() {
        return Ok(Redirect::to(&safe_next(query.next.as_deref())).into_response());
    }
    login_page(&ctx, String::new(), safe_next(query.next.as_deref()), None)
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

pub async fn login(ctx: PageContext, Form(form): Form<LoginForm>) -> IngressResult<Response> {
    let next = safe_next(form.next.as_deref());
    let request = LoginRequest {
        email: form.email.trim().to_string(),
        password: form.password,
    };

    match ctx.state.gateway.login(&ctx.scope(), &request).await {
        Ok(session) => Ok(signed_in(&ctx, &session, &next)),
        Err(EgressError::Unauthorized | EgressError::Validation(_) | EgressError::NotFound(_)) => {
            debug!(tenant = %ctx.tenant.key(), "Sign-in rejected");
            let error = Some(ctx.t("auth.error.invalid").to_string());
            let page = login_page(&ctx, request.email, next, error)?;
            Ok((StatusCode::UNAUTHORIZED, page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn register_form(ctx: PageContext) -> IngressResult<Response> {
    if ctx.signed_in() {
        return Ok(Redirect::to("/account").into_response());
    }
    let title = ctx.t("auth.register_title").to_string();
    render(&RegisterTemplate {
        chrome: ctx.chrome_with(ctx.seo(&title, None).noindex()),
        email: String::new(),
        first_name: String::new(),
        last_name: String::new(),
        newsletter: false,
        error: None,
    })
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub newsletter: Option<String>,
}

pub async fn register(ctx: PageContext, Form(form): Form<RegisterForm>) -> IngressResult<Response> {
    let request = RegisterRequest {
        email: form.email.trim().to_string(),
        password: form.password,
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        newsletter: form.newsletter.is_some(),
    };

    match ctx.state.gateway.register(&ctx.scope(), &request).await {
        Ok(session) => Ok(signed_in(&ctx, &session, "/account")),
        Err(EgressError::Validation(message)) => {
            debug!(tenant = %ctx.tenant.key(), error = %message, "Registration rejected");
            let title = ctx.t("auth.register_title").to_string();
            let page = render(&RegisterTemplate {
                chrome: ctx.chrome_with(ctx.seo(&title, None).noindex()),
                error: Some(ctx.t("auth.error.register").to_string()),
                email: request.email,
                first_name: request.first_name,
                last_name: request.last_name,
                newsletter: request.newsletter,
            })?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn logout(ctx: PageContext) -> Response {
    let cookies = ctx.cookies();
    let jar = ctx.jar.clone().add(cookies.expired(&cookies.auth_name));
    (jar, Redirect::to(&with_notice("/", "auth.signed_out"))).into_response()
}
