//! Return requests

use askama::Template;
use axum::Form;
use axum::extract::Query;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use std::collections::BTreeMap;
use storefront_egress::models::{ReturnLine, ReturnRequest};
use tracing::info;

use super::{Choice, render};
use crate::context::{Chrome, PageContext, with_notice};
use crate::types::{IngressError, IngressResult};

pub const REASONS: &[&str] = &["damaged", "wrong_item", "not_as_described", "changed_mind"];

#[derive(Debug, Clone)]
pub struct ReturnRow {
    pub order: String,
    pub date: String,
    pub status: String,
    pub reason: String,
}

#[derive(Template)]
#[template(path = "returns.html")]
struct ReturnsTemplate {
    chrome: Chrome,
    returns: Vec<ReturnRow>,
}

pub async fn list(ctx: PageContext) -> IngressResult<Response> {
    if !ctx.signed_in() {
        return Ok(ctx.login_redirect());
    }
    let returns = ctx.state.gateway.list_returns(&ctx.scope()).await?;

    let rows = returns
        .iter()
        .map(|r| {
            let reason_key = format!("reason.{}", r.reason);
            ReturnRow {
                order: r.order_number.clone().unwrap_or_else(|| r.order_id.clone()),
                date: ctx.date(&r.created_at),
                status: r.status.clone(),
                reason: ctx.t(&reason_key).to_string(),
            }
        })
        .collect();
    let title = ctx.t("returns.title").to_string();

    render(&ReturnsTemplate {
        chrome: ctx.chrome_with(ctx.seo(&title, None).noindex()),
        returns: rows,
    })
}

#[derive(Debug, Clone)]
pub struct ReturnableLine {
    pub index: usize,
    pub product_id: String,
    pub variant_id: String,
    pub name: String,
    pub quantity: u32,
}

#[derive(Template)]
#[template(path = "return_new.html")]
struct ReturnNewTemplate {
    chrome: Chrome,
    order_id: String,
    number: String,
    lines: Vec<ReturnableLine>,
    reasons: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct NewReturnQuery {
    pub order: String,
}

pub async fn new_form(ctx: PageContext, Query(query): Query<NewReturnQuery>) -> IngressResult<Response> {
    if !ctx.signed_in() {
        return Ok(ctx.login_redirect());
    }
    let order = ctx.state.gateway.get_order(&ctx.scope(), &query.order).await?;

    let lines = order
        .lines
        .iter()
        .enumerate()
        .map(|(index, l)| ReturnableLine {
            index,
            product_id: l.product_id.clone(),
            variant_id: l.variant_id.clone().unwrap_or_default(),
            name: l.name.clone(),
            quantity: l.quantity,
        })
        .collect();
    let reasons = REASONS
        .iter()
        .map(|r| {
            let key = format!("reason.{}", r);
            Choice::new(*r, ctx.t(&key), false)
        })
        .collect();
    let title = ctx.t("returns.new_title").to_string();

    render(&ReturnNewTemplate {
        chrome: ctx.chrome_with(ctx.seo(&title, None).noindex()),
        order_id: order.id,
        number: order.number,
        lines,
        reasons,
    })
}

/// Parse the return form.
///
/// Lines arrive as indexed fields (`product.0`, `variant.0`, `qty.0`, ...);
/// lines with a zero or blank quantity are skipped.
pub fn parse_return_form(fields: &[(String, String)]) -> IngressResult<ReturnRequest> {
    let mut order_id = None;
    let mut reason = None;
    let mut comment = None;
    let mut lines: BTreeMap<usize, (Option<String>, Option<String>, u32)> = BTreeMap::new();

    for (name, value) in fields {
        let value = value.trim();
        match name.as_str() {
            "order_id" => order_id = Some(value.to_string()),
            "reason" => reason = Some(value.to_string()),
            "comment" => comment = Some(value.to_string()).filter(|c| !c.is_empty()),
            _ => {
                let Some((field, index)) = name.split_once('.') else {
                    continue;
                };
                let Ok(index) = index.parse::<usize>() else {
                    continue;
                };
                let entry = lines.entry(index).or_default();
                match field {
                    "product" => entry.0 = Some(value.to_string()),
                    "variant" => entry.1 = Some(value.to_string()).filter(|v| !v.is_empty()),
                    "qty" => entry.2 = value.parse().unwrap_or(0),
                    _ => {}
                }
            }
        }
    }

    let order_id = order_id
        .filter(|o| !o.is_empty())
        .ok_or_else(|| IngressError::InvalidRequest("missing order_id".to_string()))?;
    let reason = reason
        .filter(|r| REASONS.contains(&r.as_str()))
        .ok_or_else(|| IngressError::InvalidRequest("unknown return reason".to_string()))?;

    let lines = lines
        .into_values()
        .filter_map(|(product, variant, quantity)| {
            let product_id = product.filter(|p| !p.is_empty())?;
            (quantity > 0).then_some(ReturnLine {
                product_id,
                variant_id: variant,
                quantity,
            })
        })
        .collect();

    Ok(ReturnRequest {
        order_id,
        lines,
        reason,
        comment,
    })
}

pub async fn create(
    ctx: PageContext,
    Form(fields): Form<Vec<(String, String)>>,
) -> IngressResult<Response> {
    if !ctx.signed_in() {
        return Ok(ctx.login_redirect());
    }
    let request = parse_return_form(&fields)?;

    if request.lines.is_empty() {
        let back = format!(
            "/returns/new?{}",
            serde_urlencoded::to_string([("order", request.order_id.as_str())]).unwrap_or_default()
        );
        return Ok(Redirect::to(&with_notice(&back, "returns.error.no_lines")).into_response());
    }

    let created = ctx.state.gateway.create_return(&ctx.scope(), &request).await?;
    info!(tenant = %ctx.tenant.key(), return_id = %created.id, order = %request.order_id, "Return requested");

    Ok(Redirect::to(&with_notice("/account/returns", "returns.created")).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_return_form() {
        let request = parse_return_form(&fields(&[
            ("order_id", "o-1"),
            ("reason", "damaged"),
            ("comment", "  "),
            ("product.0", "p1"),
            ("variant.0", ""),
            ("qty.0", "1"),
            ("product.1", "p2"),
            ("variant.1", "v2"),
            ("qty.1", "0"),
            ("product.2", "p3"),
            ("variant.2", "v3"),
            ("qty.2", "2"),
        ]))
        .unwrap();

        assert_eq!(request.order_id, "o-1");
        assert_eq!(request.comment, None);
        assert_eq!(
            request.lines,
            vec![
                ReturnLine {
                    product_id: "p1".into(),
                    variant_id: None,
                    quantity: 1
                },
                ReturnLine {
                    product_id: "p3".into(),
                    variant_id: Some("v3".into()),
                    quantity: 2
                },
            ]
        );
    }

    #[test]
    fn test_unknown_reason_is_rejected() {
        let err = parse_return_form(&fields(&[("order_id", "o-1"), ("reason", "bored")])).unwrap_err();
        assert!(matches!(err, IngressError::InvalidRequest(_)));
    }

    #[test]
    fn test_missing_order_is_rejected() {
        let err = parse_return_form(&fields(&[("reason", "damaged")])).unwrap_err();
        assert!(matches!(err, IngressError::InvalidRequest(_)));
    }

    #[test]
    fn test_no_selected_lines() {
        let request = parse_return_form(&fields(&[
            ("order_id", "o-1"),
            ("reason", "changed_mind"),
            ("product.0", "p1"),
            ("qty.0", ""),
        ]))
        .unwrap();
        assert!(request.lines.is_empty());
    }
}
