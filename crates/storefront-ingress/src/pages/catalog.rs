//! Product listing and product detail pages

use askama::Template;
use axum::extract::{Path, Query};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use storefront_core::Currency;
use storefront_egress::models::{Product, ProductQuery, ProductSort};
use tracing::warn;

use super::{Choice, Pager, ProductCard, render};
use crate::context::{Chrome, PageContext};
use crate::types::IngressResult;

/// Meta descriptions are cut to this many characters
const DESCRIPTION_CHARS: usize = 160;

/// Listing filters as they arrive from the filter form.
///
/// Everything is optional text so a blank form field never rejects the
/// request. Prices are in major units.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
}

impl ListingParams {
    pub fn in_stock(&self) -> bool {
        matches!(self.in_stock.as_deref(), Some("true" | "on" | "1"))
    }

    pub fn to_query(&self, currency: &Currency) -> ProductQuery {
        let digits = currency.minor_digits();
        ProductQuery {
            category: self.category.clone(),
            brand: self.brand.clone(),
            q: self.q.clone(),
            min_price: self.min_price.as_deref().and_then(|p| parse_major(p, digits)),
            max_price: self.max_price.as_deref().and_then(|p| parse_major(p, digits)),
            in_stock: self.in_stock(),
            sort: ProductSort::parse(self.sort.as_deref().unwrap_or_default()),
            page: self
                .page
                .as_deref()
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(1),
            page_size: 0,
        }
        .normalized()
    }

    /// Listing URL with the same filters on `page`
    pub fn href(&self, page: u32) -> String {
        let params = Self {
            page: (page > 1).then(|| page.to_string()),
            ..self.clone()
        };
        match serde_urlencoded::to_string(&params) {
            Ok(query) if !query.is_empty() => format!("/products?{}", query),
            _ => "/products".to_string(),
        }
    }
}

/// Parse a major-unit amount like `12` or `12.5` into minor units
pub fn parse_major(value: &str, digits: u32) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let (whole, fraction) = value.split_once(['.', ',']).unwrap_or((value, ""));
    if fraction.len() > digits as usize
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let scale = 10i64.checked_pow(digits)?;
    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let fraction: i64 = if fraction.is_empty() {
        0
    } else {
        format!("{:0<width$}", fraction, width = digits as usize).parse().ok()?
    };
    whole.checked_mul(scale)?.checked_add(fraction)
}

fn summarize(text: &str) -> String {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() <= DESCRIPTION_CHARS {
        return text;
    }
    let cut: String = text.chars().take(DESCRIPTION_CHARS - 1).collect();
    format!("{}…", cut.trim_end())
}

#[derive(Template)]
#[template(path = "product_list.html")]
struct ProductListTemplate {
    chrome: Chrome,
    heading: String,
    products: Vec<ProductCard>,
    total: u64,
    categories: Vec<Choice>,
    sorts: Vec<Choice>,
    q: String,
    brand: String,
    min_price: String,
    max_price: String,
    in_stock: bool,
    pager: Option<Pager>,
}

pub async fn list(ctx: PageContext, Query(params): Query<ListingParams>) -> IngressResult<Response> {
    let query = params.to_query(ctx.tenant.currency());
    let scope = ctx.scope();
    let gateway = &ctx.state.gateway;

    let (page, categories) = tokio::join!(
        gateway.list_products(&scope, &query),
        gateway.list_categories(&scope),
    );
    let page = page?;

    // Filters still work without the category menu
    let categories = categories.unwrap_or_else(|e| {
        warn!(tenant = %ctx.tenant.key(), error = %e, "Categories unavailable");
        Vec::new()
    });

    let selected = categories
        .iter()
        .find(|c| query.category.as_deref() == Some(c.slug.as_str()));
    let heading = selected
        .map(|c| c.name.clone())
        .unwrap_or_else(|| ctx.t("products.title").to_string());

    let mut category_choices = vec![Choice::new(
        "",
        ctx.t("products.all_categories"),
        query.category.is_none(),
    )];
    category_choices.extend(categories.iter().map(|c| {
        Choice::new(
            c.slug.clone(),
            c.name.clone(),
            query.category.as_deref() == Some(c.slug.as_str()),
        )
    }));

    let sorts = ProductSort::ALL
        .iter()
        .map(|s| {
            let key = format!("sort.{}", s.as_str());
            Choice::new(s.as_str(), ctx.t(&key), *s == query.sort)
        })
        .collect();

    let pager = Pager::new(&ctx, &page, |n| params.href(n));
    let products = page.items.iter().map(|p| ProductCard::new(&ctx, p)).collect();

    let mut seo = ctx.seo(&heading, None);
    if query.page > 1 || query.q.is_some() {
        seo = seo.noindex();
    }

    render(&ProductListTemplate {
        chrome: ctx.chrome_with(seo),
        heading,
        products,
        total: page.total,
        categories: category_choices,
        sorts,
        q: query.q.clone().unwrap_or_default(),
        brand: query.brand.clone().unwrap_or_default(),
        min_price: params.min_price.clone().unwrap_or_default(),
        max_price: params.max_price.clone().unwrap_or_default(),
        in_stock: query.in_stock,
        pager,
    })
}

#[derive(Debug, Clone)]
pub struct VariantOption {
    pub id: String,
    pub label: String,
    pub in_stock: bool,
}

#[derive(Template)]
#[template(path = "product_detail.html")]
struct ProductDetailTemplate {
    chrome: Chrome,
    slug: String,
    name: String,
    description: String,
    price: String,
    compare_at: Option<String>,
    images: Vec<String>,
    brand: Option<String>,
    sku: Option<String>,
    in_stock: bool,
    variants: Vec<VariantOption>,
}

fn variant_options(ctx: &PageContext, product: &Product) -> Vec<VariantOption> {
    product
        .variants
        .iter()
        .map(|v| {
            let price = product.price_for(Some(v)).format(&ctx.tenant.locale);
            VariantOption {
                id: v.id.clone(),
                label: format!("{} ({})", v.name, price),
                in_stock: v.in_stock,
            }
        })
        .collect()
}

pub async fn detail(ctx: PageContext, Path(slug): Path<String>) -> IngressResult<Response> {
    let product = ctx.state.gateway.get_product(&ctx.scope(), &slug).await?;
    let locale = &ctx.tenant.locale;

    let seo = ctx
        .seo(&product.name, Some(&summarize(&product.description)))
        .with_og_type("product")
        .with_image(product.images.first().cloned());

    render(&ProductDetailTemplate {
        chrome: ctx.chrome_with(seo),
        variants: variant_options(&ctx, &product),
        price: product.price().format(locale),
        compare_at: product
            .compare_at_minor
            .filter(|c| *c > product.price_minor)
            .map(|c| ctx.money(c, &product.currency)),
        slug: product.slug,
        name: product.name,
        description: product.description,
        images: product.images,
        brand: product.brand,
        sku: product.sku,
        in_stock: product.in_stock,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eur() -> Currency {
        Currency::parse("EUR").unwrap()
    }

    #[test]
    fn test_parse_major() {
        assert_eq!(parse_major("12", 2), Some(1200));
        assert_eq!(parse_major("12.5", 2), Some(1250));
        assert_eq!(parse_major("12,05", 2), Some(1205));
        assert_eq!(parse_major(" 0.99 ", 2), Some(99));
        assert_eq!(parse_major("500", 0), Some(500));
        assert_eq!(parse_major("", 2), None);
        assert_eq!(parse_major("1.234", 2), None);
        assert_eq!(parse_major("-5", 2), None);
        assert_eq!(parse_major("abc", 2), None);
    }

    #[test]
    fn test_blank_form_fields_are_ignored() {
        let params: ListingParams =
            serde_urlencoded::from_str("category=&brand=&q=&min_price=&max_price=&sort=&page=").unwrap();
        let query = params.to_query(&eur());
        assert_eq!(query.category, None);
        assert_eq!(query.min_price, None);
        assert_eq!(query.sort, ProductSort::Relevance);
        assert_eq!(query.page, 1);
        assert!(!query.in_stock);
    }

    #[test]
    fn test_listing_query() {
        let params: ListingParams = serde_urlencoded::from_str(
            "category=boots&min_price=50&max_price=20&in_stock=on&sort=price_desc&page=3",
        )
        .unwrap();
        let query = params.to_query(&eur());
        assert_eq!(query.category.as_deref(), Some("boots"));
        // Inverted range is swapped
        assert_eq!(query.min_price, Some(2000));
        assert_eq!(query.max_price, Some(5000));
        assert!(query.in_stock);
        assert_eq!(query.sort, ProductSort::PriceDesc);
        assert_eq!(query.page, 3);
    }

    #[test]
    fn test_href_keeps_filters() {
        let params: ListingParams = serde_urlencoded::from_str("category=boots&page=2").unwrap();
        assert_eq!(params.href(3), "/products?category=boots&page=3");
        assert_eq!(params.href(1), "/products?category=boots");
        assert_eq!(ListingParams::default().href(1), "/products");
    }

    #[test]
    fn test_summarize() {
        assert_eq!(summarize("  Warm\n  boots "), "Warm boots");
        let long = "word ".repeat(100);
        let summary = summarize(&long);
        assert!(summary.chars().count() <= DESCRIPTION_CHARS);
        assert!(summary.ends_with('…'));
    }
}
