//! Commerce backend data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_core::{Address, CartState, Currency, Money};

/// Largest page the backend is asked for
pub const MAX_PAGE_SIZE: u32 = 96;
pub const DEFAULT_PAGE_SIZE: u32 = 24;

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u32 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.page_size)) as u32
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

// Catalog

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    Newest,
    Name,
}

impl ProductSort {
    pub const ALL: [ProductSort; 5] = [
        ProductSort::Relevance,
        ProductSort::PriceAsc,
        ProductSort::PriceDesc,
        ProductSort::Newest,
        ProductSort::Name,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductSort::Relevance => "relevance",
            ProductSort::PriceAsc => "price_asc",
            ProductSort::PriceDesc => "price_desc",
            ProductSort::Newest => "newest",
            ProductSort::Name => "name",
        }
    }

    /// Lenient parse for query strings; unknown values become `Relevance`
    pub fn parse(value: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .unwrap_or_default()
    }
}

/// Product listing filters, sort order and page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<i64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub in_stock: bool,
    #[serde(default)]
    pub sort: ProductSort,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
}

impl ProductQuery {
    /// Clamp paging, drop blank filters and swap an inverted price range
    pub fn normalized(mut self) -> Self {
        self.category = non_blank(self.category);
        self.brand = non_blank(self.brand);
        self.q = non_blank(self.q);
        self.page = self.page.max(1);
        self.page_size = match self.page_size {
            0 => DEFAULT_PAGE_SIZE,
            n => n.clamp(1, MAX_PAGE_SIZE),
        };
        self.min_price = self.min_price.map(|p| p.max(0));
        self.max_price = self.max_price.map(|p| p.max(0));
        if let (Some(min), Some(max)) = (self.min_price, self.max_price)
            && min > max
        {
            self.min_price = Some(max);
            self.max_price = Some(min);
        }
        self
    }

    /// URL query string (without `?`) for the normalized query
    pub fn to_query_string(&self) -> String {
        serde_urlencoded::to_string(self.clone().normalized()).unwrap_or_default()
    }

    /// Same filters on another page
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub price_minor: i64,
    #[serde(default)]
    pub compare_at_minor: Option<i64>,
    pub currency: Currency,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default = "default_true")]
    pub in_stock: bool,
}

impl ProductSummary {
    pub fn price(&self) -> Money {
        Money::new(self.price_minor, self.currency.clone())
    }

    pub fn compare_at(&self) -> Option<Money> {
        self.compare_at_minor
            .filter(|c| *c > self.price_minor)
            .map(|c| Money::new(c, self.currency.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    /// Overrides the product price when set
    #[serde(default)]
    pub price_minor: Option<i64>,
    #[serde(default = "default_true")]
    pub in_stock: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_minor: i64,
    #[serde(default)]
    pub compare_at_minor: Option<i64>,
    pub currency: Currency,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default = "default_true")]
    pub in_stock: bool,
}

impl Product {
    pub fn price(&self) -> Money {
        Money::new(self.price_minor, self.currency.clone())
    }

    pub fn variant(&self, id: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }

    /// Price for a variant, falling back to the product price
    pub fn price_for(&self, variant: Option<&Variant>) -> Money {
        let minor = variant
            .and_then(|v| v.price_minor)
            .unwrap_or(self.price_minor);
        Money::new(minor, self.currency.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
}

// Account

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub newsletter: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub customer: Customer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub newsletter: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfile {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub newsletter: bool,
}

// Orders

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: String,
    pub number: String,
    pub status: String,
    pub placed_at: DateTime<Utc>,
    pub total_minor: i64,
    pub currency: Currency,
    #[serde(default)]
    pub item_count: u32,
}

impl OrderSummary {
    pub fn total(&self) -> Money {
        Money::new(self.total_minor, self.currency.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(default)]
    pub id: Option<String>,
    pub product_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub quantity: u32,
    pub unit_price_minor: i64,
    pub total_minor: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub number: String,
    pub status: String,
    pub placed_at: DateTime<Utc>,
    pub email: String,
    pub lines: Vec<OrderLine>,
    pub subtotal_minor: i64,
    #[serde(default)]
    pub shipping_minor: i64,
    #[serde(default)]
    pub discount_minor: i64,
    pub total_minor: i64,
    pub currency: Currency,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub billing_address: Option<Address>,
    #[serde(default)]
    pub shipping_method: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

impl Order {
    pub fn money(&self, minor: i64) -> Money {
        Money::new(minor, self.currency.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequestLine {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    pub quantity: u32,
    /// Price the customer saw; the backend re-prices and may reject
    pub unit_price_minor: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub email: String,
    pub currency: Currency,
    pub lines: Vec<OrderRequestLine>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub shipping_method: String,
    pub payment_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon: Option<String>,
}

impl OrderRequest {
    /// Build an order from the cart cookie state.
    ///
    /// Returns the names of missing checkout fields when the draft is
    /// incomplete or the cart is empty (`"cart"`).
    pub fn from_state(state: &CartState) -> std::result::Result<Self, Vec<&'static str>> {
        let mut missing = state.draft.missing_fields();
        if state.cart.is_empty() {
            missing.insert(0, "cart");
        }

        let draft = &state.draft;
        match (
            missing.is_empty(),
            &draft.email,
            &draft.shipping_address,
            draft.effective_billing(),
            &draft.shipping_method,
            &draft.payment_method,
        ) {
            (true, Some(email), Some(shipping), Some(billing), Some(shipping_method), Some(payment_method)) => {
                Ok(Self {
                    email: email.clone(),
                    currency: state.cart.currency.clone(),
                    lines: state
                        .cart
                        .lines
                        .iter()
                        .map(|l| OrderRequestLine {
                            product_id: l.product_id.clone(),
                            variant_id: l.variant_id.clone(),
                            quantity: l.quantity,
                            unit_price_minor: l.unit_price_minor,
                        })
                        .collect(),
                    shipping_address: shipping.clone(),
                    billing_address: billing.clone(),
                    shipping_method: shipping_method.clone(),
                    payment_method: payment_method.clone(),
                    notes: draft.notes.clone(),
                    coupon: draft.coupon.clone(),
                })
            }
            _ => Err(missing),
        }
    }
}

// Returns

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSummary {
    pub id: String,
    pub order_id: String,
    #[serde(default)]
    pub order_number: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnLine {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRequest {
    pub order_id: String,
    pub lines: Vec<ReturnLine>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

// Content

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    /// Sanitized HTML from the CMS
    pub body_html: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPage {
    pub slug: String,
    pub title: String,
    pub body_html: String,
    #[serde(default)]
    pub meta_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

fn default_true() -> bool {
    true
}
