//! Shopping cart and order draft state
//!
//! The cart lives on the client (persisted to a cookie by the ingress layer).
//! All mutations go through [`reduce`], a pure function from state and action
//! to the next state, so the same rules apply to form posts and JSON calls.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Currency, Money};


/// Upper bound for a single line's quantity
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Upper bound for distinct lines, keeps the cookie small
pub const MAX_LINES: usize = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("Currency mismatch: cart is {cart}, item is {item}")]
    CurrencyMismatch { cart: String, item: String },

    #[error("Cart is full ({0} lines)")]
    TooManyLines(usize),

    #[error("Line not found: {0}")]
    LineNotFound(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),

    #[error("Invalid price: {0}")]
    InvalidPrice(i64),

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Encoded cart is {size} bytes, limit is {max}")]
    TooLarge { size: usize, max: usize },
}

impl CartError {
    /// Stable identifier, used as a translation key suffix
    pub fn code(&self) -> &'static str {
        match self {
            CartError::CurrencyMismatch { .. } => "currency_mismatch",
            CartError::TooManyLines(_) => "too_many_lines",
            CartError::LineNotFound(_) => "line_not_found",
            CartError::InvalidQuantity(_) => "invalid_quantity",
            CartError::InvalidPrice(_) => "invalid_price",
            CartError::InvalidEmail => "invalid_email",
            CartError::TooLarge { .. } => "too_large",
        }
    }
}

/// One product (variant) in the cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub unit_price_minor: i64,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CartLine {
    /// Stable identifier of the line: `product` or `product:variant`
    pub fn key(&self) -> String {
        line_key(&self.product_id, self.variant_id.as_deref())
    }

    pub fn total_minor(&self) -> i64 {
        self.unit_price_minor.saturating_mul(i64::from(self.quantity))
    }
}

pub fn line_key(product_id: &str, variant_id: Option<&str>) -> String {
    match variant_id {
        Some(variant) if !variant.is_empty() => format!("{}:{}", product_id, variant),
        _ => product_id.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub currency: Currency,
    #[serde(default)]
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(currency: Currency) -> Self {
        Self {
            currency,
            lines: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn subtotal(&self) -> Money {
        Money::new(
            self.lines
                .iter()
                .map(CartLine::total_minor)
                .fold(0, i64::saturating_add),
            self.currency.clone(),
        )
    }

    fn find_mut(&mut self, key: &str) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.key() == key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// ISO 3166-1 alpha-2
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Address {
    /// Names of required fields that are blank
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("line1", &self.line1),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Checkout details collected before the order is placed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,
    #[serde(default = "default_true")]
    pub billing_same_as_shipping: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon: Option<String>,
}

impl Default for OrderDraft {
    fn default() -> Self {
        Self {
            email: None,
            shipping_address: None,
            billing_same_as_shipping: true,
            billing_address: None,
            shipping_method: None,
            payment_method: None,
            notes: None,
            coupon: None,
        }
    }
}

impl OrderDraft {
    /// Billing address in effect for the order
    pub fn effective_billing(&self) -> Option<&Address> {
        if self.billing_same_as_shipping {
            self.shipping_address.as_ref()
        } else {
            self.billing_address.as_ref()
        }
    }

    /// Names of the fields still needed before the order can be placed
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.email.is_none() {
            missing.push("email");
        }
        match &self.shipping_address {
            Some(address) if address.missing_fields().is_empty() => {}
            _ => missing.push("shipping_address"),
        }
        if !self.billing_same_as_shipping {
            match &self.billing_address {
                Some(address) if address.missing_fields().is_empty() => {}
                _ => missing.push("billing_address"),
            }
        }
        if self.shipping_method.is_none() {
            missing.push("shipping_method");
        }
        if self.payment_method.is_none() {
            missing.push("payment_method");
        }
        missing
    }
}

/// Everything persisted in the cart cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartState {
    pub cart: Cart,
    #[serde(default)]
    pub draft: OrderDraft,
}

impl CartState {
    pub fn new(currency: Currency) -> Self {
        Self {
            cart: Cart::new(currency),
            draft: OrderDraft::default(),
        }
    }

    pub fn checkout_ready(&self) -> bool {
        !self.cart.is_empty() && self.draft.missing_fields().is_empty()
    }
}

/// Item data supplied when adding to the cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLine {
    pub product_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub unit_price: Money,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
}

/// Cart and draft mutations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartAction {
    AddItem { line: NewLine },
    SetQuantity { key: String, quantity: u32 },
    RemoveItem { key: String },
    Clear,
    SetEmail { email: String },
    SetShippingAddress { address: Address },
    SetBillingAddress { same_as_shipping: bool, address: Option<Address> },
    SetShippingMethod { method: String },
    SetPaymentMethod { method: String },
    SetNotes { notes: Option<String> },
    ApplyCoupon { code: String },
    RemoveCoupon,
    ResetDraft,
}

impl CartAction {
    /// Label used for metrics and logs
    pub fn name(&self) -> &'static str {
        match self {
            CartAction::AddItem { .. } => "add_item",
            CartAction::SetQuantity { .. } => "set_quantity",
            CartAction::RemoveItem { .. } => "remove_item",
            CartAction::Clear => "clear",
            CartAction::SetEmail { .. } => "set_email",
            CartAction::SetShippingAddress { .. } => "set_shipping_address",
            CartAction::SetBillingAddress { .. } => "set_billing_address",
            CartAction::SetShippingMethod { .. } => "set_shipping_method",
            CartAction::SetPaymentMethod { .. } => "set_payment_method",
            CartAction::SetNotes { .. } => "set_notes",
            CartAction::ApplyCoupon { .. } => "apply_coupon",
            CartAction::RemoveCoupon => "remove_coupon",
            CartAction::ResetDraft => "reset_draft",
        }
    }
}

/// Apply an action to a state, producing the next state.
pub fn reduce(mut state: CartState, action: CartAction) -> Result<CartState, CartError> {
    match action {
        CartAction::AddItem { line } => {
            if line.quantity == 0 {
                return Err(CartError::InvalidQuantity(0));
            }
            if line.unit_price.amount_minor < 0 {
                return Err(CartError::InvalidPrice(line.unit_price.amount_minor));
            }
            if line.unit_price.currency != state.cart.currency {
                return Err(CartError::CurrencyMismatch {
                    cart: state.cart.currency.to_string(),
                    item: line.unit_price.currency.to_string(),
                });
            }

            let key = line_key(&line.product_id, line.variant_id.as_deref());
            if let Some(existing) = state.cart.find_mut(&key) {
                existing.quantity = existing
                    .quantity
                    .saturating_add(line.quantity)
                    .min(MAX_LINE_QUANTITY);
                existing.unit_price_minor = line.unit_price.amount_minor;
            } else {
                if state.cart.lines.len() >= MAX_LINES {
                    return Err(CartError::TooManyLines(MAX_LINES));
                }
                state.cart.lines.push(CartLine {
                    product_id: line.product_id,
                    variant_id: line.variant_id.filter(|v| !v.is_empty()),
                    sku: line.sku,
                    name: line.name,
                    slug: line.slug,
                    unit_price_minor: line.unit_price.amount_minor,
                    quantity: line.quantity.min(MAX_LINE_QUANTITY),
                    image: line.image,
                });
            }
        }
        CartAction::SetQuantity { key, quantity } => {
            if quantity == 0 {
                return reduce(state, CartAction::RemoveItem { key });
            }
            let line = state
                .cart
                .find_mut(&key)
                .ok_or(CartError::LineNotFound(key))?;
            line.quantity = quantity.min(MAX_LINE_QUANTITY);
        }
        CartAction::RemoveItem { key } => {
            let before = state.cart.lines.len();
            state.cart.lines.retain(|l| l.key() != key);
            if state.cart.lines.len() == before {
                return Err(CartError::LineNotFound(key));
            }
        }
        CartAction::Clear => {
            state.cart.lines.clear();
            state.draft = OrderDraft::default();
        }
        CartAction::SetEmail { email } => {
            let email = email.trim().to_string();
            if !looks_like_email(&email) {
                return Err(CartError::InvalidEmail);
            }
            state.draft.email = Some(email);
        }
        CartAction::SetShippingAddress { address } => {
            state.draft.shipping_address = Some(address);
        }
        CartAction::SetBillingAddress {
            same_as_shipping,
            address,
        } => {
            state.draft.billing_same_as_shipping = same_as_shipping;
            state.draft.billing_address = if same_as_shipping { None } else { address };
        }
        CartAction::SetShippingMethod { method } => {
            state.draft.shipping_method = non_empty(method);
        }
        CartAction::SetPaymentMethod { method } => {
            state.draft.payment_method = non_empty(method);
        }
        CartAction::SetNotes { notes } => {
            state.draft.notes = notes.and_then(non_empty);
        }
        CartAction::ApplyCoupon { code } => {
            state.draft.coupon = non_empty(code.to_ascii_uppercase());
        }
        CartAction::RemoveCoupon => {
            state.draft.coupon = None;
        }
        CartAction::ResetDraft => {
            state.draft = OrderDraft::default();
        }
    }

    Ok(state)
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Shape check only; the backend has the final say
pub fn looks_like_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

fn default_true() -> bool {
    true
}

fn default_quantity() -> u32 {
    1
}
