//! Storefront Core Types and Traits
//!
//! This crate provides the request-independent building blocks of the storefront:
//! - Tenant keys, profiles and hostname canonicalization
//! - Locale parsing and negotiation
//! - The cart / order-draft reducer
//! - The tenant registry abstraction
//! - Core error types

pub mod cart;
pub mod error;
pub mod locale;
pub mod money;
pub mod registry;
pub mod tenant;

pub use cart::{
    Address, Cart, CartAction, CartError, CartLine, CartState, MAX_LINE_QUANTITY, MAX_LINES, NewLine,
    OrderDraft, reduce,
};
pub use error::{Error, Result};
pub use locale::{Locale, LocaleSource};
pub use money::{Currency, Money};
pub use registry::{InMemoryRegistry, RegistryChange, RegistryChangeStream, TenantRegistry, TenantSet};
pub use tenant::{
    HostResolution, HostRules, SeoSettings, TenantContext, TenantKey, TenantProfile, TenantResolver,
    Theme, canonicalize_host,
};
