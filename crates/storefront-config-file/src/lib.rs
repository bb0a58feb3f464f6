//! File-based tenant registry
//!
//! This crate implements the `TenantRegistry` trait on top of a YAML or TOML
//! file listing tenant profiles. It's the registry used by the storefront
//! server in every deployment that doesn't embed its tenants.
//!
//! # Features
//! - YAML and TOML formats (chosen by file extension)
//! - Real-time file watching with `notify`
//! - Atomic swap on reload; an invalid file keeps the previous tenants
//!
//! # Example
//! ```no_run
//! # use storefront_config_file::FileTenantRegistry;
//! # use storefront_core::{TenantKey, TenantRegistry};
//! # async fn example() -> storefront_core::Result<()> {
//! let registry = FileTenantRegistry::new("~/.storefront/tenants.yaml").await?;
//! let acme = registry.get_tenant(&TenantKey::parse("acme")?).await?;
//! # Ok(())
//! # }
//! ```

mod file_registry;

pub use file_registry::{FileTenantRegistry, RegistryFile};
