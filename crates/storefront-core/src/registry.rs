//! Tenant registry trait
//!
//! The `TenantRegistry` trait abstracts where tenant profiles come from. The
//! server ships a file-backed implementation (`storefront-config-file`); tests
//! and embedded setups use [`InMemoryRegistry`].

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::{Error, Result, TenantKey, TenantProfile};

/// Type alias for registry change streams
pub type RegistryChangeStream<'a> = BoxStream<'a, Result<RegistryChange>>;

/// Registry change notification
#[derive(Debug, Clone)]
pub struct RegistryChange {
    /// Timestamp of the change
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Registry version after the change
    pub version: u32,

    /// Number of tenants after the change
    pub tenant_count: usize,
}

/// Source of tenant profiles
///
/// Implementations:
/// - `FileTenantRegistry`: YAML/TOML file with hot reload
/// - `InMemoryRegistry`: fixed set of profiles
#[async_trait]
pub trait TenantRegistry: Send + Sync {
    /// Look up a tenant by canonical key
    async fn get_tenant(&self, key: &TenantKey) -> Result<Option<Arc<TenantProfile>>>;

    /// Look up a tenant by explicit host alias (already lowercased, no port)
    async fn find_by_host(&self, host: &str) -> Result<Option<Arc<TenantProfile>>>;

    /// All known tenants, ordered by key
    async fn list_tenants(&self) -> Result<Vec<Arc<TenantProfile>>>;

    /// Watch for registry changes
    ///
    /// The default implementation never emits.
    async fn watch_changes(&self) -> Result<RegistryChangeStream<'_>> {
        Ok(Box::pin(stream::empty()))
    }
}

/// Immutable indexed snapshot of tenant profiles
#[derive(Debug, Default, Clone)]
pub struct TenantSet {
    by_key: HashMap<TenantKey, Arc<TenantProfile>>,
    by_host: HashMap<String, Arc<TenantProfile>>,
}

impl TenantSet {
    /// Validate and index profiles.
    ///
    /// # Errors
    /// - `Error::ConfigValidation` on invalid profiles, duplicate keys or a
    ///   host alias claimed by two tenants
    pub fn build(profiles: Vec<TenantProfile>) -> Result<Self> {
        let mut set = Self::default();

        for profile in profiles {
            let profile = Arc::new(profile.validate()?);

            for host in &profile.hosts {
                if let Some(existing) = set.by_host.insert(host.clone(), profile.clone()) {
                    return Err(Error::ConfigValidation(format!(
                        "host '{}' is claimed by both '{}' and '{}'",
                        host, existing.key, profile.key
                    )));
                }
            }

            if set.by_key.insert(profile.key.clone(), profile.clone()).is_some() {
                return Err(Error::ConfigValidation(format!(
                    "duplicate tenant key '{}'",
                    profile.key
                )));
            }
        }

        Ok(set)
    }

    pub fn get(&self, key: &TenantKey) -> Option<Arc<TenantProfile>> {
        self.by_key.get(key).cloned()
    }

    pub fn by_host(&self, host: &str) -> Option<Arc<TenantProfile>> {
        self.by_host.get(host).cloned()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn sorted(&self) -> Vec<Arc<TenantProfile>> {
        let mut tenants: Vec<_> = self.by_key.values().cloned().collect();
        tenants.sort_by(|a, b| a.key.cmp(&b.key));
        tenants
    }
}

/// Registry backed by an in-memory [`TenantSet`]
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    tenants: RwLock<Arc<TenantSet>>,
}

impl InMemoryRegistry {
    pub fn new(profiles: Vec<TenantProfile>) -> Result<Self> {
        Ok(Self {
            tenants: RwLock::new(Arc::new(TenantSet::build(profiles)?)),
        })
    }

    /// Swap the tenant set
    pub fn replace(&self, profiles: Vec<TenantProfile>) -> Result<()> {
        let set = TenantSet::build(profiles)?;
        let mut guard = self
            .tenants
            .write()
            .map_err(|_| Error::Internal("tenant registry lock poisoned".to_string()))?;
        *guard = Arc::new(set);
        Ok(())
    }

    fn snapshot(&self) -> Result<Arc<TenantSet>> {
        self.tenants
            .read()
            .map(|set| set.clone())
            .map_err(|_| Error::Internal("tenant registry lock poisoned".to_string()))
    }
}

#[async_trait]
impl TenantRegistry for InMemoryRegistry {
    async fn get_tenant(&self, key: &TenantKey) -> Result<Option<Arc<TenantProfile>>> {
        Ok(self.snapshot()?.get(key))
    }

    async fn find_by_host(&self, host: &str) -> Result<Option<Arc<TenantProfile>>> {
        Ok(self.snapshot()?.by_host(host))
    }

    async fn list_tenants(&self) -> Result<Vec<Arc<TenantProfile>>> {
        Ok(self.snapshot()?.sorted())
    }
}
