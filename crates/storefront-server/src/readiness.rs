//! Readiness backed by the tenant registry

use storefront_config_file::FileTenantRegistry;
use storefront_observability::{ComponentStatus, ReadinessChecker};

/// Ready once the registry holds at least one tenant
pub struct RegistryReadiness {
    registry: FileTenantRegistry,
}

impl RegistryReadiness {
    pub fn new(registry: FileTenantRegistry) -> Self {
        Self { registry }
    }
}

impl ReadinessChecker for RegistryReadiness {
    fn is_ready(&self) -> bool {
        self.registry.tenant_count() > 0
    }

    fn components(&self) -> Vec<ComponentStatus> {
        let count = self.registry.tenant_count();
        let status = if count > 0 {
            ComponentStatus::ok("tenant_registry")
                .with_detail(format!("{} tenants, version {}", count, self.registry.version()))
        } else {
            ComponentStatus::unavailable(
                "tenant_registry",
                format!("no tenants in {}", self.registry.path().display()),
            )
        };
        vec![status]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn registry(contents: &str) -> (tempfile::NamedTempFile, FileTenantRegistry) {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        std::fs::write(file.path(), contents).unwrap();
        let registry = FileTenantRegistry::new(file.path()).await.unwrap();
        (file, registry)
    }

    #[tokio::test]
    async fn test_ready_with_tenants() {
        let (_file, registry) = registry(
            "tenants:\n  - key: acme\n    display_name: Acme\n    default_locale: en\n    currency: EUR\n",
        )
        .await;
        let readiness = RegistryReadiness::new(registry);

        assert!(readiness.is_ready());
        let components = readiness.components();
        assert_eq!(components[0].status, "ok");
        assert_eq!(components[0].detail.as_deref(), Some("1 tenants, version 1"));
    }

    #[tokio::test]
    async fn test_empty_registry_is_not_ready() {
        let (_file, registry) = registry("tenants: []\n").await;
        let readiness = RegistryReadiness::new(registry);

        assert!(!readiness.is_ready());
        assert_eq!(readiness.components()[0].status, "unavailable");
    }
}
