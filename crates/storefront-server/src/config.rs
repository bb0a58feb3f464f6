use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use storefront_core::{HostRules, TenantKey};
use storefront_egress::{GatewayConfig, TranslationConfig};
use storefront_ingress::IngressConfig;
use storefront_observability::LogFormat;
use thiserror::Error;

/// Shortest accepted cart cookie HMAC key
pub const MIN_COOKIE_SECRET_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_backend")]
    pub backend: GatewayConfig,

    #[serde(default = "default_translations")]
    pub translations: TranslationConfig,

    #[serde(default)]
    pub tenants: TenantsConfig,

    /// Cookies, public scheme, forwarded host handling, home page size
    #[serde(flatten)]
    pub storefront: IngressConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantsConfig {
    /// YAML or TOML file listing tenant profiles
    #[serde(default = "default_registry_path")]
    pub registry: PathBuf,

    /// Tenant served on localhost and IP hosts
    #[serde(default = "default_tenant")]
    pub default_tenant: String,

    /// Serve the default tenant for unknown hosts instead of a 404
    #[serde(default)]
    pub fallback_to_default: bool,

    /// Replaces the built-in reseller suffix list when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reseller_suffixes: Option<Vec<String>>,

    #[serde(default)]
    pub local_hosts: Vec<String>,
}

impl TenantsConfig {
    pub fn host_rules(&self) -> storefront_core::Result<HostRules> {
        let mut rules = HostRules::new(TenantKey::parse(&self.default_tenant)?);
        if let Some(suffixes) = &self.reseller_suffixes {
            rules.reseller_suffixes = suffixes.clone();
        }
        rules.local_hosts = self.local_hosts.clone();
        rules.fallback_to_default = self.fallback_to_default;
        Ok(rules)
    }
}

impl Default for TenantsConfig {
    fn default() -> Self {
        Self {
            registry: default_registry_path(),
            default_tenant: default_tenant(),
            fallback_to_default: false,
            reseller_suffixes: None,
            local_hosts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Trace sampling rate (0.0-1.0)
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            sampling_rate: default_sampling_rate(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            backend: default_backend(),
            translations: default_translations(),
            tenants: TenantsConfig::default(),
            storefront: IngressConfig::default(),
            logging: LoggingConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)?
        };

        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("STOREFRONT_HOST") {
            self.host = val;
        }

        if let Ok(val) = std::env::var("STOREFRONT_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => eprintln!("Warning: Invalid STOREFRONT_PORT '{}', ignoring", val),
            }
        }

        // Upstreams
        if let Ok(val) = std::env::var("STOREFRONT_BACKEND_URL") {
            self.backend.base_url = val;
        }

        if let Ok(val) = std::env::var("STOREFRONT_TRANSLATIONS_URL") {
            self.translations.base_url = val;
        }

        // Tenants
        if let Ok(val) = std::env::var("STOREFRONT_TENANTS_FILE") {
            self.tenants.registry = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("STOREFRONT_DEFAULT_TENANT") {
            self.tenants.default_tenant = val;
        }

        if let Ok(val) = std::env::var("STOREFRONT_TENANT_FALLBACK")
            && let Ok(enabled) = val.parse::<bool>()
        {
            self.tenants.fallback_to_default = enabled;
        }

        // Cookies and public URLs
        if let Ok(val) = std::env::var("STOREFRONT_COOKIE_SECRET") {
            self.storefront.cookies.secret = val;
        }

        if let Ok(val) = std::env::var("STOREFRONT_COOKIE_SECURE")
            && let Ok(secure) = val.parse::<bool>()
        {
            self.storefront.cookies.secure = secure;
        }

        if let Ok(val) = std::env::var("STOREFRONT_PUBLIC_SCHEME") {
            self.storefront.public_scheme = val;
        }

        if let Ok(val) = std::env::var("STOREFRONT_TRUST_FORWARDED_HOST")
            && let Ok(trust) = val.parse::<bool>()
        {
            self.storefront.trust_forwarded_host = trust;
        }

        // Logging and tracing
        if let Ok(val) = std::env::var("STOREFRONT_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Ok(val) = std::env::var("STOREFRONT_LOG_FORMAT") {
            match val.to_lowercase().as_str() {
                "json" => self.logging.format = LogFormat::Json,
                "text" => self.logging.format = LogFormat::Text,
                _ => eprintln!("Warning: Invalid STOREFRONT_LOG_FORMAT '{}', using default", val),
            }
        }

        if let Ok(val) = std::env::var("STOREFRONT_TRACE_SAMPLING_RATE")
            && let Ok(rate) = val.parse::<f64>()
        {
            self.observability.sampling_rate = rate;
        }
    }

    /// Check everything that would otherwise fail at the first request
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.port == 0 {
            problems.push("port must not be 0".to_string());
        }

        for (name, url) in [
            ("backend.base_url", &self.backend.base_url),
            ("translations.base_url", &self.translations.base_url),
        ] {
            match reqwest::Url::parse(url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
                Ok(parsed) => problems.push(format!(
                    "{} must be http or https, got {}",
                    name,
                    parsed.scheme()
                )),
                Err(e) => problems.push(format!("{} is not a URL ({}): {}", name, url, e)),
            }
        }

        if !self.translations.path_template.contains("{tenant}")
            || !self.translations.path_template.contains("{locale}")
        {
            problems.push("translations.path_template needs {tenant} and {locale}".to_string());
        }

        if let Err(e) = TenantKey::parse(&self.tenants.default_tenant) {
            problems.push(format!("tenants.default_tenant: {}", e));
        }

        if self.storefront.cookies.secret.len() < MIN_COOKIE_SECRET_BYTES {
            problems.push(format!(
                "cookies.secret must be at least {} bytes (set STOREFRONT_COOKIE_SECRET)",
                MIN_COOKIE_SECRET_BYTES
            ));
        }

        if !matches!(self.storefront.public_scheme.as_str(), "http" | "https") {
            problems.push(format!(
                "public_scheme must be http or https, got {}",
                self.storefront.public_scheme
            ));
        }

        if !(0.0..=1.0).contains(&self.observability.sampling_rate) {
            problems.push("observability.sampling_rate must be between 0.0 and 1.0".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_backend() -> GatewayConfig {
    GatewayConfig::new("http://127.0.0.1:8080/v1")
}

fn default_translations() -> TranslationConfig {
    TranslationConfig::new("http://127.0.0.1:8090/i18n")
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("~/.storefront/tenants.yaml")
}

fn default_tenant() -> String {
    "demo".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "storefront".to_string()
}

fn default_sampling_rate() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    const ENV_VARS: &[&str] = &[
        "STOREFRONT_HOST",
        "STOREFRONT_PORT",
        "STOREFRONT_BACKEND_URL",
        "STOREFRONT_TRANSLATIONS_URL",
        "STOREFRONT_TENANTS_FILE",
        "STOREFRONT_DEFAULT_TENANT",
        "STOREFRONT_TENANT_FALLBACK",
        "STOREFRONT_COOKIE_SECRET",
        "STOREFRONT_COOKIE_SECURE",
        "STOREFRONT_PUBLIC_SCHEME",
        "STOREFRONT_TRUST_FORWARDED_HOST",
        "STOREFRONT_LOG_LEVEL",
        "STOREFRONT_LOG_FORMAT",
        "STOREFRONT_TRACE_SAMPLING_RATE",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            unsafe { std::env::remove_var(var) };
        }
    }

    fn write_temp(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        std::fs::write(file.path(), contents).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.tenants.default_tenant, "demo");
        assert_eq!(config.storefront.cookies.cart_name, "sf_cart");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert_eq!(config.translations.cache_ttl_secs, 300);
    }

    #[test]
    fn test_from_yaml_file() {
        let file = write_temp(
            r#"
port: 8088
backend:
  base_url: https://api.example.com/v1
  tenant_header: X-Shop
translations:
  base_url: https://static.example.com/i18n
  cache_ttl_secs: 60
tenants:
  registry: /etc/storefront/tenants.yaml
  default_tenant: acme
  fallback_to_default: true
cookies:
  secret: 0123456789abcdef0123456789abcdef
  secure: false
public_scheme: http
logging:
  level: debug
  format: json
"#,
            ".yaml",
        );

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port, 8088);
        assert_eq!(config.backend.tenant_header, "X-Shop");
        assert_eq!(config.translations.cache_ttl_secs, 60);
        assert_eq!(config.tenants.registry, PathBuf::from("/etc/storefront/tenants.yaml"));
        assert!(config.tenants.fallback_to_default);
        assert!(!config.storefront.cookies.secure);
        assert_eq!(config.storefront.public_scheme, "http");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_file() {
        let file = write_temp(
            r#"
host = "0.0.0.0"
port = 9000

[backend]
base_url = "https://api.example.com/v1"

[tenants]
default_tenant = "globex"
reseller_suffixes = [".shops.example"]
"#,
            ".toml",
        );

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);

        let rules = config.tenants.host_rules().unwrap();
        assert_eq!(rules.default_tenant.as_str(), "globex");
        assert_eq!(rules.reseller_suffixes, vec![".shops.example".to_string()]);
    }

    #[test]
    fn test_unparseable_file() {
        let file = write_temp("port: [not, a, port]", ".yaml");
        assert!(matches!(
            ServerConfig::from_file(file.path()),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_validate_collects_every_problem() {
        let mut config = ServerConfig::default();
        config.backend.base_url = "ftp://files.example.com".to_string();
        config.tenants.default_tenant = "not a key".to_string();
        config.observability.sampling_rate = 2.0;

        let Err(ConfigError::Invalid(problems)) = config.validate() else {
            panic!("expected validation failure");
        };
        assert_eq!(problems.len(), 4);
        assert!(problems.iter().any(|p| p.starts_with("backend.base_url")));
        assert!(problems.iter().any(|p| p.starts_with("tenants.default_tenant")));
        assert!(problems.iter().any(|p| p.starts_with("cookies.secret")));
        assert!(problems.iter().any(|p| p.starts_with("observability.sampling_rate")));
    }

    #[test]
    #[serial]
    fn test_env_overrides_file_values() {
        clear_env();
        unsafe {
            std::env::set_var("STOREFRONT_PORT", "4000");
            std::env::set_var("STOREFRONT_BACKEND_URL", "https://backend.internal/v2");
            std::env::set_var("STOREFRONT_COOKIE_SECRET", SECRET);
            std::env::set_var("STOREFRONT_TENANT_FALLBACK", "true");
            std::env::set_var("STOREFRONT_LOG_FORMAT", "JSON");
        }

        let mut config = ServerConfig::default();
        config.merge_env();
        clear_env();

        assert_eq!(config.port, 4000);
        assert_eq!(config.backend.base_url, "https://backend.internal/v2");
        assert_eq!(config.storefront.cookies.secret, SECRET);
        assert!(config.tenants.fallback_to_default);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_invalid_env_values_are_ignored() {
        clear_env();
        unsafe {
            std::env::set_var("STOREFRONT_PORT", "eighty");
            std::env::set_var("STOREFRONT_COOKIE_SECURE", "maybe");
        }

        let mut config = ServerConfig::default();
        config.merge_env();
        clear_env();

        assert_eq!(config.port, 3000);
        assert!(config.storefront.cookies.secure);
    }
}
