//! Storefront server
//!
//! Serves every tenant storefront from one process:
//! - Resolves the tenant from the request host and the display locale
//! - Renders pages from the commerce backend with per-tenant translations
//! - Keeps the cart in a signed cookie
//! - Reloads the tenant registry when its file changes
//! - Exposes /healthz, /readyz and /metrics
//!
//! Usage:
//! ```bash
//! # With config file
//! storefront-server --config storefront.yaml
//!
//! # Validate config and tenant registry without starting
//! storefront-server --config storefront.yaml check-config
//!
//! # Which tenant does a host map to?
//! storefront-server --config storefront.yaml resolve-host shop.acme.com
//! ```

mod config;
mod readiness;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::ServerConfig;
use futures::StreamExt;
use readiness::RegistryReadiness;
use std::net::SocketAddr;
use std::sync::Arc;
use storefront_config_file::FileTenantRegistry;
use storefront_core::{TenantRegistry, TenantResolver};
use storefront_egress::{ApiGateway, TranslationLoader};
use storefront_ingress::{MetricsObserver, StorefrontState};
use storefront_observability::{
    HealthState, Metrics, TracerConfig, health_router, init_logging, init_tracer_provider,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Storefront Server - multi-tenant server-rendered shop
#[derive(Parser)]
#[command(name = "storefront-server")]
#[command(about = "Multi-tenant storefront server", long_about = None)]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("STOREFRONT_BUILD_SHA"), ")"))]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (YAML or TOML)
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "STOREFRONT_CONFIG",
        global = true
    )]
    config: Option<String>,

    /// Listen address, overrides config and environment
    #[arg(long, global = true)]
    host: Option<String>,

    /// Listen port, overrides config and environment
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Log level, overrides config and environment
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the storefront (default if no command specified)
    Serve,
    /// Validate the configuration and the tenant registry, then exit
    CheckConfig,
    /// Print the tenant and default locale a hostname resolves to
    ResolveHost {
        /// Hostname as sent in the Host header, port allowed
        host: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Some(Commands::CheckConfig) => check_config(config).await,
        Some(Commands::ResolveHost { host }) => resolve_host(config, &host).await,
        Some(Commands::Serve) | None => serve(config).await,
    }
}

/// File, then `STOREFRONT_*` environment, then CLI flags
fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => ServerConfig::default(),
    };

    config.merge_env();

    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    Ok(config)
}

async fn load_registry(config: &ServerConfig) -> anyhow::Result<FileTenantRegistry> {
    FileTenantRegistry::new(&config.tenants.registry)
        .await
        .with_context(|| {
            format!(
                "Failed to load tenant registry {}",
                config.tenants.registry.display()
            )
        })
}

async fn check_config(config: ServerConfig) -> anyhow::Result<()> {
    config.validate()?;
    let registry = load_registry(&config).await?;
    let rules = config.tenants.host_rules()?;

    let tenants = registry.list_tenants().await?;
    if !tenants.iter().any(|t| t.key == rules.default_tenant) {
        anyhow::bail!(
            "default tenant '{}' is not in the registry",
            rules.default_tenant
        );
    }

    println!("Configuration OK");
    println!("  backend:      {}", config.backend.base_url);
    println!("  translations: {}", config.translations.base_url);
    println!(
        "  registry:     {} ({} tenants)",
        registry.path().display(),
        tenants.len()
    );
    for tenant in &tenants {
        let locales: Vec<String> = tenant
            .supported_locales
            .iter()
            .map(|l| l.to_string())
            .collect();
        println!(
            "  - {:<16} {} [{}] {}",
            tenant.key,
            tenant.display_name,
            locales.join(", "),
            tenant.currency.code()
        );
    }
    Ok(())
}

async fn resolve_host(config: ServerConfig, host: &str) -> anyhow::Result<()> {
    let registry = load_registry(&config).await?;
    let resolver = TenantResolver::new(config.tenants.host_rules()?, Arc::new(registry));

    let profile = resolver
        .resolve(host)
        .await
        .with_context(|| format!("No tenant for host {}", host))?;

    println!("host:           {}", host);
    println!("tenant:         {}", profile.key);
    println!("name:           {}", profile.display_name);
    println!("default locale: {}", profile.default_locale);
    println!("currency:       {}", profile.currency.code());
    Ok(())
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    init_logging(&config.logging.level, config.logging.format)
        .context("Failed to install log subscriber")?;
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("STOREFRONT_BUILD_SHA"),
        "Starting storefront"
    );

    let tracer_provider = init_tracer_provider(TracerConfig {
        service_name: config.observability.service_name.clone(),
        sampling_rate: config.observability.sampling_rate,
        ..Default::default()
    });
    opentelemetry::global::set_tracer_provider(tracer_provider.clone());

    let metrics = Arc::new(
        Metrics::new().map_err(|e| anyhow::anyhow!("Failed to register metrics: {}", e))?,
    );
    let observer = MetricsObserver::new(metrics.clone());

    let registry = load_registry(&config).await?;
    metrics.set_tenants_loaded(registry.tenant_count());
    info!(
        "Tenant registry: {} ({} tenants)",
        registry.path().display(),
        registry.tenant_count()
    );

    let resolver = TenantResolver::new(config.tenants.host_rules()?, Arc::new(registry.clone()));
    let gateway = ApiGateway::new(&config.backend)?.with_observer(observer.clone());
    let translations = Arc::new(
        TranslationLoader::from_config(config.translations.clone(), &config.backend.http)?
            .with_observer(observer),
    );
    info!("Backend: {}", config.backend.base_url);
    info!("Translations: {}", config.translations.base_url);

    spawn_registry_watch(registry.clone(), translations.clone(), metrics.clone());

    let state = StorefrontState::new(resolver, gateway, translations, config.storefront.clone())
        .with_metrics(metrics.clone());

    let health = HealthState::with_readiness_checker(
        metrics,
        Arc::new(RegistryReadiness::new(registry)),
    );
    let app = storefront_ingress::router(Arc::new(state)).merge(health_router(health));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;
    let listener = TcpListener::bind(addr).await?;

    info!("Storefront listening on http://{}", addr);
    info!("   Health check:       http://{}/healthz", addr);
    info!("   Readiness check:    http://{}/readyz", addr);
    info!("   Prometheus metrics: http://{}/metrics", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = tracer_provider.shutdown() {
        warn!("Tracer provider shutdown failed: {}", e);
    }
    info!("Storefront stopped");
    Ok(())
}

/// Apply registry file changes for the lifetime of the process.
///
/// A successful reload drops every cached translation bundle so tenants pick
/// up new locales and bundle paths. A failed reload keeps serving the
/// previous tenants.
fn spawn_registry_watch(
    registry: FileTenantRegistry,
    translations: Arc<TranslationLoader>,
    metrics: Arc<Metrics>,
) {
    tokio::spawn(async move {
        let mut changes = match registry.watch_changes().await {
            Ok(changes) => changes,
            Err(e) => {
                error!("Tenant registry hot reload disabled: {}", e);
                return;
            }
        };

        while let Some(change) = changes.next().await {
            match change {
                Ok(change) => {
                    translations.invalidate_all();
                    metrics.record_registry_reload(true);
                    metrics.set_tenants_loaded(change.tenant_count);
                    info!(
                        version = change.version,
                        tenants = change.tenant_count,
                        "Tenant registry reloaded"
                    );
                }
                Err(e) => {
                    metrics.record_registry_reload(false);
                    warn!("Tenant registry change rejected: {}", e);
                }
            }
        }
    });
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
