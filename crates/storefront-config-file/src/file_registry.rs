//! File-based TenantRegistry implementation

use async_trait::async_trait;
use futures::stream;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use storefront_core::{
    Error, Result, TenantKey, TenantProfile, TenantSet,
    registry::{RegistryChange, RegistryChangeStream, TenantRegistry},
};

/// On-disk layout of the registry file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryFile {
    #[serde(default)]
    pub tenants: Vec<TenantProfile>,
}

#[derive(Debug)]
struct Shared {
    path: PathBuf,
    tenants: RwLock<Arc<TenantSet>>,
    /// Incremented on each successful reload
    version: AtomicU32,
}

impl Shared {
    fn snapshot(&self) -> Result<Arc<TenantSet>> {
        self.tenants
            .read()
            .map(|set| set.clone())
            .map_err(|_| Error::Internal("tenant registry lock poisoned".to_string()))
    }

    /// Re-read the file and swap the tenant set. On failure the current set
    /// stays in place.
    fn reload(&self) -> Result<RegistryChange> {
        let set = match read_registry_file(&self.path).and_then(TenantSet::build) {
            Ok(set) => set,
            Err(e) => {
                error!("Tenant registry reload failed, keeping previous tenants: {}", e);
                return Err(e);
            }
        };
        let tenant_count = set.len();

        {
            let mut guard = self
                .tenants
                .write()
                .map_err(|_| Error::Internal("tenant registry lock poisoned".to_string()))?;
            *guard = Arc::new(set);
        }
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;

        info!(
            "Reloaded tenant registry from {:?} (version {}, {} tenants)",
            self.path, version, tenant_count
        );

        Ok(RegistryChange {
            timestamp: chrono::Utc::now(),
            version,
            tenant_count,
        })
    }
}

/// Tenant registry backed by a YAML or TOML file
///
/// Profiles are validated and indexed on load. `watch_changes` reloads the
/// file whenever it changes on disk and reports each successful swap.
#[derive(Debug, Clone)]
pub struct FileTenantRegistry {
    shared: Arc<Shared>,
}

impl FileTenantRegistry {
    /// Load a registry file
    ///
    /// # Arguments
    /// * `path` - Path to the YAML or TOML registry file (`~` is expanded)
    ///
    /// # Errors
    /// - `Error::ConfigNotFound` if the file doesn't exist
    /// - `Error::Config` if the file can't be parsed
    /// - `Error::ConfigValidation` if a profile is invalid
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = expand_home(path.into())?;

        if !path.exists() {
            return Err(Error::ConfigNotFound);
        }

        let set = TenantSet::build(read_registry_file(&path)?)?;
        info!("Loaded {} tenants from {:?}", set.len(), path);

        Ok(Self {
            shared: Arc::new(Shared {
                path,
                tenants: RwLock::new(Arc::new(set)),
                version: AtomicU32::new(1),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Current registry version (starts at 1)
    pub fn version(&self) -> u32 {
        self.shared.version.load(Ordering::SeqCst)
    }

    /// Number of tenants in the current snapshot
    pub fn tenant_count(&self) -> usize {
        self.shared.snapshot().map(|set| set.len()).unwrap_or(0)
    }

    /// Re-read the file now
    pub fn reload(&self) -> Result<RegistryChange> {
        self.shared.reload()
    }
}

fn expand_home(path: PathBuf) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => Ok(dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?
            .join(rest)),
        Err(_) => Ok(path),
    }
}

/// Parse a registry file, format chosen by extension (TOML or YAML)
fn read_registry_file(path: &Path) -> Result<Vec<TenantProfile>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        error!("Failed to read tenant registry: {}", e);
        Error::Io(e)
    })?;

    let file: RegistryFile = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
        toml::from_str(&contents).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?
    } else {
        serde_yaml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Invalid YAML: {}", e)))?
    };

    debug!("Parsed {} tenant profiles from {:?}", file.tenants.len(), path);
    Ok(file.tenants)
}

#[async_trait]
impl TenantRegistry for FileTenantRegistry {
    async fn get_tenant(&self, key: &TenantKey) -> Result<Option<Arc<TenantProfile>>> {
        Ok(self.shared.snapshot()?.get(key))
    }

    async fn find_by_host(&self, host: &str) -> Result<Option<Arc<TenantProfile>>> {
        Ok(self.shared.snapshot()?.by_host(host))
    }

    async fn list_tenants(&self) -> Result<Vec<Arc<TenantProfile>>> {
        Ok(self.shared.snapshot()?.sorted())
    }

    async fn watch_changes(&self) -> Result<RegistryChangeStream<'_>> {
        let (tx, rx) = mpsc::channel(100);
        let shared = self.shared.clone();

        // Watch the parent directory so editors that replace the file by
        // rename are still picked up
        let watch_dir = match shared.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = shared.path.file_name().map(|n| n.to_os_string());

        tokio::task::spawn_blocking(move || {
            let (notify_tx, notify_rx) = std::sync::mpsc::channel();

            let mut watcher = match RecommendedWatcher::new(
                move |res: std::result::Result<Event, notify::Error>| {
                    if let Err(e) = notify_tx.send(res) {
                        error!("Failed to send file watch event: {}", e);
                    }
                },
                notify::Config::default(),
            ) {
                Ok(w) => w,
                Err(e) => {
                    error!("Failed to create file watcher: {}", e);
                    return;
                }
            };

            if let Err(e) = watcher.watch(&watch_dir, RecursiveMode::NonRecursive) {
                error!("Failed to watch tenant registry: {}", e);
                return;
            }

            info!("Watching tenant registry for changes: {:?}", shared.path);

            while let Ok(event_result) = notify_rx.recv() {
                let item = match event_result {
                    Ok(event) => {
                        let relevant = matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                            && event
                                .paths
                                .iter()
                                .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                        if !relevant {
                            continue;
                        }
                        shared.reload()
                    }
                    Err(e) => {
                        warn!("File watch error: {}", e);
                        Err(Error::Internal(format!("File watch error: {}", e)))
                    }
                };

                if tx.blocking_send(item).is_err() {
                    debug!("Registry change stream closed, stopping watcher");
                    break;
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });

        Ok(Box::pin(stream))
    }
}
