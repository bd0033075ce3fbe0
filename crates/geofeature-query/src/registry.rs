use crate::config::{DatabaseConfig, ServiceConfig};
use crate::error::{FeatureError, Result};
use crate::traits::FeatureStore;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Factory trait for creating stores from database configurations
#[async_trait]
pub trait StoreFactory: Send + Sync {
    /// Get the backend type this factory handles
    fn backend_type(&self) -> &'static str;

    /// Create a store for the logical database `name`
    async fn create_store(
        &self,
        name: &str,
        config: &DatabaseConfig,
    ) -> Result<Arc<dyn FeatureStore>>;
}

/// Registry mapping logical database ids to their stores.
///
/// Built once at startup and shared read-only by request handlers; the
/// locks only matter while stores are being added or removed.
pub struct StoreRegistry {
    factories: Arc<RwLock<HashMap<String, Arc<dyn StoreFactory>>>>,
    stores: Arc<RwLock<BTreeMap<String, Arc<dyn FeatureStore>>>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self {
            factories: Arc::new(RwLock::new(HashMap::new())),
            stores: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Register a factory for a backend type
    pub async fn register_factory(&self, factory: Arc<dyn StoreFactory>) {
        let backend = factory.backend_type();
        let mut factories = self.factories.write().await;

        if factories.contains_key(backend) {
            warn!("Overwriting existing factory for backend: {}", backend);
        }

        factories.insert(backend.to_string(), factory);
        debug!("Registered factory for backend: {}", backend);
    }

    /// Create a store for `name` through the matching factory and cache it
    pub async fn connect(&self, name: &str, config: &DatabaseConfig) -> Result<Arc<dyn FeatureStore>> {
        let factories = self.factories.read().await;

        let factory = factories
            .get(&config.backend)
            .ok_or_else(|| {
                FeatureError::configuration(format!(
                    "No factory registered for backend: {}",
                    config.backend
                ))
            })?
            .clone();

        drop(factories);

        debug!(
            "Creating store {} for {}",
            name,
            config.connection_string()
        );

        let store = factory.create_store(name, config).await?;
        self.register_store(name, store.clone()).await;

        Ok(store)
    }

    /// Connect every configured database, failing on the first error
    pub async fn connect_all(&self, config: &ServiceConfig) -> Result<()> {
        for (name, database) in &config.databases {
            self.connect(name, database).await?;
        }

        info!("Connected {} database(s)", config.databases.len());
        Ok(())
    }

    /// Cache an already constructed store under `name`
    pub async fn register_store(&self, name: &str, store: Arc<dyn FeatureStore>) {
        let mut stores = self.stores.write().await;

        if let Some(previous) = stores.insert(name.to_string(), store) {
            warn!("Replacing store for database: {}", name);
            if let Err(e) = previous.close().await {
                warn!("Failed to close replaced store {}: {}", name, e);
            }
        }
    }

    /// The store for a logical database id
    pub async fn get(&self, name: &str) -> Result<Arc<dyn FeatureStore>> {
        let stores = self.stores.read().await;
        stores
            .get(name)
            .cloned()
            .ok_or_else(|| FeatureError::UnknownDatabase(name.to_string()))
    }

    /// Registered database ids in sorted order
    pub async fn database_ids(&self) -> Vec<String> {
        let stores = self.stores.read().await;
        stores.keys().cloned().collect()
    }

    /// Remove and close a store
    pub async fn remove_store(&self, name: &str) -> Result<()> {
        let mut stores = self.stores.write().await;

        if let Some(store) = stores.remove(name) {
            debug!("Closing store: {}", name);
            store.close().await?;
        }

        Ok(())
    }

    /// Close and drop every store
    pub async fn clear(&self) {
        let mut stores = self.stores.write().await;

        while let Some((name, store)) = stores.pop_first() {
            if let Err(e) = store.close().await {
                warn!("Failed to close store {}: {}", name, e);
            }
        }
    }

    /// List registered backend types
    pub async fn list_backends(&self) -> Vec<String> {
        let factories = self.factories.read().await;
        factories.keys().cloned().collect()
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}
