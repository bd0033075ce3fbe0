pub mod collections;
pub mod items;

pub use collections::{CollectionCommand, CollectionsCommand, QueryablesCommand};
pub use items::{ItemCommand, ItemsCommand};

use geofeature_query::{FeatureService, ServiceConfig, StoreRegistry};
use geofeature_query_postgres::PostgresStoreFactory;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Arguments shared by every command
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub config: PathBuf,
    pub base_url: String,
}

/// Load the configuration, connect every database and run `operation`
/// on a fresh runtime. Stores are closed afterwards on success and failure.
pub fn with_service<T, F, Fut>(global: &GlobalArgs, operation: F) -> anyhow::Result<T>
where
    F: FnOnce(FeatureService) -> Fut,
    Fut: std::future::Future<Output = geofeature_query::Result<T>>,
{
    let config = load_config(&global.config)?;

    // Create tokio runtime for store connections
    let rt = Runtime::new()?;

    rt.block_on(async move {
        let registry = Arc::new(StoreRegistry::new());
        registry.register_factory(Arc::new(PostgresStoreFactory)).await;
        registry.connect_all(&config).await?;

        let service = FeatureService::new(registry.clone(), config);
        let result = operation(service).await;

        registry.clear().await;
        Ok::<T, anyhow::Error>(result?)
    })
}

pub fn load_config(path: &Path) -> anyhow::Result<ServiceConfig> {
    debug!("Loading configuration from {}", path.display());
    let config = ServiceConfig::from_path(path)?;
    info!(
        "Loaded configuration with {} database(s)",
        config.databases.len()
    );
    Ok(config)
}

/// Pretty-print a response document to stdout
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_reports_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.yaml");
        std::fs::write(&path, "databases: {}\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("at least one database"));

        std::fs::write(
            &path,
            "databases:\n  data:\n    url: postgresql://localhost/data\n",
        )
        .unwrap();
        assert!(load_config(&path).unwrap().databases.contains_key("data"));
    }
}
