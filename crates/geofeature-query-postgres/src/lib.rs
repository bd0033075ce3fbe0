//! PostGIS driver for geofeature-query
//!
//! Implements `FeatureStore` over a pooled `tokio-postgres` connection and a
//! `StoreFactory` registering it under the `postgres` backend.

mod error;
pub mod pool;
mod store;

use async_trait::async_trait;
use geofeature_query::{DatabaseConfig, FeatureStore, Result, StoreFactory};
use std::sync::Arc;

pub use error::describe_pg_error;
pub use pool::{PgPool, PooledClient};
pub use store::PostgresFeatureStore;

/// Creates `PostgresFeatureStore`s for databases with `backend: postgres`
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresStoreFactory;

#[async_trait]
impl StoreFactory for PostgresStoreFactory {
    fn backend_type(&self) -> &'static str {
        "postgres"
    }

    async fn create_store(
        &self,
        name: &str,
        config: &DatabaseConfig,
    ) -> Result<Arc<dyn FeatureStore>> {
        let store = PostgresFeatureStore::connect(name, config).await?;
        Ok(Arc::new(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geofeature_query::StoreRegistry;

    #[tokio::test]
    async fn test_factory_registers_lazily() {
        let registry = StoreRegistry::new();
        registry.register_factory(Arc::new(PostgresStoreFactory)).await;

        // No clients are opened while min_connections is 0
        let store = registry
            .connect(
                "data",
                &DatabaseConfig::new("postgresql://geo@127.0.0.1:1/data"),
            )
            .await
            .unwrap();
        assert_eq!(store.source_type(), "postgres");
        assert_eq!(registry.database_ids().await, vec!["data"]);
    }

    #[tokio::test]
    async fn test_warm_up_failure_surfaces_as_connection_error() {
        let config = DatabaseConfig::new("postgresql://geo@127.0.0.1:1/data").with_min_connections(1);
        let result = PostgresStoreFactory.create_store("data", &config).await;
        assert!(matches!(
            result,
            Err(geofeature_query::FeatureError::Connection(_))
        ));
    }
}
