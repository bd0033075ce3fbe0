//! Entry points behind the collection endpoints.

use crate::config::ServiceConfig;
use crate::error::{FeatureError, Result};
use crate::feature::{queryables, CollectionMetadata, Collections, Feature, FeatureCollection, Queryables};
use crate::filter::FilterExpr;
use crate::params::ItemsRequest;
use crate::query::{Predicate, QuerySpec};
use crate::registry::StoreRegistry;
use crate::schema::introspect;
use crate::types::{TableRef, ID_COLUMN};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Read-only feature service over the registered stores
#[derive(Clone)]
pub struct FeatureService {
    registry: Arc<StoreRegistry>,
    config: ServiceConfig,
}

impl FeatureService {
    pub fn new(registry: Arc<StoreRegistry>, config: ServiceConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<StoreRegistry> {
        &self.registry
    }

    /// Every published table of every registered database, with extents
    pub async fn collections(&self, base_url: &str) -> Result<Collections> {
        let mut collections = Vec::new();

        for database in self.registry.database_ids().await {
            let store = self.registry.get(&database).await?;
            let tables = store.list_tables().await?;
            debug!("Database {} publishes {} tables", database, tables.len());

            for name in tables {
                let table = name.in_database(database.as_str());
                let bounds = store.table_bounds(&table).await?;
                collections.push(CollectionMetadata::new(base_url, &table, bounds));
            }
        }

        Ok(Collections { collections })
    }

    /// Metadata of one collection
    pub async fn collection(&self, base_url: &str, collection_id: &str) -> Result<CollectionMetadata> {
        let table = TableRef::parse(collection_id)?;
        let store = self.registry.get(&table.database).await?;

        introspect(store.as_ref(), &table).await?;
        let bounds = store.table_bounds(&table).await?;

        Ok(CollectionMetadata::new(base_url, &table, bounds))
    }

    /// Queryable columns of one collection
    pub async fn queryables(&self, collection_id: &str) -> Result<Queryables> {
        let table = TableRef::parse(collection_id)?;
        let store = self.registry.get(&table.database).await?;
        let columns = introspect(store.as_ref(), &table).await?;
        Ok(queryables(&columns))
    }

    /// Features of a collection matching the request
    pub async fn items(&self, collection_id: &str, request: &ItemsRequest) -> Result<FeatureCollection> {
        let table = TableRef::parse(collection_id)?;
        let store = self.registry.get(&table.database).await?;
        let columns = introspect(store.as_ref(), &table).await?;

        let query = request.plan(table.clone(), columns, &self.config)?.to_sql()?;

        let document = store.fetch_document(&query).await.map_err(|e| {
            error!("Items query on {} failed: {}", table, e);
            e
        })?;

        let collection = FeatureCollection::from_store_document(document)?;
        info!("Returning {} features from {}", collection.len(), table);
        Ok(collection)
    }

    /// One feature looked up by its `gid`. Only `properties` and `srid`
    /// of the request apply.
    pub async fn item(
        &self,
        collection_id: &str,
        feature_id: &str,
        request: &ItemsRequest,
    ) -> Result<Feature> {
        let table = TableRef::parse(collection_id)?;
        let store = self.registry.get(&table.database).await?;
        let columns = introspect(store.as_ref(), &table).await?;

        let id_column = columns.resolve(ID_COLUMN).ok_or_else(|| {
            FeatureError::schema(table.to_string(), format!("no '{}' column", ID_COLUMN))
        })?;

        // An id that cannot be a value of the id column matches no row
        if !id_column.accepts_text(feature_id) {
            debug!(
                "Feature id '{}' is not a valid {} for {}",
                feature_id,
                id_column.field_type(),
                table
            );
            return Err(FeatureError::not_found(format!(
                "feature '{}' in '{}'",
                feature_id, table
            )));
        }
        let id_column = id_column.name.clone();

        let mut spec = QuerySpec::new(table.clone(), columns)
            .without_sort()
            .with_paging(0, 1)
            .with_srid(request.srid.unwrap_or(self.config.default_srid))
            .with_predicate(Predicate::Expression(FilterExpr::equals(id_column, feature_id)))?;

        if let Some(names) = request.property_names() {
            spec = spec.with_properties(&names)?;
        }

        let document = store.fetch_document(&spec.to_sql()?).await.map_err(|e| {
            error!("Item query on {} failed: {}", table, e);
            e
        })?;

        FeatureCollection::from_store_document(document)?
            .into_single(&format!("feature '{}' in '{}'", feature_id, table))
    }
}
