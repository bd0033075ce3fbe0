use crate::error::Result;
use crate::types::{BoundingBox, ColumnDescriptor, SqlQuery, TableName, TableRef};
use async_trait::async_trait;

/// A spatial store serving one logical database.
///
/// Implementations own their connection handling; every method is a single
/// round trip and none of them retry.
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Get the type name of this store
    fn source_type(&self) -> &'static str;

    /// List published tables, excluding system and catalog schemas
    async fn list_tables(&self) -> Result<Vec<TableName>>;

    /// All columns of a table in catalog order, geometry included.
    /// Empty when the table does not exist.
    async fn table_columns(&self, table: &TableRef) -> Result<Vec<ColumnDescriptor>>;

    /// Extent of every geometry in the table, in EPSG:4326.
    /// `None` when the table holds no geometry.
    async fn table_bounds(&self, table: &TableRef) -> Result<Option<BoundingBox>>;

    /// Execute an assembled feature query returning one aggregated JSON
    /// document (`{type, features}`); `Null` when the store produced none.
    async fn fetch_document(&self, query: &SqlQuery) -> Result<serde_json::Value>;

    /// Close the store gracefully
    async fn close(&self) -> Result<()>;
}
