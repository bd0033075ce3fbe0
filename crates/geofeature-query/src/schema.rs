//! Schema introspection: the verified column set behind every request.

use crate::error::{FeatureError, Result};
use crate::traits::FeatureStore;
use crate::types::{ColumnSet, TableRef};
use tracing::debug;

/// Discover the non-geometry columns of `table`.
///
/// Runs one catalog round trip per call; results are not memoized.
pub async fn introspect(store: &dyn FeatureStore, table: &TableRef) -> Result<ColumnSet> {
    let descriptors = store.table_columns(table).await.map_err(|e| match e {
        FeatureError::StoreQuery(msg) => {
            FeatureError::schema(table.to_string(), format!("failed to read columns: {}", msg))
        }
        other => other,
    })?;

    if descriptors.is_empty() {
        return Err(FeatureError::missing_table(table.to_string()));
    }

    let columns = ColumnSet::from_descriptors(descriptors);
    debug!("Found {} columns for table '{}'", columns.len(), table);
    Ok(columns)
}
