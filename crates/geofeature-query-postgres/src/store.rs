use crate::error::query_error;
use crate::pool::PgPool;
use async_trait::async_trait;
use geofeature_query::types::{
    quote_ident, BoundingBox, ColumnDescriptor, SqlQuery, SqlValue, TableName, TableRef,
    GEOMETRY_COLUMN, STORAGE_SRID,
};
use geofeature_query::{DatabaseConfig, FeatureStore, Result};
use tokio_postgres::types::ToSql;
use tracing::debug;

/// Published tables: everything outside the system schemas, minus the
/// PostGIS reference table
const LIST_TABLES_SQL: &str = r#"
    SELECT schemaname::text, tablename::text
    FROM pg_catalog.pg_tables
    WHERE schemaname NOT IN ('pg_catalog', 'information_schema', 'topology')
      AND tablename <> 'spatial_ref_sys'
    ORDER BY schemaname, tablename
"#;

const TABLE_COLUMNS_SQL: &str = r#"
    SELECT
        a.attname::text,
        format_type(a.atttypid, a.atttypmod),
        col_description(a.attrelid, a.attnum)
    FROM pg_catalog.pg_attribute a
    JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1
      AND c.relname = $2
      AND a.attnum > 0
      AND NOT a.attisdropped
    ORDER BY a.attnum
"#;

/// PostGIS-backed feature store for one logical database
pub struct PostgresFeatureStore {
    pool: PgPool,
}

impl PostgresFeatureStore {
    /// Create the store and open `min_connections` clients up front
    pub async fn connect(name: &str, config: &DatabaseConfig) -> Result<Self> {
        debug!(
            "Connecting database {} to {}",
            name,
            config.connection_string()
        );

        let pool = PgPool::new(name, config.url.clone(), config.max_connections)?;
        pool.warm_up(config.min_connections).await?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Extent of every geometry of a table in EPSG:4326
pub(crate) fn bounds_sql(table: &TableRef) -> String {
    format!(
        "SELECT ST_XMin(u)::float8, ST_YMin(u)::float8, ST_XMax(u)::float8, ST_YMax(u)::float8 \
         FROM (SELECT ST_Union(ST_Transform({}, {})) AS u FROM {}) AS b",
        quote_ident(GEOMETRY_COLUMN),
        STORAGE_SRID,
        table.qualified_name()
    )
}

/// Borrow bound values in the form `tokio-postgres` expects. The Rust types
/// match the casts `SqlParams` puts on each placeholder.
pub(crate) fn bind_params(values: &[SqlValue]) -> Vec<&(dyn ToSql + Sync)> {
    values
        .iter()
        .map(|value| match value {
            SqlValue::Text(s) => s as &(dyn ToSql + Sync),
            SqlValue::Int(i) => i as &(dyn ToSql + Sync),
            SqlValue::Float(f) => f as &(dyn ToSql + Sync),
        })
        .collect()
}

#[async_trait]
impl FeatureStore for PostgresFeatureStore {
    fn source_type(&self) -> &'static str {
        "postgres"
    }

    async fn list_tables(&self) -> Result<Vec<TableName>> {
        let client = self.pool.get().await?;

        debug!("Listing tables of database {}", self.pool.name());

        let rows = client
            .query(LIST_TABLES_SQL, &[])
            .await
            .map_err(|e| query_error("Listing tables", LIST_TABLES_SQL, &e))?;

        let tables: Vec<TableName> = rows
            .iter()
            .map(|row| TableName::new(row.get::<_, String>(0), row.get::<_, String>(1)))
            .collect();

        debug!(
            "Found {} tables in database {}",
            tables.len(),
            self.pool.name()
        );

        Ok(tables)
    }

    async fn table_columns(&self, table: &TableRef) -> Result<Vec<ColumnDescriptor>> {
        let client = self.pool.get().await?;

        debug!("Getting columns for table: {}", table);

        let rows = client
            .query(TABLE_COLUMNS_SQL, &[&table.schema, &table.table])
            .await
            .map_err(|e| query_error("Reading table columns", TABLE_COLUMNS_SQL, &e))?;

        let columns = rows
            .iter()
            .map(|row| {
                let descriptor =
                    ColumnDescriptor::new(row.get::<_, String>(0), row.get::<_, String>(1));
                match row.get::<_, Option<String>>(2) {
                    Some(description) => descriptor.with_description(description),
                    None => descriptor,
                }
            })
            .collect();

        Ok(columns)
    }

    async fn table_bounds(&self, table: &TableRef) -> Result<Option<BoundingBox>> {
        let client = self.pool.get().await?;
        let sql = bounds_sql(table);

        let row = client
            .query_one(sql.as_str(), &[])
            .await
            .map_err(|e| query_error("Computing table bounds", &sql, &e))?;

        let corners = (
            row.get::<_, Option<f64>>(0),
            row.get::<_, Option<f64>>(1),
            row.get::<_, Option<f64>>(2),
            row.get::<_, Option<f64>>(3),
        );

        Ok(match corners {
            (Some(minx), Some(miny), Some(maxx), Some(maxy)) => {
                Some(BoundingBox::new(minx, miny, maxx, maxy))
            }
            _ => None,
        })
    }

    async fn fetch_document(&self, query: &SqlQuery) -> Result<serde_json::Value> {
        let client = self.pool.get().await?;
        let start = std::time::Instant::now();

        debug!("Executing feature query: {}", query.sql);

        let params = bind_params(&query.params);
        let row = client
            .query_opt(query.sql.as_str(), &params)
            .await
            .map_err(|e| query_error("Feature query", &query.sql, &e))?;

        let document = match row {
            Some(row) => row
                .try_get::<_, Option<serde_json::Value>>(0)
                .map_err(|e| query_error("Reading feature document", &query.sql, &e))?
                .unwrap_or(serde_json::Value::Null),
            None => serde_json::Value::Null,
        };

        debug!(
            "Feature query on {} finished in {}ms",
            self.pool.name(),
            start.elapsed().as_millis()
        );

        Ok(document)
    }

    async fn close(&self) -> Result<()> {
        debug!("Closing PostgreSQL store {}", self.pool.name());
        self.pool.close();
        Ok(())
    }
}
