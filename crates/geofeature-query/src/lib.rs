//! # geofeature-query
//!
//! Store-agnostic core of the geofeature service: turns collection requests
//! (bbox, filter, equality parameters, sort, paging, output SRID) into one
//! parameterized statement and wraps the aggregated result as GeoJSON.
//!
//! ## Architecture
//!
//! - **FeatureStore**: trait every spatial backend implements
//! - **StoreRegistry**: logical database id -> store, built from `ServiceConfig`
//! - **filter**: CQL-like filter language (tokenizer, parser, SQL compiler)
//! - **ItemsRequest**: request parameter parsing and planning
//! - **QuerySpec**: query assembly into an `SqlQuery`
//! - **FeatureService**: entry points behind the collection endpoints
//!
//! ## Example
//!
//! ```rust
//! use geofeature_query::{ItemsRequest, QuerySpec, ServiceConfig, TableRef};
//! use geofeature_query::types::{ColumnDescriptor, ColumnSet};
//!
//! # fn example() -> geofeature_query::Result<()> {
//! let columns = ColumnSet::from_descriptors(vec![
//!     ColumnDescriptor::new("gid", "integer"),
//!     ColumnDescriptor::new("status", "text"),
//!     ColumnDescriptor::new("geom", "geometry"),
//! ]);
//!
//! let request = ItemsRequest::from_query_string("filter=status='active'&limit=10")?;
//! let spec: QuerySpec = request.plan(
//!     TableRef::parse("data.public.parcels")?,
//!     columns,
//!     &ServiceConfig::default(),
//! )?;
//! let query = spec.to_sql()?;
//! assert!(query.sql.contains("\"status\" = $2::text"));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Backend Implementation
//!
//! 1. Implement `FeatureStore` for the backend
//! 2. Implement `StoreFactory` creating it from a `DatabaseConfig`
//! 3. Register the factory with `StoreRegistry`
//!
//! `geofeature-query-postgres` is the PostGIS implementation.

pub mod config;
pub mod error;
pub mod feature;
pub mod filter;
pub mod params;
pub mod query;
pub mod registry;
pub mod schema;
pub mod service;
pub mod traits;
pub mod types;

// Re-export commonly used items
pub use config::{AxisOrder, DatabaseConfig, ServiceConfig};
pub use error::{FeatureError, Result};
pub use feature::{
    CollectionMetadata, Collections, Feature, FeatureCollection, Queryable, Queryables,
};
pub use filter::{parse_filter, FilterExpr};
pub use params::ItemsRequest;
pub use query::{Predicate, QuerySpec};
pub use registry::{StoreFactory, StoreRegistry};
pub use service::FeatureService;
pub use traits::FeatureStore;
pub use types::{
    BoundingBox, ColumnDescriptor, ColumnSet, SortDirection, SortKey, SqlQuery, SqlValue,
    TableName, TableRef,
};
