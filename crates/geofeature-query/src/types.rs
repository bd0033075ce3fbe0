use crate::error::{FeatureError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Geometry column every published table is expected to carry
pub const GEOMETRY_COLUMN: &str = "geom";

/// Identifier column used for single-item lookups and the default sort
pub const ID_COLUMN: &str = "gid";

/// Reference system of bbox filters and collection extents
pub const STORAGE_SRID: i32 = 4326;

/// Field types as reported by the store catalog
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Boolean,
    Integer,
    Float,
    Numeric,
    String,
    Date,
    Timestamp,
    Json,
    Uuid,
    Geometry,
    Other,
}

impl FieldType {
    /// Map a formatted PostgreSQL type name (`format_type` output) to a FieldType
    pub fn from_catalog_type(catalog_type: &str) -> Self {
        // "character varying(80)" -> "character varying"
        let base = catalog_type
            .split('(')
            .next()
            .unwrap_or(catalog_type)
            .trim()
            .to_ascii_lowercase();

        match base.as_str() {
            "boolean" | "bool" => FieldType::Boolean,
            "smallint" | "int2" | "integer" | "int" | "int4" | "bigint" | "int8" => {
                FieldType::Integer
            }
            "real" | "float4" | "double precision" | "float8" => FieldType::Float,
            "numeric" | "decimal" => FieldType::Numeric,
            "character varying" | "varchar" | "character" | "char" | "bpchar" | "text"
            | "name" | "citext" => FieldType::String,
            "date" => FieldType::Date,
            "timestamp"
            | "timestamp without time zone"
            | "timestamp with time zone"
            | "timestamptz" => FieldType::Timestamp,
            "json" | "jsonb" => FieldType::Json,
            "uuid" => FieldType::Uuid,
            "geometry" | "geography" => FieldType::Geometry,
            _ => FieldType::Other,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Integer | FieldType::Float | FieldType::Numeric
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Integer => write!(f, "integer"),
            FieldType::Float => write!(f, "float"),
            FieldType::Numeric => write!(f, "numeric"),
            FieldType::String => write!(f, "string"),
            FieldType::Date => write!(f, "date"),
            FieldType::Timestamp => write!(f, "timestamp"),
            FieldType::Json => write!(f, "json"),
            FieldType::Uuid => write!(f, "uuid"),
            FieldType::Geometry => write!(f, "geometry"),
            FieldType::Other => write!(f, "other"),
        }
    }
}

/// Reference to a published table: `{database}.{schema}.{table}`
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub database: String,
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(
        database: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Parse a collection id of the form `database.schema.table`
    pub fn parse(collection_id: &str) -> Result<Self> {
        let segments: Vec<&str> = collection_id.split('.').collect();

        match segments.as_slice() {
            [database, schema, table]
                if !database.is_empty() && !schema.is_empty() && !table.is_empty() =>
            {
                Ok(Self::new(*database, *schema, *table))
            }
            _ => Err(FeatureError::invalid_parameter(
                "collectionId",
                format!(
                    "'{}' is not of the form database.schema.table",
                    collection_id
                ),
            )),
        }
    }

    /// Collection id as exposed through the API
    pub fn collection_id(&self) -> String {
        self.to_string()
    }

    /// Quoted `"schema"."table"` for use in a FROM clause
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.database, self.schema, self.table)
    }
}

/// Schema-qualified table name as listed by a store
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TableName {
    pub schema: String,
    pub table: String,
}

impl TableName {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    pub fn in_database(&self, database: impl Into<String>) -> TableRef {
        TableRef::new(database, self.schema.clone(), self.table.clone())
    }
}

/// A column discovered through catalog introspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Formatted catalog type, e.g. `integer` or `character varying(80)`
    #[serde(rename = "type")]
    pub data_type: String,
    pub is_geometry: bool,
    pub description: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            is_geometry: name == GEOMETRY_COLUMN,
            name,
            data_type: data_type.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field_type(&self) -> FieldType {
        FieldType::from_catalog_type(&self.data_type)
    }

    /// True when `value` can be read as this column's type. Only the
    /// numeric and boolean types are checked; anything else is left to
    /// the store.
    pub fn accepts_text(&self, value: &str) -> bool {
        let value = value.trim();
        match self.field_type() {
            FieldType::Integer => value.parse::<i64>().is_ok(),
            FieldType::Float | FieldType::Numeric => {
                !value.is_empty()
                    && value
                        .chars()
                        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
                    && value.parse::<f64>().is_ok()
            }
            FieldType::Boolean => matches!(
                value.to_ascii_lowercase().as_str(),
                "true" | "false" | "t" | "f" | "yes" | "no" | "on" | "off" | "1" | "0"
            ),
            _ => true,
        }
    }

    /// Type name used when casting bound text parameters for this column.
    /// Anything that does not look like a plain catalog type name is
    /// compared as text.
    pub fn cast_type(&self) -> &str {
        let plain = !self.data_type.is_empty()
            && self.data_type.chars().all(|c| {
                c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '(' | ')' | ',' | '[' | ']')
            });

        if plain {
            &self.data_type
        } else {
            "text"
        }
    }
}

/// Verified, ordered set of non-geometry columns of one table.
///
/// This is the allow-list every identifier must pass before it can reach
/// generated SQL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnSet {
    columns: Vec<ColumnDescriptor>,
}

impl ColumnSet {
    /// Build from introspection output, dropping the geometry column
    pub fn from_descriptors(descriptors: Vec<ColumnDescriptor>) -> Self {
        Self {
            columns: descriptors.into_iter().filter(|c| !c.is_geometry).collect(),
        }
    }

    /// Resolve a caller-supplied name to a known column.
    /// Exact match wins; otherwise an unquoted-style lowercase match is tried.
    pub fn resolve(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name).or_else(|| {
            let lowered = name.to_lowercase();
            self.columns.iter().find(|c| c.name == lowered)
        })
    }

    /// Exact lookup, as for a quoted SQL identifier
    pub fn get(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Axis-aligned bounding box `minx,miny,maxx,maxy`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl BoundingBox {
    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Self {
        Self {
            minx,
            miny,
            maxx,
            maxy,
        }
    }

    /// Parse the `bbox` request parameter: exactly four comma-separated numbers
    pub fn parse(value: &str) -> Result<Self> {
        let parts: Vec<&str> = value.split(',').map(str::trim).collect();

        if parts.len() != 4 {
            return Err(FeatureError::BoundingBox(format!(
                "expected 4 comma-separated numbers, got {}",
                parts.len()
            )));
        }

        let mut coords = [0.0f64; 4];
        for (slot, part) in coords.iter_mut().zip(parts.iter()) {
            let parsed: f64 = part.parse().map_err(|_| {
                FeatureError::BoundingBox(format!("'{}' is not a number", part))
            })?;
            if !parsed.is_finite() {
                return Err(FeatureError::BoundingBox(format!(
                    "'{}' is not a finite number",
                    part
                )));
            }
            *slot = parsed;
        }

        Ok(Self::new(coords[0], coords[1], coords[2], coords[3]))
    }

    /// True when min exceeds max on either axis
    pub fn is_inverted(&self) -> bool {
        self.minx > self.maxx || self.miny > self.maxy
    }

    /// Smallest box covering both
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.minx.min(other.minx),
            self.miny.min(other.miny),
            self.maxx.max(other.maxx),
            self.maxy.max(other.maxy),
        )
    }

    /// Grow to include a single position
    pub fn extend(&mut self, x: f64, y: f64) {
        self.minx = self.minx.min(x);
        self.miny = self.miny.min(y);
        self.maxx = self.maxx.max(x);
        self.maxy = self.maxy.max(y);
    }

    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.minx, self.miny, self.maxx, self.maxy]
    }
}

/// Sort direction for the ORDER BY clause
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// Sort key as requested through `sortby=column[:A|:D]`
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SortKey {
    pub column: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        let (column, suffix) = match value.split_once(':') {
            Some((column, suffix)) => (column.trim(), Some(suffix.trim())),
            None => (value.trim(), None),
        };

        if column.is_empty() {
            return Err(FeatureError::invalid_parameter(
                "sortby",
                "missing column name",
            ));
        }

        let direction = match suffix {
            None | Some("A") | Some("a") => SortDirection::Asc,
            Some("D") | Some("d") => SortDirection::Desc,
            Some(other) => {
                return Err(FeatureError::invalid_parameter(
                    "sortby",
                    format!("unknown sort direction '{}', expected A or D", other),
                ))
            }
        };

        Ok(Self::new(column, direction))
    }
}

/// A value bound to a positional query parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Float(f64),
}

/// Parameter list that hands out `$n` placeholders in bind order.
///
/// Each placeholder carries an explicit cast so the store infers exactly
/// the Rust-side type that will be bound.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlParams {
    values: Vec<SqlValue>,
}

impl SqlParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: SqlValue) -> String {
        let cast = match &value {
            SqlValue::Text(_) => "text",
            SqlValue::Int(_) => "bigint",
            SqlValue::Float(_) => "double precision",
        };
        self.values.push(value);
        format!("${}::{}", self.values.len(), cast)
    }

    pub fn push_text(&mut self, value: impl Into<String>) -> String {
        self.push(SqlValue::Text(value.into()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

/// An executable statement: SQL text plus its bound parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Quote an identifier for PostgreSQL, doubling embedded quotes
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
