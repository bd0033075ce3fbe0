use http::StatusCode;
use thiserror::Error;

/// Unified error type for every feature-service operation
#[derive(Error, Debug)]
pub enum FeatureError {
    /// Table is absent from the catalog (`missing`), or its columns
    /// could not be read
    #[error("Schema error for '{table}': {message}")]
    SchemaError {
        table: String,
        message: String,
        missing: bool,
    },

    /// Filter text does not follow the grammar
    #[error("Invalid filter at position {position}: {message}")]
    FilterSyntax { position: usize, message: String },

    /// Filter references a column the table does not have
    #[error("Unknown field in filter: {0}")]
    FilterField(String),

    /// bbox parameter is malformed
    #[error("Invalid bbox: {0}")]
    BoundingBox(String),

    /// Any other request parameter is malformed or refers to an unknown column
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    /// No store is registered for the logical database
    #[error("Unknown database: {0}")]
    UnknownDatabase(String),

    /// Store rejected or failed to execute a query
    #[error("Query failed: {0}")]
    StoreQuery(String),

    /// Connection could not be established or was lost
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Single-item lookup matched no row
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid service or database configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl FeatureError {
    /// Create a schema error for a table that is not in the catalog
    pub fn missing_table(table: impl Into<String>) -> Self {
        FeatureError::SchemaError {
            table: table.into(),
            message: "table does not exist".to_string(),
            missing: true,
        }
    }

    /// Create a schema error for a table whose catalog entry is unusable
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        FeatureError::SchemaError {
            table: table.into(),
            message: message.into(),
            missing: false,
        }
    }

    /// True for a schema error raised because the table does not exist
    pub fn is_missing_table(&self) -> bool {
        matches!(self, FeatureError::SchemaError { missing: true, .. })
    }

    /// Create a "not found" error with custom message
    pub fn not_found(msg: impl Into<String>) -> Self {
        FeatureError::NotFound(msg.into())
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        FeatureError::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a filter syntax error at a byte offset of the filter text
    pub fn filter_syntax(position: usize, message: impl Into<String>) -> Self {
        FeatureError::FilterSyntax {
            position,
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        FeatureError::Configuration(msg.into())
    }

    /// HTTP status the boundary should answer with
    pub fn status_code(&self) -> StatusCode {
        match self {
            FeatureError::FilterSyntax { .. }
            | FeatureError::FilterField(_)
            | FeatureError::BoundingBox(_)
            | FeatureError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            FeatureError::SchemaError { missing: true, .. }
            | FeatureError::UnknownDatabase(_)
            | FeatureError::NotFound(_) => StatusCode::NOT_FOUND,
            FeatureError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            FeatureError::SchemaError { missing: false, .. }
            | FeatureError::StoreQuery(_)
            | FeatureError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            FeatureError::SchemaError { missing: true, .. } => "Collection Not Found",
            FeatureError::SchemaError { missing: false, .. } => "Schema Error",
            FeatureError::FilterSyntax { .. } => "Invalid Filter",
            FeatureError::FilterField(_) => "Unknown Filter Field",
            FeatureError::BoundingBox(_) => "Invalid Bounding Box",
            FeatureError::InvalidParameter { .. } => "Invalid Parameter",
            FeatureError::UnknownDatabase(_) => "Unknown Database",
            FeatureError::StoreQuery(_) => "Query Failed",
            FeatureError::Connection(_) => "Store Unavailable",
            FeatureError::NotFound(_) => "Feature Not Found",
            FeatureError::Configuration(_) => "Configuration Error",
        }
    }

    /// RFC 7807 problem document describing this error
    pub fn problem_details(&self) -> serde_json::Value {
        let status = self.status_code();
        let mut body = serde_json::json!({
            "type": "about:blank",
            "title": self.title(),
            "status": status.as_u16(),
            "detail": self.to_string(),
        });

        match self {
            FeatureError::FilterSyntax { position, .. } => {
                body["position"] = serde_json::json!(position);
            }
            FeatureError::InvalidParameter { name, .. } => {
                body["parameter"] = serde_json::json!(name);
            }
            _ => {}
        }

        body
    }
}

pub type Result<T> = std::result::Result<T, FeatureError>;
