use deadpool_postgres::PoolError;
use geofeature_query::FeatureError;
use tracing::error;

/// Message of a PostgreSQL error including detail, hint, position and
/// column when the server supplied them
pub fn describe_pg_error(e: &tokio_postgres::Error) -> String {
    match e.as_db_error() {
        Some(db_error) => {
            let mut msg = db_error.message().to_string();

            if let Some(detail) = db_error.detail() {
                msg.push_str(&format!("\nDetail: {}", detail));
            }

            if let Some(hint) = db_error.hint() {
                msg.push_str(&format!("\nHint: {}", hint));
            }

            if let Some(position) = db_error.position() {
                msg.push_str(&format!("\nPosition: {:?}", position));
            }

            if let Some(column) = db_error.column() {
                msg.push_str(&format!("\nColumn: {}", column));
            }

            msg
        }
        // Non-database error (connection error, etc.)
        None => e.to_string(),
    }
}

/// Map a failed statement to `StoreQuery`, or `Connection` when the
/// connection itself went away
pub fn query_error(context: &str, sql: &str, e: &tokio_postgres::Error) -> FeatureError {
    let message = describe_pg_error(e);
    error!("{} failed: {}", context, message);
    error!("Failed SQL: {}", sql);

    if e.is_closed() {
        FeatureError::Connection(format!("{}: {}", context, message))
    } else {
        FeatureError::StoreQuery(format!("{}: {}", context, message))
    }
}

pub fn connection_error(database: &str, e: &tokio_postgres::Error) -> FeatureError {
    FeatureError::Connection(format!(
        "PostgreSQL connection for database '{}' failed: {}",
        database,
        describe_pg_error(e)
    ))
}

/// Map a failed checkout. Every pool failure leaves the database
/// unreachable for this request.
pub fn pool_error(database: &str, e: PoolError) -> FeatureError {
    match e {
        PoolError::Backend(e) => connection_error(database, &e),
        PoolError::Closed => {
            FeatureError::Connection(format!("pool for database '{}' is closed", database))
        }
        other => FeatureError::Connection(format!(
            "no PostgreSQL connection for database '{}': {}",
            database, other
        )),
    }
}
