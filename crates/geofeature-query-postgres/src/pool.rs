//! Bounded async pool of `tokio-postgres` clients, backed by deadpool.

use crate::error::pool_error;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime, Status};
use geofeature_query::{FeatureError, Result};
use tokio_postgres::NoTls;
use tracing::debug;

/// A checked-out client; dropping it returns the connection to the pool
pub type PooledClient = deadpool_postgres::Object;

/// Pool for one logical database.
///
/// Connections open lazily up to `max_connections`. Broken connections are
/// discarded when they are handed back.
pub struct PgPool {
    name: String,
    inner: Pool,
}

impl PgPool {
    pub fn new(name: impl Into<String>, url: impl Into<String>, max_connections: u32) -> Result<Self> {
        let name = name.into();

        let mut config = Config::new();
        config.url = Some(url.into());
        config.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        config.pool = Some(PoolConfig::new(max_connections.max(1) as usize));

        let inner = config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| {
                FeatureError::configuration(format!(
                    "invalid PostgreSQL settings for database '{}': {}",
                    name, e
                ))
            })?;

        Ok(Self { name, inner })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_connections(&self) -> usize {
        self.inner.status().max_size
    }

    /// Open `count` connections up front and park them as idle
    pub async fn warm_up(&self, count: u32) -> Result<()> {
        let count = (count as usize).min(self.max_connections());

        let mut opened = Vec::with_capacity(count);
        for _ in 0..count {
            opened.push(self.get().await?);
        }
        drop(opened);

        if count > 0 {
            debug!("Opened {} connection(s) for database {}", count, self.name);
        }
        Ok(())
    }

    /// Check out a client, waiting for a free slot when the pool is exhausted
    pub async fn get(&self) -> Result<PooledClient> {
        self.inner
            .get()
            .await
            .map_err(|e| pool_error(&self.name, e))
    }

    pub fn status(&self) -> Status {
        self.inner.status()
    }

    /// Refuse new checkouts and drop every idle connection
    pub fn close(&self) {
        self.inner.close();
        debug!("Closed pool for database {}", self.name);
    }
}
