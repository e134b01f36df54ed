//! PostgreSQL/PostGIS tile store backed by an sqlx connection pool.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::tile::TileQuery;

use super::TileStore;

/// Default maximum number of pooled connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default time to wait for a free pooled connection.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline for a single tile query.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Pool Settings
// =============================================================================

/// Connection pool parameters.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// `postgres://` connection string
    pub database_url: String,

    /// Upper bound on open connections
    pub max_connections: u32,

    /// How long a request may wait for a connection
    pub acquire_timeout: Duration,
}

impl PoolSettings {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }

    fn options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
    }
}

/// Open the process-wide pool and verify that one connection can be made.
pub async fn connect_pool(settings: &PoolSettings) -> Result<PgPool, StoreError> {
    let pool = settings
        .options()
        .connect(&settings.database_url)
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

    info!(
        max_connections = settings.max_connections,
        "Database pool ready"
    );

    Ok(pool)
}

// =============================================================================
// PgTileStore
// =============================================================================

/// Tile store executing queries on a shared [`PgPool`].
///
/// Each call checks a connection out of the pool for the duration of one
/// query; the connection goes back to the pool when the guard drops, on
/// success, failure, timeout or cancellation alike.
#[derive(Debug, Clone)]
pub struct PgTileStore {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgTileStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Set the deadline applied to every tile query (connection wait included).
    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    /// Build a store whose pool connects on first use.
    pub fn connect_lazy(settings: &PoolSettings) -> Result<Self, StoreError> {
        let pool = settings
            .options()
            .connect_lazy(&settings.database_url)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self::new(pool))
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Report the PostGIS version of the connected database.
    pub async fn postgis_version(&self) -> Result<String, StoreError> {
        let version: String = sqlx::query_scalar("SELECT PostGIS_Version()")
            .fetch_one(&self.pool)
            .await?;
        Ok(version)
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl TileStore for PgTileStore {
    async fn fetch_tile(&self, query: &TileQuery) -> Result<Bytes, StoreError> {
        let fetch = async {
            let mut conn = self.pool.acquire().await?;

            // Literals differ per tile, so the statement is not cached.
            sqlx::query_scalar::<_, Option<Vec<u8>>>(query.as_str())
                .persistent(false)
                .fetch_one(&mut *conn)
                .await
        };

        match tokio::time::timeout(self.query_timeout, fetch).await {
            Ok(Ok(tile)) => {
                let tile = tile.map(Bytes::from).unwrap_or_default();
                debug!(layer = %query.layer, bytes = tile.len(), "Tile query returned");
                Ok(tile)
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(StoreError::Timeout(self.query_timeout)),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
