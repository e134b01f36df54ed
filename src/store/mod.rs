//! Spatial store layer.
//!
//! The tile service never talks to PostgreSQL directly. It hands a
//! [`TileQuery`](crate::tile::TileQuery) to a [`TileStore`], which executes it
//! and returns the single encoded `bytea` column.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Tile Service               │
//! └────────────────────┬────────────────────┘
//!                      │ TileQuery
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            TileStore Trait              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │   PgTileStore (sqlx PgPool, deadline)   │
//! └─────────────────────────────────────────┘
//! ```

mod postgres;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;
use crate::tile::TileQuery;

pub use postgres::{
    connect_pool, PgTileStore, PoolSettings, DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_QUERY_TIMEOUT,
};

/// Executes tile queries against a spatial database.
#[async_trait]
pub trait TileStore: Send + Sync {
    /// Run the query and return the encoded tile.
    ///
    /// An empty layer is not an error: implementations return empty bytes.
    async fn fetch_tile(&self, query: &TileQuery) -> Result<Bytes, StoreError>;
}
