//! Tile Service for orchestrating tile generation.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         TileService                             │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                    get_tile()                           │    │
//! │  │  1. Compute envelope   3. Execute on store              │    │
//! │  │  2. Build query        4. Return encoded bytes          │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │           │
//! │           ▼                    ▼                    ▼           │
//! │    ┌────────────┐      ┌──────────────┐    ┌──────────────┐     │
//! │    │  envelope  │      │ QueryBuilder │    │  TileStore   │     │
//! │    └────────────┘      └──────────────┘    └──────────────┘     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::error::TileError;
use crate::store::TileStore;

use super::envelope::{compute_envelope, TileIndex};
use super::query::{LayerId, QueryBuilder};

// =============================================================================
// Tile Request
// =============================================================================

/// A validated request for one layer's tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRequest {
    /// Layer to render
    pub layer: LayerId,

    /// Tile address
    pub tile: TileIndex,
}

impl TileRequest {
    pub fn new(layer: LayerId, zoom: u8, x: u32, y: u32) -> Self {
        Self {
            layer,
            tile: TileIndex::new(zoom, x, y),
        }
    }
}

// =============================================================================
// Tile Response
// =============================================================================

/// Response from the tile service.
#[derive(Debug, Clone)]
pub struct TileResponse {
    /// The encoded MVT payload, exactly as returned by the store
    pub data: Bytes,

    /// The request this tile answers
    pub request: TileRequest,
}

// =============================================================================
// Tile Service
// =============================================================================

/// Service turning tile requests into store queries.
///
/// Holds no per-request state; the store is shared between all requests.
pub struct TileService<S: TileStore> {
    store: Arc<S>,
    builder: QueryBuilder,
}

impl<S: TileStore> TileService<S> {
    /// Create a service reading from the default geometry source.
    pub fn new(store: S) -> Self {
        Self::with_builder(store, QueryBuilder::default())
    }

    /// Create a service with a custom query builder.
    pub fn with_builder(store: S, builder: QueryBuilder) -> Self {
        Self {
            store: Arc::new(store),
            builder,
        }
    }

    /// Render a tile.
    ///
    /// An unknown layer or a tile with no intersecting geometries is not an
    /// error; the store returns a minimal (possibly empty) tile.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable, the query fails, or the
    /// query deadline is exceeded.
    pub async fn get_tile(&self, request: TileRequest) -> Result<TileResponse, TileError> {
        let envelope = compute_envelope(request.tile);
        let query = self
            .builder
            .build_for_tile(request.tile, &envelope, request.layer);

        debug!(
            layer = %request.layer,
            tile = %request.tile,
            x_min = envelope.x_min,
            y_min = envelope.y_min,
            x_max = envelope.x_max,
            y_max = envelope.y_max,
            "Querying tile"
        );

        let data = self.store.fetch_tile(&query).await?;

        Ok(TileResponse { data, request })
    }

    /// Get a reference to the underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }
}

// =============================================================================
// Tests
// =============================================================================
