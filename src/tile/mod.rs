//! Tile service layer.
//!
//! This module turns a tile address into an encoded Mapbox Vector Tile:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │ TileRequest
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              Tile Service               │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │   envelope   │  │  QueryBuilder   │  │
//! │  │ (z/x/y → m)  │  │ (bounds → SQL)  │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │ TileQuery
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │               TileStore                 │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`compute_envelope`]: Web Mercator bounds of a [`TileIndex`]
//! - [`QueryBuilder`] / [`build_tile_query`]: the `ST_AsMVT` query for an envelope and layer
//! - [`TileService`]: main entry point, runs the query on a [`TileStore`](crate::store::TileStore)
//!
//! # Example
//!
//! ```
//! use mvt_server::tile::{build_tile_query, compute_envelope, LayerId, TileIndex};
//!
//! let envelope = compute_envelope(TileIndex::new(1, 0, 0));
//! assert_eq!(envelope.x_max, 0.0);
//!
//! let query = build_tile_query(&envelope, LayerId::new(7).unwrap());
//! assert!(query.sql.contains("ST_AsMVT"));
//! ```

mod envelope;
mod query;
mod service;

pub use envelope::{
    compute_envelope, Envelope, TileIndex, MAX_ZOOM, WORLD_MERC_MAX, WORLD_MERC_MIN,
    WORLD_MERC_SIZE,
};
pub use query::{
    build_tile_query, GeometrySource, InvalidLayerId, LayerId, QueryBuilder, TileQuery,
    DEFAULT_GEOMETRY_COLUMN, DEFAULT_ID_COLUMN, DEFAULT_LAYER_COLUMN, DEFAULT_SOURCE_SRID,
    DEFAULT_TABLE, DENSIFY_FACTOR, WEB_MERCATOR_SRID,
};
pub use service::{TileRequest, TileResponse, TileService};
