//! HTTP server layer for the vector tile server.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │        GET /layers/{pk}/vectortiles/{z}/{x}/{y}.pbf/            │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │           routes            │  │
//! │  │ (validation, responses)  │  │  (router, CORS, tracing)    │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    health_handler, tile_handler, AppState, HealthResponse, TilePathParams, MVT_CONTENT_TYPE,
    STORE_FAILURE_MESSAGE,
};
pub use routes::{create_router, RouterConfig, TILE_ROUTE};
