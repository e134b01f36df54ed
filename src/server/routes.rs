//! Router configuration for the vector tile server.
//!
//! This module defines the HTTP routes and applies CORS and tracing middleware.
//!
//! # Route Structure
//!
//! ```text
//! /health                                       - Health check
//! /layers/{pk}/vectortiles/{z}/{x}/{y}.pbf/     - Tile endpoint
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mvt_server::server::routes::{create_router, RouterConfig};
//! use mvt_server::store::PgTileStore;
//! use mvt_server::tile::TileService;
//!
//! let tile_service = TileService::new(PgTileStore::new(pool));
//! let router = create_router(tile_service, RouterConfig::new());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use axum::{routing::get, Router};
use http::Method;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, tile_handler, AppState};
use crate::store::TileStore;
use crate::tile::TileService;

/// Path of the tile endpoint; `{filename}` captures both `{y}` and `{y}.pbf`.
pub const TILE_ROUTE: &str = "/layers/{pk}/vectortiles/{z}/{x}/{filename}/";

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = mirror any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a router configuration.
    ///
    /// By default:
    /// - CORS allows any origin, with credentials
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// The tile route is registered with and without its trailing slash. Every
/// response, including errors, passes through the CORS layer.
pub fn create_router<S>(tile_service: TileService<S>, config: RouterConfig) -> Router
where
    S: TileStore + 'static,
{
    let app_state = AppState::new(tile_service);
    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route(TILE_ROUTE, get(tile_handler::<S>))
        .route(TILE_ROUTE.trim_end_matches('/'), get(tile_handler::<S>))
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
///
/// Credentials are allowed, so wildcards are expressed by mirroring the
/// request's origin and headers.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    match &config.cors_origins {
        None => cors.allow_origin(AllowOrigin::mirror_request()),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
