//! HTTP request handlers for the vector tile API.
//!
//! # Endpoints
//!
//! - `GET /layers/{pk}/vectortiles/{z}/{x}/{y}.pbf/` - Serve a layer tile
//! - `GET /health` - Health check endpoint

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::TileError;
use crate::store::TileStore;
use crate::tile::{LayerId, TileRequest, TileService, MAX_ZOOM};

/// Media type of Mapbox Vector Tile payloads.
pub const MVT_CONTENT_TYPE: &str = "application/vnd.mapbox-vector-tile";

/// Body returned for every store-side failure.
pub const STORE_FAILURE_MESSAGE: &str = "Database query failed";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the tile service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<S: TileStore> {
    /// The tile service for processing tile requests
    pub tile_service: Arc<TileService<S>>,
}

impl<S: TileStore> AppState<S> {
    pub fn new(tile_service: TileService<S>) -> Self {
        Self {
            tile_service: Arc::new(tile_service),
        }
    }
}

impl<S: TileStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            tile_service: Arc::clone(&self.tile_service),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Raw path parameters for tile requests.
///
/// Extracted from: `/layers/{pk}/vectortiles/{z}/{x}/{filename}`
/// where filename is `{y}.pbf` or `{y}`. Kept as text so that each segment
/// can be rejected with its own message.
#[derive(Debug, Deserialize)]
pub struct TilePathParams {
    /// Layer primary key
    pub pk: String,

    /// Zoom level
    pub z: String,

    /// Tile column
    pub x: String,

    /// Tile row with optional .pbf extension (e.g., "340" or "340.pbf")
    pub filename: String,
}

impl TilePathParams {
    /// Validate every segment and build the tile request.
    ///
    /// Segments are checked in the order zoom, x, y, layer; the first failure
    /// is reported.
    pub fn parse(&self) -> Result<TileRequest, TileError> {
        let zoom: u8 = parse_decimal(&self.z)
            .filter(|zoom| *zoom <= MAX_ZOOM)
            .ok_or_else(|| bad("zoom level", &self.z))?;
        let x: u32 = parse_decimal(&self.x).ok_or_else(|| bad("x coordinate", &self.x))?;

        let y_str = self
            .filename
            .strip_suffix(".pbf")
            .unwrap_or(&self.filename);
        let y: u32 = parse_decimal(y_str).ok_or_else(|| bad("y coordinate", y_str))?;

        let layer: LayerId = parse_decimal(&self.pk).ok_or_else(|| bad("layer ID", &self.pk))?;

        Ok(TileRequest::new(layer, zoom, x, y))
    }
}

/// Parse a plain run of ASCII digits; signs and whitespace are rejected.
fn parse_decimal<T: FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn bad(param: &'static str, value: &str) -> TileError {
    TileError::bad_parameter(param, value)
}

// =============================================================================
// Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert TileError to a plain-text HTTP response.
///
/// Client errors name the offending parameter. Store errors are logged with
/// their detail at ERROR level and answered with a generic message.
impl IntoResponse for TileError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            TileError::BadParameter { param, .. } => (
                StatusCode::BAD_REQUEST,
                "bad_parameter",
                format!("Invalid {}", param),
            ),
            TileError::StoreUnavailable(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_unavailable",
                STORE_FAILURE_MESSAGE.to_string(),
            ),
            TileError::QueryFailed(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "query_failed",
                STORE_FAILURE_MESSAGE.to_string(),
            ),
            TileError::QueryTimeout(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "query_timeout",
                STORE_FAILURE_MESSAGE.to_string(),
            ),
        };

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                self
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                self
            );
        }

        (status, message).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle vector tile requests.
///
/// # Endpoint
///
/// `GET /layers/{pk}/vectortiles/{z}/{x}/{y}.pbf/`
///
/// # Response
///
/// - `200 OK`: encoded tile with `Content-Type: application/vnd.mapbox-vector-tile`
///   (an empty body when no geometry intersects the tile)
/// - `400 Bad Request`: a path segment is not a valid integer
/// - `500 Internal Server Error`: the database failed or timed out
pub async fn tile_handler<S: TileStore>(
    State(state): State<AppState<S>>,
    Path(params): Path<TilePathParams>,
) -> Result<Response, TileError> {
    let request = params.parse()?;

    let response = state.tile_service.get_tile(request).await?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, MVT_CONTENT_TYPE)],
        response.data,
    )
        .into_response())
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
