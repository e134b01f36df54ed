//! API integration tests for tile retrieval and error handling.
//!
//! Tests verify:
//! - Tile retrieval and the MVT content type
//! - 400 responses for malformed parameters, with no store access
//! - 500 responses for store failures, with a generic body
//! - Empty layers and out-of-range tiles answered with empty tiles

use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::http::StatusCode;

use mvt_server::error::StoreError;
use mvt_server::tile::{compute_envelope, TileIndex};
use mvt_server::MVT_CONTENT_TYPE;

use super::test_utils::{body_bytes, get, router_for, sample_tile, MockTileStore};

// =============================================================================
// Basic Tile Retrieval
// =============================================================================

#[tokio::test]
async fn test_tile_retrieval_success() {
    let store = MockTileStore::new().with_layer(7, sample_tile());
    let router = router_for(store);

    let response = get(router, "/layers/7/vectortiles/10/512/340.pbf/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        MVT_CONTENT_TYPE
    );

    let body = body_bytes(response).await;
    assert_eq!(body.as_ref(), sample_tile().as_slice());
}

#[tokio::test]
async fn test_tile_retrieval_without_trailing_slash() {
    let store = MockTileStore::new().with_layer(7, sample_tile());
    let router = router_for(store);

    let response = get(router, "/layers/7/vectortiles/10/512/340.pbf").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        MVT_CONTENT_TYPE
    );
}

#[tokio::test]
async fn test_tile_retrieval_without_pbf_extension() {
    let store = MockTileStore::new().with_layer(7, sample_tile());
    let router = router_for(store);

    let response = get(router, "/layers/7/vectortiles/10/512/340/").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_query_targets_requested_tile_and_layer() {
    let store = MockTileStore::new();
    let log = store.query_log();
    let router = router_for(store);

    let response = get(router, "/layers/7/vectortiles/10/512/340.pbf/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let queries = log.read().await;
    assert_eq!(queries.len(), 1);

    let query = &queries[0];
    let tile = TileIndex::new(10, 512, 340);
    let env = compute_envelope(tile);
    assert_eq!(query.layer.get(), 7);
    assert_eq!(query.tile, Some(tile));
    assert!(query.sql.contains(&format!(
        "ST_MakeEnvelope({}, {}, {}, {}, 3857)",
        env.x_min, env.y_min, env.x_max, env.y_max
    )));
    assert!(query.sql.contains("t.layer_id = 7"));
}

// =============================================================================
// Empty Tiles
// =============================================================================

#[tokio::test]
async fn test_layer_without_geometries_returns_empty_tile() {
    let store = MockTileStore::new().with_layer(7, sample_tile());
    let router = router_for(store);

    let response = get(router, "/layers/8/vectortiles/10/512/340.pbf/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        MVT_CONTENT_TYPE
    );
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_out_of_range_tile_is_not_rejected() {
    let store = MockTileStore::new();
    let counter = store.query_counter();
    let router = router_for(store);

    let response = get(router, "/layers/7/vectortiles/1/5/9.pbf/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Parameter Validation
// =============================================================================

async fn assert_bad_request(uri: &str, expected_message: &str) {
    let store = MockTileStore::new().with_layer(7, sample_tile());
    let counter = store.query_counter();
    let router = router_for(store);

    let response = get(router, uri).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri: {}", uri);

    let body = body_bytes(response).await;
    assert_eq!(String::from_utf8_lossy(&body), expected_message, "uri: {}", uri);
    assert_eq!(counter.load(Ordering::SeqCst), 0, "store queried for {}", uri);
}

#[tokio::test]
async fn test_non_numeric_layer_rejected() {
    assert_bad_request("/layers/abc/vectortiles/10/512/340.pbf/", "Invalid layer ID").await;
}

#[tokio::test]
async fn test_zero_layer_rejected() {
    assert_bad_request("/layers/0/vectortiles/10/512/340.pbf/", "Invalid layer ID").await;
}

#[tokio::test]
async fn test_invalid_zoom_rejected() {
    assert_bad_request("/layers/7/vectortiles/ten/512/340.pbf/", "Invalid zoom level").await;
    assert_bad_request("/layers/7/vectortiles/256/0/0.pbf/", "Invalid zoom level").await;
}

#[tokio::test]
async fn test_zoom_beyond_max_rejected() {
    assert_bad_request("/layers/7/vectortiles/31/0/0.pbf/", "Invalid zoom level").await;
    assert_bad_request("/layers/7/vectortiles/60/0/0.pbf/", "Invalid zoom level").await;
}

#[tokio::test]
async fn test_invalid_x_rejected() {
    assert_bad_request("/layers/7/vectortiles/10/-1/340.pbf/", "Invalid x coordinate").await;
}

#[tokio::test]
async fn test_invalid_y_rejected() {
    assert_bad_request("/layers/7/vectortiles/10/512/abc.pbf/", "Invalid y coordinate").await;
    assert_bad_request("/layers/7/vectortiles/10/512/340.png/", "Invalid y coordinate").await;
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let router = router_for(MockTileStore::new());
    let response = get(router, "/layers/7/tiles/10/512/340.pbf/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Store Failures
// =============================================================================

async fn assert_store_failure(err: StoreError) {
    let detail = err.to_string();
    let router = router_for(MockTileStore::new().failing(err));

    let response = get(router, "/layers/7/vectortiles/10/512/340.pbf/").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_ne!(
        response.headers().get("content-type").unwrap(),
        MVT_CONTENT_TYPE
    );

    let body = String::from_utf8_lossy(&body_bytes(response).await).to_string();
    assert_eq!(body, "Database query failed");
    assert!(!body.contains(&detail));
}

#[tokio::test]
async fn test_store_unavailable_returns_500() {
    assert_store_failure(StoreError::Unavailable(
        "connection refused (os error 111)".to_string(),
    ))
    .await;
}

#[tokio::test]
async fn test_query_failure_returns_500() {
    assert_store_failure(StoreError::Query(
        "relation \"maps_layers_geometries\" does not exist".to_string(),
    ))
    .await;
}

#[tokio::test]
async fn test_query_timeout_returns_500() {
    assert_store_failure(StoreError::Timeout(Duration::from_secs(30))).await;
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let store = MockTileStore::new();
    let counter = store.query_counter();
    let router = router_for(store);

    let response = get(router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_bytes(response).await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}
