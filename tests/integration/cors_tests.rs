//! CORS integration tests.
//!
//! Every response, successful or not, must carry the CORS headers; with
//! credentials allowed, the request origin and headers are mirrored back.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use tower::ServiceExt;

use mvt_server::tile::TileService;
use mvt_server::{create_router, RouterConfig};

use super::test_utils::{router_for, sample_tile, MockTileStore};

const ORIGIN: &str = "https://maps.example.com";

fn get_with_origin(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("origin", ORIGIN)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_tile_response_has_cors_headers() {
    let router = router_for(MockTileStore::new().with_layer(7, sample_tile()));

    let response = router
        .oneshot(get_with_origin("/layers/7/vectortiles/10/512/340.pbf/"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), ORIGIN);
    assert_eq!(
        headers.get("access-control-allow-credentials").unwrap(),
        "true"
    );
}

#[tokio::test]
async fn test_error_response_has_cors_headers() {
    let router = router_for(MockTileStore::new());

    let response = router
        .oneshot(get_with_origin("/layers/abc/vectortiles/10/512/340.pbf/"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        ORIGIN
    );
}

#[tokio::test]
async fn test_preflight_allows_methods_and_headers() {
    let router = router_for(MockTileStore::new());

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/layers/7/vectortiles/10/512/340.pbf/")
        .header("origin", ORIGIN)
        .header("access-control-request-method", "GET")
        .header("access-control-request-headers", "x-requested-with")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), ORIGIN);
    assert_eq!(
        headers.get("access-control-allow-credentials").unwrap(),
        "true"
    );

    let methods = headers
        .get("access-control-allow-methods")
        .unwrap()
        .to_str()
        .unwrap();
    for method in ["GET", "POST", "PUT", "DELETE", "OPTIONS"] {
        assert!(methods.contains(method), "{} missing from {}", method, methods);
    }

    assert_eq!(
        headers.get("access-control-allow-headers").unwrap(),
        "x-requested-with"
    );
}

#[tokio::test]
async fn test_configured_origins_are_enforced() {
    let config = RouterConfig::new()
        .with_cors_origins(vec!["https://allowed.example.com".to_string()])
        .with_tracing(false);
    let router = create_router(TileService::new(MockTileStore::new()), config);

    let response = router
        .clone()
        .oneshot(get_with_origin("/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());

    let request = Request::builder()
        .uri("/health")
        .header("origin", "https://allowed.example.com")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "https://allowed.example.com"
    );
}
