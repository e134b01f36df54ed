//! MVT Server - Mapbox Vector Tiles from PostGIS.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mvt_server::{
    config::{CheckConfig, Cli, Command, ServeConfig},
    connect_pool,
    server::{create_router, RouterConfig},
    store::{PgTileStore, TileStore},
    tile::{compute_envelope, LayerId, QueryBuilder, TileIndex, TileService},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let source = config.source.geometry_source();
    let builder = match QueryBuilder::new(source) {
        Ok(builder) => builder,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("MVT Server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Database: {}", config.database.redacted_url());
    info!(
        "  Pool: {} connections, {}s acquire timeout",
        config.database.db_max_connections, config.database.db_acquire_timeout_secs
    );
    info!("  Query timeout: {}s", config.query_timeout_secs);
    info!(
        "  Geometries: {}.{} (SRID {}), layer column {}",
        builder.source().table,
        builder.source().geometry_column,
        builder.source().srid,
        builder.source().layer_column
    );
    match config.cors_origins {
        Some(ref origins) => info!("  CORS origins: {}", origins.join(", ")),
        None => info!("  CORS origins: any"),
    }

    info!("");
    info!("Connecting to database...");
    let pool = match connect_pool(&config.database.pool_settings()).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("  Failed to connect to database: {}", e);
            error!("");
            error!("  Please check:");
            error!("    - The database URL is correct and the server is reachable");
            error!("    - The credentials are valid");
            return ExitCode::FAILURE;
        }
    };

    let store = PgTileStore::new(pool).with_query_timeout(config.query_timeout());
    match store.postgis_version().await {
        Ok(version) => info!("  Connected, PostGIS {}", version),
        Err(e) => warn!("  Connected, but PostGIS is not available: {}", e),
    }

    let tile_service = TileService::with_builder(store.clone(), builder);
    let router = create_router(tile_service, build_router_config(&config));

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            store.close().await;
            return ExitCode::FAILURE;
        }
    };

    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("    curl http://{}/health", addr);
    info!(
        "    curl -o tile.pbf http://{}/layers/<pk>/vectortiles/0/0/0.pbf/",
        addr
    );
    info!("");

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("Closing database pool...");
    store.close().await;

    if let Err(e) = result {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Resolve when the process receives Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "mvt_server=debug,tower_http=debug"
    } else {
        "mvt_server=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new();

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("MVT Server Configuration Check");
    println!("═══════════════════════════════");
    println!();

    if let Err(e) = config.validate() {
        println!("✗ Configuration: {}", e);
        return ExitCode::FAILURE;
    }
    println!("✓ Database: {}", config.database.redacted_url());

    let builder = match QueryBuilder::new(config.source.geometry_source()) {
        Ok(builder) => builder,
        Err(e) => {
            println!("✗ Geometry source: {}", e);
            return ExitCode::FAILURE;
        }
    };
    println!(
        "✓ Geometry source: {}.{}",
        builder.source().table,
        builder.source().geometry_column
    );
    println!();

    print!("Testing database connection... ");
    let pool = match connect_pool(&config.database.pool_settings()).await {
        Ok(pool) => {
            println!("✓ success");
            pool
        }
        Err(e) => {
            println!("✗ failed");
            println!();
            println!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let store = PgTileStore::new(pool);

    print!("Checking PostGIS... ");
    match store.postgis_version().await {
        Ok(version) => println!("✓ {}", version),
        Err(e) => {
            println!("✗ unavailable");
            println!();
            println!("Error: {}", e);
            store.close().await;
            return ExitCode::FAILURE;
        }
    }

    if let Some(layer) = config.layer.and_then(LayerId::new) {
        print!("Rendering layer {} at 0/0/0... ", layer);

        let tile = TileIndex::new(0, 0, 0);
        let envelope = compute_envelope(tile);
        let query = builder.build_for_tile(tile, &envelope, layer);

        match store.fetch_tile(&query).await {
            Ok(data) if data.is_empty() => println!("✓ empty tile (no geometries)"),
            Ok(data) => println!("✓ {} bytes", data.len()),
            Err(e) => {
                println!("✗ failed");
                println!();
                println!("Error: {}", e);
                store.close().await;
                return ExitCode::FAILURE;
            }
        }
    }

    store.close().await;

    println!();
    println!("═══════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}
