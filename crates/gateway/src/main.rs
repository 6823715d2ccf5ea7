//! LitGraph API gateway.
//!
//! The external HTTP surface of the graph pipeline. Handles request
//! routing, validation, the snapshot cache in front of graph builds, and
//! observability (logging, metrics, request ids).

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use litgraph_common::{
    cache::Cache,
    config::{AppConfig, ObservabilityConfig},
    metrics,
};
use litgraph_graph::{create_catalog, GraphService};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub service: Arc<GraphService>,
    pub cache: Option<Cache>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration, then bring up logging with its settings
    let config = AppConfig::load().map_err(|e| {
        eprintln!("failed to load configuration: {e}");
        e
    })?;
    init_tracing(&config.observability);

    info!(version = litgraph_common::VERSION, "starting LitGraph gateway");

    // Initialize metrics
    let metrics_handle = if config.observability.metrics_enabled {
        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("catalog_request_duration_seconds".to_string()),
                metrics::CATALOG_BUCKETS,
            )?
            .set_buckets_for_metric(
                Matcher::Suffix("build_duration_seconds".to_string()),
                metrics::BUILD_BUCKETS,
            )?
            .install_recorder()?;
        Some(handle)
    } else {
        None
    };
    metrics::register_metrics();

    // Catalog client and graph pipeline
    let catalog = create_catalog(&config.catalog)?;
    let service = Arc::new(GraphService::new(catalog, config.graph.clone()));

    // Snapshot cache is optional; the gateway degrades to building every
    // graph from the catalog when it is missing
    let cache = if config.cache_enabled() {
        match Cache::connect(config.cache.clone()).await {
            Ok(cache) => {
                info!("snapshot cache connected");
                Some(cache)
            }
            Err(e) => {
                warn!(error = %e, "snapshot cache unavailable, continuing without it");
                None
            }
        }
    } else {
        info!("snapshot cache disabled");
        None
    };

    let config = Arc::new(config);
    let state = AppState {
        config: config.clone(),
        service,
        cache,
    };

    // Build the router
    let app = create_router(state, metrics_handle);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the main application router
fn create_router(
    state: AppState,
    metrics_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Graph endpoints
        .route("/graphs", post(handlers::graphs::build_graph))
        .route("/graphs/author", post(handlers::graphs::build_author_graph))
        .route("/metadata", post(handlers::graphs::hydrate_metadata))
        // Work endpoints
        .route("/works/{id}", get(handlers::works::get_work))
        // Search endpoints
        .route("/search", get(handlers::search::search));

    let mut app = Router::new().nest("/v1", api_routes);
    if let Some(handle) = metrics_handle {
        app = app.route("/metrics", get(move || std::future::ready(handle.render())));
    }

    app.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(cors)
            .layer(CompressionLayer::new()),
    )
    .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, starting shutdown"),
        _ = terminate => info!("received SIGTERM, starting shutdown"),
    }
}
