use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vitrine_api::config::ServerConfig;
use vitrine_api::router::build_app_router;
use vitrine_api::state::{AppState, Breakers};
use vitrine_cache::{CacheStore, MemoryStore, RedisStore};
use vitrine_core::metrics::Metrics;
use vitrine_db::PgCatalog;
use vitrine_search::OpenSearchClient;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vitrine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        api_base = %config.api_base(),
        "Loaded server configuration"
    );

    // --- Database (lazy pool; the catalog path degrades when it is down) ---
    let pool = vitrine_db::create_pool(&config.database_url, 20, config.timeout_connect)
        .expect("Invalid DATABASE_URL");
    match vitrine_db::health_check(&pool).await {
        Ok(()) => tracing::info!("Database reachable"),
        Err(err) => tracing::warn!(error = %err, "Database unreachable, starting degraded"),
    }
    let catalog = Arc::new(PgCatalog::new(pool));

    // --- Search engine client ---
    let engine = Arc::new(
        OpenSearchClient::new(
            config.opensearch_node.clone(),
            config.opensearch_index.clone(),
            config.timeout_opensearch,
            config.timeout_connect,
        )
        .expect("Failed to build engine client"),
    );
    tracing::info!(node = %config.opensearch_node, index = %config.opensearch_index, "Engine client ready");

    // --- Cache / throttle store ---
    let cache: Arc<dyn CacheStore> = match RedisStore::connect(&config.redis_url).await {
        Ok(store) => {
            tracing::info!("Connected to Redis");
            Arc::new(store)
        }
        Err(err) => {
            // Cache failures are absorbed by policy; an unreachable Redis at
            // startup downgrades to a per-process store rather than aborting.
            tracing::warn!(error = %err, "Redis unreachable, using in-process store");
            Arc::new(MemoryStore::new())
        }
    };

    // --- Breakers and metrics ---
    let breakers = Arc::new(Breakers::new(&config.breaker));
    let metrics = Arc::new(Metrics::default());

    // --- App state and router ---
    let state = AppState {
        config: Arc::new(config.clone()),
        engine,
        catalog,
        cache,
        breakers,
        metrics,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
