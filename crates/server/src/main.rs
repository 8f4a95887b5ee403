//! Civicwatch server entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{Json, Router, middleware, routing::get};
use civicwatch_api::{
    RouterConfig, middleware::AppState, rate_limit::RateLimiterState, router as api_router,
};
use civicwatch_common::{Config, LocalStorage, MediaStore};
use civicwatch_core::{QueryService, ReportService, UserService};
use civicwatch_db::repositories::{
    ReportHistoryRepository, ReportRepository, StatsRepository, UpvoteRepository, UserRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
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
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "message": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "civicwatch=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting civicwatch server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = civicwatch_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    civicwatch_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize media storage
    let media_store: MediaStore = Arc::new(LocalStorage::new(
        PathBuf::from(&config.storage.base_path),
        config.storage.base_url.clone(),
    ));

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let report_repo = ReportRepository::new(Arc::clone(&db));
    let history_repo = ReportHistoryRepository::new(Arc::clone(&db));
    let upvote_repo = UpvoteRepository::new(Arc::clone(&db));
    let stats_repo = StatsRepository::new(Arc::clone(&db));

    // Initialize services
    let user_service = UserService::new(user_repo)
        .with_media_cleanup(report_repo.clone(), Arc::clone(&media_store));
    let report_service = ReportService::new(report_repo.clone(), history_repo, upvote_repo)
        .with_media_store(Arc::clone(&media_store));
    let query_service = QueryService::new(report_repo, stats_repo);

    // Initialize API rate limiters
    let rate_limiter = RateLimiterState::new();

    // Periodically drop stale rate limit windows.
    {
        let limiter = rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            loop {
                interval.tick().await;
                limiter.user_limiter.cleanup(300).await;
                limiter.ip_limiter.cleanup(300).await;
            }
        });
    }

    let max_upload_bytes = config.storage.max_upload_bytes as u64;

    // Create app state
    let state = AppState {
        user_service,
        report_service,
        query_service,
        media_store,
        max_upload_bytes,
    };

    let router_config = RouterConfig {
        request_timeout_secs: config.server.request_timeout_secs,
        upload_timeout_secs: config.server.upload_timeout_secs,
        // Headroom for several attachments plus multipart framing.
        max_body_bytes: config.storage.max_upload_bytes.saturating_mul(5),
    };

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .nest_service("/media", ServeDir::new(&config.storage.base_path))
        .nest("/api", api_router(rate_limiter.clone(), &router_config))
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            civicwatch_api::rate_limit::rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            civicwatch_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
