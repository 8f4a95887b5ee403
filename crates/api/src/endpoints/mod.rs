//! HTTP endpoint handlers.

pub mod admin;
pub mod auth;
pub mod reports;

use std::time::Duration;

use axum::Router;
use tower_http::timeout::TimeoutLayer;

use crate::{middleware::AppState, rate_limit::RateLimiterState};

/// Per-route-group limits applied when building the router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Timeout for ordinary endpoints, in seconds.
    pub request_timeout_secs: u64,
    /// Timeout for endpoints that accept media uploads, in seconds.
    pub upload_timeout_secs: u64,
    /// Request body cap for upload endpoints, in bytes.
    pub max_body_bytes: usize,
}

/// Build the API router. Mounted under `/api` by the server.
pub fn router(limiter: RateLimiterState, cfg: &RouterConfig) -> Router<AppState> {
    let request_timeout = TimeoutLayer::new(Duration::from_secs(cfg.request_timeout_secs));

    Router::new()
        .nest("/auth", auth::router(limiter.clone()).layer(request_timeout.clone()))
        .nest("/admin", admin::router(limiter.clone()).layer(request_timeout))
        .nest("/reports", reports::router(limiter, cfg))
}
