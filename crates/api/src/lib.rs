//! HTTP API for the civic issue reporting service.
//!
//! Routing, request extraction, rate limiting and the response envelope.
//! Business rules live in `civicwatch-core`; handlers stay thin.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod rate_limit;
pub mod response;

pub use endpoints::{RouterConfig, router};
pub use middleware::{AppState, auth_middleware};
pub use rate_limit::{
    ApiRateLimiter, RateLimitConfig, RateLimiterState, rate_limit_auth_middleware,
    rate_limit_middleware, rate_limit_write_middleware,
};
pub use response::ApiResponse;
