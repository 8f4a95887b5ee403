//! API middleware.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use civicwatch_common::{AppError, MediaStore};
use civicwatch_core::{QueryService, ReportService, UserService};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub report_service: ReportService,
    pub query_service: QueryService,
    pub media_store: MediaStore,
    /// Per-file upload cap in bytes.
    pub max_upload_bytes: u64,
}

/// Authentication middleware.
///
/// Resolves a bearer token to a user and stores it in request extensions;
/// routes decide via extractors whether authentication is required.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.user_service.authenticate_by_token(token).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            // Deactivation takes effect on the next request.
            Err(e @ AppError::Forbidden(_)) => return e.into_response(),
            // Unknown token: fall through, the route may be public.
            Err(_) => {}
        }
    }

    next.run(req).await
}
