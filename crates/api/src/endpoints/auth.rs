//! Authentication endpoints.

use axum::{
    Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use civicwatch_common::AppResult;
use civicwatch_core::{LoginInput, RegisterInput};
use civicwatch_db::entities::user;
use serde::Serialize;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    rate_limit::{RateLimiterState, rate_limit_auth_middleware},
    response::ApiResponse,
};

/// Public view of a user account.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: &'static str,
    pub is_active: bool,
    pub created_at: String,
}

impl From<&user::Model> for UserResponse {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.as_str(),
            is_active: user.is_active,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Session response: the user plus their bearer token.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Create a new account.
async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let (user, token) = state.user_service.register(input).await?;

    Ok(ApiResponse::created(SessionResponse {
        user: UserResponse::from(&user),
        token,
    }))
}

/// Sign in to an existing account.
async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let (user, token) = state.user_service.login(input).await?;

    Ok(ApiResponse::ok(SessionResponse {
        user: UserResponse::from(&user),
        token,
    }))
}

/// Sign out, invalidating the presented token.
async fn logout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<()>> {
    state.user_service.logout(&user.id).await?;
    Ok(ApiResponse::message("Logged out"))
}

/// Get the authenticated user.
async fn me(AuthUser(user): AuthUser) -> ApiResponse<UserResponse> {
    ApiResponse::ok(UserResponse::from(&user))
}

pub fn router(limiter: RateLimiterState) -> Router<AppState> {
    // Credential endpoints get the strict auth rate limit tier.
    let credentials = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route_layer(from_fn_with_state(limiter, rate_limit_auth_middleware));

    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .merge(credentials)
}
