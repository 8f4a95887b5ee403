//! API integration tests.
//!
//! Routing, extractors and the response envelope against a mock database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use civicwatch_api::{
    RouterConfig, middleware::AppState, rate_limit::RateLimiterState, router as api_router,
};
use civicwatch_common::{LocalStorage, MediaStore};
use civicwatch_core::{QueryService, ReportService, UserService};
use civicwatch_db::entities::{report, report_history};
use civicwatch_db::repositories::{
    ReportHistoryRepository, ReportRepository, StatsRepository, UpvoteRepository, UserRepository,
};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn test_state(db: DatabaseConnection) -> AppState {
    let db = Arc::new(db);

    let user_repo = UserRepository::new(Arc::clone(&db));
    let report_repo = ReportRepository::new(Arc::clone(&db));
    let history_repo = ReportHistoryRepository::new(Arc::clone(&db));
    let upvote_repo = UpvoteRepository::new(Arc::clone(&db));
    let stats_repo = StatsRepository::new(Arc::clone(&db));

    let media_store: MediaStore = Arc::new(LocalStorage::new(
        std::env::temp_dir().join("civicwatch-api-test"),
        "/media".to_string(),
    ));

    AppState {
        user_service: UserService::new(user_repo),
        report_service: ReportService::new(report_repo.clone(), history_repo, upvote_repo),
        query_service: QueryService::new(report_repo, stats_repo),
        media_store,
        max_upload_bytes: 1024 * 1024,
    }
}

fn test_router(db: DatabaseConnection) -> Router {
    let cfg = RouterConfig {
        request_timeout_secs: 5,
        upload_timeout_secs: 10,
        max_body_bytes: 4 * 1024 * 1024,
    };
    api_router(RateLimiterState::new(), &cfg).with_state(test_state(db))
}

fn empty_db() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

fn test_report(id: &str) -> report::Model {
    report::Model {
        id: id.to_string(),
        title: "Broken streetlight".to_string(),
        description: "Streetlight out on Elm St".to_string(),
        category: report::Category::PublicWorks,
        severity: report::Severity::Medium,
        status: report::Status::Reported,
        latitude: 51.5,
        longitude: -0.12,
        location_name: "Elm St".to_string(),
        media: serde_json::json!([]),
        user_id: "user1".to_string(),
        upvote_count: 0,
        created_at: chrono::Utc::now().into(),
        updated_at: None,
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let app = test_router(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/nonexistent/endpoint")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_my_reports_requires_auth() {
    let app = test_router(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/reports/mine")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_users_requires_auth() {
    let app = test_router(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin/users")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let app = test_router(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/register")
                .method("POST")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"name":"Ada","email":"ada@example.com","password":"short"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["success"], Value::Bool(false));
}

#[tokio::test]
async fn test_get_report_is_public_and_includes_history() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![test_report("report1")]])
        .append_query_results([vec![report_history::Model {
            id: "hist1".to_string(),
            report_id: "report1".to_string(),
            status: report::Status::Reported,
            notes: None,
            updated_by: "user1".to_string(),
            created_at: chrono::Utc::now().into(),
        }]])
        .into_connection();
    let app = test_router(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/reports/report1")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], Value::Bool(true));
    assert_eq!(json["data"]["id"], "report1");
    assert_eq!(json["data"]["status"], "reported");
    assert_eq!(json["data"]["history"][0]["status"], "reported");
}

#[tokio::test]
async fn test_get_missing_report_returns_404_envelope() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<report::Model>::new()])
        .into_connection();
    let app = test_router(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/reports/missing")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["success"], Value::Bool(false));
}

#[tokio::test]
async fn test_auth_endpoints_are_rate_limited() {
    let app = test_router(empty_db());

    let mut last_status = StatusCode::OK;
    // The auth tier allows 10 requests per window.
    for _ in 0..12 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/auth/login")
                    .method("POST")
                    .header("Content-Type", "application/json")
                    .header("X-Real-Ip", "203.0.113.9")
                    .body(Body::from(r#"{"email":"a@b.com","password":"12345678"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        last_status = response.status();
    }

    assert_eq!(last_status, StatusCode::TOO_MANY_REQUESTS);
}
