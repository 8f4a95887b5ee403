//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Setup test database:
//!   docker-compose -f docker-compose.test.yml up -d test-db
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `civicwatch_test`)
//!   `TEST_DB_PASSWORD` (default: `civicwatch_test`)
//!   `TEST_DB_NAME` (default: `civicwatch_test`)

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::Utc;
use civicwatch_db::entities::report::{Category, Severity, Status};
use civicwatch_db::entities::{report, report_history, upvote, user};
use civicwatch_db::migrations::Migrator;
use civicwatch_db::repositories::{
    ReportHistoryRepository, ReportRepository, UpvoteRepository, UserRepository,
};
use civicwatch_db::test_utils::{TestDatabase, TestDbConfig};
use sea_orm::{DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_connection() {
    let config = TestDbConfig::default();
    let result = TestDatabase::with_config(config).await;
    assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_cleanup() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    let result = db.cleanup().await;
    assert!(result.is_ok(), "Cleanup failed: {:?}", result.err());
}

fn test_user_model(id: &str, email: &str) -> user::ActiveModel {
    user::ActiveModel {
        id: Set(id.to_string()),
        name: Set("Test User".to_string()),
        email: Set(email.to_string()),
        password_hash: Set("$argon2id$test".to_string()),
        role: Set(user::Role::User),
        is_active: Set(true),
        token: Set(None),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
}

fn test_report_model(id: &str, user_id: &str, lat: f64, lng: f64) -> report::ActiveModel {
    report::ActiveModel {
        id: Set(id.to_string()),
        title: Set("Pothole on Main St".to_string()),
        description: Set("Deep pothole near the crosswalk".to_string()),
        category: Set(Category::PublicWorks),
        severity: Set(Severity::High),
        status: Set(Status::Reported),
        latitude: Set(lat),
        longitude: Set(lng),
        location_name: Set("Main St".to_string()),
        media: Set(serde_json::json!([])),
        user_id: Set(user_id.to_string()),
        upvote_count: Set(0),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
}

fn history_model(id: &str, report_id: &str, status: Status, by: &str) -> report_history::ActiveModel {
    report_history::ActiveModel {
        id: Set(id.to_string()),
        report_id: Set(report_id.to_string()),
        status: Set(status),
        notes: Set(None),
        updated_by: Set(by.to_string()),
        created_at: Set(Utc::now().into()),
    }
}

async fn migrated(db: &TestDatabase) -> Arc<DatabaseConnection> {
    Migrator::up(db.connection(), None)
        .await
        .expect("migrations failed");
    Arc::clone(&db.conn)
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_report_lifecycle_roundtrip() {
    let db = TestDatabase::create_unique().await.expect("create db");
    let conn = migrated(&db).await;

    let users = UserRepository::new(conn.clone());
    let reports = ReportRepository::new(conn.clone());
    let history = ReportHistoryRepository::new(conn.clone());

    users
        .create(test_user_model("u1", "u1@example.com"))
        .await
        .unwrap();

    reports
        .create_with_history(
            test_report_model("r1", "u1", 51.5, -0.12),
            history_model("h1", "r1", Status::Reported, "u1"),
        )
        .await
        .unwrap();

    // Transition writes the status and its history row atomically.
    let updated = reports
        .apply_transition(
            "r1",
            Status::Acknowledged,
            history_model("h2", "r1", Status::Acknowledged, "admin1"),
        )
        .await
        .unwrap();
    assert_eq!(updated.status, Status::Acknowledged);

    let entries = history.find_by_report("r1").await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].status, Status::Reported);
    assert_eq!(entries[1].status, Status::Acknowledged);

    // Deleting the report cascades to its history.
    reports.delete("r1").await.unwrap();
    assert_eq!(history.count_by_report("r1").await.unwrap(), 0);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_upvote_unique_per_user() {
    let db = TestDatabase::create_unique().await.expect("create db");
    let conn = migrated(&db).await;

    let users = UserRepository::new(conn.clone());
    let reports = ReportRepository::new(conn.clone());
    let upvotes = UpvoteRepository::new(conn.clone());

    users
        .create(test_user_model("u1", "u1@example.com"))
        .await
        .unwrap();
    reports
        .create(test_report_model("r1", "u1", 51.5, -0.12))
        .await
        .unwrap();

    upvotes
        .create(upvote::ActiveModel {
            id: Set("v1".to_string()),
            user_id: Set("u1".to_string()),
            report_id: Set("r1".to_string()),
            created_at: Set(Utc::now().into()),
        })
        .await
        .unwrap();

    // Second upvote by the same user hits the unique index.
    let dup = upvotes
        .create(upvote::ActiveModel {
            id: Set("v2".to_string()),
            user_id: Set("u1".to_string()),
            report_id: Set("r1".to_string()),
            created_at: Set(Utc::now().into()),
        })
        .await;
    assert!(dup.is_err());

    assert_eq!(upvotes.delete_by_user_and_report("u1", "r1").await.unwrap(), 1);
    assert_eq!(upvotes.delete_by_user_and_report("u1", "r1").await.unwrap(), 0);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_find_nearby_orders_by_distance() {
    let db = TestDatabase::create_unique().await.expect("create db");
    let conn = migrated(&db).await;

    let users = UserRepository::new(conn.clone());
    let reports = ReportRepository::new(conn.clone());

    users
        .create(test_user_model("u1", "u1@example.com"))
        .await
        .unwrap();

    // ~0m, ~1.1km and ~111km from the query point.
    reports
        .create(test_report_model("near", "u1", 51.5000, -0.1200))
        .await
        .unwrap();
    reports
        .create(test_report_model("mid", "u1", 51.5100, -0.1200))
        .await
        .unwrap();
    reports
        .create(test_report_model("far", "u1", 52.5000, -0.1200))
        .await
        .unwrap();

    let results = reports
        .find_nearby(51.5, -0.12, 5_000.0, 20, 0)
        .await
        .unwrap();

    let ids: Vec<&str> = results.iter().map(|(m, _)| m.id.as_str()).collect();
    assert_eq!(ids, vec!["near", "mid"]);
    assert!(results[0].1 < results[1].1);

    assert_eq!(reports.count_nearby(51.5, -0.12, 5_000.0).await.unwrap(), 2);

    db.drop_database().await.unwrap();
}

#[test]
fn test_database_url_format() {
    let config = TestDbConfig {
        host: "testhost".to_string(),
        port: 5432,
        username: "testuser".to_string(),
        password: "testpass".to_string(),
        database: "testdb".to_string(),
    };

    let url = config.database_url();
    assert!(url.starts_with("postgres://"));
    assert!(url.contains("testhost"));
    assert!(url.contains("testdb"));
}
