//! Auth Enforcement Integration Tests
//!
//! Verifies token handling in the auth middleware and the role gates on
//! every endpoint group:
//! - Missing, malformed and wrong-type tokens
//! - Missing server secret
//! - Cookie sessions
//! - Provisioning and role sync from the identity provider
//! - Role gates per endpoint

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

mod common;
use common::*;

use feedbackatm::models::prelude::*;

async fn unauthenticated(app: &TestApp, uri: &str) -> (StatusCode, serde_json::Value) {
    app.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
}

async fn with_bearer(app: &TestApp, uri: &str, token: &str) -> (StatusCode, serde_json::Value) {
    app.send(
        Request::builder()
            .uri(uri)
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

// ============================================================================
// Token handling
// ============================================================================

#[tokio::test]
async fn test_protected_endpoints_require_token() {
    let app = test_app(create_test_db().await).await;

    for uri in [
        "/api/auth/me",
        "/api/auth/verify",
        "/api/admin/users",
        "/api/admin/companies",
        "/api/cleaner/tasks",
        "/api/manager/tasks",
        "/api/manager/routes",
    ] {
        let (status, body) = unauthenticated(&app, uri).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} should require auth", uri);
        assert_eq!(body["detail"], "Access token required");
    }
}

#[tokio::test]
async fn test_public_endpoints() {
    let app = test_app(create_test_db().await).await;

    let (status, body) = unauthenticated(&app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_garbage_token_is_forbidden() {
    let app = test_app(create_test_db().await).await;

    let (status, body) = with_bearer(&app, "/api/auth/me", "not-a-jwt").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Invalid or expired token");
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_forbidden() {
    let app = test_app(create_test_db().await).await;
    let claims = serde_json::json!({ "sub": "bob", "exp": Utc::now().timestamp() + 600 });
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"other")).unwrap();

    let (status, _) = with_bearer(&app, "/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_expired_token_is_forbidden() {
    let app = test_app(create_test_db().await).await;
    let claims = serde_json::json!({ "sub": "bob", "exp": Utc::now().timestamp() - 3600 });
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap();

    let (status, _) = with_bearer(&app, "/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_refresh_token_is_unauthorized() {
    let app = test_app(create_test_db().await).await;
    let claims = serde_json::json!({
        "sub": "bob",
        "exp": Utc::now().timestamp() + 600,
        "type": "refresh",
    });
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap();

    let (status, body) = with_bearer(&app, "/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid token type. Access token required.");
}

#[tokio::test]
async fn test_token_without_subject() {
    let app = test_app(create_test_db().await).await;
    let claims = serde_json::json!({ "exp": Utc::now().timestamp() + 600 });
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap();

    let (status, body) = with_bearer(&app, "/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Invalid token: no username");
}

#[tokio::test]
async fn test_missing_secret_is_server_error() {
    let app = test_app_with(create_test_db().await, StubIdentity::default(), None).await;

    let (status, body) = app.get("/api/auth/me", "bob").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "Server configuration error");
}

#[tokio::test]
async fn test_session_cookie_is_accepted() {
    let db = create_test_db().await;
    create_cleaner(&db, "bob", None).await;
    let app = test_app(db).await;

    let (status, body) = app
        .send(
            Request::builder()
                .uri("/api/auth/me")
                .header("cookie", format!("theme=dark; mint_session={}", session_token("bob")))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "bob");
    assert_eq!(body["role"], "CLEANER");
}

// ============================================================================
// Provisioning and role sync
// ============================================================================

#[tokio::test]
async fn test_unknown_user_is_provisioned() {
    let app = test_app(create_test_db().await).await;

    let (status, body) = app.get("/api/auth/verify", "newcomer").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "newcomer");
    assert_eq!(body["user"]["role"], "CLEANER");
    assert_eq!(body["admin"]["username"], "newcomer");

    let (_, body) = app.get("/api/auth/me", "admin").await;
    assert_eq!(body["role"], "ADMIN");

    // A second request reuses the row
    app.get("/api/auth/me", "newcomer").await;
    let rows = User::find()
        .filter(user::Column::Username.eq("newcomer"))
        .all(&app.state.db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_provider_role_wins_and_is_persisted() {
    let db = create_test_db().await;
    let stored = create_cleaner(&db, "bob", None).await;
    let identity = StubIdentity::default().with_role("bob", UserRole::OperationsManager);
    let app = test_app_with(db, identity, Some(TEST_JWT_SECRET)).await;

    let (status, body) = app.get("/api/auth/me", "bob").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "OPERATIONS_MANAGER");

    let row = User::find_by_id(stored.id).one(&app.state.db).await.unwrap().unwrap();
    assert_eq!(row.role, UserRole::OperationsManager);
}

#[tokio::test]
async fn test_provider_outage_falls_back_to_stored_role() {
    let db = create_test_db().await;
    create_user(&db, "mia", UserRole::Manager, None).await;
    let app = test_app_with(db, StubIdentity::unreachable(), Some(TEST_JWT_SECRET)).await;

    let (status, body) = app.get("/api/auth/me", "mia").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "MANAGER");
}

fn token_with_role(username: &str, role: &str) -> String {
    let claims = serde_json::json!({
        "sub": username,
        "exp": Utc::now().timestamp() + 600,
        "type": "access",
        "role": role,
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_token_role_applies_during_provider_outage() {
    let db = create_test_db().await;
    let stored = create_user(&db, "mia", UserRole::Cleaner, None).await;
    let app = test_app_with(db, StubIdentity::unreachable(), Some(TEST_JWT_SECRET)).await;

    let (status, body) = with_bearer(&app, "/api/auth/me", &token_with_role("mia", "SUPERVISOR")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "SUPERVISOR");

    // Only provider-confirmed roles are written back
    let row = User::find_by_id(stored.id).one(&app.state.db).await.unwrap().unwrap();
    assert_eq!(row.role, UserRole::Cleaner);
}

#[tokio::test]
async fn test_provider_role_outranks_token_role() {
    let db = create_test_db().await;
    create_cleaner(&db, "bob", None).await;
    let identity = StubIdentity::default().with_role("bob", UserRole::Observer);
    let app = test_app_with(db, identity, Some(TEST_JWT_SECRET)).await;

    let (status, body) = with_bearer(&app, "/api/auth/me", &token_with_role("bob", "ADMIN")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "OBSERVER");
}

// ============================================================================
// Role gates
// ============================================================================

#[tokio::test]
async fn test_role_gates() {
    let db = create_test_db().await;
    let tenant = create_tenant(&db, "Acme").await;
    create_user(&db, "lead", UserRole::ProjectLead, Some(tenant.company.id)).await;
    create_user(&db, "watcher", UserRole::Observer, Some(tenant.company.id)).await;
    create_user(&db, "boss", UserRole::Admin, None).await;
    let app = test_app(db).await;

    let cases: &[(&str, &str, StatusCode)] = &[
        // Admin surface
        ("/api/admin/users", "boss", StatusCode::OK),
        ("/api/admin/users", "lead", StatusCode::FORBIDDEN),
        ("/api/admin/users", "acme_cleaner", StatusCode::FORBIDDEN),
        ("/api/admin/companies", "lead", StatusCode::OK),
        ("/api/admin/service-points", "acme_manager", StatusCode::FORBIDDEN),
        ("/api/admin/dashboard-stats", "boss", StatusCode::OK),
        ("/api/admin/dashboard-stats", "acme_manager", StatusCode::FORBIDDEN),
        // Cleaner surface
        ("/api/cleaner/tasks", "acme_cleaner", StatusCode::OK),
        ("/api/cleaner/tasks", "acme_manager", StatusCode::FORBIDDEN),
        ("/api/cleaner/history", "boss", StatusCode::FORBIDDEN),
        // Manager surface
        ("/api/manager/tasks", "watcher", StatusCode::OK),
        ("/api/manager/tasks", "acme_cleaner", StatusCode::FORBIDDEN),
        ("/api/manager/stats", "acme_manager", StatusCode::OK),
        ("/api/manager/stats", "lead", StatusCode::FORBIDDEN),
        ("/api/manager/routes", "lead", StatusCode::OK),
        ("/api/manager/routes", "watcher", StatusCode::FORBIDDEN),
        ("/api/manager/dashboard-stats", "watcher", StatusCode::OK),
        ("/api/manager/dashboard-stats", "boss", StatusCode::FORBIDDEN),
    ];

    for (uri, username, expected) in cases {
        let (status, body) = app.get(uri, username).await;
        assert_eq!(status, *expected, "{} as {}: {}", uri, username, body);
        if *expected == StatusCode::FORBIDDEN {
            assert_eq!(body["detail"], "Insufficient permissions");
        }
    }
}
