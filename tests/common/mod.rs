//! Test helpers and utilities for integration testing.
//!
//! Provides an in-memory database with migrations applied, row builders for
//! the tenant model, a scripted identity provider and a router wired to it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use tower::util::ServiceExt;

use feedbackatm::endpoints::create_router;
use feedbackatm::error::{AppError, Result};
use feedbackatm::migrations::Migrator;
use feedbackatm::models::prelude::*;
use feedbackatm::services::identity::{IdentityProvider, LoginRelay, MirroredUpdate, MirroredUser};
use feedbackatm::services::uploads::UploadStore;
use feedbackatm::state::AppState;

pub const TEST_JWT_SECRET: &str = "feedbackatm-test-secret";

/// Create an in-memory SQLite database for testing
pub async fn create_test_db() -> DatabaseConnection {
    // A single connection keeps every query on the same in-memory database
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opts)
        .await
        .expect("Failed to create test database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run test migrations");

    db
}

// ============================================================================
// Row builders
// ============================================================================

pub async fn create_company(db: &DatabaseConnection, name: &str) -> company::Model {
    let now = Utc::now();
    company::ActiveModel {
        name: Set(name.to_string()),
        description: Set(Some(format!("{} test company", name))),
        address: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn create_point(
    db: &DatabaseConnection,
    company_id: i64,
    name: &str,
    point_type: ServicePointType,
) -> service_point::Model {
    let now = Utc::now();
    service_point::ActiveModel {
        name: Set(name.to_string()),
        point_type: Set(point_type),
        address: Set(format!("{} street 1", name)),
        latitude: Set(40.4093),
        longitude: Set(49.8671),
        company_id: Set(company_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn create_user(
    db: &DatabaseConnection,
    username: &str,
    role: UserRole,
    company_id: Option<i64>,
) -> user::Model {
    let now = Utc::now();
    user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(Some(format!("{}@example.com", username))),
        role: Set(role),
        company_id: Set(company_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn create_cleaner(
    db: &DatabaseConnection,
    username: &str,
    company_id: Option<i64>,
) -> user::Model {
    create_user(db, username, UserRole::Cleaner, company_id).await
}

pub async fn assign(db: &DatabaseConnection, cleaner_id: i64, point_id: i64) {
    cleaner_assignment::ActiveModel {
        cleaner_id: Set(cleaner_id),
        service_point_id: Set(point_id),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap();
}

/// Insert a task directly, bypassing the lifecycle rules
pub async fn insert_task(
    db: &DatabaseConnection,
    point_id: i64,
    cleaner_id: i64,
    status: TaskStatus,
    scheduled_at: Option<DateTime<Utc>>,
    generation_day: Option<NaiveDate>,
) -> cleaning_task::Model {
    let now = Utc::now();
    cleaning_task::ActiveModel {
        service_point_id: Set(point_id),
        cleaner_id: Set(cleaner_id),
        status: Set(status),
        scheduled_at: Set(scheduled_at),
        generation_day: Set(generation_day),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

/// One company with two points, a cleaner assigned to both and a manager
pub struct Tenant {
    pub company: company::Model,
    pub atm: service_point::Model,
    pub bus_stop: service_point::Model,
    pub cleaner: user::Model,
    pub manager: user::Model,
}

pub async fn create_tenant(db: &DatabaseConnection, prefix: &str) -> Tenant {
    let company = create_company(db, prefix).await;
    let atm = create_point(db, company.id, &format!("{} ATM", prefix), ServicePointType::Atm).await;
    let bus_stop = create_point(
        db,
        company.id,
        &format!("{} Stop", prefix),
        ServicePointType::BusStop,
    )
    .await;
    let cleaner = create_cleaner(db, &format!("{}_cleaner", prefix.to_lowercase()), Some(company.id)).await;
    let manager = create_user(
        db,
        &format!("{}_manager", prefix.to_lowercase()),
        UserRole::Manager,
        Some(company.id),
    )
    .await;
    assign(db, cleaner.id, atm.id).await;
    assign(db, cleaner.id, bus_stop.id).await;

    Tenant {
        company,
        atm,
        bus_stop,
        cleaner,
        manager,
    }
}

// ============================================================================
// Identity provider stub
// ============================================================================

/// Scripted identity provider recording every mirrored change
#[derive(Default)]
pub struct StubIdentity {
    pub roles: Mutex<HashMap<String, UserRole>>,
    pub login_status: Mutex<Option<u16>>,
    pub unreachable: bool,
    pub calls: Mutex<Vec<String>>,
}

impl StubIdentity {
    pub fn with_role(self, username: &str, role: UserRole) -> Self {
        self.roles.lock().unwrap().insert(username.to_string(), role);
        self
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable {
            return Err(AppError::ServiceUnavailable("identity provider down".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for StubIdentity {
    async fn project_role(&self, username: &str) -> Result<Option<UserRole>> {
        self.check_reachable()?;
        Ok(self.roles.lock().unwrap().get(username).copied())
    }

    async fn login(&self, username: &str, password: &str) -> Result<LoginRelay> {
        self.check_reachable()?;
        let status = self.login_status.lock().unwrap().unwrap_or(200);
        if status != 200 {
            return Ok(LoginRelay {
                status,
                set_cookies: Vec::new(),
                body: serde_json::json!({ "detail": "Incorrect username or password" }),
            });
        }
        Ok(LoginRelay {
            status,
            set_cookies: vec![format!(
                "mint_session={}; Path=/; HttpOnly",
                session_token(username)
            )],
            body: serde_json::json!({ "access_token": format!("token-for-{}-{}", username, password.len()) }),
        })
    }

    async fn create_user(&self, _token: &str, user: &MirroredUser) -> Result<()> {
        self.calls.lock().unwrap().push(format!("create:{}", user.username));
        Ok(())
    }

    async fn update_user(&self, _token: &str, username: &str, _update: &MirroredUpdate) -> Result<()> {
        self.calls.lock().unwrap().push(format!("update:{}", username));
        Ok(())
    }

    async fn delete_user(&self, _token: &str, username: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("delete:{}", username));
        Ok(())
    }
}

// ============================================================================
// Tokens and app
// ============================================================================

/// HS256 access token for `username`, valid for one hour
pub fn session_token(username: &str) -> String {
    let claims = serde_json::json!({
        "sub": username,
        "exp": Utc::now().timestamp() + 3600,
        "type": "access",
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub identity: Arc<StubIdentity>,
    pub uploads_dir: tempfile::TempDir,
}

pub async fn test_app(db: DatabaseConnection) -> TestApp {
    test_app_with(db, StubIdentity::default(), Some(TEST_JWT_SECRET)).await
}

pub async fn test_app_with(
    db: DatabaseConnection,
    identity: StubIdentity,
    jwt_secret: Option<&str>,
) -> TestApp {
    let uploads_dir = tempfile::tempdir().unwrap();
    let uploads = UploadStore::new(uploads_dir.path(), 1024 * 1024);
    let identity = Arc::new(identity);

    let state = AppState::new(
        db,
        identity.clone(),
        uploads,
        jwt_secret.map(str::to_string),
    );

    TestApp {
        router: create_router(state.clone()),
        state,
        identity,
        uploads_dir,
    }
}

impl TestApp {
    /// Send a request and return the status with the body parsed as JSON
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, username: &str) -> (StatusCode, serde_json::Value) {
        self.send(authed(Request::builder().method("GET").uri(uri), username).body(Body::empty()).unwrap())
            .await
    }

    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        username: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        self.send(
            authed(Request::builder().method(method).uri(uri), username)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

pub fn authed(builder: axum::http::request::Builder, username: &str) -> axum::http::request::Builder {
    builder.header("authorization", format!("Bearer {}", session_token(username)))
}
