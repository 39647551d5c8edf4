pub mod admin;
pub mod auth;
pub mod cleaner;
pub mod manager;

use axum::{
    body::Body,
    http::{header, HeaderValue},
    middleware as axum_middleware,
    response::Response,
    routing::get,
    Json, Router,
};
use tower_http::services::ServeDir;

use crate::error::{AppError, Result};
use crate::middleware::security_headers;
use crate::services::export::ExportFile;
use crate::state::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .nest("/api/auth", auth::auth_routes(state.clone()))
        .nest("/api/admin", admin::admin_routes(state.clone()))
        .nest("/api/cleaner", cleaner::cleaner_routes(state.clone()))
        .nest("/api/manager", manager::manager_routes(state.clone()))
        .nest_service("/uploads", ServeDir::new(state.uploads.root()))
        .layer(axum_middleware::from_fn(security_headers))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "feedbackatm-backend"
    }))
}

/// Send a rendered export as a file download
pub(crate) fn attachment(file: ExportFile) -> Result<Response> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename={}", file.file_name))
        .map_err(|e| AppError::Internal(format!("Invalid file name: {}", e)))?;

    Response::builder()
        .header(header::CONTENT_TYPE, file.content_type)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from(file.bytes))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}
