//! Application bootstrapper
//!
//! Handles all initialization and setup for the FeedbackATM backend.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::CONFIG;
use crate::db;
use crate::endpoints;
use crate::services::identity::HttpIdentityProvider;
use crate::services::scheduler;
use crate::services::uploads::UploadStore;
use crate::state::{AppState, SharedIdentity};

/// Bootstrap and run the application
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Starting FeedbackATM backend v{}", CONFIG.version);

    let state = init_services().await?;

    if CONFIG.scheduler.enabled {
        scheduler::start_scheduler(Arc::new(state.db.clone()));
    } else {
        tracing::info!("Task scheduler disabled");
    }

    let app = create_app(state);

    serve(app).await
}

/// Initialize tracing/logging
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("feedbackatm={},tower_http=info", CONFIG.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if CONFIG.log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_ansi(false))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_ansi(false))
            .init();
    }
}

/// Initialize all application services
async fn init_services() -> anyhow::Result<AppState> {
    let conn = db::connect().await?;
    tracing::info!("Database connection established");

    let identity: SharedIdentity = Arc::new(HttpIdentityProvider::from_config()?);
    tracing::info!(url = %CONFIG.auth.identity_url, "Identity provider client initialized");

    let uploads = UploadStore::from_config();
    uploads.ensure_dir().await?;
    tracing::info!(dir = %uploads.root().display(), "Upload directory ready");

    if CONFIG.auth.jwt_secret.is_none() {
        tracing::warn!("JWT secret not configured; authenticated requests will fail");
    }

    Ok(AppState::new(
        conn,
        identity,
        uploads,
        CONFIG.auth.jwt_secret.clone(),
    ))
}

/// Build the CORS layer from the configured origin list
fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = CONFIG
        .server
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    // Credentialed requests cannot use wildcards
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::AllowMethods::mirror_request())
        .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Create the main application router
fn create_app(state: AppState) -> Router {
    endpoints::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

/// Start the HTTP server
async fn serve(app: Router) -> anyhow::Result<()> {
    let ip: std::net::IpAddr = CONFIG.server.host.parse()?;
    let addr = SocketAddr::new(ip, CONFIG.server.port);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
