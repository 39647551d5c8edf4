use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::services::identity::IdentityProvider;
use crate::services::uploads::UploadStore;

/// Database connection type alias
pub type DbConn = DatabaseConnection;

/// Shared identity provider client
pub type SharedIdentity = Arc<dyn IdentityProvider>;

/// Application state containing all shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: DbConn,
    pub identity: SharedIdentity,
    pub uploads: UploadStore,
    /// HS256 secret used to verify identity provider session tokens
    pub jwt_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        db: DbConn,
        identity: SharedIdentity,
        uploads: UploadStore,
        jwt_secret: Option<String>,
    ) -> Self {
        Self {
            db,
            identity,
            uploads,
            jwt_secret: jwt_secret.map(Arc::from),
        }
    }
}
