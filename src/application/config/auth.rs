use std::env;
use std::time::Duration;

/// Settings for the external identity provider
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider. `None` means every
    /// authenticated route answers 500 until it is configured.
    pub jwt_secret: Option<String>,
    pub identity_url: String,
    /// Project name whose membership carries the user's role
    pub identity_project: String,
    /// Upper bound for a role lookup before falling back to the stored role
    pub identity_timeout: Duration,
    pub session_cookie: String,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        Self {
            jwt_secret: env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()),
            identity_url: env::var("MINTAUTH_URL")
                .unwrap_or_else(|_| "http://mintauth-backend:8000".to_string()),
            identity_project: env::var("FEEDBACKATM_IDENTITY_PROJECT")
                .unwrap_or_else(|_| "FeedbackATM".to_string()),
            identity_timeout: Duration::from_millis(
                env::var("FEEDBACKATM_IDENTITY_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(3000),
            ),
            session_cookie: env::var("FEEDBACKATM_SESSION_COOKIE")
                .unwrap_or_else(|_| "mint_session".to_string()),
        }
    }
}
