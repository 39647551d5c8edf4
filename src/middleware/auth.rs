//! Authentication middleware for API routes
//!
//! Resolves the identity provider session token to a local user, creating
//! the user on first sight and syncing its role from the provider.

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, COOKIE},
        StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, Set, SqlErr};

use crate::config::CONFIG;
use crate::error::AppError;
use crate::models::prelude::*;
use crate::services::identity::{lookup_role_bounded, provisioning_role, resolve_role};
use crate::services::security::decode_session_token;
use crate::state::AppState;

/// Authenticated user stored in request extensions
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Local user with the effective role for this request
    pub user: user::Model,
    /// Raw session token, forwarded on identity mirror calls
    pub token: String,
}

impl AuthenticatedUser {
    pub fn role(&self) -> UserRole {
        self.user.role
    }

    pub fn company_id(&self) -> Option<i64> {
        self.user.company_id
    }
}

/// Auth middleware that validates session tokens
///
/// Returns 401 when no token is present and 403 when it does not verify.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(token) = extract_token(&req, &CONFIG.auth.session_cookie) else {
        return reject(StatusCode::UNAUTHORIZED, "Access token required");
    };

    let Some(secret) = state.jwt_secret.clone() else {
        tracing::error!("JWT_SECRET is not configured");
        return reject(StatusCode::INTERNAL_SERVER_ERROR, "Server configuration error");
    };

    let claims = match decode_session_token(&token, &secret) {
        Ok(claims) => claims,
        Err(AppError::Unauthorized(msg)) => return reject(StatusCode::UNAUTHORIZED, &msg),
        Err(e) => {
            tracing::debug!(error = %e, "Rejected session token");
            return reject(StatusCode::FORBIDDEN, "Invalid or expired token");
        }
    };

    let Some(username) = claims.subject() else {
        return reject(StatusCode::FORBIDDEN, "Invalid token: no username");
    };

    let user = match resolve_user(&state, username, claims.claimed_role()).await {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };

    req.extensions_mut().insert(AuthenticatedUser { user, token });
    next.run(req).await
}

/// Find or provision the local user and apply the provider's role.
///
/// Only a role confirmed by the provider is persisted; the token's own
/// claim applies to this request when the provider has no answer.
async fn resolve_user(
    state: &AppState,
    username: &str,
    claimed: Option<UserRole>,
) -> Result<user::Model, AppError> {
    let external =
        lookup_role_bounded(&*state.identity, username, CONFIG.auth.identity_timeout).await;

    let mut user = match find_by_username(state, username).await? {
        Some(user) => user,
        None => {
            provision(state, username, provisioning_role(username, external.or(claimed))).await?
        }
    };

    if let Some(role) = external.filter(|r| *r != user.role) {
        let mut active: user::ActiveModel = user.clone().into();
        active.role = Set(role);
        active.updated_at = Set(Utc::now());
        match active.update(&state.db).await {
            Ok(updated) => {
                tracing::info!(username, role = %role, "Synced role from identity provider");
                user = updated;
            }
            Err(e) => tracing::warn!(username, error = %e, "Failed to persist synced role"),
        }
    }

    user.role = resolve_role(user.role, external.or(claimed));
    Ok(user)
}

async fn find_by_username(state: &AppState, username: &str) -> Result<Option<user::Model>, DbErr> {
    User::find()
        .filter(user::Column::Username.eq(username))
        .one(&state.db)
        .await
}

async fn provision(state: &AppState, username: &str, role: UserRole) -> Result<user::Model, AppError> {
    let now = Utc::now();
    let created = user::ActiveModel {
        username: Set(username.to_string()),
        role: Set(role),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await;

    match created {
        Ok(user) => {
            tracing::info!(username, role = %role, "Provisioned user on first login");
            Ok(user)
        }
        // A concurrent request provisioned the same user first
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            find_by_username(state, username)
                .await?
                .ok_or_else(|| AppError::Internal("User provisioning failed".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Bearer header first, then the session cookie
fn extract_token(req: &Request, cookie_name: &str) -> Option<String> {
    let bearer = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    req.headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn reject(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "detail": message
        })),
    )
        .into_response()
}
