use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sea_orm::EntityTrait;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::{require_auth, Authenticated};
use crate::models::prelude::*;
use crate::schemas::{UserView, VerifyResponse};
use crate::state::AppState;

/// Create auth routes; `/login` is the only public one
pub fn auth_routes(state: AppState) -> Router {
    Router::new()
        .route("/verify", get(verify))
        .route("/me", get(me))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .route("/login", post(login))
        .with_state(state)
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Forward credentials to the identity provider and relay its answer
async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Result<Response> {
    req.validate()?;

    let relay = match state.identity.login(&req.username, &req.password).await {
        Ok(relay) => relay,
        Err(e) => {
            tracing::error!(username = %req.username, error = %e, "Identity provider login failed");
            return Err(AppError::Internal(
                "Failed to connect to authentication service".to_string(),
            ));
        }
    };

    let status = StatusCode::from_u16(relay.status).unwrap_or(StatusCode::BAD_GATEWAY);
    if !status.is_success() {
        tracing::info!(username = %req.username, status = relay.status, "Login rejected");
        let detail = relay
            .body
            .get("detail")
            .and_then(|d| d.as_str())
            .unwrap_or("Invalid credentials")
            .to_string();
        return Ok((status, Json(serde_json::json!({ "detail": detail }))).into_response());
    }

    let body = login_body(relay.body, &req.username);
    let mut response = (status, Json(body)).into_response();
    for cookie in &relay.set_cookies {
        match HeaderValue::from_str(cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(_) => tracing::warn!("Dropping malformed Set-Cookie from identity provider"),
        }
    }
    if relay.set_cookies.is_empty() {
        tracing::warn!(username = %req.username, "Identity provider sent no session cookie");
    }

    tracing::info!(username = %req.username, "Login successful");
    Ok(response)
}

/// Provider body with a `user` entry, defaulting to the submitted username
fn login_body(body: serde_json::Value, username: &str) -> serde_json::Value {
    let mut object = match body {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    let has_user = object.get("user").is_some_and(|u| !u.is_null());
    if !has_user {
        object.insert(
            "user".to_string(),
            serde_json::json!({ "username": username }),
        );
    }
    serde_json::Value::Object(object)
}

async fn user_with_company(state: &AppState, user: &user::Model) -> Result<UserView> {
    let company = match user.company_id {
        Some(id) => Company::find_by_id(id).one(&state.db).await?,
        None => None,
    };
    Ok(UserView::new(user).with_company(company.as_ref()))
}

/// The caller after provisioning and role sync
async fn verify(State(state): State<AppState>, auth: Authenticated) -> Result<Json<VerifyResponse>> {
    let view = user_with_company(&state, auth.user()).await?;
    Ok(Json(VerifyResponse {
        admin: view.clone(),
        user: view,
    }))
}

async fn me(State(state): State<AppState>, auth: Authenticated) -> Result<Json<UserView>> {
    Ok(Json(user_with_company(&state, auth.user()).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_body_adds_user() {
        let body = login_body(serde_json::json!({"access_token": "t"}), "ali");
        assert_eq!(body["access_token"], "t");
        assert_eq!(body["user"]["username"], "ali");
    }

    #[test]
    fn test_login_body_keeps_provider_user() {
        let body = login_body(
            serde_json::json!({"user": {"username": "ali", "is_admin": false}}),
            "ignored",
        );
        assert_eq!(body["user"]["is_admin"], false);
        assert_eq!(body["user"]["username"], "ali");
    }

    #[test]
    fn test_login_body_from_empty_response() {
        let body = login_body(serde_json::Value::Null, "vusal");
        assert_eq!(body, serde_json::json!({"user": {"username": "vusal"}}));
    }
}
