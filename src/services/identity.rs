//! Identity provider gateway
//!
//! The identity provider owns passwords, sessions and project membership.
//! This module asks it for a user's current project role, proxies logins,
//! and mirrors local user changes back to it.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::CONFIG;
use crate::error::{AppError, Result};
use crate::models::user::UserRole;

/// Response relayed verbatim from the identity provider's login endpoint
#[derive(Debug, Clone)]
pub struct LoginRelay {
    pub status: u16,
    pub set_cookies: Vec<String>,
    pub body: serde_json::Value,
}

/// User attributes sent when mirroring a locally created user
#[derive(Debug, Clone, Serialize)]
pub struct MirroredUser {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
    pub role: UserRole,
}

/// Changes sent when mirroring a local user update
#[derive(Debug, Clone, Default)]
pub struct MirroredUpdate {
    pub email: Option<String>,
    pub role: Option<UserRole>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current project role for `username`, or `None` when the provider has none
    async fn project_role(&self, username: &str) -> Result<Option<UserRole>>;

    /// Forward credentials and return the provider's answer unchanged
    async fn login(&self, username: &str, password: &str) -> Result<LoginRelay>;

    async fn create_user(&self, token: &str, user: &MirroredUser) -> Result<()>;

    async fn update_user(&self, token: &str, username: &str, update: &MirroredUpdate)
        -> Result<()>;

    async fn delete_user(&self, token: &str, username: &str) -> Result<()>;
}

// ============================================================================
// Role resolution
// ============================================================================

/// Effective role for a request: the provider's answer wins when there is one
pub fn resolve_role(stored: UserRole, external: Option<UserRole>) -> UserRole {
    external.unwrap_or(stored)
}

/// Role written when a user is provisioned on first sight
pub fn provisioning_role(username: &str, external: Option<UserRole>) -> UserRole {
    external.unwrap_or(if username == "admin" {
        UserRole::Admin
    } else {
        UserRole::Cleaner
    })
}

/// Ask the provider for a role, giving up after `timeout`.
///
/// Returns `None` on timeout, transport failure or an unknown role so the
/// caller falls back to the stored role.
pub async fn lookup_role_bounded(
    identity: &dyn IdentityProvider,
    username: &str,
    timeout: Duration,
) -> Option<UserRole> {
    match tokio::time::timeout(timeout, identity.project_role(username)).await {
        Ok(Ok(role)) => role,
        Ok(Err(e)) => {
            tracing::warn!(username, error = %e, "Identity provider role lookup failed");
            None
        }
        Err(_) => {
            tracing::warn!(username, "Identity provider role lookup timed out");
            None
        }
    }
}

// ============================================================================
// HTTP implementation
// ============================================================================

#[derive(Debug, Deserialize)]
struct UserProjectsResponse {
    #[serde(default)]
    is_admin: bool,
    #[serde(default)]
    projects: Vec<ProjectMembership>,
}

#[derive(Debug, Deserialize, Serialize)]
struct ProjectMembership {
    project_name: String,
    role: String,
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: serde_json::Value,
    username: String,
}

/// Identity provider reached over its REST API
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    project: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: impl Into<String>, project: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project: project.into(),
        })
    }

    pub fn from_config() -> Result<Self> {
        Self::new(
            CONFIG.auth.identity_url.clone(),
            CONFIG.auth.identity_project.clone(),
        )
    }

    fn role_from_projects(&self, data: UserProjectsResponse) -> Option<UserRole> {
        if data.is_admin {
            return Some(UserRole::Admin);
        }
        let membership = data
            .projects
            .into_iter()
            .find(|p| p.project_name == self.project)?;
        match UserRole::from_str(&membership.role) {
            Ok(role) => Some(role),
            Err(e) => {
                tracing::warn!(role = %membership.role, "Ignoring project role: {}", e);
                None
            }
        }
    }

    fn memberships_for(&self, role: UserRole) -> Vec<ProjectMembership> {
        if role == UserRole::Admin {
            Vec::new()
        } else {
            vec![ProjectMembership {
                project_name: self.project.clone(),
                role: role.to_string(),
            }]
        }
    }

    /// Find the provider's id for `username` by scanning its user list
    async fn remote_user_id(&self, token: &str, username: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(format!("{}/admin/users", self.base_url))
            .query(&[("limit", "1000")])
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ServiceUnavailable(format!(
                "Identity provider user list returned {}",
                response.status()
            )));
        }

        let users: Vec<RemoteUser> = response.json().await?;
        Ok(users
            .into_iter()
            .find(|u| u.username == username)
            .map(|u| match u.id {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            }))
    }

    async fn expect_success(response: reqwest::Response, action: &str) -> Result<()> {
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::ServiceUnavailable(format!(
            "Identity provider {} failed: {} {}",
            action, status, body
        )))
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn project_role(&self, username: &str) -> Result<Option<UserRole>> {
        let response = self
            .client
            .get(format!(
                "{}/auth/user-projects?username={}",
                self.base_url,
                urlencoding::encode(username)
            ))
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!(username, status = %response.status(), "No project data for user");
            return Ok(None);
        }

        let data: UserProjectsResponse = response.json().await?;
        Ok(self.role_from_projects(data))
    }

    async fn login(&self, username: &str, password: &str) -> Result<LoginRelay> {
        let response = self
            .client
            .post(format!("{}/auth/login", self.base_url))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;

        let status = response.status().as_u16();
        let set_cookies = response
            .headers()
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect();
        let body = response
            .json::<serde_json::Value>()
            .await
            .unwrap_or(serde_json::Value::Null);

        Ok(LoginRelay {
            status,
            set_cookies,
            body,
        })
    }

    async fn create_user(&self, token: &str, user: &MirroredUser) -> Result<()> {
        let payload = serde_json::json!({
            "username": user.username,
            "password": user.password,
            "email": user.email,
            "is_admin": user.role == UserRole::Admin,
            "is_active": true,
            "projects": self.memberships_for(user.role),
        });

        let response = self
            .client
            .post(format!("{}/admin/users", self.base_url))
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;

        Self::expect_success(response, "user creation").await
    }

    async fn update_user(
        &self,
        token: &str,
        username: &str,
        update: &MirroredUpdate,
    ) -> Result<()> {
        let Some(remote_id) = self.remote_user_id(token, username).await? else {
            tracing::warn!(username, "User not found in identity provider, skipping update");
            return Ok(());
        };

        let mut changes = serde_json::Map::new();
        if let Some(email) = &update.email {
            changes.insert("email".to_string(), serde_json::json!(email));
        }
        if let Some(role) = update.role {
            changes.insert(
                "is_admin".to_string(),
                serde_json::json!(role == UserRole::Admin),
            );
            if role != UserRole::Admin {
                let response = self
                    .client
                    .put(format!(
                        "{}/admin/users/{}/projects",
                        self.base_url, remote_id
                    ))
                    .bearer_auth(token)
                    .json(&serde_json::json!({ "projects": self.memberships_for(role) }))
                    .send()
                    .await?;
                Self::expect_success(response, "project update").await?;
            }
        }

        if changes.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .put(format!("{}/admin/users/{}", self.base_url, remote_id))
            .bearer_auth(token)
            .json(&changes)
            .send()
            .await?;

        Self::expect_success(response, "user update").await
    }

    async fn delete_user(&self, token: &str, username: &str) -> Result<()> {
        let Some(remote_id) = self.remote_user_id(token, username).await? else {
            tracing::warn!(username, "User not found in identity provider, skipping deletion");
            return Ok(());
        };

        let response = self
            .client
            .delete(format!("{}/admin/users/{}", self.base_url, remote_id))
            .bearer_auth(token)
            .send()
            .await?;

        Self::expect_success(response, "user deletion").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> HttpIdentityProvider {
        HttpIdentityProvider::new("http://identity.local/", "FeedbackATM").unwrap()
    }

    #[test]
    fn test_external_role_wins() {
        assert_eq!(
            resolve_role(UserRole::Cleaner, Some(UserRole::Manager)),
            UserRole::Manager
        );
    }

    #[test]
    fn test_stored_role_used_without_external() {
        assert_eq!(resolve_role(UserRole::Supervisor, None), UserRole::Supervisor);
    }

    #[test]
    fn test_provisioning_defaults() {
        assert_eq!(provisioning_role("admin", None), UserRole::Admin);
        assert_eq!(provisioning_role("ali", None), UserRole::Cleaner);
        assert_eq!(
            provisioning_role("admin", Some(UserRole::Observer)),
            UserRole::Observer
        );
    }

    #[test]
    fn test_base_url_is_trimmed() {
        assert_eq!(provider().base_url, "http://identity.local");
    }

    #[test]
    fn test_admin_flag_maps_to_admin() {
        let data = UserProjectsResponse {
            is_admin: true,
            projects: vec![],
        };
        assert_eq!(provider().role_from_projects(data), Some(UserRole::Admin));
    }

    #[test]
    fn test_project_role_is_selected_by_name() {
        let data: UserProjectsResponse = serde_json::from_value(serde_json::json!({
            "is_admin": false,
            "projects": [
                {"project_name": "FeedbackQR", "role": "ADMIN"},
                {"project_name": "FeedbackATM", "role": "MANAGER"}
            ]
        }))
        .unwrap();
        assert_eq!(provider().role_from_projects(data), Some(UserRole::Manager));
    }

    #[test]
    fn test_unknown_project_role_is_ignored() {
        let data: UserProjectsResponse = serde_json::from_value(serde_json::json!({
            "projects": [{"project_name": "FeedbackATM", "role": "USER"}]
        }))
        .unwrap();
        assert_eq!(provider().role_from_projects(data), None);
    }

    #[test]
    fn test_admins_get_no_project_membership() {
        assert!(provider().memberships_for(UserRole::Admin).is_empty());
        let memberships = provider().memberships_for(UserRole::Cleaner);
        assert_eq!(memberships.len(), 1);
        assert_eq!(memberships[0].role, "CLEANER");
    }
}
