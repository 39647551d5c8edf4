//! Best-effort propagation of local user changes to the identity provider.
//!
//! Events are sent once, after the local write has committed. Failures are
//! logged and dropped; the local store stays authoritative.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::services::identity::{IdentityProvider, MirroredUpdate, MirroredUser};

/// A committed local change to mirror
#[derive(Debug, Clone)]
pub enum UserEvent {
    Created(MirroredUser),
    Updated {
        /// Username before the update; the provider knows the user by it
        username: String,
        update: MirroredUpdate,
    },
    Deleted {
        username: String,
    },
}

impl UserEvent {
    fn username(&self) -> &str {
        match self {
            UserEvent::Created(user) => &user.username,
            UserEvent::Updated { username, .. } | UserEvent::Deleted { username } => username,
        }
    }

    fn action(&self) -> &'static str {
        match self {
            UserEvent::Created(_) => "create",
            UserEvent::Updated { .. } => "update",
            UserEvent::Deleted { .. } => "delete",
        }
    }
}

/// Send `event` in the background using the caller's session token.
///
/// Returns `None` when there is no token to authenticate with.
pub fn dispatch(
    identity: Arc<dyn IdentityProvider>,
    event: UserEvent,
    token: Option<String>,
) -> Option<JoinHandle<()>> {
    let Some(token) = token else {
        tracing::warn!(
            username = event.username(),
            action = event.action(),
            "No session token, skipping identity provider sync"
        );
        return None;
    };

    Some(tokio::spawn(async move {
        let result = match &event {
            UserEvent::Created(user) => identity.create_user(&token, user).await,
            UserEvent::Updated { username, update } => {
                identity.update_user(&token, username, update).await
            }
            UserEvent::Deleted { username } => identity.delete_user(&token, username).await,
        };

        match result {
            Ok(()) => tracing::info!(
                username = event.username(),
                action = event.action(),
                "User synced to identity provider"
            ),
            Err(e) => tracing::error!(
                username = event.username(),
                action = event.action(),
                error = %e,
                "Identity provider sync failed"
            ),
        }
    }))
}
