//! Role-gated extractors
//!
//! Each gate names the roles allowed through. Handlers take
//! `Authorized<Gate>` and receive the authenticated user only when its
//! effective role is listed; otherwise the request is refused with 403.

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::user::{self, UserRole};

/// A set of roles allowed through a route
pub trait RoleGate: Send + Sync + 'static {
    const ROLES: &'static [UserRole];

    fn allows(role: UserRole) -> bool {
        Self::ROLES.contains(&role)
    }
}

macro_rules! define_role_gates {
    ($($(#[$meta:meta])* $name:ident => [$($role:ident),+ $(,)?]),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy)]
            pub struct $name;

            impl RoleGate for $name {
                const ROLES: &'static [UserRole] = &[$(UserRole::$role),+];
            }
        )*
    };
}

define_role_gates! {
    /// User listing
    AdminOnly => [Admin],
    /// User create, update, delete
    UserManagers => [Admin, ProjectLead],
    /// Company and service point listings
    DirectoryViewers => [Admin, ProjectLead],
    CleanerOnly => [Cleaner],
    /// Company task board
    TaskViewers => [Manager, OperationsManager, ProjectLead, Admin, Supervisor, Observer],
    ManagerOnly => [Manager],
    /// Routes, cleaner listing and task export
    RouteManagers => [Manager, OperationsManager, ProjectLead, Admin, Supervisor],
    /// Company dashboard
    DashboardViewers => [Manager, OperationsManager, ProjectLead, Supervisor, Observer],
}

/// Extractor that requires the caller's role to pass gate `G`
#[derive(Debug, Clone)]
pub struct Authorized<G: RoleGate>(pub AuthenticatedUser, PhantomData<G>);

impl<G: RoleGate> Authorized<G> {
    pub fn user(&self) -> &user::Model {
        &self.0.user
    }

    pub fn user_id(&self) -> i64 {
        self.0.user.id
    }

    /// Session token the request was made with
    pub fn token(&self) -> &str {
        &self.0.token
    }
}

impl<S, G> FromRequestParts<S> for Authorized<G>
where
    S: Send + Sync,
    G: RoleGate,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

        if !G::allows(auth_user.role()) {
            return Err(AppError::Forbidden("Insufficient permissions".to_string()));
        }

        Ok(Authorized(auth_user.clone(), PhantomData))
    }
}

/// Extractor for any authenticated user
#[derive(Debug, Clone)]
pub struct Authenticated(pub AuthenticatedUser);

impl Authenticated {
    pub fn user(&self) -> &user::Model {
        &self.0.user
    }
}

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(Authenticated)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}
