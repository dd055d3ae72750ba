//! Role-gated extractors.
//!
//! Usage in handlers:
//! ```ignore
//! use crate::middleware::{AdminOnly, Authenticated, RoleGuard};
//!
//! async fn list_users(
//!     RoleGuard(admin, _): RoleGuard<AdminOnly>,
//!     State(state): State<AppState>,
//! ) -> Result<Json<Vec<UserResponse>>> {
//!     // Role already verified - just use the user
//! }
//! ```

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::models::user::{self, Role};

/// Trait for role gate marker types
pub trait RoleGate: Send + Sync + 'static {
    const DESCRIPTION: &'static str;

    fn allows(role: Role) -> bool;
}

/// Admin-only operations (user, reference data and settings management).
#[derive(Debug, Clone, Copy)]
pub struct AdminOnly;

impl RoleGate for AdminOnly {
    const DESCRIPTION: &'static str = "admin role";

    fn allows(role: Role) -> bool {
        role == Role::Admin
    }
}

/// Review operations (occurrence approval/rejection).
#[derive(Debug, Clone, Copy)]
pub struct SupervisorOrAdmin;

impl RoleGate for SupervisorOrAdmin {
    const DESCRIPTION: &'static str = "supervisor or admin role";

    fn allows(role: Role) -> bool {
        role.is_elevated()
    }
}

/// Extractor that requires the authenticated user to pass a role gate.
///
/// Fails with 403 Forbidden when the gate rejects the role; the check runs
/// before the handler, so no partial side effects can occur.
#[derive(Debug, Clone)]
pub struct RoleGuard<G: RoleGate>(pub user::Model, pub PhantomData<G>);

impl<G: RoleGate> RoleGuard<G> {
    pub fn user(&self) -> &user::Model {
        &self.0
    }
}

impl<S, G> FromRequestParts<S> for RoleGuard<G>
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

        if !G::allows(auth_user.user.role()) {
            return Err(AppError::Forbidden(format!(
                "Permission denied: {} required",
                G::DESCRIPTION
            )));
        }

        Ok(RoleGuard(auth_user.user.clone(), PhantomData))
    }
}

/// Extractor for any authenticated user (no specific role required).
#[derive(Debug, Clone)]
pub struct Authenticated(pub user::Model);

impl Authenticated {
    pub fn user(&self) -> &user::Model {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

        Ok(Authenticated(auth_user.user.clone()))
    }
}
