//! Role-based authorization decisions.
//!
//! All permission checks funnel through [`authorize`] so the rules live in
//! one place instead of scattered conditionals in handlers.

use crate::error::{AppError, Result};
use crate::models::user::Role;

/// Operations subject to an authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewOccurrence,
    EditOccurrence,
    DeleteOccurrence,
    ReviewOccurrence,
    ManageUsers,
    ManageReferenceData,
    ManageSettings,
    ViewActivitiesOfOthers,
}

/// Decide whether `actor_id` with `role` may perform `action` on a resource
/// owned by `resource_owner` (`None` when the action has no owner, e.g.
/// user management).
///
/// Swimmers act only on resources they own; supervisors and admins act on
/// any occurrence; admins additionally manage users, reference data and
/// settings. No side effects happen before this check.
pub fn authorize(
    role: Role,
    action: Action,
    resource_owner: Option<i64>,
    actor_id: i64,
) -> Result<()> {
    let allowed = match action {
        Action::ViewOccurrence | Action::EditOccurrence | Action::DeleteOccurrence => {
            role.is_elevated() || resource_owner == Some(actor_id)
        }
        Action::ReviewOccurrence => role.is_elevated(),
        Action::ManageUsers | Action::ManageReferenceData | Action::ManageSettings => {
            role == Role::Admin
        }
        Action::ViewActivitiesOfOthers => role == Role::Admin,
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Role {} may not perform this action",
            role
        )))
    }
}
