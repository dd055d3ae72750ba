use axum::{
    extract::{Extension, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::endpoints::auth::normalize_tax_number;
use crate::endpoints::client_ip;
use crate::error::{AppError, Result};
use crate::middleware::{AdminOnly, AuthenticatedUser, RoleGuard};
use crate::models::activity_log::ActivityAction;
use crate::models::prelude::*;
use crate::models::user::{self, Role};
use crate::models::user_preferences;
use crate::services::security::is_recently_authenticated;
use crate::services::{activity, hash_password, verify_password};
use crate::state::AppState;

/// Create users routes
pub fn users_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/me", get(get_current_user))
        .route("/me/password", patch(change_own_password))
        .route(
            "/me/preferences",
            get(get_my_preferences).patch(update_my_preferences),
        )
        .route(
            "/{user_id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/{user_id}/status", patch(set_user_status))
        .with_state(state)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 2, message = "name must have at least 2 characters"))]
    pub name: String,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "password must have at least 6 characters"))]
    pub password: String,
    pub role: String,
    pub tax_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub tax_number: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetUserStatusRequest {
    pub is_active: bool,
    pub suspension_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeOwnPasswordRequest {
    pub current_password: String,
    #[serde(alias = "password")]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub tax_number: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            tax_number: u.tax_number,
            role: u.role,
            is_active: u.is_active,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PreferencesResponse {
    pub theme: String,
    pub notifications_enabled: bool,
    pub email_notifications: bool,
    pub display_settings: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePreferencesRequest {
    pub theme: Option<String>,
    pub notifications_enabled: Option<bool>,
    pub email_notifications: Option<bool>,
    pub display_settings: Option<serde_json::Value>,
}

// ============================================================================
// Admin User Management
// ============================================================================

/// List all users (admin)
async fn list_users(
    State(state): State<AppState>,
    RoleGuard(_, _): RoleGuard<AdminOnly>,
) -> Result<Json<Vec<UserResponse>>> {
    let users = User::find()
        .order_by_asc(user::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Create a user with any role (admin)
async fn create_user(
    State(state): State<AppState>,
    RoleGuard(admin, _): RoleGuard<AdminOnly>,
    headers: HeaderMap,
    Json(request): Json<CreateUserRequest>,
) -> Result<Response> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let role = Role::parse(&request.role)
        .ok_or_else(|| AppError::Validation(format!("unknown role: {}", request.role)))?;
    let tax_number = normalize_tax_number(request.tax_number)?;
    let email = request.email.to_lowercase();

    ensure_email_unused(&state, &email, None).await?;
    if let Some(nif) = &tax_number {
        ensure_tax_number_unused(&state, nif, None).await?;
    }

    let now = Utc::now();
    let hashed = hash_password(&request.password)?;

    let txn = state.db.begin().await?;
    let new_user = user::ActiveModel {
        name: Set(request.name),
        email: Set(email),
        tax_number: Set(tax_number),
        hashed_password: Set(hashed),
        role: Set(role.as_str().to_string()),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = new_user.insert(&txn).await?;

    activity::record(
        &txn,
        admin.id,
        ActivityAction::CreateUser,
        format!("Created user #{}", created.id),
        Some(serde_json::json!({
            "user_id": created.id,
            "email": created.email,
            "role": created.role,
        })),
        client_ip(&headers),
    )
    .await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(created))).into_response())
}

/// Read one user (admin)
async fn get_user(
    State(state): State<AppState>,
    RoleGuard(_, _): RoleGuard<AdminOnly>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserResponse>> {
    let found = User::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(found)))
}

/// Update a user (admin)
async fn update_user(
    State(state): State<AppState>,
    RoleGuard(admin, _): RoleGuard<AdminOnly>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>> {
    let found = User::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let role = match &request.role {
        Some(r) => Some(
            Role::parse(r).ok_or_else(|| AppError::Validation(format!("unknown role: {}", r)))?,
        ),
        None => None,
    };

    // Admins cannot demote themselves; this keeps at least the acting
    // admin account in charge.
    if let Some(role) = role {
        if found.id == admin.id && role != Role::Admin {
            return Err(AppError::Forbidden(
                "You cannot change your own admin role".to_string(),
            ));
        }
    }

    let email = request.email.map(|e| e.to_lowercase());
    if let Some(email) = &email {
        ensure_email_unused(&state, email, Some(found.id)).await?;
    }

    let tax_number = match request.tax_number {
        Some(raw) => normalize_tax_number(Some(raw))?,
        None => found.tax_number.clone(),
    };
    if let Some(nif) = &tax_number {
        ensure_tax_number_unused(&state, nif, Some(found.id)).await?;
    }

    if let Some(password) = &request.password {
        if password.len() < 6 {
            return Err(AppError::Validation(
                "password must have at least 6 characters".to_string(),
            ));
        }
    }

    let target_id = found.id;
    let txn = state.db.begin().await?;

    let mut active: user::ActiveModel = found.into();
    if let Some(name) = request.name {
        active.name = Set(name);
    }
    if let Some(email) = email {
        active.email = Set(email);
    }
    if let Some(role) = role {
        active.role = Set(role.as_str().to_string());
    }
    active.tax_number = Set(tax_number);
    if let Some(password) = request.password {
        active.hashed_password = Set(hash_password(&password)?);
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;

    activity::record(
        &txn,
        admin.id,
        ActivityAction::EditUser,
        format!("Edited user #{}", target_id),
        Some(serde_json::json!({
            "user_id": target_id,
            "email": updated.email,
            "role": updated.role,
        })),
        client_ip(&headers),
    )
    .await?;
    txn.commit().await?;

    Ok(Json(UserResponse::from(updated)))
}

/// Delete a user account (admin).
///
/// Refused while the user still owns occurrences; suspend instead so the
/// historical records keep their reporter.
async fn delete_user(
    State(state): State<AppState>,
    RoleGuard(admin, _): RoleGuard<AdminOnly>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>> {
    let found = User::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if found.id == admin.id {
        return Err(AppError::Forbidden(
            "You cannot delete your own account".to_string(),
        ));
    }

    let owned = Occurrence::find()
        .filter(crate::models::occurrence::Column::UserId.eq(found.id))
        .count(&state.db)
        .await?;
    if owned > 0 {
        return Err(AppError::ReferentialConflict(format!(
            "User #{} still owns {} occurrence(s); suspend the account instead",
            found.id, owned
        )));
    }

    let target_id = found.id;
    let email = found.email.clone();

    let txn = state.db.begin().await?;
    found.delete(&txn).await?;
    activity::record(
        &txn,
        admin.id,
        ActivityAction::DeleteUser,
        format!("Deleted user #{}", target_id),
        Some(serde_json::json!({"user_id": target_id, "email": email})),
        client_ip(&headers),
    )
    .await?;
    txn.commit().await?;

    Ok(Json(serde_json::json!({"detail": "User removed"})))
}

/// Suspend or reactivate a user (admin). Preferred over deletion;
/// suspension preserves historical occurrence records.
async fn set_user_status(
    State(state): State<AppState>,
    RoleGuard(admin, _): RoleGuard<AdminOnly>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
    Json(request): Json<SetUserStatusRequest>,
) -> Result<Json<UserResponse>> {
    let found = User::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if found.id == admin.id {
        return Err(AppError::Forbidden(
            "You cannot suspend your own account".to_string(),
        ));
    }

    let reason = request
        .suspension_reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    if !request.is_active && reason.is_none() {
        return Err(AppError::Validation(
            "a suspension reason is required".to_string(),
        ));
    }

    let target_id = found.id;
    let details = if request.is_active {
        serde_json::json!({"user_id": target_id, "is_active": true})
    } else {
        serde_json::json!({
            "user_id": target_id,
            "is_active": false,
            "suspension_reason": reason,
        })
    };
    let description = if request.is_active {
        format!("Reactivated user #{}", target_id)
    } else {
        format!("Suspended user #{}", target_id)
    };

    let txn = state.db.begin().await?;

    let mut active: user::ActiveModel = found.into();
    active.is_active = Set(request.is_active);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;

    activity::record(
        &txn,
        admin.id,
        ActivityAction::ToggleUserStatus,
        description,
        Some(details),
        client_ip(&headers),
    )
    .await?;
    txn.commit().await?;

    Ok(Json(UserResponse::from(updated)))
}

// ============================================================================
// Self-Service Endpoints
// ============================================================================

/// Current user info
async fn get_current_user(
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<UserResponse>> {
    Ok(Json(UserResponse::from(auth_user.user)))
}

/// Change one's own password.
///
/// Requires a recent credential check (`auth_time` within the configured
/// window); clients recover from `ReauthRequired` via `POST /auth/reauth`.
async fn change_own_password(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    headers: HeaderMap,
    Json(request): Json<ChangeOwnPasswordRequest>,
) -> Result<Json<serde_json::Value>> {
    if !is_recently_authenticated(auth_user.auth_time, &state.config.auth) {
        return Err(AppError::ReauthRequired);
    }

    if !verify_password(&request.current_password, &auth_user.user.hashed_password) {
        return Err(AppError::InvalidCredentials);
    }

    if request.new_password.len() < 6 {
        return Err(AppError::Validation(
            "password must have at least 6 characters".to_string(),
        ));
    }

    let user_id = auth_user.user.id;
    let hashed = hash_password(&request.new_password)?;

    let txn = state.db.begin().await?;

    let mut active: user::ActiveModel = auth_user.user.into();
    active.hashed_password = Set(hashed);
    active.updated_at = Set(Utc::now());
    active.update(&txn).await?;

    activity::record(
        &txn,
        user_id,
        ActivityAction::PasswordChanged,
        "Password changed",
        None,
        client_ip(&headers),
    )
    .await?;
    txn.commit().await?;

    Ok(Json(
        serde_json::json!({"detail": "Password changed successfully"}),
    ))
}

async fn load_or_create_preferences(
    state: &AppState,
    user_id: i64,
) -> Result<user_preferences::Model> {
    if let Some(prefs) = UserPreferences::find_by_id(user_id).one(&state.db).await? {
        return Ok(prefs);
    }

    let prefs = user_preferences::ActiveModel {
        user_id: Set(user_id),
        theme: Set("light".to_string()),
        notifications_enabled: Set(true),
        email_notifications: Set(true),
        display_settings: Set(None),
        updated_at: Set(Utc::now()),
    };
    Ok(prefs.insert(&state.db).await?)
}

fn preferences_response(prefs: user_preferences::Model) -> PreferencesResponse {
    let display_settings = prefs
        .display_settings
        .as_deref()
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_else(|| serde_json::json!({}));

    PreferencesResponse {
        theme: prefs.theme,
        notifications_enabled: prefs.notifications_enabled,
        email_notifications: prefs.email_notifications,
        display_settings,
    }
}

/// Current user's interface preferences
async fn get_my_preferences(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<PreferencesResponse>> {
    let prefs = load_or_create_preferences(&state, auth_user.user.id).await?;
    Ok(Json(preferences_response(prefs)))
}

/// Update the current user's interface preferences
async fn update_my_preferences(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<UpdatePreferencesRequest>,
) -> Result<Json<PreferencesResponse>> {
    if let Some(theme) = &request.theme {
        if !["light", "dark"].contains(&theme.as_str()) {
            return Err(AppError::Validation(
                "theme must be 'light' or 'dark'".to_string(),
            ));
        }
    }

    let prefs = load_or_create_preferences(&state, auth_user.user.id).await?;

    let mut active: user_preferences::ActiveModel = prefs.into();
    if let Some(theme) = request.theme {
        active.theme = Set(theme);
    }
    if let Some(enabled) = request.notifications_enabled {
        active.notifications_enabled = Set(enabled);
    }
    if let Some(enabled) = request.email_notifications {
        active.email_notifications = Set(enabled);
    }
    if let Some(settings) = request.display_settings {
        active.display_settings = Set(Some(settings.to_string()));
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    Ok(Json(preferences_response(updated)))
}

// ============================================================================
// Helpers
// ============================================================================

async fn ensure_email_unused(state: &AppState, email: &str, except: Option<i64>) -> Result<()> {
    let mut select = User::find().filter(user::Column::Email.eq(email));
    if let Some(id) = except {
        select = select.filter(user::Column::Id.ne(id));
    }
    if select.one(&state.db).await?.is_some() {
        return Err(AppError::Conflict("Email is already in use".to_string()));
    }
    Ok(())
}

async fn ensure_tax_number_unused(state: &AppState, nif: &str, except: Option<i64>) -> Result<()> {
    let mut select = User::find().filter(user::Column::TaxNumber.eq(nif));
    if let Some(id) = except {
        select = select.filter(user::Column::Id.ne(id));
    }
    if select.one(&state.db).await?.is_some() {
        return Err(AppError::Conflict(
            "Tax number is already in use".to_string(),
        ));
    }
    Ok(())
}
