//! Single-use, time-limited password reset tokens.

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

use crate::db::DbConn;
use crate::error::{AppError, Result};
use crate::models::activity_log::ActivityAction;
use crate::models::prelude::*;
use crate::models::{password_reset_token, user};
use crate::services::{activity, security};

/// Create a reset token for the user and return its url-safe value.
pub async fn issue_token<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    ttl_seconds: i64,
) -> Result<String> {
    let token = security::generate_url_safe_token();
    let now = Utc::now();

    let record = password_reset_token::ActiveModel {
        user_id: Set(user_id),
        token: Set(token.clone()),
        created_at: Set(now),
        expires_at: Set(now + Duration::seconds(ttl_seconds)),
        used: Set(false),
        used_at: Set(None),
        ..Default::default()
    };
    record.insert(conn).await?;

    Ok(token)
}

/// Look up a token and validate it, returning the token row and its user.
///
/// Fails with `TokenAlreadyUsed` on replay and `TokenExpired` past the
/// deadline; an unknown token is reported as expired so the response does
/// not reveal whether it ever existed.
pub async fn verify_token(
    db: &DbConn,
    token: &str,
) -> Result<(password_reset_token::Model, user::Model)> {
    let record = PasswordResetToken::find()
        .filter(password_reset_token::Column::Token.eq(token))
        .one(db)
        .await?
        .ok_or(AppError::TokenExpired)?;

    if record.used {
        return Err(AppError::TokenAlreadyUsed);
    }
    if record.expires_at < Utc::now() {
        return Err(AppError::TokenExpired);
    }

    let owner = User::find_by_id(record.user_id)
        .one(db)
        .await?
        .ok_or(AppError::TokenExpired)?;

    Ok((record, owner))
}

/// Redeem a valid token: set the new password and burn the token, in one
/// transaction.
pub async fn redeem(db: &DbConn, token: &str, new_password: &str) -> Result<user::Model> {
    let (record, owner) = verify_token(db, token).await?;

    let hashed = security::hash_password(new_password)?;
    let now = Utc::now();
    let owner_id = owner.id;

    let txn = db.begin().await?;

    let mut user_active: user::ActiveModel = owner.into();
    user_active.hashed_password = Set(hashed);
    user_active.updated_at = Set(now);
    let updated = user_active.update(&txn).await?;

    let mut token_active: password_reset_token::ActiveModel = record.into();
    token_active.used = Set(true);
    token_active.used_at = Set(Some(now));
    token_active.update(&txn).await?;

    activity::record(
        &txn,
        owner_id,
        ActivityAction::PasswordReset,
        "Password redefined via recovery link",
        None,
        None,
    )
    .await?;

    txn.commit().await?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use crate::services::verify_password;
    use crate::test_helpers::{create_test_db, create_test_user};

    #[tokio::test]
    async fn test_token_redeemed_exactly_once() {
        let db = create_test_db().await;
        let user = create_test_user(&db, "Ana", "ana@example.com", "old-pw", Role::Swimmer).await;

        let token = issue_token(&db, user.id, 3600).await.unwrap();

        let updated = redeem(&db, &token, "new-pw").await.unwrap();
        assert!(verify_password("new-pw", &updated.hashed_password));

        // Second use must be rejected as a replay.
        let err = redeem(&db, &token, "sneaky-pw").await.unwrap_err();
        assert!(matches!(err, AppError::TokenAlreadyUsed));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let db = create_test_db().await;
        let user = create_test_user(&db, "Ana", "ana@example.com", "old-pw", Role::Swimmer).await;

        let token = issue_token(&db, user.id, -1).await.unwrap();

        let err = redeem(&db, &token, "new-pw").await.unwrap_err();
        assert!(matches!(err, AppError::TokenExpired));
    }

    #[tokio::test]
    async fn test_unknown_token_reported_as_expired() {
        let db = create_test_db().await;
        let err = verify_token(&db, "no-such-token").await.unwrap_err();
        assert!(matches!(err, AppError::TokenExpired));
    }
}
