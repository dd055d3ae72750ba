use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::config::auth::AuthConfig;
use crate::error::{AppError, Result};
use crate::models::user;

/// Session token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user id)
    pub email: String,
    pub role: String,
    pub exp: i64, // Expiration time
    pub iat: i64, // Issued at
    /// Last time the user proved their password. Sensitive operations
    /// compare this against the re-auth window.
    pub auth_time: i64,
    pub jti: String, // Token ID for uniqueness
}

/// Hash a password using bcrypt
pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a password against its hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Create a signed session token for a user
pub fn create_session_token(
    user: &user::Model,
    auth: &AuthConfig,
    auth_time: DateTime<Utc>,
) -> Result<String> {
    let now = Utc::now();
    let exp = now + Duration::seconds(auth.session_ttl);

    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role.clone(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
        auth_time: auth_time.timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
    };

    let header = Header::new(jsonwebtoken::Algorithm::HS256);
    let key = EncodingKey::from_secret(auth.secret_key.as_bytes());
    encode(&header, &claims, &key).map_err(|e| e.into())
}

/// Decode and validate a session token
pub fn decode_session_token(token: &str, secret_key: &str) -> Result<Claims> {
    let key = DecodingKey::from_secret(secret_key.as_bytes());

    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation)?;
    Ok(token_data.claims)
}

/// Whether a session's last credential check satisfies the
/// re-authentication window for sensitive operations.
pub fn is_recently_authenticated(auth_time: i64, auth: &AuthConfig) -> bool {
    Utc::now().timestamp() - auth_time <= auth.reauth_max_age
}

/// Generate a url-safe random token (for password reset links)
pub fn generate_url_safe_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
