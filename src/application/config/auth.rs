use std::env;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret for session token signing.
    pub secret_key: String,
    /// Session lifetime in seconds.
    pub session_ttl: i64,
    /// Maximum age of the last credential check before sensitive
    /// operations demand re-authentication, in seconds.
    pub reauth_max_age: i64,
    /// Password-reset token lifetime in seconds.
    pub reset_token_ttl: i64,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        Self {
            secret_key: env::var("SECRET_KEY").unwrap_or_else(|_| "change-this-key".to_string()),
            session_ttl: env::var("PRAIAS_SESSION_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(604800), // 7 days
            reauth_max_age: env::var("PRAIAS_REAUTH_MAX_AGE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(900), // 15 minutes
            reset_token_ttl: env::var("PRAIAS_RESET_TOKEN_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600), // 1 hour
        }
    }
}
