pub mod auth;
pub mod database;
pub mod email;
pub mod server;

use std::env;

/// Application configuration loaded from environment variables.
///
/// Loaded once at startup and carried in [`crate::state::AppState`]; handlers
/// never read the environment directly.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: server::ServerConfig,
    pub database: database::DatabaseConfig,
    pub auth: auth::AuthConfig,
    pub email: email::EmailConfig,

    pub app_name: String,
    pub app_url: String,

    // Logging
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server: server::ServerConfig::from_env(),
            database: database::DatabaseConfig::from_env(),
            auth: auth::AuthConfig::from_env(),
            email: email::EmailConfig::from_env(),

            app_name: env::var("APP_NAME").unwrap_or_else(|_| "Praias Fluviais".to_string()),
            app_url: env::var("APP_URL").unwrap_or_else(|_| "http://localhost:8000".to_string()),

            log_level: env::var("PRAIAS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}
