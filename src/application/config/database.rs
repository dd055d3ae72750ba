use std::env;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            // SQLite file for development, PostgreSQL in production.
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://praias.db?mode=rwc".to_string()),
        }
    }
}
