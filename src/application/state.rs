use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::Config;
use crate::services::mailer::Mailer;

/// Database connection type alias
pub type DbConn = DatabaseConnection;

/// Application state containing all shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: DbConn,
    pub config: Arc<Config>,
    pub mailer: Mailer,
}

impl AppState {
    pub fn new(db: DbConn, config: Config) -> Self {
        let config = Arc::new(config);
        let mailer = Mailer::new(config.clone());
        Self { db, config, mailer }
    }
}
