pub use sea_orm_migration::prelude::*;

mod m20260210_000001_create_users;
mod m20260210_000002_create_user_preferences;
mod m20260210_000003_create_zones;
mod m20260210_000004_create_occurrence_types;
mod m20260210_000005_create_occurrences;
mod m20260210_000006_create_activity_logs;
mod m20260210_000007_create_notifications;
mod m20260210_000008_create_password_reset_tokens;
mod m20260210_000009_create_system_settings;
mod m20260211_000001_seed_defaults;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260210_000001_create_users::Migration),
            Box::new(m20260210_000002_create_user_preferences::Migration),
            Box::new(m20260210_000003_create_zones::Migration),
            Box::new(m20260210_000004_create_occurrence_types::Migration),
            Box::new(m20260210_000005_create_occurrences::Migration),
            Box::new(m20260210_000006_create_activity_logs::Migration),
            Box::new(m20260210_000007_create_notifications::Migration),
            Box::new(m20260210_000008_create_password_reset_tokens::Migration),
            Box::new(m20260210_000009_create_system_settings::Migration),
            Box::new(m20260211_000001_seed_defaults::Migration),
        ]
    }
}
