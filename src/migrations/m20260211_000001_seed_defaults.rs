//! Migration: Seed default system settings and reference data

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        seed_system_settings(db).await?;
        seed_reference_data(db).await?;

        Ok(())
    }

    async fn down(&self, _manager: &SchemaManager) -> Result<(), DbErr> {
        // Seeding is not reversible - data may have been modified
        Ok(())
    }
}

async fn seed_system_settings(db: &SchemaManagerConnection<'_>) -> Result<(), DbErr> {
    use crate::models::prelude::*;
    use crate::models::system_setting;

    let count = SystemSetting::find().count(db).await?;
    if count > 0 {
        return Ok(());
    }

    let now = chrono::Utc::now();

    let default_settings = [(
        "occurrence_time_limit_hours",
        "0",
        "Maximum age in hours for swimmer-reported occurrences (0 disables the limit)",
    )];

    for (key, value, description) in default_settings {
        let setting = system_setting::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            description: Set(Some(description.to_string())),
            updated_at: Set(now),
        };
        setting.insert(db).await?;
    }

    Ok(())
}

async fn seed_reference_data(db: &SchemaManagerConnection<'_>) -> Result<(), DbErr> {
    use crate::models::prelude::*;
    use crate::models::{occurrence_type, zone};

    let zone_count = Zone::find().count(db).await?;
    if zone_count == 0 {
        let now = chrono::Utc::now();
        let default_zones = [
            ("Praia do Reconquinho", "Penacova"),
            ("Praia do Vimieiro", "Vimieiro"),
        ];
        for (name, location) in default_zones {
            let new_zone = zone::ActiveModel {
                name: Set(name.to_string()),
                location: Set(Some(location.to_string())),
                created_by: Set(None),
                created_at: Set(now),
                ..Default::default()
            };
            new_zone.insert(db).await?;
        }
    }

    let type_count = OccurrenceType::find().count(db).await?;
    if type_count == 0 {
        let now = chrono::Utc::now();
        let default_types = [
            ("Pequena Lesão", "Minor injury treated on site"),
            ("Afogamento", "Drowning or near-drowning rescue"),
            ("Assistência", "General assistance to a bather"),
        ];
        for (name, description) in default_types {
            let new_type = occurrence_type::ActiveModel {
                name: Set(name.to_string()),
                description: Set(Some(description.to_string())),
                created_by: Set(None),
                created_at: Set(now),
                ..Default::default()
            };
            new_type.insert(db).await?;
        }
    }

    Ok(())
}
