//! Migration: Create occurrences table

use sea_orm_migration::prelude::*;

use super::m20260210_000001_create_users::Users;
use super::m20260210_000003_create_zones::Zones;
use super::m20260210_000004_create_occurrence_types::OccurrenceTypes;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Occurrences::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Occurrences::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Occurrences::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Occurrences::ZoneId).big_integer().not_null())
                    .col(ColumnDef::new(Occurrences::TypeId).big_integer().not_null())
                    .col(ColumnDef::new(Occurrences::Date).date().not_null())
                    .col(ColumnDef::new(Occurrences::Time).time().not_null())
                    .col(ColumnDef::new(Occurrences::Location).string().null())
                    .col(ColumnDef::new(Occurrences::Description).string().null())
                    .col(
                        ColumnDef::new(Occurrences::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Occurrences::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Occurrences::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Occurrences::Table, Occurrences::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Occurrences::Table, Occurrences::ZoneId)
                            .to(Zones::Table, Zones::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Occurrences::Table, Occurrences::TypeId)
                            .to(OccurrenceTypes::Table, OccurrenceTypes::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_occurrences_user_id")
                    .table(Occurrences::Table)
                    .col(Occurrences::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_occurrences_status")
                    .table(Occurrences::Table)
                    .col(Occurrences::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_occurrences_date")
                    .table(Occurrences::Table)
                    .col(Occurrences::Date)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(Occurrences::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
pub enum Occurrences {
    Table,
    Id,
    #[iden = "user_id"]
    UserId,
    #[iden = "zone_id"]
    ZoneId,
    #[iden = "type_id"]
    TypeId,
    Date,
    Time,
    Location,
    Description,
    Status,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}
