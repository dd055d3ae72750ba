//! Test helpers and utilities for unit testing.
//!
//! This module provides common utilities for setting up test environments,
//! creating mock data, and testing database operations.

#![allow(dead_code)]

use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;

use crate::migrations::Migrator;
use crate::models::user::{self, Role};
use crate::models::{occurrence_type, zone};
use crate::services::hash_password;

/// Create an in-memory SQLite database for testing
pub async fn create_test_db() -> DatabaseConnection {
    // Use simple in-memory SQLite - each connection gets its own database
    let db_url = "sqlite::memory:";

    let db = Database::connect(db_url)
        .await
        .expect("Failed to create test database");

    // Run migrations using the Migrator
    Migrator::up(&db, None)
        .await
        .expect("Failed to run test migrations");

    db
}

/// Create a test user with the given role and return the user model
pub async fn create_test_user(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> user::Model {
    let hashed = hash_password(password).unwrap();
    let now = chrono::Utc::now();

    let new_user = user::ActiveModel {
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        tax_number: Set(None),
        hashed_password: Set(hashed),
        role: Set(role.as_str().to_string()),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    new_user.insert(db).await.unwrap()
}

/// Insert one zone and one occurrence type, returning their ids
pub async fn seed_reference_row(db: &DatabaseConnection) -> (i64, i64) {
    let now = chrono::Utc::now();

    let new_zone = zone::ActiveModel {
        name: Set(format!("Test zone {}", uuid::Uuid::new_v4())),
        location: Set(Some("test river".to_string())),
        created_by: Set(None),
        created_at: Set(now),
        ..Default::default()
    };
    let zone = new_zone.insert(db).await.unwrap();

    let new_type = occurrence_type::ActiveModel {
        name: Set(format!("Test type {}", uuid::Uuid::new_v4())),
        description: Set(None),
        created_by: Set(None),
        created_at: Set(now),
        ..Default::default()
    };
    let occurrence_type = new_type.insert(db).await.unwrap();

    (zone.id, occurrence_type.id)
}
