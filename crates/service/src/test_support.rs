#![cfg(test)]
//! Fixtures for service tests: a migrated in-memory SQLite database and a few
//! ready-made rows.

use chrono::Utc;
use configs::{DatabaseConfig, LedgerSettings};
use migration::MigratorTrait;
use models::{service, user};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use uuid::Uuid;

pub async fn memory_db() -> Result<DatabaseConnection, anyhow::Error> {
    let cfg = DatabaseConfig { url: "sqlite::memory:".into(), ..DatabaseConfig::default() };
    let db = models::db::connect_with_config(&cfg).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Member (or staff) with an opened time account holding the default grant.
pub async fn member(db: &DatabaseConnection, name: &str, is_staff: bool) -> Result<user::Model, anyhow::Error> {
    let email = format!("{}-{}@hive.test", name.to_lowercase(), Uuid::new_v4().simple());
    let u = user::create(db, &email, name, is_staff).await?;
    crate::ledger::open_account(db, u.id, &LedgerSettings::default()).await?;
    Ok(u)
}

pub async fn listing(
    db: &DatabaseConnection,
    owner: Uuid,
    service_type: service::ServiceType,
    estimated_hours: Option<i32>,
    capacity: i32,
) -> Result<service::Model, anyhow::Error> {
    let now = Utc::now();
    let s = service::ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(owner),
        service_type: Set(service_type),
        title: Set("Garden help".into()),
        description: Set("Weeding and planting".into()),
        status: Set(service::ServiceStatus::Active),
        estimated_hours: Set(estimated_hours),
        capacity: Set(capacity),
        latitude: Set(None),
        longitude: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        deleted_at: Set(None),
    }
    .insert(db)
    .await?;
    Ok(s)
}
