//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
//!
//! Column types stay within what both Postgres and SQLite accept so the same
//! migrations back production and the in-memory test databases.
pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_user;
mod m20240601_000002_create_catalog;
mod m20240601_000003_create_messaging;
mod m20240601_000004_create_service_request;
mod m20240601_000005_create_ledger;
mod m20240601_000006_create_forum;
mod m20240601_000007_create_moderation;
mod m20240601_000008_create_profile;
mod m20240601_000009_create_thank_you_note;
mod m20240601_000099_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_user::Migration),
            Box::new(m20240601_000002_create_catalog::Migration),
            Box::new(m20240601_000003_create_messaging::Migration),
            Box::new(m20240601_000004_create_service_request::Migration),
            Box::new(m20240601_000005_create_ledger::Migration),
            Box::new(m20240601_000006_create_forum::Migration),
            Box::new(m20240601_000007_create_moderation::Migration),
            Box::new(m20240601_000008_create_profile::Migration),
            Box::new(m20240601_000009_create_thank_you_note::Migration),
            // Indexes should always be applied last
            Box::new(m20240601_000099_add_indexes::Migration),
        ]
    }
}
