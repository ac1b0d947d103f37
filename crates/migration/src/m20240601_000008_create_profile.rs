//! Create `profile`, the public face of a user (one row per user).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Profile::Table)
                    .if_not_exists()
                    .col(uuid(Profile::UserId).primary_key())
                    .col(string_len(Profile::DisplayName, 120).not_null())
                    .col(text(Profile::Bio).not_null())
                    .col(string_len(Profile::AvatarUrl, 500).not_null())
                    .col(ColumnDef::new(Profile::Latitude).double().null())
                    .col(ColumnDef::new(Profile::Longitude).double().null())
                    .col(string_len(Profile::PreferredLanguages, 400).not_null())
                    .col(timestamp_with_time_zone(Profile::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Profile::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_profile_user")
                            .from(Profile::Table, Profile::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Profile::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Profile {
    Table,
    UserId,
    DisplayName,
    Bio,
    AvatarUrl,
    Latitude,
    Longitude,
    PreferredLanguages,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User { Table, Id }
