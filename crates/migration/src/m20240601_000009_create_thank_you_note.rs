//! Create `thank_you_note`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ThankYouNote::Table)
                    .if_not_exists()
                    .col(uuid(ThankYouNote::Id).primary_key())
                    .col(uuid(ThankYouNote::FromUserId).not_null())
                    .col(uuid(ThankYouNote::ToUserId).not_null())
                    .col(text(ThankYouNote::Message).not_null())
                    .col(string_len(ThankYouNote::Status, 20).not_null())
                    .col(ColumnDef::new(ThankYouNote::ServiceId).uuid().null())
                    .col(
                        ColumnDef::new(ThankYouNote::ReadAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(timestamp_with_time_zone(ThankYouNote::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(ThankYouNote::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_thank_you_note_from")
                            .from(ThankYouNote::Table, ThankYouNote::FromUserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_thank_you_note_to")
                            .from(ThankYouNote::Table, ThankYouNote::ToUserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_thank_you_note_service")
                            .from(ThankYouNote::Table, ThankYouNote::ServiceId)
                            .to(Service::Table, Service::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ThankYouNote::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ThankYouNote {
    Table,
    Id,
    FromUserId,
    ToUserId,
    Message,
    Status,
    ServiceId,
    ReadAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User { Table, Id }

#[derive(DeriveIden)]
enum Service { Table, Id }
