//! Create `tag`, `service` and the `service_tag` join table.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tag::Table)
                    .if_not_exists()
                    .col(uuid(Tag::Id).primary_key())
                    .col(string_len(Tag::Name, 50).unique_key().not_null())
                    .col(string_len(Tag::Slug, 50).unique_key().not_null())
                    .col(timestamp_with_time_zone(Tag::CreatedAt).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Service::Table)
                    .if_not_exists()
                    .col(uuid(Service::Id).primary_key())
                    .col(uuid(Service::OwnerId).not_null())
                    .col(string_len(Service::ServiceType, 16).not_null())
                    .col(string_len(Service::Title, 200).not_null())
                    .col(text(Service::Description).not_null())
                    .col(string_len(Service::Status, 20).not_null())
                    .col(ColumnDef::new(Service::EstimatedHours).integer().null())
                    .col(integer(Service::Capacity).not_null())
                    .col(ColumnDef::new(Service::Latitude).double().null())
                    .col(ColumnDef::new(Service::Longitude).double().null())
                    .col(timestamp_with_time_zone(Service::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Service::UpdatedAt).not_null())
                    .col(
                        ColumnDef::new(Service::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_owner")
                            .from(Service::Table, Service::OwnerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ServiceTag::Table)
                    .if_not_exists()
                    .col(uuid(ServiceTag::Id).primary_key())
                    .col(uuid(ServiceTag::ServiceId).not_null())
                    .col(uuid(ServiceTag::TagId).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_tag_service")
                            .from(ServiceTag::Table, ServiceTag::ServiceId)
                            .to(Service::Table, Service::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_tag_tag")
                            .from(ServiceTag::Table, ServiceTag::TagId)
                            .to(Tag::Table, Tag::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ServiceTag::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Service::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Tag::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Tag { Table, Id, Name, Slug, CreatedAt }

#[derive(DeriveIden)]
enum Service {
    Table,
    Id,
    OwnerId,
    ServiceType,
    Title,
    Description,
    Status,
    EstimatedHours,
    Capacity,
    Latitude,
    Longitude,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum ServiceTag { Table, Id, ServiceId, TagId }

#[derive(DeriveIden)]
enum User { Table, Id }
