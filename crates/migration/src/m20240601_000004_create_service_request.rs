//! Create `service_request`.
//!
//! One row per (requester, service); the unique index is what turns a second
//! `create` into a conflict.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ServiceRequest::Table)
                    .if_not_exists()
                    .col(uuid(ServiceRequest::Id).primary_key())
                    .col(uuid(ServiceRequest::RequesterId).not_null())
                    .col(uuid(ServiceRequest::ServiceId).not_null())
                    .col(ColumnDef::new(ServiceRequest::ConversationId).uuid().null())
                    .col(text(ServiceRequest::Message).not_null())
                    .col(string_len(ServiceRequest::Status, 20).not_null())
                    .col(boolean(ServiceRequest::OwnerApproved).not_null())
                    .col(boolean(ServiceRequest::RequesterApproved).not_null())
                    .col(boolean(ServiceRequest::OwnerCompleted).not_null())
                    .col(boolean(ServiceRequest::RequesterCompleted).not_null())
                    .col(ColumnDef::new(ServiceRequest::ProposedMinutes).big_integer().null())
                    .col(boolean(ServiceRequest::HoursOwnerApproved).not_null())
                    .col(boolean(ServiceRequest::HoursRequesterApproved).not_null())
                    .col(ColumnDef::new(ServiceRequest::ActualMinutes).big_integer().null())
                    .col(
                        ColumnDef::new(ServiceRequest::RespondedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ServiceRequest::SettledAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(timestamp_with_time_zone(ServiceRequest::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(ServiceRequest::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_request_requester")
                            .from(ServiceRequest::Table, ServiceRequest::RequesterId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_request_service")
                            .from(ServiceRequest::Table, ServiceRequest::ServiceId)
                            .to(Service::Table, Service::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_service_request_requester_service")
                    .table(ServiceRequest::Table)
                    .col(ServiceRequest::RequesterId)
                    .col(ServiceRequest::ServiceId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ServiceRequest::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ServiceRequest {
    Table,
    Id,
    RequesterId,
    ServiceId,
    ConversationId,
    Message,
    Status,
    OwnerApproved,
    RequesterApproved,
    OwnerCompleted,
    RequesterCompleted,
    ProposedMinutes,
    HoursOwnerApproved,
    HoursRequesterApproved,
    ActualMinutes,
    RespondedAt,
    SettledAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Service { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }
