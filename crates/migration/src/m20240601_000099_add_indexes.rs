//! Secondary indexes for the hot lookups.
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_service_owner")
                    .table(Service::Table)
                    .col(Service::OwnerId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_service_request_service_status")
                    .table(ServiceRequest::Table)
                    .col(ServiceRequest::ServiceId)
                    .col(ServiceRequest::Status)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_message_conversation_created")
                    .table(Message::Table)
                    .col(Message::ConversationId)
                    .col(Message::CreatedAt)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("uniq_conversation_participant")
                    .table(ConversationParticipant::Table)
                    .col(ConversationParticipant::ConversationId)
                    .col(ConversationParticipant::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("uniq_service_tag")
                    .table(ServiceTag::Table)
                    .col(ServiceTag::ServiceId)
                    .col(ServiceTag::TagId)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_report_target")
                    .table(Report::Table)
                    .col(Report::ContentType)
                    .col(Report::ObjectId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_time_transaction_account")
                    .table(TimeTransaction::Table)
                    .col(TimeTransaction::AccountId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_moderation_action_affected_user")
                    .table(ModerationAction::Table)
                    .col(ModerationAction::AffectedUserId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_thank_you_note_to_user")
                    .table(ThankYouNote::Table)
                    .col(ThankYouNote::ToUserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_thank_you_note_to_user").table(ThankYouNote::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_moderation_action_affected_user").table(ModerationAction::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_time_transaction_account").table(TimeTransaction::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_report_target").table(Report::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uniq_service_tag").table(ServiceTag::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uniq_conversation_participant").table(ConversationParticipant::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_message_conversation_created").table(Message::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_service_request_service_status").table(ServiceRequest::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_service_owner").table(Service::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Service { Table, OwnerId }

#[derive(DeriveIden)]
enum ServiceRequest { Table, ServiceId, Status }

#[derive(DeriveIden)]
enum Message { Table, ConversationId, CreatedAt }

#[derive(DeriveIden)]
enum ConversationParticipant { Table, ConversationId, UserId }

#[derive(DeriveIden)]
enum ServiceTag { Table, ServiceId, TagId }

#[derive(DeriveIden)]
enum Report { Table, ContentType, ObjectId }

#[derive(DeriveIden)]
enum TimeTransaction { Table, AccountId }

#[derive(DeriveIden)]
enum ModerationAction { Table, AffectedUserId }

#[derive(DeriveIden)]
enum ThankYouNote { Table, ToUserId }
