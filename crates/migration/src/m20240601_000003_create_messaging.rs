//! Create `conversation`, `conversation_participant` and `message`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Conversation::Table)
                    .if_not_exists()
                    .col(uuid(Conversation::Id).primary_key())
                    .col(ColumnDef::new(Conversation::RelatedServiceId).uuid().null())
                    .col(string_len(Conversation::Title, 200).not_null())
                    .col(boolean(Conversation::IsArchived).not_null())
                    .col(timestamp_with_time_zone(Conversation::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Conversation::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ConversationParticipant::Table)
                    .if_not_exists()
                    .col(uuid(ConversationParticipant::Id).primary_key())
                    .col(uuid(ConversationParticipant::ConversationId).not_null())
                    .col(uuid(ConversationParticipant::UserId).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_participant_conversation")
                            .from(ConversationParticipant::Table, ConversationParticipant::ConversationId)
                            .to(Conversation::Table, Conversation::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_participant_user")
                            .from(ConversationParticipant::Table, ConversationParticipant::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Message::Table)
                    .if_not_exists()
                    .col(uuid(Message::Id).primary_key())
                    .col(uuid(Message::ConversationId).not_null())
                    .col(uuid(Message::SenderId).not_null())
                    .col(text(Message::Body).not_null())
                    .col(boolean(Message::IsRead).not_null())
                    .col(
                        ColumnDef::new(Message::ReadAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(timestamp_with_time_zone(Message::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_conversation")
                            .from(Message::Table, Message::ConversationId)
                            .to(Conversation::Table, Conversation::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_sender")
                            .from(Message::Table, Message::SenderId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Message::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(ConversationParticipant::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Conversation::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Conversation { Table, Id, RelatedServiceId, Title, IsArchived, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum ConversationParticipant { Table, Id, ConversationId, UserId }

#[derive(DeriveIden)]
enum Message { Table, Id, ConversationId, SenderId, Body, IsRead, ReadAt, CreatedAt }

#[derive(DeriveIden)]
enum User { Table, Id }
