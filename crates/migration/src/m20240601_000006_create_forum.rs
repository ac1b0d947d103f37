//! Create forum `thread` and `post`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Thread::Table)
                    .if_not_exists()
                    .col(uuid(Thread::Id).primary_key())
                    .col(string_len(Thread::Title, 200).not_null())
                    .col(uuid(Thread::AuthorId).not_null())
                    .col(string_len(Thread::Status, 16).not_null())
                    .col(ColumnDef::new(Thread::RelatedServiceId).uuid().null())
                    .col(big_integer(Thread::ViewsCount).not_null())
                    .col(timestamp_with_time_zone(Thread::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Thread::UpdatedAt).not_null())
                    .col(
                        ColumnDef::new(Thread::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_thread_author")
                            .from(Thread::Table, Thread::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Post::Table)
                    .if_not_exists()
                    .col(uuid(Post::Id).primary_key())
                    .col(uuid(Post::ThreadId).not_null())
                    .col(uuid(Post::AuthorId).not_null())
                    .col(text(Post::Body).not_null())
                    .col(string_len(Post::Status, 16).not_null())
                    .col(timestamp_with_time_zone(Post::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Post::UpdatedAt).not_null())
                    .col(
                        ColumnDef::new(Post::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_post_thread")
                            .from(Post::Table, Post::ThreadId)
                            .to(Thread::Table, Thread::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_post_author")
                            .from(Post::Table, Post::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Post::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Thread::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Thread { Table, Id, Title, AuthorId, Status, RelatedServiceId, ViewsCount, CreatedAt, UpdatedAt, DeletedAt }

#[derive(DeriveIden)]
enum Post { Table, Id, ThreadId, AuthorId, Body, Status, CreatedAt, UpdatedAt, DeletedAt }

#[derive(DeriveIden)]
enum User { Table, Id }
