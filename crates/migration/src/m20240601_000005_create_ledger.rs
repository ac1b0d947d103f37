//! Create `time_account` and `time_transaction`. Amounts are whole minutes.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TimeAccount::Table)
                    .if_not_exists()
                    .col(uuid(TimeAccount::Id).primary_key())
                    .col(uuid(TimeAccount::UserId).unique_key().not_null())
                    .col(big_integer(TimeAccount::Balance).not_null())
                    .col(big_integer(TimeAccount::TotalEarned).not_null())
                    .col(big_integer(TimeAccount::TotalSpent).not_null())
                    .col(timestamp_with_time_zone(TimeAccount::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(TimeAccount::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_time_account_user")
                            .from(TimeAccount::Table, TimeAccount::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TimeTransaction::Table)
                    .if_not_exists()
                    .col(uuid(TimeTransaction::Id).primary_key())
                    .col(uuid(TimeTransaction::AccountId).not_null())
                    .col(string_len(TimeTransaction::Kind, 16).not_null())
                    .col(big_integer(TimeTransaction::Amount).not_null())
                    .col(string_len(TimeTransaction::Description, 255).not_null())
                    .col(ColumnDef::new(TimeTransaction::ServiceId).uuid().null())
                    .col(ColumnDef::new(TimeTransaction::ServiceRequestId).uuid().null())
                    .col(ColumnDef::new(TimeTransaction::ProcessedBy).uuid().null())
                    .col(timestamp_with_time_zone(TimeTransaction::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_time_transaction_account")
                            .from(TimeTransaction::Table, TimeTransaction::AccountId)
                            .to(TimeAccount::Table, TimeAccount::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one debit and one credit per settled request. Grants carry a
        // NULL request id and are not constrained.
        manager
            .create_index(
                Index::create()
                    .name("uniq_time_transaction_request_kind")
                    .table(TimeTransaction::Table)
                    .col(TimeTransaction::ServiceRequestId)
                    .col(TimeTransaction::Kind)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(TimeTransaction::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(TimeAccount::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum TimeAccount { Table, Id, UserId, Balance, TotalEarned, TotalSpent, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum TimeTransaction {
    Table,
    Id,
    AccountId,
    Kind,
    Amount,
    Description,
    ServiceId,
    ServiceRequestId,
    ProcessedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum User { Table, Id }
