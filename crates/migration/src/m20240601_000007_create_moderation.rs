//! Create `report` and the `moderation_action` audit table, whose rows can
//! later be marked reversed.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Report::Table)
                    .if_not_exists()
                    .col(uuid(Report::Id).primary_key())
                    .col(uuid(Report::ReporterId).not_null())
                    .col(string_len(Report::ContentType, 16).not_null())
                    .col(uuid(Report::ObjectId).not_null())
                    .col(ColumnDef::new(Report::TargetUserId).uuid().null())
                    .col(string_len(Report::Reason, 32).not_null())
                    .col(text(Report::Description).not_null())
                    .col(ColumnDef::new(Report::EvidenceUrl).string_len(500).null())
                    .col(ColumnDef::new(Report::ReporterIp).string_len(64).null())
                    .col(string_len(Report::Status, 20).not_null())
                    .col(ColumnDef::new(Report::Resolution).string_len(32).null())
                    .col(ColumnDef::new(Report::ResolvedBy).uuid().null())
                    .col(
                        ColumnDef::new(Report::ResolvedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(timestamp_with_time_zone(Report::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Report::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_report_reporter")
                            .from(Report::Table, Report::ReporterId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ModerationAction::Table)
                    .if_not_exists()
                    .col(uuid(ModerationAction::Id).primary_key())
                    .col(ColumnDef::new(ModerationAction::ReportId).uuid().null())
                    .col(uuid(ModerationAction::ModeratorId).not_null())
                    .col(ColumnDef::new(ModerationAction::AffectedUserId).uuid().null())
                    .col(string_len(ModerationAction::Action, 32).not_null())
                    .col(text(ModerationAction::Notes).not_null())
                    .col(ColumnDef::new(ModerationAction::DurationDays).integer().null())
                    .col(
                        ColumnDef::new(ModerationAction::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(timestamp_with_time_zone(ModerationAction::CreatedAt).not_null())
                    .col(boolean(ModerationAction::IsReversed).not_null().default(false))
                    .col(ColumnDef::new(ModerationAction::ReversedBy).uuid().null())
                    .col(
                        ColumnDef::new(ModerationAction::ReversedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(ModerationAction::ReversalReason).text().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_moderation_action_report")
                            .from(ModerationAction::Table, ModerationAction::ReportId)
                            .to(Report::Table, Report::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ModerationAction::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Report::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Report {
    Table,
    Id,
    ReporterId,
    ContentType,
    ObjectId,
    TargetUserId,
    Reason,
    Description,
    EvidenceUrl,
    ReporterIp,
    Status,
    Resolution,
    ResolvedBy,
    ResolvedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ModerationAction {
    Table,
    Id,
    ReportId,
    ModeratorId,
    AffectedUserId,
    Action,
    Notes,
    DurationDays,
    ExpiresAt,
    CreatedAt,
    IsReversed,
    ReversedBy,
    ReversedAt,
    ReversalReason,
}

#[derive(DeriveIden)]
enum User { Table, Id }
