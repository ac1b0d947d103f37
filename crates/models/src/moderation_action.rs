use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::report;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    #[sea_orm(string_value = "review_started")]
    ReviewStarted,
    #[sea_orm(string_value = "resolved")]
    Resolved,
    #[sea_orm(string_value = "dismissed")]
    Dismissed,
    #[sea_orm(string_value = "user_banned")]
    UserBanned,
    #[sea_orm(string_value = "user_suspended")]
    UserSuspended,
    #[sea_orm(string_value = "content_removed")]
    ContentRemoved,
    /// Undoes an earlier ban, suspension or removal.
    #[sea_orm(string_value = "reinstated")]
    Reinstated,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::ReviewStarted => "review_started",
            ActionKind::Resolved => "resolved",
            ActionKind::Dismissed => "dismissed",
            ActionKind::UserBanned => "user_banned",
            ActionKind::UserSuspended => "user_suspended",
            ActionKind::ContentRemoved => "content_removed",
            ActionKind::Reinstated => "reinstated",
        }
    }

    /// Actions whose effect on a user or on content can be undone.
    pub fn is_reversible(&self) -> bool {
        matches!(self, ActionKind::UserBanned | ActionKind::UserSuspended | ActionKind::ContentRemoved)
    }
}

/// Audit row, one per staff action.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "moderation_action")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub report_id: Option<Uuid>,
    pub moderator_id: Uuid,
    pub affected_user_id: Option<Uuid>,
    pub action: ActionKind,
    #[sea_orm(column_type = "Text")]
    pub notes: String,
    pub duration_days: Option<i32>,
    pub expires_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub is_reversed: bool,
    pub reversed_by: Option<Uuid>,
    pub reversed_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub reversal_reason: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Report }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Report => Entity::belongs_to(report::Entity)
                .from(Column::ReportId)
                .to(report::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Not reversed and, for time-boxed actions, not yet expired.
    pub fn is_in_force_at(&self, now: chrono::DateTime<chrono::FixedOffset>) -> bool {
        !self.is_reversed && self.expires_at.map(|t| t > now).unwrap_or(true)
    }
}
