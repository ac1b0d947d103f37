//! Moderation queue: member reports and the staff actions that close them.
//!
//! Each staff action runs under the report's in-process lock and in one
//! transaction that also writes the audit row and any notification messages.
//! Repeating the action that already closed a report changes nothing.
//! Bans, suspensions and removals can later be reversed by staff.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use common::pagination::Pagination;
use models::{
    moderation_action::{self, ActionKind},
    post,
    report::{self, ContentType, ReportReason, ReportStatus},
    service, thread, user,
};

use crate::{actor::Actor, errors::ServiceError, locks::RequestLocks, messaging, users};

pub const DEFAULT_SUSPENSION_DAYS: i32 = 7;
/// Longer restrictions are bans.
pub const MAX_SUSPENSION_DAYS: i32 = 3650;

#[derive(Debug, Clone, Deserialize)]
pub struct NewReport {
    pub content_type: ContentType,
    pub object_id: Uuid,
    pub reason: ReportReason,
    #[serde(default)]
    pub description: String,
    pub evidence_url: Option<String>,
    #[serde(skip)]
    pub reporter_ip: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub reason: Option<ReportReason>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionFilter {
    pub action: Option<ActionKind>,
    pub affected_user: Option<Uuid>,
    pub is_reversed: Option<bool>,
}

/// What happened to a report when a closing action ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closing {
    Apply,
    AlreadyDone,
}

fn closing_check(rep: &report::Model, action: ActionKind) -> Result<Closing, ServiceError> {
    if rep.status.is_open() {
        return Ok(Closing::Apply);
    }
    if rep.resolution == Some(action) {
        return Ok(Closing::AlreadyDone);
    }
    Err(ServiceError::InvalidTransition(format!(
        "report already closed as {}",
        rep.resolution.map(|a| a.as_str()).unwrap_or("unknown")
    )))
}

fn require_staff(actor: &Actor) -> Result<(), ServiceError> {
    if actor.is_staff {
        Ok(())
    } else {
        Err(ServiceError::PermissionDenied("moderation requires a staff account".into()))
    }
}

async fn load_report<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<report::Model, ServiceError> {
    let mut q = report::Entity::find_by_id(id);
    if db.get_database_backend() == DbBackend::Postgres {
        q = q.lock_exclusive();
    }
    q.one(db).await?.ok_or_else(|| ServiceError::not_found("report"))
}

/// The user responsible for a live target, or `NotFound` when the target is
/// missing or soft-deleted.
async fn target_owner<C: ConnectionTrait>(db: &C, content_type: ContentType, object_id: Uuid) -> Result<Uuid, ServiceError> {
    let owner = match content_type {
        ContentType::Service => service::Entity::find_by_id(object_id)
            .one(db)
            .await?
            .filter(|s| s.deleted_at.is_none())
            .map(|s| s.owner_id),
        ContentType::User => user::Entity::find_by_id(object_id).one(db).await?.map(|u| u.id),
        ContentType::Post => post::Entity::find_by_id(object_id)
            .one(db)
            .await?
            .filter(|p| p.deleted_at.is_none())
            .map(|p| p.author_id),
        ContentType::Thread => thread::Entity::find_by_id(object_id)
            .one(db)
            .await?
            .filter(|t| t.deleted_at.is_none())
            .map(|t| t.author_id),
    };
    owner.ok_or_else(|| ServiceError::NotFound(format!("reported {:?} not found", content_type).to_lowercase()))
}

/// Soft-delete the reported object; returns false when it was already gone.
async fn soft_delete_target<C: ConnectionTrait>(db: &C, rep: &report::Model, now: DateTime<FixedOffset>) -> Result<bool, ServiceError> {
    match rep.content_type {
        ContentType::User => Err(ServiceError::Validation("users are removed by banning, not deletion".into())),
        ContentType::Service => {
            let Some(s) = service::Entity::find_by_id(rep.object_id).one(db).await? else { return Ok(false) };
            if s.deleted_at.is_some() {
                return Ok(false);
            }
            let mut am: service::ActiveModel = s.into();
            am.deleted_at = Set(Some(now));
            am.status = Set(service::ServiceStatus::Inactive);
            am.updated_at = Set(now);
            am.update(db).await?;
            Ok(true)
        }
        ContentType::Post => {
            let Some(p) = post::Entity::find_by_id(rep.object_id).one(db).await? else { return Ok(false) };
            if p.deleted_at.is_some() {
                return Ok(false);
            }
            let mut am: post::ActiveModel = p.into();
            am.deleted_at = Set(Some(now));
            am.status = Set(post::PostStatus::Hidden);
            am.updated_at = Set(now);
            am.update(db).await?;
            Ok(true)
        }
        ContentType::Thread => {
            let Some(t) = thread::Entity::find_by_id(rep.object_id).one(db).await? else { return Ok(false) };
            if t.deleted_at.is_some() {
                return Ok(false);
            }
            let mut am: thread::ActiveModel = t.into();
            am.deleted_at = Set(Some(now));
            am.updated_at = Set(now);
            am.update(db).await?;
            Ok(true)
        }
    }
}

async fn load_action<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<moderation_action::Model, ServiceError> {
    let mut q = moderation_action::Entity::find_by_id(id);
    if db.get_database_backend() == DbBackend::Postgres {
        q = q.lock_exclusive();
    }
    q.one(db).await?.ok_or_else(|| ServiceError::not_found("moderation action"))
}

/// Undo a soft delete; returns false when the object is gone or already live.
async fn restore_target<C: ConnectionTrait>(db: &C, rep: &report::Model, now: DateTime<FixedOffset>) -> Result<bool, ServiceError> {
    match rep.content_type {
        ContentType::User => Ok(false),
        ContentType::Service => {
            let Some(s) = service::Entity::find_by_id(rep.object_id).one(db).await? else { return Ok(false) };
            if s.deleted_at.is_none() {
                return Ok(false);
            }
            let mut am: service::ActiveModel = s.into();
            am.deleted_at = Set(None);
            am.status = Set(service::ServiceStatus::Active);
            am.updated_at = Set(now);
            am.update(db).await?;
            Ok(true)
        }
        ContentType::Post => {
            let Some(p) = post::Entity::find_by_id(rep.object_id).one(db).await? else { return Ok(false) };
            if p.deleted_at.is_none() {
                return Ok(false);
            }
            let mut am: post::ActiveModel = p.into();
            am.deleted_at = Set(None);
            am.status = Set(post::PostStatus::Published);
            am.updated_at = Set(now);
            am.update(db).await?;
            Ok(true)
        }
        ContentType::Thread => {
            let Some(t) = thread::Entity::find_by_id(rep.object_id).one(db).await? else { return Ok(false) };
            if t.deleted_at.is_none() {
                return Ok(false);
            }
            let mut am: thread::ActiveModel = t.into();
            am.deleted_at = Set(None);
            am.updated_at = Set(now);
            am.update(db).await?;
            Ok(true)
        }
    }
}

/// Recompute a user's standing from the restrictions still in force.
/// A live ban wins over suspensions; the latest suspension end wins among those.
async fn reinstate_user<C: ConnectionTrait>(db: &C, user_id: Uuid, now: DateTime<FixedOffset>) -> Result<user::UserStatus, ServiceError> {
    let live: Vec<moderation_action::Model> = moderation_action::Entity::find()
        .filter(moderation_action::Column::AffectedUserId.eq(user_id))
        .filter(moderation_action::Column::Action.is_in([ActionKind::UserBanned, ActionKind::UserSuspended]))
        .filter(moderation_action::Column::IsReversed.eq(false))
        .all(db)
        .await?
        .into_iter()
        .filter(|a| a.is_in_force_at(now))
        .collect();
    let (status, until) = if live.iter().any(|a| a.action == ActionKind::UserBanned) {
        (user::UserStatus::Banned, None)
    } else if let Some(until) = live.iter().filter_map(|a| a.expires_at).max() {
        (user::UserStatus::Suspended, Some(until))
    } else {
        (user::UserStatus::Active, None)
    };
    let target = users::get_user(db, user_id).await?;
    let mut am: user::ActiveModel = target.into();
    am.status = Set(status);
    am.suspended_until = Set(until);
    if status == user::UserStatus::Active {
        am.moderation_note = Set(None);
    }
    am.updated_at = Set(now);
    am.update(db).await?;
    Ok(status)
}

struct Audit<'a> {
    report_id: Option<Uuid>,
    moderator_id: Uuid,
    affected_user_id: Option<Uuid>,
    action: ActionKind,
    notes: &'a str,
    duration_days: Option<i32>,
    expires_at: Option<DateTime<FixedOffset>>,
}

async fn write_audit<C: ConnectionTrait>(db: &C, a: Audit<'_>) -> Result<moderation_action::Model, ServiceError> {
    let row = moderation_action::ActiveModel {
        id: Set(Uuid::new_v4()),
        report_id: Set(a.report_id),
        moderator_id: Set(a.moderator_id),
        affected_user_id: Set(a.affected_user_id),
        action: Set(a.action),
        notes: Set(a.notes.to_string()),
        duration_days: Set(a.duration_days),
        expires_at: Set(a.expires_at),
        created_at: Set(Utc::now().into()),
        is_reversed: Set(false),
        reversed_by: Set(None),
        reversed_at: Set(None),
        reversal_reason: Set(None),
    }
    .insert(db)
    .await?;
    common::metrics::record_moderation(a.action.as_str());
    Ok(row)
}

async fn close_report<C: ConnectionTrait>(
    db: &C,
    rep: report::Model,
    status: ReportStatus,
    action: ActionKind,
    moderator: Uuid,
    now: DateTime<FixedOffset>,
) -> Result<report::Model, ServiceError> {
    let mut am: report::ActiveModel = rep.into();
    am.status = Set(status);
    am.resolution = Set(Some(action));
    am.resolved_by = Set(Some(moderator));
    am.resolved_at = Set(Some(now));
    am.updated_at = Set(now);
    Ok(am.update(db).await?)
}

async fn notify_unless_self<C: ConnectionTrait>(db: &C, from: Uuid, to: Uuid, body: &str) -> Result<(), ServiceError> {
    if from != to {
        messaging::notify(db, from, to, body).await?;
    }
    Ok(())
}

#[derive(Clone)]
pub struct ModerationQueue {
    db: DatabaseConnection,
    locks: RequestLocks,
}

impl ModerationQueue {
    pub fn new(db: DatabaseConnection, locks: RequestLocks) -> Self { Self { db, locks } }

    #[instrument(skip(self, input), fields(user_id = %actor.user_id))]
    pub async fn report(&self, actor: &Actor, input: NewReport) -> Result<report::Model, ServiceError> {
        let txn = self.db.begin().await?;
        users::get_user(&txn, actor.user_id).await?;
        let target_user_id = target_owner(&txn, input.content_type, input.object_id).await?;

        let open = report::Entity::find()
            .filter(report::Column::ReporterId.eq(actor.user_id))
            .filter(report::Column::ContentType.eq(input.content_type))
            .filter(report::Column::ObjectId.eq(input.object_id))
            .filter(report::Column::Status.is_in([ReportStatus::Pending, ReportStatus::UnderReview]))
            .count(&txn)
            .await?;
        if open > 0 {
            return Err(ServiceError::DuplicateReport("you already have an open report on this content".into()));
        }

        let now = Utc::now();
        let created = report::ActiveModel {
            id: Set(Uuid::new_v4()),
            reporter_id: Set(actor.user_id),
            content_type: Set(input.content_type),
            object_id: Set(input.object_id),
            target_user_id: Set(Some(target_user_id)),
            reason: Set(input.reason),
            description: Set(input.description.trim().to_string()),
            evidence_url: Set(input.evidence_url.filter(|u| !u.trim().is_empty())),
            reporter_ip: Set(input.reporter_ip),
            status: Set(ReportStatus::Pending),
            resolution: Set(None),
            resolved_by: Set(None),
            resolved_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        info!(event = "report_filed", report_id = %created.id, content_type = ?created.content_type);
        Ok(created)
    }

    /// Staff see every report, members only their own. Newest first.
    pub async fn list(&self, actor: &Actor, filter: ReportFilter, page: Pagination) -> Result<Vec<report::Model>, ServiceError> {
        let mut q = report::Entity::find().order_by_desc(report::Column::CreatedAt);
        if !actor.is_staff {
            q = q.filter(report::Column::ReporterId.eq(actor.user_id));
        }
        if let Some(s) = filter.status { q = q.filter(report::Column::Status.eq(s)); }
        if let Some(r) = filter.reason { q = q.filter(report::Column::Reason.eq(r)); }
        let (page_idx, per_page) = page.normalize();
        Ok(q.paginate(&self.db, per_page).fetch_page(page_idx).await?)
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<report::Model, ServiceError> {
        let rep = report::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("report"))?;
        if !actor.is_staff && rep.reporter_id != actor.user_id {
            // Other members' reports are invisible rather than forbidden.
            return Err(ServiceError::not_found("report"));
        }
        Ok(rep)
    }

    /// Audit trail of one report, oldest first.
    pub async fn actions(&self, actor: &Actor, id: Uuid) -> Result<Vec<moderation_action::Model>, ServiceError> {
        require_staff(actor)?;
        Ok(moderation_action::Entity::find()
            .filter(moderation_action::Column::ReportId.eq(id))
            .order_by_asc(moderation_action::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Every audit row, newest first. Staff only.
    pub async fn list_actions(
        &self,
        actor: &Actor,
        filter: ActionFilter,
        page: Pagination,
    ) -> Result<Vec<moderation_action::Model>, ServiceError> {
        require_staff(actor)?;
        let mut q = moderation_action::Entity::find().order_by_desc(moderation_action::Column::CreatedAt);
        if let Some(a) = filter.action { q = q.filter(moderation_action::Column::Action.eq(a)); }
        if let Some(u) = filter.affected_user { q = q.filter(moderation_action::Column::AffectedUserId.eq(u)); }
        if let Some(r) = filter.is_reversed { q = q.filter(moderation_action::Column::IsReversed.eq(r)); }
        let (page_idx, per_page) = page.normalize();
        Ok(q.paginate(&self.db, per_page).fetch_page(page_idx).await?)
    }

    /// Undo a ban, suspension or content removal. The original row is marked
    /// reversed and a `reinstated` row is appended. Reversing twice is a no-op.
    #[instrument(skip(self, reason), fields(user_id = %actor.user_id))]
    pub async fn reverse_action(&self, actor: &Actor, action_id: Uuid, reason: &str) -> Result<moderation_action::Model, ServiceError> {
        require_staff(actor)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ServiceError::Validation("a reversal reason is required".into()));
        }
        let _guard = self.locks.acquire(action_id).await;
        let txn = self.db.begin().await?;
        let original = load_action(&txn, action_id).await?;
        if original.is_reversed {
            return Ok(original);
        }
        if !original.action.is_reversible() {
            return Err(ServiceError::Validation(format!("{} cannot be reversed", original.action.as_str())));
        }

        let now: DateTime<FixedOffset> = Utc::now().into();
        let kind = original.action;
        let report_id = original.report_id;
        let affected = original.affected_user_id;
        let mut am: moderation_action::ActiveModel = original.into();
        am.is_reversed = Set(true);
        am.reversed_by = Set(Some(actor.user_id));
        am.reversed_at = Set(Some(now));
        am.reversal_reason = Set(Some(reason.to_string()));
        let reversed = am.update(&txn).await?;

        let notice = match kind {
            ActionKind::ContentRemoved => {
                let rep = match report_id {
                    Some(rid) => report::Entity::find_by_id(rid).one(&txn).await?,
                    None => None,
                };
                let Some(rep) = rep else {
                    return Err(ServiceError::Validation("removal has no report to restore from".into()));
                };
                let restored = restore_target(&txn, &rep, now).await?;
                info!(event = "content_restored", report_id = %rep.id, restored);
                "Content of yours that was removed by a moderator has been restored.".to_string()
            }
            _ => {
                let Some(user_id) = affected else {
                    return Err(ServiceError::Validation("restriction has no affected user".into()));
                };
                let status = reinstate_user(&txn, user_id, now).await?;
                info!(event = "restriction_reversed", user_id = %user_id, status = ?status);
                format!("A restriction on your account has been lifted. Reason: {}", reason)
            }
        };

        write_audit(
            &txn,
            Audit {
                report_id,
                moderator_id: actor.user_id,
                affected_user_id: affected,
                action: ActionKind::Reinstated,
                notes: reason,
                duration_days: None,
                expires_at: None,
            },
        )
        .await?;
        if let Some(user_id) = affected {
            notify_unless_self(&txn, actor.user_id, user_id, &notice).await?;
        }
        txn.commit().await?;
        Ok(reversed)
    }

    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn start_review(&self, actor: &Actor, id: Uuid) -> Result<report::Model, ServiceError> {
        require_staff(actor)?;
        let _guard = self.locks.acquire(id).await;
        let txn = self.db.begin().await?;
        let rep = load_report(&txn, id).await?;
        match rep.status {
            ReportStatus::UnderReview => return Ok(rep),
            ReportStatus::Pending => {}
            other => {
                return Err(ServiceError::InvalidTransition(format!("report is already {:?}", other).to_lowercase()));
            }
        }
        let mut am: report::ActiveModel = rep.into();
        am.status = Set(ReportStatus::UnderReview);
        am.updated_at = Set(Utc::now().into());
        let updated = am.update(&txn).await?;
        write_audit(
            &txn,
            Audit {
                report_id: Some(id),
                moderator_id: actor.user_id,
                affected_user_id: updated.target_user_id,
                action: ActionKind::ReviewStarted,
                notes: "",
                duration_days: None,
                expires_at: None,
            },
        )
        .await?;
        txn.commit().await?;
        Ok(updated)
    }

    pub async fn resolve(&self, actor: &Actor, id: Uuid, notes: &str) -> Result<report::Model, ServiceError> {
        self.close_plain(actor, id, ReportStatus::Resolved, ActionKind::Resolved, notes).await
    }

    pub async fn dismiss(&self, actor: &Actor, id: Uuid, notes: &str) -> Result<report::Model, ServiceError> {
        self.close_plain(actor, id, ReportStatus::Dismissed, ActionKind::Dismissed, notes).await
    }

    #[instrument(skip(self, notes), fields(user_id = %actor.user_id))]
    async fn close_plain(
        &self,
        actor: &Actor,
        id: Uuid,
        status: ReportStatus,
        action: ActionKind,
        notes: &str,
    ) -> Result<report::Model, ServiceError> {
        require_staff(actor)?;
        let _guard = self.locks.acquire(id).await;
        let txn = self.db.begin().await?;
        let rep = load_report(&txn, id).await?;
        if closing_check(&rep, action)? == Closing::AlreadyDone {
            return Ok(rep);
        }
        let affected = rep.target_user_id;
        let now: DateTime<FixedOffset> = Utc::now().into();
        let updated = close_report(&txn, rep, status, action, actor.user_id, now).await?;
        write_audit(
            &txn,
            Audit {
                report_id: Some(id),
                moderator_id: actor.user_id,
                affected_user_id: affected,
                action,
                notes,
                duration_days: None,
                expires_at: None,
            },
        )
        .await?;
        txn.commit().await?;
        info!(event = "report_closed", report_id = %id, action = action.as_str());
        Ok(updated)
    }

    pub async fn ban_user(&self, actor: &Actor, id: Uuid, reason: &str) -> Result<report::Model, ServiceError> {
        self.restrict(actor, id, reason, None).await
    }

    /// `days` defaults to a week and must lie in `1..=MAX_SUSPENSION_DAYS`.
    pub async fn suspend_user(&self, actor: &Actor, id: Uuid, reason: &str, days: Option<i32>) -> Result<report::Model, ServiceError> {
        let days = days.unwrap_or(DEFAULT_SUSPENSION_DAYS);
        if !(1..=MAX_SUSPENSION_DAYS).contains(&days) {
            return Err(ServiceError::Validation(format!(
                "suspension must last between 1 and {} days",
                MAX_SUSPENSION_DAYS
            )));
        }
        self.restrict(actor, id, reason, Some(days)).await
    }

    /// Ban (`days == None`) or suspend the report's target user.
    #[instrument(skip(self, reason), fields(user_id = %actor.user_id))]
    async fn restrict(&self, actor: &Actor, id: Uuid, reason: &str, days: Option<i32>) -> Result<report::Model, ServiceError> {
        require_staff(actor)?;
        let action = if days.is_some() { ActionKind::UserSuspended } else { ActionKind::UserBanned };
        let _guard = self.locks.acquire(id).await;
        let txn = self.db.begin().await?;
        let rep = load_report(&txn, id).await?;
        if closing_check(&rep, action)? == Closing::AlreadyDone {
            return Ok(rep);
        }
        let Some(target_id) = rep.target_user_id else {
            return Err(ServiceError::Validation("report has no user to restrict".into()));
        };
        if target_id == actor.user_id {
            return Err(ServiceError::Validation("moderators cannot restrict themselves".into()));
        }

        let now: DateTime<FixedOffset> = Utc::now().into();
        let target = users::get_user(&txn, target_id).await?;
        let expires_at = match days {
            Some(d) => Some(
                now.checked_add_signed(Duration::days(d as i64))
                    .ok_or_else(|| ServiceError::Validation("suspension end is out of range".into()))?,
            ),
            None => None,
        };
        let mut am: user::ActiveModel = target.into();
        am.status = Set(if days.is_some() { user::UserStatus::Suspended } else { user::UserStatus::Banned });
        am.suspended_until = Set(expires_at);
        am.moderation_note = Set(Some(reason.to_string()));
        am.updated_at = Set(now);
        am.update(&txn).await?;

        let reporter = rep.reporter_id;
        let updated = close_report(&txn, rep, ReportStatus::Resolved, action, actor.user_id, now).await?;
        write_audit(
            &txn,
            Audit {
                report_id: Some(id),
                moderator_id: actor.user_id,
                affected_user_id: Some(target_id),
                action,
                notes: reason,
                duration_days: days,
                expires_at,
            },
        )
        .await?;

        let (to_reporter, to_target) = match days {
            Some(d) => (
                "Thanks for your report. The account involved has been suspended.".to_string(),
                format!("Your account has been suspended for {} day(s). Reason: {}", d, reason),
            ),
            None => (
                "Thanks for your report. The account involved has been banned.".to_string(),
                format!("Your account has been banned. Reason: {}", reason),
            ),
        };
        notify_unless_self(&txn, actor.user_id, reporter, &to_reporter).await?;
        notify_unless_self(&txn, actor.user_id, target_id, &to_target).await?;
        txn.commit().await?;

        warn!(event = "user_restricted", report_id = %id, user_id = %target_id, action = action.as_str());
        Ok(updated)
    }

    /// Soft-delete the reported service, post or thread and resolve the report.
    #[instrument(skip(self, notes), fields(user_id = %actor.user_id))]
    pub async fn delete_content(&self, actor: &Actor, id: Uuid, notes: &str) -> Result<report::Model, ServiceError> {
        require_staff(actor)?;
        let _guard = self.locks.acquire(id).await;
        let txn = self.db.begin().await?;
        let rep = load_report(&txn, id).await?;
        if rep.content_type == ContentType::User {
            return Err(ServiceError::Validation("users are removed by banning, not deletion".into()));
        }
        if closing_check(&rep, ActionKind::ContentRemoved)? == Closing::AlreadyDone {
            return Ok(rep);
        }

        let now: DateTime<FixedOffset> = Utc::now().into();
        let removed = soft_delete_target(&txn, &rep, now).await?;
        let reporter = rep.reporter_id;
        let affected = rep.target_user_id;
        let updated = close_report(&txn, rep, ReportStatus::Resolved, ActionKind::ContentRemoved, actor.user_id, now).await?;
        write_audit(
            &txn,
            Audit {
                report_id: Some(id),
                moderator_id: actor.user_id,
                affected_user_id: affected,
                action: ActionKind::ContentRemoved,
                notes,
                duration_days: None,
                expires_at: None,
            },
        )
        .await?;
        notify_unless_self(
            &txn,
            actor.user_id,
            reporter,
            "Thanks for your report. The content has been removed.",
        )
        .await?;
        txn.commit().await?;

        info!(event = "content_removed", report_id = %id, already_deleted = !removed);
        Ok(updated)
    }
}
