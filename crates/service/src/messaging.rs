//! Conversations and messages.
//!
//! Service requests open a requester/owner conversation and moderation
//! notifications are delivered as messages from the moderator, so both go
//! through [`direct_conversation`].

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use common::pagination::Pagination;
use models::{conversation, conversation_participant, message};

use crate::{actor::Actor, errors::ServiceError, users};

/// Conversation between exactly `a` and `b` tied to `related_service_id`,
/// created when missing.
pub async fn direct_conversation<C: ConnectionTrait>(
    db: &C,
    a: Uuid,
    b: Uuid,
    title: &str,
    related_service_id: Option<Uuid>,
) -> Result<conversation::Model, ServiceError> {
    let of_a: Vec<Uuid> = conversation_participant::Entity::find()
        .filter(conversation_participant::Column::UserId.eq(a))
        .all(db)
        .await?
        .into_iter()
        .map(|p| p.conversation_id)
        .collect();
    if !of_a.is_empty() {
        let shared: Vec<Uuid> = conversation_participant::Entity::find()
            .filter(conversation_participant::Column::UserId.eq(b))
            .filter(conversation_participant::Column::ConversationId.is_in(of_a))
            .all(db)
            .await?
            .into_iter()
            .map(|p| p.conversation_id)
            .collect();
        if !shared.is_empty() {
            let mut q = conversation::Entity::find().filter(conversation::Column::Id.is_in(shared));
            q = match related_service_id {
                Some(sid) => q.filter(conversation::Column::RelatedServiceId.eq(sid)),
                None => q.filter(conversation::Column::RelatedServiceId.is_null()),
            };
            if let Some(found) = q.order_by_asc(conversation::Column::CreatedAt).one(db).await? {
                return Ok(found);
            }
        }
    }

    let now = Utc::now();
    let conv = conversation::ActiveModel {
        id: Set(Uuid::new_v4()),
        related_service_id: Set(related_service_id),
        title: Set(title.to_string()),
        is_archived: Set(false),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await?;
    for user_id in [a, b] {
        conversation_participant::ActiveModel {
            id: Set(Uuid::new_v4()),
            conversation_id: Set(conv.id),
            user_id: Set(user_id),
        }
        .insert(db)
        .await?;
    }
    debug!(event = "conversation_opened", conversation_id = %conv.id);
    Ok(conv)
}

async fn ensure_participant<C: ConnectionTrait>(db: &C, conversation_id: Uuid, user_id: Uuid) -> Result<conversation::Model, ServiceError> {
    let conv = conversation::Entity::find_by_id(conversation_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("conversation"))?;
    let member = conversation_participant::Entity::find()
        .filter(conversation_participant::Column::ConversationId.eq(conversation_id))
        .filter(conversation_participant::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    if member.is_none() {
        return Err(ServiceError::PermissionDenied("not a participant of this conversation".into()));
    }
    Ok(conv)
}

async fn insert_message<C: ConnectionTrait>(db: &C, conv: conversation::Model, sender_id: Uuid, body: &str) -> Result<message::Model, ServiceError> {
    let now = Utc::now();
    let msg = message::ActiveModel {
        id: Set(Uuid::new_v4()),
        conversation_id: Set(conv.id),
        sender_id: Set(sender_id),
        body: Set(body.to_string()),
        is_read: Set(false),
        read_at: Set(None),
        created_at: Set(now.into()),
    }
    .insert(db)
    .await?;
    let mut am: conversation::ActiveModel = conv.into();
    am.updated_at = Set(now.into());
    am.update(db).await?;
    Ok(msg)
}

/// Post as `sender_id`: participants only, refused for restricted accounts.
pub async fn post_message<C: ConnectionTrait>(
    db: &C,
    conversation_id: Uuid,
    sender_id: Uuid,
    body: &str,
) -> Result<message::Model, ServiceError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(ServiceError::Validation("message body required".into()));
    }
    users::ensure_unrestricted(db, sender_id).await?;
    let conv = ensure_participant(db, conversation_id, sender_id).await?;
    insert_message(db, conv, sender_id, body).await
}

/// System notification from `from` (a moderator) to `to`. Delivered even when
/// the recipient is restricted.
pub async fn notify<C: ConnectionTrait>(db: &C, from: Uuid, to: Uuid, body: &str) -> Result<message::Model, ServiceError> {
    let conv = direct_conversation(db, from, to, "Moderation notice", None).await?;
    insert_message(db, conv, from, body).await
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: conversation::Model,
    pub participant_ids: Vec<Uuid>,
    pub last_message: Option<message::Model>,
    pub unread_count: u64,
}

#[derive(Clone)]
pub struct Messaging {
    db: DatabaseConnection,
}

impl Messaging {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }

    /// Conversations the actor takes part in, most recently active first.
    pub async fn list_conversations(&self, actor: &Actor, archived: Option<bool>) -> Result<Vec<ConversationSummary>, ServiceError> {
        let ids: Vec<Uuid> = conversation_participant::Entity::find()
            .filter(conversation_participant::Column::UserId.eq(actor.user_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|p| p.conversation_id)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut q = conversation::Entity::find()
            .filter(conversation::Column::Id.is_in(ids.clone()))
            .order_by_desc(conversation::Column::UpdatedAt);
        if let Some(flag) = archived {
            q = q.filter(conversation::Column::IsArchived.eq(flag));
        }
        let convs = q.all(&self.db).await?;

        let mut participants: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for p in conversation_participant::Entity::find()
            .filter(conversation_participant::Column::ConversationId.is_in(ids))
            .all(&self.db)
            .await?
        {
            participants.entry(p.conversation_id).or_default().push(p.user_id);
        }

        let mut out = Vec::with_capacity(convs.len());
        for conv in convs {
            let last_message = message::Entity::find()
                .filter(message::Column::ConversationId.eq(conv.id))
                .order_by_desc(message::Column::CreatedAt)
                .one(&self.db)
                .await?;
            let unread_count = message::Entity::find()
                .filter(message::Column::ConversationId.eq(conv.id))
                .filter(message::Column::SenderId.ne(actor.user_id))
                .filter(message::Column::IsRead.eq(false))
                .count(&self.db)
                .await?;
            out.push(ConversationSummary {
                participant_ids: participants.remove(&conv.id).unwrap_or_default(),
                conversation: conv,
                last_message,
                unread_count,
            });
        }
        Ok(out)
    }

    /// Oldest first.
    pub async fn messages(&self, actor: &Actor, conversation_id: Uuid, page: Pagination) -> Result<Vec<message::Model>, ServiceError> {
        ensure_participant(&self.db, conversation_id, actor.user_id).await?;
        let (page_idx, per_page) = page.normalize();
        Ok(message::Entity::find()
            .filter(message::Column::ConversationId.eq(conversation_id))
            .order_by_asc(message::Column::CreatedAt)
            .paginate(&self.db, per_page)
            .fetch_page(page_idx)
            .await?)
    }

    #[instrument(skip(self, body), fields(user_id = %actor.user_id))]
    pub async fn send_message(&self, actor: &Actor, conversation_id: Uuid, body: &str) -> Result<message::Model, ServiceError> {
        post_message(&self.db, conversation_id, actor.user_id, body).await
    }

    /// Mark every message from the other participants as read; returns how many changed.
    pub async fn mark_read(&self, actor: &Actor, conversation_id: Uuid) -> Result<u64, ServiceError> {
        ensure_participant(&self.db, conversation_id, actor.user_id).await?;
        let stamp: chrono::DateTime<chrono::FixedOffset> = Utc::now().into();
        let res = message::Entity::update_many()
            .col_expr(message::Column::IsRead, Expr::value(true))
            .col_expr(message::Column::ReadAt, Expr::value(stamp))
            .filter(message::Column::ConversationId.eq(conversation_id))
            .filter(message::Column::SenderId.ne(actor.user_id))
            .filter(message::Column::IsRead.eq(false))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected)
    }

    pub async fn set_archived(&self, actor: &Actor, conversation_id: Uuid, archived: bool) -> Result<conversation::Model, ServiceError> {
        let conv = ensure_participant(&self.db, conversation_id, actor.user_id).await?;
        let mut am: conversation::ActiveModel = conv.into();
        am.is_archived = Set(archived);
        am.updated_at = Set(Utc::now().into());
        Ok(am.update(&self.db).await?)
    }
}
