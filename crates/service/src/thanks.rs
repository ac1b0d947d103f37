//! Thank-you notes between members, optionally about a service.
//!
//! Only the sender and the recipient ever see a note. The recipient moves it
//! from `sent` to `read` or `archived`; either side may delete it.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use common::pagination::Pagination;
use models::{
    service,
    thank_you_note::{self, NoteStatus},
};

use crate::{actor::Actor, errors::ServiceError, users};

const MAX_MESSAGE: usize = 2000;

#[derive(Debug, Clone, Deserialize)]
pub struct NewNote {
    pub to_user_id: Uuid,
    pub message: String,
    pub service_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteFilter {
    /// `true` for notes addressed to the caller, `false` for ones they sent.
    pub received: Option<bool>,
    pub status: Option<NoteStatus>,
}

#[derive(Clone)]
pub struct ThankYouNotes {
    db: DatabaseConnection,
}

impl ThankYouNotes {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }

    #[instrument(skip(self, input), fields(user_id = %actor.user_id))]
    pub async fn send(&self, actor: &Actor, input: NewNote) -> Result<thank_you_note::Model, ServiceError> {
        let message = input.message.trim();
        if message.is_empty() {
            return Err(ServiceError::Validation("message required".into()));
        }
        if message.chars().count() > MAX_MESSAGE {
            return Err(ServiceError::Validation(format!("message is limited to {} characters", MAX_MESSAGE)));
        }
        if input.to_user_id == actor.user_id {
            return Err(ServiceError::Validation("you cannot thank yourself".into()));
        }

        let txn = self.db.begin().await?;
        users::ensure_unrestricted(&txn, actor.user_id).await?;
        users::get_user(&txn, input.to_user_id).await?;
        if let Some(sid) = input.service_id {
            service::Entity::find_by_id(sid)
                .one(&txn)
                .await?
                .filter(|s| !s.is_deleted())
                .ok_or_else(|| ServiceError::not_found("service"))?;
        }
        let now = Utc::now();
        let note = thank_you_note::ActiveModel {
            id: Set(Uuid::new_v4()),
            from_user_id: Set(actor.user_id),
            to_user_id: Set(input.to_user_id),
            message: Set(message.to_string()),
            status: Set(NoteStatus::Sent),
            service_id: Set(input.service_id),
            read_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        info!(event = "thank_you_sent", note_id = %note.id, to = %note.to_user_id);
        Ok(note)
    }

    /// Notes the caller sent or received, newest first.
    pub async fn list(&self, actor: &Actor, filter: NoteFilter, page: Pagination) -> Result<Vec<thank_you_note::Model>, ServiceError> {
        let mut q = thank_you_note::Entity::find().order_by_desc(thank_you_note::Column::CreatedAt);
        q = match filter.received {
            Some(true) => q.filter(thank_you_note::Column::ToUserId.eq(actor.user_id)),
            Some(false) => q.filter(thank_you_note::Column::FromUserId.eq(actor.user_id)),
            None => q.filter(
                Condition::any()
                    .add(thank_you_note::Column::ToUserId.eq(actor.user_id))
                    .add(thank_you_note::Column::FromUserId.eq(actor.user_id)),
            ),
        };
        if let Some(s) = filter.status { q = q.filter(thank_you_note::Column::Status.eq(s)); }
        let (page_idx, per_page) = page.normalize();
        Ok(q.paginate(&self.db, per_page).fetch_page(page_idx).await?)
    }

    async fn visible(&self, actor: &Actor, id: Uuid) -> Result<thank_you_note::Model, ServiceError> {
        thank_you_note::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .filter(|n| n.from_user_id == actor.user_id || n.to_user_id == actor.user_id)
            .ok_or_else(|| ServiceError::not_found("thank-you note"))
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<thank_you_note::Model, ServiceError> {
        self.visible(actor, id).await
    }

    pub async fn mark_read(&self, actor: &Actor, id: Uuid) -> Result<thank_you_note::Model, ServiceError> {
        self.recipient_sets(actor, id, NoteStatus::Read).await
    }

    pub async fn archive(&self, actor: &Actor, id: Uuid) -> Result<thank_you_note::Model, ServiceError> {
        self.recipient_sets(actor, id, NoteStatus::Archived).await
    }

    /// Recipient-only status change. `read_at` is stamped once.
    async fn recipient_sets(&self, actor: &Actor, id: Uuid, status: NoteStatus) -> Result<thank_you_note::Model, ServiceError> {
        let note = self.visible(actor, id).await?;
        if note.to_user_id != actor.user_id {
            return Err(ServiceError::PermissionDenied("only the recipient can do that".into()));
        }
        if note.status == status || (note.status == NoteStatus::Archived && status == NoteStatus::Read) {
            return Ok(note);
        }
        let now = Utc::now();
        let first_read = note.read_at.is_none();
        let mut am: thank_you_note::ActiveModel = note.into();
        am.status = Set(status);
        if first_read {
            am.read_at = Set(Some(now.into()));
        }
        am.updated_at = Set(now.into());
        Ok(am.update(&self.db).await?)
    }

    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<(), ServiceError> {
        let note = self.visible(actor, id).await?;
        note.delete(&self.db).await?;
        info!(event = "thank_you_deleted", note_id = %id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{listing, member, memory_db};
    use models::{service::ServiceType, user};

    fn note(to: Uuid, service_id: Option<Uuid>) -> NewNote {
        NewNote { to_user_id: to, message: "Thanks for fixing my bike!".into(), service_id }
    }

    #[tokio::test]
    async fn notes_are_private_to_sender_and_recipient() -> Result<(), anyhow::Error> {
        let db = memory_db().await?;
        let alice = member(&db, "Ana", false).await?;
        let bob = member(&db, "Ben", false).await?;
        let carol = member(&db, "Cem", false).await?;
        let svc = listing(&db, bob.id, ServiceType::Offer, Some(1), 1).await?;
        let notes = ThankYouNotes::new(db.clone());
        let (a, b, c) = (Actor::member(alice.id), Actor::member(bob.id), Actor::member(carol.id));

        let sent = notes.send(&a, note(bob.id, Some(svc.id))).await?;
        assert_eq!(sent.status, NoteStatus::Sent);
        notes.send(&c, note(bob.id, None)).await?;

        assert_eq!(notes.list(&b, NoteFilter { received: Some(true), status: None }, Pagination::default()).await?.len(), 2);
        assert_eq!(notes.list(&a, NoteFilter { received: Some(false), status: None }, Pagination::default()).await?.len(), 1);
        assert!(notes.list(&a, NoteFilter { received: Some(true), status: None }, Pagination::default()).await?.is_empty());
        assert!(matches!(notes.get(&c, sent.id).await, Err(ServiceError::NotFound(_))));

        assert!(matches!(notes.mark_read(&a, sent.id).await, Err(ServiceError::PermissionDenied(_))));
        assert_eq!(notes.mark_read(&b, sent.id).await?.status, NoteStatus::Read);
        let stamp = notes.get(&b, sent.id).await?.read_at;
        assert!(stamp.is_some());
        assert_eq!(notes.archive(&b, sent.id).await?.status, NoteStatus::Archived);
        assert_eq!(notes.get(&a, sent.id).await?.read_at, stamp);
        assert_eq!(notes.mark_read(&b, sent.id).await?.status, NoteStatus::Archived);

        let unread = NoteFilter { received: Some(true), status: Some(NoteStatus::Sent) };
        assert_eq!(notes.list(&b, unread, Pagination::default()).await?.len(), 1);

        assert!(matches!(notes.delete(&c, sent.id).await, Err(ServiceError::NotFound(_))));
        notes.delete(&b, sent.id).await?;
        assert!(notes.list(&a, NoteFilter::default(), Pagination::default()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn sending_is_validated() -> Result<(), anyhow::Error> {
        let db = memory_db().await?;
        let alice = member(&db, "Dua", false).await?;
        let bob = member(&db, "Eli", false).await?;
        let notes = ThankYouNotes::new(db.clone());
        let a = Actor::member(alice.id);

        assert!(matches!(notes.send(&a, note(alice.id, None)).await, Err(ServiceError::Validation(_))));
        let blank = NewNote { message: "  ".into(), ..note(bob.id, None) };
        assert!(matches!(notes.send(&a, blank).await, Err(ServiceError::Validation(_))));
        assert!(matches!(notes.send(&a, note(Uuid::new_v4(), None)).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(notes.send(&a, note(bob.id, Some(Uuid::new_v4()))).await, Err(ServiceError::NotFound(_))));

        let mut am: user::ActiveModel = alice.into();
        am.status = Set(user::UserStatus::Banned);
        am.update(&db).await?;
        assert!(matches!(notes.send(&a, note(bob.id, None)).await, Err(ServiceError::PermissionDenied(_))));
        Ok(())
    }
}
