//! Service-request lifecycle.
//!
//! Every mutation of one request runs under its in-process lock and inside a
//! single database transaction that re-reads the row (`FOR UPDATE` on
//! Postgres). Completion settles the ledger in that same transaction.

pub mod state;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use configs::LedgerSettings;
use models::{
    service::{self, ServiceStatus},
    service_request::{self, RequestStatus},
};

use crate::{actor::Actor, errors::ServiceError, ledger, locks::RequestLocks, messaging};
use state::{Outcome, Party, RequestState, Step};

const OPEN_STATUSES: [RequestStatus; 3] = [RequestStatus::Pending, RequestStatus::Accepted, RequestStatus::InProgress];

/// Which side of the exchange to list requests for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestRole {
    Requester,
    Owner,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub role: Option<RequestRole>,
}

async fn load_request<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<service_request::Model, ServiceError> {
    let mut q = service_request::Entity::find_by_id(id);
    if db.get_database_backend() == DbBackend::Postgres {
        q = q.lock_exclusive();
    }
    q.one(db).await?.ok_or_else(|| ServiceError::not_found("service request"))
}

async fn load_service<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<service::Model, ServiceError> {
    service::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("service"))
}

/// Like `load_service`, holding the row until commit on Postgres.
async fn lock_service<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<service::Model, ServiceError> {
    let mut q = service::Entity::find_by_id(id);
    if db.get_database_backend() == DbBackend::Postgres {
        q = q.lock_exclusive();
    }
    q.one(db).await?.ok_or_else(|| ServiceError::not_found("service"))
}

fn party_of(actor: &Actor, req: &service_request::Model, svc: &service::Model) -> Result<Party, ServiceError> {
    if actor.user_id == svc.owner_id {
        Ok(Party::Owner)
    } else if actor.user_id == req.requester_id {
        Ok(Party::Requester)
    } else {
        Err(ServiceError::PermissionDenied("only the owner or the requester may act on this request".into()))
    }
}

fn apply_state(am: &mut service_request::ActiveModel, st: &RequestState) {
    am.status = Set(st.status);
    am.owner_approved = Set(st.owner_approved);
    am.requester_approved = Set(st.requester_approved);
    am.owner_completed = Set(st.owner_completed);
    am.requester_completed = Set(st.requester_completed);
    am.proposed_minutes = Set(st.proposed_minutes);
    am.hours_owner_approved = Set(st.hours_owner_approved);
    am.hours_requester_approved = Set(st.hours_requester_approved);
    am.actual_minutes = Set(st.actual_minutes);
    am.updated_at = Set(Utc::now().into());
}

/// Mark the service completed when none of its requests is still open.
async fn close_service_if_done<C: ConnectionTrait>(db: &C, svc: &service::Model) -> Result<(), ServiceError> {
    let open = service_request::Entity::find()
        .filter(service_request::Column::ServiceId.eq(svc.id))
        .filter(service_request::Column::Status.is_in(OPEN_STATUSES))
        .count(db)
        .await?;
    if open == 0 && svc.status != ServiceStatus::Completed {
        let mut am: service::ActiveModel = svc.clone().into();
        am.status = Set(ServiceStatus::Completed);
        am.updated_at = Set(Utc::now().into());
        am.update(db).await?;
        info!(event = "service_completed", service_id = %svc.id);
    }
    Ok(())
}

#[derive(Clone)]
pub struct RequestLifecycle {
    db: DatabaseConnection,
    locks: RequestLocks,
    ledger: LedgerSettings,
}

impl RequestLifecycle {
    pub fn new(db: DatabaseConnection, locks: RequestLocks, ledger: LedgerSettings) -> Self {
        Self { db, locks, ledger }
    }

    /// Open a request on an active service and post `message` to the
    /// requester/owner conversation.
    #[instrument(skip(self, message), fields(user_id = %actor.user_id))]
    pub async fn create(&self, actor: &Actor, service_id: Uuid, message: &str) -> Result<service_request::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let svc = load_service(&txn, service_id).await?;
        if svc.is_deleted() {
            return Err(ServiceError::not_found("service"));
        }
        if svc.status != ServiceStatus::Active {
            return Err(ServiceError::Validation("service is not accepting requests".into()));
        }
        if svc.owner_id == actor.user_id {
            return Err(ServiceError::Validation("cannot request your own service".into()));
        }
        let existing = service_request::Entity::find()
            .filter(service_request::Column::RequesterId.eq(actor.user_id))
            .filter(service_request::Column::ServiceId.eq(service_id))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict("a request for this service already exists".into()));
        }

        let conv = messaging::direct_conversation(&txn, actor.user_id, svc.owner_id, &svc.title, Some(svc.id)).await?;
        if !message.trim().is_empty() {
            messaging::post_message(&txn, conv.id, actor.user_id, message).await?;
        }

        let now = Utc::now();
        let created = service_request::ActiveModel {
            id: Set(Uuid::new_v4()),
            requester_id: Set(actor.user_id),
            service_id: Set(service_id),
            conversation_id: Set(Some(conv.id)),
            message: Set(message.trim().to_string()),
            status: Set(RequestStatus::Pending),
            owner_approved: Set(false),
            requester_approved: Set(false),
            owner_completed: Set(false),
            requester_completed: Set(false),
            proposed_minutes: Set(None),
            hours_owner_approved: Set(false),
            hours_requester_approved: Set(false),
            actual_minutes: Set(None),
            responded_at: Set(None),
            settled_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        common::metrics::record_transition(RequestStatus::Pending.as_str());
        info!(event = "request_created", request_id = %created.id, %service_id);
        Ok(created)
    }

    /// Owner accepts or rejects a pending request.
    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn set_status(&self, actor: &Actor, id: Uuid, target: RequestStatus) -> Result<service_request::Model, ServiceError> {
        let _guard = self.locks.acquire(id).await;
        // Capacity is shared by every request on the service, so accepts on
        // one service run one at a time. Request locks are always taken first.
        let _service_guard = if target == RequestStatus::Accepted {
            let service_id = service_request::Entity::find_by_id(id)
                .one(&self.db)
                .await?
                .map(|r| r.service_id)
                .ok_or_else(|| ServiceError::not_found("service request"))?;
            Some(self.locks.acquire(service_id).await)
        } else {
            None
        };
        let txn = self.db.begin().await?;
        let req = load_request(&txn, id).await?;
        let svc = if target == RequestStatus::Accepted {
            lock_service(&txn, req.service_id).await?
        } else {
            load_service(&txn, req.service_id).await?
        };
        if actor.user_id != svc.owner_id {
            return Err(ServiceError::PermissionDenied("only the service owner may answer a request".into()));
        }
        let step = state::set_status(RequestState::from(&req), target)?;

        if target == RequestStatus::Accepted {
            let engaged = service_request::Entity::find()
                .filter(service_request::Column::ServiceId.eq(svc.id))
                .filter(service_request::Column::Status.is_in([RequestStatus::Accepted, RequestStatus::InProgress]))
                .count(&txn)
                .await?;
            if engaged >= svc.capacity.max(1) as u64 {
                return Err(ServiceError::CapacityExceeded(format!(
                    "service already has {} of {} places taken",
                    engaged, svc.capacity
                )));
            }
        }

        let mut am: service_request::ActiveModel = req.into();
        apply_state(&mut am, &step.state);
        am.responded_at = Set(Some(Utc::now().into()));
        let updated = am.update(&txn).await?;
        txn.commit().await?;

        common::metrics::record_transition(target.as_str());
        info!(event = "request_answered", request_id = %id, status = target.as_str());
        Ok(updated)
    }

    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn approve_start(&self, actor: &Actor, id: Uuid) -> Result<service_request::Model, ServiceError> {
        self.transition(actor, id, state::approve_start).await
    }

    /// Record the actor's completion; the second one completes and settles.
    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn mark_completed(&self, actor: &Actor, id: Uuid) -> Result<service_request::Model, ServiceError> {
        self.transition(actor, id, state::mark_completed).await
    }

    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn propose_hours(&self, actor: &Actor, id: Uuid, hours: f64) -> Result<service_request::Model, ServiceError> {
        let minutes = state::hours_to_minutes(hours)?;
        self.transition(actor, id, move |st, _| state::propose_hours(st, minutes)).await
    }

    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn approve_hours(&self, actor: &Actor, id: Uuid) -> Result<service_request::Model, ServiceError> {
        self.transition(actor, id, state::approve_hours).await
    }

    async fn transition<F>(&self, actor: &Actor, id: Uuid, rule: F) -> Result<service_request::Model, ServiceError>
    where
        F: FnOnce(RequestState, Party) -> Result<Step, ServiceError>,
    {
        self.apply_rule(actor, id, rule).await.map(|(req, _)| req)
    }

    /// Run `rule` against the locked row and persist its step, reporting what
    /// the call itself changed.
    async fn apply_rule<F>(&self, actor: &Actor, id: Uuid, rule: F) -> Result<(service_request::Model, Outcome), ServiceError>
    where
        F: FnOnce(RequestState, Party) -> Result<Step, ServiceError>,
    {
        let _guard = self.locks.acquire(id).await;
        let txn = self.db.begin().await?;
        let req = load_request(&txn, id).await?;
        let svc = load_service(&txn, req.service_id).await?;
        let party = party_of(actor, &req, &svc)?;
        let step = rule(RequestState::from(&req), party)?;

        if step.outcome == Outcome::Unchanged {
            txn.commit().await?;
            return Ok((req, Outcome::Unchanged));
        }

        let mut am: service_request::ActiveModel = req.into();
        apply_state(&mut am, &step.state);
        let completing = step.outcome == Outcome::Advanced(RequestStatus::Completed);
        if completing {
            am.settled_at = Set(Some(Utc::now().into()));
        }
        let updated = am.update(&txn).await?;

        if completing {
            ledger::settle(&txn, &updated, &svc, actor.user_id, &self.ledger).await?;
            close_service_if_done(&txn, &svc).await?;
        }
        txn.commit().await?;

        if let Outcome::Advanced(status) = step.outcome {
            common::metrics::record_transition(status.as_str());
            info!(event = "request_transition", request_id = %id, status = status.as_str());
        }
        Ok((updated, step.outcome))
    }

    /// Parties and staff only.
    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<service_request::Model, ServiceError> {
        let req = service_request::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("service request"))?;
        if !actor.is_staff {
            let svc = load_service(&self.db, req.service_id).await?;
            party_of(actor, &req, &svc)?;
        }
        Ok(req)
    }

    /// The actor's requests, as requester and as owner unless a role is given.
    pub async fn list(&self, actor: &Actor, filter: RequestFilter) -> Result<Vec<service_request::Model>, ServiceError> {
        let owned: Vec<Uuid> = service::Entity::find()
            .select_only()
            .column(service::Column::Id)
            .filter(service::Column::OwnerId.eq(actor.user_id))
            .into_tuple()
            .all(&self.db)
            .await?;
        let as_requester = service_request::Column::RequesterId.eq(actor.user_id);
        let as_owner = service_request::Column::ServiceId.is_in(owned);
        let cond = match filter.role {
            Some(RequestRole::Requester) => Condition::all().add(as_requester),
            Some(RequestRole::Owner) => Condition::all().add(as_owner),
            None => Condition::any().add(as_requester).add(as_owner),
        };
        let mut q = service_request::Entity::find()
            .filter(cond)
            .order_by_desc(service_request::Column::CreatedAt);
        if let Some(status) = filter.status {
            q = q.filter(service_request::Column::Status.eq(status));
        }
        Ok(q.all(&self.db).await?)
    }
}

#[cfg(test)]
mod tests;
