use std::sync::Arc;

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

use super::*;
use crate::test_support::{listing, member, memory_db};
use models::{message, service::ServiceType, time_transaction};

fn lifecycle(db: &DatabaseConnection) -> RequestLifecycle {
    RequestLifecycle::new(db.clone(), RequestLocks::new(), LedgerSettings::default())
}

async fn ledger_rows(db: &DatabaseConnection, request_id: Uuid) -> u64 {
    time_transaction::Entity::find()
        .filter(time_transaction::Column::ServiceRequestId.eq(request_id))
        .count(db)
        .await
        .unwrap()
}

#[tokio::test]
async fn offer_runs_to_completion_and_settles_once() -> Result<(), anyhow::Error> {
    let db = memory_db().await?;
    let owner = member(&db, "Oskar", false).await?;
    let requester = member(&db, "Rana", false).await?;
    let svc = listing(&db, owner.id, ServiceType::Offer, Some(3), 1).await?;
    let lc = lifecycle(&db);
    let (o, r) = (Actor::member(owner.id), Actor::member(requester.id));

    let req = lc.create(&r, svc.id, "Could you help on Saturday?").await?;
    assert_eq!(req.status, RequestStatus::Pending);
    let first = message::Entity::find()
        .filter(message::Column::ConversationId.eq(req.conversation_id.unwrap()))
        .all(&db)
        .await?;
    assert_eq!(first.len(), 1);

    lc.set_status(&o, req.id, RequestStatus::Accepted).await?;
    lc.approve_start(&o, req.id).await?;
    let started = lc.approve_start(&r, req.id).await?;
    assert_eq!(started.status, RequestStatus::InProgress);

    let half = lc.mark_completed(&r, req.id).await?;
    assert_eq!(half.status, RequestStatus::InProgress);
    let done = lc.mark_completed(&o, req.id).await?;
    assert_eq!(done.status, RequestStatus::Completed);
    assert!(done.settled_at.is_some());

    // Repeats after completion change nothing.
    lc.mark_completed(&o, req.id).await?;
    lc.mark_completed(&r, req.id).await?;

    let owner_acct = ledger::account_of(&db, owner.id).await?.unwrap();
    let req_acct = ledger::account_of(&db, requester.id).await?.unwrap();
    assert_eq!(owner_acct.balance, 180 + 180);
    assert_eq!(req_acct.balance, 0);
    assert_eq!(ledger_rows(&db, req.id).await, 2);

    let closed = service::Entity::find_by_id(svc.id).one(&db).await?.unwrap();
    assert_eq!(closed.status, ServiceStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn only_owner_answers_and_only_once() -> Result<(), anyhow::Error> {
    let db = memory_db().await?;
    let owner = member(&db, "Pam", false).await?;
    let requester = member(&db, "Quin", false).await?;
    let svc = listing(&db, owner.id, ServiceType::Offer, Some(1), 1).await?;
    let lc = lifecycle(&db);
    let req = lc.create(&Actor::member(requester.id), svc.id, "").await?;

    let err = lc.set_status(&Actor::member(requester.id), req.id, RequestStatus::Accepted).await.unwrap_err();
    assert!(matches!(err, ServiceError::PermissionDenied(_)));

    lc.set_status(&Actor::member(owner.id), req.id, RequestStatus::Rejected).await?;
    let err = lc.set_status(&Actor::member(owner.id), req.id, RequestStatus::Accepted).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));

    let err = lc.approve_start(&Actor::member(requester.id), req.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));
    Ok(())
}

#[tokio::test]
async fn create_guards() -> Result<(), anyhow::Error> {
    let db = memory_db().await?;
    let owner = member(&db, "Rita", false).await?;
    let requester = member(&db, "Sami", false).await?;
    let svc = listing(&db, owner.id, ServiceType::Need, Some(1), 1).await?;
    let lc = lifecycle(&db);

    assert!(matches!(
        lc.create(&Actor::member(owner.id), svc.id, "me").await,
        Err(ServiceError::Validation(_))
    ));
    lc.create(&Actor::member(requester.id), svc.id, "hi").await?;
    assert!(matches!(
        lc.create(&Actor::member(requester.id), svc.id, "again").await,
        Err(ServiceError::Conflict(_))
    ));
    assert!(matches!(
        lc.create(&Actor::member(requester.id), Uuid::new_v4(), "nothing").await,
        Err(ServiceError::NotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn accepting_beyond_capacity_fails() -> Result<(), anyhow::Error> {
    let db = memory_db().await?;
    let owner = member(&db, "Tara", false).await?;
    let a = member(&db, "Umut", false).await?;
    let b = member(&db, "Vera", false).await?;
    let svc = listing(&db, owner.id, ServiceType::Offer, Some(1), 1).await?;
    let lc = lifecycle(&db);
    let o = Actor::member(owner.id);

    let ra = lc.create(&Actor::member(a.id), svc.id, "").await?;
    let rb = lc.create(&Actor::member(b.id), svc.id, "").await?;
    lc.set_status(&o, ra.id, RequestStatus::Accepted).await?;
    let err = lc.set_status(&o, rb.id, RequestStatus::Accepted).await.unwrap_err();
    assert!(matches!(err, ServiceError::CapacityExceeded(_)));

    // Rejecting is still possible at capacity.
    lc.set_status(&o, rb.id, RequestStatus::Rejected).await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_approvals_start_exactly_once() -> Result<(), anyhow::Error> {
    let db = memory_db().await?;
    let owner = member(&db, "Wim", false).await?;
    let requester = member(&db, "Xia", false).await?;
    let svc = listing(&db, owner.id, ServiceType::Offer, Some(1), 1).await?;
    let lc = Arc::new(lifecycle(&db));
    let req = lc.create(&Actor::member(requester.id), svc.id, "").await?;
    lc.set_status(&Actor::member(owner.id), req.id, RequestStatus::Accepted).await?;

    let mut handles = Vec::new();
    for actor in [Actor::member(owner.id), Actor::member(requester.id), Actor::member(owner.id), Actor::member(requester.id)] {
        let lc = Arc::clone(&lc);
        let id = req.id;
        handles.push(tokio::spawn(async move { lc.apply_rule(&actor, id, state::approve_start).await }));
    }
    let mut outcomes = Vec::new();
    for h in handles {
        outcomes.push(h.await??.1);
    }
    let starts = outcomes.iter().filter(|o| **o == Outcome::Advanced(RequestStatus::InProgress)).count();
    assert_eq!(starts, 1, "{outcomes:?}");
    assert_eq!(outcomes.iter().filter(|o| **o == Outcome::Updated).count(), 1);
    assert_eq!(outcomes.iter().filter(|o| **o == Outcome::Unchanged).count(), 2);
    let row = service_request::Entity::find_by_id(req.id).one(&db).await?.unwrap();
    assert_eq!(row.status, RequestStatus::InProgress);

    let mut handles = Vec::new();
    for actor in [Actor::member(owner.id), Actor::member(requester.id), Actor::member(owner.id), Actor::member(requester.id)] {
        let lc = Arc::clone(&lc);
        let id = req.id;
        handles.push(tokio::spawn(async move { lc.apply_rule(&actor, id, state::mark_completed).await }));
    }
    let mut completions = 0;
    for h in handles {
        if h.await??.1 == Outcome::Advanced(RequestStatus::Completed) {
            completions += 1;
        }
    }
    assert_eq!(completions, 1);
    assert_eq!(ledger_rows(&db, req.id).await, 2);
    assert_eq!(ledger::account_of(&db, owner.id).await?.unwrap().balance, 240);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_accepts_respect_capacity() -> Result<(), anyhow::Error> {
    let db = memory_db().await?;
    let owner = member(&db, "Ilse", false).await?;
    let svc = listing(&db, owner.id, ServiceType::Offer, Some(1), 1).await?;
    let lc = Arc::new(lifecycle(&db));
    let mut ids = Vec::new();
    for name in ["Jan", "Kim", "Lou"] {
        let r = member(&db, name, false).await?;
        ids.push(lc.create(&Actor::member(r.id), svc.id, "").await?.id);
    }

    let mut handles = Vec::new();
    for id in ids {
        let lc = Arc::clone(&lc);
        let o = Actor::member(owner.id);
        handles.push(tokio::spawn(async move { lc.set_status(&o, id, RequestStatus::Accepted).await }));
    }
    let (mut accepted, mut refused) = (0, 0);
    for h in handles {
        match h.await? {
            Ok(r) => {
                assert_eq!(r.status, RequestStatus::Accepted);
                accepted += 1;
            }
            Err(ServiceError::CapacityExceeded(_)) => refused += 1,
            Err(e) => return Err(e.into()),
        }
    }
    assert_eq!((accepted, refused), (1, 2));
    let engaged = service_request::Entity::find()
        .filter(service_request::Column::ServiceId.eq(svc.id))
        .filter(service_request::Column::Status.eq(RequestStatus::Accepted))
        .count(&db)
        .await?;
    assert_eq!(engaged, 1);
    Ok(())
}

#[tokio::test]
async fn need_settles_from_owner_to_helper() -> Result<(), anyhow::Error> {
    let db = memory_db().await?;
    let owner = member(&db, "Mona", false).await?;
    let helper = member(&db, "Nils", false).await?;
    let svc = listing(&db, owner.id, ServiceType::Need, Some(2), 1).await?;
    let lc = lifecycle(&db);
    let (o, h) = (Actor::member(owner.id), Actor::member(helper.id));

    let req = lc.create(&h, svc.id, "I can help with that").await?;
    lc.set_status(&o, req.id, RequestStatus::Accepted).await?;
    lc.approve_start(&h, req.id).await?;
    lc.approve_start(&o, req.id).await?;
    lc.mark_completed(&o, req.id).await?;
    let done = lc.mark_completed(&h, req.id).await?;
    assert_eq!(done.status, RequestStatus::Completed);

    let owner_acct = ledger::account_of(&db, owner.id).await?.unwrap();
    let helper_acct = ledger::account_of(&db, helper.id).await?.unwrap();
    assert_eq!((owner_acct.balance, owner_acct.total_spent), (60, 120));
    assert_eq!((helper_acct.balance, helper_acct.total_earned), (300, 120));

    let debit = time_transaction::Entity::find()
        .filter(time_transaction::Column::ServiceRequestId.eq(req.id))
        .filter(time_transaction::Column::Kind.eq(time_transaction::TransactionKind::Debit))
        .one(&db)
        .await?
        .unwrap();
    assert_eq!((debit.account_id, debit.amount), (owner_acct.id, 120));
    Ok(())
}

#[tokio::test]
async fn failed_settlement_leaves_request_in_progress() -> Result<(), anyhow::Error> {
    let db = memory_db().await?;
    let owner = member(&db, "Yara", false).await?;
    let requester = member(&db, "Zeki", false).await?;
    // The requester of a 5 hour offer cannot pay from a 3 hour grant.
    let svc = listing(&db, owner.id, ServiceType::Offer, Some(5), 1).await?;
    let lc = lifecycle(&db);
    let (o, r) = (Actor::member(owner.id), Actor::member(requester.id));
    let req = lc.create(&r, svc.id, "").await?;
    lc.set_status(&o, req.id, RequestStatus::Accepted).await?;
    lc.approve_start(&o, req.id).await?;
    lc.approve_start(&r, req.id).await?;
    lc.mark_completed(&o, req.id).await?;

    let err = lc.mark_completed(&r, req.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientBalance(_)));
    let row = service_request::Entity::find_by_id(req.id).one(&db).await?.unwrap();
    assert_eq!(row.status, RequestStatus::InProgress);
    assert!(!row.requester_completed);
    assert_eq!(ledger_rows(&db, req.id).await, 0);

    // Agreeing on fewer hours lets it settle.
    lc.propose_hours(&o, req.id, 2.5).await?;
    lc.approve_hours(&o, req.id).await?;
    let agreed = lc.approve_hours(&r, req.id).await?;
    assert_eq!(agreed.actual_minutes, Some(150));
    let done = lc.mark_completed(&r, req.id).await?;
    assert_eq!(done.status, RequestStatus::Completed);
    assert_eq!(ledger::account_of(&db, requester.id).await?.unwrap().balance, 30);
    Ok(())
}

#[tokio::test]
async fn visibility_and_listing() -> Result<(), anyhow::Error> {
    let db = memory_db().await?;
    let owner = member(&db, "Ada", false).await?;
    let requester = member(&db, "Bo", false).await?;
    let stranger = member(&db, "Cy", false).await?;
    let staff = member(&db, "Dee", true).await?;
    let svc = listing(&db, owner.id, ServiceType::Offer, Some(1), 2).await?;
    let lc = lifecycle(&db);
    let req = lc.create(&Actor::member(requester.id), svc.id, "").await?;

    assert!(lc.get(&Actor::member(owner.id), req.id).await.is_ok());
    assert!(lc.get(&Actor::staff(staff.id), req.id).await.is_ok());
    assert!(matches!(
        lc.get(&Actor::member(stranger.id), req.id).await,
        Err(ServiceError::PermissionDenied(_))
    ));

    let mine = lc.list(&Actor::member(owner.id), RequestFilter::default()).await?;
    assert_eq!(mine.len(), 1);
    let as_requester = lc
        .list(&Actor::member(owner.id), RequestFilter { status: None, role: Some(RequestRole::Requester) })
        .await?;
    assert!(as_requester.is_empty());
    let pending = lc
        .list(&Actor::member(requester.id), RequestFilter { status: Some(RequestStatus::Pending), role: None })
        .await?;
    assert_eq!(pending.len(), 1);
    assert!(lc.list(&Actor::member(stranger.id), RequestFilter::default()).await?.is_empty());
    Ok(())
}
