//! Time-credit ledger.
//!
//! Balances move only through [`settle`] (run inside the transaction that
//! completes a service request) and through the registration grant. Amounts
//! are whole minutes.

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use common::pagination::Pagination;
use configs::LedgerSettings;
use models::{
    service::{self, ServiceType},
    service_request,
    time_account,
    time_transaction::{self, TransactionKind},
};

use crate::errors::ServiceError;

/// Who pays and who earns for one settled request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub payer: Uuid,
    pub payee: Uuid,
    pub minutes: i64,
}

/// Offers debit the requester (who received the help); needs debit the owner.
pub fn direction(service_type: ServiceType, owner: Uuid, requester: Uuid) -> (Uuid, Uuid) {
    match service_type {
        ServiceType::Offer => (requester, owner),
        ServiceType::Need => (owner, requester),
    }
}

/// Agreed actual minutes win over the estimate; nothing positive is an error.
pub fn settlement_minutes(actual_minutes: Option<i64>, estimated_hours: Option<i32>) -> Result<i64, ServiceError> {
    let minutes = actual_minutes.or_else(|| estimated_hours.map(|h| i64::from(h) * 60)).unwrap_or(0);
    if minutes <= 0 {
        return Err(ServiceError::Validation("no positive hours to settle".into()));
    }
    Ok(minutes)
}

pub async fn account_of<C: ConnectionTrait>(db: &C, user_id: Uuid) -> Result<Option<time_account::Model>, ServiceError> {
    Ok(time_account::Entity::find()
        .filter(time_account::Column::UserId.eq(user_id))
        .one(db)
        .await?)
}

/// Open the user's account with the configured grant. Returns the existing
/// account when there already is one.
pub async fn open_account<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    settings: &LedgerSettings,
) -> Result<time_account::Model, ServiceError> {
    if let Some(existing) = account_of(db, user_id).await? {
        return Ok(existing);
    }
    let now = Utc::now();
    let grant = settings.initial_balance_minutes;
    let account = time_account::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        balance: Set(grant),
        total_earned: Set(0),
        total_spent: Set(0),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await?;
    if grant > 0 {
        time_transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(account.id),
            kind: Set(TransactionKind::Grant),
            amount: Set(grant),
            description: Set("Welcome grant".into()),
            service_id: Set(None),
            service_request_id: Set(None),
            processed_by: Set(None),
            created_at: Set(now.into()),
        }
        .insert(db)
        .await?;
    }
    info!(event = "account_opened", %user_id, grant);
    Ok(account)
}

async fn insert_entry<C: ConnectionTrait>(
    db: &C,
    account_id: Uuid,
    kind: TransactionKind,
    minutes: i64,
    description: String,
    request: &service_request::Model,
    processed_by: Uuid,
) -> Result<(), ServiceError> {
    time_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        account_id: Set(account_id),
        kind: Set(kind),
        amount: Set(minutes),
        description: Set(description),
        service_id: Set(Some(request.service_id)),
        service_request_id: Set(Some(request.id)),
        processed_by: Set(Some(processed_by)),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;
    Ok(())
}

/// Move time credit for a completed request.
///
/// Must run on the transaction that marks the request completed. The payer
/// update is conditional on the balance so concurrent settlements touching the
/// same account cannot overdraw it.
#[instrument(skip_all, fields(request_id = %request.id))]
pub async fn settle<C: ConnectionTrait>(
    db: &C,
    request: &service_request::Model,
    svc: &service::Model,
    processed_by: Uuid,
    settings: &LedgerSettings,
) -> Result<Settlement, ServiceError> {
    let minutes = settlement_minutes(request.actual_minutes, svc.estimated_hours)?;
    let (payer, payee) = direction(svc.service_type, svc.owner_id, request.requester_id);

    let already = time_transaction::Entity::find()
        .filter(time_transaction::Column::ServiceRequestId.eq(request.id))
        .count(db)
        .await?;
    if already > 0 {
        return Err(ServiceError::Conflict("request already settled".into()));
    }

    let payer_account = open_account(db, payer, settings).await?;
    let payee_account = open_account(db, payee, settings).await?;
    let stamp: DateTime<FixedOffset> = Utc::now().into();

    let mut debit = time_account::Entity::update_many()
        .col_expr(time_account::Column::Balance, Expr::col(time_account::Column::Balance).sub(minutes))
        .col_expr(time_account::Column::TotalSpent, Expr::col(time_account::Column::TotalSpent).add(minutes))
        .col_expr(time_account::Column::UpdatedAt, Expr::value(stamp))
        .filter(time_account::Column::Id.eq(payer_account.id));
    if !settings.allow_negative_balance {
        debit = debit.filter(time_account::Column::Balance.gte(minutes));
    }
    if debit.exec(db).await?.rows_affected != 1 {
        return Err(ServiceError::InsufficientBalance(format!(
            "balance below {} minutes required for settlement",
            minutes
        )));
    }

    time_account::Entity::update_many()
        .col_expr(time_account::Column::Balance, Expr::col(time_account::Column::Balance).add(minutes))
        .col_expr(time_account::Column::TotalEarned, Expr::col(time_account::Column::TotalEarned).add(minutes))
        .col_expr(time_account::Column::UpdatedAt, Expr::value(stamp))
        .filter(time_account::Column::Id.eq(payee_account.id))
        .exec(db)
        .await?;

    let label = format!("{} ({})", svc.title, match svc.service_type {
        ServiceType::Offer => "offer",
        ServiceType::Need => "need",
    });
    insert_entry(db, payer_account.id, TransactionKind::Debit, minutes, format!("Paid for {label}"), request, processed_by).await?;
    insert_entry(db, payee_account.id, TransactionKind::Credit, minutes, format!("Earned for {label}"), request, processed_by).await?;

    common::metrics::record_settlement(minutes);
    info!(event = "request_settled", %payer, %payee, minutes);
    Ok(Settlement { payer, payee, minutes })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    pub kind: Option<TransactionKind>,
}

/// Read side of the ledger for one user.
#[derive(Clone)]
pub struct TimeLedger {
    db: DatabaseConnection,
    settings: LedgerSettings,
}

impl TimeLedger {
    pub fn new(db: DatabaseConnection, settings: LedgerSettings) -> Self { Self { db, settings } }

    pub fn settings(&self) -> &LedgerSettings { &self.settings }

    pub async fn open_account(&self, user_id: Uuid) -> Result<time_account::Model, ServiceError> {
        open_account(&self.db, user_id, &self.settings).await
    }

    /// The user's account, opened on first access.
    pub async fn account(&self, user_id: Uuid) -> Result<time_account::Model, ServiceError> {
        self.open_account(user_id).await
    }

    /// Newest first.
    pub async fn transactions(
        &self,
        user_id: Uuid,
        filter: TransactionFilter,
        page: Pagination,
    ) -> Result<Vec<time_transaction::Model>, ServiceError> {
        let account = self.account(user_id).await?;
        let (page_idx, per_page) = page.normalize();
        let mut q = time_transaction::Entity::find()
            .filter(time_transaction::Column::AccountId.eq(account.id))
            .order_by_desc(time_transaction::Column::CreatedAt);
        if let Some(kind) = filter.kind {
            q = q.filter(time_transaction::Column::Kind.eq(kind));
        }
        Ok(q.paginate(&self.db, per_page).fetch_page(page_idx).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{listing, member, memory_db};
    use sea_orm::TransactionTrait;

    fn completed_request(svc: &service::Model, requester: Uuid, actual_minutes: Option<i64>) -> service_request::Model {
        let now = Utc::now().into();
        service_request::Model {
            id: Uuid::new_v4(),
            requester_id: requester,
            service_id: svc.id,
            conversation_id: None,
            message: String::new(),
            status: service_request::RequestStatus::Completed,
            owner_approved: true,
            requester_approved: true,
            owner_completed: true,
            requester_completed: true,
            proposed_minutes: None,
            hours_owner_approved: false,
            hours_requester_approved: false,
            actual_minutes,
            responded_at: None,
            settled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn persist(db: &DatabaseConnection, r: &service_request::Model) -> Result<(), anyhow::Error> {
        let am: service_request::ActiveModel = r.clone().into();
        am.reset_all().insert(db).await?;
        Ok(())
    }

    #[test]
    fn direction_follows_who_received_help() {
        let (o, r) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(direction(ServiceType::Offer, o, r), (r, o));
        assert_eq!(direction(ServiceType::Need, o, r), (o, r));
    }

    #[test]
    fn actual_minutes_override_estimate() {
        assert_eq!(settlement_minutes(Some(90), Some(3)).unwrap(), 90);
        assert_eq!(settlement_minutes(None, Some(3)).unwrap(), 180);
        assert!(matches!(settlement_minutes(None, None), Err(ServiceError::Validation(_))));
        assert!(matches!(settlement_minutes(None, Some(0)), Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn settle_offer_moves_credit_from_requester_to_owner() -> Result<(), anyhow::Error> {
        let db = memory_db().await?;
        let owner = member(&db, "Olga", false).await?;
        let requester = member(&db, "Ravi", false).await?;
        let svc = listing(&db, owner.id, ServiceType::Offer, Some(2), 1).await?;
        let req = completed_request(&svc, requester.id, None);
        persist(&db, &req).await?;

        let s = settle(&db, &req, &svc, owner.id, &LedgerSettings::default()).await?;
        assert_eq!(s, Settlement { payer: requester.id, payee: owner.id, minutes: 120 });

        let o = account_of(&db, owner.id).await?.unwrap();
        let r = account_of(&db, requester.id).await?.unwrap();
        assert_eq!((o.balance, o.total_earned, o.total_spent), (300, 120, 0));
        assert_eq!((r.balance, r.total_earned, r.total_spent), (60, 0, 120));

        // A second settlement for the same request is refused.
        assert!(matches!(
            settle(&db, &req, &svc, owner.id, &LedgerSettings::default()).await,
            Err(ServiceError::Conflict(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn insufficient_balance_rolls_back() -> Result<(), anyhow::Error> {
        let db = memory_db().await?;
        let owner = member(&db, "Nadia", false).await?;
        let requester = member(&db, "Omar", false).await?;
        // A need: the owner pays, 4h > 3h grant.
        let svc = listing(&db, owner.id, ServiceType::Need, Some(4), 1).await?;
        let req = completed_request(&svc, requester.id, None);
        persist(&db, &req).await?;

        let txn = db.begin().await?;
        let err = settle(&txn, &req, &svc, owner.id, &LedgerSettings::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientBalance(_)));
        txn.rollback().await?;

        let o = account_of(&db, owner.id).await?.unwrap();
        assert_eq!(o.balance, 180);
        let rows = time_transaction::Entity::find()
            .filter(time_transaction::Column::ServiceRequestId.eq(req.id))
            .count(&db)
            .await?;
        assert_eq!(rows, 0);

        let lenient = LedgerSettings { allow_negative_balance: true, ..LedgerSettings::default() };
        settle(&db, &req, &svc, owner.id, &lenient).await?;
        assert_eq!(account_of(&db, owner.id).await?.unwrap().balance, -60);
        Ok(())
    }

    #[tokio::test]
    async fn transactions_are_listed_per_account_and_kind() -> Result<(), anyhow::Error> {
        let db = memory_db().await?;
        let ledger = TimeLedger::new(db.clone(), LedgerSettings::default());
        let u = member(&db, "Pia", false).await?;

        let all = ledger.transactions(u.id, TransactionFilter::default(), Pagination::default()).await?;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].kind, TransactionKind::Grant);
        assert_eq!(all[0].amount, 180);

        let debits = ledger
            .transactions(u.id, TransactionFilter { kind: Some(TransactionKind::Debit) }, Pagination::default())
            .await?;
        assert!(debits.is_empty());

        // Opening twice keeps the single account and grant.
        ledger.open_account(u.id).await?;
        let again = ledger.transactions(u.id, TransactionFilter::default(), Pagination::default()).await?;
        assert_eq!(again.len(), 1);
        Ok(())
    }
}
