//! Staff dashboard figures.

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    sea_query::{Alias, Expr, Func, SimpleExpr},
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect,
};
use serde::Serialize;

use models::{
    report::{self, ReportStatus},
    service::{self, ServiceStatus},
    service_request::{self, RequestStatus},
    time_transaction::{self, TransactionKind},
    user::{self, UserStatus},
};

use crate::{actor::Actor, errors::ServiceError};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PlatformStats {
    pub users: u64,
    pub restricted_users: u64,
    pub active_services: u64,
    pub open_reports: u64,
    pub completed_requests: u64,
    /// Sum of settlement credits, in minutes.
    pub minutes_exchanged: i64,
}

#[derive(Clone)]
pub struct AdminStats {
    db: DatabaseConnection,
}

impl AdminStats {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }

    pub async fn stats(&self, actor: &Actor) -> Result<PlatformStats, ServiceError> {
        if !actor.is_staff {
            return Err(ServiceError::PermissionDenied("statistics are staff only".into()));
        }
        let now: DateTime<FixedOffset> = Utc::now().into();
        let users = user::Entity::find().count(&self.db).await?;
        let restricted_users = user::Entity::find()
            .filter(
                Condition::any().add(user::Column::Status.eq(UserStatus::Banned)).add(
                    Condition::all()
                        .add(user::Column::Status.eq(UserStatus::Suspended))
                        .add(user::Column::SuspendedUntil.gt(now)),
                ),
            )
            .count(&self.db)
            .await?;
        let active_services = service::Entity::find()
            .filter(service::Column::DeletedAt.is_null())
            .filter(service::Column::Status.eq(ServiceStatus::Active))
            .count(&self.db)
            .await?;
        let open_reports = report::Entity::find()
            .filter(report::Column::Status.is_in([ReportStatus::Pending, ReportStatus::UnderReview]))
            .count(&self.db)
            .await?;
        let completed_requests = service_request::Entity::find()
            .filter(service_request::Column::Status.eq(RequestStatus::Completed))
            .count(&self.db)
            .await?;

        // SUM(bigint) is numeric on Postgres; cast back so both backends decode as i64.
        let total: SimpleExpr =
            Func::cast_as(Func::sum(Expr::col(time_transaction::Column::Amount)), Alias::new("BIGINT")).into();
        let minutes_exchanged: Option<i64> = time_transaction::Entity::find()
            .select_only()
            .column_as(total, "total")
            .filter(time_transaction::Column::Kind.eq(TransactionKind::Credit))
            .into_tuple::<Option<i64>>()
            .one(&self.db)
            .await?
            .flatten();

        Ok(PlatformStats {
            users,
            restricted_users,
            active_services,
            open_reports,
            completed_requests,
            minutes_exchanged: minutes_exchanged.unwrap_or(0),
        })
    }
}
