use sea_orm::{ConnectionTrait, EntityTrait};
use uuid::Uuid;

use models::user;
use crate::errors::ServiceError;

/// Get a user by id.
pub async fn get_user<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<user::Model, ServiceError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("user"))
}

/// Load the acting user and refuse banned or currently suspended accounts.
pub async fn ensure_unrestricted<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<user::Model, ServiceError> {
    let u = get_user(db, id).await?;
    if u.is_restricted() {
        return Err(ServiceError::PermissionDenied(format!("account is {:?}", u.status).to_lowercase()));
    }
    Ok(u)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{ActiveModelTrait, Set};
    use crate::test_support::{memory_db, member};

    #[tokio::test]
    async fn suspended_user_is_restricted_until_expiry() -> Result<(), anyhow::Error> {
        let db = memory_db().await?;
        let u = member(&db, "Gina", false).await?;
        assert!(ensure_unrestricted(&db, u.id).await.is_ok());

        let mut am: user::ActiveModel = u.clone().into();
        am.status = Set(user::UserStatus::Suspended);
        am.suspended_until = Set(Some((Utc::now() + chrono::Duration::days(1)).into()));
        am.update(&db).await?;
        let err = ensure_unrestricted(&db, u.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));

        let mut am: user::ActiveModel = get_user(&db, u.id).await?.into();
        am.suspended_until = Set(Some((Utc::now() - chrono::Duration::minutes(1)).into()));
        am.update(&db).await?;
        assert!(ensure_unrestricted(&db, u.id).await.is_ok());

        assert!(matches!(get_user(&db, Uuid::new_v4()).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }
}
