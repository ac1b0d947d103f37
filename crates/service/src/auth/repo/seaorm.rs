use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, EntityTrait, TransactionTrait};
use uuid::Uuid;

use configs::LedgerSettings;

use crate::auth::domain::{AuthUser, Credentials, SessionRecord};
use crate::auth::errors::AuthError;
use crate::auth::repository::AuthRepository;
use crate::ledger;

pub struct SeaOrmAuthRepository {
    pub db: DatabaseConnection,
    /// New accounts are opened with this ledger grant.
    pub ledger: LedgerSettings,
}

fn to_auth_user(u: models::user::Model) -> AuthUser {
    AuthUser { id: u.id, email: u.email, name: u.name, is_staff: u.is_staff }
}

fn to_session(s: models::session::Model) -> SessionRecord {
    SessionRecord {
        id: s.id,
        user_id: s.user_id,
        expires_at: s.expires_at.with_timezone(&Utc),
        revoked_at: s.revoked_at.map(|t| t.with_timezone(&Utc)),
    }
}

fn repo_err(e: impl std::fmt::Display) -> AuthError {
    AuthError::Store(e.to_string())
}

#[async_trait::async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
        let res = models::user::find_by_email(&self.db, email).await.map_err(repo_err)?;
        Ok(res.map(to_auth_user))
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError> {
        let res = models::user::Entity::find_by_id(id).one(&self.db).await.map_err(repo_err)?;
        Ok(res.map(to_auth_user))
    }

    async fn create_user(&self, email: &str, name: &str, is_staff: bool) -> Result<AuthUser, AuthError> {
        let txn = self.db.begin().await.map_err(repo_err)?;
        let created = models::user::create(&txn, email, name, is_staff)
            .await
            .map_err(|e| AuthError::InvalidInput(e.to_string()))?;
        ledger::open_account(&txn, created.id, &self.ledger).await.map_err(repo_err)?;
        txn.commit().await.map_err(repo_err)?;
        Ok(to_auth_user(created))
    }

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
        use sea_orm::{ColumnTrait, QueryFilter};
        let res = models::user_credentials::Entity::find()
            .filter(models::user_credentials::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
            .map_err(repo_err)?;
        Ok(res.map(|c| Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm }))
    }

    async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError> {
        let c = models::user_credentials::upsert_password(&self.db, user_id, password_hash, &password_algorithm)
            .await
            .map_err(repo_err)?;
        Ok(Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm })
    }

    async fn create_session(&self, user_id: Uuid, expires_at: DateTime<Utc>) -> Result<SessionRecord, AuthError> {
        let s = models::session::create(&self.db, user_id, expires_at.into()).await.map_err(repo_err)?;
        Ok(to_session(s))
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<SessionRecord>, AuthError> {
        let s = models::session::Entity::find_by_id(id).one(&self.db).await.map_err(repo_err)?;
        Ok(s.map(to_session))
    }

    async fn revoke_session(&self, id: Uuid) -> Result<(), AuthError> {
        models::session::revoke(&self.db, id).await.map_err(|_| AuthError::SessionRevoked)
    }
}
