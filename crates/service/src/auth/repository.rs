use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::domain::{AuthUser, Credentials, SessionRecord};
use super::errors::AuthError;

/// Repository abstraction for auth-related persistence.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError>;
    /// Create the user together with whatever per-user state registration implies.
    async fn create_user(&self, email: &str, name: &str, is_staff: bool) -> Result<AuthUser, AuthError>;

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError>;
    async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError>;

    async fn create_session(&self, user_id: Uuid, expires_at: DateTime<Utc>) -> Result<SessionRecord, AuthError>;
    async fn find_session(&self, id: Uuid) -> Result<Option<SessionRecord>, AuthError>;
    async fn revoke_session(&self, id: Uuid) -> Result<(), AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn poisoned<T>(_: T) -> AuthError {
        AuthError::Store("mock store lock poisoned".into())
    }

    #[derive(Default)]
    pub struct MockAuthRepository {
        users: Mutex<HashMap<String, AuthUser>>,          // key: email
        creds: Mutex<HashMap<Uuid, Credentials>>,         // key: user_id
        sessions: Mutex<HashMap<Uuid, SessionRecord>>,    // key: session id
    }

    #[async_trait]
    impl AuthRepository for MockAuthRepository {
        async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
            let users = self.users.lock().map_err(poisoned)?;
            Ok(users.get(email).cloned())
        }

        async fn find_user(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError> {
            let users = self.users.lock().map_err(poisoned)?;
            Ok(users.values().find(|u| u.id == id).cloned())
        }

        async fn create_user(&self, email: &str, name: &str, is_staff: bool) -> Result<AuthUser, AuthError> {
            let mut users = self.users.lock().map_err(poisoned)?;
            if users.contains_key(email) {
                return Err(AuthError::EmailTaken);
            }
            let user = AuthUser { id: Uuid::new_v4(), email: email.to_string(), name: name.to_string(), is_staff };
            users.insert(email.to_string(), user.clone());
            Ok(user)
        }

        async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
            let creds = self.creds.lock().map_err(poisoned)?;
            Ok(creds.get(&user_id).cloned())
        }

        async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError> {
            let mut creds = self.creds.lock().map_err(poisoned)?;
            let c = Credentials { user_id, password_hash, password_algorithm };
            creds.insert(user_id, c.clone());
            Ok(c)
        }

        async fn create_session(&self, user_id: Uuid, expires_at: DateTime<Utc>) -> Result<SessionRecord, AuthError> {
            let mut sessions = self.sessions.lock().map_err(poisoned)?;
            let s = SessionRecord { id: Uuid::new_v4(), user_id, expires_at, revoked_at: None };
            sessions.insert(s.id, s.clone());
            Ok(s)
        }

        async fn find_session(&self, id: Uuid) -> Result<Option<SessionRecord>, AuthError> {
            let sessions = self.sessions.lock().map_err(poisoned)?;
            Ok(sessions.get(&id).cloned())
        }

        async fn revoke_session(&self, id: Uuid) -> Result<(), AuthError> {
            let mut sessions = self.sessions.lock().map_err(poisoned)?;
            let s = sessions.get_mut(&id).ok_or(AuthError::SessionRevoked)?;
            if s.revoked_at.is_none() {
                s.revoked_at = Some(Utc::now());
            }
            Ok(())
        }
    }
}
