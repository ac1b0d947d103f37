use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use rand::rngs::OsRng;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use configs::AuthSettings;

use super::domain::{AuthSession, AuthUser, Authenticated, Claims, LoginInput, RegisterInput};
use super::errors::AuthError;
use super::repository::AuthRepository;

/// Auth service configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Lowercased emails that register as staff.
    pub staff_emails: Vec<String>,
    pub password_algorithm: String,
}

impl AuthConfig {
    pub fn from_settings(s: &AuthSettings) -> Self {
        Self {
            jwt_secret: s.jwt_secret.clone(),
            token_ttl_hours: s.token_ttl_hours,
            staff_emails: s.staff_emails.clone(),
            password_algorithm: "argon2id".into(),
        }
    }
}

/// Auth business service independent of web framework
pub struct AuthService<R: AuthRepository> {
    repo: Arc<R>,
    cfg: AuthConfig,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl<R: AuthRepository> AuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AuthConfig) -> Self { Self { repo, cfg } }

    /// Register a new user with a hashed password.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::RegisterInput;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let cfg = AuthConfig { jwt_secret: "doc-secret-0123456789".into(), token_ttl_hours: 1, staff_emails: vec!["mod@hive.test".into()], password_algorithm: "argon2id".into() };
    /// let svc = AuthService::new(repo, cfg);
    /// let input = RegisterInput { email: "Mod@Hive.test".into(), name: "Mod".into(), password: "Secret123".into() };
    /// let user = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(user.email, "mod@hive.test");
    /// assert!(user.is_staff);
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthUser, AuthError> {
        let email = normalize_email(&input.email);
        if !email.contains('@') {
            return Err(AuthError::InvalidInput("invalid email".into()));
        }
        if input.name.trim().is_empty() {
            return Err(AuthError::InvalidInput("name required".into()));
        }
        if input.password.len() < 8 {
            return Err(AuthError::InvalidInput("password too short (>=8)".into()));
        }
        if let Some(existing) = self.repo.find_user_by_email(&email).await? {
            debug!("user exists: {}", existing.email);
            return Err(AuthError::EmailTaken);
        }

        let is_staff = self.cfg.staff_emails.iter().any(|e| e == &email);
        let user = self.repo.create_user(&email, input.name.trim(), is_staff).await?;
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(input.password.as_bytes(), &salt)
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .to_string();

        let _cred = self.repo.upsert_password(user.id, hash, self.cfg.password_algorithm.clone()).await?;
        info!(event = "user_registered", user_id = %user.id, is_staff = user.is_staff);
        Ok(user)
    }

    /// Verify credentials, open a session and issue its token.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::{RegisterInput, LoginInput};
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let cfg = AuthConfig { jwt_secret: "doc-secret-0123456789".into(), token_ttl_hours: 1, staff_emails: vec![], password_algorithm: "argon2id".into() };
    /// let svc = AuthService::new(repo.clone(), cfg);
    /// let _ = tokio_test::block_on(svc.register(RegisterInput { email: "u@e.com".into(), name: "N".into(), password: "Passw0rd".into() }));
    /// let session = tokio_test::block_on(svc.login(LoginInput { email: "u@e.com".into(), password: "Passw0rd".into() })).unwrap();
    /// assert_eq!(session.user.email, "u@e.com");
    /// let who = tokio_test::block_on(svc.authenticate(&session.token)).unwrap();
    /// assert_eq!(who.session_id, session.session_id);
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let email = normalize_email(&input.email);
        let user = self.repo
            .find_user_by_email(&email)
            .await?
            .ok_or(AuthError::BadCredentials)?;

        let cred = self.repo
            .get_credentials(user.id)
            .await?
            .ok_or(AuthError::BadCredentials)?;

        let parsed = PasswordHash::new(&cred.password_hash).map_err(|e| AuthError::Hashing(e.to_string()))?;
        if Argon2::default().verify_password(input.password.as_bytes(), &parsed).is_err() {
            return Err(AuthError::BadCredentials);
        }

        let expires_at = Utc::now() + chrono::Duration::hours(self.cfg.token_ttl_hours);
        let session = self.repo.create_session(user.id, expires_at).await?;
        let claims = Claims {
            sub: user.id.to_string(),
            sid: session.id.to_string(),
            exp: expires_at.timestamp() as usize,
        };
        let token = encode(&JwtHeader::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(self.cfg.jwt_secret.as_bytes()))
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        info!(event = "session_opened", user_id = %user.id, session_id = %session.id);
        Ok(AuthSession { user, token, session_id: session.id, expires_at })
    }

    /// Validate a bearer token against its session row.
    pub async fn authenticate(&self, token: &str) -> Result<Authenticated, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let data = decode::<Claims>(token, &DecodingKey::from_secret(self.cfg.jwt_secret.as_bytes()), &validation)?;
        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|e| AuthError::BadToken(e.to_string()))?;
        let session_id = Uuid::parse_str(&data.claims.sid).map_err(|e| AuthError::BadToken(e.to_string()))?;

        let session = self.repo.find_session(session_id).await?.ok_or(AuthError::SessionRevoked)?;
        if session.user_id != user_id || !session.is_live_at(Utc::now()) {
            warn!(event = "session_rejected", %session_id, %user_id);
            return Err(AuthError::SessionRevoked);
        }
        let user = self.repo.find_user(user_id).await?.ok_or(AuthError::SessionRevoked)?;
        Ok(Authenticated { user, session_id })
    }

    /// Revoke the session; later requests carrying its token get 401.
    #[instrument(skip(self))]
    pub async fn logout(&self, session_id: Uuid) -> Result<(), AuthError> {
        self.repo.revoke_session(session_id).await?;
        info!(event = "session_revoked", %session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::mock::MockAuthRepository;

    fn svc() -> AuthService<MockAuthRepository> {
        let cfg = AuthConfig {
            jwt_secret: "unit-test-secret-0123".into(),
            token_ttl_hours: 1,
            staff_emails: vec![],
            password_algorithm: "argon2id".into(),
        };
        AuthService::new(Arc::new(MockAuthRepository::default()), cfg)
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let s = svc();
        s.register(RegisterInput { email: "a@hive.test".into(), name: "A".into(), password: "password1".into() }).await.unwrap();
        let err = s
            .register(RegisterInput { email: " A@HIVE.test".into(), name: "A".into(), password: "password1".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let err = svc()
            .register(RegisterInput { email: "b@hive.test".into(), name: "B".into(), password: "short".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let s = svc();
        s.register(RegisterInput { email: "c@hive.test".into(), name: "C".into(), password: "password1".into() }).await.unwrap();
        let err = s.login(LoginInput { email: "c@hive.test".into(), password: "password2".into() }).await.unwrap_err();
        assert!(matches!(err, AuthError::BadCredentials));
    }

    #[tokio::test]
    async fn logout_invalidates_token() {
        let s = svc();
        s.register(RegisterInput { email: "d@hive.test".into(), name: "D".into(), password: "password1".into() }).await.unwrap();
        let session = s.login(LoginInput { email: "d@hive.test".into(), password: "password1".into() }).await.unwrap();
        assert!(s.authenticate(&session.token).await.is_ok());

        s.logout(session.session_id).await.unwrap();
        let err = s.authenticate(&session.token).await.unwrap_err();
        assert!(matches!(err, AuthError::SessionRevoked));
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_rejected() {
        let s = svc();
        s.register(RegisterInput { email: "e@hive.test".into(), name: "E".into(), password: "password1".into() }).await.unwrap();
        let session = s.login(LoginInput { email: "e@hive.test".into(), password: "password1".into() }).await.unwrap();

        let other = AuthService::new(
            Arc::new(MockAuthRepository::default()),
            AuthConfig {
                jwt_secret: "another-secret-987654".into(),
                token_ttl_hours: 1,
                staff_emails: vec![],
                password_algorithm: "argon2id".into(),
            },
        );
        assert!(matches!(other.authenticate(&session.token).await, Err(AuthError::BadToken(_))));
    }
}
