use thiserror::Error;

/// Why registration, login or token authentication failed.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid registration: {0}")]
    InvalidInput(String),
    #[error("email already registered")]
    EmailTaken,
    #[error("email or password is incorrect")]
    BadCredentials,
    #[error("malformed or forged token: {0}")]
    BadToken(String),
    #[error("token expired")]
    TokenExpired,
    /// The token verified but its session row is revoked, expired, missing
    /// or issued to another account.
    #[error("session revoked or expired")]
    SessionRevoked,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("token signing failed: {0}")]
    Signing(String),
    #[error("account store: {0}")]
    Store(String),
}

impl AuthError {
    /// The caller must sign in again.
    pub fn needs_login(&self) -> bool {
        matches!(
            self,
            AuthError::BadCredentials | AuthError::BadToken(_) | AuthError::TokenExpired | AuthError::SessionRevoked
        )
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::BadToken(e.to_string()),
        }
    }
}
