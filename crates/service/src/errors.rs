use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

use crate::auth::errors::AuthError;

/// Business errors shared by every service module.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),
    #[error("duplicate report: {0}")]
    DuplicateReport(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("database error: {0}")]
    Db(String),
    #[error("model error: {0}")]
    Model(#[from] models::errors::ModelError),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            ServiceError::PermissionDenied(_) => 2001,
            ServiceError::InvalidTransition(_) => 2002,
            ServiceError::CapacityExceeded(_) => 2003,
            ServiceError::DuplicateReport(_) => 2004,
            ServiceError::NotFound(_) => 2005,
            ServiceError::Validation(_) => 2006,
            ServiceError::Conflict(_) => 2007,
            ServiceError::InsufficientBalance(_) => 2008,
            ServiceError::Unauthorized(_) => 2009,
            ServiceError::Db(_) => 2100,
            ServiceError::Model(_) => 2101,
        }
    }

    /// Machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::PermissionDenied(_) => "permission_denied",
            ServiceError::InvalidTransition(_) => "invalid_transition",
            ServiceError::CapacityExceeded(_) => "capacity_exceeded",
            ServiceError::DuplicateReport(_) => "duplicate_report",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Validation(_) => "validation",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::InsufficientBalance(_) => "insufficient_balance",
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::Db(_) => "database",
            ServiceError::Model(_) => "model",
        }
    }
}

impl From<DbErr> for ServiceError {
    fn from(e: DbErr) -> Self {
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => ServiceError::Conflict(msg),
            _ => ServiceError::Db(e.to_string()),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(e: AuthError) -> Self {
        match e {
            e if e.needs_login() => ServiceError::Unauthorized(e.to_string()),
            AuthError::InvalidInput(m) => ServiceError::Validation(m),
            AuthError::EmailTaken => ServiceError::Conflict("email already registered".into()),
            AuthError::Hashing(m) | AuthError::Signing(m) | AuthError::Store(m) => ServiceError::Db(m),
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_kinds_are_distinct() {
        let all = [
            ServiceError::PermissionDenied(String::new()),
            ServiceError::InvalidTransition(String::new()),
            ServiceError::CapacityExceeded(String::new()),
            ServiceError::DuplicateReport(String::new()),
            ServiceError::NotFound(String::new()),
            ServiceError::Validation(String::new()),
            ServiceError::Conflict(String::new()),
            ServiceError::InsufficientBalance(String::new()),
            ServiceError::Unauthorized(String::new()),
            ServiceError::Db(String::new()),
        ];
        let mut codes: Vec<u16> = all.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
        assert_eq!(ServiceError::not_found("report").to_string(), "not found: report not found");
    }

    #[test]
    fn auth_errors_map_onto_service_errors() {
        let e: ServiceError = AuthError::SessionRevoked.into();
        assert_eq!(e.kind(), "unauthorized");
        let e: ServiceError = AuthError::EmailTaken.into();
        assert_eq!(e.kind(), "conflict");
    }
}
