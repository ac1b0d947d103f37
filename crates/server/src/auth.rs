use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use configs::AppConfig;
use service::{
    actor::Actor,
    admin::AdminStats,
    auth::{
        domain::AuthUser,
        repo::seaorm::SeaOrmAuthRepository,
        service::{AuthConfig, AuthService},
    },
    catalog::Catalog,
    forum::Forum,
    ledger::TimeLedger,
    lifecycle::RequestLifecycle,
    locks::RequestLocks,
    messaging::Messaging,
    moderation::ModerationQueue,
    profiles::Profiles,
    thanks::ThankYouNotes,
};

use crate::errors::ApiError;

pub const AUTH_COOKIE: &str = "auth_token";

/// Shared handler state; every service holds its own pool handle.
#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
    pub auth: Arc<AuthService<SeaOrmAuthRepository>>,
    pub lifecycle: RequestLifecycle,
    pub ledger: TimeLedger,
    pub moderation: ModerationQueue,
    pub catalog: Catalog,
    pub messaging: Messaging,
    pub forum: Forum,
    pub profiles: Profiles,
    pub thanks: ThankYouNotes,
    pub admin: AdminStats,
}

impl ServerState {
    pub fn new(db: DatabaseConnection, cfg: &AppConfig) -> Self {
        let locks = RequestLocks::new();
        let repo = SeaOrmAuthRepository { db: db.clone(), ledger: cfg.ledger.clone() };
        Self {
            auth: Arc::new(AuthService::new(Arc::new(repo), AuthConfig::from_settings(&cfg.auth))),
            lifecycle: RequestLifecycle::new(db.clone(), locks.clone(), cfg.ledger.clone()),
            ledger: TimeLedger::new(db.clone(), cfg.ledger.clone()),
            moderation: ModerationQueue::new(db.clone(), locks),
            catalog: Catalog::new(db.clone()),
            messaging: Messaging::new(db.clone()),
            forum: Forum::new(db.clone()),
            profiles: Profiles::new(db.clone()),
            thanks: ThankYouNotes::new(db.clone()),
            admin: AdminStats::new(db.clone()),
            db,
        }
    }
}

/// The caller behind a valid bearer token (or `auth_token` cookie) whose
/// session is still live.
#[derive(Debug, Clone)]
pub struct AuthActor {
    pub user: AuthUser,
    pub session_id: Uuid,
    pub actor: Actor,
}

fn bearer_token(parts: &Parts) -> Result<Option<String>, ApiError> {
    if let Some(value) = parts.headers.get(AUTHORIZATION) {
        let raw = value.to_str().map_err(|_| ApiError::unauthorized("malformed Authorization header"))?;
        let token = raw
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("expected a Bearer token"))?;
        return Ok(Some(token.trim().to_string()));
    }
    let jar = CookieJar::from_headers(&parts.headers);
    Ok(jar.get(AUTH_COOKIE).map(|c| c.value().to_string()).filter(|t| !t.is_empty()))
}

#[axum::async_trait]
impl FromRequestParts<ServerState> for AuthActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &ServerState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts)? else {
            tracing::debug!(path = %parts.uri.path(), "missing Authorization header and auth_token cookie");
            return Err(ApiError::unauthorized("authentication required"));
        };
        let who = state.auth.authenticate(&token).await?;
        let actor = Actor::from(&who.user);
        Ok(Self { user: who.user, session_id: who.session_id, actor })
    }
}
