pub mod admin;
pub mod auth;
pub mod catalog;
pub mod forum;
pub mod ledger;
pub mod messaging;
pub mod moderation;
pub mod profiles;
pub mod requests;
pub mod thanks;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post, MethodRouter},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{warn, Level};
use utoipa::OpenApi;

use common::types::Health;

use crate::auth::ServerState;
use crate::openapi::ApiDoc;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse), (status = 503, description = "Database unreachable")))]
pub async fn health(State(state): State<ServerState>) -> impl IntoResponse {
    match state.db.ping().await {
        Ok(()) => (StatusCode::OK, Json(Health { status: "ok", database: "connected" })),
        Err(e) => {
            warn!(error = %e, "health check: database ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(Health { status: "degraded", database: "unavailable" }))
        }
    }
}

pub async fn metrics() -> impl IntoResponse {
    match common::metrics::render() {
        Ok(text) => (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; version=0.0.4")], text).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Register `path` both with and without its trailing slash.
fn route_both(router: Router<ServerState>, path: &str, handler: MethodRouter<ServerState>) -> Router<ServerState> {
    let bare = path.trim_end_matches('/');
    router.route(bare, handler.clone()).route(&format!("{bare}/"), handler)
}

/// Build the full application router: public health and docs endpoints,
/// accounts, and the authenticated marketplace, forum and moderation routes.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api-docs/openapi.json", get(openapi_json));

    let routes: Vec<(&str, MethodRouter<ServerState>)> = vec![
        ("/auth/register", post(auth::register)),
        ("/auth/login", post(auth::login)),
        ("/auth/logout", post(auth::logout)),
        ("/auth/me", get(auth::me)),
        ("/me", get(profiles::me).patch(profiles::update_me)),
        ("/profiles/:user_id", get(profiles::get)),
        ("/services", get(catalog::list).post(catalog::create)),
        ("/services/:id", get(catalog::get).patch(catalog::update)),
        ("/tags", get(catalog::tags)),
        ("/tags/popular", get(catalog::popular_tags)),
        ("/service-requests", get(requests::list).post(requests::create)),
        ("/service-requests/:id", get(requests::get)),
        ("/service-requests/:id/set_status", post(requests::set_status)),
        ("/service-requests/:id/approve_start", post(requests::approve_start)),
        ("/service-requests/:id/complete", post(requests::complete)),
        ("/service-requests/:id/update_hours", post(requests::update_hours)),
        ("/service-requests/:id/approve_hours", post(requests::approve_hours)),
        ("/time-account", get(ledger::account)),
        ("/time-transactions", get(ledger::transactions)),
        ("/conversations", get(messaging::list)),
        ("/conversations/:id/messages", get(messaging::messages).post(messaging::send)),
        ("/conversations/:id/mark_read", post(messaging::mark_read)),
        ("/conversations/:id/archive", post(messaging::archive)),
        ("/conversations/:id/unarchive", post(messaging::unarchive)),
        ("/thank-you-notes", get(thanks::list).post(thanks::send)),
        ("/thank-you-notes/:id", get(thanks::get).delete(thanks::delete)),
        ("/thank-you-notes/:id/mark_read", post(thanks::mark_read)),
        ("/thank-you-notes/:id/archive", post(thanks::archive)),
        ("/threads", get(forum::list_threads).post(forum::create_thread)),
        ("/threads/:id", get(forum::get_thread).patch(forum::update_thread)),
        ("/threads/:id/posts", get(forum::list_posts).post(forum::create_post)),
        ("/reports", get(moderation::list).post(moderation::create)),
        ("/reports/:id", get(moderation::get)),
        ("/reports/:id/actions", get(moderation::actions)),
        ("/reports/:id/review", post(moderation::review)),
        ("/reports/:id/resolve", post(moderation::resolve)),
        ("/reports/:id/dismiss", post(moderation::dismiss)),
        ("/reports/:id/ban_user", post(moderation::ban_user)),
        ("/reports/:id/suspend_user", post(moderation::suspend_user)),
        ("/reports/:id/delete_content", post(moderation::delete_content)),
        ("/moderation-actions", get(moderation::list_actions)),
        ("/moderation-actions/:id/reverse", post(moderation::reverse_action)),
    ];
    let api = routes
        .into_iter()
        .fold(Router::new(), |r, (path, handler)| route_both(r, path, handler));
    let api = route_both(api, "/admin/stats", get(admin::stats));

    public
        .merge(api)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
