use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use common::pagination::Pagination;
use models::{
    post,
    thread::{self, ThreadStatus},
};
use service::forum::NewThread;

use crate::auth::{AuthActor, ServerState};
use crate::errors::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct ThreadQuery {
    pub status: Option<ThreadStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ThreadUpdate {
    pub status: ThreadStatus,
}

#[derive(Debug, Deserialize)]
pub struct NewPost {
    pub body: String,
}

#[utoipa::path(get, path = "/threads/", tag = "forum", params(("status" = Option<String>, Query, description = "open, closed or pinned")), responses((status = 200, description = "Pinned first")))]
pub async fn list_threads(
    State(state): State<ServerState>,
    _who: AuthActor,
    Query(q): Query<ThreadQuery>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<thread::Model>>, ApiError> {
    Ok(Json(state.forum.list_threads(q.status, page).await?))
}

#[utoipa::path(post, path = "/threads/", tag = "forum", request_body = crate::openapi::NewThreadDoc, responses((status = 201, description = "Created")))]
pub async fn create_thread(
    State(state): State<ServerState>,
    who: AuthActor,
    Json(input): Json<NewThread>,
) -> Result<(StatusCode, Json<thread::Model>), ApiError> {
    let created = state.forum.create_thread(&who.actor, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(get, path = "/threads/{id}/", tag = "forum", params(("id" = Uuid, Path,)), responses((status = 200, description = "OK; counts a view"), (status = 404, description = "Not Found")))]
pub async fn get_thread(
    State(state): State<ServerState>,
    _who: AuthActor,
    Path(id): Path<Uuid>,
) -> Result<Json<thread::Model>, ApiError> {
    Ok(Json(state.forum.get_thread(id).await?))
}

pub async fn update_thread(
    State(state): State<ServerState>,
    who: AuthActor,
    Path(id): Path<Uuid>,
    Json(input): Json<ThreadUpdate>,
) -> Result<Json<thread::Model>, ApiError> {
    Ok(Json(state.forum.set_thread_status(&who.actor, id, input.status).await?))
}

#[utoipa::path(get, path = "/threads/{id}/posts/", tag = "forum", params(("id" = Uuid, Path,)), responses((status = 200, description = "Oldest first")))]
pub async fn list_posts(
    State(state): State<ServerState>,
    _who: AuthActor,
    Path(id): Path<Uuid>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<post::Model>>, ApiError> {
    Ok(Json(state.forum.list_posts(id, page).await?))
}

#[utoipa::path(post, path = "/threads/{id}/posts/", tag = "forum", params(("id" = Uuid, Path,)), request_body = crate::openapi::NewPostDoc, responses((status = 201, description = "Created"), (status = 409, description = "Thread closed")))]
pub async fn create_post(
    State(state): State<ServerState>,
    who: AuthActor,
    Path(id): Path<Uuid>,
    Json(input): Json<NewPost>,
) -> Result<(StatusCode, Json<post::Model>), ApiError> {
    let created = state.forum.create_post(&who.actor, id, &input.body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
