use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::pagination::Pagination;
use models::{conversation, message};
use service::messaging::ConversationSummary;

use crate::auth::{AuthActor, ServerState};
use crate::errors::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct ConversationQuery {
    pub archived: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SendInput {
    pub body: String,
}

#[derive(Serialize)]
pub struct MarkedRead {
    pub marked: u64,
}

#[utoipa::path(get, path = "/conversations/", tag = "messaging", params(("archived" = Option<bool>, Query,)), responses((status = 200, description = "Most recently active first")))]
pub async fn list(
    State(state): State<ServerState>,
    who: AuthActor,
    Query(q): Query<ConversationQuery>,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    Ok(Json(state.messaging.list_conversations(&who.actor, q.archived).await?))
}

#[utoipa::path(get, path = "/conversations/{id}/messages/", tag = "messaging", params(("id" = Uuid, Path,)), responses((status = 200, description = "Oldest first"), (status = 403, description = "Not a participant")))]
pub async fn messages(
    State(state): State<ServerState>,
    who: AuthActor,
    Path(id): Path<Uuid>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<message::Model>>, ApiError> {
    Ok(Json(state.messaging.messages(&who.actor, id, page).await?))
}

#[utoipa::path(post, path = "/conversations/{id}/messages/", tag = "messaging", params(("id" = Uuid, Path,)), request_body = crate::openapi::SendMessageDoc, responses((status = 201, description = "Sent"), (status = 403, description = "Restricted or not a participant")))]
pub async fn send(
    State(state): State<ServerState>,
    who: AuthActor,
    Path(id): Path<Uuid>,
    Json(input): Json<SendInput>,
) -> Result<(StatusCode, Json<message::Model>), ApiError> {
    let sent = state.messaging.send_message(&who.actor, id, &input.body).await?;
    Ok((StatusCode::CREATED, Json(sent)))
}

#[utoipa::path(post, path = "/conversations/{id}/mark_read/", tag = "messaging", params(("id" = Uuid, Path,)), responses((status = 200, description = "Number of messages marked")))]
pub async fn mark_read(
    State(state): State<ServerState>,
    who: AuthActor,
    Path(id): Path<Uuid>,
) -> Result<Json<MarkedRead>, ApiError> {
    let marked = state.messaging.mark_read(&who.actor, id).await?;
    Ok(Json(MarkedRead { marked }))
}

pub async fn archive(
    State(state): State<ServerState>,
    who: AuthActor,
    Path(id): Path<Uuid>,
) -> Result<Json<conversation::Model>, ApiError> {
    Ok(Json(state.messaging.set_archived(&who.actor, id, true).await?))
}

pub async fn unarchive(
    State(state): State<ServerState>,
    who: AuthActor,
    Path(id): Path<Uuid>,
) -> Result<Json<conversation::Model>, ApiError> {
    Ok(Json(state.messaging.set_archived(&who.actor, id, false).await?))
}
