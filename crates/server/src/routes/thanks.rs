use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use common::pagination::Pagination;
use models::thank_you_note;
use service::thanks::{NewNote, NoteFilter};

use crate::auth::{AuthActor, ServerState};
use crate::errors::ApiError;

type NoteResult = Result<Json<thank_you_note::Model>, ApiError>;

#[utoipa::path(get, path = "/thank-you-notes/", tag = "thanks", params(
    ("received" = Option<bool>, Query, description = "true: received, false: sent"),
    ("status" = Option<String>, Query, description = "sent, read or archived"),
), responses((status = 200, description = "Newest first")))]
pub async fn list(
    State(state): State<ServerState>,
    who: AuthActor,
    Query(filter): Query<NoteFilter>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<thank_you_note::Model>>, ApiError> {
    Ok(Json(state.thanks.list(&who.actor, filter, page).await?))
}

#[utoipa::path(post, path = "/thank-you-notes/", tag = "thanks", request_body = crate::openapi::NewNoteDoc, responses((status = 201, description = "Sent"), (status = 400, description = "Bad Request"), (status = 404, description = "Recipient or service not found")))]
pub async fn send(
    State(state): State<ServerState>,
    who: AuthActor,
    Json(input): Json<NewNote>,
) -> Result<(StatusCode, Json<thank_you_note::Model>), ApiError> {
    let note = state.thanks.send(&who.actor, input).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

#[utoipa::path(get, path = "/thank-you-notes/{id}/", tag = "thanks", params(("id" = Uuid, Path,)), responses((status = 200, description = "OK"), (status = 404, description = "Not Found")))]
pub async fn get(State(state): State<ServerState>, who: AuthActor, Path(id): Path<Uuid>) -> NoteResult {
    Ok(Json(state.thanks.get(&who.actor, id).await?))
}

#[utoipa::path(post, path = "/thank-you-notes/{id}/mark_read/", tag = "thanks", params(("id" = Uuid, Path,)), responses((status = 200, description = "Read"), (status = 403, description = "Recipient only")))]
pub async fn mark_read(State(state): State<ServerState>, who: AuthActor, Path(id): Path<Uuid>) -> NoteResult {
    Ok(Json(state.thanks.mark_read(&who.actor, id).await?))
}

#[utoipa::path(post, path = "/thank-you-notes/{id}/archive/", tag = "thanks", params(("id" = Uuid, Path,)), responses((status = 200, description = "Archived"), (status = 403, description = "Recipient only")))]
pub async fn archive(State(state): State<ServerState>, who: AuthActor, Path(id): Path<Uuid>) -> NoteResult {
    Ok(Json(state.thanks.archive(&who.actor, id).await?))
}

#[utoipa::path(delete, path = "/thank-you-notes/{id}/", tag = "thanks", params(("id" = Uuid, Path,)), responses((status = 204, description = "Deleted"), (status = 404, description = "Not Found")))]
pub async fn delete(State(state): State<ServerState>, who: AuthActor, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    state.thanks.delete(&who.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
