use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use common::pagination::Pagination;
use models::{moderation_action, report};
use service::moderation::{ActionFilter, NewReport, ReportFilter};

use crate::auth::{AuthActor, ServerState};
use crate::errors::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct NotesInput {
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct BanInput {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct SuspendInput {
    pub reason: String,
    pub days: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ReverseInput {
    pub reason: String,
}

type ReportResult = Result<Json<report::Model>, ApiError>;

/// First hop of `X-Forwarded-For`, else `X-Real-IP`.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());
    forwarded
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()).map(|v| v.trim().to_string()))
        .filter(|ip| !ip.is_empty())
}

fn notes_of(body: Option<Json<NotesInput>>) -> String {
    body.map(|Json(n)| n.notes).unwrap_or_default()
}

#[utoipa::path(get, path = "/reports/", tag = "moderation", params(("status" = Option<String>, Query,), ("reason" = Option<String>, Query,)), responses((status = 200, description = "Staff see all reports, members their own")))]
pub async fn list(
    State(state): State<ServerState>,
    who: AuthActor,
    Query(filter): Query<ReportFilter>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<report::Model>>, ApiError> {
    Ok(Json(state.moderation.list(&who.actor, filter, page).await?))
}

#[utoipa::path(post, path = "/reports/", tag = "moderation", request_body = crate::openapi::NewReportDoc, responses((status = 201, description = "Filed"), (status = 404, description = "Target not found"), (status = 409, description = "Duplicate report")))]
pub async fn create(
    State(state): State<ServerState>,
    who: AuthActor,
    headers: HeaderMap,
    Json(mut input): Json<NewReport>,
) -> Result<(StatusCode, Json<report::Model>), ApiError> {
    input.reporter_ip = client_ip(&headers);
    let created = state.moderation.report(&who.actor, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(get, path = "/reports/{id}/", tag = "moderation", params(("id" = Uuid, Path,)), responses((status = 200, description = "OK"), (status = 404, description = "Not Found")))]
pub async fn get(State(state): State<ServerState>, who: AuthActor, Path(id): Path<Uuid>) -> ReportResult {
    Ok(Json(state.moderation.get(&who.actor, id).await?))
}

pub async fn actions(
    State(state): State<ServerState>,
    who: AuthActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<moderation_action::Model>>, ApiError> {
    Ok(Json(state.moderation.actions(&who.actor, id).await?))
}

#[utoipa::path(post, path = "/reports/{id}/review/", tag = "moderation", params(("id" = Uuid, Path,)), responses((status = 200, description = "Under review"), (status = 403, description = "Staff only")))]
pub async fn review(State(state): State<ServerState>, who: AuthActor, Path(id): Path<Uuid>) -> ReportResult {
    Ok(Json(state.moderation.start_review(&who.actor, id).await?))
}

#[utoipa::path(post, path = "/reports/{id}/resolve/", tag = "moderation", params(("id" = Uuid, Path,)), responses((status = 200, description = "Resolved"), (status = 409, description = "Closed differently")))]
pub async fn resolve(
    State(state): State<ServerState>,
    who: AuthActor,
    Path(id): Path<Uuid>,
    body: Option<Json<NotesInput>>,
) -> ReportResult {
    Ok(Json(state.moderation.resolve(&who.actor, id, &notes_of(body)).await?))
}

#[utoipa::path(post, path = "/reports/{id}/dismiss/", tag = "moderation", params(("id" = Uuid, Path,)), responses((status = 200, description = "Dismissed"), (status = 409, description = "Closed differently")))]
pub async fn dismiss(
    State(state): State<ServerState>,
    who: AuthActor,
    Path(id): Path<Uuid>,
    body: Option<Json<NotesInput>>,
) -> ReportResult {
    Ok(Json(state.moderation.dismiss(&who.actor, id, &notes_of(body)).await?))
}

#[utoipa::path(post, path = "/reports/{id}/ban_user/", tag = "moderation", params(("id" = Uuid, Path,)), request_body = crate::openapi::BanDoc, responses((status = 200, description = "User banned, report resolved")))]
pub async fn ban_user(
    State(state): State<ServerState>,
    who: AuthActor,
    Path(id): Path<Uuid>,
    Json(input): Json<BanInput>,
) -> ReportResult {
    Ok(Json(state.moderation.ban_user(&who.actor, id, &input.reason).await?))
}

#[utoipa::path(post, path = "/reports/{id}/suspend_user/", tag = "moderation", params(("id" = Uuid, Path,)), request_body = crate::openapi::SuspendDoc, responses((status = 200, description = "User suspended, report resolved")))]
pub async fn suspend_user(
    State(state): State<ServerState>,
    who: AuthActor,
    Path(id): Path<Uuid>,
    Json(input): Json<SuspendInput>,
) -> ReportResult {
    Ok(Json(state.moderation.suspend_user(&who.actor, id, &input.reason, input.days).await?))
}

#[utoipa::path(post, path = "/reports/{id}/delete_content/", tag = "moderation", params(("id" = Uuid, Path,)), responses((status = 200, description = "Content removed, report resolved"), (status = 400, description = "User reports are handled by banning")))]
pub async fn delete_content(
    State(state): State<ServerState>,
    who: AuthActor,
    Path(id): Path<Uuid>,
    body: Option<Json<NotesInput>>,
) -> ReportResult {
    Ok(Json(state.moderation.delete_content(&who.actor, id, &notes_of(body)).await?))
}

#[utoipa::path(get, path = "/moderation-actions/", tag = "moderation", params(
    ("action" = Option<String>, Query,), ("affected_user" = Option<Uuid>, Query,), ("is_reversed" = Option<bool>, Query,),
), responses((status = 200, description = "Newest first"), (status = 403, description = "Staff only")))]
pub async fn list_actions(
    State(state): State<ServerState>,
    who: AuthActor,
    Query(filter): Query<ActionFilter>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<moderation_action::Model>>, ApiError> {
    Ok(Json(state.moderation.list_actions(&who.actor, filter, page).await?))
}

#[utoipa::path(post, path = "/moderation-actions/{id}/reverse/", tag = "moderation", params(("id" = Uuid, Path,)), request_body = crate::openapi::ReverseDoc, responses((status = 200, description = "Reversed; repeating is a no-op"), (status = 400, description = "Action cannot be reversed"), (status = 403, description = "Staff only")))]
pub async fn reverse_action(
    State(state): State<ServerState>,
    who: AuthActor,
    Path(id): Path<Uuid>,
    Json(input): Json<ReverseInput>,
) -> Result<Json<moderation_action::Model>, ApiError> {
    Ok(Json(state.moderation.reverse_action(&who.actor, id, &input.reason).await?))
}
