use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use models::service_request::{self, RequestStatus};
use service::lifecycle::RequestFilter;

use crate::auth::{AuthActor, ServerState};
use crate::errors::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateRequestInput {
    pub service_id: Uuid,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusInput {
    pub status: RequestStatus,
}

#[derive(Debug, Deserialize)]
pub struct UpdateHoursInput {
    pub actual_hours: f64,
}

type RequestResult = Result<Json<service_request::Model>, ApiError>;

#[utoipa::path(get, path = "/service-requests/", tag = "requests", params(
    ("status" = Option<String>, Query,), ("role" = Option<String>, Query, description = "requester or owner"),
), responses((status = 200, description = "Requests the caller is party to")))]
pub async fn list(
    State(state): State<ServerState>,
    who: AuthActor,
    Query(filter): Query<RequestFilter>,
) -> Result<Json<Vec<service_request::Model>>, ApiError> {
    Ok(Json(state.lifecycle.list(&who.actor, filter).await?))
}

#[utoipa::path(post, path = "/service-requests/", tag = "requests", request_body = crate::openapi::CreateRequestDoc, responses((status = 201, description = "Created"), (status = 409, description = "Already requested")))]
pub async fn create(
    State(state): State<ServerState>,
    who: AuthActor,
    Json(input): Json<CreateRequestInput>,
) -> Result<(StatusCode, Json<service_request::Model>), ApiError> {
    let created = state.lifecycle.create(&who.actor, input.service_id, &input.message).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(get, path = "/service-requests/{id}/", tag = "requests", params(("id" = Uuid, Path,)), responses((status = 200, description = "OK"), (status = 403, description = "Not a party")))]
pub async fn get(State(state): State<ServerState>, who: AuthActor, Path(id): Path<Uuid>) -> RequestResult {
    Ok(Json(state.lifecycle.get(&who.actor, id).await?))
}

#[utoipa::path(post, path = "/service-requests/{id}/set_status/", tag = "requests", params(("id" = Uuid, Path,)), request_body = crate::openapi::SetStatusDoc, responses((status = 200, description = "Answered"), (status = 409, description = "Invalid transition or capacity exceeded")))]
pub async fn set_status(
    State(state): State<ServerState>,
    who: AuthActor,
    Path(id): Path<Uuid>,
    Json(input): Json<SetStatusInput>,
) -> RequestResult {
    Ok(Json(state.lifecycle.set_status(&who.actor, id, input.status).await?))
}

#[utoipa::path(post, path = "/service-requests/{id}/approve_start/", tag = "requests", params(("id" = Uuid, Path,)), responses((status = 200, description = "Approval recorded")))]
pub async fn approve_start(State(state): State<ServerState>, who: AuthActor, Path(id): Path<Uuid>) -> RequestResult {
    Ok(Json(state.lifecycle.approve_start(&who.actor, id).await?))
}

#[utoipa::path(post, path = "/service-requests/{id}/complete/", tag = "requests", params(("id" = Uuid, Path,)), responses((status = 200, description = "Completion recorded"), (status = 400, description = "Insufficient balance")))]
pub async fn complete(State(state): State<ServerState>, who: AuthActor, Path(id): Path<Uuid>) -> RequestResult {
    Ok(Json(state.lifecycle.mark_completed(&who.actor, id).await?))
}

#[utoipa::path(post, path = "/service-requests/{id}/update_hours/", tag = "requests", params(("id" = Uuid, Path,)), request_body = crate::openapi::UpdateHoursDoc, responses((status = 200, description = "Proposal recorded")))]
pub async fn update_hours(
    State(state): State<ServerState>,
    who: AuthActor,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateHoursInput>,
) -> RequestResult {
    Ok(Json(state.lifecycle.propose_hours(&who.actor, id, input.actual_hours).await?))
}

#[utoipa::path(post, path = "/service-requests/{id}/approve_hours/", tag = "requests", params(("id" = Uuid, Path,)), responses((status = 200, description = "Approval recorded")))]
pub async fn approve_hours(State(state): State<ServerState>, who: AuthActor, Path(id): Path<Uuid>) -> RequestResult {
    Ok(Json(state.lifecycle.approve_hours(&who.actor, id).await?))
}
