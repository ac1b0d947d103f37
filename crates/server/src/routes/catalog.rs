use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use common::pagination::Pagination;
use models::tag;
use service::catalog::{NewService, ServiceFilter, ServiceUpdate, ServiceView, TagCount};

use crate::auth::{AuthActor, ServerState};
use crate::errors::ApiError;

#[utoipa::path(get, path = "/services/", tag = "catalog", params(
    ("service_type" = Option<String>, Query, description = "offer or need"),
    ("tag" = Option<String>, Query, description = "Tag slug"),
    ("lat" = Option<f64>, Query,), ("lng" = Option<f64>, Query,), ("radius_km" = Option<f64>, Query,),
), responses((status = 200, description = "Newest first")))]
pub async fn list(
    State(state): State<ServerState>,
    _who: AuthActor,
    Query(filter): Query<ServiceFilter>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<ServiceView>>, ApiError> {
    Ok(Json(state.catalog.list_services(filter, page).await?))
}

#[utoipa::path(post, path = "/services/", tag = "catalog", request_body = crate::openapi::NewServiceDoc, responses((status = 201, description = "Created"), (status = 400, description = "Bad Request"), (status = 403, description = "Account restricted")))]
pub async fn create(
    State(state): State<ServerState>,
    who: AuthActor,
    Json(input): Json<NewService>,
) -> Result<(StatusCode, Json<ServiceView>), ApiError> {
    let created = state.catalog.create_service(&who.actor, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(get, path = "/services/{id}/", tag = "catalog", params(("id" = Uuid, Path,)), responses((status = 200, description = "OK"), (status = 404, description = "Not Found")))]
pub async fn get(
    State(state): State<ServerState>,
    _who: AuthActor,
    Path(id): Path<Uuid>,
) -> Result<Json<ServiceView>, ApiError> {
    Ok(Json(state.catalog.get_service(id).await?))
}

#[utoipa::path(patch, path = "/services/{id}/", tag = "catalog", params(("id" = Uuid, Path,)), responses((status = 200, description = "Updated"), (status = 403, description = "Owner only")))]
pub async fn update(
    State(state): State<ServerState>,
    who: AuthActor,
    Path(id): Path<Uuid>,
    Json(input): Json<ServiceUpdate>,
) -> Result<Json<ServiceView>, ApiError> {
    Ok(Json(state.catalog.update_service(&who.actor, id, input).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct TagQuery {
    pub search: Option<String>,
}

#[utoipa::path(get, path = "/tags/", tag = "catalog", params(("search" = Option<String>, Query, description = "Substring of the name or slug")), responses((status = 200, description = "Alphabetical")))]
pub async fn tags(
    State(state): State<ServerState>,
    _who: AuthActor,
    Query(q): Query<TagQuery>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<tag::Model>>, ApiError> {
    Ok(Json(state.catalog.list_tags(q.search.as_deref(), page).await?))
}

#[utoipa::path(get, path = "/tags/popular/", tag = "catalog", responses((status = 200, description = "Most used tags with their live service counts")))]
pub async fn popular_tags(State(state): State<ServerState>, _who: AuthActor) -> Result<Json<Vec<TagCount>>, ApiError> {
    Ok(Json(state.catalog.popular_tags().await?))
}
