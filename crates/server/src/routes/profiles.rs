use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use service::profiles::{MeView, ProfileUpdate, ProfileView};

use crate::auth::{AuthActor, ServerState};
use crate::errors::ApiError;

#[utoipa::path(get, path = "/me/", tag = "profiles", responses((status = 200, description = "Own profile, account and balance"), (status = 401, description = "Unauthorized")))]
pub async fn me(State(state): State<ServerState>, who: AuthActor) -> Result<Json<MeView>, ApiError> {
    Ok(Json(state.profiles.me(&who.actor).await?))
}

#[utoipa::path(patch, path = "/me/", tag = "profiles", request_body = crate::openapi::ProfileUpdateDoc, responses((status = 200, description = "Updated"), (status = 400, description = "Bad Request")))]
pub async fn update_me(
    State(state): State<ServerState>,
    who: AuthActor,
    Json(input): Json<ProfileUpdate>,
) -> Result<Json<MeView>, ApiError> {
    Ok(Json(state.profiles.update_me(&who.actor, input).await?))
}

#[utoipa::path(get, path = "/profiles/{user_id}/", tag = "profiles", params(("user_id" = Uuid, Path,)), responses((status = 200, description = "OK"), (status = 404, description = "Not Found")))]
pub async fn get(
    State(state): State<ServerState>,
    _who: AuthActor,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ProfileView>, ApiError> {
    Ok(Json(state.profiles.get(user_id).await?))
}
