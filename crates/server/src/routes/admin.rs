use axum::{extract::State, Json};

use service::admin::PlatformStats;

use crate::auth::{AuthActor, ServerState};
use crate::errors::ApiError;

#[utoipa::path(get, path = "/admin/stats/", tag = "admin", responses((status = 200, description = "Platform figures"), (status = 403, description = "Staff only")))]
pub async fn stats(State(state): State<ServerState>, who: AuthActor) -> Result<Json<PlatformStats>, ApiError> {
    Ok(Json(state.admin.stats(&who.actor).await?))
}
