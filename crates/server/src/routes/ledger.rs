use axum::{
    extract::{Query, State},
    Json,
};

use common::pagination::Pagination;
use models::{time_account, time_transaction};
use service::ledger::TransactionFilter;

use crate::auth::{AuthActor, ServerState};
use crate::errors::ApiError;

#[utoipa::path(get, path = "/time-account/", tag = "ledger", responses((status = 200, description = "Balance and totals, in minutes")))]
pub async fn account(State(state): State<ServerState>, who: AuthActor) -> Result<Json<time_account::Model>, ApiError> {
    Ok(Json(state.ledger.account(who.actor.user_id).await?))
}

#[utoipa::path(get, path = "/time-transactions/", tag = "ledger", params(("kind" = Option<String>, Query, description = "credit, debit or grant")), responses((status = 200, description = "Newest first")))]
pub async fn transactions(
    State(state): State<ServerState>,
    who: AuthActor,
    Query(filter): Query<TransactionFilter>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<time_transaction::Model>>, ApiError> {
    Ok(Json(state.ledger.transactions(who.actor.user_id, filter, page).await?))
}
