use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::AppState;
use crate::api::models::matches::{CompleteElapsedResponse, ListMatchesQuery, MatchResponse};
use crate::auth::CurrentUser;
use crate::errors::Result;
use crate::types::MatchId;

#[utoipa::path(
    get,
    path = "/matches/mine",
    tag = "matches",
    summary = "List the caller's bookings",
    params(ListMatchesQuery),
    responses(
        (status = 200, description = "Bookings where the caller is hunter or landowner, by start time", body = Vec<MatchResponse>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("ProxyUser" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_my_matches(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListMatchesQuery>,
) -> Result<Json<Vec<MatchResponse>>> {
    let matches = state.ledger.list_for_party(user.id, query.status).await?;
    Ok(Json(matches.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/matches/{id}/cancel",
    tag = "matches",
    summary = "Cancel a booking",
    description = "Either party may cancel a confirmed booking until it starts.",
    params(("id" = uuid::Uuid, Path, description = "Match ID")),
    responses(
        (status = 200, description = "Cancelled booking", body = MatchResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is neither the hunter nor the landowner"),
        (status = 404, description = "Match not found"),
        (status = 409, description = "Booking not confirmed, or already started"),
    ),
    security(("ProxyUser" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id, match_id = %id))]
pub async fn cancel_match(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<MatchId>,
) -> Result<Json<MatchResponse>> {
    let cancelled = state.ledger.cancel(id, user.id).await?;
    Ok(Json(cancelled.into()))
}

#[utoipa::path(
    post,
    path = "/matches/complete-elapsed",
    tag = "matches",
    summary = "Complete elapsed bookings",
    description = "Marks every confirmed booking that has ended as completed. Safe to call repeatedly.",
    responses(
        (status = 200, description = "Number of bookings completed by this call", body = CompleteElapsedResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("ProxyUser" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn complete_elapsed(State(state): State<AppState>, user: CurrentUser) -> Result<Json<CompleteElapsedResponse>> {
    let completed = state.ledger.complete_elapsed(state.clock.now()).await?;
    Ok(Json(CompleteElapsedResponse { completed }))
}
