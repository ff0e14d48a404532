use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::AppState;
use crate::api::models::subscriptions::{SubscriptionCreate, SubscriptionResponse};
use crate::auth::CurrentUser;
use crate::errors::{Error, Result};
use crate::storage::Storage;
use crate::types::SubscriptionId;

#[utoipa::path(
    post,
    path = "/subscriptions",
    tag = "subscriptions",
    summary = "Subscribe to sightings in an area",
    request_body = SubscriptionCreate,
    responses(
        (status = 201, description = "Subscription created", body = SubscriptionResponse),
        (status = 400, description = "Invalid center or radius"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not a hunter"),
    ),
    security(("ProxyUser" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn create_subscription(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(create): Json<SubscriptionCreate>,
) -> Result<(StatusCode, Json<SubscriptionResponse>)> {
    let hunter_id = user.require_hunter()?;
    create.validate()?;

    let subscription = state
        .storage
        .create_subscription(create.into_db_request(hunter_id), state.clock.now())
        .await?;
    Ok((StatusCode::CREATED, Json(subscription.into())))
}

#[utoipa::path(
    get,
    path = "/subscriptions/mine",
    tag = "subscriptions",
    summary = "List own subscriptions",
    responses(
        (status = 200, description = "The caller's subscriptions, active and inactive", body = Vec<SubscriptionResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not a hunter"),
    ),
    security(("ProxyUser" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_my_subscriptions(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Vec<SubscriptionResponse>>> {
    let hunter_id = user.require_hunter()?;
    let subscriptions = state.storage.subscriptions_for_hunter(hunter_id).await?;
    Ok(Json(subscriptions.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    delete,
    path = "/subscriptions/{id}",
    tag = "subscriptions",
    summary = "Deactivate a subscription",
    params(("id" = uuid::Uuid, Path, description = "Subscription ID")),
    responses(
        (status = 200, description = "Deactivated subscription", body = SubscriptionResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Subscription belongs to another hunter"),
        (status = 404, description = "Subscription not found"),
    ),
    security(("ProxyUser" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id, subscription_id = %id))]
pub async fn deactivate_subscription(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<SubscriptionId>,
) -> Result<Json<SubscriptionResponse>> {
    let hunter_id = user.require_hunter()?;
    let subscription = state
        .storage
        .get_subscription(id)
        .await?
        .ok_or_else(|| Error::not_found("Subscription", id))?;
    if subscription.hunter_id != hunter_id {
        return Err(Error::forbidden("only the subscriber can deactivate this subscription"));
    }

    let deactivated = state.storage.deactivate_subscription(id).await?;
    Ok(Json(deactivated.into()))
}
