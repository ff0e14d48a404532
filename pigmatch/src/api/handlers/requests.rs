use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::AppState;
use crate::api::models::messages::{MessageCreate, MessageResponse};
use crate::api::models::requests::{AccessRequestResponse, ApprovalResponse, ApproveRequest, ListRequestsQuery};
use crate::auth::CurrentUser;
use crate::errors::Result;
use crate::types::AccessRequestId;

#[utoipa::path(
    get,
    path = "/requests/incoming",
    tag = "requests",
    summary = "Requests for the caller's properties",
    params(ListRequestsQuery),
    responses(
        (status = 200, description = "Requests, newest first", body = Vec<AccessRequestResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not a landowner"),
    ),
    security(("ProxyUser" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_incoming(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<Vec<AccessRequestResponse>>> {
    let landowner_id = user.require_landowner()?;
    let requests = state.lifecycle.incoming(landowner_id, query.status).await?;
    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/requests/outgoing",
    tag = "requests",
    summary = "Requests made by the caller",
    params(ListRequestsQuery),
    responses(
        (status = 200, description = "Requests, newest first", body = Vec<AccessRequestResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not a hunter"),
    ),
    security(("ProxyUser" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_outgoing(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<Vec<AccessRequestResponse>>> {
    let hunter_id = user.require_hunter()?;
    let requests = state.lifecycle.outgoing(hunter_id, query.status).await?;
    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/requests/{id}",
    tag = "requests",
    summary = "Get an access request",
    params(("id" = uuid::Uuid, Path, description = "Access request ID")),
    responses(
        (status = 200, description = "Access request", body = AccessRequestResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is neither the hunter nor the landowner"),
        (status = 404, description = "Access request not found"),
    ),
    security(("ProxyUser" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id, request_id = %id))]
pub async fn get_request(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<AccessRequestId>,
) -> Result<Json<AccessRequestResponse>> {
    let request = state.lifecycle.get(id, user.id).await?;
    Ok(Json(request.into()))
}

#[utoipa::path(
    post,
    path = "/requests/{id}/approve",
    tag = "requests",
    summary = "Approve an access request",
    description = "Books the window on the property and approves the request in one step. When the property is \
fully booked for the window the request stays pending.",
    params(("id" = uuid::Uuid, Path, description = "Access request ID")),
    request_body = ApproveRequest,
    responses(
        (status = 200, description = "Approved request and confirmed booking", body = ApprovalResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not the landowner"),
        (status = 404, description = "Access request not found"),
        (status = 409, description = "Request not pending, or the property is fully booked for the window"),
        (status = 422, description = "Window is empty, inverted, or not in the future"),
    ),
    security(("ProxyUser" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id, request_id = %id))]
pub async fn approve_request(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<AccessRequestId>,
    Json(approve): Json<ApproveRequest>,
) -> Result<Json<ApprovalResponse>> {
    let landowner_id = user.require_landowner()?;
    approve.validate()?;

    let (approved, booking) = state
        .lifecycle
        .approve(id, landowner_id, approve.start_time, approve.end_time, approve.instructions)
        .await?;
    Ok(Json(ApprovalResponse {
        request: approved.into(),
        booking: booking.into(),
    }))
}

#[utoipa::path(
    post,
    path = "/requests/{id}/reject",
    tag = "requests",
    summary = "Reject an access request",
    params(("id" = uuid::Uuid, Path, description = "Access request ID")),
    responses(
        (status = 200, description = "Rejected request", body = AccessRequestResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not the landowner"),
        (status = 404, description = "Access request not found"),
        (status = 409, description = "Request not pending"),
    ),
    security(("ProxyUser" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id, request_id = %id))]
pub async fn reject_request(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<AccessRequestId>,
) -> Result<Json<AccessRequestResponse>> {
    let landowner_id = user.require_landowner()?;
    let rejected = state.lifecycle.reject(id, landowner_id).await?;
    Ok(Json(rejected.into()))
}

#[utoipa::path(
    get,
    path = "/requests/{id}/messages",
    tag = "requests",
    summary = "Read the request's conversation",
    params(("id" = uuid::Uuid, Path, description = "Access request ID")),
    responses(
        (status = 200, description = "Messages, oldest first", body = Vec<MessageResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is neither the hunter nor the landowner"),
        (status = 404, description = "Access request not found"),
    ),
    security(("ProxyUser" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id, request_id = %id))]
pub async fn list_messages(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<AccessRequestId>,
) -> Result<Json<Vec<MessageResponse>>> {
    let messages = state.lifecycle.messages(id, user.id).await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/requests/{id}/messages",
    tag = "requests",
    summary = "Post to the request's conversation",
    params(("id" = uuid::Uuid, Path, description = "Access request ID")),
    request_body = MessageCreate,
    responses(
        (status = 201, description = "Message appended", body = MessageResponse),
        (status = 400, description = "Empty or overlong body"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is neither the hunter nor the landowner"),
        (status = 404, description = "Access request not found"),
    ),
    security(("ProxyUser" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id, request_id = %id))]
pub async fn post_message(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<AccessRequestId>,
    Json(create): Json<MessageCreate>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    create.validate()?;
    let message = state.lifecycle.post_message(id, user.id, create.body).await?;
    Ok((StatusCode::CREATED, Json(message.into())))
}
