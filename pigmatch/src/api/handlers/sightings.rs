use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::AppState;
use crate::api::models::pagination::PaginatedResponse;
use crate::api::models::requests::{AccessRequestCreate, AccessRequestResponse};
use crate::api::models::sightings::{
    SightingCreate, SightingReportedResponse, SightingResponse, VisibleSightingResponse, VisibleSightingsQuery,
};
use crate::assessment::assess_notes;
use crate::auth::CurrentUser;
use crate::db::models::sightings::SightingCreateDBRequest;
use crate::errors::{Error, Result};
use crate::notifications;
use crate::storage::Storage;
use crate::types::SightingId;
use crate::visibility::{HunterView, interested_hunters};

#[utoipa::path(
    post,
    path = "/sightings",
    tag = "sightings",
    summary = "Report a sighting",
    description = "Report pigs seen on one of the caller's properties. The location defaults to the property's \
location. The response lists the hunters whose active subscriptions cover the sighting.",
    request_body = SightingCreate,
    responses(
        (status = 201, description = "Sighting recorded", body = SightingReportedResponse),
        (status = 400, description = "Invalid sighting"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller does not own the property"),
        (status = 404, description = "Property not found"),
    ),
    security(("ProxyUser" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id, property_id = %create.property_id))]
pub async fn report_sighting(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(create): Json<SightingCreate>,
) -> Result<(StatusCode, Json<SightingReportedResponse>)> {
    let reporter_id = user.require_landowner()?;
    create.validate()?;

    let property = state
        .storage
        .get_property(create.property_id)
        .await?
        .ok_or_else(|| Error::not_found("Property", create.property_id))?;
    if property.owner_id != reporter_id {
        return Err(Error::forbidden("sightings can only be reported on your own properties"));
    }

    let now = state.clock.now();
    let assessment = assess_notes(create.notes.as_deref());
    let sighting = state
        .storage
        .create_sighting(
            SightingCreateDBRequest {
                property_id: property.id,
                reporter_id,
                location: create.location.unwrap_or(property.location),
                seen_at: create.seen_at.unwrap_or(now),
                count_estimate: create.count_estimate,
                notes: create.notes,
                assessment,
            },
            now,
        )
        .await?;

    let subscriptions = state.storage.active_subscriptions().await?;
    let interested = interested_hunters(&sighting, &subscriptions);
    notifications::sighting_reported(&sighting, interested.len());

    Ok((
        StatusCode::CREATED,
        Json(SightingReportedResponse {
            sighting: sighting.into(),
            interested_hunters: interested,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/sightings/visible",
    tag = "sightings",
    summary = "List sightings visible to the caller",
    description = "Open sightings the calling hunter may request access to, under the deployment's visibility \
policy. Nearest first when `lat` and `lng` are given.",
    params(VisibleSightingsQuery),
    responses(
        (status = 200, description = "Visible sightings", body = PaginatedResponse<VisibleSightingResponse>),
        (status = 400, description = "Invalid location"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not a hunter"),
    ),
    security(("ProxyUser" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id, policy = state.visibility.policy().as_str()))]
pub async fn list_visible_sightings(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<VisibleSightingsQuery>,
) -> Result<Json<PaginatedResponse<VisibleSightingResponse>>> {
    let hunter_id = user.require_hunter()?;
    let location = query.location()?;

    let hunter = HunterView {
        hunter_id,
        subscriptions: state.storage.subscriptions_for_hunter(hunter_id).await?,
        location,
    };
    let sightings = state.storage.open_sightings().await?;

    let mut properties = HashMap::new();
    for sighting in &sightings {
        if properties.contains_key(&sighting.property_id) {
            continue;
        }
        if let Some(property) = state.storage.get_property(sighting.property_id).await? {
            properties.insert(property.id, property);
        }
    }

    let visible = state.visibility.visible_sightings(&hunter, &sightings, &properties);
    tracing::debug!(candidates = sightings.len(), visible = visible.len(), "Resolved visible sightings");

    let page = query
        .pagination
        .page(visible.into_iter().map(VisibleSightingResponse::from), &state.config.pagination);
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/sightings/{id}",
    tag = "sightings",
    summary = "Get a sighting",
    params(("id" = uuid::Uuid, Path, description = "Sighting ID")),
    responses(
        (status = 200, description = "Sighting", body = SightingResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Sighting not found"),
    ),
    security(("ProxyUser" = []))
)]
#[tracing::instrument(skip_all, fields(sighting_id = %id))]
pub async fn get_sighting(
    State(state): State<AppState>,
    _: CurrentUser,
    Path(id): Path<SightingId>,
) -> Result<Json<SightingResponse>> {
    let sighting = state
        .storage
        .get_sighting(id)
        .await?
        .ok_or_else(|| Error::not_found("Sighting", id))?;
    Ok(Json(sighting.into()))
}

#[utoipa::path(
    post,
    path = "/sightings/{id}/close",
    tag = "sightings",
    summary = "Close a sighting",
    description = "Closed sightings are no longer visible and cannot be requested. Closing twice is a no-op.",
    params(("id" = uuid::Uuid, Path, description = "Sighting ID")),
    responses(
        (status = 200, description = "Closed sighting", body = SightingResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not the reporter"),
        (status = 404, description = "Sighting not found"),
    ),
    security(("ProxyUser" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id, sighting_id = %id))]
pub async fn close_sighting(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<SightingId>,
) -> Result<Json<SightingResponse>> {
    let reporter_id = user.require_landowner()?;
    let sighting = state
        .storage
        .get_sighting(id)
        .await?
        .ok_or_else(|| Error::not_found("Sighting", id))?;
    if sighting.reporter_id != reporter_id {
        return Err(Error::forbidden("only the reporter can close this sighting"));
    }
    if !sighting.is_open() {
        return Ok(Json(sighting.into()));
    }

    let closed = state.storage.close_sighting(id).await?;
    Ok(Json(closed.into()))
}

#[utoipa::path(
    post,
    path = "/sightings/{id}/requests",
    tag = "requests",
    summary = "Request access to a sighting",
    params(("id" = uuid::Uuid, Path, description = "Sighting ID")),
    request_body = AccessRequestCreate,
    responses(
        (status = 201, description = "Pending access request", body = AccessRequestResponse),
        (status = 400, description = "Message too long"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not a hunter, owns the property, or cannot see the sighting"),
        (status = 404, description = "Sighting not found"),
        (status = 409, description = "Sighting closed, or a pending request already exists"),
    ),
    security(("ProxyUser" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id, sighting_id = %id))]
pub async fn request_access(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<SightingId>,
    Json(create): Json<AccessRequestCreate>,
) -> Result<(StatusCode, Json<AccessRequestResponse>)> {
    let hunter_id = user.require_hunter()?;
    create.validate()?;

    let request = state.lifecycle.create_request(hunter_id, id, create.message()).await?;
    Ok((StatusCode::CREATED, Json(request.into())))
}
