use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::api::models::pagination::PaginatedResponse;
use crate::api::models::properties::{ListPropertiesQuery, PropertyCreate, PropertyResponse, PropertyUpdate};
use crate::auth::CurrentUser;
use crate::db::models::properties::PropertyFilter;
use crate::errors::{Error, Result};
use crate::notifications;
use crate::storage::Storage;
use crate::types::PropertyId;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/properties",
    tag = "properties",
    summary = "Register a property",
    request_body = PropertyCreate,
    responses(
        (status = 201, description = "Property created", body = PropertyResponse),
        (status = 400, description = "Invalid property"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not a landowner"),
    ),
    security(("ProxyUser" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn create_property(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(create): Json<PropertyCreate>,
) -> Result<(StatusCode, Json<PropertyResponse>)> {
    let owner_id = user.require_landowner()?;
    create.validate()?;

    let property = state
        .storage
        .create_property(create.into_db_request(owner_id), state.clock.now())
        .await?;
    state.listings.invalidate_all();
    notifications::property_created(&property);

    Ok((StatusCode::CREATED, Json(property.into())))
}

#[utoipa::path(
    get,
    path = "/properties",
    tag = "properties",
    summary = "Search properties",
    params(ListPropertiesQuery),
    responses(
        (status = 200, description = "Matching properties, oldest first", body = PaginatedResponse<PropertyResponse>),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("ProxyUser" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_properties(
    State(state): State<AppState>,
    _: CurrentUser,
    Query(query): Query<ListPropertiesQuery>,
) -> Result<Json<PaginatedResponse<PropertyResponse>>> {
    let filter = query.filter()?;

    let properties = match state.listings.get(&filter).await {
        Some(cached) => {
            tracing::trace!("Property listing served from cache");
            cached
        }
        None => {
            let generation = state.listings.generation();
            let fresh = Arc::new(state.storage.list_properties(&filter).await?);
            state.listings.insert(&filter, generation, fresh.clone()).await;
            fresh
        }
    };

    let page = query.pagination.page(
        properties.iter().cloned().map(PropertyResponse::from),
        &state.config.pagination,
    );
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/properties/mine",
    tag = "properties",
    summary = "List own properties",
    responses(
        (status = 200, description = "The caller's properties, oldest first", body = Vec<PropertyResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not a landowner"),
    ),
    security(("ProxyUser" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_my_properties(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Vec<PropertyResponse>>> {
    let owner_id = user.require_landowner()?;
    let properties = state.storage.list_properties(&PropertyFilter::for_owner(owner_id)).await?;
    Ok(Json(properties.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    patch,
    path = "/properties/{id}",
    tag = "properties",
    summary = "Update a property",
    params(("id" = uuid::Uuid, Path, description = "Property ID")),
    request_body = PropertyUpdate,
    responses(
        (status = 200, description = "Updated property", body = PropertyResponse),
        (status = 400, description = "Invalid update"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller does not own the property"),
        (status = 404, description = "Property not found"),
    ),
    security(("ProxyUser" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id, property_id = %id))]
pub async fn update_property(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<PropertyId>,
    Json(update): Json<PropertyUpdate>,
) -> Result<Json<PropertyResponse>> {
    let owner_id = user.require_landowner()?;
    update.validate()?;

    let existing = state
        .storage
        .get_property(id)
        .await?
        .ok_or_else(|| Error::not_found("Property", id))?;
    if existing.owner_id != owner_id {
        return Err(Error::forbidden("only the owner can update this property"));
    }

    let updated = state.storage.update_property(id, update.into()).await?;
    state.listings.invalidate_all();
    Ok(Json(updated.into()))
}
