//! API request/response models for properties.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

use super::pagination::Pagination;
use super::{validate_optional_text, validate_point, validate_positive, validate_text};
use crate::db::models::properties::{Property, PropertyCreateDBRequest, PropertyFilter, PropertyUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::geo::{BoundingBox, GeoPoint};
use crate::types::{PropertyId, UserId};

pub const MAX_HUNTERS_LIMIT: u32 = 100;
const NAME_MAX_CHARS: usize = 200;
const NOTES_MAX_CHARS: usize = 2000;

fn validate_max_hunters(max_hunters: Option<u32>) -> Result<()> {
    match max_hunters {
        Some(n) if !(1..=MAX_HUNTERS_LIMIT).contains(&n) => Err(Error::bad_request(format!(
            "max_hunters must be between 1 and {MAX_HUNTERS_LIMIT}"
        ))),
        _ => Ok(()),
    }
}

/// Request body for registering a property.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PropertyCreate {
    #[schema(example = "Mauka Pasture")]
    pub name: String,
    pub location: GeoPoint,
    pub notes: Option<String>,
    #[schema(example = "Hawaii")]
    pub island: Option<String>,
    /// Concurrent hunters allowed (1-100). Omit for single occupancy.
    pub max_hunters: Option<u32>,
    pub size_acres: Option<f64>,
    pub daily_rate: Option<f64>,
}

impl PropertyCreate {
    pub fn validate(&self) -> Result<()> {
        validate_text("name", &self.name, NAME_MAX_CHARS)?;
        validate_point("location", &self.location)?;
        validate_optional_text("notes", self.notes.as_deref(), NOTES_MAX_CHARS)?;
        validate_max_hunters(self.max_hunters)?;
        validate_positive("size_acres", self.size_acres)?;
        validate_positive("daily_rate", self.daily_rate)
    }

    pub fn into_db_request(self, owner_id: UserId) -> PropertyCreateDBRequest {
        PropertyCreateDBRequest {
            owner_id,
            name: self.name.trim().to_string(),
            location: self.location,
            notes: self.notes,
            island: self.island,
            max_hunters: self.max_hunters,
            size_acres: self.size_acres,
            daily_rate: self.daily_rate,
        }
    }
}

/// Partial update. Omitted fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PropertyUpdate {
    pub name: Option<String>,
    pub location: Option<GeoPoint>,
    pub notes: Option<String>,
    pub island: Option<String>,
    pub max_hunters: Option<u32>,
    pub size_acres: Option<f64>,
    pub daily_rate: Option<f64>,
}

impl PropertyUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_text("name", name, NAME_MAX_CHARS)?;
        }
        if let Some(location) = &self.location {
            validate_point("location", location)?;
        }
        validate_optional_text("notes", self.notes.as_deref(), NOTES_MAX_CHARS)?;
        validate_max_hunters(self.max_hunters)?;
        validate_positive("size_acres", self.size_acres)?;
        validate_positive("daily_rate", self.daily_rate)
    }
}

impl From<PropertyUpdate> for PropertyUpdateDBRequest {
    fn from(update: PropertyUpdate) -> Self {
        Self {
            name: update.name.map(|n| n.trim().to_string()),
            location: update.location,
            notes: update.notes,
            island: update.island,
            max_hunters: update.max_hunters,
            size_acres: update.size_acres,
            daily_rate: update.daily_rate,
        }
    }
}

/// Query parameters for searching properties
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListPropertiesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Exact island name, case-insensitive
    pub island: Option<String>,
    /// Case-insensitive substring of the property name
    pub name: Option<String>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub min_price: Option<f64>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub max_price: Option<f64>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub min_lat: Option<f64>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub max_lat: Option<f64>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub min_lng: Option<f64>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub max_lng: Option<f64>,
}

impl ListPropertiesQuery {
    pub fn filter(&self) -> Result<PropertyFilter> {
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(Error::bad_request("min_price must not exceed max_price"));
            }
        }
        if let (Some(min), Some(max)) = (self.min_lat, self.max_lat) {
            if min > max {
                return Err(Error::bad_request("min_lat must not exceed max_lat"));
            }
        }
        if let (Some(min), Some(max)) = (self.min_lng, self.max_lng) {
            if min > max {
                return Err(Error::bad_request("min_lng must not exceed max_lng"));
            }
        }

        Ok(PropertyFilter {
            owner_id: None,
            island: self.island.clone().filter(|s| !s.trim().is_empty()),
            min_price: self.min_price,
            max_price: self.max_price,
            name: self.name.clone().filter(|s| !s.trim().is_empty()),
            bbox: BoundingBox {
                min_lat: self.min_lat,
                max_lat: self.max_lat,
                min_lng: self.min_lng,
                max_lng: self.max_lng,
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PropertyResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PropertyId,
    #[schema(value_type = String, format = "uuid")]
    pub owner_id: UserId,
    pub name: String,
    pub location: GeoPoint,
    pub notes: Option<String>,
    pub island: Option<String>,
    pub max_hunters: Option<u32>,
    pub size_acres: Option<f64>,
    pub daily_rate: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl From<Property> for PropertyResponse {
    fn from(p: Property) -> Self {
        Self {
            id: p.id,
            owner_id: p.owner_id,
            name: p.name,
            location: p.location,
            notes: p.notes,
            island: p.island,
            max_hunters: p.max_hunters,
            size_acres: p.size_acres,
            daily_rate: p.daily_rate,
            created_at: p.created_at,
        }
    }
}
