//! API request/response models for sightings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

use super::pagination::Pagination;
use super::properties::PropertyResponse;
use super::{validate_optional_text, validate_point};
use crate::db::models::sightings::{Sighting, SightingStatus};
use crate::errors::{Error, Result};
use crate::geo::GeoPoint;
use crate::types::{PropertyId, SightingId, UserId};
use crate::visibility::{InterestedHunter, VisibleSighting};

pub const MAX_COUNT_ESTIMATE: u32 = 1000;
const NOTES_MAX_CHARS: usize = 2000;

/// Request body for reporting a sighting on one of the caller's properties.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SightingCreate {
    #[schema(value_type = String, format = "uuid")]
    pub property_id: PropertyId,
    /// Where the pigs were seen. Defaults to the property's location.
    pub location: Option<GeoPoint>,
    /// When the pigs were seen. Defaults to now.
    pub seen_at: Option<DateTime<Utc>>,
    /// Estimated head count, 0 to 1000
    pub count_estimate: Option<u32>,
    #[schema(example = "Fresh rooting along the fence line, maybe 8 pigs")]
    pub notes: Option<String>,
}

impl SightingCreate {
    pub fn validate(&self) -> Result<()> {
        if let Some(location) = &self.location {
            validate_point("location", location)?;
        }
        if self.count_estimate.is_some_and(|c| c > MAX_COUNT_ESTIMATE) {
            return Err(Error::bad_request(format!("count_estimate must be at most {MAX_COUNT_ESTIMATE}")));
        }
        validate_optional_text("notes", self.notes.as_deref(), NOTES_MAX_CHARS)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SightingResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: SightingId,
    #[schema(value_type = String, format = "uuid")]
    pub property_id: PropertyId,
    #[schema(value_type = String, format = "uuid")]
    pub reporter_id: UserId,
    pub location: GeoPoint,
    pub seen_at: DateTime<Utc>,
    pub count_estimate: Option<u32>,
    pub notes: Option<String>,
    pub status: SightingStatus,
    /// Heuristic credibility of the report, 0 to 1
    pub credibility_score: f64,
    pub tags: Vec<String>,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

impl From<Sighting> for SightingResponse {
    fn from(s: Sighting) -> Self {
        Self {
            id: s.id,
            property_id: s.property_id,
            reporter_id: s.reporter_id,
            location: s.location,
            seen_at: s.seen_at,
            count_estimate: s.count_estimate,
            notes: s.notes,
            status: s.status,
            credibility_score: s.credibility_score,
            tags: s.tags,
            summary: s.summary,
            created_at: s.created_at,
        }
    }
}

/// A freshly reported sighting and the hunters whose subscriptions cover it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SightingReportedResponse {
    pub sighting: SightingResponse,
    pub interested_hunters: Vec<InterestedHunter>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VisibleSightingResponse {
    pub sighting: SightingResponse,
    pub property: PropertyResponse,
    /// Distance from the supplied location, when one was given
    pub distance_km: Option<f64>,
}

impl From<VisibleSighting> for VisibleSightingResponse {
    fn from(v: VisibleSighting) -> Self {
        Self {
            sighting: v.sighting.into(),
            property: v.property.into(),
            distance_km: v.distance_km,
        }
    }
}

/// Query parameters for listing visible sightings
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct VisibleSightingsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Caller's latitude, used for distance ordering. Requires `lng`.
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub lat: Option<f64>,
    /// Caller's longitude, used for distance ordering. Requires `lat`.
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub lng: Option<f64>,
}

impl VisibleSightingsQuery {
    pub fn location(&self) -> Result<Option<GeoPoint>> {
        match (self.lat, self.lng) {
            (None, None) => Ok(None),
            (Some(lat), Some(lng)) => GeoPoint::new(lat, lng)
                .map(Some)
                .map_err(|e| Error::bad_request(e.to_string())),
            _ => Err(Error::bad_request("lat and lng must be given together")),
        }
    }
}
