//! API response models for bookings (matches).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::db::models::matches::{Match, MatchStatus};
use crate::types::{AccessRequestId, MatchId, PropertyId, SightingId, UserId};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListMatchesQuery {
    /// Only return bookings in this status
    pub status: Option<MatchStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MatchResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: MatchId,
    #[schema(value_type = String, format = "uuid")]
    pub request_id: AccessRequestId,
    #[schema(value_type = String, format = "uuid")]
    pub sighting_id: SightingId,
    #[schema(value_type = String, format = "uuid")]
    pub property_id: PropertyId,
    #[schema(value_type = String, format = "uuid")]
    pub landowner_id: UserId,
    #[schema(value_type = String, format = "uuid")]
    pub hunter_id: UserId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub instructions: Option<String>,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub cancelled_by: Option<UserId>,
}

impl From<Match> for MatchResponse {
    fn from(m: Match) -> Self {
        Self {
            id: m.id,
            request_id: m.request_id,
            sighting_id: m.sighting_id,
            property_id: m.property_id,
            landowner_id: m.landowner_id,
            hunter_id: m.hunter_id,
            start_time: m.start_time,
            end_time: m.end_time,
            instructions: m.instructions,
            status: m.status,
            created_at: m.created_at,
            cancelled_at: m.cancelled_at,
            cancelled_by: m.cancelled_by,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompleteElapsedResponse {
    /// Bookings moved from confirmed to completed by this sweep
    pub completed: u64,
}
