//! API request/response models for access requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::matches::MatchResponse;
use super::validate_optional_text;
use crate::errors::Result;
use crate::requests::{AccessRequest, AnyAccessRequest, RequestState, RequestStatus};
use crate::types::{AccessRequestId, MatchId, PropertyId, SightingId, UserId};

pub const MESSAGE_MAX_CHARS: usize = 500;
const INSTRUCTIONS_MAX_CHARS: usize = 2000;

/// Request body for asking a landowner for access to a sighting.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AccessRequestCreate {
    /// Opening message, at most 500 characters. Starts the request's conversation.
    #[schema(example = "Licensed, two of us, can be there at dawn")]
    pub message: Option<String>,
}

impl AccessRequestCreate {
    pub fn validate(&self) -> Result<()> {
        validate_optional_text("message", self.message.as_deref(), MESSAGE_MAX_CHARS)
    }

    /// Blank messages are dropped rather than opening an empty thread.
    pub fn message(self) -> Option<String> {
        self.message.filter(|m| !m.trim().is_empty())
    }
}

/// Request body for approving an access request with a booking window.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApproveRequest {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Directions for the hunter, e.g. gate code and where to park
    pub instructions: Option<String>,
}

impl ApproveRequest {
    pub fn validate(&self) -> Result<()> {
        validate_optional_text("instructions", self.instructions.as_deref(), INSTRUCTIONS_MAX_CHARS)
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListRequestsQuery {
    /// Only return requests in this status
    pub status: Option<RequestStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AccessRequestResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: AccessRequestId,
    #[schema(value_type = String, format = "uuid")]
    pub sighting_id: SightingId,
    #[schema(value_type = String, format = "uuid")]
    pub property_id: PropertyId,
    #[schema(value_type = String, format = "uuid")]
    pub hunter_id: UserId,
    #[schema(value_type = String, format = "uuid")]
    pub landowner_id: UserId,
    pub message: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Booking created on approval
    #[schema(value_type = Option<String>, format = "uuid")]
    pub match_id: Option<MatchId>,
}

impl From<AnyAccessRequest> for AccessRequestResponse {
    fn from(request: AnyAccessRequest) -> Self {
        let status = request.status();
        let resolved_at = request.resolved_at();
        let match_id = request.match_id();
        let data = request.data().clone();
        Self {
            id: data.id,
            sighting_id: data.sighting_id,
            property_id: data.property_id,
            hunter_id: data.hunter_id,
            landowner_id: data.landowner_id,
            message: data.message,
            status,
            created_at: data.created_at,
            resolved_at,
            match_id,
        }
    }
}

impl<S: RequestState> From<AccessRequest<S>> for AccessRequestResponse
where
    AnyAccessRequest: From<AccessRequest<S>>,
{
    fn from(request: AccessRequest<S>) -> Self {
        AnyAccessRequest::from(request).into()
    }
}

/// Result of an approval: the approved request and its confirmed booking.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApprovalResponse {
    pub request: AccessRequestResponse,
    #[serde(rename = "match")]
    pub booking: MatchResponse,
}
