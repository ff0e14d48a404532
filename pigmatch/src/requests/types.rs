//! Access request types.
//!
//! A hunter's request to act on a sighting moves through a small lifecycle which is encoded
//! with the typestate pattern: `AccessRequest<S>` only offers the transitions that are legal
//! from state `S`. Pending is the only state with outgoing transitions; approved and rejected
//! are terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::types::{AccessRequestId, MatchId, PropertyId, SightingId, UserId};

/// Marker trait for valid request states.
pub trait RequestState: Send + Sync {}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessRequest<S: RequestState> {
    pub state: S,
    pub data: AccessRequestData,
}

/// State-independent fields of an access request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequestData {
    pub id: AccessRequestId,
    pub sighting_id: SightingId,
    pub property_id: PropertyId,
    pub hunter_id: UserId,
    /// Owner of the sighting's property at the time the request was made
    pub landowner_id: UserId,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AccessRequestData {
    pub fn is_party(&self, user_id: UserId) -> bool {
        self.hunter_id == user_id || self.landowner_id == user_id
    }
}

// ============================================================================
// Request States
// ============================================================================

/// Waiting for the landowner's decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Pending {}

impl RequestState for Pending {}

/// Approved; a confirmed match was created in the same step.
#[derive(Debug, Clone, PartialEq)]
pub struct Approved {
    pub match_id: MatchId,
    pub resolved_at: DateTime<Utc>,
}

impl RequestState for Approved {}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub resolved_at: DateTime<Utc>,
}

impl RequestState for Rejected {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            other => Err(other.to_string()),
        }
    }
}

// ============================================================================
// Unified Request Representation
// ============================================================================

/// An access request in any state, as held by storage and returned by the API.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyAccessRequest {
    Pending(AccessRequest<Pending>),
    Approved(AccessRequest<Approved>),
    Rejected(AccessRequest<Rejected>),
}

impl AnyAccessRequest {
    pub fn data(&self) -> &AccessRequestData {
        match self {
            AnyAccessRequest::Pending(r) => &r.data,
            AnyAccessRequest::Approved(r) => &r.data,
            AnyAccessRequest::Rejected(r) => &r.data,
        }
    }

    pub fn id(&self) -> AccessRequestId {
        self.data().id
    }

    pub fn status(&self) -> RequestStatus {
        match self {
            AnyAccessRequest::Pending(_) => RequestStatus::Pending,
            AnyAccessRequest::Approved(_) => RequestStatus::Approved,
            AnyAccessRequest::Rejected(_) => RequestStatus::Rejected,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AnyAccessRequest::Pending(_))
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        match self {
            AnyAccessRequest::Pending(_) => None,
            AnyAccessRequest::Approved(r) => Some(r.state.resolved_at),
            AnyAccessRequest::Rejected(r) => Some(r.state.resolved_at),
        }
    }

    pub fn match_id(&self) -> Option<MatchId> {
        match self {
            AnyAccessRequest::Approved(r) => Some(r.state.match_id),
            _ => None,
        }
    }

    pub fn into_pending(self) -> Option<AccessRequest<Pending>> {
        match self {
            AnyAccessRequest::Pending(r) => Some(r),
            _ => None,
        }
    }
}

impl From<AccessRequest<Pending>> for AnyAccessRequest {
    fn from(r: AccessRequest<Pending>) -> Self {
        AnyAccessRequest::Pending(r)
    }
}

impl From<AccessRequest<Approved>> for AnyAccessRequest {
    fn from(r: AccessRequest<Approved>) -> Self {
        AnyAccessRequest::Approved(r)
    }
}

impl From<AccessRequest<Rejected>> for AnyAccessRequest {
    fn from(r: AccessRequest<Rejected>) -> Self {
        AnyAccessRequest::Rejected(r)
    }
}
