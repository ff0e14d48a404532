use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::booking::BookingWindow;
use crate::types::{AccessRequestId, MatchId, PropertyId, SightingId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Confirmed,
    Cancelled,
    Completed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Confirmed => "confirmed",
            MatchStatus::Cancelled => "cancelled",
            MatchStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(MatchStatus::Confirmed),
            "cancelled" => Ok(MatchStatus::Cancelled),
            "completed" => Ok(MatchStatus::Completed),
            other => Err(other.to_string()),
        }
    }
}

/// A confirmed booking: one hunter on one property for `[start_time, end_time)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub request_id: AccessRequestId,
    pub sighting_id: SightingId,
    pub property_id: PropertyId,
    pub landowner_id: UserId,
    pub hunter_id: UserId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub instructions: Option<String>,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<UserId>,
}

impl Match {
    pub fn window(&self) -> BookingWindow {
        BookingWindow {
            start: self.start_time,
            end: self.end_time,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == MatchStatus::Confirmed
    }

    pub fn is_party(&self, user_id: UserId) -> bool {
        self.hunter_id == user_id || self.landowner_id == user_id
    }
}
