use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::assessment::Assessment;
use crate::geo::GeoPoint;
use crate::types::{PropertyId, SightingId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SightingStatus {
    Open,
    Closed,
}

impl SightingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SightingStatus::Open => "open",
            SightingStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for SightingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SightingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(SightingStatus::Open),
            "closed" => Ok(SightingStatus::Closed),
            other => Err(other.to_string()),
        }
    }
}

/// A landowner-reported observation at a point and time. Belongs to exactly one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sighting {
    pub id: SightingId,
    pub property_id: PropertyId,
    pub reporter_id: UserId,
    pub location: GeoPoint,
    pub seen_at: DateTime<Utc>,
    pub count_estimate: Option<u32>,
    pub notes: Option<String>,
    pub status: SightingStatus,
    pub credibility_score: f64,
    pub tags: Vec<String>,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

impl Sighting {
    pub fn is_open(&self) -> bool {
        self.status == SightingStatus::Open
    }
}

/// Database request for recording a new sighting
#[derive(Debug, Clone)]
pub struct SightingCreateDBRequest {
    pub property_id: PropertyId,
    pub reporter_id: UserId,
    pub location: GeoPoint,
    pub seen_at: DateTime<Utc>,
    pub count_estimate: Option<u32>,
    pub notes: Option<String>,
    pub assessment: Assessment,
}
