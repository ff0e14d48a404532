//! API request/response models for hunter subscriptions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::validate_point;
use crate::db::models::subscriptions::{Subscription, SubscriptionCreateDBRequest};
use crate::errors::{Error, Result};
use crate::geo::GeoPoint;
use crate::types::{SubscriptionId, UserId};

pub const MAX_RADIUS_KM: f64 = 500.0;

/// Request body for subscribing to sightings within a circle.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionCreate {
    pub center: GeoPoint,
    /// Radius in kilometres, greater than 0 and at most 500
    #[schema(example = 25.0)]
    pub radius_km: f64,
}

impl SubscriptionCreate {
    pub fn validate(&self) -> Result<()> {
        validate_point("center", &self.center)?;
        if !(self.radius_km > 0.0 && self.radius_km <= MAX_RADIUS_KM) {
            return Err(Error::bad_request(format!(
                "radius_km must be greater than 0 and at most {MAX_RADIUS_KM}"
            )));
        }
        Ok(())
    }

    pub fn into_db_request(self, hunter_id: UserId) -> SubscriptionCreateDBRequest {
        SubscriptionCreateDBRequest {
            hunter_id,
            center: self.center,
            radius_km: self.radius_km,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: SubscriptionId,
    #[schema(value_type = String, format = "uuid")]
    pub hunter_id: UserId,
    pub center: GeoPoint,
    pub radius_km: f64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(s: Subscription) -> Self {
        Self {
            id: s.id,
            hunter_id: s.hunter_id,
            center: s.center,
            radius_km: s.radius_km,
            active: s.active,
            created_at: s.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_bounds() {
        let center = GeoPoint { lat: 21.3, lng: -157.8 };
        for (radius_km, ok) in [(0.0, false), (-1.0, false), (0.5, true), (500.0, true), (500.1, false), (f64::NAN, false)] {
            let create = SubscriptionCreate { center, radius_km };
            assert_eq!(create.validate().is_ok(), ok, "radius {radius_km}");
        }
    }
}
