use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{GeoPoint, within_radius};
use crate::types::{SubscriptionId, UserId};

/// A hunter's declared area of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub hunter_id: UserId,
    pub center: GeoPoint,
    pub radius_km: f64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether this subscription is active and its circle contains `point`.
    pub fn covers(&self, point: GeoPoint) -> bool {
        self.active && within_radius(self.center, self.radius_km, point)
    }
}

/// Database request for creating a subscription
#[derive(Debug, Clone)]
pub struct SubscriptionCreateDBRequest {
    pub hunter_id: UserId,
    pub center: GeoPoint,
    pub radius_km: f64,
}
