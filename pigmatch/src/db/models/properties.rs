use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{BoundingBox, GeoPoint};
use crate::types::{PropertyId, UserId};

/// A landowner's parcel. Bookings are scheduled against properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub owner_id: UserId,
    pub name: String,
    pub location: GeoPoint,
    pub notes: Option<String>,
    pub island: Option<String>,
    /// Maximum number of concurrently booked hunters. Unset means single occupancy.
    pub max_hunters: Option<u32>,
    pub size_acres: Option<f64>,
    pub daily_rate: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Property {
    /// Number of confirmed bookings that may overlap at any instant.
    pub fn capacity(&self) -> u32 {
        crate::booking::capacity(self.max_hunters)
    }
}

/// Database request for creating a new property
#[derive(Debug, Clone)]
pub struct PropertyCreateDBRequest {
    pub owner_id: UserId,
    pub name: String,
    pub location: GeoPoint,
    pub notes: Option<String>,
    pub island: Option<String>,
    pub max_hunters: Option<u32>,
    pub size_acres: Option<f64>,
    pub daily_rate: Option<f64>,
}

/// Database request for updating a property. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct PropertyUpdateDBRequest {
    pub name: Option<String>,
    pub location: Option<GeoPoint>,
    pub notes: Option<String>,
    pub island: Option<String>,
    pub max_hunters: Option<u32>,
    pub size_acres: Option<f64>,
    pub daily_rate: Option<f64>,
}

impl PropertyUpdateDBRequest {
    pub fn apply(&self, property: &mut Property) {
        if let Some(name) = &self.name {
            property.name = name.clone();
        }
        if let Some(location) = self.location {
            property.location = location;
        }
        if let Some(notes) = &self.notes {
            property.notes = Some(notes.clone());
        }
        if let Some(island) = &self.island {
            property.island = Some(island.clone());
        }
        if let Some(max_hunters) = self.max_hunters {
            property.max_hunters = Some(max_hunters);
        }
        if let Some(size_acres) = self.size_acres {
            property.size_acres = Some(size_acres);
        }
        if let Some(daily_rate) = self.daily_rate {
            property.daily_rate = Some(daily_rate);
        }
    }
}

/// Filter for listing properties. Unset fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyFilter {
    pub owner_id: Option<UserId>,
    /// Case-insensitive exact island match
    pub island: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Case-insensitive substring of the property name
    pub name: Option<String>,
    pub bbox: BoundingBox,
}

impl PropertyFilter {
    pub fn for_owner(owner_id: UserId) -> Self {
        Self {
            owner_id: Some(owner_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, property: &Property) -> bool {
        if self.owner_id.is_some_and(|owner| owner != property.owner_id) {
            return false;
        }
        if let Some(island) = &self.island {
            match &property.island {
                Some(p) if p.eq_ignore_ascii_case(island) => {}
                _ => return false,
            }
        }
        // Properties without a rate never satisfy a price filter
        if self.min_price.is_some() || self.max_price.is_some() {
            let Some(rate) = property.daily_rate else {
                return false;
            };
            if self.min_price.is_some_and(|min| rate < min) || self.max_price.is_some_and(|max| rate > max) {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if !property.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }
        self.bbox.contains(property.location)
    }

    /// Stable key used by the listings cache.
    pub fn cache_key(&self) -> String {
        format!(
            "properties:owner={:?}:island={:?}:price={:?}-{:?}:name={:?}:bbox={:?},{:?},{:?},{:?}",
            self.owner_id,
            self.island.as_ref().map(|s| s.to_lowercase()),
            self.min_price,
            self.max_price,
            self.name.as_ref().map(|s| s.to_lowercase()),
            self.bbox.min_lat,
            self.bbox.max_lat,
            self.bbox.min_lng,
            self.bbox.max_lng,
        )
    }
}
