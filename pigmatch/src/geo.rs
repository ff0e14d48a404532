//! Distance and containment math over spherical coordinates.
//!
//! All functions here are pure. Coordinates are validated once at the API boundary
//! ([`GeoPoint::validate`]); the math itself accepts every in-range value including the
//! poles and the antimeridian without wrapping or panicking.
//!
//! # Coordinate System
//!
//! - Latitude: degrees north (-90 to 90)
//! - Longitude: degrees east (-180 to 180)
//! - Distance: kilometres on a sphere of radius [`EARTH_RADIUS_KM`]

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point on the Earth's surface in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Reason a coordinate pair was refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),
}

impl GeoPoint {
    /// Build a validated point.
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoordinateError> {
        let point = Self { lat, lng };
        point.validate()?;
        Ok(point)
    }

    /// Check the point lies within the valid coordinate ranges. NaN is rejected.
    pub fn validate(&self) -> Result<(), CoordinateError> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(CoordinateError::Latitude(self.lat));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(CoordinateError::Longitude(self.lng));
        }
        Ok(())
    }
}

/// Great-circle distance between two points using the haversine formula.
///
/// Symmetric, and exactly `0.0` when `a == b`.
///
/// # Example
///
/// ```
/// use pigmatch::geo::{distance_km, GeoPoint};
///
/// // One degree of latitude is roughly 111 km
/// let d = distance_km(GeoPoint { lat: 0.0, lng: 0.0 }, GeoPoint { lat: 1.0, lng: 0.0 });
/// assert!((d - 111.19).abs() < 0.1);
/// ```
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1.0 for antipodal points, which would make asin NaN
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// True iff `point` lies within `radius_km` of `center`. The boundary is inclusive.
pub fn within_radius(center: GeoPoint, radius_km: f64, point: GeoPoint) -> bool {
    distance_km(center, point) <= radius_km
}

/// An axis-aligned latitude/longitude box. Any bound left unset is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BoundingBox {
    pub min_lat: Option<f64>,
    pub max_lat: Option<f64>,
    pub min_lng: Option<f64>,
    pub max_lng: Option<f64>,
}

impl BoundingBox {
    pub fn is_unbounded(&self) -> bool {
        self.min_lat.is_none() && self.max_lat.is_none() && self.min_lng.is_none() && self.max_lng.is_none()
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        self.min_lat.is_none_or(|min| point.lat >= min)
            && self.max_lat.is_none_or(|max| point.lat <= max)
            && self.min_lng.is_none_or(|min| point.lng >= min)
            && self.max_lng.is_none_or(|max| point.lng <= max)
    }
}
