//! Domain audit events.
//!
//! Each notable state change is emitted as a structured `info` event with an `event` field so
//! downstream collectors (log shippers, analytics) can pick them out. Delivery to the parties
//! themselves is by polling the API.

use crate::types::abbrev_uuid;
use crate::db::models::{matches::Match, properties::Property, sightings::Sighting};
use crate::requests::AccessRequestData;

pub fn property_created(property: &Property) {
    tracing::info!(
        event = "property_created",
        property_id = %property.id,
        owner_id = %abbrev_uuid(&property.owner_id),
        "Property created"
    );
}

pub fn sighting_reported(sighting: &Sighting, interested_hunters: usize) {
    tracing::info!(
        event = "sighting_reported",
        sighting_id = %sighting.id,
        property_id = %sighting.property_id,
        credibility_score = sighting.credibility_score,
        interested_hunters,
        "Sighting reported"
    );
}

pub fn access_requested(request: &AccessRequestData) {
    tracing::info!(
        event = "access_requested",
        request_id = %request.id,
        sighting_id = %request.sighting_id,
        hunter_id = %abbrev_uuid(&request.hunter_id),
        landowner_id = %abbrev_uuid(&request.landowner_id),
        "Access requested"
    );
}

pub fn access_rejected(request: &AccessRequestData) {
    tracing::info!(
        event = "access_rejected",
        request_id = %request.id,
        hunter_id = %abbrev_uuid(&request.hunter_id),
        "Access request rejected"
    );
}

/// Confirmation to both parties plus the booking analytics event.
pub fn booking_created(booking: &Match) {
    tracing::info!(
        event = "booking_created",
        match_id = %booking.id,
        request_id = %booking.request_id,
        property_id = %booking.property_id,
        hunter_id = %abbrev_uuid(&booking.hunter_id),
        landowner_id = %abbrev_uuid(&booking.landowner_id),
        start_time = %booking.start_time,
        end_time = %booking.end_time,
        duration_hours = (booking.end_time - booking.start_time).num_minutes() as f64 / 60.0,
        "Booking confirmed"
    );
}

pub fn booking_cancelled(booking: &Match) {
    tracing::info!(
        event = "booking_cancelled",
        match_id = %booking.id,
        property_id = %booking.property_id,
        cancelled_by = ?booking.cancelled_by,
        "Booking cancelled"
    );
}

pub fn bookings_completed(count: u64) {
    if count > 0 {
        tracing::info!(event = "bookings_completed", count, "Elapsed bookings completed");
    }
}
