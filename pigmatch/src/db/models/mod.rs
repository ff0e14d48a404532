//! Record models for stored entities.
//!
//! These models are what the storage backends persist and return. They are kept separate
//! from the API models in [`crate::api::models`] so storage and wire representations can
//! evolve independently; API models implement `From` conversions from these records.
//!
//! - [`properties`]: landowner parcels, the unit bookings are scheduled against
//! - [`sightings`]: landowner-reported observations on a property
//! - [`subscriptions`]: hunter areas of interest
//! - [`matches`]: confirmed, time-bounded grants of access
//! - [`messages`]: conversation thread entries keyed by access request

pub mod matches;
pub mod messages;
pub mod properties;
pub mod sightings;
pub mod subscriptions;
