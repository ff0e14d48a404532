//! HTTP request handlers, one module per resource.
//!
//! Each handler authenticates through the [`CurrentUser`](crate::auth::CurrentUser) extractor,
//! checks the caller's role, validates the body, and delegates to storage or to the
//! [`RequestLifecycle`](crate::requests::RequestLifecycle) and
//! [`BookingLedger`](crate::booking::BookingLedger) services. Errors convert to JSON responses
//! through [`crate::errors::Error`].

pub mod matches;
pub mod properties;
pub mod requests;
pub mod sightings;
pub mod subscriptions;
