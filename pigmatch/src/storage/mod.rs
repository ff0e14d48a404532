//! Persistence seam.
//!
//! Every state transition that has a concurrency invariant attached is a single storage
//! operation here, so implementations can make it atomic: inserting a pending request
//! (one pending per hunter and sighting), `reserve` (capacity check, match insert and the
//! request's pending → approved compare-and-set), and the conditional match/request updates.

use chrono::{DateTime, Utc};
use std::future::Future;

use crate::booking::BookingWindow;
use crate::db::models::{
    matches::{Match, MatchStatus},
    properties::{Property, PropertyCreateDBRequest, PropertyFilter, PropertyUpdateDBRequest},
    sightings::{Sighting, SightingCreateDBRequest},
    subscriptions::{Subscription, SubscriptionCreateDBRequest},
};
use crate::errors::Result;
use crate::requests::{AccessRequest, AnyAccessRequest, Approved, Pending, Rejected, RequestStatus};
use crate::types::{AccessRequestId, MatchId, PropertyId, SightingId, SubscriptionId, UserId};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStorage;
pub use postgres::PostgresStorage;

/// Everything needed to turn a pending request into a confirmed booking.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub request: AccessRequest<Pending>,
    pub window: BookingWindow,
    pub instructions: Option<String>,
    pub reserved_at: DateTime<Utc>,
}

/// Filter for listing access requests. Results are newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestQuery {
    pub landowner_id: Option<UserId>,
    pub hunter_id: Option<UserId>,
    pub status: Option<RequestStatus>,
}

impl RequestQuery {
    pub fn matches(&self, request: &AnyAccessRequest) -> bool {
        let data = request.data();
        self.landowner_id.is_none_or(|id| id == data.landowner_id)
            && self.hunter_id.is_none_or(|id| id == data.hunter_id)
            && self.status.is_none_or(|s| s == request.status())
    }
}

pub trait Storage: Send + Sync {
    // ---- properties ----

    fn create_property(&self, request: PropertyCreateDBRequest, now: DateTime<Utc>) -> impl Future<Output = Result<Property>> + Send;

    fn get_property(&self, id: PropertyId) -> impl Future<Output = Result<Option<Property>>> + Send;

    /// # Errors
    /// - `NotFound` if the property does not exist
    fn update_property(&self, id: PropertyId, update: PropertyUpdateDBRequest) -> impl Future<Output = Result<Property>> + Send;

    /// Properties matching `filter`, oldest first.
    fn list_properties(&self, filter: &PropertyFilter) -> impl Future<Output = Result<Vec<Property>>> + Send;

    // ---- subscriptions ----

    fn create_subscription(
        &self,
        request: SubscriptionCreateDBRequest,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Subscription>> + Send;

    fn get_subscription(&self, id: SubscriptionId) -> impl Future<Output = Result<Option<Subscription>>> + Send;

    /// All subscriptions of a hunter, active or not, oldest first.
    fn subscriptions_for_hunter(&self, hunter_id: UserId) -> impl Future<Output = Result<Vec<Subscription>>> + Send;

    fn active_subscriptions(&self) -> impl Future<Output = Result<Vec<Subscription>>> + Send;

    /// # Errors
    /// - `NotFound` if the subscription does not exist
    fn deactivate_subscription(&self, id: SubscriptionId) -> impl Future<Output = Result<Subscription>> + Send;

    // ---- sightings ----

    fn create_sighting(&self, request: SightingCreateDBRequest, now: DateTime<Utc>) -> impl Future<Output = Result<Sighting>> + Send;

    fn get_sighting(&self, id: SightingId) -> impl Future<Output = Result<Option<Sighting>>> + Send;

    fn open_sightings(&self) -> impl Future<Output = Result<Vec<Sighting>>> + Send;

    /// Idempotent.
    ///
    /// # Errors
    /// - `NotFound` if the sighting does not exist
    fn close_sighting(&self, id: SightingId) -> impl Future<Output = Result<Sighting>> + Send;

    // ---- access requests ----

    /// Record a new pending request.
    ///
    /// # Errors
    /// - `DuplicatePending` if the hunter already has a pending request for the sighting
    fn insert_request(&self, request: &AccessRequest<Pending>) -> impl Future<Output = Result<()>> + Send;

    fn get_request(&self, id: AccessRequestId) -> impl Future<Output = Result<Option<AnyAccessRequest>>> + Send;

    fn list_requests(&self, query: RequestQuery) -> impl Future<Output = Result<Vec<AnyAccessRequest>>> + Send;

    /// Compare-and-set pending → rejected.
    ///
    /// # Errors
    /// - `InvalidState` if the request is no longer pending
    fn reject_request(
        &self,
        request: AccessRequest<Pending>,
        resolved_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<AccessRequest<Rejected>>> + Send;

    // ---- matches ----

    /// Atomically admit a booking against the property's confirmed matches, insert it and
    /// move its request from pending to approved. Nothing is written on failure.
    ///
    /// # Errors
    /// - `NotFound` if the property no longer exists
    /// - `InvalidState` if the request is no longer pending
    /// - `Conflict` if the property has no free capacity in the window
    fn reserve(&self, reservation: Reservation) -> impl Future<Output = Result<(AccessRequest<Approved>, Match)>> + Send;

    fn get_match(&self, id: MatchId) -> impl Future<Output = Result<Option<Match>>> + Send;

    /// Compare-and-set confirmed → cancelled, releasing the booked capacity.
    ///
    /// # Errors
    /// - `NotFound` if the match does not exist
    /// - `InvalidState` if the match is no longer confirmed
    fn cancel_match(&self, id: MatchId, cancelled_by: UserId, now: DateTime<Utc>) -> impl Future<Output = Result<Match>> + Send;

    /// Matches where `user_id` is the hunter or the landowner, by start then id.
    fn matches_for_party(&self, user_id: UserId, status: Option<MatchStatus>) -> impl Future<Output = Result<Vec<Match>>> + Send;

    /// Mark confirmed matches with `end_time <= now` completed. Returns how many moved.
    fn complete_elapsed(&self, now: DateTime<Utc>) -> impl Future<Output = Result<u64>> + Send;
}

/// Storage backend selected by configuration.
#[derive(Clone)]
pub enum Backend {
    InMemory(InMemoryStorage),
    Postgres(PostgresStorage),
}

macro_rules! dispatch {
    ($self:ident, $s:ident => $call:expr) => {
        match $self {
            Backend::InMemory($s) => $call.await,
            Backend::Postgres($s) => $call.await,
        }
    };
}

impl Storage for Backend {
    async fn create_property(&self, request: PropertyCreateDBRequest, now: DateTime<Utc>) -> Result<Property> {
        dispatch!(self, s => s.create_property(request, now))
    }

    async fn get_property(&self, id: PropertyId) -> Result<Option<Property>> {
        dispatch!(self, s => s.get_property(id))
    }

    async fn update_property(&self, id: PropertyId, update: PropertyUpdateDBRequest) -> Result<Property> {
        dispatch!(self, s => s.update_property(id, update))
    }

    async fn list_properties(&self, filter: &PropertyFilter) -> Result<Vec<Property>> {
        dispatch!(self, s => s.list_properties(filter))
    }

    async fn create_subscription(&self, request: SubscriptionCreateDBRequest, now: DateTime<Utc>) -> Result<Subscription> {
        dispatch!(self, s => s.create_subscription(request, now))
    }

    async fn get_subscription(&self, id: SubscriptionId) -> Result<Option<Subscription>> {
        dispatch!(self, s => s.get_subscription(id))
    }

    async fn subscriptions_for_hunter(&self, hunter_id: UserId) -> Result<Vec<Subscription>> {
        dispatch!(self, s => s.subscriptions_for_hunter(hunter_id))
    }

    async fn active_subscriptions(&self) -> Result<Vec<Subscription>> {
        dispatch!(self, s => s.active_subscriptions())
    }

    async fn deactivate_subscription(&self, id: SubscriptionId) -> Result<Subscription> {
        dispatch!(self, s => s.deactivate_subscription(id))
    }

    async fn create_sighting(&self, request: SightingCreateDBRequest, now: DateTime<Utc>) -> Result<Sighting> {
        dispatch!(self, s => s.create_sighting(request, now))
    }

    async fn get_sighting(&self, id: SightingId) -> Result<Option<Sighting>> {
        dispatch!(self, s => s.get_sighting(id))
    }

    async fn open_sightings(&self) -> Result<Vec<Sighting>> {
        dispatch!(self, s => s.open_sightings())
    }

    async fn close_sighting(&self, id: SightingId) -> Result<Sighting> {
        dispatch!(self, s => s.close_sighting(id))
    }

    async fn insert_request(&self, request: &AccessRequest<Pending>) -> Result<()> {
        dispatch!(self, s => s.insert_request(request))
    }

    async fn get_request(&self, id: AccessRequestId) -> Result<Option<AnyAccessRequest>> {
        dispatch!(self, s => s.get_request(id))
    }

    async fn list_requests(&self, query: RequestQuery) -> Result<Vec<AnyAccessRequest>> {
        dispatch!(self, s => s.list_requests(query))
    }

    async fn reject_request(&self, request: AccessRequest<Pending>, resolved_at: DateTime<Utc>) -> Result<AccessRequest<Rejected>> {
        dispatch!(self, s => s.reject_request(request, resolved_at))
    }

    async fn reserve(&self, reservation: Reservation) -> Result<(AccessRequest<Approved>, Match)> {
        dispatch!(self, s => s.reserve(reservation))
    }

    async fn get_match(&self, id: MatchId) -> Result<Option<Match>> {
        dispatch!(self, s => s.get_match(id))
    }

    async fn cancel_match(&self, id: MatchId, cancelled_by: UserId, now: DateTime<Utc>) -> Result<Match> {
        dispatch!(self, s => s.cancel_match(id, cancelled_by, now))
    }

    async fn matches_for_party(&self, user_id: UserId, status: Option<MatchStatus>) -> Result<Vec<Match>> {
        dispatch!(self, s => s.matches_for_party(user_id, status))
    }

    async fn complete_elapsed(&self, now: DateTime<Utc>) -> Result<u64> {
        dispatch!(self, s => s.complete_elapsed(now))
    }
}
