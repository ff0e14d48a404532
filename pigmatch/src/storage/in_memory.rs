//! In-memory storage implementation.
//!
//! Entities live in concurrent maps. Each property has its own `PropertySchedule` behind a
//! mutex; operations that change the set of confirmed matches of a property take that lock
//! first and the request table lock second. No lock is held across an `.await`.
//! Suitable for tests and single-process deployments; everything is lost on restart.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::booking::{PropertySchedule, admit};
use crate::db::models::{
    matches::{Match, MatchStatus},
    properties::{Property, PropertyCreateDBRequest, PropertyFilter, PropertyUpdateDBRequest},
    sightings::{Sighting, SightingCreateDBRequest, SightingStatus},
    subscriptions::{Subscription, SubscriptionCreateDBRequest},
};
use crate::errors::{Error, Result};
use crate::requests::{AccessRequest, AnyAccessRequest, Approved, Pending, Rejected};
use crate::types::{AccessRequestId, MatchId, PropertyId, SightingId, SubscriptionId, UserId};

use super::{Reservation, RequestQuery, Storage};

#[derive(Debug, Default)]
struct RequestTable {
    by_id: HashMap<AccessRequestId, AnyAccessRequest>,
    /// (hunter, sighting) pairs with a pending request
    pending: HashSet<(UserId, SightingId)>,
}

impl RequestTable {
    fn pending_for(&self, id: AccessRequestId) -> Result<&AnyAccessRequest> {
        let current = self.by_id.get(&id).ok_or_else(|| Error::not_found("Access request", id))?;
        if !current.is_pending() {
            return Err(Error::invalid_state(format!("access request {id} is already {}", current.status())));
        }
        Ok(current)
    }
}

#[derive(Debug, Default)]
struct Inner {
    properties: DashMap<PropertyId, Property>,
    schedules: DashMap<PropertyId, Arc<Mutex<PropertySchedule>>>,
    subscriptions: DashMap<SubscriptionId, Subscription>,
    sightings: DashMap<SightingId, Sighting>,
    requests: Mutex<RequestTable>,
    matches: DashMap<MatchId, Match>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    inner: Arc<Inner>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn schedule(&self, property_id: PropertyId) -> Arc<Mutex<PropertySchedule>> {
        Arc::clone(&self.inner.schedules.entry(property_id).or_default())
    }

    fn match_property(&self, id: MatchId) -> Result<PropertyId> {
        self.inner
            .matches
            .get(&id)
            .map(|m| m.property_id)
            .ok_or_else(|| Error::not_found("Match", id))
    }
}

impl Storage for InMemoryStorage {
    #[instrument(skip(self, request), fields(owner_id = %request.owner_id), err)]
    async fn create_property(&self, request: PropertyCreateDBRequest, now: DateTime<Utc>) -> Result<Property> {
        let property = Property {
            id: Uuid::new_v4(),
            owner_id: request.owner_id,
            name: request.name,
            location: request.location,
            notes: request.notes,
            island: request.island,
            max_hunters: request.max_hunters,
            size_acres: request.size_acres,
            daily_rate: request.daily_rate,
            created_at: now,
        };
        self.inner.properties.insert(property.id, property.clone());
        Ok(property)
    }

    async fn get_property(&self, id: PropertyId) -> Result<Option<Property>> {
        Ok(self.inner.properties.get(&id).map(|p| p.clone()))
    }

    #[instrument(skip(self, update), err)]
    async fn update_property(&self, id: PropertyId, update: PropertyUpdateDBRequest) -> Result<Property> {
        let mut property = self.inner.properties.get_mut(&id).ok_or_else(|| Error::not_found("Property", id))?;
        update.apply(&mut property);
        Ok(property.clone())
    }

    async fn list_properties(&self, filter: &PropertyFilter) -> Result<Vec<Property>> {
        let mut properties: Vec<Property> = self
            .inner
            .properties
            .iter()
            .filter(|p| filter.matches(p.value()))
            .map(|p| p.value().clone())
            .collect();
        properties.sort_by_key(|p| (p.created_at, p.id));
        Ok(properties)
    }

    #[instrument(skip(self, request), fields(hunter_id = %request.hunter_id), err)]
    async fn create_subscription(&self, request: SubscriptionCreateDBRequest, now: DateTime<Utc>) -> Result<Subscription> {
        let subscription = Subscription {
            id: Uuid::new_v4(),
            hunter_id: request.hunter_id,
            center: request.center,
            radius_km: request.radius_km,
            active: true,
            created_at: now,
        };
        self.inner.subscriptions.insert(subscription.id, subscription.clone());
        Ok(subscription)
    }

    async fn get_subscription(&self, id: SubscriptionId) -> Result<Option<Subscription>> {
        Ok(self.inner.subscriptions.get(&id).map(|s| s.clone()))
    }

    async fn subscriptions_for_hunter(&self, hunter_id: UserId) -> Result<Vec<Subscription>> {
        let mut subscriptions: Vec<Subscription> = self
            .inner
            .subscriptions
            .iter()
            .filter(|s| s.hunter_id == hunter_id)
            .map(|s| s.value().clone())
            .collect();
        subscriptions.sort_by_key(|s| (s.created_at, s.id));
        Ok(subscriptions)
    }

    async fn active_subscriptions(&self) -> Result<Vec<Subscription>> {
        let mut subscriptions: Vec<Subscription> =
            self.inner.subscriptions.iter().filter(|s| s.active).map(|s| s.value().clone()).collect();
        subscriptions.sort_by_key(|s| (s.created_at, s.id));
        Ok(subscriptions)
    }

    #[instrument(skip(self), err)]
    async fn deactivate_subscription(&self, id: SubscriptionId) -> Result<Subscription> {
        let mut subscription = self
            .inner
            .subscriptions
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("Subscription", id))?;
        subscription.active = false;
        Ok(subscription.clone())
    }

    #[instrument(skip(self, request), fields(property_id = %request.property_id), err)]
    async fn create_sighting(&self, request: SightingCreateDBRequest, now: DateTime<Utc>) -> Result<Sighting> {
        if !self.inner.properties.contains_key(&request.property_id) {
            return Err(Error::not_found("Property", request.property_id));
        }
        let sighting = Sighting {
            id: Uuid::new_v4(),
            property_id: request.property_id,
            reporter_id: request.reporter_id,
            location: request.location,
            seen_at: request.seen_at,
            count_estimate: request.count_estimate,
            notes: request.notes,
            status: SightingStatus::Open,
            credibility_score: request.assessment.credibility_score,
            tags: request.assessment.tags,
            summary: request.assessment.summary,
            created_at: now,
        };
        self.inner.sightings.insert(sighting.id, sighting.clone());
        Ok(sighting)
    }

    async fn get_sighting(&self, id: SightingId) -> Result<Option<Sighting>> {
        Ok(self.inner.sightings.get(&id).map(|s| s.clone()))
    }

    async fn open_sightings(&self) -> Result<Vec<Sighting>> {
        let mut sightings: Vec<Sighting> = self
            .inner
            .sightings
            .iter()
            .filter(|s| s.is_open())
            .map(|s| s.value().clone())
            .collect();
        sightings.sort_by_key(|s| (s.created_at, s.id));
        Ok(sightings)
    }

    #[instrument(skip(self), err)]
    async fn close_sighting(&self, id: SightingId) -> Result<Sighting> {
        let mut sighting = self.inner.sightings.get_mut(&id).ok_or_else(|| Error::not_found("Sighting", id))?;
        sighting.status = SightingStatus::Closed;
        Ok(sighting.clone())
    }

    #[instrument(skip(self, request), fields(request_id = %request.data.id), err)]
    async fn insert_request(&self, request: &AccessRequest<Pending>) -> Result<()> {
        let data = &request.data;
        let mut requests = self.inner.requests.lock();
        if !requests.pending.insert((data.hunter_id, data.sighting_id)) {
            return Err(Error::DuplicatePending {
                hunter_id: data.hunter_id,
                sighting_id: data.sighting_id,
            });
        }
        requests.by_id.insert(data.id, request.clone().into());
        Ok(())
    }

    async fn get_request(&self, id: AccessRequestId) -> Result<Option<AnyAccessRequest>> {
        Ok(self.inner.requests.lock().by_id.get(&id).cloned())
    }

    async fn list_requests(&self, query: RequestQuery) -> Result<Vec<AnyAccessRequest>> {
        let mut requests: Vec<AnyAccessRequest> = self
            .inner
            .requests
            .lock()
            .by_id
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        requests.sort_by(|a, b| (b.data().created_at, b.id()).cmp(&(a.data().created_at, a.id())));
        Ok(requests)
    }

    #[instrument(skip(self, request), fields(request_id = %request.data.id), err)]
    async fn reject_request(&self, request: AccessRequest<Pending>, resolved_at: DateTime<Utc>) -> Result<AccessRequest<Rejected>> {
        let mut requests = self.inner.requests.lock();
        let data = requests.pending_for(request.data.id)?.data().clone();

        let rejected = AccessRequest {
            state: Rejected { resolved_at },
            data,
        };
        requests.pending.remove(&(rejected.data.hunter_id, rejected.data.sighting_id));
        requests.by_id.insert(rejected.data.id, rejected.clone().into());
        Ok(rejected)
    }

    #[instrument(skip(self, reservation), fields(request_id = %reservation.request.data.id, property_id = %reservation.request.data.property_id), err)]
    async fn reserve(&self, reservation: Reservation) -> Result<(AccessRequest<Approved>, Match)> {
        let Reservation {
            request,
            window,
            instructions,
            reserved_at,
        } = reservation;
        let property_id = request.data.property_id;

        let schedule = self.schedule(property_id);
        let mut schedule = schedule.lock();
        let max_hunters = self
            .inner
            .properties
            .get(&property_id)
            .map(|p| p.max_hunters)
            .ok_or_else(|| Error::not_found("Property", property_id))?;

        let mut requests = self.inner.requests.lock();
        let data = requests.pending_for(request.data.id)?.data().clone();

        admit(max_hunters, schedule.overlapping(&window).len())?;

        let booking = Match {
            id: Uuid::new_v4(),
            request_id: data.id,
            sighting_id: data.sighting_id,
            property_id,
            landowner_id: data.landowner_id,
            hunter_id: data.hunter_id,
            start_time: window.start,
            end_time: window.end,
            instructions,
            status: MatchStatus::Confirmed,
            created_at: reserved_at,
            cancelled_at: None,
            cancelled_by: None,
        };
        schedule.insert(booking.id, window);
        self.inner.matches.insert(booking.id, booking.clone());

        let approved = AccessRequest {
            state: Approved {
                match_id: booking.id,
                resolved_at: reserved_at,
            },
            data,
        };
        requests.pending.remove(&(approved.data.hunter_id, approved.data.sighting_id));
        requests.by_id.insert(approved.data.id, approved.clone().into());

        Ok((approved, booking))
    }

    async fn get_match(&self, id: MatchId) -> Result<Option<Match>> {
        Ok(self.inner.matches.get(&id).map(|m| m.clone()))
    }

    #[instrument(skip(self), err)]
    async fn cancel_match(&self, id: MatchId, cancelled_by: UserId, now: DateTime<Utc>) -> Result<Match> {
        let schedule = self.schedule(self.match_property(id)?);
        let mut schedule = schedule.lock();

        let mut booking = self.inner.matches.get_mut(&id).ok_or_else(|| Error::not_found("Match", id))?;
        if !booking.is_confirmed() {
            return Err(Error::invalid_state(format!("match {id} is already {}", booking.status)));
        }
        booking.status = MatchStatus::Cancelled;
        booking.cancelled_at = Some(now);
        booking.cancelled_by = Some(cancelled_by);
        schedule.remove(id, booking.window());
        Ok(booking.clone())
    }

    async fn matches_for_party(&self, user_id: UserId, status: Option<MatchStatus>) -> Result<Vec<Match>> {
        let mut matches: Vec<Match> = self
            .inner
            .matches
            .iter()
            .filter(|m| m.is_party(user_id) && status.is_none_or(|s| s == m.status))
            .map(|m| m.value().clone())
            .collect();
        matches.sort_by_key(|m| (m.start_time, m.id));
        Ok(matches)
    }

    #[instrument(skip(self), err)]
    async fn complete_elapsed(&self, now: DateTime<Utc>) -> Result<u64> {
        let elapsed: Vec<(MatchId, PropertyId)> = self
            .inner
            .matches
            .iter()
            .filter(|m| m.is_confirmed() && m.end_time <= now)
            .map(|m| (m.id, m.property_id))
            .collect();

        let mut completed = 0;
        for (id, property_id) in elapsed {
            let schedule = self.schedule(property_id);
            let mut schedule = schedule.lock();
            if let Some(mut booking) = self.inner.matches.get_mut(&id) {
                // May have been cancelled since the scan
                if booking.is_confirmed() {
                    booking.status = MatchStatus::Completed;
                    schedule.remove(id, booking.window());
                    completed += 1;
                }
            }
        }
        Ok(completed)
    }
}
