//! Access request lifecycle.
//!
//! ```text
//!            approve (booking admitted)
//!   pending ───────────────────────────▶ approved
//!      │
//!      └──────────── reject ───────────▶ rejected
//! ```
//!
//! Approval and booking are one step: the request becomes approved exactly when the
//! [`BookingLedger`] admits the match, so a capacity conflict leaves it pending.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;
use uuid::Uuid;

use crate::booking::{BookingLedger, BookingWindow};
use crate::clock::Clock;
use crate::conversations::ConversationStore;
use crate::db::models::matches::Match;
use crate::db::models::messages::Message;
use crate::errors::{Error, Result};
use crate::notifications;
use crate::storage::{RequestQuery, Storage};
use crate::types::{AccessRequestId, SightingId, UserId};
use crate::visibility::{HunterView, VisibilityPolicy, VisibilityResolver};

mod transitions;
mod types;

pub use types::{AccessRequest, AccessRequestData, AnyAccessRequest, Approved, Pending, Rejected, RequestState, RequestStatus};

#[derive(Clone)]
pub struct RequestLifecycle<S> {
    storage: S,
    ledger: BookingLedger<S>,
    visibility: VisibilityResolver,
    conversations: Arc<dyn ConversationStore>,
    clock: Arc<dyn Clock>,
}

impl<S: Storage> RequestLifecycle<S> {
    pub fn new(
        storage: S,
        ledger: BookingLedger<S>,
        visibility: VisibilityResolver,
        conversations: Arc<dyn ConversationStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            ledger,
            visibility,
            conversations,
            clock,
        }
    }

    /// Record a pending request from `hunter_id` to act on a sighting.
    ///
    /// The sighting must be visible to the hunter under the configured policy, otherwise the
    /// request is `Forbidden`. The optional message opens the request's conversation thread. Failing to append it is
    /// logged and does not fail the request.
    #[instrument(skip(self, message), err)]
    pub async fn create_request(
        &self,
        hunter_id: UserId,
        sighting_id: SightingId,
        message: Option<String>,
    ) -> Result<AccessRequest<Pending>> {
        let sighting = self
            .storage
            .get_sighting(sighting_id)
            .await?
            .ok_or_else(|| Error::not_found("Sighting", sighting_id))?;
        if !sighting.is_open() {
            return Err(Error::invalid_state(format!("sighting {sighting_id} is closed")));
        }
        let property = self
            .storage
            .get_property(sighting.property_id)
            .await?
            .ok_or_else(|| Error::not_found("Property", sighting.property_id))?;
        if property.owner_id == hunter_id {
            return Err(Error::forbidden("cannot request access to your own property"));
        }

        let subscriptions = match self.visibility.policy() {
            VisibilityPolicy::Open => Vec::new(),
            VisibilityPolicy::Subscriptions => self.storage.subscriptions_for_hunter(hunter_id).await?,
        };
        let hunter = HunterView {
            hunter_id,
            subscriptions,
            location: None,
        };
        if !self.visibility.admits(&hunter, sighting.location) {
            return Err(Error::forbidden("sighting is outside the hunter's active subscriptions"));
        }

        let now = self.clock.now();
        let request = AccessRequest {
            state: Pending {},
            data: AccessRequestData {
                id: Uuid::new_v4(),
                sighting_id,
                property_id: property.id,
                hunter_id,
                landowner_id: property.owner_id,
                message,
                created_at: now,
            },
        };
        self.storage.insert_request(&request).await?;

        if let Some(body) = request.data.message.clone() {
            if let Err(e) = self.conversations.append(request.data.id, hunter_id, body, now).await {
                tracing::warn!(request_id = %request.data.id, error = %e, "Failed to open conversation thread");
            }
        }

        notifications::access_requested(&request.data);
        Ok(request)
    }

    /// Approve a pending request, booking `[start, end)` on the property.
    ///
    /// # Errors
    /// - `NotFound`, `Forbidden` (approver is not the landowner), `InvalidState` (not pending)
    /// - `InvalidWindow` if `end <= start` or the window does not start in the future
    /// - `Conflict` if the property is fully booked for the window; the request stays pending
    #[instrument(skip(self, instructions), err)]
    pub async fn approve(
        &self,
        request_id: AccessRequestId,
        approver_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        instructions: Option<String>,
    ) -> Result<(AccessRequest<Approved>, Match)> {
        let pending = self.pending_for_landowner(request_id, approver_id).await?;

        let window = BookingWindow::new(start, end)?;
        let now = self.clock.now();
        if window.start <= now {
            return Err(Error::InvalidWindow {
                message: format!("start {start} must be in the future"),
            });
        }

        pending.approve(window, instructions, now, &self.ledger).await
    }

    #[instrument(skip(self), err)]
    pub async fn reject(&self, request_id: AccessRequestId, approver_id: UserId) -> Result<AccessRequest<Rejected>> {
        let pending = self.pending_for_landowner(request_id, approver_id).await?;
        let rejected = pending.reject(self.clock.now(), &self.storage).await?;
        notifications::access_rejected(&rejected.data);
        Ok(rejected)
    }

    /// Read a request. Only its hunter and landowner may see it.
    pub async fn get(&self, request_id: AccessRequestId, caller_id: UserId) -> Result<AnyAccessRequest> {
        let request = self
            .storage
            .get_request(request_id)
            .await?
            .ok_or_else(|| Error::not_found("Access request", request_id))?;
        if !request.data().is_party(caller_id) {
            return Err(Error::forbidden("only the hunter or the landowner can view this request"));
        }
        Ok(request)
    }

    /// Requests for the landowner's properties, newest first.
    pub async fn incoming(&self, landowner_id: UserId, status: Option<RequestStatus>) -> Result<Vec<AnyAccessRequest>> {
        self.storage
            .list_requests(RequestQuery {
                landowner_id: Some(landowner_id),
                status,
                ..Default::default()
            })
            .await
    }

    /// Requests made by the hunter, newest first.
    pub async fn outgoing(&self, hunter_id: UserId, status: Option<RequestStatus>) -> Result<Vec<AnyAccessRequest>> {
        self.storage
            .list_requests(RequestQuery {
                hunter_id: Some(hunter_id),
                status,
                ..Default::default()
            })
            .await
    }

    /// The request's conversation thread, oldest first. Parties only.
    pub async fn messages(&self, request_id: AccessRequestId, caller_id: UserId) -> Result<Vec<Message>> {
        self.get(request_id, caller_id).await?;
        self.conversations.thread(request_id).await
    }

    /// Append to the request's conversation. Either party may post, whatever the request status.
    #[instrument(skip(self, body), err)]
    pub async fn post_message(&self, request_id: AccessRequestId, author_id: UserId, body: String) -> Result<Message> {
        self.get(request_id, author_id).await?;
        self.conversations.append(request_id, author_id, body, self.clock.now()).await
    }

    async fn pending_for_landowner(&self, request_id: AccessRequestId, approver_id: UserId) -> Result<AccessRequest<Pending>> {
        let request = self
            .storage
            .get_request(request_id)
            .await?
            .ok_or_else(|| Error::not_found("Access request", request_id))?;
        if request.data().landowner_id != approver_id {
            return Err(Error::forbidden("only the landowner can decide on this request"));
        }
        let status = request.status();
        request
            .into_pending()
            .ok_or_else(|| Error::invalid_state(format!("access request {request_id} is already {status}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversations::InMemoryConversationStore;
    use crate::db::models::matches::MatchStatus;
    use crate::db::models::messages::Message;
    use crate::db::models::subscriptions::SubscriptionCreateDBRequest;
    use crate::geo::GeoPoint;
    use crate::test_utils::{Fixture, hours};
    use async_trait::async_trait;

    #[tokio::test]
    async fn test_create_request_opens_thread() {
        let fixture = Fixture::new(None).await;
        let sighting = fixture.sighting().await;

        let request = fixture
            .lifecycle
            .create_request(fixture.hunter_id, sighting.id, Some("Saturday morning?".into()))
            .await
            .unwrap();
        assert_eq!(request.data.landowner_id, fixture.landowner_id);
        assert_eq!(request.data.property_id, fixture.property.id);

        let thread = fixture.conversations.thread(request.data.id).await.unwrap();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].author_id, fixture.hunter_id);
        assert_eq!(thread[0].body, "Saturday morning?");
    }

    #[tokio::test]
    async fn test_create_request_errors() {
        let fixture = Fixture::new(None).await;
        let sighting = fixture.sighting().await;

        assert!(matches!(
            fixture.lifecycle.create_request(fixture.hunter_id, Uuid::new_v4(), None).await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            fixture.lifecycle.create_request(fixture.landowner_id, sighting.id, None).await,
            Err(Error::Forbidden { .. })
        ));

        fixture.lifecycle.create_request(fixture.hunter_id, sighting.id, None).await.unwrap();
        assert!(matches!(
            fixture.lifecycle.create_request(fixture.hunter_id, sighting.id, None).await,
            Err(Error::DuplicatePending { .. })
        ));

        // Another hunter is unaffected
        let other = Uuid::new_v4();
        fixture.subscribe(other).await;
        fixture.lifecycle.create_request(other, sighting.id, None).await.unwrap();

        fixture.storage.close_sighting(sighting.id).await.unwrap();
        assert!(matches!(
            fixture.lifecycle.create_request(Uuid::new_v4(), sighting.id, None).await,
            Err(Error::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_requests_follow_visibility_policy() {
        let fixture = Fixture::new(None).await;
        let sighting = fixture.sighting().await;
        let stranger = Uuid::new_v4();
        let outside = || fixture.lifecycle.create_request(stranger, sighting.id, None);

        assert!(matches!(outside().await, Err(Error::Forbidden { .. })));

        // A subscription elsewhere (Maui) does not cover an Oahu sighting
        fixture
            .storage
            .create_subscription(
                SubscriptionCreateDBRequest {
                    hunter_id: stranger,
                    center: GeoPoint { lat: 20.8, lng: -156.3 },
                    radius_km: 20.0,
                },
                fixture.clock.now(),
            )
            .await
            .unwrap();
        assert!(matches!(outside().await, Err(Error::Forbidden { .. })));

        let covering = fixture.subscribe(stranger).await;
        fixture.storage.deactivate_subscription(covering.id).await.unwrap();
        assert!(matches!(outside().await, Err(Error::Forbidden { .. })));

        fixture.subscribe(stranger).await;
        let request = outside().await.unwrap();
        assert_eq!(request.data.hunter_id, stranger);

        // Under the open policy any hunter may ask
        let open = RequestLifecycle::new(
            fixture.storage.clone(),
            fixture.ledger.clone(),
            VisibilityResolver::new(VisibilityPolicy::Open),
            fixture.conversations.clone(),
            fixture.clock.clone(),
        );
        open.create_request(Uuid::new_v4(), sighting.id, None).await.unwrap();
        assert!(matches!(
            open.create_request(fixture.landowner_id, sighting.id, None).await,
            Err(Error::Forbidden { .. })
        ));
    }

    #[tokio::test]
    async fn test_new_request_allowed_after_rejection() {
        let fixture = Fixture::new(None).await;
        let sighting = fixture.sighting().await;

        let first = fixture.lifecycle.create_request(fixture.hunter_id, sighting.id, None).await.unwrap();
        fixture.lifecycle.reject(first.data.id, fixture.landowner_id).await.unwrap();
        fixture.lifecycle.create_request(fixture.hunter_id, sighting.id, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_approve_creates_confirmed_match() {
        let fixture = Fixture::new(None).await;
        let request = fixture.pending_request().await;
        let (start, end) = (hours(&fixture.clock, 24), hours(&fixture.clock, 28));

        let (approved, booking) = fixture
            .lifecycle
            .approve(request.data.id, fixture.landowner_id, start, end, Some("Park by the shed".into()))
            .await
            .unwrap();

        assert_eq!(approved.state.match_id, booking.id);
        assert_eq!(approved.state.resolved_at, fixture.clock.now());
        assert_eq!(booking.status, MatchStatus::Confirmed);
        assert_eq!(booking.request_id, request.data.id);
        assert_eq!(booking.hunter_id, fixture.hunter_id);
        assert_eq!(booking.landowner_id, fixture.landowner_id);
        assert_eq!((booking.start_time, booking.end_time), (start, end));
        assert_eq!(booking.instructions.as_deref(), Some("Park by the shed"));

        let stored = fixture.lifecycle.get(request.data.id, fixture.hunter_id).await.unwrap();
        assert_eq!(stored.status(), RequestStatus::Approved);
        assert_eq!(stored.match_id(), Some(booking.id));
    }

    #[tokio::test]
    async fn test_approve_checks() {
        let fixture = Fixture::new(None).await;
        let request = fixture.pending_request().await;
        let id = request.data.id;
        let (start, end) = (hours(&fixture.clock, 1), hours(&fixture.clock, 2));

        assert!(matches!(
            fixture.lifecycle.approve(Uuid::new_v4(), fixture.landowner_id, start, end, None).await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            fixture.lifecycle.approve(id, fixture.hunter_id, start, end, None).await,
            Err(Error::Forbidden { .. })
        ));
        assert!(matches!(
            fixture.lifecycle.approve(id, fixture.landowner_id, end, start, None).await,
            Err(Error::InvalidWindow { .. })
        ));
        assert!(matches!(
            fixture.lifecycle.approve(id, fixture.landowner_id, start, start, None).await,
            Err(Error::InvalidWindow { .. })
        ));
        assert!(matches!(
            fixture
                .lifecycle
                .approve(id, fixture.landowner_id, hours(&fixture.clock, -1), end, None)
                .await,
            Err(Error::InvalidWindow { .. })
        ));
        assert!(matches!(
            fixture
                .lifecycle
                .approve(id, fixture.landowner_id, fixture.clock.now(), end, None)
                .await,
            Err(Error::InvalidWindow { .. })
        ));

        // Still pending after every failed attempt
        assert!(fixture.lifecycle.get(id, fixture.landowner_id).await.unwrap().is_pending());
    }

    #[tokio::test]
    async fn test_conflicting_approval_leaves_request_pending() {
        let fixture = Fixture::new(None).await;
        let first = fixture.pending_request().await;
        let second = fixture.pending_request().await;

        fixture
            .lifecycle
            .approve(first.data.id, fixture.landowner_id, hours(&fixture.clock, 1), hours(&fixture.clock, 4), None)
            .await
            .unwrap();
        let err = fixture
            .lifecycle
            .approve(second.data.id, fixture.landowner_id, hours(&fixture.clock, 2), hours(&fixture.clock, 3), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
        assert!(fixture.lifecycle.get(second.data.id, fixture.hunter_id).await.unwrap().is_pending());

        // A free window works for the same request
        fixture
            .lifecycle
            .approve(second.data.id, fixture.landowner_id, hours(&fixture.clock, 4), hours(&fixture.clock, 6), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_terminal_requests_cannot_transition_again() {
        let fixture = Fixture::new(Some(10)).await;
        let approved = fixture.pending_request().await;
        let rejected = fixture.pending_request().await;
        let (start, end) = (hours(&fixture.clock, 1), hours(&fixture.clock, 2));

        fixture.lifecycle.approve(approved.data.id, fixture.landowner_id, start, end, None).await.unwrap();
        let r = fixture.lifecycle.reject(rejected.data.id, fixture.landowner_id).await.unwrap();
        assert_eq!(r.state.resolved_at, fixture.clock.now());

        for id in [approved.data.id, rejected.data.id] {
            assert!(matches!(
                fixture.lifecycle.approve(id, fixture.landowner_id, start, end, None).await,
                Err(Error::InvalidState { .. })
            ));
            assert!(matches!(
                fixture.lifecycle.reject(id, fixture.landowner_id).await,
                Err(Error::InvalidState { .. })
            ));
        }

        let bookings = fixture.ledger.list_for_party(fixture.hunter_id, None).await.unwrap();
        assert_eq!(bookings.len(), 1);
        let state = fixture.lifecycle.get(rejected.data.id, fixture.hunter_id).await.unwrap();
        assert_eq!(state.status(), RequestStatus::Rejected);
        assert!(state.resolved_at().is_some());
    }

    #[tokio::test]
    async fn test_get_and_listings() {
        let fixture = Fixture::new(None).await;
        let older = fixture.pending_request().await;
        fixture.clock.advance(chrono::Duration::minutes(1));
        let newer = fixture.pending_request().await;

        assert!(matches!(
            fixture.lifecycle.get(older.data.id, Uuid::new_v4()).await,
            Err(Error::Forbidden { .. })
        ));

        let incoming: Vec<_> = fixture
            .lifecycle
            .incoming(fixture.landowner_id, None)
            .await
            .unwrap()
            .iter()
            .map(|r| r.id())
            .collect();
        assert_eq!(incoming, vec![newer.data.id, older.data.id]);

        fixture.lifecycle.reject(older.data.id, fixture.landowner_id).await.unwrap();
        let pending = fixture.lifecycle.outgoing(fixture.hunter_id, Some(RequestStatus::Pending)).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id(), newer.data.id);
        assert!(fixture.lifecycle.incoming(fixture.hunter_id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_conversation_is_open_to_both_parties_only() {
        let fixture = Fixture::new(None).await;
        let sighting = fixture.sighting().await;
        let request = fixture
            .lifecycle
            .create_request(fixture.hunter_id, sighting.id, Some("first light ok?".into()))
            .await
            .unwrap();
        let id = request.data.id;

        fixture.clock.advance(chrono::Duration::minutes(5));
        fixture
            .lifecycle
            .post_message(id, fixture.landowner_id, "gate code is 1234".into())
            .await
            .unwrap();
        fixture.lifecycle.reject(id, fixture.landowner_id).await.unwrap();
        fixture.lifecycle.post_message(id, fixture.hunter_id, "mahalo anyway".into()).await.unwrap();

        let thread = fixture.lifecycle.messages(id, fixture.landowner_id).await.unwrap();
        let authors: Vec<_> = thread.iter().map(|m| m.author_id).collect();
        assert_eq!(authors, vec![fixture.hunter_id, fixture.landowner_id, fixture.hunter_id]);
        assert!(thread[0].created_at < thread[1].created_at);

        let outsider = Uuid::new_v4();
        assert!(matches!(
            fixture.lifecycle.messages(id, outsider).await,
            Err(Error::Forbidden { .. })
        ));
        assert!(matches!(
            fixture.lifecycle.post_message(id, outsider, "hi".into()).await,
            Err(Error::Forbidden { .. })
        ));
        assert!(matches!(
            fixture.lifecycle.messages(Uuid::new_v4(), fixture.hunter_id).await,
            Err(Error::NotFound { .. })
        ));
    }

    #[derive(Debug)]
    struct BrokenConversations;

    #[async_trait]
    impl ConversationStore for BrokenConversations {
        async fn append(&self, _: AccessRequestId, _: UserId, _: String, _: DateTime<Utc>) -> Result<Message> {
            Err(Error::Internal {
                operation: "append message".into(),
            })
        }

        async fn thread(&self, _: AccessRequestId) -> Result<Vec<Message>> {
            Ok(Vec::new())
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_conversation_failure_does_not_fail_request() {
        let fixture = Fixture::new(None).await;
        let sighting = fixture.sighting().await;
        let lifecycle = RequestLifecycle::new(
            fixture.storage.clone(),
            fixture.ledger.clone(),
            VisibilityResolver::default(),
            Arc::new(BrokenConversations),
            fixture.clock.clone(),
        );

        let request = lifecycle
            .create_request(fixture.hunter_id, sighting.id, Some("hello".into()))
            .await
            .unwrap();
        assert!(fixture.storage.get_request(request.data.id).await.unwrap().is_some());
        // The default store never saw it
        let store: &InMemoryConversationStore = &fixture.conversations;
        assert!(store.thread(request.data.id).await.unwrap().is_empty());
    }
}
