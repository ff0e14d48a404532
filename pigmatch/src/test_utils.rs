//! Test utilities shared by unit and HTTP tests.

use std::sync::Arc;

use axum_test::{TestRequest, TestServer};
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::assessment::assess_notes;
use crate::booking::BookingLedger;
use crate::clock::{Clock, ManualClock};
use crate::config::{Config, DatabaseConfig};
use crate::conversations::InMemoryConversationStore;
use crate::db::models::{
    properties::{Property, PropertyCreateDBRequest},
    sightings::{Sighting, SightingCreateDBRequest},
    subscriptions::{Subscription, SubscriptionCreateDBRequest},
};
use crate::geo::GeoPoint;
use crate::requests::{AccessRequest, Pending, RequestLifecycle};
use crate::storage::{InMemoryStorage, Storage};
use crate::types::{Role, UserId};
use crate::visibility::VisibilityResolver;

/// Fixed starting instant for manual clocks in tests.
pub fn test_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 6, 1, 6, 0, 0).unwrap()
}

/// `h` hours after the clock's current time.
pub fn hours(clock: &ManualClock, h: i64) -> DateTime<Utc> {
    clock.now() + Duration::hours(h)
}

/// A landowner with one property, a hunter subscribed around it, and the services wired over
/// in-memory storage with the default visibility policy.
pub struct Fixture {
    pub storage: InMemoryStorage,
    pub clock: Arc<ManualClock>,
    pub conversations: Arc<InMemoryConversationStore>,
    pub ledger: BookingLedger<InMemoryStorage>,
    pub lifecycle: RequestLifecycle<InMemoryStorage>,
    pub landowner_id: UserId,
    pub hunter_id: UserId,
    pub property: Property,
}

impl Fixture {
    pub async fn new(max_hunters: Option<u32>) -> Self {
        let storage = InMemoryStorage::new();
        let clock = Arc::new(ManualClock::new(test_epoch()));
        let conversations = Arc::new(InMemoryConversationStore::new());
        let ledger = BookingLedger::new(storage.clone(), clock.clone());
        let lifecycle = RequestLifecycle::new(
            storage.clone(),
            ledger.clone(),
            VisibilityResolver::default(),
            conversations.clone(),
            clock.clone(),
        );

        let landowner_id = Uuid::new_v4();
        let property = storage
            .create_property(
                PropertyCreateDBRequest {
                    owner_id: landowner_id,
                    name: "Kahuku Ranch".to_string(),
                    location: GeoPoint { lat: 21.68, lng: -157.95 },
                    notes: None,
                    island: Some("Oahu".to_string()),
                    max_hunters,
                    size_acres: Some(120.0),
                    daily_rate: Some(75.0),
                },
                clock.now(),
            )
            .await
            .unwrap();

        let fixture = Self {
            storage,
            clock,
            conversations,
            ledger,
            lifecycle,
            landowner_id,
            hunter_id: Uuid::new_v4(),
            property,
        };
        fixture.subscribe(fixture.hunter_id).await;
        fixture
    }

    /// An active 10 km subscription for `hunter_id` centred on the fixture's property.
    pub async fn subscribe(&self, hunter_id: UserId) -> Subscription {
        self.storage
            .create_subscription(
                SubscriptionCreateDBRequest {
                    hunter_id,
                    center: self.property.location,
                    radius_km: 10.0,
                },
                self.clock.now(),
            )
            .await
            .unwrap()
    }

    /// A new open sighting on the fixture's property.
    pub async fn sighting(&self) -> Sighting {
        self.storage
            .create_sighting(
                SightingCreateDBRequest {
                    property_id: self.property.id,
                    reporter_id: self.landowner_id,
                    location: self.property.location,
                    seen_at: self.clock.now(),
                    count_estimate: Some(3),
                    notes: None,
                    assessment: assess_notes(None),
                },
                self.clock.now(),
            )
            .await
            .unwrap()
    }

    /// A pending request from the fixture's hunter, on a fresh sighting.
    pub async fn pending_request(&self) -> AccessRequest<Pending> {
        let sighting = self.sighting().await;
        self.lifecycle.create_request(self.hunter_id, sighting.id, None).await.unwrap()
    }
}

pub fn create_test_config() -> Config {
    Config {
        database: DatabaseConfig::InMemory,
        ..Default::default()
    }
}

/// An in-memory application driven by a manual clock starting at [`test_epoch`].
pub async fn create_test_app() -> (TestServer, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(test_epoch()));
    let app = crate::Application::new_with_clock(create_test_config(), clock.clone())
        .await
        .expect("Failed to create application");
    (app.into_test_server(), clock)
}

pub fn add_auth_headers(user_id: UserId, role: Role) -> Vec<(String, String)> {
    let config = create_test_config();
    vec![
        (config.auth.user_id_header.clone(), user_id.to_string()),
        (config.auth.role_header.clone(), role.to_string()),
    ]
}

/// Attach the proxy identity headers for `user_id` acting as `role`.
pub fn as_user(request: TestRequest, user_id: UserId, role: Role) -> TestRequest {
    add_auth_headers(user_id, role)
        .into_iter()
        .fold(request, |request, (name, value)| request.add_header(name, value))
}
