//! # pigmatch: sighting-to-hunter matching and access bookings
//!
//! Landowners report feral pig sightings on their properties; hunters subscribe to areas,
//! see the sightings their subscriptions cover, and request access. A landowner approves a
//! request by booking a time window on the property, which creates a confirmed *match*;
//! either party can cancel a match before it starts.
//!
//! ## Core
//!
//! - [`visibility`]: which sightings a hunter may see and act on, and which hunters care about a
//!   new sighting. The rule is a deployment-wide [`VisibilityPolicy`](visibility::VisibilityPolicy).
//! - [`requests`]: the access request state machine (`pending → approved | rejected`) as a
//!   typestate, driven by [`RequestLifecycle`](requests::RequestLifecycle).
//! - [`booking`]: the capacity rule and per-property schedule behind
//!   [`BookingLedger`](booking::BookingLedger). Approval and booking are one atomic step, so a
//!   request is approved exactly when its match is admitted.
//! - [`storage`]: the persistence seam, in memory or PostgreSQL.
//!
//! ## Request Flow
//!
//! Requests to `/api/v1/*` carry the caller's identity in headers set by a trusted proxy
//! ([`auth`]). Handlers in [`api::handlers`] check the caller's role, validate the body once at
//! the boundary, and call into the services. Every failure is an [`errors::Error`], rendered
//! as `{"error": kind, "message": ...}` with a status code matching its kind.
//!
//! ## Configuration
//!
//! See [`config`]: a YAML file with `PIGMATCH_`-prefixed environment overrides, and
//! `DATABASE_URL` to select PostgreSQL.
//!
//! ```ignore
//! let config = Config::load(&args)?;
//! Application::new(config).await?.serve(shutdown_signal()).await
//! ```

pub mod api;
pub mod assessment;
pub mod auth;
pub mod booking;
pub mod cache;
pub mod clock;
pub mod config;
pub mod conversations;
pub mod db;
pub mod errors;
pub mod geo;
pub mod notifications;
pub mod openapi;
pub mod requests;
pub mod storage;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;
pub mod types;
pub mod visibility;

use std::sync::Arc;

use axum::{
    Json, Router,
    http::{self, HeaderName, HeaderValue},
    routing::{delete, get, patch, post},
};
use bon::Builder;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api::handlers::{matches, properties, requests as request_handlers, sightings, subscriptions};
use crate::booking::BookingLedger;
use crate::cache::ListingCache;
use crate::clock::{Clock, SystemClock};
pub use crate::config::Config;
use crate::config::DatabaseConfig;
use crate::conversations::{ConversationStore, InMemoryConversationStore};
use crate::openapi::ApiDoc;
use crate::requests::RequestLifecycle;
use crate::storage::{Backend, InMemoryStorage, PostgresStorage};
use crate::visibility::VisibilityResolver;

/// Shared state handed to every handler.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .storage(storage)
///     .lifecycle(lifecycle)
///     .ledger(ledger)
///     .visibility(VisibilityResolver::new(policy))
///     .listings(ListingCache::new(&config.listings_cache))
///     .clock(clock)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub storage: Backend,
    pub lifecycle: RequestLifecycle<Backend>,
    pub ledger: BookingLedger<Backend>,
    pub visibility: VisibilityResolver,
    pub listings: ListingCache,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire the services over `storage`.
    pub fn assemble(config: Config, storage: Backend, conversations: Arc<dyn ConversationStore>, clock: Arc<dyn Clock>) -> Self {
        let visibility = VisibilityResolver::new(config.visibility.policy);
        let ledger = BookingLedger::new(storage.clone(), clock.clone());
        let lifecycle = RequestLifecycle::new(storage.clone(), ledger.clone(), visibility, conversations, clock.clone());
        let listings = ListingCache::new(&config.listings_cache);

        AppState::builder()
            .storage(storage)
            .lifecycle(lifecycle)
            .ledger(ledger)
            .visibility(visibility)
            .listings(listings)
            .clock(clock)
            .config(config)
            .build()
    }
}

/// Get the pigmatch database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Connect to the configured backend. PostgreSQL is migrated before use.
#[instrument(skip_all)]
async fn setup_storage(config: &Config) -> anyhow::Result<(Backend, Option<PgPool>)> {
    match &config.database {
        DatabaseConfig::InMemory => {
            info!("Using in-memory storage: data will be lost on shutdown");
            Ok((Backend::InMemory(InMemoryStorage::new()), None))
        }
        DatabaseConfig::Postgres { url, pool: settings } => {
            let pool = PgPoolOptions::new()
                .max_connections(settings.max_connections)
                .min_connections(settings.min_connections)
                .acquire_timeout(settings.acquire_timeout)
                .connect(url)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {e}"))?;
            migrator().run(&pool).await?;
            info!(
                max_connections = settings.max_connections,
                "Connected to PostgreSQL and applied migrations"
            );
            Ok((Backend::Postgres(PostgresStorage::new(pool.clone())), Some(pool)))
        }
    }
}

/// Create CORS layer from configuration. No origins means no CORS layer.
fn create_cors_layer(config: &Config) -> anyhow::Result<Option<CorsLayer>> {
    if config.cors_allowed_origins.is_empty() {
        return Ok(None);
    }

    let allow_origin = if config.cors_allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors_allowed_origins {
            origins.push(origin.parse::<HeaderValue>()?);
        }
        AllowOrigin::list(origins)
    };

    let allow_headers = vec![
        http::header::CONTENT_TYPE,
        HeaderName::from_bytes(config.auth.user_id_header.as_bytes())?,
        HeaderName::from_bytes(config.auth.role_header.as_bytes())?,
    ];

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([http::Method::GET, http::Method::POST, http::Method::PATCH, http::Method::DELETE])
            .allow_headers(allow_headers),
    ))
}

/// Build the application router: the `/api/v1` surface, health check, OpenAPI docs, CORS and
/// request tracing.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        .route("/properties", post(properties::create_property).get(properties::list_properties))
        .route("/properties/mine", get(properties::list_my_properties))
        .route("/properties/{id}", patch(properties::update_property))
        .route("/subscriptions", post(subscriptions::create_subscription))
        .route("/subscriptions/mine", get(subscriptions::list_my_subscriptions))
        .route("/subscriptions/{id}", delete(subscriptions::deactivate_subscription))
        .route("/sightings", post(sightings::report_sighting))
        .route("/sightings/visible", get(sightings::list_visible_sightings))
        .route("/sightings/{id}", get(sightings::get_sighting))
        .route("/sightings/{id}/close", post(sightings::close_sighting))
        .route("/sightings/{id}/requests", post(sightings::request_access))
        .route("/requests/incoming", get(request_handlers::list_incoming))
        .route("/requests/outgoing", get(request_handlers::list_outgoing))
        .route("/requests/{id}", get(request_handlers::get_request))
        .route("/requests/{id}/approve", post(request_handlers::approve_request))
        .route("/requests/{id}/reject", post(request_handlers::reject_request))
        .route(
            "/requests/{id}/messages",
            get(request_handlers::list_messages).post(request_handlers::post_message),
        )
        .route("/matches/mine", get(matches::list_my_matches))
        .route("/matches/complete-elapsed", post(matches::complete_elapsed))
        .route("/matches/{id}/cancel", post(matches::cancel_match))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let router = match create_cors_layer(&state.config)? {
        Some(cors) => router.layer(cors),
        None => router,
    };

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Owns the router and the database pool for the lifetime of the process.
///
/// 1. [`Application::new`] connects storage (migrating PostgreSQL) and wires the services
/// 2. [`Application::serve`] binds and serves until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
    pool: Option<PgPool>,
}

impl Application {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_clock(config, Arc::new(SystemClock)).await
    }

    /// Like [`Application::new`] with an injected clock.
    pub async fn new_with_clock(config: Config, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        debug!("Starting pigmatch with configuration: {:#?}", config);

        let (storage, pool) = setup_storage(&config).await?;
        let conversations: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());
        let state = AppState::assemble(config.clone(), storage, conversations, clock);
        info!(
            policy = state.visibility.policy().as_str(),
            "Sighting visibility policy configured"
        );

        let router = build_router(&state)?;
        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("pigmatch listening on http://{}", bind_addr);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::api::models::matches::{CompleteElapsedResponse, MatchResponse};
    use crate::clock::Clock;
    use crate::api::models::messages::MessageResponse;
    use crate::api::models::pagination::PaginatedResponse;
    use crate::api::models::properties::PropertyResponse;
    use crate::api::models::requests::{AccessRequestResponse, ApprovalResponse};
    use crate::api::models::sightings::{SightingReportedResponse, VisibleSightingResponse};
    use crate::db::models::matches::MatchStatus;
    use crate::errors::ErrorBody;
    use crate::requests::RequestStatus;
    use crate::test_utils::{as_user, create_test_app, create_test_config};
    use crate::types::Role;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use chrono::Duration;
    use serde_json::json;
    use uuid::Uuid;

    async fn subscribe(server: &TestServer, hunter: Uuid, (lat, lng): (f64, f64), radius_km: f64) {
        as_user(
            server
                .post("/api/v1/subscriptions")
                .json(&json!({"center": {"lat": lat, "lng": lng}, "radius_km": radius_km})),
            hunter,
            Role::Hunter,
        )
        .await
        .assert_status(StatusCode::CREATED);
    }

    async fn report_at(server: &TestServer, landowner: Uuid, property_id: Uuid, (lat, lng): (f64, f64)) -> SightingReportedResponse {
        as_user(
            server
                .post("/api/v1/sightings")
                .json(&json!({"property_id": property_id, "location": {"lat": lat, "lng": lng}})),
            landowner,
            Role::Landowner,
        )
        .await
        .json()
    }

    #[tokio::test]
    async fn test_health_and_docs_need_no_identity() {
        let (server, _clock) = create_test_app().await;
        let health = server.get("/healthz").await;
        health.assert_status_ok();
        health.assert_text("OK");

        let doc: serde_json::Value = server.get("/openapi.json").await.json();
        assert!(doc["paths"]["/requests/{id}/approve"].is_object());
        server.get("/docs").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let (server, _clock) = create_test_app().await;
        let response = server.get("/api/v1/matches/mine").await;
        response.assert_status_unauthorized();
        let body: ErrorBody = response.json();
        assert_eq!(body.error, "unauthenticated");

        let response = as_user(
            server.get(&format!("/api/v1/requests/{}", Uuid::new_v4())),
            Uuid::new_v4(),
            Role::Hunter,
        )
        .await;
        response.assert_status_not_found();
        assert_eq!(response.json::<ErrorBody>().error, "not_found");
    }

    #[test_log::test(tokio::test)]
    async fn test_sighting_to_completed_booking() {
        let (server, clock) = create_test_app().await;
        let landowner = Uuid::new_v4();
        let hunter = Uuid::new_v4();
        let rival = Uuid::new_v4();

        let property: PropertyResponse = as_user(
            server.post("/api/v1/properties").json(&json!({
                "name": "Puu Waawaa",
                "location": {"lat": 19.77, "lng": -155.84},
                "island": "Hawaii",
            })),
            landowner,
            Role::Landowner,
        )
        .await
        .json();

        for who in [hunter, rival] {
            subscribe(&server, who, (19.8, -155.8), 15.0).await;
        }

        let reported: SightingReportedResponse = as_user(
            server.post("/api/v1/sightings").json(&json!({
                "property_id": property.id,
                "notes": "Sounder of maybe six near the water trough",
            })),
            landowner,
            Role::Landowner,
        )
        .await
        .json();
        assert_eq!(reported.interested_hunters.len(), 2);
        let sighting_id = reported.sighting.id;

        let visible: PaginatedResponse<VisibleSightingResponse> =
            as_user(server.get("/api/v1/sightings/visible"), hunter, Role::Hunter).await.json();
        assert_eq!(visible.data.len(), 1);
        assert_eq!(visible.data[0].sighting.id, sighting_id);

        // A hunter without a covering subscription cannot ask
        let stranger = as_user(
            server.post(&format!("/api/v1/sightings/{sighting_id}/requests")).json(&json!({})),
            Uuid::new_v4(),
            Role::Hunter,
        )
        .await;
        stranger.assert_status_forbidden();
        assert_eq!(stranger.json::<ErrorBody>().error, "forbidden");

        // Two hunters ask for the same sighting
        let requests_path = format!("/api/v1/sightings/{sighting_id}/requests");
        let request: AccessRequestResponse = as_user(
            server.post(&requests_path).json(&json!({"message": "Can come Saturday"})),
            hunter,
            Role::Hunter,
        )
        .await
        .json();
        let rival_request: AccessRequestResponse = as_user(server.post(&requests_path).json(&json!({})), rival, Role::Hunter)
            .await
            .json();

        let incoming: Vec<AccessRequestResponse> = as_user(
            server.get("/api/v1/requests/incoming").add_query_param("status", "pending"),
            landowner,
            Role::Landowner,
        )
        .await
        .json();
        assert_eq!(incoming.len(), 2);

        let messages_path = format!("/api/v1/requests/{}/messages", request.id);
        as_user(
            server.post(&messages_path).json(&json!({"body": "Gate code 4821"})),
            landowner,
            Role::Landowner,
        )
        .await
        .assert_status(StatusCode::CREATED);
        as_user(server.get(&messages_path), rival, Role::Hunter)
            .await
            .assert_status_forbidden();
        let thread: Vec<MessageResponse> = as_user(server.get(&messages_path), hunter, Role::Hunter).await.json();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].body, "Can come Saturday");

        let start = clock.now() + Duration::hours(24);
        let end = start + Duration::hours(4);
        let window = json!({"start_time": start, "end_time": end, "instructions": "Park by the barn"});

        // Only the landowner decides, and only on future windows
        as_user(
            server.post(&format!("/api/v1/requests/{}/approve", request.id)).json(&window),
            hunter,
            Role::Hunter,
        )
        .await
        .assert_status_forbidden();
        as_user(
            server
                .post(&format!("/api/v1/requests/{}/approve", request.id))
                .json(&json!({"start_time": clock.now() - Duration::hours(1), "end_time": end})),
            landowner,
            Role::Landowner,
        )
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        let approval: ApprovalResponse = as_user(
            server.post(&format!("/api/v1/requests/{}/approve", request.id)).json(&window),
            landowner,
            Role::Landowner,
        )
        .await
        .json();
        assert_eq!(approval.request.status, RequestStatus::Approved);
        assert_eq!(approval.request.match_id, Some(approval.booking.id));
        assert_eq!(approval.booking.status, MatchStatus::Confirmed);
        assert_eq!(approval.booking.instructions.as_deref(), Some("Park by the barn"));

        // Single occupancy: the rival's overlapping window conflicts and stays pending
        let rival_approve = format!("/api/v1/requests/{}/approve", rival_request.id);
        let conflict = as_user(server.post(&rival_approve).json(&window), landowner, Role::Landowner).await;
        conflict.assert_status(StatusCode::CONFLICT);
        assert_eq!(conflict.json::<ErrorBody>().error, "conflict");
        let still_pending: AccessRequestResponse = as_user(
            server.get(&format!("/api/v1/requests/{}", rival_request.id)),
            rival,
            Role::Hunter,
        )
        .await
        .json();
        assert_eq!(still_pending.status, RequestStatus::Pending);

        // Approving twice is refused
        as_user(
            server.post(&format!("/api/v1/requests/{}/approve", request.id)).json(&window),
            landowner,
            Role::Landowner,
        )
        .await
        .assert_status(StatusCode::CONFLICT);

        // Cancelling frees the window for the rival
        let cancelled: MatchResponse = as_user(
            server.post(&format!("/api/v1/matches/{}/cancel", approval.booking.id)),
            hunter,
            Role::Hunter,
        )
        .await
        .json();
        assert_eq!(cancelled.status, MatchStatus::Cancelled);
        assert_eq!(cancelled.cancelled_by, Some(hunter));

        let rival_approval: ApprovalResponse = as_user(server.post(&rival_approve).json(&window), landowner, Role::Landowner)
            .await
            .json();

        // Once started, a booking can no longer be cancelled; once ended it completes
        clock.advance(Duration::hours(25));
        let expired = as_user(
            server.post(&format!("/api/v1/matches/{}/cancel", rival_approval.booking.id)),
            landowner,
            Role::Landowner,
        )
        .await;
        expired.assert_status(StatusCode::CONFLICT);
        assert_eq!(expired.json::<ErrorBody>().error, "expired");

        clock.advance(Duration::hours(4));
        let swept: CompleteElapsedResponse = as_user(server.post("/api/v1/matches/complete-elapsed"), rival, Role::Hunter)
            .await
            .json();
        assert_eq!(swept.completed, 1);
        let swept: CompleteElapsedResponse = as_user(server.post("/api/v1/matches/complete-elapsed"), rival, Role::Hunter)
            .await
            .json();
        assert_eq!(swept.completed, 0);

        let landowner_matches: Vec<MatchResponse> =
            as_user(server.get("/api/v1/matches/mine"), landowner, Role::Landowner).await.json();
        let statuses: Vec<_> = landowner_matches.iter().map(|m| m.status).collect();
        assert_eq!(statuses.len(), 2);
        assert!(statuses.contains(&MatchStatus::Cancelled));
        assert!(statuses.contains(&MatchStatus::Completed));

        let completed: Vec<MatchResponse> = as_user(
            server.get("/api/v1/matches/mine").add_query_param("status", "completed"),
            rival,
            Role::Hunter,
        )
        .await
        .json();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, rival_approval.booking.id);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_requests_leave_one_pending() {
        let (server, _clock) = create_test_app().await;
        let landowner = Uuid::new_v4();
        let hunter = Uuid::new_v4();

        let property: PropertyResponse = as_user(
            server.post("/api/v1/properties").json(&json!({
                "name": "Kipuka",
                "location": {"lat": 19.6, "lng": -155.4},
            })),
            landowner,
            Role::Landowner,
        )
        .await
        .json();
        let reported: SightingReportedResponse = as_user(
            server.post("/api/v1/sightings").json(&json!({"property_id": property.id})),
            landowner,
            Role::Landowner,
        )
        .await
        .json();
        subscribe(&server, hunter, (19.6, -155.4), 5.0).await;

        let path = format!("/api/v1/sightings/{}/requests", reported.sighting.id);
        let responses = futures::future::join_all(
            (0..8).map(|_| as_user(server.post(&path).json(&json!({})), hunter, Role::Hunter).into_future()),
        )
        .await;

        let created = responses.iter().filter(|r| r.status_code() == StatusCode::CREATED).count();
        assert_eq!(created, 1);
        for response in responses.iter().filter(|r| r.status_code() != StatusCode::CREATED) {
            response.assert_status(StatusCode::CONFLICT);
            assert_eq!(response.json::<ErrorBody>().error, "duplicate_pending");
        }
    }

    #[tokio::test]
    async fn test_ten_km_subscription_around_honolulu() {
        let (server, _clock) = create_test_app().await;
        let landowner = Uuid::new_v4();
        let hunter = Uuid::new_v4();

        let property: PropertyResponse = as_user(
            server.post("/api/v1/properties").json(&json!({
                "name": "Manoa Ridge",
                "location": {"lat": 21.33, "lng": -157.8},
                "island": "Oahu",
            })),
            landowner,
            Role::Landowner,
        )
        .await
        .json();
        subscribe(&server, hunter, (21.30, -157.80), 10.0).await;

        let inside = report_at(&server, landowner, property.id, (21.32, -157.79)).await;
        let outside = report_at(&server, landowner, property.id, (21.50, -158.10)).await;
        assert_eq!(inside.interested_hunters.len(), 1);
        assert_eq!(inside.interested_hunters[0].hunter_id, hunter);
        assert!(outside.interested_hunters.is_empty());

        let visible: PaginatedResponse<VisibleSightingResponse> =
            as_user(server.get("/api/v1/sightings/visible"), hunter, Role::Hunter).await.json();
        assert_eq!(visible.total_count, 1);
        assert_eq!(visible.data[0].sighting.id, inside.sighting.id);

        let request_path = |id: Uuid| format!("/api/v1/sightings/{id}/requests");
        as_user(server.post(&request_path(outside.sighting.id)).json(&json!({})), hunter, Role::Hunter)
            .await
            .assert_status_forbidden();
        as_user(server.post(&request_path(inside.sighting.id)).json(&json!({})), hunter, Role::Hunter)
            .await
            .assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_cors_origins_from_config() {
        let mut config = create_test_config();
        assert!(super::create_cors_layer(&config).unwrap().is_none());
        config.cors_allowed_origins = vec!["https://maps.example.org".to_string()];
        assert!(super::create_cors_layer(&config).unwrap().is_some());
        config.cors_allowed_origins = vec!["*".to_string()];
        assert!(super::create_cors_layer(&config).unwrap().is_some());
    }
}
