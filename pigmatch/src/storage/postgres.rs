//! PostgreSQL storage backend.
//!
//! Atomicity comes from the database:
//! - `reserve` runs in one transaction holding `SELECT ... FOR UPDATE` on the property row, so
//!   reservations for the same property serialize while other properties proceed;
//! - request and match transitions are conditional `UPDATE ... WHERE status = ...` statements;
//! - one pending request per (hunter, sighting) is a partial unique index.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::booking::admit;
use crate::db::errors::DbError;
use crate::db::models::{
    matches::{Match, MatchStatus},
    properties::{Property, PropertyCreateDBRequest, PropertyFilter, PropertyUpdateDBRequest},
    sightings::{Sighting, SightingCreateDBRequest, SightingStatus},
    subscriptions::{Subscription, SubscriptionCreateDBRequest},
};
use crate::errors::{Error, PENDING_REQUEST_INDEX, Result};
use crate::geo::GeoPoint;
use crate::requests::{AccessRequest, AccessRequestData, AnyAccessRequest, Approved, Pending, Rejected, RequestStatus};
use crate::types::{AccessRequestId, MatchId, PropertyId, SightingId, SubscriptionId, UserId};

use super::{Reservation, RequestQuery, Storage};

#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Distinguish a missing request from one that has left the pending state.
    async fn not_pending(&self, id: AccessRequestId) -> Error {
        let status: std::result::Result<Option<String>, sqlx::Error> =
            sqlx::query_scalar("SELECT status FROM access_requests WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await;
        match status {
            Ok(Some(status)) => Error::invalid_state(format!("access request {id} is already {status}")),
            Ok(None) => Error::not_found("Access request", id),
            Err(e) => e.into(),
        }
    }
}

fn corrupt(column: &'static str) -> impl Fn(String) -> DbError {
    move |value| DbError::CorruptValue { column, value }
}

fn to_u32(column: &'static str, value: Option<i32>) -> std::result::Result<Option<u32>, DbError> {
    value
        .map(|v| u32::try_from(v).map_err(|_| DbError::CorruptValue { column, value: v.to_string() }))
        .transpose()
}

fn to_i32(value: Option<u32>) -> Option<i32> {
    value.map(|v| i32::try_from(v).unwrap_or(i32::MAX))
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, FromRow)]
struct PropertyRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    lat: f64,
    lng: f64,
    notes: Option<String>,
    island: Option<String>,
    max_hunters: Option<i32>,
    size_acres: Option<f64>,
    daily_rate: Option<f64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PropertyRow> for Property {
    type Error = DbError;

    fn try_from(row: PropertyRow) -> std::result::Result<Self, Self::Error> {
        Ok(Property {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            location: GeoPoint { lat: row.lat, lng: row.lng },
            notes: row.notes,
            island: row.island,
            max_hunters: to_u32("properties.max_hunters", row.max_hunters)?,
            size_acres: row.size_acres,
            daily_rate: row.daily_rate,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SubscriptionRow {
    id: Uuid,
    hunter_id: Uuid,
    center_lat: f64,
    center_lng: f64,
    radius_km: f64,
    active: bool,
    created_at: DateTime<Utc>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Subscription {
            id: row.id,
            hunter_id: row.hunter_id,
            center: GeoPoint {
                lat: row.center_lat,
                lng: row.center_lng,
            },
            radius_km: row.radius_km,
            active: row.active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SightingRow {
    id: Uuid,
    property_id: Uuid,
    reporter_id: Uuid,
    lat: f64,
    lng: f64,
    seen_at: DateTime<Utc>,
    count_estimate: Option<i32>,
    notes: Option<String>,
    status: String,
    credibility_score: f64,
    tags: Vec<String>,
    summary: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SightingRow> for Sighting {
    type Error = DbError;

    fn try_from(row: SightingRow) -> std::result::Result<Self, Self::Error> {
        Ok(Sighting {
            id: row.id,
            property_id: row.property_id,
            reporter_id: row.reporter_id,
            location: GeoPoint { lat: row.lat, lng: row.lng },
            seen_at: row.seen_at,
            count_estimate: to_u32("sightings.count_estimate", row.count_estimate)?,
            notes: row.notes,
            status: row.status.parse::<SightingStatus>().map_err(corrupt("sightings.status"))?,
            credibility_score: row.credibility_score,
            tags: row.tags,
            summary: row.summary,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RequestRow {
    id: Uuid,
    sighting_id: Uuid,
    property_id: Uuid,
    hunter_id: Uuid,
    landowner_id: Uuid,
    message: Option<String>,
    status: String,
    match_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<RequestRow> for AnyAccessRequest {
    type Error = DbError;

    fn try_from(row: RequestRow) -> std::result::Result<Self, Self::Error> {
        let status = row.status.parse::<RequestStatus>().map_err(corrupt("access_requests.status"))?;
        let data = AccessRequestData {
            id: row.id,
            sighting_id: row.sighting_id,
            property_id: row.property_id,
            hunter_id: row.hunter_id,
            landowner_id: row.landowner_id,
            message: row.message,
            created_at: row.created_at,
        };
        let resolved_at = || {
            row.resolved_at.ok_or(DbError::CorruptValue {
                column: "access_requests.resolved_at",
                value: "NULL".to_string(),
            })
        };

        Ok(match status {
            RequestStatus::Pending => AccessRequest { state: Pending {}, data }.into(),
            RequestStatus::Approved => AccessRequest {
                state: Approved {
                    match_id: row.match_id.ok_or(DbError::CorruptValue {
                        column: "access_requests.match_id",
                        value: "NULL".to_string(),
                    })?,
                    resolved_at: resolved_at()?,
                },
                data,
            }
            .into(),
            RequestStatus::Rejected => AccessRequest {
                state: Rejected {
                    resolved_at: resolved_at()?,
                },
                data,
            }
            .into(),
        })
    }
}

#[derive(Debug, FromRow)]
struct MatchRow {
    id: Uuid,
    request_id: Uuid,
    sighting_id: Uuid,
    property_id: Uuid,
    landowner_id: Uuid,
    hunter_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    instructions: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
    cancelled_by: Option<Uuid>,
}

impl TryFrom<MatchRow> for Match {
    type Error = DbError;

    fn try_from(row: MatchRow) -> std::result::Result<Self, Self::Error> {
        Ok(Match {
            id: row.id,
            request_id: row.request_id,
            sighting_id: row.sighting_id,
            property_id: row.property_id,
            landowner_id: row.landowner_id,
            hunter_id: row.hunter_id,
            start_time: row.start_time,
            end_time: row.end_time,
            instructions: row.instructions,
            status: row.status.parse::<MatchStatus>().map_err(corrupt("matches.status"))?,
            created_at: row.created_at,
            cancelled_at: row.cancelled_at,
            cancelled_by: row.cancelled_by,
        })
    }
}

fn convert<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = DbError>,
{
    Ok(rows.into_iter().map(T::try_from).collect::<std::result::Result<_, _>>()?)
}

// ============================================================================
// Storage
// ============================================================================

impl Storage for PostgresStorage {
    #[instrument(skip(self, request), fields(owner_id = %request.owner_id), err)]
    async fn create_property(&self, request: PropertyCreateDBRequest, now: DateTime<Utc>) -> Result<Property> {
        let row = sqlx::query_as::<_, PropertyRow>(
            r#"
            INSERT INTO properties (id, owner_id, name, lat, lng, notes, island, max_hunters, size_acres, daily_rate, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.owner_id)
        .bind(&request.name)
        .bind(request.location.lat)
        .bind(request.location.lng)
        .bind(&request.notes)
        .bind(&request.island)
        .bind(to_i32(request.max_hunters))
        .bind(request.size_acres)
        .bind(request.daily_rate)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_into()?)
    }

    async fn get_property(&self, id: PropertyId) -> Result<Option<Property>> {
        let row = sqlx::query_as::<_, PropertyRow>("SELECT * FROM properties WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Property::try_from).transpose()?)
    }

    #[instrument(skip(self, update), err)]
    async fn update_property(&self, id: PropertyId, update: PropertyUpdateDBRequest) -> Result<Property> {
        let row = sqlx::query_as::<_, PropertyRow>(
            r#"
            UPDATE properties SET
                name = COALESCE($2, name),
                lat = COALESCE($3, lat),
                lng = COALESCE($4, lng),
                notes = COALESCE($5, notes),
                island = COALESCE($6, island),
                max_hunters = COALESCE($7, max_hunters),
                size_acres = COALESCE($8, size_acres),
                daily_rate = COALESCE($9, daily_rate)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(update.location.map(|p| p.lat))
        .bind(update.location.map(|p| p.lng))
        .bind(&update.notes)
        .bind(&update.island)
        .bind(to_i32(update.max_hunters))
        .bind(update.size_acres)
        .bind(update.daily_rate)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::not_found("Property", id))?;

        Ok(row.try_into()?)
    }

    #[instrument(skip(self, filter), err)]
    async fn list_properties(&self, filter: &PropertyFilter) -> Result<Vec<Property>> {
        let mut query = QueryBuilder::new("SELECT * FROM properties WHERE 1=1");

        if let Some(owner_id) = filter.owner_id {
            query.push(" AND owner_id = ");
            query.push_bind(owner_id);
        }
        if let Some(island) = &filter.island {
            query.push(" AND LOWER(island) = LOWER(");
            query.push_bind(island.clone());
            query.push(")");
        }
        if let Some(min) = filter.min_price {
            query.push(" AND daily_rate >= ");
            query.push_bind(min);
        }
        if let Some(max) = filter.max_price {
            query.push(" AND daily_rate <= ");
            query.push_bind(max);
        }
        if let Some(name) = &filter.name {
            query.push(" AND STRPOS(LOWER(name), LOWER(");
            query.push_bind(name.clone());
            query.push(")) > 0");
        }
        let bbox = &filter.bbox;
        for (column, op, bound) in [
            ("lat", ">=", bbox.min_lat),
            ("lat", "<=", bbox.max_lat),
            ("lng", ">=", bbox.min_lng),
            ("lng", "<=", bbox.max_lng),
        ] {
            if let Some(bound) = bound {
                query.push(format!(" AND {column} {op} "));
                query.push_bind(bound);
            }
        }
        query.push(" ORDER BY created_at ASC, id ASC");

        let rows = query.build_query_as::<PropertyRow>().fetch_all(&self.pool).await?;
        convert(rows)
    }

    #[instrument(skip(self, request), fields(hunter_id = %request.hunter_id), err)]
    async fn create_subscription(&self, request: SubscriptionCreateDBRequest, now: DateTime<Utc>) -> Result<Subscription> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            INSERT INTO subscriptions (id, hunter_id, center_lat, center_lng, radius_km, active, created_at)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.hunter_id)
        .bind(request.center.lat)
        .bind(request.center.lng)
        .bind(request.radius_km)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_subscription(&self, id: SubscriptionId) -> Result<Option<Subscription>> {
        let row = sqlx::query_as::<_, SubscriptionRow>("SELECT * FROM subscriptions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Subscription::from))
    }

    async fn subscriptions_for_hunter(&self, hunter_id: UserId) -> Result<Vec<Subscription>> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            "SELECT * FROM subscriptions WHERE hunter_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(hunter_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Subscription::from).collect())
    }

    async fn active_subscriptions(&self) -> Result<Vec<Subscription>> {
        let rows =
            sqlx::query_as::<_, SubscriptionRow>("SELECT * FROM subscriptions WHERE active ORDER BY created_at ASC, id ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Subscription::from).collect())
    }

    #[instrument(skip(self), err)]
    async fn deactivate_subscription(&self, id: SubscriptionId) -> Result<Subscription> {
        let row = sqlx::query_as::<_, SubscriptionRow>("UPDATE subscriptions SET active = FALSE WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::not_found("Subscription", id))?;
        Ok(row.into())
    }

    #[instrument(skip(self, request), fields(property_id = %request.property_id), err)]
    async fn create_sighting(&self, request: SightingCreateDBRequest, now: DateTime<Utc>) -> Result<Sighting> {
        let row = sqlx::query_as::<_, SightingRow>(
            r#"
            INSERT INTO sightings (
                id, property_id, reporter_id, lat, lng, seen_at, count_estimate, notes,
                status, credibility_score, tags, summary, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'open', $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.property_id)
        .bind(request.reporter_id)
        .bind(request.location.lat)
        .bind(request.location.lng)
        .bind(request.seen_at)
        .bind(to_i32(request.count_estimate))
        .bind(&request.notes)
        .bind(request.assessment.credibility_score)
        .bind(&request.assessment.tags)
        .bind(&request.assessment.summary)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::ForeignKeyViolation { .. } => Error::not_found("Property", request.property_id),
            other => other.into(),
        })?;

        Ok(row.try_into()?)
    }

    async fn get_sighting(&self, id: SightingId) -> Result<Option<Sighting>> {
        let row = sqlx::query_as::<_, SightingRow>("SELECT * FROM sightings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Sighting::try_from).transpose()?)
    }

    async fn open_sightings(&self) -> Result<Vec<Sighting>> {
        let rows =
            sqlx::query_as::<_, SightingRow>("SELECT * FROM sightings WHERE status = 'open' ORDER BY created_at ASC, id ASC")
                .fetch_all(&self.pool)
                .await?;
        convert(rows)
    }

    #[instrument(skip(self), err)]
    async fn close_sighting(&self, id: SightingId) -> Result<Sighting> {
        let row = sqlx::query_as::<_, SightingRow>("UPDATE sightings SET status = 'closed' WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::not_found("Sighting", id))?;
        Ok(row.try_into()?)
    }

    #[instrument(skip(self, request), fields(request_id = %request.data.id), err)]
    async fn insert_request(&self, request: &AccessRequest<Pending>) -> Result<()> {
        let data = &request.data;
        sqlx::query(
            r#"
            INSERT INTO access_requests (id, sighting_id, property_id, hunter_id, landowner_id, message, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
            "#,
        )
        .bind(data.id)
        .bind(data.sighting_id)
        .bind(data.property_id)
        .bind(data.hunter_id)
        .bind(data.landowner_id)
        .bind(&data.message)
        .bind(data.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            err @ DbError::UniqueViolation { .. } if err.constraint() == Some(PENDING_REQUEST_INDEX) => Error::DuplicatePending {
                hunter_id: data.hunter_id,
                sighting_id: data.sighting_id,
            },
            other => other.into(),
        })?;
        Ok(())
    }

    async fn get_request(&self, id: AccessRequestId) -> Result<Option<AnyAccessRequest>> {
        let row = sqlx::query_as::<_, RequestRow>("SELECT * FROM access_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(AnyAccessRequest::try_from).transpose()?)
    }

    async fn list_requests(&self, query: RequestQuery) -> Result<Vec<AnyAccessRequest>> {
        let rows = sqlx::query_as::<_, RequestRow>(
            r#"
            SELECT * FROM access_requests
            WHERE ($1::uuid IS NULL OR landowner_id = $1)
              AND ($2::uuid IS NULL OR hunter_id = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(query.landowner_id)
        .bind(query.hunter_id)
        .bind(query.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        convert(rows)
    }

    #[instrument(skip(self, request), fields(request_id = %request.data.id), err)]
    async fn reject_request(&self, request: AccessRequest<Pending>, resolved_at: DateTime<Utc>) -> Result<AccessRequest<Rejected>> {
        let id = request.data.id;
        let row = sqlx::query_as::<_, RequestRow>(
            r#"
            UPDATE access_requests SET status = 'rejected', resolved_at = $2
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(resolved_at)
        .fetch_optional(&self.pool)
        .await?;

        match row.map(AnyAccessRequest::try_from).transpose()? {
            Some(AnyAccessRequest::Rejected(rejected)) => Ok(rejected),
            Some(_) => Err(DbError::CorruptValue {
                column: "access_requests.status",
                value: "expected rejected".to_string(),
            }
            .into()),
            None => Err(self.not_pending(id).await),
        }
    }

    #[instrument(skip(self, reservation), fields(request_id = %reservation.request.data.id, property_id = %reservation.request.data.property_id), err)]
    async fn reserve(&self, reservation: Reservation) -> Result<(AccessRequest<Approved>, Match)> {
        let Reservation {
            request,
            window,
            instructions,
            reserved_at,
        } = reservation;
        let request_id = request.data.id;
        let property_id = request.data.property_id;
        let match_id: MatchId = Uuid::new_v4();

        // Dropping the transaction on any early return rolls it back
        let mut tx = self.pool.begin().await?;

        let max_hunters: Option<i32> = sqlx::query_scalar::<_, Option<i32>>("SELECT max_hunters FROM properties WHERE id = $1 FOR UPDATE")
            .bind(property_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::not_found("Property", property_id))?;
        let max_hunters = to_u32("properties.max_hunters", max_hunters)?;

        let approved_row = sqlx::query_as::<_, RequestRow>(
            r#"
            UPDATE access_requests SET status = 'approved', resolved_at = $2, match_id = $3
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(reserved_at)
        .bind(match_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(approved_row) = approved_row else {
            tx.rollback().await?;
            return Err(self.not_pending(request_id).await);
        };

        let overlapping: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM matches
            WHERE property_id = $1 AND status = 'confirmed' AND start_time < $3 AND end_time > $2
            "#,
        )
        .bind(property_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&mut *tx)
        .await?;
        admit(max_hunters, usize::try_from(overlapping).unwrap_or(usize::MAX))?;

        let match_row = sqlx::query_as::<_, MatchRow>(
            r#"
            INSERT INTO matches (
                id, request_id, sighting_id, property_id, landowner_id, hunter_id,
                start_time, end_time, instructions, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'confirmed', $10)
            RETURNING *
            "#,
        )
        .bind(match_id)
        .bind(request_id)
        .bind(approved_row.sighting_id)
        .bind(property_id)
        .bind(approved_row.landowner_id)
        .bind(approved_row.hunter_id)
        .bind(window.start)
        .bind(window.end)
        .bind(&instructions)
        .bind(reserved_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let approved = match AnyAccessRequest::try_from(approved_row)? {
            AnyAccessRequest::Approved(approved) => approved,
            _ => {
                return Err(DbError::CorruptValue {
                    column: "access_requests.status",
                    value: "expected approved".to_string(),
                }
                .into());
            }
        };
        Ok((approved, match_row.try_into()?))
    }

    async fn get_match(&self, id: MatchId) -> Result<Option<Match>> {
        let row = sqlx::query_as::<_, MatchRow>("SELECT * FROM matches WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Match::try_from).transpose()?)
    }

    #[instrument(skip(self), err)]
    async fn cancel_match(&self, id: MatchId, cancelled_by: UserId, now: DateTime<Utc>) -> Result<Match> {
        let row = sqlx::query_as::<_, MatchRow>(
            r#"
            UPDATE matches SET status = 'cancelled', cancelled_at = $2, cancelled_by = $3
            WHERE id = $1 AND status = 'confirmed'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(now)
        .bind(cancelled_by)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.try_into()?),
            None => match self.get_match(id).await? {
                Some(existing) => Err(Error::invalid_state(format!("match {id} is already {}", existing.status))),
                None => Err(Error::not_found("Match", id)),
            },
        }
    }

    async fn matches_for_party(&self, user_id: UserId, status: Option<MatchStatus>) -> Result<Vec<Match>> {
        let rows = sqlx::query_as::<_, MatchRow>(
            r#"
            SELECT * FROM matches
            WHERE (hunter_id = $1 OR landowner_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY start_time ASC, id ASC
            "#,
        )
        .bind(user_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        convert(rows)
    }

    #[instrument(skip(self), err)]
    async fn complete_elapsed(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("UPDATE matches SET status = 'completed' WHERE status = 'confirmed' AND end_time <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
