//! Confirmed bookings ("matches") and the rule that keeps them within property capacity.
//!
//! A match is only ever created by [`BookingLedger::reserve`], which storage executes as one
//! atomic step per property: count the overlapping confirmed matches, apply [`admit`], insert
//! the match and move the approving request from pending to approved.

use std::sync::Arc;

use tracing::instrument;

use crate::clock::Clock;
use crate::db::models::matches::{Match, MatchStatus};
use crate::errors::{Error, Result};
use crate::notifications;
use crate::requests::{AccessRequest, Approved};
use crate::storage::{Reservation, Storage};
use crate::types::{MatchId, UserId};

mod schedule;

pub use schedule::{BookingWindow, PropertySchedule, admit, capacity};

#[derive(Debug, Clone)]
pub struct BookingLedger<S> {
    storage: S,
    clock: Arc<dyn Clock>,
}

impl<S: Storage> BookingLedger<S> {
    pub fn new(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Admit and record a booking for a pending request.
    ///
    /// On `Conflict` nothing is written and the request stays pending.
    #[instrument(skip(self, reservation), fields(request_id = %reservation.request.data.id), err)]
    pub async fn reserve(&self, reservation: Reservation) -> Result<(AccessRequest<Approved>, Match)> {
        let (approved, booking) = self.storage.reserve(reservation).await?;
        notifications::booking_created(&booking);
        Ok((approved, booking))
    }

    /// Cancel a confirmed booking that has not started yet. Either party may cancel.
    #[instrument(skip(self), err)]
    pub async fn cancel(&self, match_id: MatchId, caller_id: UserId) -> Result<Match> {
        let booking = self
            .storage
            .get_match(match_id)
            .await?
            .ok_or_else(|| Error::not_found("Match", match_id))?;

        if !booking.is_party(caller_id) {
            return Err(Error::forbidden("only the hunter or the landowner can cancel a booking"));
        }
        if !booking.is_confirmed() {
            return Err(Error::invalid_state(format!("match {match_id} is already {}", booking.status)));
        }
        let now = self.clock.now();
        if booking.start_time <= now {
            return Err(Error::Expired { match_id });
        }

        let cancelled = self.storage.cancel_match(match_id, caller_id, now).await?;
        notifications::booking_cancelled(&cancelled);
        Ok(cancelled)
    }

    /// Bookings where `user_id` is the hunter or the landowner, by start time.
    pub async fn list_for_party(&self, user_id: UserId, status: Option<MatchStatus>) -> Result<Vec<Match>> {
        self.storage.matches_for_party(user_id, status).await
    }

    /// Mark every confirmed booking that ended at or before `now` as completed. Idempotent.
    #[instrument(skip(self), err)]
    pub async fn complete_elapsed(&self, now: chrono::DateTime<chrono::Utc>) -> Result<u64> {
        let completed = self.storage.complete_elapsed(now).await?;
        notifications::bookings_completed(completed);
        Ok(completed)
    }
}
