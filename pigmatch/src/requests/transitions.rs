use chrono::{DateTime, Utc};

use crate::booking::{BookingLedger, BookingWindow};
use crate::db::models::matches::Match;
use crate::errors::Result;
use crate::storage::{Reservation, Storage};

use super::types::{AccessRequest, Approved, Pending, Rejected};

impl AccessRequest<Pending> {
    /// Book the window through the ledger; the request only becomes approved if the booking
    /// is admitted.
    pub async fn approve<S: Storage>(
        self,
        window: BookingWindow,
        instructions: Option<String>,
        at: DateTime<Utc>,
        ledger: &BookingLedger<S>,
    ) -> Result<(AccessRequest<Approved>, Match)> {
        ledger
            .reserve(Reservation {
                request: self,
                window,
                instructions,
                reserved_at: at,
            })
            .await
    }

    pub async fn reject<S: Storage>(self, at: DateTime<Utc>, storage: &S) -> Result<AccessRequest<Rejected>> {
        storage.reject_request(self, at).await
    }
}
