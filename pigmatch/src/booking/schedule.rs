//! Booking windows, the capacity admission rule and the per-property interval index.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Bound;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{Error, Result};
use crate::types::MatchId;

/// Half-open time interval `[start, end)` a hunter is booked onto a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BookingWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BookingWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(Error::InvalidWindow {
                message: format!("end {end} must be after start {start}"),
            });
        }
        Ok(Self { start, end })
    }

    /// Back-to-back windows (one ends exactly when the other starts) do not overlap.
    pub fn overlaps(&self, other: &BookingWindow) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }
}

/// Number of confirmed bookings a property accepts at any instant.
pub fn capacity(max_hunters: Option<u32>) -> u32 {
    max_hunters.filter(|n| *n > 0).unwrap_or(1)
}

/// Admission rule: a new booking fits iff fewer than `capacity` confirmed bookings overlap it.
pub fn admit(max_hunters: Option<u32>, overlapping: usize) -> Result<()> {
    let capacity = capacity(max_hunters);
    if overlapping < capacity as usize {
        Ok(())
    } else {
        Err(Error::Conflict {
            message: format!("{overlapping} overlapping confirmed booking(s), capacity is {capacity}"),
        })
    }
}

/// Confirmed bookings of one property, ordered by (start, match id).
///
/// Tracks the longest span ever inserted so an overlap query only needs to scan starts in
/// `[window.start - longest_span, window.end)`. The bound is not shrunk on removal, which keeps
/// it an upper bound and the query exact.
#[derive(Debug, Clone, Default)]
pub struct PropertySchedule {
    entries: BTreeMap<(DateTime<Utc>, MatchId), DateTime<Utc>>,
    longest_span: Duration,
}

impl PropertySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, match_id: MatchId, window: BookingWindow) {
        self.longest_span = self.longest_span.max(window.span());
        self.entries.insert((window.start, match_id), window.end);
    }

    pub fn remove(&mut self, match_id: MatchId, window: BookingWindow) -> bool {
        self.entries.remove(&(window.start, match_id)).is_some()
    }

    /// Ids of scheduled bookings overlapping `window`, in start order.
    pub fn overlapping(&self, window: &BookingWindow) -> Vec<MatchId> {
        let lower = match window.start.checked_sub_signed(self.longest_span) {
            Some(earliest) => Bound::Included((earliest, Uuid::nil())),
            None => Bound::Unbounded,
        };
        // (end, nil) sorts before every key starting at `end`
        let upper = Bound::Excluded((window.end, Uuid::nil()));

        self.entries
            .range((lower, upper))
            .filter(|(_, end)| **end > window.start)
            .map(|((_, id), _)| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, hour, 0, 0).unwrap()
    }

    fn window(start: u32, end: u32) -> BookingWindow {
        BookingWindow::new(at(start), at(end)).unwrap()
    }

    #[test]
    fn test_window_rejects_empty_and_inverted() {
        assert!(matches!(BookingWindow::new(at(9), at(9)), Err(Error::InvalidWindow { .. })));
        assert!(matches!(BookingWindow::new(at(10), at(9)), Err(Error::InvalidWindow { .. })));
    }

    #[test]
    fn test_overlap_is_half_open() {
        assert!(window(9, 12).overlaps(&window(11, 13)));
        assert!(window(11, 13).overlaps(&window(9, 12)));
        assert!(!window(9, 12).overlaps(&window(12, 14)));
        assert!(!window(12, 14).overlaps(&window(9, 12)));
        assert!(window(9, 17).overlaps(&window(10, 11)));
    }

    #[test]
    fn test_admit_uses_capacity() {
        assert!(admit(None, 0).is_ok());
        assert!(matches!(admit(None, 1), Err(Error::Conflict { .. })));
        assert!(matches!(admit(Some(0), 1), Err(Error::Conflict { .. })));
        assert!(admit(Some(3), 2).is_ok());
        assert!(matches!(admit(Some(3), 3), Err(Error::Conflict { .. })));
    }

    #[test]
    fn test_schedule_range_query() {
        let mut schedule = PropertySchedule::new();
        let long = Uuid::new_v4();
        let short = Uuid::new_v4();
        let later = Uuid::new_v4();
        schedule.insert(long, window(0, 10));
        schedule.insert(short, window(11, 12));
        schedule.insert(later, window(14, 16));

        // A long booking that started well before the query window is still found
        assert_eq!(schedule.overlapping(&window(9, 11)), vec![long]);
        assert_eq!(schedule.overlapping(&window(10, 11)), Vec::<MatchId>::new());
        assert_eq!(schedule.overlapping(&window(11, 15)), vec![short, later]);
        assert_eq!(schedule.overlapping(&window(16, 18)), Vec::<MatchId>::new());

        assert!(schedule.remove(long, window(0, 10)));
        assert!(!schedule.remove(long, window(0, 10)));
        assert!(schedule.overlapping(&window(9, 11)).is_empty());
        assert_eq!(schedule.len(), 2);
    }

    #[test]
    fn test_same_start_distinct_matches() {
        let mut schedule = PropertySchedule::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        schedule.insert(a, window(8, 10));
        schedule.insert(b, window(8, 9));
        let mut found = schedule.overlapping(&window(8, 9));
        found.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(found, expected);
    }
}
