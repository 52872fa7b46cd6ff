// Room availability: half-open stay intervals and the overlap check used to admit bookings

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::booking::Booking;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("Check-out {check_out} must be at least one night after check-in {check_in}")]
    TooShort {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
}

// A stay covering the nights from `check_in` up to, but not including, `check_out`.
//
// A guest checking out on day D and another checking in on day D never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StayRange {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl StayRange {
    // Builds a stay of at least one night.
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, RangeError> {
        if (check_out - check_in).num_days() < 1 {
            return Err(RangeError::TooShort {
                check_in,
                check_out,
            });
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    // Builds a range without checking its shape. Stored bookings and raw
    // availability queries go through here; callers validate beforehand.
    pub fn unchecked(check_in: NaiveDate, check_out: NaiveDate) -> Self {
        Self {
            check_in,
            check_out,
        }
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    pub fn overlaps(&self, other: &StayRange) -> bool {
        self.check_in < other.check_out && self.check_out > other.check_in
    }

    // Whether the night starting on `date` belongs to this stay
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.check_in <= date && date < self.check_out
    }
}

// Bookings on `room_id` that still hold the room and collide with `candidate`.
pub fn conflicts_for<'a, I>(
    room_id: u64,
    candidate: &'a StayRange,
    bookings: I,
) -> impl Iterator<Item = &'a Booking> + 'a
where
    I: IntoIterator<Item = &'a Booking>,
    I::IntoIter: 'a,
{
    bookings
        .into_iter()
        .filter(move |b| b.room.id == room_id && b.holds_room())
        .filter(move |b| b.stay().overlaps(candidate))
}

// True iff no non-cancelled booking on `room_id` overlaps `candidate`.
pub fn is_room_available<'a, I>(room_id: u64, candidate: &StayRange, bookings: I) -> bool
where
    I: IntoIterator<Item = &'a Booking>,
{
    !bookings
        .into_iter()
        .any(|b| b.room.id == room_id && b.holds_room() && b.stay().overlaps(candidate))
}

// Nightly rate times nights, rounded to cents
pub fn stay_price(nightly_rate: f64, range: &StayRange) -> f64 {
    round_cents(nightly_rate * range.nights() as f64)
}

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
