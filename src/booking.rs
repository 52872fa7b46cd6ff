// Room bookings: creation workflow, cancellation and per-guest listings

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::{
    auth::User,
    availability::{conflicts_for, is_room_available, stay_price, RangeError, StayRange},
    catalog::{Catalog, Room},
    notify::{Classify, FailureKind},
    store::{load_collection, save_collection, IdGenerator, KeyValueStore, StoreError, BOOKINGS_KEY},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: u64,
    pub user_id: u64,
    // Snapshot of the room as it was when booked
    pub room: Room,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    pub num_guests: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
    pub status: BookingStatus,
    pub total_price: f64,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn stay(&self) -> StayRange {
        StayRange::unchecked(self.check_in_date, self.check_out_date)
    }

    // Cancelled bookings release their dates
    pub fn holds_room(&self) -> bool {
        self.status != BookingStatus::Cancelled
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookingRequest {
    pub room_id: u64,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    pub num_guests: u32,
    pub special_requests: Option<String>,
}

// Where a booking attempt is in the admission workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStage {
    CollectingInput,
    Validating,
    CheckingAvailability,
    Admitted,
    Persisted,
    Rejected,
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Please select check-in and check-out dates")]
    MissingDates,

    #[error(transparent)]
    InvalidRange(#[from] RangeError),

    #[error("Please login to book a room")]
    NotAuthenticated,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Room {0} not found")]
    UnknownRoom(u64),

    #[error("Room sleeps {capacity}, cannot book for {requested} guests")]
    GuestCount { requested: u32, capacity: u32 },

    #[error("Room {room_id} is not available from {check_in} to {check_out}")]
    Unavailable {
        room_id: u64,
        check_in: NaiveDate,
        check_out: NaiveDate,
    },

    #[error("Booking {0} not found")]
    NotFound(u64),

    #[error("Booking {id} is {status} and cannot be cancelled")]
    NotCancellable { id: u64, status: BookingStatus },

    #[error("Booking {0} belongs to another guest")]
    NotOwner(u64),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl Classify for BookingError {
    fn kind(&self) -> FailureKind {
        match self {
            BookingError::Unavailable { .. } => FailureKind::Conflict,
            BookingError::NotFound(_)
            | BookingError::NotCancellable { .. }
            | BookingError::NotOwner(_) => FailureKind::State,
            BookingError::Storage(_) => FailureKind::Internal,
            _ => FailureKind::Validation,
        }
    }
}

impl BookingError {
    // The workflow stage that turned the attempt away
    pub fn stage(&self) -> BookingStage {
        match self {
            BookingError::Unavailable { .. } => BookingStage::CheckingAvailability,
            BookingError::Storage(_) => BookingStage::Admitted,
            _ => BookingStage::Validating,
        }
    }
}

fn required(value: &str, field: &'static str) -> Result<(), BookingError> {
    if value.trim().is_empty() {
        return Err(BookingError::MissingField(field));
    }
    Ok(())
}

pub struct BookingService {
    store: Arc<dyn KeyValueStore>,
    catalog: Arc<Catalog>,
    // Held across check-then-insert so two admissions can't interleave
    bookings: Mutex<Vec<Booking>>,
    ids: IdGenerator,
}

impl BookingService {
    pub async fn load(store: Arc<dyn KeyValueStore>, catalog: Arc<Catalog>) -> Result<Self, StoreError> {
        let bookings: Vec<Booking> = load_collection(store.as_ref(), BOOKINGS_KEY).await?;
        let max_id = bookings.iter().map(|b| b.id).max().unwrap_or(0);
        info!(bookings = bookings.len(), "booking service loaded");

        Ok(Self {
            store,
            catalog,
            bookings: Mutex::new(bookings),
            ids: IdGenerator::starting_after(max_id),
        })
    }

    // Runs the admission workflow for one booking attempt.
    //
    // Checks run in order: date range, authentication, contact fields, room and
    // guest count, then availability. The first failing check is returned and
    // nothing is stored. On success the booking is `Pending` and already persisted.
    #[instrument(skip(self, requester, request), fields(room_id = request.room_id))]
    pub async fn create_booking(
        &self,
        requester: Option<&User>,
        request: BookingRequest,
    ) -> Result<Booking, BookingError> {
        let mut stage = BookingStage::CollectingInput;
        debug!(?stage);

        let result = self.admit(requester, request, &mut stage).await;
        if let Err(e) = &result {
            warn!(?stage, error = %e, "booking rejected");
            stage = BookingStage::Rejected;
            debug!(?stage);
        }
        result
    }

    async fn admit(
        &self,
        requester: Option<&User>,
        request: BookingRequest,
        stage: &mut BookingStage,
    ) -> Result<Booking, BookingError> {
        *stage = BookingStage::Validating;

        let (Some(check_in), Some(check_out)) = (request.check_in, request.check_out) else {
            return Err(BookingError::MissingDates);
        };
        let range = StayRange::new(check_in, check_out)?;

        let user = requester.ok_or(BookingError::NotAuthenticated)?;

        required(&request.guest_name, "name")?;
        required(&request.guest_email, "email")?;
        required(&request.guest_phone, "phone")?;

        let room = self
            .catalog
            .room_by_id(request.room_id)
            .ok_or(BookingError::UnknownRoom(request.room_id))?
            .clone();
        if request.num_guests == 0 || request.num_guests > room.capacity {
            return Err(BookingError::GuestCount {
                requested: request.num_guests,
                capacity: room.capacity,
            });
        }

        *stage = BookingStage::CheckingAvailability;
        let mut bookings = self.bookings.lock().await;
        if let Some(conflict) = conflicts_for(room.id, &range, bookings.iter()).next() {
            debug!(conflicting_booking = conflict.id, "dates overlap an existing booking");
            return Err(BookingError::Unavailable {
                room_id: room.id,
                check_in,
                check_out,
            });
        }

        *stage = BookingStage::Admitted;
        let booking = Booking {
            id: self.ids.next_id(),
            user_id: user.id,
            total_price: stay_price(room.price, &range),
            room,
            check_in_date: check_in,
            check_out_date: check_out,
            guest_name: request.guest_name.trim().to_string(),
            guest_email: request.guest_email.trim().to_string(),
            guest_phone: request.guest_phone.trim().to_string(),
            num_guests: request.num_guests,
            special_requests: request.special_requests.filter(|s| !s.trim().is_empty()),
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        };

        bookings.push(booking.clone());
        if let Err(e) = save_collection(self.store.as_ref(), BOOKINGS_KEY, bookings.as_slice()).await {
            bookings.pop();
            return Err(e.into());
        }

        *stage = BookingStage::Persisted;
        info!(
            booking_id = booking.id,
            user_id = booking.user_id,
            nights = range.nights(),
            total = booking.total_price,
            "booking created"
        );
        Ok(booking)
    }

    // Flips a booking to `Cancelled`. Pending and confirmed bookings can be
    // cancelled; cancelling an already cancelled booking is a no-op.
    pub async fn cancel_booking(&self, id: u64) -> Result<Booking, BookingError> {
        let mut bookings = self.bookings.lock().await;
        let index = bookings
            .iter()
            .position(|b| b.id == id)
            .ok_or(BookingError::NotFound(id))?;

        let previous = bookings[index].status;
        match previous {
            BookingStatus::Cancelled => return Ok(bookings[index].clone()),
            BookingStatus::Completed => {
                return Err(BookingError::NotCancellable {
                    id,
                    status: previous,
                })
            }
            BookingStatus::Pending | BookingStatus::Confirmed => {}
        }

        bookings[index].status = BookingStatus::Cancelled;
        if let Err(e) = save_collection(self.store.as_ref(), BOOKINGS_KEY, bookings.as_slice()).await {
            bookings[index].status = previous;
            return Err(e.into());
        }

        info!(booking_id = id, from = %previous, "booking cancelled");
        Ok(bookings[index].clone())
    }

    // Raw check; does not validate the range shape
    pub async fn is_available(&self, room_id: u64, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        let range = StayRange::unchecked(check_in, check_out);
        let bookings = self.bookings.lock().await;
        is_room_available(room_id, &range, bookings.iter())
    }

    pub async fn available_rooms(&self, range: &StayRange) -> Vec<Room> {
        let bookings = self.bookings.lock().await;
        self.catalog
            .rooms()
            .iter()
            .filter(|room| is_room_available(room.id, range, bookings.iter()))
            .cloned()
            .collect()
    }

    pub async fn get(&self, id: u64) -> Option<Booking> {
        self.bookings.lock().await.iter().find(|b| b.id == id).cloned()
    }

    pub async fn bookings(&self) -> Vec<Booking> {
        self.bookings.lock().await.clone()
    }

    // `status` of None lists every booking of the user
    pub async fn bookings_for_user(&self, user_id: u64, status: Option<BookingStatus>) -> Vec<Booking> {
        self.bookings
            .lock()
            .await
            .iter()
            .filter(|b| b.user_id == user_id)
            .filter(|b| status.map_or(true, |s| b.status == s))
            .cloned()
            .collect()
    }
}
