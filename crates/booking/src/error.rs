//! Booking error types.

use common::{HoldId, IdError, SeatId, ShowId};
use thiserror::Error;

use crate::store::StoreError;

/// Broad category of a [`BookingError`], used by transports to pick a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Expired,
    Unauthorized,
    Validation,
    Unavailable,
}

/// Errors returned by the booking engine.
///
/// Everything except [`BookingError::Unavailable`] is an expected outcome
/// that the caller can act on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    #[error("Show not found: {0}")]
    ShowNotFound(ShowId),

    #[error("Seats not found: {}", join(.seat_ids))]
    SeatNotFound { seat_ids: Vec<SeatId> },

    #[error("Hold not found: {0}")]
    HoldNotFound(HoldId),

    #[error("Order draft not found: {0}")]
    DraftNotFound(HoldId),

    #[error("Order not found: {0}")]
    OrderNotFound(HoldId),

    /// One or more seats are not in the state the operation requires.
    #[error("Seats unavailable: {}", join(.seat_ids))]
    SeatUnavailable { seat_ids: Vec<SeatId> },

    /// Draft seat selections do not match the hold's seat set.
    #[error("Seat set mismatch: missing [{}], unexpected [{}]", join(.missing), join(.unexpected))]
    SeatSetMismatch {
        missing: Vec<SeatId>,
        unexpected: Vec<SeatId>,
    },

    /// Seats could not be committed; the caller must restart the hold flow.
    #[error("Confirmation conflict for {hold_id}: {reason}")]
    ConfirmationConflict { hold_id: HoldId, reason: String },

    #[error("Hold expired or no longer active: {0}")]
    HoldExpired(HoldId),

    #[error("Caller does not own hold {0}")]
    NotOwner(HoldId),

    #[error("Invalid age category: {0}")]
    InvalidAgeCategory(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    /// Storage could not be reached. Not retried by the engine.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl BookingError {
    /// Returns the error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::ShowNotFound(_)
            | BookingError::SeatNotFound { .. }
            | BookingError::HoldNotFound(_)
            | BookingError::DraftNotFound(_)
            | BookingError::OrderNotFound(_) => ErrorKind::NotFound,
            BookingError::SeatUnavailable { .. }
            | BookingError::SeatSetMismatch { .. }
            | BookingError::ConfirmationConflict { .. } => ErrorKind::Conflict,
            BookingError::HoldExpired(_) => ErrorKind::Expired,
            BookingError::NotOwner(_) => ErrorKind::Unauthorized,
            BookingError::InvalidAgeCategory(_) | BookingError::Validation(_) => {
                ErrorKind::Validation
            }
            BookingError::Unavailable(_) => ErrorKind::Unavailable,
        }
    }

    /// Returns the stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::ShowNotFound(_) => "SHOW_NOT_FOUND",
            BookingError::SeatNotFound { .. } => "SEAT_NOT_FOUND",
            BookingError::HoldNotFound(_) => "HOLD_NOT_FOUND",
            BookingError::DraftNotFound(_) => "DRAFT_NOT_FOUND",
            BookingError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            BookingError::SeatUnavailable { .. } => "SEAT_UNAVAILABLE",
            BookingError::SeatSetMismatch { .. } => "SEAT_SET_MISMATCH",
            BookingError::ConfirmationConflict { .. } => "CONFIRMATION_CONFLICT",
            BookingError::HoldExpired(_) => "HOLD_EXPIRED",
            BookingError::NotOwner(_) => "NOT_OWNER",
            BookingError::InvalidAgeCategory(_) => "INVALID_AGE_CATEGORY",
            BookingError::Validation(_) => "INVALID_REQUEST",
            BookingError::Unavailable(_) => "UNAVAILABLE",
        }
    }

    /// Returns the seat ids attached to the error, if any.
    pub fn seat_ids(&self) -> Option<&[SeatId]> {
        match self {
            BookingError::SeatNotFound { seat_ids } | BookingError::SeatUnavailable { seat_ids } => {
                Some(seat_ids)
            }
            _ => None,
        }
    }
}

impl From<IdError> for BookingError {
    fn from(e: IdError) -> Self {
        BookingError::Validation(e.to_string())
    }
}

impl BookingError {
    /// Maps a storage failure on `hold_id`'s draft or order.
    ///
    /// Only an outage is `Unavailable`; a conflict means the draft was
    /// confirmed concurrently and the caller must restart the hold flow.
    pub fn from_store(hold_id: HoldId, e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(reason) => BookingError::Unavailable(reason),
            StoreError::Conflict(reason) | StoreError::CodeTaken(reason) => {
                BookingError::ConfirmationConflict { hold_id, reason }
            }
        }
    }
}

fn join(ids: &[SeatId]) -> String {
    ids.iter()
        .map(SeatId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience type alias for booking results.
pub type Result<T> = std::result::Result<T, BookingError>;
