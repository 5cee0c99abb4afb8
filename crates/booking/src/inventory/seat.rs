//! Seat state machine.

use common::{Money, OwnerToken, SeatId};
use serde::{Deserialize, Serialize};

/// The status of a seat for one show.
///
/// State transitions:
/// ```text
/// Available ──► Held ──► Booked
///     ▲           │        │
///     └───────────┘        └──► Held (rollback of an unpersisted booking)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    Held,
    Booked,
}

impl SeatStatus {
    /// Returns true if the inventory allows moving from `self` to `to`.
    pub fn can_transition_to(&self, to: SeatStatus) -> bool {
        matches!(
            (self, to),
            (SeatStatus::Available, SeatStatus::Held)
                | (SeatStatus::Held, SeatStatus::Available)
                | (SeatStatus::Held, SeatStatus::Booked)
                | (SeatStatus::Booked, SeatStatus::Held)
        )
    }

    /// Returns true if a holder token must match for a transition out of this state.
    pub fn is_owned(&self) -> bool {
        matches!(self, SeatStatus::Held | SeatStatus::Booked)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Available => "AVAILABLE",
            SeatStatus::Held => "HELD",
            SeatStatus::Booked => "BOOKED",
        }
    }
}

impl std::fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A seat as laid out when the show is scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatSpec {
    pub id: SeatId,
    pub row: String,
    pub number: u32,
    pub base_price: Money,
}

impl SeatSpec {
    pub fn new(id: SeatId, row: impl Into<String>, number: u32, base_price: Money) -> Self {
        Self {
            id,
            row: row.into(),
            number,
            base_price,
        }
    }
}

/// Snapshot of a seat and its current status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub id: SeatId,
    pub row: String,
    pub number: u32,
    pub base_price: Money,
    pub status: SeatStatus,
    /// Token of the session holding or having booked the seat.
    #[serde(skip)]
    pub(crate) holder: Option<OwnerToken>,
}

impl Seat {
    pub(crate) fn from_spec(spec: SeatSpec) -> Self {
        Self {
            id: spec.id,
            row: spec.row,
            number: spec.number,
            base_price: spec.base_price,
            status: SeatStatus::Available,
            holder: None,
        }
    }

    /// Returns true if the seat can be held right now.
    pub fn is_available(&self) -> bool {
        self.status == SeatStatus::Available
    }

    /// Returns true if `token` currently holds or booked this seat.
    pub fn is_held_by(&self, token: &OwnerToken) -> bool {
        self.holder.as_ref() == Some(token)
    }
}
