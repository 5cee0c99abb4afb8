//! Authoritative per-show seat state.
//!
//! Each show is its own partition behind its own lock, so work on one show
//! never waits on another. Seat status only changes through
//! [`SeatInventory::try_transition`], which applies to a whole seat set or
//! not at all.

mod seat;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use common::{Money, OwnerToken, SeatId, ShowId};
use serde::Serialize;

use crate::error::{BookingError, Result};

pub use seat::{Seat, SeatSpec, SeatStatus};

/// Seat counts per status for one show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub available: usize,
    pub held: usize,
    pub booked: usize,
}

impl Availability {
    /// Counts the seats of one snapshot.
    pub fn tally<'a>(seats: impl IntoIterator<Item = &'a Seat>) -> Self {
        let mut counts = Self::default();
        for seat in seats {
            match seat.status {
                SeatStatus::Available => counts.available += 1,
                SeatStatus::Held => counts.held += 1,
                SeatStatus::Booked => counts.booked += 1,
            }
        }
        counts
    }
}

/// Seats of one show, ordered by (row, number).
#[derive(Debug)]
struct ShowSeats {
    seats: Vec<Seat>,
    index: HashMap<SeatId, usize>,
}

impl ShowSeats {
    fn position(&self, seat_id: &SeatId) -> Option<usize> {
        self.index.get(seat_id).copied()
    }

    fn missing<'a>(&self, seat_ids: impl IntoIterator<Item = &'a SeatId>) -> Vec<SeatId> {
        seat_ids
            .into_iter()
            .filter(|id| !self.index.contains_key(*id))
            .cloned()
            .collect()
    }
}

/// In-memory seat inventory partitioned by show.
#[derive(Debug, Default)]
pub struct SeatInventory {
    shows: RwLock<HashMap<ShowId, Arc<RwLock<ShowSeats>>>>,
}

impl SeatInventory {
    /// Creates an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a show and its seats. Every seat starts out available.
    #[tracing::instrument(skip(self, seats), fields(seat_count = seats.len()))]
    pub fn register_show(&self, show_id: ShowId, seats: Vec<SeatSpec>) -> Result<()> {
        if seats.is_empty() {
            return Err(BookingError::Validation(format!(
                "show {show_id} must have at least one seat"
            )));
        }

        let mut seen = HashSet::new();
        for spec in &seats {
            if !seen.insert(spec.id.clone()) {
                return Err(BookingError::Validation(format!(
                    "duplicate seat id {} in show {show_id}",
                    spec.id
                )));
            }
            if spec.base_price.is_negative() {
                return Err(BookingError::Validation(format!(
                    "seat {} has a negative base price",
                    spec.id
                )));
            }
        }

        let mut seats: Vec<Seat> = seats.into_iter().map(Seat::from_spec).collect();
        seats.sort_by(|a, b| (&a.row, a.number, &a.id).cmp(&(&b.row, b.number, &b.id)));
        let index = seats
            .iter()
            .enumerate()
            .map(|(i, seat)| (seat.id.clone(), i))
            .collect();

        let mut shows = self.shows.write().unwrap_or_else(|e| e.into_inner());
        if shows.contains_key(&show_id) {
            return Err(BookingError::Validation(format!(
                "show {show_id} is already registered"
            )));
        }
        shows.insert(show_id, Arc::new(RwLock::new(ShowSeats { seats, index })));
        tracing::info!("show registered");
        Ok(())
    }

    /// Returns true if the show is known.
    pub fn has_show(&self, show_id: &ShowId) -> bool {
        self.shows
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(show_id)
    }

    /// Returns a consistent snapshot of every seat in the show.
    pub fn get_seats(&self, show_id: &ShowId) -> Result<Vec<Seat>> {
        let show = self.show(show_id)?;
        let seats = read(&show);
        Ok(seats.seats.clone())
    }

    /// Counts seats per status.
    pub fn availability(&self, show_id: &ShowId) -> Result<Availability> {
        let show = self.show(show_id)?;
        let seats = read(&show);
        Ok(Availability::tally(&seats.seats))
    }

    /// Looks up the immutable base price of each requested seat.
    pub fn base_prices(
        &self,
        show_id: &ShowId,
        seat_ids: &BTreeSet<SeatId>,
    ) -> Result<BTreeMap<SeatId, Money>> {
        let show = self.show(show_id)?;
        let seats = read(&show);

        let mut prices = BTreeMap::new();
        let mut missing = Vec::new();
        for id in seat_ids {
            match seats.position(id) {
                Some(i) => {
                    prices.insert(id.clone(), seats.seats[i].base_price);
                }
                None => missing.push(id.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(BookingError::SeatNotFound { seat_ids: missing });
        }
        Ok(prices)
    }

    /// Atomically moves every seat in `seat_ids` from `from` to `to`.
    ///
    /// Either all seats transition or none do. Fails with `SeatUnavailable`
    /// listing every seat that is not in `from`. Seats leaving `Held` or
    /// `Booked` must belong to `holder`.
    pub fn try_transition(
        &self,
        show_id: &ShowId,
        seat_ids: &BTreeSet<SeatId>,
        from: SeatStatus,
        to: SeatStatus,
        holder: &OwnerToken,
    ) -> Result<()> {
        if seat_ids.is_empty() {
            return Err(BookingError::Validation(
                "at least one seat is required".to_string(),
            ));
        }
        if !from.can_transition_to(to) {
            return Err(BookingError::Validation(format!(
                "illegal seat transition {from} -> {to}"
            )));
        }

        let show = self.show(show_id)?;
        let mut seats = write(&show);

        let missing = seats.missing(seat_ids);
        if !missing.is_empty() {
            return Err(BookingError::SeatNotFound { seat_ids: missing });
        }

        let positions: Vec<usize> = seat_ids
            .iter()
            .filter_map(|id| seats.position(id))
            .collect();

        let conflicts: Vec<SeatId> = positions
            .iter()
            .map(|&i| &seats.seats[i])
            .filter(|seat| seat.status != from || (from.is_owned() && !seat.is_held_by(holder)))
            .map(|seat| seat.id.clone())
            .collect();
        if !conflicts.is_empty() {
            return Err(BookingError::SeatUnavailable {
                seat_ids: conflicts,
            });
        }

        for i in positions {
            let seat = &mut seats.seats[i];
            seat.status = to;
            seat.holder = match to {
                SeatStatus::Available => None,
                SeatStatus::Held | SeatStatus::Booked => Some(holder.clone()),
            };
        }

        tracing::debug!(
            show_id = %show_id,
            seats = seat_ids.len(),
            %from,
            %to,
            "seats transitioned"
        );
        Ok(())
    }

    fn show(&self, show_id: &ShowId) -> Result<Arc<RwLock<ShowSeats>>> {
        self.shows
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(show_id)
            .cloned()
            .ok_or_else(|| BookingError::ShowNotFound(show_id.clone()))
    }
}

fn read(show: &RwLock<ShowSeats>) -> RwLockReadGuard<'_, ShowSeats> {
    show.read().unwrap_or_else(|e| e.into_inner())
}

fn write(show: &RwLock<ShowSeats>) -> RwLockWriteGuard<'_, ShowSeats> {
    show.write().unwrap_or_else(|e| e.into_inner())
}
