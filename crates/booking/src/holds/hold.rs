//! Hold record and its state machine.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use common::{HoldId, OwnerToken, SeatId, ShowId};
use serde::Serialize;

/// The state of a hold.
///
/// State transitions:
/// ```text
/// Active ──┬──► Released
///          ├──► Expired
///          └──► Consumed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldStatus {
    #[default]
    Active,
    Released,
    Expired,
    Consumed,
}

impl HoldStatus {
    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, HoldStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HoldStatus::Active => "ACTIVE",
            HoldStatus::Released => "RELEASED",
            HoldStatus::Expired => "EXPIRED",
            HoldStatus::Consumed => "CONSUMED",
        }
    }
}

impl std::fmt::Display for HoldStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A time-bounded, exclusive claim on a set of seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hold {
    pub id: HoldId,
    pub show_id: ShowId,
    pub seat_ids: BTreeSet<SeatId>,
    #[serde(skip)]
    pub owner: OwnerToken,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: HoldStatus,
    /// When the hold left the active state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Hold {
    pub(crate) fn new(
        show_id: ShowId,
        seat_ids: BTreeSet<SeatId>,
        owner: OwnerToken,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: HoldId::new(),
            show_id,
            seat_ids,
            owner,
            created_at,
            expires_at,
            status: HoldStatus::Active,
            closed_at: None,
        }
    }

    /// Returns true if the hold is active and its deadline has passed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == HoldStatus::Active && self.expires_at <= now
    }

    /// Returns true if the hold can still be used at `now`.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.status == HoldStatus::Active && now < self.expires_at
    }

    pub fn is_owned_by(&self, token: &OwnerToken) -> bool {
        &self.owner == token
    }

    pub(crate) fn close(&mut self, status: HoldStatus, at: DateTime<Utc>) {
        self.status = status;
        self.closed_at = Some(at);
    }
}
