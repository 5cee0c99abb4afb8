//! Confirmed orders and their shareable confirmation codes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{Money, OrderId, SeatId, ShowId};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::pricing::SeatSelection;

use super::draft::Customer;

/// Characters used in confirmation codes. Omits 0/O and 1/I.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 8;

/// A permanent booking. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedOrder {
    /// Equal to the draft (and hold) id it was confirmed from.
    pub order_id: OrderId,
    pub confirmation_code: String,
    pub show_id: ShowId,
    pub seats: Vec<SeatId>,
    pub lines: BTreeMap<SeatId, SeatSelection>,
    pub customer: Customer,
    pub subtotal: Money,
    pub confirmed_at: DateTime<Utc>,
}

/// Generates a random confirmation code such as `K7QX2MHB`.
pub fn generate_confirmation_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| char::from(CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())]))
        .collect()
}
