//! Shared types for the seat booking engine.

mod money;
mod types;

pub use money::Money;
pub use types::{DraftId, HoldId, IdError, OrderId, OwnerToken, SeatId, ShowId};
