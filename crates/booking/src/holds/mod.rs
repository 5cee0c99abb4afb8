//! Time-bounded seat holds.

mod hold;
mod manager;
mod sweeper;

pub use hold::{Hold, HoldStatus};
pub use manager::{HoldGuard, HoldManager};
pub use sweeper::SweepReport;
