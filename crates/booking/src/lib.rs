//! Seat reservation and order lifecycle engine.
//!
//! A customer session holds seats for a show, turns the hold into a priced
//! order draft, and confirms the draft into a permanent booking:
//!
//! ```text
//! AVAILABLE ──create_hold──► HELD ──confirm──► BOOKED
//!     ▲                        │
//!     └──release / expiry──────┘
//! ```
//!
//! # Concurrency
//!
//! Seat state is partitioned per show, each partition behind its own lock,
//! and changes only through all-or-nothing transitions. Each hold record has
//! its own async mutex; release, expiry, draft edits and confirmation all
//! serialize on it, so a hold is never both expired and consumed.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod holds;
pub mod inventory;
pub mod orders;
pub mod pricing;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use engine::BookingEngine;
pub use error::{BookingError, ErrorKind, Result};
pub use holds::{Hold, HoldGuard, HoldManager, HoldStatus, SweepReport};
pub use inventory::{Availability, Seat, SeatInventory, SeatSpec, SeatStatus};
pub use orders::{ConfirmedOrder, Customer, DraftPatch, OrderDraft, OrderLifecycle};
pub use pricing::{AgeCategory, PricingEngine, SeatSelection};
pub use store::{InMemoryOrderStore, OrderStore, StoreError};
