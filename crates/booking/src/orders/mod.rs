//! Order drafts, confirmation and confirmed orders.

mod confirmed;
mod draft;
mod lifecycle;

pub use confirmed::{ConfirmedOrder, generate_confirmation_code};
pub use draft::{Customer, DraftPatch, OrderDraft};
pub use lifecycle::OrderLifecycle;
