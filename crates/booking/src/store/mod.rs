//! Persistence seam for drafts and confirmed orders.

mod memory;

use async_trait::async_trait;
use common::{DraftId, OrderId};
use thiserror::Error;

use crate::orders::{ConfirmedOrder, OrderDraft};

pub use memory::InMemoryOrderStore;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing storage could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The record already exists or was already confirmed.
    #[error("Store conflict: {0}")]
    Conflict(String),

    /// The confirmation code is taken by another order.
    #[error("Confirmation code taken: {0}")]
    CodeTaken(String),
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Storage for order drafts and confirmed orders.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts or replaces a draft.
    async fn save_draft(&self, draft: OrderDraft) -> StoreResult<()>;

    /// Loads a draft by id.
    async fn get_draft(&self, draft_id: DraftId) -> StoreResult<Option<OrderDraft>>;

    /// Persists a confirmed order.
    ///
    /// Fails with [`StoreError::Conflict`] if an order with the same id
    /// exists and with [`StoreError::CodeTaken`] if its confirmation code is
    /// in use. Nothing is written in either case.
    async fn insert_confirmed(&self, order: ConfirmedOrder) -> StoreResult<()>;

    /// Loads a confirmed order by id.
    async fn get_confirmed(&self, order_id: OrderId) -> StoreResult<Option<ConfirmedOrder>>;
}
