use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{DraftId, OrderId};
use tokio::sync::RwLock;

use crate::orders::{ConfirmedOrder, OrderDraft};

use super::{OrderStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct MemoryState {
    drafts: HashMap<DraftId, OrderDraft>,
    orders: HashMap<OrderId, ConfirmedOrder>,
    /// Confirmation code index.
    codes: HashMap<String, OrderId>,
    unavailable: bool,
    forced_conflicts: usize,
}

/// In-memory order store.
///
/// Cloning is cheap and every clone sees the same data, so tests can keep a
/// handle to flip failure modes while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail with [`StoreError::Unavailable`] until reset.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    /// Rejects the next `count` confirmed-order inserts as code collisions.
    pub async fn force_code_conflicts(&self, count: usize) {
        self.state.write().await.forced_conflicts = count;
    }

    /// Returns the number of confirmed orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

fn check_available(state: &MemoryState) -> StoreResult<()> {
    if state.unavailable {
        Err(StoreError::Unavailable("in-memory store is offline".to_string()))
    } else {
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn save_draft(&self, draft: OrderDraft) -> StoreResult<()> {
        let mut state = self.state.write().await;
        check_available(&state)?;
        if state.orders.contains_key(&draft.draft_id) {
            return Err(StoreError::Conflict(format!(
                "draft {} is already confirmed",
                draft.draft_id
            )));
        }
        state.drafts.insert(draft.draft_id, draft);
        Ok(())
    }

    async fn get_draft(&self, draft_id: DraftId) -> StoreResult<Option<OrderDraft>> {
        let state = self.state.read().await;
        check_available(&state)?;
        Ok(state.drafts.get(&draft_id).cloned())
    }

    async fn insert_confirmed(&self, order: ConfirmedOrder) -> StoreResult<()> {
        let mut state = self.state.write().await;
        check_available(&state)?;

        if state.forced_conflicts > 0 {
            state.forced_conflicts -= 1;
            return Err(StoreError::CodeTaken(format!(
                "confirmation code {} already in use",
                order.confirmation_code
            )));
        }
        if state.orders.contains_key(&order.order_id) {
            return Err(StoreError::Conflict(format!(
                "order {} already exists",
                order.order_id
            )));
        }
        if state.codes.contains_key(&order.confirmation_code) {
            return Err(StoreError::CodeTaken(format!(
                "confirmation code {} already in use",
                order.confirmation_code
            )));
        }

        state
            .codes
            .insert(order.confirmation_code.clone(), order.order_id);
        state.orders.insert(order.order_id, order);
        Ok(())
    }

    async fn get_confirmed(&self, order_id: OrderId) -> StoreResult<Option<ConfirmedOrder>> {
        let state = self.state.read().await;
        check_available(&state)?;
        Ok(state.orders.get(&order_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use common::{Money, ShowId};

    use super::*;
    use crate::orders::Customer;

    fn order(code: &str) -> ConfirmedOrder {
        ConfirmedOrder {
            order_id: OrderId::new(),
            confirmation_code: code.to_string(),
            show_id: ShowId::parse("S1").unwrap(),
            seats: vec![],
            lines: BTreeMap::new(),
            customer: Customer::new("Ada", "ada@example.com"),
            subtotal: Money::zero(),
            confirmed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_and_get_confirmed() {
        let store = InMemoryOrderStore::new();
        let order = order("ABCD2345");
        store.insert_confirmed(order.clone()).await.unwrap();

        let loaded = store.get_confirmed(order.order_id).await.unwrap();
        assert_eq!(loaded, Some(order));
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn duplicate_code_is_rejected() {
        let store = InMemoryOrderStore::new();
        store.insert_confirmed(order("ABCD2345")).await.unwrap();

        let err = store.insert_confirmed(order("ABCD2345")).await.unwrap_err();
        assert!(matches!(err, StoreError::CodeTaken(_)));
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn duplicate_order_id_is_rejected() {
        let store = InMemoryOrderStore::new();
        let first = order("ABCD2345");
        let mut second = order("WXYZ6789");
        second.order_id = first.order_id;

        store.insert_confirmed(first).await.unwrap();
        let err = store.insert_confirmed(second).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = InMemoryOrderStore::new();
        store.set_unavailable(true).await;

        let err = store.get_confirmed(OrderId::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.insert_confirmed(order("ABCD2345")).await.is_err());

        store.set_unavailable(false).await;
        assert!(store.insert_confirmed(order("ABCD2345")).await.is_ok());
    }

    #[tokio::test]
    async fn forced_conflicts_are_consumed() {
        let store = InMemoryOrderStore::new();
        store.force_code_conflicts(1).await;

        let err = store.insert_confirmed(order("ABCD2345")).await.unwrap_err();
        assert!(matches!(err, StoreError::CodeTaken(_)));
        assert!(store.insert_confirmed(order("ABCD2345")).await.is_ok());
    }
}
