//! Facade over inventory, holds, pricing and orders.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use common::{DraftId, HoldId, Money, OrderId, OwnerToken, SeatId, ShowId};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::holds::{Hold, HoldManager, SweepReport};
use crate::inventory::{Availability, Seat, SeatInventory, SeatSpec};
use crate::orders::{ConfirmedOrder, Customer, DraftPatch, OrderDraft, OrderLifecycle};
use crate::pricing::{AgeCategory, PricingEngine};
use crate::store::OrderStore;

/// The seat reservation engine.
///
/// Cheap to share behind an `Arc`; every operation takes `&self`.
pub struct BookingEngine<S: OrderStore> {
    inventory: Arc<SeatInventory>,
    holds: Arc<HoldManager>,
    orders: OrderLifecycle<S>,
    pricing: PricingEngine,
}

impl<S: OrderStore> BookingEngine<S> {
    /// Creates an engine over `store` with the given clock and settings.
    pub fn new(store: S, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        let inventory = Arc::new(SeatInventory::new());
        let holds = Arc::new(HoldManager::new(inventory.clone(), clock, config));
        let orders = OrderLifecycle::new(holds.clone(), inventory.clone(), store);
        Self {
            inventory,
            holds,
            orders,
            pricing: PricingEngine::new(),
        }
    }

    /// Creates an engine on wall-clock time.
    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self::new(store, Arc::new(SystemClock), config)
    }

    pub fn config(&self) -> &EngineConfig {
        self.holds.config()
    }

    pub fn store(&self) -> &S {
        self.orders.store()
    }

    // Shows and seats

    /// Adds a show with every seat available.
    #[tracing::instrument(skip(self, seats), fields(seats = seats.len()))]
    pub fn register_show(&self, show_id: ShowId, seats: Vec<SeatSpec>) -> Result<()> {
        self.inventory.register_show(show_id, seats)
    }

    /// Lists a show's seats ordered by row and number.
    pub fn get_seats(&self, show_id: &ShowId) -> Result<Vec<Seat>> {
        self.inventory.get_seats(show_id)
    }

    pub fn availability(&self, show_id: &ShowId) -> Result<Availability> {
        self.inventory.availability(show_id)
    }

    // Holds

    pub async fn create_hold(
        &self,
        show_id: ShowId,
        seat_ids: BTreeSet<SeatId>,
        owner: OwnerToken,
        ttl: Option<Duration>,
    ) -> Result<Hold> {
        self.holds.create_hold(show_id, seat_ids, owner, ttl).await
    }

    pub async fn get_hold(&self, hold_id: HoldId) -> Result<Hold> {
        self.holds.get_hold(hold_id).await
    }

    pub async fn release_hold(&self, hold_id: HoldId, owner: &OwnerToken) -> Result<Hold> {
        self.holds.release_hold(hold_id, owner).await
    }

    pub async fn extend_hold(
        &self,
        hold_id: HoldId,
        owner: &OwnerToken,
        additional_ttl: Duration,
    ) -> Result<Hold> {
        self.holds.extend_hold(hold_id, owner, additional_ttl).await
    }

    pub async fn add_seats(
        &self,
        hold_id: HoldId,
        owner: &OwnerToken,
        seat_ids: &BTreeSet<SeatId>,
    ) -> Result<Hold> {
        self.holds.add_seats(hold_id, owner, seat_ids).await
    }

    pub async fn remove_seats(
        &self,
        hold_id: HoldId,
        owner: &OwnerToken,
        seat_ids: &BTreeSet<SeatId>,
    ) -> Result<Hold> {
        self.holds.remove_seats(hold_id, owner, seat_ids).await
    }

    /// Runs one expiry pass immediately.
    pub async fn sweep_expired(&self) -> SweepReport {
        self.holds.sweep_expired().await
    }

    /// Starts the background expiry task.
    pub fn spawn_sweeper(&self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        self.holds.clone().spawn_sweeper(shutdown)
    }

    // Pricing

    pub fn price_for(&self, base_price: Money, category: AgeCategory) -> Result<Money> {
        self.pricing.price_for(base_price, category)
    }

    // Orders

    pub async fn create_draft(
        &self,
        show_id: ShowId,
        hold_id: HoldId,
        owner: &OwnerToken,
        seat_categories: BTreeMap<SeatId, AgeCategory>,
        customer: Customer,
    ) -> Result<OrderDraft> {
        self.orders
            .create_draft(show_id, hold_id, owner, seat_categories, customer)
            .await
    }

    pub async fn update_draft(
        &self,
        draft_id: DraftId,
        owner: &OwnerToken,
        patch: DraftPatch,
    ) -> Result<OrderDraft> {
        self.orders.update_draft(draft_id, owner, patch).await
    }

    pub async fn get_draft(&self, draft_id: DraftId, owner: &OwnerToken) -> Result<OrderDraft> {
        self.orders.get_draft(draft_id, owner).await
    }

    pub async fn confirm(&self, draft_id: DraftId, owner: &OwnerToken) -> Result<ConfirmedOrder> {
        self.orders.confirm(draft_id, owner).await
    }

    pub async fn get_order(&self, order_id: OrderId) -> Result<ConfirmedOrder> {
        self.orders.get_order(order_id).await
    }
}
