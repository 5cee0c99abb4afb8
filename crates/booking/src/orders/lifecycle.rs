//! Draft and confirmation workflow.
//!
//! All draft mutations and confirmations run while holding the hold's lock
//! (see [`HoldManager::acquire`]), so they are serialized against release,
//! expiry and each other.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{DraftId, HoldId, OrderId, OwnerToken, SeatId, ShowId};

use crate::error::{BookingError, Result};
use crate::holds::{HoldGuard, HoldManager, HoldStatus};
use crate::inventory::{SeatInventory, SeatStatus};
use crate::pricing::{AgeCategory, PricingEngine, SeatSelection};
use crate::store::{OrderStore, StoreError};

use super::confirmed::{ConfirmedOrder, generate_confirmation_code};
use super::draft::{Customer, DraftPatch, OrderDraft};

/// Attempts at finding an unused confirmation code before giving up.
const MAX_CODE_ATTEMPTS: usize = 5;

/// Owns order drafts, confirmed orders and the `Held -> Booked` transition.
pub struct OrderLifecycle<S: OrderStore> {
    holds: Arc<HoldManager>,
    inventory: Arc<SeatInventory>,
    pricing: PricingEngine,
    store: S,
}

impl<S: OrderStore> OrderLifecycle<S> {
    pub fn new(holds: Arc<HoldManager>, inventory: Arc<SeatInventory>, store: S) -> Self {
        Self {
            holds,
            inventory,
            pricing: PricingEngine::new(),
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates or replaces the draft for an active hold.
    ///
    /// The keys of `seat_categories` must be exactly the hold's seats.
    #[tracing::instrument(skip(self, owner, seat_categories, customer))]
    pub async fn create_draft(
        &self,
        show_id: ShowId,
        hold_id: HoldId,
        owner: &OwnerToken,
        seat_categories: BTreeMap<SeatId, AgeCategory>,
        customer: Customer,
    ) -> Result<OrderDraft> {
        customer.validate()?;

        let mut guard = self.holds.acquire(hold_id, owner).await?;
        guard.ensure_active()?;
        let hold = guard.hold();

        if hold.show_id != show_id {
            return Err(BookingError::Validation(format!(
                "hold {hold_id} belongs to show {}, not {show_id}",
                hold.show_id
            )));
        }

        let requested: BTreeSet<SeatId> = seat_categories.keys().cloned().collect();
        if requested != hold.seat_ids {
            return Err(BookingError::SeatSetMismatch {
                missing: hold.seat_ids.difference(&requested).cloned().collect(),
                unexpected: requested.difference(&hold.seat_ids).cloned().collect(),
            });
        }

        let seat_selections = self.price(&show_id, &seat_categories)?;
        let subtotal = self.pricing.subtotal(&seat_selections)?;
        let now = self.holds.now();
        let created_at = self
            .store
            .get_draft(hold_id)
            .await
            .map_err(|e| BookingError::from_store(hold_id, e))?
            .map_or(now, |existing| existing.created_at);

        let draft = OrderDraft {
            draft_id: hold_id,
            hold_id,
            show_id,
            subtotal,
            seat_selections,
            customer,
            owner: owner.clone(),
            created_at,
            updated_at: now,
        };
        self.store
            .save_draft(draft.clone())
            .await
            .map_err(|e| BookingError::from_store(hold_id, e))?;

        tracing::info!(
            draft_id = %draft.draft_id,
            subtotal = %draft.subtotal,
            "order draft saved"
        );
        Ok(draft)
    }

    /// Applies a patch to an existing draft.
    ///
    /// Added seats are held before the draft is saved and removed seats are
    /// released after, so the hold always covers the saved draft.
    #[tracing::instrument(skip(self, owner, patch))]
    pub async fn update_draft(
        &self,
        draft_id: DraftId,
        owner: &OwnerToken,
        patch: DraftPatch,
    ) -> Result<OrderDraft> {
        let mut guard = self.holds.acquire(draft_id, owner).await?;
        guard.ensure_active()?;
        let mut draft = self.load_draft(draft_id, owner).await?;
        patch.validate(&draft.seat_ids())?;

        let repriced: BTreeMap<SeatId, AgeCategory> = patch
            .age_categories
            .iter()
            .chain(patch.add_seats.iter())
            .map(|(id, category)| (id.clone(), *category))
            .collect();
        let repriced = self.price(&draft.show_id, &repriced)?;

        let mut selections = draft.seat_selections.clone();
        for id in &patch.remove_seats {
            selections.remove(id);
        }
        selections.extend(repriced);
        let subtotal = self.pricing.subtotal(&selections)?;

        let added: BTreeSet<SeatId> = patch.add_seats.keys().cloned().collect();
        if !added.is_empty() {
            guard.add_seats(&added)?;
        }

        draft.seat_selections = selections;
        draft.subtotal = subtotal;
        if let Some(customer) = patch.customer {
            draft.customer = customer;
        }
        draft.updated_at = self.holds.now();

        if let Err(e) = self.store.save_draft(draft.clone()).await {
            if !added.is_empty() {
                if let Err(undo) = guard.remove_seats(&added) {
                    tracing::error!(%draft_id, error = %undo, "failed to release seats added to draft");
                }
            }
            return Err(BookingError::from_store(draft_id, e));
        }

        if !patch.remove_seats.is_empty() {
            guard.remove_seats(&patch.remove_seats)?;
        }

        tracing::info!(%draft_id, subtotal = %draft.subtotal, "order draft updated");
        Ok(draft)
    }

    /// Returns the current draft.
    pub async fn get_draft(&self, draft_id: DraftId, owner: &OwnerToken) -> Result<OrderDraft> {
        self.load_draft(draft_id, owner).await
    }

    /// Confirms a draft, booking its seats for good.
    ///
    /// Idempotent: confirming an already confirmed draft returns the stored
    /// order unchanged.
    #[tracing::instrument(skip(self, owner))]
    pub async fn confirm(&self, draft_id: DraftId, owner: &OwnerToken) -> Result<ConfirmedOrder> {
        let started = std::time::Instant::now();

        if let Some(order) = self.confirmed(draft_id).await? {
            self.load_draft(draft_id, owner).await?;
            tracing::debug!(%draft_id, "draft already confirmed");
            return Ok(order);
        }

        let draft = match self.load_draft(draft_id, owner).await {
            Err(BookingError::DraftNotFound(id)) => return Err(self.missing_draft(id).await),
            other => other?,
        };
        let mut guard = match self.holds.acquire(draft.hold_id, owner).await {
            Ok(guard) => guard,
            // Terminal holds are pruned after retention.
            Err(BookingError::HoldNotFound(id)) => return Err(BookingError::HoldExpired(id)),
            Err(e) => return Err(e),
        };

        // A concurrent confirm got here first.
        if guard.hold().status == HoldStatus::Consumed {
            return self.confirmed(draft_id).await?.ok_or_else(|| {
                BookingError::ConfirmationConflict {
                    hold_id: draft.hold_id,
                    reason: "hold was consumed without a stored order".to_string(),
                }
            });
        }
        guard.ensure_active()?;

        let seats = guard.hold().seat_ids.clone();
        if seats != draft.seat_ids() {
            return Err(BookingError::SeatSetMismatch {
                missing: seats.difference(&draft.seat_ids()).cloned().collect(),
                unexpected: draft.seat_ids().difference(&seats).cloned().collect(),
            });
        }

        self.inventory
            .try_transition(&draft.show_id, &seats, SeatStatus::Held, SeatStatus::Booked, owner)
            .map_err(|e| BookingError::ConfirmationConflict {
                hold_id: draft.hold_id,
                reason: e.to_string(),
            })?;

        let order = match self.persist(&draft, self.holds.now()).await {
            Ok(order) => order,
            Err(e) => {
                self.roll_back_booking(&guard, &seats, owner);
                return Err(e);
            }
        };
        guard.consume();

        metrics::counter!("orders_confirmed_total").increment(1);
        metrics::histogram!("order_confirm_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(
            order_id = %order.order_id,
            confirmation_code = %order.confirmation_code,
            subtotal = %order.subtotal,
            "order confirmed"
        );
        Ok(order)
    }

    /// Looks up a confirmed order.
    pub async fn get_order(&self, order_id: OrderId) -> Result<ConfirmedOrder> {
        self.confirmed(order_id)
            .await?
            .ok_or(BookingError::OrderNotFound(order_id))
    }

    async fn confirmed(&self, order_id: OrderId) -> Result<Option<ConfirmedOrder>> {
        self.store
            .get_confirmed(order_id)
            .await
            .map_err(|e| BookingError::from_store(order_id, e))
    }

    async fn persist(&self, draft: &OrderDraft, confirmed_at: DateTime<Utc>) -> Result<ConfirmedOrder> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let order = ConfirmedOrder {
                order_id: draft.draft_id,
                confirmation_code: generate_confirmation_code(),
                show_id: draft.show_id.clone(),
                seats: draft.seat_selections.keys().cloned().collect(),
                lines: draft.seat_selections.clone(),
                customer: draft.customer.clone(),
                subtotal: draft.subtotal,
                confirmed_at,
            };

            match self.store.insert_confirmed(order.clone()).await {
                Ok(()) => return Ok(order),
                Err(StoreError::CodeTaken(reason)) => {
                    tracing::debug!(attempt, %reason, "confirmation code collision");
                }
                Err(e) => return Err(BookingError::from_store(draft.hold_id, e)),
            }
        }

        Err(BookingError::Unavailable(format!(
            "no unique confirmation code after {MAX_CODE_ATTEMPTS} attempts"
        )))
    }

    /// Puts booked seats back on hold after a failed persist.
    fn roll_back_booking(&self, guard: &HoldGuard<'_>, seats: &BTreeSet<SeatId>, owner: &OwnerToken) {
        let hold = guard.hold();
        match self.inventory.try_transition(
            &hold.show_id,
            seats,
            SeatStatus::Booked,
            SeatStatus::Held,
            owner,
        ) {
            Ok(()) => tracing::warn!(hold_id = %hold.id, "order not persisted, booking rolled back"),
            Err(e) => tracing::error!(hold_id = %hold.id, error = %e, "booking rollback failed"),
        }
    }

    /// A hold that is no longer usable is reported as expired even when no
    /// draft was ever written for it.
    async fn missing_draft(&self, draft_id: DraftId) -> BookingError {
        match self.holds.get_hold(draft_id).await {
            Ok(hold) if matches!(hold.status, HoldStatus::Expired | HoldStatus::Released) => {
                BookingError::HoldExpired(draft_id)
            }
            Ok(_) | Err(BookingError::HoldNotFound(_)) => BookingError::DraftNotFound(draft_id),
            Err(e) => e,
        }
    }

    async fn load_draft(&self, draft_id: DraftId, owner: &OwnerToken) -> Result<OrderDraft> {
        let draft = self
            .store
            .get_draft(draft_id)
            .await
            .map_err(|e| BookingError::from_store(draft_id, e))?
            .ok_or(BookingError::DraftNotFound(draft_id))?;
        if !draft.is_owned_by(owner) {
            return Err(BookingError::NotOwner(draft_id));
        }
        Ok(draft)
    }

    fn price(
        &self,
        show_id: &ShowId,
        categories: &BTreeMap<SeatId, AgeCategory>,
    ) -> Result<BTreeMap<SeatId, SeatSelection>> {
        if categories.is_empty() {
            return Ok(BTreeMap::new());
        }
        let seat_ids: BTreeSet<SeatId> = categories.keys().cloned().collect();
        let base_prices = self.inventory.base_prices(show_id, &seat_ids)?;

        categories
            .iter()
            .map(|(id, category)| -> Result<(SeatId, SeatSelection)> {
                let base = base_prices
                    .get(id)
                    .copied()
                    .ok_or_else(|| BookingError::SeatNotFound {
                        seat_ids: vec![id.clone()],
                    })?;
                Ok((id.clone(), self.pricing.select(base, *category)?))
            })
            .collect()
    }
}
