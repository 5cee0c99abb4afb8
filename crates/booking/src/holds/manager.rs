//! Hold manager: creates, adjusts, releases, expires and consumes holds.
//!
//! Every hold record lives behind its own `tokio::sync::Mutex`. That lock is
//! the single arbitration point for the hold: release, extension, draft
//! edits, confirmation and expiry all take it and re-check the status under
//! it, so a hold can never be both expired and consumed.
//!
//! Lock order is always hold record, then show seats. The schedule mutex is
//! only held for short, non-awaiting critical sections.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::{HoldId, OwnerToken, SeatId, ShowId};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{BookingError, Result};
use crate::inventory::{SeatInventory, SeatStatus};

use super::hold::{Hold, HoldStatus};

type HoldSlot = Arc<AsyncMutex<Hold>>;

/// Deadline and retention indexes.
#[derive(Debug, Default)]
pub(super) struct Schedule {
    /// Active holds ordered by deadline.
    pub(super) deadlines: BTreeMap<(DateTime<Utc>, HoldId), ShowId>,
    /// Terminal holds ordered by the time they closed.
    pub(super) closed: BTreeSet<(DateTime<Utc>, HoldId)>,
}

/// Owner of every hold's lifetime, and the only writer of the
/// `Available <-> Held` seat transitions.
pub struct HoldManager {
    inventory: Arc<SeatInventory>,
    clock: Arc<dyn Clock>,
    pub(super) config: EngineConfig,
    holds: RwLock<HashMap<HoldId, HoldSlot>>,
    pub(super) schedule: Mutex<Schedule>,
}

impl HoldManager {
    /// Creates a hold manager over the given inventory.
    pub fn new(inventory: Arc<SeatInventory>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        Self {
            inventory,
            clock,
            config,
            holds: RwLock::new(HashMap::new()),
            schedule: Mutex::new(Schedule::default()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Holds every seat in `seat_ids` for `owner`, or none of them.
    ///
    /// On conflict the error lists exactly the seats that could not be held.
    #[tracing::instrument(skip(self, seat_ids, owner), fields(seats = seat_ids.len()))]
    pub async fn create_hold(
        &self,
        show_id: ShowId,
        seat_ids: BTreeSet<SeatId>,
        owner: OwnerToken,
        ttl: Option<Duration>,
    ) -> Result<Hold> {
        let ttl = self.resolve_ttl(ttl.unwrap_or(self.config.default_hold_ttl))?;
        if seat_ids.is_empty() {
            return Err(BookingError::Validation(
                "a hold needs at least one seat".to_string(),
            ));
        }
        if !self.inventory.has_show(&show_id) {
            return Err(BookingError::ShowNotFound(show_id));
        }

        // Due holds of this show may still pin seats the caller wants.
        self.reclaim_due(&show_id).await;

        if let Err(e) = self.inventory.try_transition(
            &show_id,
            &seat_ids,
            SeatStatus::Available,
            SeatStatus::Held,
            &owner,
        ) {
            if matches!(e, BookingError::SeatUnavailable { .. }) {
                metrics::counter!("hold_conflicts_total").increment(1);
            }
            return Err(e);
        }

        let now = self.clock.now();
        let hold = Hold::new(show_id, seat_ids, owner, now, now + ttl);
        let snapshot = hold.clone();

        self.holds
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(hold.id, Arc::new(AsyncMutex::new(hold)));
        self.schedule_deadline(&snapshot);

        metrics::counter!("holds_created_total").increment(1);
        tracing::info!(
            hold_id = %snapshot.id,
            expires_at = %snapshot.expires_at,
            "hold created"
        );
        Ok(snapshot)
    }

    /// Returns a snapshot of a hold. Due holds are expired first.
    pub async fn get_hold(&self, hold_id: HoldId) -> Result<Hold> {
        let mut hold = self.lock(hold_id).await?;
        let now = self.clock.now();
        if hold.is_due(now) {
            self.expire_lazily(&mut hold, now);
        }
        Ok(hold.clone())
    }

    /// Releases an active hold and returns its seats to the pool.
    ///
    /// Releasing a hold that already released or expired is acknowledged
    /// without change.
    #[tracing::instrument(skip(self, owner))]
    pub async fn release_hold(&self, hold_id: HoldId, owner: &OwnerToken) -> Result<Hold> {
        let mut guard = self.acquire(hold_id, owner).await?;
        guard.release()?;
        Ok(guard.hold().clone())
    }

    /// Pushes the deadline of an active hold out to at least `now + additional_ttl`.
    #[tracing::instrument(skip(self, owner))]
    pub async fn extend_hold(
        &self,
        hold_id: HoldId,
        owner: &OwnerToken,
        additional_ttl: Duration,
    ) -> Result<Hold> {
        let mut guard = self.acquire(hold_id, owner).await?;
        guard.ensure_active()?;
        guard.extend(additional_ttl)?;
        Ok(guard.hold().clone())
    }

    /// Adds seats to an active hold, all or nothing.
    #[tracing::instrument(skip(self, owner, seat_ids))]
    pub async fn add_seats(
        &self,
        hold_id: HoldId,
        owner: &OwnerToken,
        seat_ids: &BTreeSet<SeatId>,
    ) -> Result<Hold> {
        let mut guard = self.acquire(hold_id, owner).await?;
        guard.ensure_active()?;
        guard.add_seats(seat_ids)?;
        Ok(guard.hold().clone())
    }

    /// Returns some seats of an active hold to the pool.
    #[tracing::instrument(skip(self, owner, seat_ids))]
    pub async fn remove_seats(
        &self,
        hold_id: HoldId,
        owner: &OwnerToken,
        seat_ids: &BTreeSet<SeatId>,
    ) -> Result<Hold> {
        let mut guard = self.acquire(hold_id, owner).await?;
        guard.ensure_active()?;
        guard.remove_seats(seat_ids)?;
        Ok(guard.hold().clone())
    }

    /// Locks a hold on behalf of `owner`.
    ///
    /// The returned guard serializes every state change of the hold until it
    /// is dropped. Status is not checked here; see [`HoldGuard::ensure_active`].
    pub async fn acquire(&self, hold_id: HoldId, owner: &OwnerToken) -> Result<HoldGuard<'_>> {
        let hold = self.lock(hold_id).await?;
        if !hold.is_owned_by(owner) {
            return Err(BookingError::NotOwner(hold_id));
        }
        Ok(HoldGuard {
            manager: self,
            hold,
        })
    }

    /// Expires due holds of one show. Failures are left for the sweeper.
    async fn reclaim_due(&self, show_id: &ShowId) {
        let now = self.clock.now();
        let due: Vec<HoldId> = {
            let schedule = self.schedule.lock().unwrap_or_else(|e| e.into_inner());
            schedule
                .deadlines
                .iter()
                .take_while(|((deadline, _), _)| *deadline <= now)
                .filter(|(_, show)| *show == show_id)
                .map(|((_, id), _)| *id)
                .collect()
        };

        for hold_id in due {
            if let Ok(mut hold) = self.lock(hold_id).await {
                if hold.is_due(now) {
                    self.expire_lazily(&mut hold, now);
                }
            }
        }
    }

    pub(super) async fn lock(&self, hold_id: HoldId) -> Result<OwnedMutexGuard<Hold>> {
        let slot = self
            .holds
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&hold_id)
            .cloned()
            .ok_or(BookingError::HoldNotFound(hold_id))?;
        Ok(slot.lock_owned().await)
    }

    /// Moves a locked, active hold to `Expired` and frees its seats.
    ///
    /// On failure the deadline entry stays in place so the next sweep retries.
    pub(super) fn expire_locked(&self, hold: &mut Hold, now: DateTime<Utc>) -> Result<()> {
        self.inventory.try_transition(
            &hold.show_id,
            &hold.seat_ids,
            SeatStatus::Held,
            SeatStatus::Available,
            &hold.owner,
        )?;
        self.unschedule_deadline(hold);
        hold.close(HoldStatus::Expired, now);
        self.record_closed(hold);

        metrics::counter!("holds_expired_total").increment(1);
        tracing::info!(hold_id = %hold.id, show_id = %hold.show_id, "hold expired");
        Ok(())
    }

    /// Expires a due hold outside the sweeper. A failure is logged and counted,
    /// and the hold stays scheduled for the next sweep.
    fn expire_lazily(&self, hold: &mut Hold, now: DateTime<Utc>) {
        if let Err(e) = self.expire_locked(hold, now) {
            metrics::counter!("lazy_expiry_errors_total").increment(1);
            tracing::warn!(hold_id = %hold.id, error = %e, "lazy expiry failed");
        }
    }

    /// Drops terminal holds that closed before `cutoff`.
    pub(super) fn prune_closed(&self, cutoff: DateTime<Utc>) -> usize {
        let stale: Vec<HoldId> = {
            let mut schedule = self.schedule.lock().unwrap_or_else(|e| e.into_inner());
            let keep = schedule.closed.split_off(&(cutoff, HoldId::from_uuid(uuid::Uuid::nil())));
            let stale = std::mem::replace(&mut schedule.closed, keep);
            stale.into_iter().map(|(_, id)| id).collect()
        };

        if !stale.is_empty() {
            let mut holds = self.holds.write().unwrap_or_else(|e| e.into_inner());
            for id in &stale {
                holds.remove(id);
            }
        }
        stale.len()
    }

    fn resolve_ttl(&self, ttl: Duration) -> Result<chrono::Duration> {
        if ttl.is_zero() {
            return Err(BookingError::Validation(
                "hold ttl must be greater than zero".to_string(),
            ));
        }
        if ttl > self.config.max_hold_ttl {
            return Err(BookingError::Validation(format!(
                "hold ttl of {}s exceeds the maximum of {}s",
                ttl.as_secs(),
                self.config.max_hold_ttl.as_secs()
            )));
        }
        chrono::Duration::from_std(ttl)
            .map_err(|e| BookingError::Validation(format!("invalid hold ttl: {e}")))
    }

    fn schedule_deadline(&self, hold: &Hold) {
        self.schedule
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .deadlines
            .insert((hold.expires_at, hold.id), hold.show_id.clone());
    }

    fn unschedule_deadline(&self, hold: &Hold) {
        self.schedule
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .deadlines
            .remove(&(hold.expires_at, hold.id));
    }

    fn record_closed(&self, hold: &Hold) {
        if let Some(closed_at) = hold.closed_at {
            self.schedule
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .closed
                .insert((closed_at, hold.id));
        }
    }
}

/// Exclusive access to one hold record.
pub struct HoldGuard<'a> {
    manager: &'a HoldManager,
    hold: OwnedMutexGuard<Hold>,
}

impl HoldGuard<'_> {
    pub fn hold(&self) -> &Hold {
        &self.hold
    }

    /// Fails with `HoldExpired` unless the hold is active and not yet due.
    ///
    /// A hold found past its deadline is expired on the spot, so its seats
    /// are freed without waiting for the sweeper.
    pub fn ensure_active(&mut self) -> Result<()> {
        let now = self.manager.clock.now();
        if self.hold.is_due(now) {
            self.manager.expire_lazily(&mut self.hold, now);
        }
        if self.hold.is_usable(now) {
            Ok(())
        } else {
            Err(BookingError::HoldExpired(self.hold.id))
        }
    }

    /// Releases the hold. Already released or expired holds are left as is.
    pub fn release(&mut self) -> Result<()> {
        match self.hold.status {
            HoldStatus::Released | HoldStatus::Expired => return Ok(()),
            HoldStatus::Consumed => {
                return Err(BookingError::ConfirmationConflict {
                    hold_id: self.hold.id,
                    reason: "hold was already confirmed".to_string(),
                });
            }
            HoldStatus::Active => {}
        }

        let now = self.manager.clock.now();
        self.manager.inventory.try_transition(
            &self.hold.show_id,
            &self.hold.seat_ids,
            SeatStatus::Held,
            SeatStatus::Available,
            &self.hold.owner,
        )?;
        self.manager.unschedule_deadline(&self.hold);
        self.hold.close(HoldStatus::Released, now);
        self.manager.record_closed(&self.hold);

        metrics::counter!("holds_released_total").increment(1);
        tracing::info!(hold_id = %self.hold.id, "hold released");
        Ok(())
    }

    /// Sets the deadline to `max(expires_at, now + additional_ttl)`.
    pub fn extend(&mut self, additional_ttl: Duration) -> Result<()> {
        let additional = self.manager.resolve_ttl(additional_ttl)?;
        let candidate = self.manager.clock.now() + additional;
        if candidate <= self.hold.expires_at {
            return Ok(());
        }

        self.manager.unschedule_deadline(&self.hold);
        self.hold.expires_at = candidate;
        self.manager.schedule_deadline(&self.hold);
        tracing::debug!(hold_id = %self.hold.id, expires_at = %candidate, "hold extended");
        Ok(())
    }

    /// Holds additional seats for this hold, all or nothing.
    pub fn add_seats(&mut self, seat_ids: &BTreeSet<SeatId>) -> Result<()> {
        if seat_ids.is_empty() {
            return Ok(());
        }
        let already: Vec<SeatId> = seat_ids
            .intersection(&self.hold.seat_ids)
            .cloned()
            .collect();
        if !already.is_empty() {
            return Err(BookingError::Validation(format!(
                "seats already in hold: {}",
                already
                    .iter()
                    .map(SeatId::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        self.manager.inventory.try_transition(
            &self.hold.show_id,
            seat_ids,
            SeatStatus::Available,
            SeatStatus::Held,
            &self.hold.owner,
        )?;
        self.hold.seat_ids.extend(seat_ids.iter().cloned());
        tracing::debug!(hold_id = %self.hold.id, added = seat_ids.len(), "seats added to hold");
        Ok(())
    }

    /// Returns seats to the pool. The hold must keep at least one seat.
    pub fn remove_seats(&mut self, seat_ids: &BTreeSet<SeatId>) -> Result<()> {
        if seat_ids.is_empty() {
            return Ok(());
        }
        let foreign: Vec<SeatId> = seat_ids
            .difference(&self.hold.seat_ids)
            .cloned()
            .collect();
        if !foreign.is_empty() {
            return Err(BookingError::SeatSetMismatch {
                missing: Vec::new(),
                unexpected: foreign,
            });
        }
        if seat_ids.len() == self.hold.seat_ids.len() {
            return Err(BookingError::Validation(
                "cannot remove every seat from a hold; release it instead".to_string(),
            ));
        }

        self.manager.inventory.try_transition(
            &self.hold.show_id,
            seat_ids,
            SeatStatus::Held,
            SeatStatus::Available,
            &self.hold.owner,
        )?;
        self.hold.seat_ids.retain(|id| !seat_ids.contains(id));
        tracing::debug!(hold_id = %self.hold.id, removed = seat_ids.len(), "seats removed from hold");
        Ok(())
    }

    /// Marks the hold consumed. The caller must already have booked its seats.
    ///
    /// After this the hold can no longer be released, extended or expired.
    pub fn consume(mut self) -> Hold {
        let now = self.manager.clock.now();
        self.manager.unschedule_deadline(&self.hold);
        self.hold.close(HoldStatus::Consumed, now);
        self.manager.record_closed(&self.hold);
        tracing::info!(hold_id = %self.hold.id, "hold consumed");
        self.hold.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::inventory::SeatSpec;
    use common::Money;

    struct Fixture {
        inventory: Arc<SeatInventory>,
        clock: ManualClock,
        holds: HoldManager,
    }

    fn show() -> ShowId {
        ShowId::parse("S1").unwrap()
    }

    fn seats(ids: &[&str]) -> BTreeSet<SeatId> {
        ids.iter().map(|id| SeatId::parse(*id).unwrap()).collect()
    }

    fn token(t: &str) -> OwnerToken {
        OwnerToken::parse(t).unwrap()
    }

    fn fixture() -> Fixture {
        let inventory = Arc::new(SeatInventory::new());
        inventory
            .register_show(
                show(),
                ["A1", "A2", "A3"]
                    .iter()
                    .enumerate()
                    .map(|(i, id)| {
                        SeatSpec::new(
                            SeatId::parse(*id).unwrap(),
                            "A",
                            i as u32 + 1,
                            Money::from_cents(1000),
                        )
                    })
                    .collect(),
            )
            .unwrap();
        let clock = ManualClock::default();
        let holds = HoldManager::new(
            inventory.clone(),
            Arc::new(clock.clone()),
            EngineConfig::default(),
        );
        Fixture {
            inventory,
            clock,
            holds,
        }
    }

    fn status_of(f: &Fixture, seat: &str) -> SeatStatus {
        f.inventory
            .get_seats(&show())
            .unwrap()
            .into_iter()
            .find(|s| s.id.as_str() == seat)
            .map(|s| s.status)
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_hold_marks_seats_held() {
        let f = fixture();
        let hold = f
            .holds
            .create_hold(show(), seats(&["A1", "A2"]), token("x"), None)
            .await
            .unwrap();

        assert_eq!(hold.status, HoldStatus::Active);
        assert_eq!(hold.expires_at - hold.created_at, chrono::Duration::minutes(5));
        assert_eq!(status_of(&f, "A1"), SeatStatus::Held);
        assert_eq!(status_of(&f, "A2"), SeatStatus::Held);
        assert_eq!(status_of(&f, "A3"), SeatStatus::Available);
    }

    #[tokio::test]
    async fn test_conflicting_hold_lists_seats() {
        let f = fixture();
        f.holds
            .create_hold(show(), seats(&["A1", "A2"]), token("x"), None)
            .await
            .unwrap();

        let err = f
            .holds
            .create_hold(show(), seats(&["A2", "A3"]), token("y"), None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BookingError::SeatUnavailable {
                seat_ids: vec![SeatId::parse("A2").unwrap()]
            }
        );
        assert_eq!(status_of(&f, "A3"), SeatStatus::Available);
    }

    #[tokio::test]
    async fn test_ttl_policy() {
        let f = fixture();
        let err = f
            .holds
            .create_hold(show(), seats(&["A1"]), token("x"), Some(Duration::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));

        let err = f
            .holds
            .create_hold(
                show(),
                seats(&["A1"]),
                token("x"),
                Some(Duration::from_secs(3600)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));

        let err = f
            .holds
            .create_hold(show(), BTreeSet::new(), token("x"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_show() {
        let f = fixture();
        let err = f
            .holds
            .create_hold(
                ShowId::parse("S404").unwrap(),
                seats(&["A1"]),
                token("x"),
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SHOW_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_release_requires_owner() {
        let f = fixture();
        let hold = f
            .holds
            .create_hold(show(), seats(&["A1"]), token("x"), None)
            .await
            .unwrap();

        let err = f.holds.release_hold(hold.id, &token("y")).await.unwrap_err();
        assert_eq!(err, BookingError::NotOwner(hold.id));

        let released = f.holds.release_hold(hold.id, &token("x")).await.unwrap();
        assert_eq!(released.status, HoldStatus::Released);
        assert_eq!(status_of(&f, "A1"), SeatStatus::Available);

        // Releasing twice is acknowledged.
        let again = f.holds.release_hold(hold.id, &token("x")).await.unwrap();
        assert_eq!(again.status, HoldStatus::Released);
    }

    #[tokio::test]
    async fn test_release_unknown_hold() {
        let f = fixture();
        let id = HoldId::new();
        let err = f.holds.release_hold(id, &token("x")).await.unwrap_err();
        assert_eq!(err, BookingError::HoldNotFound(id));
    }

    #[tokio::test]
    async fn test_extend_never_shortens() {
        let f = fixture();
        let hold = f
            .holds
            .create_hold(show(), seats(&["A1"]), token("x"), None)
            .await
            .unwrap();

        let same = f
            .holds
            .extend_hold(hold.id, &token("x"), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(same.expires_at, hold.expires_at);

        f.clock.advance(chrono::Duration::minutes(4));
        let extended = f
            .holds
            .extend_hold(hold.id, &token("x"), Duration::from_secs(300))
            .await
            .unwrap();
        assert_eq!(extended.expires_at, f.clock.now() + chrono::Duration::minutes(5));
    }

    #[tokio::test]
    async fn test_due_hold_cannot_be_extended() {
        let f = fixture();
        let hold = f
            .holds
            .create_hold(
                show(),
                seats(&["A1"]),
                token("x"),
                Some(Duration::from_secs(1)),
            )
            .await
            .unwrap();

        f.clock.advance(chrono::Duration::seconds(2));
        let err = f
            .holds
            .extend_hold(hold.id, &token("x"), Duration::from_secs(60))
            .await
            .unwrap_err();
        assert_eq!(err, BookingError::HoldExpired(hold.id));
        assert_eq!(status_of(&f, "A1"), SeatStatus::Available);
        assert_eq!(
            f.holds.get_hold(hold.id).await.unwrap().status,
            HoldStatus::Expired
        );
    }

    #[tokio::test]
    async fn test_create_hold_reclaims_due_seats() {
        let f = fixture();
        f.holds
            .create_hold(
                show(),
                seats(&["A1"]),
                token("x"),
                Some(Duration::from_secs(1)),
            )
            .await
            .unwrap();
        f.clock.advance(chrono::Duration::seconds(1));

        let hold = f
            .holds
            .create_hold(show(), seats(&["A1"]), token("y"), None)
            .await
            .unwrap();
        assert!(hold.is_owned_by(&token("y")));
    }

    #[tokio::test]
    async fn test_add_and_remove_seats() {
        let f = fixture();
        let hold = f
            .holds
            .create_hold(show(), seats(&["A1"]), token("x"), None)
            .await
            .unwrap();

        let grown = f
            .holds
            .add_seats(hold.id, &token("x"), &seats(&["A2", "A3"]))
            .await
            .unwrap();
        assert_eq!(grown.seat_ids, seats(&["A1", "A2", "A3"]));
        assert_eq!(status_of(&f, "A3"), SeatStatus::Held);

        let shrunk = f
            .holds
            .remove_seats(hold.id, &token("x"), &seats(&["A1"]))
            .await
            .unwrap();
        assert_eq!(shrunk.seat_ids, seats(&["A2", "A3"]));
        assert_eq!(status_of(&f, "A1"), SeatStatus::Available);

        let err = f
            .holds
            .remove_seats(hold.id, &token("x"), &seats(&["A2", "A3"]))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
    }

    #[tokio::test]
    async fn test_add_seats_conflict_changes_nothing() {
        let f = fixture();
        let mine = f
            .holds
            .create_hold(show(), seats(&["A1"]), token("x"), None)
            .await
            .unwrap();
        f.holds
            .create_hold(show(), seats(&["A3"]), token("y"), None)
            .await
            .unwrap();

        let err = f
            .holds
            .add_seats(mine.id, &token("x"), &seats(&["A2", "A3"]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SEAT_UNAVAILABLE");
        assert_eq!(status_of(&f, "A2"), SeatStatus::Available);
        assert_eq!(
            f.holds.get_hold(mine.id).await.unwrap().seat_ids,
            seats(&["A1"])
        );
    }

    #[tokio::test]
    async fn test_consumed_hold_cannot_be_released() {
        let f = fixture();
        let hold = f
            .holds
            .create_hold(show(), seats(&["A1"]), token("x"), None)
            .await
            .unwrap();

        let guard = f.holds.acquire(hold.id, &token("x")).await.unwrap();
        f.inventory
            .try_transition(
                &show(),
                &seats(&["A1"]),
                SeatStatus::Held,
                SeatStatus::Booked,
                &token("x"),
            )
            .unwrap();
        let consumed = guard.consume();
        assert_eq!(consumed.status, HoldStatus::Consumed);

        let err = f.holds.release_hold(hold.id, &token("x")).await.unwrap_err();
        assert_eq!(err.code(), "CONFIRMATION_CONFLICT");
        assert_eq!(status_of(&f, "A1"), SeatStatus::Booked);
    }

    #[tokio::test]
    async fn test_failed_lazy_expiry_leaves_hold_for_sweeper() {
        let f = fixture();
        let hold = f
            .holds
            .create_hold(show(), seats(&["A1"]), token("x"), None)
            .await
            .unwrap();

        // Seat state no longer matches the hold, so freeing it fails.
        f.inventory
            .try_transition(
                &show(),
                &seats(&["A1"]),
                SeatStatus::Held,
                SeatStatus::Booked,
                &token("x"),
            )
            .unwrap();
        f.clock.advance(chrono::Duration::minutes(6));

        let snapshot = f.holds.get_hold(hold.id).await.unwrap();
        assert_eq!(snapshot.status, HoldStatus::Active);
        assert_eq!(status_of(&f, "A1"), SeatStatus::Booked);

        let report = f.holds.sweep_expired().await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.expired, 0);
    }
}
