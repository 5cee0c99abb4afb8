//! Background expiry of due holds.

use std::sync::Arc;

use common::HoldId;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::manager::HoldManager;

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Holds moved to `Expired`.
    pub expired: usize,
    /// Due entries that had already been closed by someone else.
    pub skipped: usize,
    /// Holds whose seats could not be released; retried next pass.
    pub failed: usize,
    /// Terminal holds dropped after the retention window.
    pub pruned: usize,
}

impl HoldManager {
    /// Expires every hold whose deadline has passed.
    ///
    /// Each hold is locked before its status is re-checked, so a hold that
    /// was consumed or released in the meantime is skipped, never expired.
    pub async fn sweep_expired(&self) -> SweepReport {
        let now = self.now();
        let mut report = SweepReport::default();

        let due: Vec<HoldId> = {
            let schedule = self.schedule.lock().unwrap_or_else(|e| e.into_inner());
            schedule
                .deadlines
                .keys()
                .take_while(|(deadline, _)| *deadline <= now)
                .map(|(_, id)| *id)
                .collect()
        };

        for hold_id in due {
            let Ok(mut hold) = self.lock(hold_id).await else {
                report.skipped += 1;
                continue;
            };
            if !hold.is_due(now) {
                report.skipped += 1;
                continue;
            }
            match self.expire_locked(&mut hold, now) {
                Ok(()) => report.expired += 1,
                Err(e) => {
                    report.failed += 1;
                    metrics::counter!("sweep_errors_total").increment(1);
                    tracing::error!(%hold_id, error = %e, "failed to expire hold");
                }
            }
        }

        if let Ok(retention) = chrono::Duration::from_std(self.config.hold_retention) {
            report.pruned = self.prune_closed(now - retention);
        }

        metrics::counter!("sweep_runs_total").increment(1);
        if report != SweepReport::default() {
            tracing::debug!(
                expired = report.expired,
                skipped = report.skipped,
                failed = report.failed,
                pruned = report.pruned,
                "sweep finished"
            );
        }
        report
    }

    /// Runs [`HoldManager::sweep_expired`] on the configured interval until
    /// `shutdown` flips to `true` or its sender is dropped.
    pub fn spawn_sweeper(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let period = self.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(interval_ms = period.as_millis() as u64, "hold sweeper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep_expired().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::info!("hold sweeper stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::time::Duration;

    use common::{Money, OwnerToken, SeatId, ShowId};

    use super::*;
    use crate::clock::ManualClock;
    use crate::config::EngineConfig;
    use crate::holds::HoldStatus;
    use crate::inventory::{SeatInventory, SeatSpec, SeatStatus};

    fn show() -> ShowId {
        ShowId::parse("S1").unwrap()
    }

    fn seats(ids: &[&str]) -> BTreeSet<SeatId> {
        ids.iter().map(|id| SeatId::parse(*id).unwrap()).collect()
    }

    fn setup(config: EngineConfig) -> (Arc<SeatInventory>, ManualClock, Arc<HoldManager>) {
        let inventory = Arc::new(SeatInventory::new());
        inventory
            .register_show(
                show(),
                vec![
                    SeatSpec::new(SeatId::parse("B1").unwrap(), "B", 1, Money::from_cents(900)),
                    SeatSpec::new(SeatId::parse("B2").unwrap(), "B", 2, Money::from_cents(900)),
                ],
            )
            .unwrap();
        let clock = ManualClock::default();
        let manager = Arc::new(HoldManager::new(
            inventory.clone(),
            Arc::new(clock.clone()),
            config,
        ));
        (inventory, clock, manager)
    }

    #[tokio::test]
    async fn test_sweep_expires_only_due_holds() {
        let (inventory, clock, manager) = setup(EngineConfig::default());
        let short = manager
            .create_hold(
                show(),
                seats(&["B1"]),
                OwnerToken::parse("x").unwrap(),
                Some(Duration::from_secs(1)),
            )
            .await
            .unwrap();
        let long = manager
            .create_hold(show(), seats(&["B2"]), OwnerToken::parse("y").unwrap(), None)
            .await
            .unwrap();

        clock.advance(chrono::Duration::seconds(2));
        let report = manager.sweep_expired().await;

        assert_eq!(report.expired, 1);
        assert_eq!(manager.get_hold(short.id).await.unwrap().status, HoldStatus::Expired);
        assert_eq!(manager.get_hold(long.id).await.unwrap().status, HoldStatus::Active);

        let counts = inventory.availability(&show()).unwrap();
        assert_eq!(counts.available, 1);
        assert_eq!(counts.held, 1);

        // Nothing left to do on a second pass.
        assert_eq!(manager.sweep_expired().await.expired, 0);
    }

    #[tokio::test]
    async fn test_sweep_skips_consumed_hold() {
        let (inventory, clock, manager) = setup(EngineConfig::default());
        let owner = OwnerToken::parse("x").unwrap();
        let hold = manager
            .create_hold(show(), seats(&["B1"]), owner.clone(), Some(Duration::from_secs(1)))
            .await
            .unwrap();

        let guard = manager.acquire(hold.id, &owner).await.unwrap();
        inventory
            .try_transition(&show(), &seats(&["B1"]), SeatStatus::Held, SeatStatus::Booked, &owner)
            .unwrap();
        guard.consume();

        clock.advance(chrono::Duration::seconds(5));
        let report = manager.sweep_expired().await;
        assert_eq!(report.expired, 0);
        assert_eq!(inventory.availability(&show()).unwrap().booked, 1);
    }

    #[tokio::test]
    async fn test_closed_holds_are_pruned_after_retention() {
        let config = EngineConfig {
            hold_retention: Duration::from_secs(60),
            ..EngineConfig::default()
        };
        let (_inventory, clock, manager) = setup(config);
        let owner = OwnerToken::parse("x").unwrap();
        let hold = manager
            .create_hold(show(), seats(&["B1"]), owner.clone(), None)
            .await
            .unwrap();
        manager.release_hold(hold.id, &owner).await.unwrap();

        assert_eq!(manager.sweep_expired().await.pruned, 0);
        clock.advance(chrono::Duration::seconds(61));
        assert_eq!(manager.sweep_expired().await.pruned, 1);
        assert!(manager.get_hold(hold.id).await.is_err());
    }

    #[tokio::test]
    async fn test_sweeper_task_stops_on_shutdown() {
        let config = EngineConfig {
            sweep_interval: Duration::from_millis(10),
            ..EngineConfig::default()
        };
        let (inventory, clock, manager) = setup(config);
        manager
            .create_hold(
                show(),
                seats(&["B1"]),
                OwnerToken::parse("x").unwrap(),
                Some(Duration::from_secs(1)),
            )
            .await
            .unwrap();
        clock.advance(chrono::Duration::seconds(2));

        let (tx, rx) = watch::channel(false);
        let handle = manager.clone().spawn_sweeper(rx);

        for _ in 0..100 {
            if inventory.availability(&show()).unwrap().available == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(inventory.availability(&show()).unwrap().available, 2);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
