use tracing::{error, info, warn};
use uuid::Uuid;

use super::notify::{GoalAdvice, Notifier};
use crate::ledger::model::{LogKind, UserLedger};
use crate::ledger::store::{LedgerStore, StoreError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobReport {
    pub processed: usize,
    pub failed: usize,
}

/// Empties every user's daily log.
pub async fn daily_reset(store: &dyn LedgerStore) -> Result<JobReport, StoreError> {
    clear_everywhere(store, LogKind::Daily).await
}

/// Empties every user's weekly log.
pub async fn weekly_reset(store: &dyn LedgerStore) -> Result<JobReport, StoreError> {
    clear_everywhere(store, LogKind::Weekly).await
}

async fn clear_everywhere(store: &dyn LedgerStore, log: LogKind) -> Result<JobReport, StoreError> {
    let users = store.list_users().await?;
    let mut report = JobReport::default();
    for user_id in users {
        match store.clear_log(user_id, log).await {
            Ok(()) => report.processed += 1,
            Err(e) => {
                error!(%user_id, ?log, error = %e, "reset failed for user");
                report.failed += 1;
            }
        }
    }
    info!(?log, processed = report.processed, failed = report.failed, "log reset finished");
    Ok(report)
}

/// Compares the day's raw calorie sum with the goal. Within `threshold`
/// either way there is nothing to say.
pub fn assess(total: f64, goal: f64, threshold: f64) -> Option<GoalAdvice> {
    if total - goal > threshold {
        Some(GoalAdvice::Surplus {
            excess: total - goal,
        })
    } else if goal - total > threshold {
        Some(GoalAdvice::Deficit {
            shortfall: goal - total,
        })
    } else {
        None
    }
}

fn raw_daily_total(ledger: &UserLedger) -> f64 {
    ledger.daily_intakes.iter().map(|r| r.calories).sum()
}

pub async fn goal_comparison(
    store: &dyn LedgerStore,
    notifier: &dyn Notifier,
    threshold: f64,
) -> Result<JobReport, StoreError> {
    let users = store.list_users().await?;
    let mut report = JobReport::default();
    for user_id in users {
        match compare_one(store, notifier, user_id, threshold).await {
            Ok(()) => report.processed += 1,
            Err(e) => {
                error!(%user_id, error = %e, "goal comparison failed for user");
                report.failed += 1;
            }
        }
    }
    info!(processed = report.processed, failed = report.failed, "goal comparison finished");
    Ok(report)
}

async fn compare_one(
    store: &dyn LedgerStore,
    notifier: &dyn Notifier,
    user_id: Uuid,
    threshold: f64,
) -> anyhow::Result<()> {
    let Some(doc) = store.read(user_id).await? else {
        warn!(%user_id, "ledger vanished before goal comparison");
        return Ok(());
    };
    let ledger = doc.value;
    let total = raw_daily_total(&ledger);
    if let Some(advice) = assess(total, f64::from(ledger.user_calorie_goal), threshold) {
        notifier.notify(user_id, &advice).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::memory_store::InMemoryLedgerStore;
    use crate::ledger::model::fixtures::{ledger, record};
    use crate::ledger::store::Versioned;
    use async_trait::async_trait;
    use std::sync::Mutex;

    async fn seeded(store: &InMemoryLedgerStore, calories: &[f64]) -> Uuid {
        let mut l = ledger();
        for (i, c) in calories.iter().enumerate() {
            l.append(record("food", *c, i as i64 + 1, 1.0));
        }
        store.create(&l).await.unwrap();
        l.id
    }

    #[tokio::test]
    async fn daily_reset_only_touches_daily() {
        let store = InMemoryLedgerStore::new();
        let a = seeded(&store, &[100.0, 200.0]).await;
        let b = seeded(&store, &[50.0]).await;

        let report = daily_reset(&store).await.unwrap();
        assert_eq!(report, JobReport { processed: 2, failed: 0 });

        for (id, kept) in [(a, 2), (b, 1)] {
            let l = store.read(id).await.unwrap().unwrap().value;
            assert!(l.daily_intakes.is_empty());
            assert_eq!(l.weekly_intake.len(), kept);
            assert_eq!(l.food_intakes.len(), kept);
        }

        // a second reset over already-empty daily logs changes nothing
        let report = daily_reset(&store).await.unwrap();
        assert_eq!(report, JobReport { processed: 2, failed: 0 });
        for (id, kept) in [(a, 2), (b, 1)] {
            let l = store.read(id).await.unwrap().unwrap().value;
            assert!(l.daily_intakes.is_empty());
            assert_eq!(l.weekly_intake.len(), kept);
            assert_eq!(l.food_intakes.len(), kept);
        }
    }

    #[tokio::test]
    async fn weekly_reset_keeps_all_time_log() {
        let store = InMemoryLedgerStore::new();
        let id = seeded(&store, &[100.0]).await;
        weekly_reset(&store).await.unwrap();
        let l = store.read(id).await.unwrap().unwrap().value;
        assert!(l.weekly_intake.is_empty());
        assert_eq!(l.daily_intakes.len(), 1);
        assert_eq!(l.food_intakes.len(), 1);
    }

    /// Errors on every per-user call for the `broken` user.
    struct FlakyStore {
        inner: InMemoryLedgerStore,
        broken: Mutex<Option<Uuid>>,
    }

    #[async_trait]
    impl LedgerStore for FlakyStore {
        async fn create(&self, ledger: &UserLedger) -> Result<(), StoreError> {
            self.inner.create(ledger).await
        }
        async fn read(&self, user_id: Uuid) -> Result<Option<Versioned<UserLedger>>, StoreError> {
            if *self.broken.lock().unwrap() == Some(user_id) {
                return Err(StoreError::Read("timeout".into()));
            }
            self.inner.read(user_id).await
        }
        async fn replace(&self, ledger: &UserLedger, v: i64) -> Result<(), StoreError> {
            self.inner.replace(ledger, v).await
        }
        async fn clear_log(&self, user_id: Uuid, log: LogKind) -> Result<(), StoreError> {
            if *self.broken.lock().unwrap() == Some(user_id) {
                return Err(StoreError::Write("permission denied".into()));
            }
            self.inner.clear_log(user_id, log).await
        }
        async fn list_users(&self) -> Result<Vec<Uuid>, StoreError> {
            self.inner.list_users().await
        }
    }

    #[tokio::test]
    async fn one_failing_user_does_not_stop_the_rest() {
        let store = FlakyStore {
            inner: InMemoryLedgerStore::new(),
            broken: Mutex::new(None),
        };
        let good = seeded(&store.inner, &[100.0]).await;
        let bad = seeded(&store.inner, &[100.0]).await;
        *store.broken.lock().unwrap() = Some(bad);

        let report = daily_reset(&store).await.unwrap();
        assert_eq!(report, JobReport { processed: 1, failed: 1 });
        assert!(store.inner.read(good).await.unwrap().unwrap().value.daily_intakes.is_empty());
        assert_eq!(store.inner.read(bad).await.unwrap().unwrap().value.daily_intakes.len(), 1);

        let notifier = Recording::default();
        let report = goal_comparison(&store, &notifier, 100.0).await.unwrap();
        assert_eq!(report, JobReport { processed: 1, failed: 1 });
    }

    #[test]
    fn assess_respects_threshold_both_ways() {
        assert_eq!(assess(2150.0, 2000.0, 100.0), Some(GoalAdvice::Surplus { excess: 150.0 }));
        assert_eq!(assess(1850.0, 2000.0, 100.0), Some(GoalAdvice::Deficit { shortfall: 150.0 }));
        assert_eq!(assess(2100.0, 2000.0, 100.0), None);
        assert_eq!(assess(1900.0, 2000.0, 100.0), None);
        assert_eq!(assess(2000.0, 2000.0, 100.0), None);
    }

    #[derive(Default)]
    struct Recording(Mutex<Vec<(Uuid, GoalAdvice)>>);

    #[async_trait]
    impl Notifier for Recording {
        async fn notify(&self, user_id: Uuid, advice: &GoalAdvice) -> anyhow::Result<()> {
            self.0.lock().unwrap().push((user_id, *advice));
            Ok(())
        }
    }

    #[tokio::test]
    async fn goal_comparison_uses_raw_daily_calories() {
        let store = InMemoryLedgerStore::new();
        // goal 2000 for the fixture user; portions are ignored here
        let mut over = ledger();
        over.append(record("feast", 2500.0, 1, 0.5));
        store.create(&over).await.unwrap();
        let under = seeded(&store, &[300.0]).await;
        let close = seeded(&store, &[1950.0]).await;

        let notifier = Recording::default();
        let report = goal_comparison(&store, &notifier, 100.0).await.unwrap();
        assert_eq!(report.processed, 3);

        let sent = notifier.0.lock().unwrap().clone();
        assert_eq!(sent.len(), 2);
        assert!(sent.contains(&(over.id, GoalAdvice::Surplus { excess: 500.0 })));
        assert!(sent.contains(&(under, GoalAdvice::Deficit { shortfall: 1700.0 })));
        assert!(!sent.iter().any(|(id, _)| *id == close));
    }
}
