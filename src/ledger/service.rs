use std::{sync::Arc, time::Duration};

use backon::{ExponentialBuilder, Retryable};
use time::{Date, OffsetDateTime, UtcOffset};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::model::{validate_portion, IntakeRecord, UserLedger};
use super::mutations::LogTouch;
use super::projections::{self, DatedEntry, TodaySummary, WeeklyAggregate};
use super::store::{LedgerStore, StoreError, Versioned};
use crate::error::AppError;

/// Retries after the first conflicting write.
const MAX_WRITE_RETRIES: usize = 4;

/// A food confirmation before it is stamped with its correlation key.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIntake {
    pub food_name: String,
    pub calories: f64,
    pub fat: f64,
    pub carbohydrates: f64,
    pub protein: f64,
    pub portion: f64,
}

/// Owns the per-user daily/weekly/all-time logs and keeps them consistent.
///
/// Mutations read the whole document, change it in memory and write it back
/// conditionally on the version they read. A concurrent write makes the
/// replace fail, in which case the mutation is re-applied to a fresh read.
#[derive(Clone)]
pub struct IntakeLedger {
    store: Arc<dyn LedgerStore>,
    offset: UtcOffset,
}

impl IntakeLedger {
    pub fn new(store: Arc<dyn LedgerStore>, offset: UtcOffset) -> Self {
        Self { store, offset }
    }

    pub fn store(&self) -> Arc<dyn LedgerStore> {
        Arc::clone(&self.store)
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }

    /// Creates the empty ledger of a freshly registered user.
    pub async fn open(&self, ledger: &UserLedger) -> Result<(), AppError> {
        self.store.create(ledger).await?;
        info!(user_id = %ledger.id, goal = ledger.user_calorie_goal, "ledger opened");
        Ok(())
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<UserLedger, AppError> {
        Ok(self.load(user_id).await?.value)
    }

    pub async fn append(&self, user_id: Uuid, intake: NewIntake) -> Result<IntakeRecord, AppError> {
        let draft = IntakeRecord {
            food_name: intake.food_name.trim().to_string(),
            calories: intake.calories,
            fat: intake.fat,
            carbohydrates: intake.carbohydrates,
            protein: intake.protein,
            confirm_time: now_ms(),
            portion: intake.portion,
        };
        draft.validate()?;

        let record = self
            .mutate(user_id, |ledger| {
                let mut record = draft.clone();
                while ledger.contains(record.confirm_time) {
                    record.confirm_time += 1;
                }
                ledger.append(record.clone());
                Ok((record, true))
            })
            .await?;

        info!(%user_id, confirm_time = record.confirm_time, food = %record.food_name, "intake recorded");
        Ok(record)
    }

    pub async fn edit_portion(
        &self,
        user_id: Uuid,
        confirm_time: i64,
        portion: f64,
    ) -> Result<LogTouch, AppError> {
        validate_portion(portion)?;
        let touched = self
            .mutate(user_id, |ledger| {
                let touched = ledger.edit_portion(confirm_time, portion);
                Ok((touched, touched.any()))
            })
            .await?;
        info!(%user_id, confirm_time, portion, ?touched, "portion edited");
        Ok(touched)
    }

    pub async fn delete_by_correlation(
        &self,
        user_id: Uuid,
        confirm_time: i64,
    ) -> Result<LogTouch, AppError> {
        let touched = self
            .mutate(user_id, |ledger| {
                let touched = ledger.delete_by_correlation(confirm_time);
                Ok((touched, touched.any()))
            })
            .await?;
        info!(%user_id, confirm_time, ?touched, "intake deleted");
        Ok(touched)
    }

    pub async fn set_goal(&self, user_id: Uuid, goal: i32) -> Result<(), AppError> {
        if goal <= 0 {
            return Err(AppError::validation("calorie goal must be a positive number"));
        }
        self.mutate(user_id, |ledger| {
            let changed = ledger.user_calorie_goal != goal;
            ledger.user_calorie_goal = goal;
            Ok(((), changed))
        })
        .await?;
        info!(%user_id, goal, "calorie goal updated");
        Ok(())
    }

    pub async fn daily_intakes(&self, user_id: Uuid) -> Result<Vec<IntakeRecord>, AppError> {
        Ok(self.load(user_id).await?.value.daily_intakes)
    }

    /// Today's total and the goal, taken from one read of the ledger.
    pub async fn project_today(&self, user_id: Uuid) -> Result<TodaySummary, AppError> {
        let ledger = self.load(user_id).await?.value;
        Ok(TodaySummary {
            total_calories: projections::today_total(&ledger),
            calorie_goal: ledger.user_calorie_goal,
        })
    }

    pub async fn project_by_date(&self, user_id: Uuid, date: Date) -> Result<Vec<DatedEntry>, AppError> {
        let ledger = self.load(user_id).await?.value;
        Ok(projections::by_date(&ledger, date, self.offset))
    }

    pub async fn project_weekly_aggregate(&self, user_id: Uuid) -> Result<WeeklyAggregate, AppError> {
        let ledger = self.load(user_id).await?.value;
        Ok(projections::weekly_aggregate(&ledger, self.offset))
    }

    async fn load(&self, user_id: Uuid) -> Result<Versioned<UserLedger>, AppError> {
        match self.store.read(user_id).await? {
            Some(doc) => Ok(doc),
            None => {
                warn!(%user_id, "no ledger for user");
                Err(AppError::NotAuthenticated)
            }
        }
    }

    /// Read, apply `f`, write back at the read version. `f` reports whether
    /// it changed anything; unchanged documents are not written.
    async fn mutate<T, F>(&self, user_id: Uuid, f: F) -> Result<T, AppError>
    where
        T: Send,
        F: Fn(&mut UserLedger) -> Result<(T, bool), AppError> + Send + Sync,
    {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(5))
            .with_max_delay(Duration::from_millis(200))
            .with_jitter()
            .with_max_times(MAX_WRITE_RETRIES);

        (|| self.try_mutate_once(user_id, &f))
            .retry(backoff)
            .when(|e: &Attempt| matches!(e, Attempt::Conflict(StoreError::VersionConflict { .. })))
            .notify(|e: &Attempt, delay: Duration| {
                debug!(%user_id, ?e, ?delay, "ledger changed underneath, retrying");
            })
            .await
            .map_err(|e| match e {
                Attempt::Conflict(conflict) => {
                    warn!(%user_id, error = %conflict, "giving up after repeated write conflicts");
                    AppError::StorageWrite(format!(
                        "ledger kept changing; gave up after {} attempts",
                        MAX_WRITE_RETRIES + 1
                    ))
                }
                Attempt::Failed(e) => e,
            })
    }

    async fn try_mutate_once<T, F>(&self, user_id: Uuid, f: &F) -> Result<T, Attempt>
    where
        F: Fn(&mut UserLedger) -> Result<(T, bool), AppError>,
    {
        let Versioned { mut value, version } = self.load(user_id).await?;
        let (out, changed) = f(&mut value)?;
        if !changed {
            return Ok(out);
        }
        match self.store.replace(&value, version).await {
            Ok(()) => Ok(out),
            Err(conflict @ StoreError::VersionConflict { .. }) => Err(Attempt::Conflict(conflict)),
            Err(e) => Err(Attempt::Failed(e.into())),
        }
    }
}

/// Outcome of one read-apply-replace pass. Only conflicts are retried.
#[derive(Debug)]
enum Attempt {
    Conflict(StoreError),
    Failed(AppError),
}

impl From<AppError> for Attempt {
    fn from(e: AppError) -> Self {
        Attempt::Failed(e)
    }
}

fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
