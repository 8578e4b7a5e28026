pub mod jobs;
pub mod notify;
pub mod trigger;

use std::{future::Future, sync::Arc};

use time::{OffsetDateTime, UtcOffset};
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, Instrument};

use crate::state::AppState;
use trigger::Trigger;

/// Starts the reset and goal-check loops. They run until the runtime stops.
pub fn spawn_maintenance(state: &AppState) -> Vec<JoinHandle<()>> {
    let schedule = &state.config.schedule;
    let offset = schedule.utc_offset;
    let store = state.ledger.store();

    let daily = {
        let store = Arc::clone(&store);
        spawn_job("daily_reset", schedule.daily_reset, offset, move || {
            let store = Arc::clone(&store);
            async move { jobs::daily_reset(store.as_ref()).await.map(|_| ()) }
        })
    };

    let weekly = {
        let store = Arc::clone(&store);
        spawn_job("weekly_reset", schedule.weekly_reset, offset, move || {
            let store = Arc::clone(&store);
            async move { jobs::weekly_reset(store.as_ref()).await.map(|_| ()) }
        })
    };

    let goal = {
        let notifier = Arc::clone(&state.notifier);
        let threshold = schedule.goal_threshold;
        spawn_job("goal_comparison", schedule.goal_check, offset, move || {
            let store = Arc::clone(&store);
            let notifier = Arc::clone(&notifier);
            async move {
                jobs::goal_comparison(store.as_ref(), notifier.as_ref(), threshold)
                    .await
                    .map(|_| ())
            }
        })
    };

    vec![daily, weekly, goal]
}

fn spawn_job<F, Fut, E>(
    name: &'static str,
    trigger: Trigger,
    offset: UtcOffset,
    run: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    info!(job = name, %trigger, "maintenance job scheduled");
    tokio::spawn(async move {
        let mut target = trigger.next_after(OffsetDateTime::now_utc(), offset);
        loop {
            let wait = target - OffsetDateTime::now_utc();
            tokio::time::sleep(std::time::Duration::try_from(wait).unwrap_or_default()).await;

            let span = info_span!("maintenance", job = name, fired_at = %target);
            if let Err(e) = run().instrument(span).await {
                error!(job = name, error = %e, "maintenance job failed");
            }

            // a late wake-up must not fire the same slot twice
            target = trigger.next_after(OffsetDateTime::now_utc().max(target), offset);
        }
    })
}
