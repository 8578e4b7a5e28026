use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

/// Outcome of comparing a day's intake with the user's goal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GoalAdvice {
    Surplus { excess: f64 },
    Deficit { shortfall: f64 },
}

impl GoalAdvice {
    pub fn message(&self) -> String {
        match self {
            Self::Surplus { excess } => format!(
                "You went {excess:.0} kcal over your goal today. Try a lighter day tomorrow."
            ),
            Self::Deficit { shortfall } => format!(
                "You ate {shortfall:.0} kcal less than your goal today. Make sure you eat enough."
            ),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: Uuid, advice: &GoalAdvice) -> anyhow::Result<()>;
}

/// Writes advisories to the log.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, user_id: Uuid, advice: &GoalAdvice) -> anyhow::Result<()> {
        info!(%user_id, ?advice, message = %advice.message(), "goal advisory");
        Ok(())
    }
}
