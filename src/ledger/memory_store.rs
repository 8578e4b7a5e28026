// In-memory ledger store for tests and local runs without Postgres.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::model::{LogKind, UserLedger};
use super::store::{LedgerStore, StoreError, Versioned};

#[derive(Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<HashMap<Uuid, Versioned<UserLedger>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn create(&self, ledger: &UserLedger) -> Result<(), StoreError> {
        let mut g = self.inner.write().await;
        if g.contains_key(&ledger.id) {
            return Err(StoreError::Write(format!("ledger {} already exists", ledger.id)));
        }
        g.insert(
            ledger.id,
            Versioned {
                value: ledger.clone(),
                version: 0,
            },
        );
        Ok(())
    }

    async fn read(&self, user_id: Uuid) -> Result<Option<Versioned<UserLedger>>, StoreError> {
        Ok(self.inner.read().await.get(&user_id).cloned())
    }

    async fn replace(&self, ledger: &UserLedger, expected_version: i64) -> Result<(), StoreError> {
        let mut g = self.inner.write().await;
        let entry = g
            .get_mut(&ledger.id)
            .ok_or_else(|| StoreError::Write(format!("ledger {} not found", ledger.id)))?;
        if entry.version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual: entry.version,
            });
        }
        entry.value = ledger.clone();
        entry.version += 1;
        Ok(())
    }

    async fn clear_log(&self, user_id: Uuid, log: LogKind) -> Result<(), StoreError> {
        let mut g = self.inner.write().await;
        if let Some(entry) = g.get_mut(&user_id) {
            entry.value.log_mut(log).clear();
            entry.version += 1;
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<Uuid>, StoreError> {
        Ok(self.inner.read().await.keys().copied().collect())
    }
}
