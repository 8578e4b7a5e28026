use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::model::{LogKind, UserLedger};
use crate::error::AppError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("read failed: {0}")]
    Read(String),

    #[error("write failed: {0}")]
    Write(String),

    #[error("version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: i64, actual: i64 },
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Read(msg) => AppError::StorageRead(msg),
            other => AppError::StorageWrite(other.to_string()),
        }
    }
}

/// A ledger document together with the version it was read at.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub value: T,
    pub version: i64,
}

/// Document store holding one `UserLedger` per user.
///
/// Every successful write bumps the document version; `replace` only
/// succeeds when the caller still holds the current version.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn create(&self, ledger: &UserLedger) -> Result<(), StoreError>;

    async fn read(&self, user_id: Uuid) -> Result<Option<Versioned<UserLedger>>, StoreError>;

    async fn replace(
        &self,
        ledger: &UserLedger,
        expected_version: i64,
    ) -> Result<(), StoreError>;

    /// Deletes one log subtree without touching the rest of the document.
    async fn clear_log(&self, user_id: Uuid, log: LogKind) -> Result<(), StoreError>;

    async fn list_users(&self) -> Result<Vec<Uuid>, StoreError>;
}
