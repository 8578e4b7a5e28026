use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use tracing::{debug, error};
use uuid::Uuid;

use super::model::{LogKind, UserLedger};
use super::store::{LedgerStore, StoreError, Versioned};

/// Ledger documents kept as JSONB in the `ledgers` table.
#[derive(Clone)]
pub struct PgLedgerStore {
    db: PgPool,
}

impl PgLedgerStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn read_err(e: sqlx::Error) -> StoreError {
    error!(error = %e, "ledger read failed");
    StoreError::Read(e.to_string())
}

fn write_err(e: sqlx::Error) -> StoreError {
    error!(error = %e, "ledger write failed");
    StoreError::Write(e.to_string())
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn create(&self, ledger: &UserLedger) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO ledgers (user_id, document, version)
            VALUES ($1, $2, 0)
            "#,
        )
        .bind(ledger.id)
        .bind(Json(ledger))
        .execute(&self.db)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn read(&self, user_id: Uuid) -> Result<Option<Versioned<UserLedger>>, StoreError> {
        let row = sqlx::query_as::<_, (Json<UserLedger>, i64)>(
            r#"
            SELECT document, version
            FROM ledgers
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(read_err)?;

        Ok(row.map(|(Json(value), version)| Versioned { value, version }))
    }

    async fn replace(&self, ledger: &UserLedger, expected_version: i64) -> Result<(), StoreError> {
        let done = sqlx::query(
            r#"
            UPDATE ledgers
               SET document = $2, version = version + 1, updated_at = now()
             WHERE user_id = $1 AND version = $3
            "#,
        )
        .bind(ledger.id)
        .bind(Json(ledger))
        .bind(expected_version)
        .execute(&self.db)
        .await
        .map_err(write_err)?;

        if done.rows_affected() == 1 {
            return Ok(());
        }

        let actual = sqlx::query_scalar::<_, i64>("SELECT version FROM ledgers WHERE user_id = $1")
            .bind(ledger.id)
            .fetch_optional(&self.db)
            .await
            .map_err(read_err)?;
        match actual {
            Some(actual) => {
                debug!(user_id = %ledger.id, expected_version, actual, "stale ledger write");
                Err(StoreError::VersionConflict {
                    expected: expected_version,
                    actual,
                })
            }
            None => Err(StoreError::Write(format!("ledger {} not found", ledger.id))),
        }
    }

    async fn clear_log(&self, user_id: Uuid, log: LogKind) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE ledgers
               SET document = document - $2::text, version = version + 1, updated_at = now()
             WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(log.document_key())
        .execute(&self.db)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<Uuid>, StoreError> {
        sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM ledgers ORDER BY user_id")
            .fetch_all(&self.db)
            .await
            .map_err(read_err)
    }
}
