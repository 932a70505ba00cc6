//! PostgreSQL-backed `LedgerStore`/`RecommendationStore` using `sqlx`.
//!
//! The ledger table stores the full `LedgerRecord` as JSONB keyed by
//! `auction_id` alone (spec §6: `ledger_records(auction_id PK, ...)`);
//! `append_event` uses `SELECT ... FOR UPDATE` inside a transaction so
//! concurrent reporters serialize on the row rather than racing in the
//! application. The `recommendations` table mirrors this shape under a
//! `(session_id, message_id)` composite key, but plain upsert is enough
//! since a recommendation has only one writer across its lifetime.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use error_stack::ResultExt;
use sqlx::PgPool;

use crate::error::{AuctionError, AuctionResult};
use crate::ledger_fsm::{LedgerEventKind, LedgerRecord};
use crate::recommendation::Recommendation;
use crate::storage::{LedgerStore, RecommendationStore};

pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    /// Connects to `database_url` with a small pool; the ledger is a
    /// low-latency lookup path, not an analytical workload.
    ///
    /// # Errors
    /// Returns an error if the pool cannot be established.
    pub async fn connect(database_url: &str) -> AuctionResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .change_context(AuctionError::StorageUnavailable)
            .attach_printable("failed to connect to postgres")?;
        Ok(Self { pool })
    }

    /// Creates the ledger table if it does not already exist. Intended for
    /// local development and tests; production deployments should manage
    /// schema via migrations.
    ///
    /// # Errors
    /// Returns an error if the DDL statement fails.
    pub async fn ensure_schema(&self) -> AuctionResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS ledger_records (
                auction_id TEXT PRIMARY KEY,
                record JSONB NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .change_context(AuctionError::StorageUnavailable)?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS recommendations (
                session_id TEXT NOT NULL,
                message_id TEXT NOT NULL,
                record JSONB NOT NULL,
                PRIMARY KEY (session_id, message_id)
            )
            ",
        )
        .execute(&self.pool)
        .await
        .change_context(AuctionError::StorageUnavailable)?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn put(&self, record: LedgerRecord) -> AuctionResult<()> {
        let payload = sqlx::types::Json(&record);
        let result = sqlx::query(
            r"
            INSERT INTO ledger_records (auction_id, record)
            VALUES ($1, $2)
            ON CONFLICT (auction_id) DO NOTHING
            ",
        )
        .bind(&record.auction_id)
        .bind(payload)
        .execute(&self.pool)
        .await
        .change_context(AuctionError::StorageUnavailable)?;

        if result.rows_affected() == 0 {
            return Err(AuctionError::Conflict.into());
        }
        Ok(())
    }

    async fn get(&self, auction_id: &str) -> AuctionResult<Option<LedgerRecord>> {
        let row: Option<(sqlx::types::Json<LedgerRecord>,)> =
            sqlx::query_as("SELECT record FROM ledger_records WHERE auction_id = $1")
                .bind(auction_id)
                .fetch_optional(&self.pool)
                .await
                .change_context(AuctionError::StorageUnavailable)?;

        Ok(row.map(|(json,)| json.0))
    }

    async fn append_event(
        &self,
        auction_id: &str,
        serve_token: &str,
        kind: LedgerEventKind,
        now: DateTime<Utc>,
    ) -> AuctionResult<LedgerRecord> {
        let mut tx = self
            .pool
            .begin()
            .await
            .change_context(AuctionError::StorageUnavailable)?;

        let row: Option<(sqlx::types::Json<LedgerRecord>,)> = sqlx::query_as(
            r"
            SELECT record FROM ledger_records
            WHERE auction_id = $1
            FOR UPDATE
            ",
        )
        .bind(auction_id)
        .fetch_optional(&mut *tx)
        .await
        .change_context(AuctionError::StorageUnavailable)?;

        let Some((sqlx::types::Json(mut record),)) = row else {
            return Err(AuctionError::NoSuchAuction.into());
        };

        if record.serve_token.as_deref() != Some(serve_token) {
            return Err(AuctionError::NoSuchAuction.into());
        }

        record.apply(kind, now)?;

        sqlx::query(
            r"
            UPDATE ledger_records SET record = $2
            WHERE auction_id = $1
            ",
        )
        .bind(auction_id)
        .bind(sqlx::types::Json(&record))
        .execute(&mut *tx)
        .await
        .change_context(AuctionError::StorageUnavailable)?;

        tx.commit()
            .await
            .change_context(AuctionError::StorageUnavailable)?;

        Ok(record)
    }
}

#[async_trait]
impl RecommendationStore for PostgresLedgerStore {
    async fn get(&self, session_id: &str, message_id: &str) -> AuctionResult<Option<Recommendation>> {
        let row: Option<(sqlx::types::Json<Recommendation>,)> = sqlx::query_as(
            r"
            SELECT record FROM recommendations
            WHERE session_id = $1 AND message_id = $2
            ",
        )
        .bind(session_id)
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await
        .change_context(AuctionError::StorageUnavailable)?;

        Ok(row.map(|(json,)| json.0))
    }

    async fn put(&self, recommendation: Recommendation) -> AuctionResult<()> {
        let payload = sqlx::types::Json(&recommendation);
        sqlx::query(
            r"
            INSERT INTO recommendations (session_id, message_id, record)
            VALUES ($1, $2, $3)
            ON CONFLICT (session_id, message_id) DO UPDATE SET record = EXCLUDED.record
            ",
        )
        .bind(&recommendation.session_id)
        .bind(&recommendation.message_id)
        .bind(payload)
        .execute(&self.pool)
        .await
        .change_context(AuctionError::StorageUnavailable)?;
        Ok(())
    }
}
