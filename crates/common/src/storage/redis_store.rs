//! Redis-backed `LedgerStore`/`RecommendationStore`.
//!
//! Uses a `ConnectionManager` (auto-reconnecting, cheap to clone) and an
//! optimistic `WATCH`/`MULTI`/`EXEC` loop for `append_event`, since Redis has
//! no native "compare server-side predicate, then write" primitive for
//! arbitrary application logic -- the FSM transition check has to happen in
//! the client. Recommendations have a single writer across their lifetime,
//! so they need no such loop: a plain `SET` under a `:recommendation:` key
//! segment is enough.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use error_stack::ResultExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::{AuctionError, AuctionResult};
use crate::ledger_fsm::{LedgerEventKind, LedgerRecord};
use crate::recommendation::Recommendation;
use crate::storage::{LedgerStore, RecommendationStore};

/// Number of optimistic-lock retries before giving up on `append_event`.
const MAX_RETRIES: u32 = 8;

pub struct RedisLedgerStore {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisLedgerStore {
    /// Connects to `redis_url` and wraps the connection in an
    /// auto-reconnecting manager.
    ///
    /// # Errors
    /// Returns an error if the initial connection cannot be established.
    pub async fn connect(redis_url: &str, key_prefix: impl Into<String>) -> AuctionResult<Self> {
        let client = redis::Client::open(redis_url)
            .change_context(AuctionError::StorageUnavailable)
            .attach_printable("invalid redis url")?;
        let conn = ConnectionManager::new(client)
            .await
            .change_context(AuctionError::StorageUnavailable)
            .attach_printable("failed to establish redis connection")?;
        Ok(Self {
            conn,
            key_prefix: key_prefix.into(),
        })
    }

    fn key(&self, auction_id: &str) -> String {
        format!("{}:ledger:{auction_id}", self.key_prefix)
    }

    fn recommendation_key(&self, session_id: &str, message_id: &str) -> String {
        format!("{}:recommendation:{session_id}:{message_id}", self.key_prefix)
    }
}

#[async_trait]
impl LedgerStore for RedisLedgerStore {
    async fn put(&self, record: LedgerRecord) -> AuctionResult<()> {
        let mut conn = self.conn.clone();
        let key = self.key(&record.auction_id);
        let payload = serde_json::to_string(&record)
            .change_context(AuctionError::Internal)
            .attach_printable("failed to serialize ledger record")?;

        let set: bool = redis::cmd("SET")
            .arg(&key)
            .arg(payload)
            .arg("NX")
            .query_async(&mut conn)
            .await
            .change_context(AuctionError::StorageUnavailable)?;

        if !set {
            return Err(AuctionError::Conflict.into());
        }
        Ok(())
    }

    async fn get(&self, auction_id: &str) -> AuctionResult<Option<LedgerRecord>> {
        let mut conn = self.conn.clone();
        let key = self.key(auction_id);
        let raw: Option<String> = conn
            .get(&key)
            .await
            .change_context(AuctionError::StorageUnavailable)?;
        match raw {
            None => Ok(None),
            Some(raw) => {
                let record = serde_json::from_str(&raw)
                    .change_context(AuctionError::Internal)
                    .attach_printable("stored ledger record is corrupt")?;
                Ok(Some(record))
            }
        }
    }

    async fn append_event(
        &self,
        auction_id: &str,
        serve_token: &str,
        kind: LedgerEventKind,
        now: DateTime<Utc>,
    ) -> AuctionResult<LedgerRecord> {
        let mut conn = self.conn.clone();
        let key = self.key(auction_id);

        for _ in 0..MAX_RETRIES {
            let () = redis::cmd("WATCH")
                .arg(&key)
                .query_async(&mut conn)
                .await
                .change_context(AuctionError::StorageUnavailable)?;

            let raw: Option<String> = conn
                .get(&key)
                .await
                .change_context(AuctionError::StorageUnavailable)?;

            let Some(raw) = raw else {
                let () = redis::cmd("UNWATCH")
                    .query_async(&mut conn)
                    .await
                    .change_context(AuctionError::StorageUnavailable)?;
                return Err(AuctionError::NoSuchAuction.into());
            };

            let mut record: LedgerRecord = serde_json::from_str(&raw)
                .change_context(AuctionError::Internal)
                .attach_printable("stored ledger record is corrupt")?;

            if record.serve_token.as_deref() != Some(serve_token) {
                let () = redis::cmd("UNWATCH")
                    .query_async(&mut conn)
                    .await
                    .change_context(AuctionError::StorageUnavailable)?;
                return Err(AuctionError::NoSuchAuction.into());
            }
            record.apply(kind, now)?;

            let payload = serde_json::to_string(&record)
                .change_context(AuctionError::Internal)
                .attach_printable("failed to serialize ledger record")?;

            let mut pipe = redis::pipe();
            pipe.atomic().set(&key, payload);
            let result: Option<()> = pipe
                .query_async(&mut conn)
                .await
                .change_context(AuctionError::StorageUnavailable)?;

            if result.is_some() {
                return Ok(record);
            }
            // transaction aborted because another writer touched `key`
            // between WATCH and EXEC; retry from a fresh read.
        }

        Err(AuctionError::StorageUnavailable.into())
    }
}

#[async_trait]
impl RecommendationStore for RedisLedgerStore {
    async fn get(&self, session_id: &str, message_id: &str) -> AuctionResult<Option<Recommendation>> {
        let mut conn = self.conn.clone();
        let key = self.recommendation_key(session_id, message_id);
        let raw: Option<String> = conn
            .get(&key)
            .await
            .change_context(AuctionError::StorageUnavailable)?;
        match raw {
            None => Ok(None),
            Some(raw) => {
                let recommendation = serde_json::from_str(&raw)
                    .change_context(AuctionError::Internal)
                    .attach_printable("stored recommendation is corrupt")?;
                Ok(Some(recommendation))
            }
        }
    }

    async fn put(&self, recommendation: Recommendation) -> AuctionResult<()> {
        let mut conn = self.conn.clone();
        let key = self.recommendation_key(&recommendation.session_id, &recommendation.message_id);
        let payload = serde_json::to_string(&recommendation)
            .change_context(AuctionError::Internal)
            .attach_printable("failed to serialize recommendation")?;

        let () = conn
            .set(&key, payload)
            .await
            .change_context(AuctionError::StorageUnavailable)?;
        Ok(())
    }
}
