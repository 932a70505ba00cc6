//! Pluggable ledger storage (spec §6). The core auction and recommendation
//! logic depends only on the `LedgerStore` trait; `crates/server` wires up
//! the concrete backend chosen by config.

pub mod firestore_store;
pub mod memory;
pub mod postgres_store;
pub mod redis_store;

use async_trait::async_trait;

use crate::error::AuctionResult;
use crate::ledger_fsm::{LedgerEventKind, LedgerRecord};
use crate::recommendation::Recommendation;

/// Storage capability required by the ledger: point lookups, a fresh
/// insert, and an atomic read-modify-write event application, keyed by
/// `auction_id` alone (spec §6: `ledger_records(auction_id PK, ...)`).
///
/// The spec's generic `update(key, mutator)` operation (§4.3) is specialized
/// here to the one mutator the core actually needs -- applying a ledger
/// event -- since a closure-typed `update` is not object-safe and `dyn
/// LedgerStore` is required to erase the backend choice behind config.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Inserts a new record. Fails with `AuctionError::Conflict` if one
    /// already exists for `auction_id`.
    async fn put(&self, record: LedgerRecord) -> AuctionResult<()>;

    /// Fetches a record by `auction_id`, if one exists.
    async fn get(&self, auction_id: &str) -> AuctionResult<Option<LedgerRecord>>;

    /// Atomically applies `kind` to the record for `auction_id` and
    /// persists the result, returning the updated record. Fails with
    /// `AuctionError::NoSuchAuction` if no record exists, or if
    /// `serve_token` does not match the record's token (spec §4.7 step 2).
    ///
    /// Backends must guarantee that concurrent callers applying events to
    /// the same key observe a consistent, serialized sequence of updates
    /// (spec §4.7).
    async fn append_event(
        &self,
        auction_id: &str,
        serve_token: &str,
        kind: LedgerEventKind,
        now: chrono::DateTime<chrono::Utc>,
    ) -> AuctionResult<LedgerRecord>;
}

/// Storage capability for `Recommendation` records, keyed by `(session_id,
/// message_id)` (spec §6: `recommendation:{session_id}:{message_id}`,
/// relational `(session_id, message_id)` composite primary key).
///
/// Unlike `LedgerStore::append_event`, a recommendation has exactly one
/// writer across its lifetime -- the coordinator's own background task that
/// created it -- so a plain upsert is sufficient; there is no concurrent
/// `update` race to serialize against.
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// Fetches a recommendation by its composite key, if one exists.
    async fn get(&self, session_id: &str, message_id: &str) -> AuctionResult<Option<Recommendation>>;

    /// Inserts or overwrites the recommendation at its key.
    async fn put(&self, recommendation: Recommendation) -> AuctionResult<()>;
}
