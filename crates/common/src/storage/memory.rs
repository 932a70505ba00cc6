//! In-memory `LedgerStore`/`RecommendationStore`, suitable for local
//! development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::{AuctionError, AuctionResult};
use crate::ledger_fsm::{LedgerEventKind, LedgerRecord};
use crate::recommendation::Recommendation;
use crate::storage::{LedgerStore, RecommendationStore};

#[derive(Default)]
pub struct InMemoryLedgerStore {
    records: Mutex<HashMap<String, LedgerRecord>>,
    recommendations: Mutex<HashMap<(String, String), Recommendation>>,
}

impl InMemoryLedgerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn put(&self, record: LedgerRecord) -> AuctionResult<()> {
        let mut records = self.records.lock().await;
        if records.contains_key(&record.auction_id) {
            return Err(AuctionError::Conflict.into());
        }
        records.insert(record.auction_id.clone(), record);
        Ok(())
    }

    async fn get(&self, auction_id: &str) -> AuctionResult<Option<LedgerRecord>> {
        let records = self.records.lock().await;
        Ok(records.get(auction_id).cloned())
    }

    async fn append_event(
        &self,
        auction_id: &str,
        serve_token: &str,
        kind: LedgerEventKind,
        now: DateTime<Utc>,
    ) -> AuctionResult<LedgerRecord> {
        let mut records = self.records.lock().await;
        let record = records.get_mut(auction_id).ok_or(AuctionError::NoSuchAuction)?;
        if record.serve_token.as_deref() != Some(serve_token) {
            return Err(AuctionError::NoSuchAuction.into());
        }
        record.apply(kind, now)?;
        Ok(record.clone())
    }
}

#[async_trait]
impl RecommendationStore for InMemoryLedgerStore {
    async fn get(&self, session_id: &str, message_id: &str) -> AuctionResult<Option<Recommendation>> {
        let recommendations = self.recommendations.lock().await;
        Ok(recommendations
            .get(&(session_id.to_owned(), message_id.to_owned()))
            .cloned())
    }

    async fn put(&self, recommendation: Recommendation) -> AuctionResult<()> {
        let mut recommendations = self.recommendations.lock().await;
        recommendations.insert(
            (recommendation.session_id.clone(), recommendation.message_id.clone()),
            recommendation,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(secs: i64) -> DateTime<Utc> {
        chrono::TimeZone::timestamp_opt(&Utc, 1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryLedgerStore::new();
        let record = LedgerRecord::new("a1".into(), Some("s1".into()), t(0));
        store.put(record).await.expect("put");
        let fetched = store.get("a1").await.expect("get").expect("present");
        assert_eq!(fetched.auction_id, "a1");
    }

    #[tokio::test]
    async fn duplicate_put_is_conflict() {
        let store = InMemoryLedgerStore::new();
        store
            .put(LedgerRecord::new("a1".into(), Some("s1".into()), t(0)))
            .await
            .expect("first put");
        let err = store
            .put(LedgerRecord::new("a1".into(), Some("s1".into()), t(1)))
            .await
            .expect_err("second put should conflict");
        assert_eq!(*err.current_context(), AuctionError::Conflict);
    }

    #[tokio::test]
    async fn append_event_on_missing_record_is_no_such_auction() {
        let store = InMemoryLedgerStore::new();
        let err = store
            .append_event("missing", "s1", LedgerEventKind::Served, t(0))
            .await
            .expect_err("missing record");
        assert_eq!(*err.current_context(), AuctionError::NoSuchAuction);
    }

    #[tokio::test]
    async fn append_event_with_mismatched_serve_token_is_rejected() {
        let store = InMemoryLedgerStore::new();
        store
            .put(LedgerRecord::new("a1".into(), Some("s1".into()), t(0)))
            .await
            .expect("put");
        let err = store
            .append_event("a1", "wrong-token", LedgerEventKind::Served, t(1))
            .await
            .expect_err("mismatched serve_token");
        assert_eq!(*err.current_context(), AuctionError::NoSuchAuction);
    }

    #[tokio::test]
    async fn append_event_persists_transition() {
        let store = InMemoryLedgerStore::new();
        store
            .put(LedgerRecord::new("a1".into(), Some("s1".into()), t(0)))
            .await
            .expect("put");
        store
            .append_event("a1", "s1", LedgerEventKind::Served, t(1))
            .await
            .expect("served");
        let fetched = store.get("a1").await.expect("get").expect("present");
        assert_eq!(fetched.state, crate::ledger_fsm::LedgerState::Served);
    }

    #[tokio::test]
    async fn recommendation_put_then_get_round_trips() {
        let store = InMemoryLedgerStore::new();
        let rec = Recommendation::in_progress("s1".into(), "m1".into(), "q".into(), t(0));
        RecommendationStore::put(&store, rec).await.expect("put");
        let fetched = RecommendationStore::get(&store, "s1", "m1")
            .await
            .expect("get")
            .expect("present");
        assert_eq!(fetched.query, "q");
    }

    #[tokio::test]
    async fn recommendation_get_on_missing_key_is_none() {
        let store = InMemoryLedgerStore::new();
        assert!(RecommendationStore::get(&store, "s1", "m1")
            .await
            .expect("get")
            .is_none());
    }

    #[tokio::test]
    async fn recommendation_put_overwrites_existing_key() {
        let store = InMemoryLedgerStore::new();
        let mut rec = Recommendation::in_progress("s1".into(), "m1".into(), "q".into(), t(0));
        RecommendationStore::put(&store, rec.clone()).await.expect("first put");
        rec.complete(
            "q\n\n[Ad] x".into(),
            crate::auction::AuctionResult::no_bid("a1".into()),
            t(1),
        );
        RecommendationStore::put(&store, rec).await.expect("second put");
        let fetched = RecommendationStore::get(&store, "s1", "m1")
            .await
            .expect("get")
            .expect("present");
        assert_eq!(fetched.status, crate::recommendation::RecommendationStatus::Completed);
    }
}
