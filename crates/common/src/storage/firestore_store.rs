//! Firestore-backed `LedgerStore`/`RecommendationStore`.
//!
//! Each ledger record is one document, keyed by `auction_id` under a
//! configurable collection (spec §6: `ledger_records(auction_id PK, ...)`).
//! `append_event` uses Firestore's transaction API to read-modify-write the
//! document, giving the same serialization guarantee as the SQL `FOR UPDATE`
//! path without needing a separate lock table. Recommendations live in a
//! sibling `{collection}_recommendations` collection, documents keyed by
//! `{session_id}:{message_id}`, with a plain upsert (`update`, which creates
//! the document if absent) since there's only ever one writer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use error_stack::ResultExt;
use firestore::{FirestoreDb, FirestoreDbOptions};

use crate::error::{AuctionError, AuctionResult};
use crate::ledger_fsm::{LedgerEventKind, LedgerRecord};
use crate::recommendation::Recommendation;
use crate::storage::{LedgerStore, RecommendationStore};

pub struct FirestoreLedgerStore {
    db: FirestoreDb,
    collection: String,
    recommendation_collection: String,
}

impl FirestoreLedgerStore {
    /// Connects to the Firestore database identified by `project_id`.
    /// Recommendations are stored in a sibling collection, `{collection}_recommendations`.
    ///
    /// # Errors
    /// Returns an error if application-default credentials cannot be
    /// resolved or the initial connection fails.
    pub async fn connect(project_id: &str, collection: impl Into<String>) -> AuctionResult<Self> {
        let db = FirestoreDb::with_options(FirestoreDbOptions::new(project_id.to_owned()))
            .await
            .change_context(AuctionError::StorageUnavailable)
            .attach_printable("failed to connect to firestore")?;
        let collection = collection.into();
        let recommendation_collection = format!("{collection}_recommendations");
        Ok(Self {
            db,
            collection,
            recommendation_collection,
        })
    }
}

fn recommendation_doc_id(session_id: &str, message_id: &str) -> String {
    format!("{session_id}:{message_id}")
}

#[async_trait]
impl LedgerStore for FirestoreLedgerStore {
    async fn put(&self, record: LedgerRecord) -> AuctionResult<()> {
        let doc_id = record.auction_id.clone();

        let existing: Option<LedgerRecord> = self
            .db
            .fluent()
            .select()
            .by_id_in(&self.collection)
            .obj()
            .one(&doc_id)
            .await
            .change_context(AuctionError::StorageUnavailable)?;

        if existing.is_some() {
            return Err(AuctionError::Conflict.into());
        }

        self.db
            .fluent()
            .insert()
            .into(&self.collection)
            .document_id(&doc_id)
            .object(&record)
            .execute::<LedgerRecord>()
            .await
            .change_context(AuctionError::StorageUnavailable)?;

        Ok(())
    }

    async fn get(&self, auction_id: &str) -> AuctionResult<Option<LedgerRecord>> {
        let record = self
            .db
            .fluent()
            .select()
            .by_id_in(&self.collection)
            .obj()
            .one(auction_id)
            .await
            .change_context(AuctionError::StorageUnavailable)?;
        Ok(record)
    }

    async fn append_event(
        &self,
        auction_id: &str,
        serve_token: &str,
        kind: LedgerEventKind,
        now: DateTime<Utc>,
    ) -> AuctionResult<LedgerRecord> {
        let mut transaction = self
            .db
            .begin_transaction()
            .await
            .change_context(AuctionError::StorageUnavailable)?;

        let mut record: LedgerRecord = self
            .db
            .fluent()
            .select()
            .by_id_in(&self.collection)
            .obj()
            .one(auction_id)
            .await
            .change_context(AuctionError::StorageUnavailable)?
            .ok_or(AuctionError::NoSuchAuction)?;

        if record.serve_token.as_deref() != Some(serve_token) {
            return Err(AuctionError::NoSuchAuction.into());
        }

        record.apply(kind, now)?;

        self.db
            .fluent()
            .update()
            .in_col(&self.collection)
            .document_id(auction_id)
            .object(&record)
            .add_to_transaction(&mut transaction)
            .change_context(AuctionError::StorageUnavailable)?;

        transaction
            .commit()
            .await
            .change_context(AuctionError::StorageUnavailable)?;

        Ok(record)
    }
}

#[async_trait]
impl RecommendationStore for FirestoreLedgerStore {
    async fn get(&self, session_id: &str, message_id: &str) -> AuctionResult<Option<Recommendation>> {
        let doc_id = recommendation_doc_id(session_id, message_id);
        let recommendation = self
            .db
            .fluent()
            .select()
            .by_id_in(&self.recommendation_collection)
            .obj()
            .one(&doc_id)
            .await
            .change_context(AuctionError::StorageUnavailable)?;
        Ok(recommendation)
    }

    async fn put(&self, recommendation: Recommendation) -> AuctionResult<()> {
        let doc_id = recommendation_doc_id(&recommendation.session_id, &recommendation.message_id);
        self.db
            .fluent()
            .update()
            .in_col(&self.recommendation_collection)
            .document_id(&doc_id)
            .object(&recommendation)
            .execute::<Recommendation>()
            .await
            .change_context(AuctionError::StorageUnavailable)?;
        Ok(())
    }
}
