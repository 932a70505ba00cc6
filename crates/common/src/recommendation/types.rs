//! Recommendation types (spec §3, §4.8).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auction::AuctionResult as AuctionOutcome;

/// How long a caller should wait before polling again while a recommendation
/// is still in progress (spec §4.8).
pub const RETRY_AFTER_MS: u64 = 150;

/// Lifecycle status of a recommendation record. Transitions are
/// `IN_PROGRESS -> {COMPLETED, FAILED}`; once terminal, the record is
/// immutable (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationStatus {
    InProgress,
    Completed,
    Failed,
}

/// A recommendation: cache entity keyed by `(session_id, message_id)` (spec
/// §3), holding the platform's query woven together with whatever ad the
/// underlying auction produced, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub session_id: String,
    pub message_id: String,
    pub status: RecommendationStatus,
    pub query: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weave_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serve_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creative_metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auction_result: Option<AuctionOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Present only on an IN_PROGRESS response (spec §4.8: `retry_after_ms
    /// = 150`); never persisted as part of the terminal record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl Recommendation {
    #[must_use]
    pub fn in_progress(session_id: String, message_id: String, query: String, now: DateTime<Utc>) -> Self {
        Self {
            session_id,
            message_id,
            status: RecommendationStatus::InProgress,
            query,
            created_at: now,
            updated_at: now,
            weave_content: None,
            serve_token: None,
            creative_metadata: None,
            auction_result: None,
            error: None,
            retry_after_ms: Some(RETRY_AFTER_MS),
        }
    }

    #[must_use]
    pub fn as_in_progress_response(&self) -> Self {
        let mut copy = self.clone();
        copy.retry_after_ms = Some(RETRY_AFTER_MS);
        copy
    }

    pub fn fail(&mut self, error: String, now: DateTime<Utc>) {
        self.status = RecommendationStatus::Failed;
        self.error = Some(error);
        self.updated_at = now;
        self.retry_after_ms = None;
    }

    pub fn complete(&mut self, weave_content: String, outcome: AuctionOutcome, now: DateTime<Utc>) {
        self.serve_token = outcome.winner.as_ref().map(|w| w.serve_token.clone());
        self.creative_metadata = outcome.winner.as_ref().and_then(|w| w.creative.clone());
        self.weave_content = Some(weave_content);
        self.auction_result = Some(outcome);
        self.status = RecommendationStatus::Completed;
        self.updated_at = now;
        self.retry_after_ms = None;
    }
}

/// Weaves a winning ad's creative into `query`, prefixing each sponsored
/// link with `[Ad]` so downstream renderers and readers can identify it
/// (spec §4.8). A winner with no `links` array in its creative falls back to
/// a single `text` field, or leaves `query` untouched if neither is present.
#[must_use]
pub fn weave_content(query: &str, outcome: &AuctionOutcome) -> String {
    let Some(winner) = &outcome.winner else {
        return query.to_owned();
    };
    let Some(creative) = &winner.creative else {
        return query.to_owned();
    };

    if let Some(links) = creative.get("links").and_then(serde_json::Value::as_array) {
        let ad_lines: Vec<String> = links
            .iter()
            .filter_map(serde_json::Value::as_str)
            .map(|link| format!("[Ad] {link}"))
            .collect();
        if ad_lines.is_empty() {
            return query.to_owned();
        }
        return format!("{query}\n\n{}", ad_lines.join("\n"));
    }

    let ad_text = creative.get("text").and_then(serde_json::Value::as_str).unwrap_or("");
    if ad_text.is_empty() {
        query.to_owned()
    } else {
        format!("{query}\n\n[Ad] {ad_text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::{PricingModel, Winner};
    use serde_json::json;

    fn won(creative: serde_json::Value) -> AuctionOutcome {
        AuctionOutcome::won(
            "a1".into(),
            Winner {
                bidder: "acme".into(),
                price: 1.0,
                pricing_model: PricingModel::Cpc,
                creative: Some(creative),
                serve_token: "t1".into(),
            },
        )
    }

    #[test]
    fn weave_content_appends_single_ad_text_on_win() {
        let outcome = won(json!({"text": "Buy now"}));
        let woven = weave_content("base story", &outcome);
        assert_eq!(woven, "base story\n\n[Ad] Buy now");
    }

    #[test]
    fn weave_content_prefixes_each_link_on_win() {
        let outcome = won(json!({"links": ["https://a.example", "https://b.example"]}));
        let woven = weave_content("base story", &outcome);
        assert_eq!(woven, "base story\n\n[Ad] https://a.example\n[Ad] https://b.example");
    }

    #[test]
    fn weave_content_leaves_base_unchanged_on_no_bid() {
        let outcome = AuctionOutcome::no_bid("a1".into());
        assert_eq!(weave_content("base story", &outcome), "base story");
    }

    #[test]
    fn weave_content_leaves_base_unchanged_when_creative_has_no_text_or_links() {
        let outcome = won(json!({}));
        assert_eq!(weave_content("base story", &outcome), "base story");
    }

    #[test]
    fn complete_populates_serve_token_and_creative_metadata_from_winner() {
        let outcome = won(json!({"text": "Buy now"}));
        let now = Utc::now();
        let mut record = Recommendation::in_progress("s1".into(), "m1".into(), "q".into(), now);
        record.complete("base\n\n[Ad] Buy now".into(), outcome, now);
        assert_eq!(record.status, RecommendationStatus::Completed);
        assert_eq!(record.serve_token.as_deref(), Some("t1"));
        assert!(record.retry_after_ms.is_none());
    }
}
