//! Ledger state machine (spec §4.7).
//!
//! A `LedgerRecord` tracks one served impression from creation through its
//! terminal settlement event. Transitions are idempotent: replaying the same
//! event against a record already in the resulting state is a no-op success,
//! while any event that would move a record out of a terminal state is
//! rejected. This lets callers (the recommendation coordinator, the bid
//! report endpoint) retry freely without double-counting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuctionError;

/// The settlement event kinds a served impression can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEventKind {
    Served,
    CpxReported,
    CpcReported,
    CpaReported,
    NoBid,
}

/// The current state of a ledger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerState {
    Created,
    Served,
    CpxReported,
    CpcReported,
    CpaReported,
    NoBid,
}

impl LedgerState {
    /// Terminal states accept no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LedgerState::CpxReported
                | LedgerState::CpcReported
                | LedgerState::CpaReported
                | LedgerState::NoBid
        )
    }
}

/// One row of the ledger: the lifecycle of a single `(auction_id,
/// serve_token)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub auction_id: String,
    /// Present once the auction has a winner; absent for a `NO_BID` record,
    /// since a no-bid outcome never mints a `serve_token` (spec §3).
    pub serve_token: Option<String>,
    pub state: LedgerState,
    pub winning_bidder: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Append-only history of applied events, newest last, for audit and
    /// idempotency diagnostics.
    pub events: Vec<LedgerEventRecord>,
}

/// One applied (or replayed) event in a record's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEventRecord {
    pub kind: LedgerEventKind,
    pub at: DateTime<Utc>,
}

impl LedgerRecord {
    /// Creates a new record in the `CREATED` state.
    #[must_use]
    pub fn new(auction_id: String, serve_token: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            auction_id,
            serve_token,
            state: LedgerState::Created,
            winning_bidder: None,
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        }
    }

    /// Applies `kind`, returning the resulting state.
    ///
    /// Replaying the event that already produced the current state succeeds
    /// as a no-op (idempotency, spec §4.7). Any other event applied to a
    /// terminal state, or an event applied out of the `CREATED -> SERVED ->
    /// {reported|no_bid}` order, is rejected.
    ///
    /// # Errors
    /// Returns `AuctionError::TerminalState` if the record is already
    /// terminal and `kind` would change it, or `AuctionError::SchemaInvalid`
    /// if `kind` is not a valid transition from the current state.
    pub fn apply(&mut self, kind: LedgerEventKind, now: DateTime<Utc>) -> Result<(), AuctionError> {
        use LedgerEventKind::{CpaReported, CpcReported, CpxReported, NoBid, Served};
        use LedgerState as S;

        let next = match (self.state, kind) {
            (S::Created, Served) => S::Served,
            (S::Created, NoBid) => S::NoBid,
            (S::Served, CpxReported) => S::CpxReported,
            (S::Served, CpcReported) => S::CpcReported,
            (S::Served, CpaReported) => S::CpaReported,

            // Idempotent replays: the event that already produced the
            // current state is a successful no-op.
            (S::Served, Served) => S::Served,
            (S::NoBid, NoBid) => S::NoBid,
            (S::CpxReported, CpxReported) => S::CpxReported,
            (S::CpcReported, CpcReported) => S::CpcReported,
            (S::CpaReported, CpaReported) => S::CpaReported,

            (state, _) if state.is_terminal() => return Err(AuctionError::TerminalState),
            _ => return Err(AuctionError::SchemaInvalid),
        };

        self.state = next;
        self.updated_at = now;
        self.events.push(LedgerEventRecord { kind, at: now });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn created_to_served_to_cpa() {
        let mut r = LedgerRecord::new("a1".into(), Some("s1".into()), t(0));
        r.apply(LedgerEventKind::Served, t(1)).expect("served");
        assert_eq!(r.state, LedgerState::Served);
        r.apply(LedgerEventKind::CpaReported, t(2)).expect("cpa");
        assert_eq!(r.state, LedgerState::CpaReported);
        assert_eq!(r.events.len(), 2);
    }

    #[test]
    fn created_to_no_bid() {
        let mut r = LedgerRecord::new("a1".into(), None, t(0));
        r.apply(LedgerEventKind::NoBid, t(1)).expect("no_bid");
        assert_eq!(r.state, LedgerState::NoBid);
        assert!(r.state.is_terminal());
    }

    #[test]
    fn replaying_same_event_is_idempotent() {
        let mut r = LedgerRecord::new("a1".into(), Some("s1".into()), t(0));
        r.apply(LedgerEventKind::Served, t(1)).expect("served");
        r.apply(LedgerEventKind::Served, t(2)).expect("replay");
        assert_eq!(r.state, LedgerState::Served);
        assert_eq!(r.events.len(), 2);
    }

    #[test]
    fn event_conflicting_with_terminal_state_is_rejected() {
        let mut r = LedgerRecord::new("a1".into(), Some("s1".into()), t(0));
        r.apply(LedgerEventKind::Served, t(1)).expect("served");
        r.apply(LedgerEventKind::CpaReported, t(2)).expect("cpa");
        let err = r
            .apply(LedgerEventKind::CpcReported, t(3))
            .expect_err("conflicting report must be rejected");
        assert_eq!(err, AuctionError::TerminalState);
        assert_eq!(r.state, LedgerState::CpaReported);
    }

    #[test]
    fn report_before_served_is_rejected() {
        let mut r = LedgerRecord::new("a1".into(), Some("s1".into()), t(0));
        let err = r
            .apply(LedgerEventKind::CpaReported, t(1))
            .expect_err("out of order");
        assert_eq!(err, AuctionError::SchemaInvalid);
    }

    #[test]
    fn no_bid_after_served_is_rejected() {
        let mut r = LedgerRecord::new("a1".into(), Some("s1".into()), t(0));
        r.apply(LedgerEventKind::Served, t(1)).expect("served");
        let err = r
            .apply(LedgerEventKind::NoBid, t(2))
            .expect_err("no_bid must not follow served");
        assert_eq!(err, AuctionError::SchemaInvalid);
    }
}
