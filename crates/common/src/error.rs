//! Core error kinds surfaced by the auction engine.
//!
//! Every fallible core operation returns `error_stack::Report<AuctionError>`
//! so callers retain a context chain while still being able to match on a
//! single flat enum for HTTP status mapping (see `crates/server/src/error.rs`).

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuctionError {
    #[error("request failed schema validation")]
    SchemaInvalid,

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("timestamp outside allowed clock skew")]
    TimestampOutOfRange,

    #[error("nonce already observed within its TTL")]
    NonceDuplicate,

    #[error("auction id is not known to the runner")]
    UnknownAuction,

    #[error("auction window has already closed")]
    WindowClosed,

    #[error("bidder was not invited to this auction")]
    NotInvited,

    #[error("bidder already submitted a bid for this auction")]
    DuplicateBid,

    #[error("an auction with this id already exists")]
    Conflict,

    #[error("ledger record has already reached a terminal state")]
    TerminalState,

    #[error("no ledger record exists for this auction/serve_token pair")]
    NoSuchAuction,

    #[error("storage backend is unavailable")]
    StorageUnavailable,

    #[error("internal error")]
    Internal,
}

pub type AuctionResult<T> = error_stack::Result<T, AuctionError>;
