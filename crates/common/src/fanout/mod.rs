//! Best-effort publish/subscribe fanout (spec §4.5).
//!
//! Fanout is explicitly best-effort: a slow or unreachable subscriber must
//! never block or fail the auction it's attached to. Every transport
//! implementation is expected to honor a short, bounded publish timeout and
//! swallow (while logging) any failure past that point.

pub mod local;
pub mod pubsub;

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Bound on how long a single fanout publish may take before it's abandoned.
pub const PUBLISH_TIMEOUT: Duration = Duration::from_millis(10);

/// An envelope published to a topic: the category pool determines routing,
/// the payload is the canonical bytes of whatever event is being fanned out.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<'a> {
    pub pool: &'a str,
    pub payload: &'a [u8],
}

/// Fanout transport abstraction. Implementations must not propagate
/// transport errors to callers; `publish` has no `Result` because there is
/// nothing a caller could usefully do with a fanout failure other than log
/// it, which the implementation already does.
#[async_trait]
pub trait FanoutTransport: Send + Sync {
    async fn publish(&self, envelope: Envelope<'_>);
}
