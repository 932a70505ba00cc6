//! Local fanout transport: logs the publish and drops it. Used when no
//! external subscriber has been configured, and as the default in tests.

use async_trait::async_trait;

use crate::fanout::{Envelope, FanoutTransport};

#[derive(Default)]
pub struct LocalFanout;

impl LocalFanout {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FanoutTransport for LocalFanout {
    async fn publish(&self, envelope: Envelope<'_>) {
        log::debug!(
            "fanout (local, dropped): pool={} bytes={}",
            envelope.pool,
            envelope.payload.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_does_not_panic() {
        let fanout = LocalFanout::new();
        fanout
            .publish(Envelope {
                pool: "sports",
                payload: b"{}",
            })
            .await;
    }
}
