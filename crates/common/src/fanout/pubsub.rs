//! Cloud pub/sub fanout.
//!
//! Wiring a specific vendor SDK (GCP Pub/Sub, SNS, etc.) is out of scope; a
//! concrete `PubSubClient` is a thin adapter the deployer supplies. The
//! default implementation shipped here publishes over plain HTTP POST to a
//! configured collector endpoint, which is enough to exercise the fanout
//! path end to end without committing to a vendor.

use async_trait::async_trait;

use crate::fanout::{Envelope, FanoutTransport, PUBLISH_TIMEOUT};

/// Narrow interface a vendor pub/sub adapter must satisfy. Kept separate
/// from `FanoutTransport` so a vendor client can be written and tested
/// without pulling in the topic-prefixing and timeout policy below.
#[async_trait]
pub trait PubSubClient: Send + Sync {
    async fn publish_raw(&self, topic: &str, payload: &[u8]) -> Result<(), String>;
}

/// Publishes to topics named `{topic_prefix}.{pool}` via an arbitrary
/// `PubSubClient`, enforcing the fanout publish timeout and logging (never
/// propagating) failures.
pub struct PubSubFanout<C: PubSubClient> {
    client: C,
    topic_prefix: String,
}

impl<C: PubSubClient> PubSubFanout<C> {
    pub fn new(client: C, topic_prefix: impl Into<String>) -> Self {
        Self {
            client,
            topic_prefix: topic_prefix.into(),
        }
    }

    fn topic_for(&self, pool: &str) -> String {
        format!("{}.{}", self.topic_prefix, pool)
    }
}

#[async_trait]
impl<C: PubSubClient> FanoutTransport for PubSubFanout<C> {
    async fn publish(&self, envelope: Envelope<'_>) {
        let topic = self.topic_for(envelope.pool);
        let result = tokio::time::timeout(
            PUBLISH_TIMEOUT,
            self.client.publish_raw(&topic, envelope.payload),
        )
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log::warn!("fanout publish to {topic} failed: {err}"),
            Err(_) => log::warn!("fanout publish to {topic} timed out after {PUBLISH_TIMEOUT:?}"),
        }
    }
}

/// Default `PubSubClient` that POSTs the payload to a single configured
/// collector URL, passing the topic as an `X-Topic` header. Intended for
/// deployments that front their real pub/sub system with an HTTP gateway.
pub struct HttpPostClient {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpPostClient {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PubSubClient for HttpPostClient {
    async fn publish_raw(&self, topic: &str, payload: &[u8]) -> Result<(), String> {
        self.client
            .post(&self.endpoint)
            .header("X-Topic", topic)
            .header("Content-Type", "application/json")
            .body(payload.to_vec())
            .send()
            .await
            .map_err(|err| err.to_string())?
            .error_for_status()
            .map_err(|err| err.to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingClient {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PubSubClient for CountingClient {
        async fn publish_raw(&self, _topic: &str, _payload: &[u8]) -> Result<(), String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingClient;

    #[async_trait]
    impl PubSubClient for FailingClient {
        async fn publish_raw(&self, _topic: &str, _payload: &[u8]) -> Result<(), String> {
            Err("boom".into())
        }
    }

    #[tokio::test]
    async fn publish_routes_through_client() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fanout = PubSubFanout::new(
            CountingClient {
                calls: calls.clone(),
            },
            "aip",
        );
        fanout
            .publish(Envelope {
                pool: "sports",
                payload: b"{}",
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn publish_failure_does_not_panic() {
        let fanout = PubSubFanout::new(FailingClient, "aip");
        fanout
            .publish(Envelope {
                pool: "sports",
                payload: b"{}",
            })
            .await;
    }

    #[test]
    fn topic_for_applies_prefix() {
        let fanout = PubSubFanout::new(FailingClient, "aip");
        assert_eq!(fanout.topic_for("sports"), "aip.sports");
    }
}
