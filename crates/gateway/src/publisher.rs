//! Fire-and-forget node publisher.
//!
//! [`GatewayPublisher`] PUTs one [`NodePacket`] per node update to the
//! gateway. Delivery is at-most-once: a failed request is logged and
//! the update is dropped, with no retry, queue or backoff.

use async_trait::async_trait;
use opcua_bridge_core::node::NodeAssertion;

use crate::endpoint::GatewayEndpoint;
use crate::packet::NodePacket;
use crate::sink::NodeSink;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for node update failures.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The underlying HTTP request failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The gateway returned a non-2xx status code.
    #[error("Gateway returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// GatewayPublisher
// ---------------------------------------------------------------------------

/// Sends node updates to the local OPC-UA REST gateway.
pub struct GatewayPublisher {
    client: reqwest::Client,
    url: String,
}

impl GatewayPublisher {
    /// Create a publisher for `endpoint` with a fresh HTTP client.
    pub fn new(endpoint: GatewayEndpoint) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: endpoint.update_url(),
        }
    }

    /// Execute a single PUT request and check the response status.
    pub async fn try_send(&self, assertion: &NodeAssertion) -> Result<(), PublishError> {
        let response = self
            .client
            .put(&self.url)
            .json(&NodePacket::from(assertion))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PublishError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }

    /// Send one update, logging and discarding any failure.
    pub async fn send(&self, assertion: &NodeAssertion) {
        match self.try_send(assertion).await {
            Ok(()) => {
                tracing::trace!(
                    node = assertion.name(),
                    value = %assertion.value,
                    "Node updated",
                );
            }
            Err(e) => {
                tracing::warn!(
                    node = assertion.name(),
                    value = %assertion.value,
                    url = %self.url,
                    error = %e,
                    "Node update dropped",
                );
            }
        }
    }
}

#[async_trait]
impl NodeSink for GatewayPublisher {
    async fn publish(&self, assertion: NodeAssertion) {
        self.send(&assertion).await;
    }
}
