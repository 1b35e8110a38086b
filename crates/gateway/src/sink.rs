//! Publishing seam between the dispatcher and the transport.

use async_trait::async_trait;
use opcua_bridge_core::node::NodeAssertion;

/// Destination for node updates.
///
/// Implementations own their failure handling: `publish` never
/// reports an error, so a lost update can never reach the engine.
#[async_trait]
pub trait NodeSink: Send + Sync {
    async fn publish(&self, assertion: NodeAssertion);
}
