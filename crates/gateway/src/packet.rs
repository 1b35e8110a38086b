//! Wire format of a node update.

use opcua_bridge_core::node::NodeAssertion;
use opcua_bridge_core::types::Timestamp;
use serde::Serialize;

/// JSON body of `PUT /api/OpcUaNode/UpdateNodeValue`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePacket<'a> {
    pub node_type: i32,
    /// ISO-8601, UTC.
    pub update_time: Timestamp,
    pub node_name: &'a str,
    pub node_value: &'a str,
}

impl<'a> From<&'a NodeAssertion> for NodePacket<'a> {
    fn from(assertion: &'a NodeAssertion) -> Self {
        Self {
            node_type: assertion.node_type(),
            update_time: assertion.timestamp,
            node_name: assertion.name(),
            node_value: &assertion.value,
        }
    }
}
