//! OPC-UA REST gateway client.
//!
//! - [`GatewayEndpoint`]: where node updates are sent.
//! - [`NodePacket`]: the JSON body of one node update.
//! - [`NodeSink`]: the seam the dispatcher publishes through.
//! - [`GatewayPublisher`]: the reqwest-backed sink used in production.

pub mod endpoint;
pub mod packet;
pub mod publisher;
pub mod sink;

pub use endpoint::GatewayEndpoint;
pub use packet::NodePacket;
pub use publisher::{GatewayPublisher, PublishError};
pub use sink::NodeSink;
