//! Gateway URL construction.

/// Host the gateway always listens on.
pub const GATEWAY_HOST: &str = "localhost";

/// Path of the node update route.
pub const UPDATE_NODE_PATH: &str = "/api/OpcUaNode/UpdateNodeValue";

/// Scheme and port of the local gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayEndpoint {
    pub port: u16,
    pub use_https: bool,
}

impl GatewayEndpoint {
    pub fn new(port: u16, use_https: bool) -> Self {
        Self { port, use_https }
    }

    pub fn scheme(&self) -> &'static str {
        if self.use_https {
            "https"
        } else {
            "http"
        }
    }

    /// Full URL of the node update route.
    pub fn update_url(&self) -> String {
        format!(
            "{}://{GATEWAY_HOST}:{}{UPDATE_NODE_PATH}",
            self.scheme(),
            self.port
        )
    }
}
