//! `opcua-bridge-agent` library crate.
//!
//! Wires the core engine to the gateway: settings, dispatch and
//! scheduling, the mode poll, and the host-facing [`OpcUaBridge`].
//! The binary entrypoint lives in `main.rs`.

pub mod bridge;
pub mod context;
pub mod dispatcher;
pub mod host;
pub mod poll;
pub mod settings;

pub use bridge::{BridgeOptions, OpcUaBridge};
pub use context::HostContext;
pub use settings::{Settings, SettingsStore};
