//! Program-state-to-node translation for the OPC-UA REST gateway.
//!
//! Pure domain logic with no I/O: the closed set of gateway nodes, the
//! machine context seen by the engine, the per-process session memory,
//! and the [`StateEngine`](engine::StateEngine) that turns program
//! lifecycle events into ordered node batches.

pub mod context;
pub mod engine;
pub mod mode;
pub mod node;
pub mod session;
pub mod types;
