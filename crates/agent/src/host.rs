//! JSON-lines host adapter.
//!
//! The agent binary stands in for the machine controller's plugin host:
//! each stdin line is one [`HostMessage`], either a context update
//! (machine status, active job) or a program lifecycle callback.
//!
//! ```text
//! {"type":"machine_status","mode":"auto","in_error":false}
//! {"type":"job","qty_needed":10}
//! {"type":"program_started","pgm_name":"PGM1","bend_no":0,"quantity":5}
//! {"type":"program_completed","pgm_name":"PGM1","quantity":10}
//! ```
//!
//! Malformed lines are logged and skipped.

use opcua_bridge_core::context::Job;
use opcua_bridge_core::mode::OperatingMode;
use opcua_bridge_core::types::Quantity;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::bridge::OpcUaBridge;
use crate::context::HostContext;

/// Quantity reported when the host omits it.
pub const UNKNOWN_QUANTITY: Quantity = -1;

fn unknown_quantity() -> Quantity {
    UNKNOWN_QUANTITY
}

/// One line of host input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    MachineStatus {
        mode: OperatingMode,
        #[serde(default)]
        in_error: bool,
    },
    Job {
        qty_needed: Quantity,
    },
    JobCleared,
    ProgramStarted {
        pgm_name: String,
        bend_no: i32,
        #[serde(default = "unknown_quantity")]
        quantity: Quantity,
    },
    ProgramStopped {
        pgm_name: String,
        bend_no: i32,
        #[serde(default = "unknown_quantity")]
        quantity: Quantity,
    },
    ProgramCompleted {
        pgm_name: String,
        #[serde(default = "unknown_quantity")]
        quantity: Quantity,
    },
    BendChanged {
        pgm_name: String,
        bend_no: i32,
    },
}

/// Error type for unparseable host input.
#[derive(Debug, thiserror::Error)]
pub enum HostMessageError {
    #[error("Malformed host message: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl HostMessage {
    /// Parse one input line.
    pub fn parse(line: &str) -> Result<Self, HostMessageError> {
        Ok(serde_json::from_str(line)?)
    }

    /// Route the message to the context or the bridge.
    pub fn apply(self, bridge: &OpcUaBridge, context: &HostContext) {
        match self {
            HostMessage::MachineStatus { mode, in_error } => context.set_status(mode, in_error),
            HostMessage::Job { qty_needed } => context.set_job(Some(Job { qty_needed })),
            HostMessage::JobCleared => context.set_job(None),
            HostMessage::ProgramStarted {
                pgm_name,
                bend_no,
                quantity,
            } => bridge.program_started(&pgm_name, bend_no, quantity),
            HostMessage::ProgramStopped {
                pgm_name,
                bend_no,
                quantity,
            } => bridge.program_stopped(&pgm_name, bend_no, quantity),
            HostMessage::ProgramCompleted { pgm_name, quantity } => {
                bridge.program_completed(&pgm_name, quantity)
            }
            HostMessage::BendChanged { pgm_name, bend_no } => {
                bridge.bend_changed(&pgm_name, bend_no)
            }
        }
    }
}

/// Feed every line of `reader` to the bridge until EOF.
pub async fn run<R>(reader: R, bridge: &OpcUaBridge, context: &HostContext) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match HostMessage::parse(line) {
            Ok(message) => {
                tracing::debug!(?message, "Host message");
                message.apply(bridge, context);
            }
            Err(e) => {
                tracing::warn!(error = %e, raw = %line, "Skipping host message");
            }
        }
    }

    tracing::info!("Host input closed");
    Ok(())
}
