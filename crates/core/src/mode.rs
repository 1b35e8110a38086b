//! Machine operating modes.

use serde::{Deserialize, Serialize};

/// Operating mode reported by the machine controller.
///
/// Only [`SemiAuto`](OperatingMode::SemiAuto) and
/// [`Auto`](OperatingMode::Auto) count as production; program starts
/// seen in any other mode are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// Program editing. The controller starts up here.
    #[default]
    Program,
    Manual,
    SemiAuto,
    Auto,
}

impl OperatingMode {
    /// `true` for the modes in which parts are produced.
    pub fn is_production(self) -> bool {
        matches!(self, OperatingMode::SemiAuto | OperatingMode::Auto)
    }
}
