//! Per-process session memory.

use crate::mode::OperatingMode;
use crate::types::Quantity;

/// What the bridge remembers between lifecycle events.
///
/// Created once with empty defaults and mutated only by the
/// [`StateEngine`](crate::engine::StateEngine).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMemory {
    pub program_name: String,
    pub target_quantity: Quantity,
    pub current_quantity: Quantity,
    /// Set by a completion that finished the job; suppresses the abort
    /// pulse on the next first-bend start.
    pub program_completed: bool,
    /// The current run started at or beyond the job's quantity.
    pub over_produce: bool,
    /// Last mode sampled by the mode poll.
    pub last_mode: OperatingMode,
}
