//! Read-only machine and job context consumed by the engine.
//!
//! The host owns the real machine status and work-order state. The
//! bridge sees them through the [`MachineStatus`] and [`JobSource`]
//! traits, injected once at construction, and the engine only ever
//! receives an [`EventContext`] snapshot taken at event time.

use serde::{Deserialize, Serialize};

use crate::mode::OperatingMode;
use crate::types::Quantity;

/// An active work order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Total parts required by the order.
    pub qty_needed: Quantity,
}

/// Live machine status provider.
pub trait MachineStatus: Send + Sync {
    fn mode(&self) -> OperatingMode;
    fn is_in_error(&self) -> bool;
}

/// Provider of the currently active job, if any.
pub trait JobSource: Send + Sync {
    fn active_job(&self) -> Option<Job>;
}

/// Context sampled once per lifecycle event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventContext {
    pub mode: OperatingMode,
    pub in_error: bool,
    pub job: Option<Job>,
}

impl EventContext {
    /// Snapshot both providers.
    pub fn sample(machine: &dyn MachineStatus, jobs: &dyn JobSource) -> Self {
        Self {
            mode: machine.mode(),
            in_error: machine.is_in_error(),
            job: jobs.active_job(),
        }
    }
}
