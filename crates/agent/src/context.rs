//! Host-fed machine context.
//!
//! [`HostContext`] is the in-process stand-in for the controller's
//! machine status and work-order providers. The host adapter writes
//! into it; the bridge reads it through the core traits.

use std::sync::{PoisonError, RwLock};

use opcua_bridge_core::context::{Job, JobSource, MachineStatus};
use opcua_bridge_core::mode::OperatingMode;

#[derive(Debug, Clone, Copy, Default)]
struct Snapshot {
    mode: OperatingMode,
    in_error: bool,
    job: Option<Job>,
}

/// Latest machine status and active job reported by the host.
#[derive(Debug, Default)]
pub struct HostContext {
    snapshot: RwLock<Snapshot>,
}

impl HostContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, mode: OperatingMode, in_error: bool) {
        let mut snapshot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        snapshot.mode = mode;
        snapshot.in_error = in_error;
    }

    /// Replace the active job; `None` clears it.
    pub fn set_job(&self, job: Option<Job>) {
        self.snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .job = job;
    }

    fn read(&self) -> Snapshot {
        *self.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MachineStatus for HostContext {
    fn mode(&self) -> OperatingMode {
        self.read().mode
    }

    fn is_in_error(&self) -> bool {
        self.read().in_error
    }
}

impl JobSource for HostContext {
    fn active_job(&self) -> Option<Job> {
        self.read().job
    }
}
