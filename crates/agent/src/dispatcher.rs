//! Asynchronous batch dispatch and deferred callbacks.
//!
//! Every node of a batch is published from its own task, set entries
//! spawned before clear entries. Sibling tasks are not ordered against
//! each other; each targets a different gateway node. Nothing is
//! awaited by the caller and nothing is retried.
//!
//! All spawned work is registered with a [`TaskTracker`] so shutdown
//! can wait for in-flight updates.

use std::sync::Arc;
use std::time::Duration;

use opcua_bridge_core::node::NodeBatch;
use opcua_bridge_gateway::NodeSink;
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;

/// Spawns publish tasks and delayed callbacks on a runtime.
#[derive(Clone)]
pub struct Dispatcher {
    sink: Arc<dyn NodeSink>,
    runtime: Handle,
    tracker: TaskTracker,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn NodeSink>, runtime: Handle) -> Self {
        Self {
            sink,
            runtime,
            tracker: TaskTracker::new(),
        }
    }

    /// Publish every node in `batch`, one task per node.
    pub fn dispatch(&self, batch: NodeBatch) {
        tracing::debug!(
            set = ?batch.set_nodes(),
            clear = ?batch.cleared_nodes(),
            timestamp = %batch.timestamp,
            "Dispatching node batch",
        );

        for assertion in batch.into_assertions() {
            let sink = Arc::clone(&self.sink);
            self.tracker.spawn_on(
                async move {
                    sink.publish(assertion).await;
                },
                &self.runtime,
            );
        }
    }

    /// Run `callback` once after `delay`. Not cancellable.
    pub fn schedule<F>(&self, delay: Duration, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        tracing::debug!(delay_ms = delay.as_millis() as u64, "Scheduling deferred callback");
        self.tracker.spawn_on(
            async move {
                tokio::time::sleep(delay).await;
                callback();
            },
            &self.runtime,
        );
    }

    /// Wait up to `timeout` for all tracked tasks to finish.
    ///
    /// Returns `false` if tasks were still running at the deadline.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let drained = tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok();
        self.tracker.reopen();
        drained
    }
}
