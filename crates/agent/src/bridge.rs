//! Host-facing bridge.
//!
//! [`OpcUaBridge`] is what the host calls: `initialize`, the four
//! program lifecycle callbacks and `uninitialize`. It samples the
//! injected machine/job providers, runs the [`StateEngine`] under a
//! mutex, and hands the resulting batches to the [`Dispatcher`].
//!
//! Lifecycle callbacks are synchronous and never fail. Before
//! `initialize` has loaded settings they are silent no-ops.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use chrono::Utc;
use opcua_bridge_core::context::{EventContext, JobSource, MachineStatus};
use opcua_bridge_core::engine::{Reaction, StateEngine};
use opcua_bridge_core::session::SessionMemory;
use opcua_bridge_core::types::Quantity;
use opcua_bridge_gateway::{GatewayPublisher, NodeSink};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::Dispatcher;
use crate::poll::{self, DEFAULT_POLL_INTERVAL};
use crate::settings::{Settings, SettingsStore};

/// Bridge between host lifecycle callbacks and the gateway.
pub struct OpcUaBridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    store: SettingsStore,
    machine: Arc<dyn MachineStatus>,
    jobs: Arc<dyn JobSource>,
    runtime: Handle,
    /// Replaces the gateway publisher when set.
    sink_override: Option<Arc<dyn NodeSink>>,
    poll_interval: Duration,
    /// Serializes every access to the session memory.
    engine: Mutex<StateEngine>,
    /// Set once by the first `initialize`.
    active: OnceLock<Active>,
    /// Cancellation token of the running mode poll.
    poll: Mutex<Option<CancellationToken>>,
}

/// State that exists only after settings are loaded.
struct Active {
    settings: Arc<Settings>,
    dispatcher: Dispatcher,
}

/// Optional construction parameters.
pub struct BridgeOptions {
    /// Publish through this sink instead of the HTTP gateway publisher.
    pub sink: Option<Arc<dyn NodeSink>>,
    pub poll_interval: Duration,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            sink: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl OpcUaBridge {
    /// Create an uninitialized bridge publishing to the HTTP gateway.
    ///
    /// All tasks are spawned on `runtime`, so the lifecycle callbacks
    /// may be called from threads outside the runtime.
    pub fn new(
        store: SettingsStore,
        machine: Arc<dyn MachineStatus>,
        jobs: Arc<dyn JobSource>,
        runtime: Handle,
    ) -> Self {
        Self::with_options(store, machine, jobs, runtime, BridgeOptions::default())
    }

    pub fn with_options(
        store: SettingsStore,
        machine: Arc<dyn MachineStatus>,
        jobs: Arc<dyn JobSource>,
        runtime: Handle,
        options: BridgeOptions,
    ) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                store,
                machine,
                jobs,
                runtime,
                sink_override: options.sink,
                poll_interval: options.poll_interval,
                engine: Mutex::new(StateEngine::new()),
                active: OnceLock::new(),
                poll: Mutex::new(None),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Host lifecycle
    // -----------------------------------------------------------------------

    /// Load settings (once) and start the mode poll.
    pub fn initialize(&self) {
        let active = self.inner.activate();
        tracing::info!(
            port = active.settings.port,
            use_https = active.settings.use_https,
            resume_interval_secs = active.settings.resume_interval_secs,
            "Bridge initialized",
        );

        let mut poll = self.inner.poll_guard();
        if poll.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(poll::run(
            self.inner.poll_interval,
            cancel.clone(),
            move || inner.observe_mode(),
        ));
        *poll = Some(cancel);
    }

    /// Stop the mode poll. Pending resumes and in-flight updates finish.
    pub fn uninitialize(&self) {
        if let Some(cancel) = self.inner.poll_guard().take() {
            cancel.cancel();
            tracing::info!("Bridge uninitialized");
        }
    }

    pub fn program_started(&self, pgm_name: &str, bend_no: i32, quantity: Quantity) {
        self.inner.handle("program_started", |engine, ctx| {
            engine.program_started(ctx, pgm_name, bend_no, quantity, Utc::now())
        });
    }

    pub fn program_stopped(&self, pgm_name: &str, bend_no: i32, quantity: Quantity) {
        self.inner.handle("program_stopped", |engine, ctx| {
            engine.program_stopped(ctx, pgm_name, bend_no, quantity, Utc::now())
        });
    }

    pub fn program_completed(&self, pgm_name: &str, quantity: Quantity) {
        self.inner.handle("program_completed", |engine, ctx| {
            engine.program_completed(ctx, pgm_name, quantity, Utc::now())
        });
    }

    pub fn bend_changed(&self, pgm_name: &str, bend_no: i32) {
        self.inner.handle("bend_changed", |engine, _| {
            engine.bend_changed(pgm_name, bend_no)
        });
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    pub fn is_initialized(&self) -> bool {
        self.inner.active.get().is_some()
    }

    /// Snapshot of the session memory.
    pub fn memory(&self) -> SessionMemory {
        self.inner.engine().memory().clone()
    }

    /// Wait up to `timeout` for in-flight updates and pending resumes.
    pub async fn drain(&self, timeout: Duration) -> bool {
        match self.inner.active.get() {
            Some(active) => active.dispatcher.drain(timeout).await,
            None => true,
        }
    }
}

impl BridgeInner {
    fn activate(&self) -> &Active {
        self.active.get_or_init(|| {
            let settings = self.store.load();
            let sink = self.sink_override.clone().unwrap_or_else(|| {
                Arc::new(GatewayPublisher::new(settings.endpoint())) as Arc<dyn NodeSink>
            });
            Active {
                settings,
                dispatcher: Dispatcher::new(sink, self.runtime.clone()),
            }
        })
    }

    fn engine(&self) -> MutexGuard<'_, StateEngine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn poll_guard(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.poll.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one lifecycle event through the engine and apply its reaction.
    fn handle<F>(self: &Arc<Self>, event: &'static str, decide: F)
    where
        F: FnOnce(&mut StateEngine, &EventContext) -> Reaction,
    {
        let Some(active) = self.active.get() else {
            tracing::debug!(event, "Ignoring event before initialize");
            return;
        };

        let ctx = EventContext::sample(self.machine.as_ref(), self.jobs.as_ref());
        let mut engine = self.engine();
        let reaction = decide(&mut *engine, &ctx);

        if reaction.batch.is_none() && !reaction.schedule_resume {
            tracing::debug!(event, mode = ?ctx.mode, "Event produced no node updates");
        }

        if let Some(batch) = reaction.batch {
            active.dispatcher.dispatch(batch);
        }

        if reaction.schedule_resume {
            let inner = Arc::clone(self);
            active
                .dispatcher
                .schedule(active.settings.resume_interval(), move || inner.raise_running());
        }
    }

    /// Deferred half of a restart or auto-resume, stamped at fire time.
    fn raise_running(&self) {
        if let Some(active) = self.active.get() {
            tracing::debug!("Raising running after resume interval");
            active
                .dispatcher
                .dispatch(StateEngine::raise_running(Utc::now()));
        }
    }

    /// One mode poll iteration.
    fn observe_mode(&self) {
        let Some(active) = self.active.get() else {
            return;
        };

        let mode = self.machine.mode();
        let batch = self
            .engine()
            .mode_observed(mode, active.settings.abort_on_mode_exit, Utc::now());

        if let Some(batch) = batch {
            tracing::info!(?mode, "Production mode left, publishing abort");
            active.dispatcher.dispatch(batch);
        }
    }
}
