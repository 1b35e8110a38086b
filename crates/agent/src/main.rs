//! `opcua-bridge-agent` -- bending machine program state to OPC-UA nodes.
//!
//! Reads program lifecycle events and machine context as JSON lines on
//! stdin and publishes the resulting node updates to the local OPC-UA
//! REST gateway.
//!
//! # Environment variables
//!
//! | Variable                | Required | Default | Description                              |
//! |-------------------------|----------|---------|------------------------------------------|
//! | `OPCUA_DATA_DIR`        | no       | `.`     | Folder holding `opcua-settings.json`     |
//! | `MODE_POLL_INTERVAL_MS` | no       | `100`   | Milliseconds between operating mode polls |
//! | `RUST_LOG`              | no       | `opcua_bridge_agent=info,opcua_bridge_gateway=info` | Log filter |

use std::sync::Arc;
use std::time::Duration;

use opcua_bridge_agent::poll::DEFAULT_POLL_INTERVAL;
use opcua_bridge_agent::{host, BridgeOptions, HostContext, OpcUaBridge, SettingsStore};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long shutdown waits for in-flight node updates.
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "opcua_bridge_agent=info,opcua_bridge_gateway=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let data_dir = std::env::var("OPCUA_DATA_DIR").unwrap_or_else(|_| ".".into());

    let poll_interval = std::env::var("MODE_POLL_INTERVAL_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_POLL_INTERVAL);

    tracing::info!(
        data_dir = %data_dir,
        poll_interval_ms = poll_interval.as_millis() as u64,
        "Starting opcua-bridge-agent",
    );

    let context = Arc::new(HostContext::new());
    let bridge = OpcUaBridge::with_options(
        SettingsStore::in_data_folder(&data_dir),
        context.clone(),
        context.clone(),
        tokio::runtime::Handle::current(),
        BridgeOptions {
            poll_interval,
            ..Default::default()
        },
    );

    bridge.initialize();

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());

    let signalled = tokio::select! {
        result = host::run(stdin, &bridge, &context) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to read host input");
            }
            false
        }
        () = shutdown_signal() => true,
    };

    bridge.uninitialize();

    if !bridge.drain(SHUTDOWN_DRAIN_TIMEOUT).await {
        tracing::warn!("Shutdown with node updates still in flight");
    }

    tracing::info!("Shutdown complete");

    // The blocking stdin read would otherwise hold the runtime open.
    if signalled {
        std::process::exit(0);
    }
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
