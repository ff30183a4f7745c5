//! Library side of the `wellsync` binary
//!
//! Wires configuration, tracing, the event pipeline and the file store
//! together and runs one subcommand.

pub mod cli;
pub mod commands;
pub mod config;
pub mod errors;
pub mod tracing;

pub use cli::{Cli, Commands};
pub use commands::{CommandOutput, Session};
pub use config::WellsyncConfig;
pub use errors::CliError;

use serde_json::Value;
use std::sync::Arc;
use wellsync_events::{EventBus, EventHistory, JsonRenderer};

/// Run the command described by `cli` and return the JSON to print.
///
/// # Errors
///
/// Returns a [`CliError`] for configuration problems, invalid input, or a
/// failed storage operation.
pub async fn run(cli: &Cli) -> Result<Value, CliError> {
    let config = WellsyncConfig::load(cli.config.as_deref())?;
    let store_dir = cli.store.clone().unwrap_or_else(|| config.storage_dir());

    let bus = EventBus::new();
    let history = Arc::new(EventHistory::default());
    let recorder = {
        let history = Arc::clone(&history);
        let receiver = bus.subscribe();
        tokio::spawn(async move { history.run(receiver).await })
    };
    let renderer = cli
        .events
        .then(|| tokio::spawn(JsonRenderer::new().run(bus.subscribe())));

    let tracing_config = tracing::TracingConfig {
        format: cli.format,
        level: cli.level,
        filter: None,
    };
    let guard = tracing::init_tracing(&tracing_config, bus.sender())?;

    let session = Session::new(&config, store_dir);
    let outcome = session.execute(&cli.command).await;

    // Releasing every sender closes the bus so the consumers finish
    drop(guard);
    bus.shutdown();
    drop(bus);
    if let Some(renderer) = renderer {
        let _ = renderer.await;
    }
    let _ = recorder.await;

    Ok(outcome?.into_value(&history))
}
