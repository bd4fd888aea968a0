//! # Commissioning Device Runtime
//!
//! Entry point for a commissionable device process.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (`RUST_LOG`, default `info`, written to stderr)
//! 2. Load configuration from the environment
//! 3. Open the durable store under `CG_DATA_DIR`
//! 4. Boot the commissioning gate (TC and fabrics reloaded, interrupted
//!    attempts discarded)
//! 5. Spawn the gate service
//! 6. Serve JSON-lines requests on stdin/stdout until EOF or Ctrl+C

use anyhow::{Context, Result};
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use commissioning_gate::{CommissioningGate, FileBackedKVStore, GateService, TokioClock};
use device_runtime::{serve, DeviceConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = DeviceConfig::from_env();
    config
        .gate
        .validate()
        .context("Invalid gate configuration")?;

    let store_path = config.store_path();
    let store = FileBackedKVStore::open(&store_path)
        .with_context(|| format!("Failed to open store at {}", store_path.display()))?;
    let gate = CommissioningGate::boot(config.gate.clone(), store, TokioClock::new())
        .context("Failed to boot commissioning gate")?;

    let (handle, service) = GateService::spawn(gate, config.command_queue_depth);
    info!("Device is running. Reading requests from stdin.");

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    tokio::select! {
        result = serve(&handle, stdin, stdout) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, shutting down");
        }
    }

    // Dropping the last handle stops the service.
    drop(handle);
    let gate = service.await.context("Gate service task failed")?;
    info!(
        fabrics = gate.fabric_table().len(),
        accepted_version = gate.tc_attributes().accepted_version,
        "Shutdown complete"
    );
    Ok(())
}
